//! Judging engine: stages untrusted source code, compiles and runs it
//! under hard deadlines, classifies the outcome into a verdict, and
//! aggregates per-test verdicts into one submission result.

pub mod artifacts;
pub mod config;
pub mod engine;
pub mod evaluator;
pub mod executor;
pub mod runner;


pub use executor::JudgeService;
