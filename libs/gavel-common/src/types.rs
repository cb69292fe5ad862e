use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Closed set of supported languages.
///
/// One representative per language family: ahead-of-time compiled (C++),
/// bytecode compiled (Java), interpreted (Python). An unrecognized value
/// is rejected at the boundary, before any file is staged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Cpp,
    Java,
    Python,
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Language::Cpp => "cpp",
            Language::Java => "java",
            Language::Python => "python",
        };
        write!(f, "{}", name)
    }
}

/// Error for a `language` value outside the supported set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownLanguage(pub String);

impl fmt::Display for UnknownLanguage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "unsupported language '{}' (valid options: cpp, java, python)",
            self.0
        )
    }
}

impl std::error::Error for UnknownLanguage {}

impl FromStr for Language {
    type Err = UnknownLanguage;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "cpp" | "c++" => Ok(Language::Cpp),
            "java" => Ok(Language::Java),
            "python" | "py" => Ok(Language::Python),
            other => Err(UnknownLanguage(other.to_string())),
        }
    }
}

/// Classified outcome of one execution attempt.
///
/// Exactly one verdict is terminal for any job. `Accepted` appears only as
/// the final verdict of a submission whose every test case passed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Verdict {
    Passed,
    Accepted,
    WrongAnswer,
    CompilationError,
    TimeLimitExceeded,
    RuntimeError,
    InternalError,
}

impl Verdict {
    /// True for the verdicts that let a submission continue to the next
    /// test case.
    pub fn is_passed(&self) -> bool {
        matches!(self, Verdict::Passed | Verdict::Accepted)
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Verdict::Passed => "Passed",
            Verdict::Accepted => "Accepted",
            Verdict::WrongAnswer => "Wrong Answer",
            Verdict::CompilationError => "Compilation Error",
            Verdict::TimeLimitExceeded => "Time Limit Exceeded",
            Verdict::RuntimeError => "Runtime Error",
            Verdict::InternalError => "Internal Error",
        };
        write!(f, "{}", name)
    }
}

/// Output of one language-runner invocation.
///
/// `elapsed_ms` is wall-clock time measured around the whole compile+run
/// sequence by the engine, never by the child process. `stdout` is
/// populated only on the passed-class and ad-hoc success paths; `stderr`
/// holds the diagnostic text on failure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub verdict: Verdict,
    pub elapsed_ms: u64,
    pub stdout: String,
    pub stderr: String,
}

impl ExecutionResult {
    pub fn passed(elapsed_ms: u64, stdout: String) -> Self {
        Self {
            verdict: Verdict::Passed,
            elapsed_ms,
            stdout,
            stderr: String::new(),
        }
    }

    pub fn failure(verdict: Verdict, elapsed_ms: u64, stderr: String) -> Self {
        Self {
            verdict,
            elapsed_ms,
            stdout: String::new(),
            stderr,
        }
    }
}

/// One test case of a problem. Owned by the problem store; the engine
/// only reads an ordered sequence of these.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestCase {
    pub input: String,
    pub expected_output: String,
    #[serde(default = "default_points")]
    pub points: u32,
    #[serde(default)]
    pub is_hidden: bool,
}

fn default_points() -> u32 {
    10
}

/// Per-test entry of a submission evaluation. Entries exist only for
/// test cases that were actually attempted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestVerdict {
    pub index: usize,
    pub verdict: Verdict,
    pub execution_time_ms: u64,
}

/// Aggregate produced by the judging orchestrator for one submission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmissionEvaluation {
    pub final_verdict: Verdict,
    /// Sum of per-test elapsed times up to and including the stopping
    /// test case.
    pub total_execution_time_ms: u64,
    /// `None` until real resource accounting exists; the engine never
    /// fabricates a number here.
    pub max_memory_used_kb: Option<u64>,
    pub per_test_verdicts: Vec<TestVerdict>,
    /// Compiler/interpreter diagnostic of the failing step, scrubbed of
    /// server-local paths. Empty when compilation succeeded.
    pub compile_message: String,
    pub judged_at: DateTime<Utc>,
}

/// Interactive "run" call shape: execute once with user-supplied stdin,
/// no comparison.
#[derive(Debug, Clone, Deserialize)]
pub struct RunRequest {
    pub language: Language,
    pub code: String,
    #[serde(default)]
    pub stdin: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunResponse {
    pub success: bool,
    /// Trimmed stdout; populated only when `success` is true.
    pub output: String,
    /// Diagnostic text when `success` is false.
    pub compile_message: String,
}

/// "Submit" call shape: judge against an ordered test-case sequence.
#[derive(Debug, Clone, Deserialize)]
pub struct SubmitRequest {
    pub language: Language,
    pub code: String,
    pub test_cases: Vec<TestCase>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SubmitResponse {
    pub verdict: Verdict,
    pub execution_time_ms: u64,
    pub memory_used_kb: Option<u64>,
    pub per_test_verdicts: Vec<TestVerdict>,
    pub compile_message: String,
}

impl From<SubmissionEvaluation> for SubmitResponse {
    fn from(eval: SubmissionEvaluation) -> Self {
        Self {
            verdict: eval.final_verdict,
            execution_time_ms: eval.total_execution_time_ms,
            memory_used_kb: eval.max_memory_used_kb,
            per_test_verdicts: eval.per_test_verdicts,
            compile_message: eval.compile_message,
        }
    }
}
