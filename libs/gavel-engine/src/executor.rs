/// Judge Service - External Call Shapes
///
/// **Responsibility:**
/// Glue the language runner and the judging orchestrator into the two
/// synchronous call shapes the outside world consumes: ad-hoc "run"
/// (execute once, no comparison) and "submit" (judge against the
/// problem's test cases).
///
/// This module knows nothing about how code executes or how outputs are
/// compared; it shapes requests and responses and keeps the promise that
/// no raw engine error ever reaches the ad-hoc caller.
use anyhow::Result;
use tracing::warn;

use gavel_common::config::JudgeSettings;
use gavel_common::types::{
    RunRequest, RunResponse, SubmitRequest, SubmitResponse, Verdict,
};

use crate::config::LanguageProfileManager;
use crate::evaluator::judge_submission;
use crate::runner::{CodeRunner, ToolchainRunner};

/// Entry point for embedding the engine. Owns the production runner;
/// the request types are plain serde values, so any transport can sit
/// in front.
pub struct JudgeService {
    runner: ToolchainRunner,
}

impl JudgeService {
    pub fn new(settings: JudgeSettings, profiles: LanguageProfileManager) -> Self {
        Self {
            runner: ToolchainRunner::new(settings, profiles),
        }
    }

    /// Ad-hoc "run": one execution with user-supplied stdin, no verdict
    /// taxonomy beyond succeeded/failed. Diagnostics are surfaced
    /// verbatim (already scrubbed of staged paths by the runner).
    pub async fn run(&self, request: RunRequest) -> RunResponse {
        run_adhoc(&self.runner, request).await
    }

    /// "Submit": judge against the ordered test cases. An empty
    /// test-case sequence is a precondition failure, reported as `Err`
    /// rather than a verdict on the code.
    pub async fn submit(&self, request: SubmitRequest) -> Result<SubmitResponse> {
        submit(&self.runner, request).await
    }
}

pub async fn run_adhoc(runner: &dyn CodeRunner, request: RunRequest) -> RunResponse {
    let stdin = if request.stdin.is_empty() {
        None
    } else {
        Some(request.stdin.as_str())
    };

    match runner.run(request.language, &request.code, stdin, None).await {
        Ok(result) => {
            if result.verdict == Verdict::Passed {
                RunResponse {
                    success: true,
                    output: result.stdout.trim().to_string(),
                    compile_message: String::new(),
                }
            } else {
                RunResponse {
                    success: false,
                    output: String::new(),
                    compile_message: result.stderr,
                }
            }
        }
        Err(e) => {
            // Engine-side failure: still a structured response, never a
            // propagated exception.
            warn!(language = %request.language, error = %e, "Ad-hoc run failed internally");
            RunResponse {
                success: false,
                output: String::new(),
                compile_message: format!("internal error: {}", e),
            }
        }
    }
}

pub async fn submit(runner: &dyn CodeRunner, request: SubmitRequest) -> Result<SubmitResponse> {
    let evaluation = judge_submission(
        runner,
        request.language,
        &request.code,
        &request.test_cases,
    )
    .await?;
    Ok(evaluation.into())
}
