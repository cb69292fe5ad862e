/// Judging Orchestrator - Per-Submission Aggregation
///
/// **Core Responsibility:**
/// Drive one submission across the ordered test cases of a problem and
/// turn per-test results into one submission verdict.
///
/// **Critical Properties:**
/// - Knows nothing about toolchains or process spawning
/// - Test cases run strictly sequentially, in input order
/// - Early exit: the first non-Passed verdict stops the run and becomes
///   the final verdict; later test cases are never attempted
///
/// **Comparison Rules (All Languages):**
/// - Trim leading/trailing whitespace: YES
/// - Exact string equality after the outer trim: YES
/// - Whitespace or line-ending normalization inside the body: NO
/// - Floating-point tolerance: NO (extension point, not default)
use anyhow::{bail, Result};
use chrono::Utc;
use tracing::{debug, info};

use gavel_common::types::{
    Language, SubmissionEvaluation, TestCase, TestVerdict, Verdict,
};

use crate::runner::CodeRunner;

/// Trim-then-compare. The whole comparison policy of the system lives
/// here; richer comparators slot in behind this function.
pub fn compare_output(actual: &str, expected: &str) -> Verdict {
    if actual.trim() == expected.trim() {
        Verdict::Passed
    } else {
        Verdict::WrongAnswer
    }
}

/// Lifecycle of one judging run. Made explicit so cancellation and
/// parallel-execution extensions have a clear insertion point; the
/// early-exit reporting semantics (first failure in sequence order) are
/// anchored to the `Stopped` transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum JudgePhase {
    Pending,
    Running(usize),
    Stopped(Verdict),
    Completed,
}

/// Judge one submission against an ordered test-case sequence.
///
/// An empty sequence is a precondition failure of the caller, reported
/// as `Err`, never as a verdict on the code. Engine-side failures while
/// running a test case become an `InternalError` verdict so raw errors
/// never escape as the submission outcome.
pub async fn judge_submission(
    runner: &dyn CodeRunner,
    language: Language,
    source: &str,
    test_cases: &[TestCase],
) -> Result<SubmissionEvaluation> {
    if test_cases.is_empty() {
        bail!("submission has no test cases to judge");
    }

    info!(
        language = %language,
        test_count = test_cases.len(),
        source_size = source.len(),
        "Judging submission"
    );

    let mut phase = JudgePhase::Pending;
    let mut per_test_verdicts = Vec::new();
    let mut total_execution_time_ms = 0u64;
    let mut compile_message = String::new();

    for (index, test_case) in test_cases.iter().enumerate() {
        phase = JudgePhase::Running(index);

        let result = match runner
            .run(
                language,
                source,
                Some(&test_case.input),
                Some(&test_case.expected_output),
            )
            .await
        {
            Ok(result) => result,
            Err(e) => gavel_common::types::ExecutionResult::failure(
                Verdict::InternalError,
                0,
                e.to_string(),
            ),
        };

        total_execution_time_ms += result.elapsed_ms;
        per_test_verdicts.push(TestVerdict {
            index,
            verdict: result.verdict,
            execution_time_ms: result.elapsed_ms,
        });

        debug!(
            test_index = index,
            verdict = %result.verdict,
            execution_ms = result.elapsed_ms,
            "Test case judged"
        );

        if !result.verdict.is_passed() {
            if result.verdict == Verdict::CompilationError {
                compile_message = result.stderr.clone();
            }
            phase = JudgePhase::Stopped(result.verdict);
            break;
        }
    }

    let final_verdict = match phase {
        JudgePhase::Stopped(verdict) => verdict,
        _ => {
            phase = JudgePhase::Completed;
            Verdict::Accepted
        }
    };
    debug_assert!(!matches!(phase, JudgePhase::Pending | JudgePhase::Running(_)));

    info!(
        final_verdict = %final_verdict,
        tests_attempted = per_test_verdicts.len(),
        total_execution_time_ms,
        "Submission judged"
    );

    Ok(SubmissionEvaluation {
        final_verdict,
        total_execution_time_ms,
        // No resource accounting exists; reading child rusage at exit is
        // the extension point when the target host provides it.
        max_memory_used_kb: None,
        per_test_verdicts,
        compile_message,
        judged_at: Utc::now(),
    })
}
