/// Language Runner - Compile, Run, Classify
///
/// **Core Responsibility:**
/// Turn untrusted source code plus optional stdin/expected-output into
/// one classified ExecutionResult, uniformly across language families
/// with different toolchains.
///
/// The per-language variance lives in data (LanguageProfile), not in
/// per-language structs: the profile says whether a compile step exists,
/// how to invoke the toolchain, and which diagnostic markers classify
/// its failures. Classification itself is a pair of pure functions over
/// the profile's markers so it can be unit-tested against fixture
/// diagnostics and swapped for exit-code or structured classification
/// later without touching the runner.
use anyhow::{bail, Result};
use async_trait::async_trait;
use std::path::Path;
use std::time::Instant;
use tracing::{info, warn};

use gavel_common::config::JudgeSettings;
use gavel_common::types::{ExecutionResult, Language, Verdict};

use crate::artifacts::{ArtifactStore, StagedJob};
use crate::config::{LanguageProfile, LanguageProfileManager};
use crate::engine::{ProcessEngine, StepOutput, MAX_SOURCE_CODE_BYTES, MAX_TEST_INPUT_BYTES};
use crate::evaluator::compare_output;

/// One compile-and-run strategy. The production implementation shells
/// out to host toolchains; tests substitute scripted runners.
#[async_trait]
pub trait CodeRunner: Send + Sync {
    /// Execute `source` once. Presence of `expected` switches from
    /// "execute" mode to "execute-and-compare" mode.
    ///
    /// `Err` means an engine-side failure (staging I/O, unspawnable
    /// toolchain), never a property of the submitted code.
    async fn run(
        &self,
        language: Language,
        source: &str,
        stdin: Option<&str>,
        expected: Option<&str>,
    ) -> Result<ExecutionResult>;
}

/// Classification of one run step's diagnostic text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticClass {
    /// No diagnostics worth failing over.
    Clean,
    /// Diagnostics match the language's syntax-error marker; for an
    /// interpreted language this is the post-hoc compile error.
    SyntaxError,
    /// Any other diagnostics, or an abnormal exit.
    RuntimeError,
}

/// Compile-step classification: did the compiler report a fatal failure?
///
/// A marker-carrying profile (C++) only fails on the marker, so warnings
/// pass; a markerless profile (Java) fails on any non-empty diagnostics.
pub fn is_compile_failure(profile: &LanguageProfile, out: &StepOutput) -> bool {
    match &profile.compile_error_marker {
        Some(marker) => out.stderr.contains(marker),
        None => !out.stderr.trim().is_empty(),
    }
}

/// Run-step classification. When `stderr_is_fatal` is on, any diagnostic
/// text fails the run even if the process exited cleanly; this
/// misclassifies benign stderr chatter as Runtime Error and is preserved
/// deliberately behind the named policy flag. An abnormal exit is always
/// a Runtime Error, with or without diagnostics.
///
/// The interpreted-language syntax-error marker is checked before the
/// fatal-stderr policy is applied: a syntax failure is the language's
/// compile error however benign stderr is treated otherwise.
pub fn classify_run_diagnostics(
    profile: &LanguageProfile,
    out: &StepOutput,
    stderr_is_fatal: bool,
) -> DiagnosticClass {
    let has_diagnostics = !out.stderr.trim().is_empty();

    if has_diagnostics {
        if let Some(marker) = &profile.syntax_error_marker {
            if out.stderr.contains(marker) {
                return DiagnosticClass::SyntaxError;
            }
        }
        if stderr_is_fatal {
            return DiagnosticClass::RuntimeError;
        }
    }

    if !matches!(out.exit_code, Some(0)) {
        return DiagnosticClass::RuntimeError;
    }

    DiagnosticClass::Clean
}

/// Remove the job's staging directory from diagnostic text so callers
/// never see the server's filesystem layout.
pub fn scrub_job_paths(text: &str, dir: &Path) -> String {
    let dir = dir.to_string_lossy();
    let with_slash = format!("{}/", dir);
    text.replace(with_slash.as_str(), "").replace(dir.as_ref(), "")
}

/// Production runner: stages files, drives the process engine through
/// the compile and run steps, and classifies the outcome.
pub struct ToolchainRunner {
    settings: JudgeSettings,
    profiles: LanguageProfileManager,
    store: ArtifactStore,
    engine: ProcessEngine,
}

impl ToolchainRunner {
    pub fn new(settings: JudgeSettings, profiles: LanguageProfileManager) -> Self {
        let store = ArtifactStore::new(settings.work_dir.clone());
        Self {
            settings,
            profiles,
            store,
            engine: ProcessEngine::new(),
        }
    }

    async fn run_staged(
        &self,
        profile: &LanguageProfile,
        job: &StagedJob,
        stdin: Option<&str>,
        expected: Option<&str>,
    ) -> Result<ExecutionResult> {
        // The timer spans compilation and execution; compiler time counts
        // toward the reported elapsed time, matching the source system.
        let started = Instant::now();
        let dir = job.dir.to_string_lossy().into_owned();
        let source = job.source_path.to_string_lossy().into_owned();
        let binary = job.dir.join(job.id.to_string()).to_string_lossy().into_owned();

        if let Some(compile) = &profile.compile {
            let (program, args) = compile.expand(&source, &binary, &dir);
            let out = self
                .engine
                .run_step(&program, &args, &job.dir, None, self.settings.compile_deadline())
                .await?;

            let elapsed = started.elapsed().as_millis() as u64;
            if out.timed_out {
                // A compiler that blows its deadline is reported as a
                // compilation failure, not a time limit on the program.
                return Ok(ExecutionResult::failure(
                    Verdict::CompilationError,
                    elapsed,
                    format!(
                        "compilation timed out after {}ms",
                        self.settings.compile_deadline_ms
                    ),
                ));
            }
            if is_compile_failure(profile, &out) {
                return Ok(ExecutionResult::failure(
                    Verdict::CompilationError,
                    elapsed,
                    scrub_job_paths(out.stderr.trim(), &job.dir),
                ));
            }
        }

        let stdin_path = self
            .store
            .stage_input(job, stdin.unwrap_or_default())
            .await?;
        let expected_path = match expected {
            Some(text) => self.store.stage_expected(job, text).await?,
            None => None,
        };

        let (program, args) = profile.run.expand(&source, &binary, &dir);
        let out = self
            .engine
            .run_step(
                &program,
                &args,
                &job.dir,
                stdin_path.as_deref(),
                self.settings.run_deadline(),
            )
            .await?;
        let elapsed = started.elapsed().as_millis() as u64;

        if out.timed_out {
            return Ok(ExecutionResult::failure(
                Verdict::TimeLimitExceeded,
                elapsed,
                format!(
                    "killed after exceeding the {}ms run deadline",
                    self.settings.run_deadline_ms
                ),
            ));
        }

        match classify_run_diagnostics(profile, &out, self.settings.stderr_is_fatal) {
            DiagnosticClass::SyntaxError => {
                return Ok(ExecutionResult::failure(
                    Verdict::CompilationError,
                    elapsed,
                    scrub_job_paths(out.stderr.trim(), &job.dir),
                ));
            }
            DiagnosticClass::RuntimeError => {
                let message = if out.stderr.trim().is_empty() {
                    match out.exit_code {
                        Some(code) => format!("process exited with code {}", code),
                        None => "process terminated by signal".to_string(),
                    }
                } else {
                    scrub_job_paths(out.stderr.trim(), &job.dir)
                };
                return Ok(ExecutionResult::failure(
                    Verdict::RuntimeError,
                    elapsed,
                    message,
                ));
            }
            DiagnosticClass::Clean => {}
        }

        match expected {
            Some(_) => {
                // Compare against the staged file, the same artifact a
                // checker process would consume. No file means the
                // expected output was empty text.
                let expected_text = match &expected_path {
                    Some(path) => tokio::fs::read_to_string(path).await?,
                    None => String::new(),
                };
                match compare_output(&out.stdout, &expected_text) {
                    Verdict::Passed => Ok(ExecutionResult::passed(elapsed, out.stdout)),
                    verdict => Ok(ExecutionResult::failure(verdict, elapsed, String::new())),
                }
            }
            None => Ok(ExecutionResult::passed(elapsed, out.stdout)),
        }
    }
}

#[async_trait]
impl CodeRunner for ToolchainRunner {
    async fn run(
        &self,
        language: Language,
        source: &str,
        stdin: Option<&str>,
        expected: Option<&str>,
    ) -> Result<ExecutionResult> {
        if source.len() > MAX_SOURCE_CODE_BYTES {
            bail!(
                "source code exceeds maximum size of {} bytes",
                MAX_SOURCE_CODE_BYTES
            );
        }
        if stdin.map_or(0, |s| s.len()) > MAX_TEST_INPUT_BYTES {
            bail!(
                "test input exceeds maximum size of {} bytes",
                MAX_TEST_INPUT_BYTES
            );
        }

        let profile = self.profiles.get(language)?;
        let job = self.store.stage(profile, source).await?;
        let job_id = job.id;

        // Staged paths are paired with a release on every exit path; the
        // StagedJob drop guard covers the error arm below.
        let result = self.run_staged(profile, &job, stdin, expected).await;
        job.release().await;

        match &result {
            Ok(r) => info!(
                job_id = %job_id,
                language = %language,
                verdict = %r.verdict,
                elapsed_ms = r.elapsed_ms,
                "Job finished"
            ),
            Err(e) => warn!(job_id = %job_id, language = %language, error = %e, "Job failed internally"),
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LanguageProfileManager;
    use std::path::PathBuf;

    fn step(stderr: &str, exit_code: Option<i32>) -> StepOutput {
        StepOutput {
            stdout: String::new(),
            stderr: stderr.to_string(),
            timed_out: false,
            exit_code,
        }
    }

    fn profile(language: Language) -> LanguageProfile {
        LanguageProfileManager::builtin().get(language).unwrap().clone()
    }

    #[test]
    fn test_cpp_compile_failure_requires_marker() {
        let cpp = profile(Language::Cpp);

        let error = step(
            "main.cpp:3:5: error: expected ';' before 'return'",
            Some(1),
        );
        assert!(is_compile_failure(&cpp, &error));

        // Warnings are non-fatal at compile time for the marker-carrying
        // profile.
        let warning = step(
            "main.cpp:4:9: warning: unused variable 'x' [-Wunused-variable]",
            Some(0),
        );
        assert!(!is_compile_failure(&cpp, &warning));
    }

    #[test]
    fn test_java_compile_failure_on_any_diagnostics() {
        let java = profile(Language::Java);

        let diag = step(
            "Main.java:5: error: ';' expected\n        System.out.println(\"hi\")\n1 error",
            Some(1),
        );
        assert!(is_compile_failure(&java, &diag));

        // Even a bare note is fatal for the markerless profile.
        let note = step("Note: Main.java uses unchecked operations.", Some(0));
        assert!(is_compile_failure(&java, &note));

        assert!(!is_compile_failure(&java, &step("", Some(0))));
    }

    #[test]
    fn test_python_syntax_error_reclassified() {
        let python = profile(Language::Python);

        let syntax = step(
            "  File \"main.py\", line 1\n    print(\nSyntaxError: '(' was never closed",
            Some(1),
        );
        assert_eq!(
            classify_run_diagnostics(&python, &syntax, true),
            DiagnosticClass::SyntaxError
        );

        let runtime = step(
            "Traceback (most recent call last):\nZeroDivisionError: division by zero",
            Some(1),
        );
        assert_eq!(
            classify_run_diagnostics(&python, &runtime, true),
            DiagnosticClass::RuntimeError
        );
    }

    #[test]
    fn test_syntax_error_survives_lenient_stderr_policy() {
        let python = profile(Language::Python);
        let syntax = step(
            "  File \"main.py\", line 2\n    if True\nSyntaxError: expected ':'",
            Some(1),
        );

        // The marker is the language's compile-error detection; it must
        // not be gated on the benign-stderr policy.
        assert_eq!(
            classify_run_diagnostics(&python, &syntax, false),
            DiagnosticClass::SyntaxError
        );

        // Other non-clean outcomes under the lenient policy stay
        // Runtime Error.
        let runtime = step(
            "Traceback (most recent call last):\nKeyError: 'x'",
            Some(1),
        );
        assert_eq!(
            classify_run_diagnostics(&python, &runtime, false),
            DiagnosticClass::RuntimeError
        );
    }

    #[test]
    fn test_any_stderr_fatal_under_default_policy() {
        let cpp = profile(Language::Cpp);
        // Clean exit but stderr chatter: the preserved source behavior
        // classifies this as a Runtime Error.
        let chatty = step("debug: loaded 3 entries", Some(0));
        assert_eq!(
            classify_run_diagnostics(&cpp, &chatty, true),
            DiagnosticClass::RuntimeError
        );
        // With the policy off, a clean exit survives stderr chatter.
        assert_eq!(
            classify_run_diagnostics(&cpp, &chatty, false),
            DiagnosticClass::Clean
        );
    }

    #[test]
    fn test_abnormal_exit_is_runtime_error_even_without_stderr() {
        let cpp = profile(Language::Cpp);
        let silent_crash = step("", Some(139));
        assert_eq!(
            classify_run_diagnostics(&cpp, &silent_crash, true),
            DiagnosticClass::RuntimeError
        );
        assert_eq!(
            classify_run_diagnostics(&cpp, &silent_crash, false),
            DiagnosticClass::RuntimeError
        );

        let signal_kill = step("", None);
        assert_eq!(
            classify_run_diagnostics(&cpp, &signal_kill, true),
            DiagnosticClass::RuntimeError
        );
    }

    #[test]
    fn test_clean_run() {
        let python = profile(Language::Python);
        assert_eq!(
            classify_run_diagnostics(&python, &step("", Some(0)), true),
            DiagnosticClass::Clean
        );
    }

    #[test]
    fn test_scrub_job_paths() {
        let dir = PathBuf::from("/tmp/gavel/123e4567-e89b-12d3-a456-426614174000");
        let text = format!(
            "  File \"{}/main.py\", line 1\nSyntaxError: invalid syntax",
            dir.display()
        );
        let scrubbed = scrub_job_paths(&text, &dir);
        assert!(!scrubbed.contains("/tmp/gavel"));
        assert!(scrubbed.contains("main.py"));
        assert!(scrubbed.contains("SyntaxError"));
    }
}
