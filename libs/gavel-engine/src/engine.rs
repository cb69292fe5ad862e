/// Process Engine - Child Process Execution Under a Deadline
///
/// **Core Responsibility:**
/// Spawn one toolchain or user process, feed it staged stdin, capture
/// stdout/stderr, and enforce a hard wall-clock deadline.
///
/// **Critical Architectural Boundary:**
/// - The engine knows HOW to execute a command
/// - The engine does NOT classify verdicts
/// - The engine does NOT compare outputs
///
/// A deadline is enforced by killing the child on expiry, not by
/// advisory signaling; "killed by deadline" is reported distinctly from
/// "exited with non-zero status" so Time Limit Exceeded can be
/// classified correctly. There is no sandboxing around the child: no
/// restricted user, no namespace or cgroup isolation. Known limitation
/// of the system, kept explicit rather than silently fixed.
use anyhow::{bail, Context, Result};
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::debug;

/// Input-size guardrails, checked before anything is staged.
pub const MAX_SOURCE_CODE_BYTES: usize = 1024 * 1024; // 1MB
pub const MAX_TEST_INPUT_BYTES: usize = 10 * 1024 * 1024; // 10MB

/// Raw outcome of one child-process step.
#[derive(Debug, Clone)]
pub struct StepOutput {
    pub stdout: String,
    pub stderr: String,
    /// The child was killed because the deadline expired.
    pub timed_out: bool,
    /// Exit code when the child exited on its own; `None` on timeout or
    /// signal-based termination.
    pub exit_code: Option<i32>,
}

impl StepOutput {
    pub fn exited_cleanly(&self) -> bool {
        !self.timed_out && self.exit_code == Some(0)
    }
}

/// Spawns toolchain and user processes directly on the host.
#[derive(Debug, Clone, Default)]
pub struct ProcessEngine;

impl ProcessEngine {
    pub fn new() -> Self {
        Self
    }

    /// Run one command to completion or deadline expiry.
    ///
    /// Stdin comes from `stdin_path` when staged, otherwise /dev/null so
    /// a program that reads input fails fast instead of blocking until
    /// the deadline. `kill_on_drop` guarantees the child dies when the
    /// wait future is dropped at the deadline.
    pub async fn run_step(
        &self,
        program: &str,
        args: &[String],
        cwd: &Path,
        stdin_path: Option<&Path>,
        deadline: Duration,
    ) -> Result<StepOutput> {
        let stdin = match stdin_path {
            Some(path) => {
                let file = std::fs::File::open(path)
                    .with_context(|| format!("Failed to open staged stdin {}", path.display()))?;
                Stdio::from(file)
            }
            None => Stdio::null(),
        };

        debug!(program, ?args, deadline_ms = deadline.as_millis() as u64, "Spawning step");

        let child = Command::new(program)
            .args(args)
            .current_dir(cwd)
            .stdin(stdin)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .with_context(|| format!("Failed to spawn '{}'", program))?;

        match timeout(deadline, child.wait_with_output()).await {
            Ok(Ok(output)) => {
                let exit_code = output.status.code();
                debug!(program, ?exit_code, "Step finished");
                Ok(StepOutput {
                    stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
                    stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
                    timed_out: false,
                    exit_code,
                })
            }
            Ok(Err(e)) => bail!("Failed to wait for '{}': {}", program, e),
            Err(_) => {
                debug!(program, "Step killed at deadline");
                Ok(StepOutput {
                    stdout: String::new(),
                    stderr: String::new(),
                    timed_out: true,
                    exit_code: None,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    // These exercise the engine against /bin/sh, which is present on any
    // host the judge itself can run on.

    #[tokio::test]
    async fn test_step_captures_stdout_and_exit_code() {
        let engine = ProcessEngine::new();
        let out = engine
            .run_step(
                "sh",
                &["-c".to_string(), "echo hello".to_string()],
                Path::new("/tmp"),
                None,
                Duration::from_secs(5),
            )
            .await
            .unwrap();

        assert!(out.exited_cleanly());
        assert_eq!(out.stdout.trim(), "hello");
        assert!(out.stderr.is_empty());
    }

    #[tokio::test]
    async fn test_step_captures_stderr_and_nonzero_exit() {
        let engine = ProcessEngine::new();
        let out = engine
            .run_step(
                "sh",
                &["-c".to_string(), "echo oops >&2; exit 3".to_string()],
                Path::new("/tmp"),
                None,
                Duration::from_secs(5),
            )
            .await
            .unwrap();

        assert!(!out.timed_out);
        assert_eq!(out.exit_code, Some(3));
        assert_eq!(out.stderr.trim(), "oops");
    }

    #[tokio::test]
    async fn test_deadline_kills_child_within_bounded_overshoot() {
        let engine = ProcessEngine::new();
        let started = Instant::now();
        let out = engine
            .run_step(
                "sh",
                &["-c".to_string(), "sleep 30".to_string()],
                Path::new("/tmp"),
                None,
                Duration::from_millis(500),
            )
            .await
            .unwrap();
        let elapsed = started.elapsed();

        assert!(out.timed_out);
        assert!(out.exit_code.is_none());
        assert!(
            elapsed < Duration::from_millis(1000),
            "deadline overshoot: {:?}",
            elapsed
        );
    }

    #[tokio::test]
    async fn test_missing_program_is_an_error() {
        let engine = ProcessEngine::new();
        let result = engine
            .run_step(
                "gavel-no-such-binary",
                &[],
                Path::new("/tmp"),
                None,
                Duration::from_secs(1),
            )
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_stdin_attached_from_file() {
        let dir = std::env::temp_dir();
        let path = dir.join(format!("gavel-stdin-{}", std::process::id()));
        std::fs::write(&path, "41\n").unwrap();

        let engine = ProcessEngine::new();
        let out = engine
            .run_step(
                "sh",
                &["-c".to_string(), "read n; echo $((n + 1))".to_string()],
                &dir,
                Some(&path),
                Duration::from_secs(5),
            )
            .await
            .unwrap();

        std::fs::remove_file(&path).unwrap();
        assert_eq!(out.stdout.trim(), "42");
    }
}
