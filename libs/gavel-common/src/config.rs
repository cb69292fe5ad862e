// Injected judge settings. The source system hard-coded its deadlines;
// here they are plain fields so tests can run with short ones.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Engine-wide settings, injected into the toolchain runner.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JudgeSettings {
    /// Deadline for the compile step, milliseconds.
    pub compile_deadline_ms: u64,
    /// Deadline for the run step, milliseconds.
    pub run_deadline_ms: u64,
    /// Directory under which per-job staging directories are created.
    pub work_dir: PathBuf,
    /// When true (the default), any stderr text from the run step is a
    /// fatal Runtime Error, even for benign diagnostics. This mirrors the
    /// source system's behavior; flip it to let warnings through.
    pub stderr_is_fatal: bool,
}

impl Default for JudgeSettings {
    fn default() -> Self {
        Self {
            compile_deadline_ms: 3000,
            run_deadline_ms: 2000,
            work_dir: std::env::temp_dir().join("gavel"),
            stderr_is_fatal: true,
        }
    }
}

impl JudgeSettings {
    /// Defaults overridden by `GAVEL_COMPILE_DEADLINE_MS`,
    /// `GAVEL_RUN_DEADLINE_MS` and `GAVEL_WORK_DIR`.
    pub fn from_env() -> Self {
        let mut settings = Self::default();
        if let Some(ms) = env_u64("GAVEL_COMPILE_DEADLINE_MS") {
            settings.compile_deadline_ms = ms;
        }
        if let Some(ms) = env_u64("GAVEL_RUN_DEADLINE_MS") {
            settings.run_deadline_ms = ms;
        }
        if let Ok(dir) = std::env::var("GAVEL_WORK_DIR") {
            settings.work_dir = PathBuf::from(dir);
        }
        settings
    }

    pub fn compile_deadline(&self) -> Duration {
        Duration::from_millis(self.compile_deadline_ms)
    }

    pub fn run_deadline(&self) -> Duration {
        Duration::from_millis(self.run_deadline_ms)
    }
}

fn env_u64(key: &str) -> Option<u64> {
    std::env::var(key).ok().and_then(|v| v.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_deadlines() {
        let settings = JudgeSettings::default();
        assert_eq!(settings.compile_deadline(), Duration::from_millis(3000));
        assert_eq!(settings.run_deadline(), Duration::from_millis(2000));
        assert!(settings.stderr_is_fatal);
    }
}
