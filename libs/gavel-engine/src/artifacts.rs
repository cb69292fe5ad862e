/// Artifact Store - Ephemeral File Staging
///
/// **Responsibility:**
/// Turn in-memory text into on-disk files a child process can consume,
/// and guarantee their removal.
///
/// Every job gets its own directory named after a freshly generated job
/// id, so concurrent jobs never collide even for languages whose
/// toolchain mandates a fixed entry-point filename. Compiler
/// intermediates (the linked binary, class files) land in the same
/// directory, so releasing it removes them on every exit path.
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::config::LanguageProfile;

/// Creates and tears down per-job staging directories under one shared
/// work directory.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    work_dir: PathBuf,
}

impl ArtifactStore {
    pub fn new(work_dir: PathBuf) -> Self {
        Self { work_dir }
    }

    /// Stage source code for one job: allocate a job id, create the job
    /// directory, write the source file and fsync it so a subsequent
    /// compiler invocation cannot race a partially flushed file.
    ///
    /// Languages with a fixed entry-point name are first written under
    /// the job-id name and then renamed; the rename is deliberate, it
    /// keeps generation and entry-point naming as separate steps.
    pub async fn stage(&self, profile: &LanguageProfile, source: &str) -> Result<StagedJob> {
        let id = Uuid::new_v4();
        let dir = self.work_dir.join(id.to_string());
        fs::create_dir_all(&dir)
            .await
            .with_context(|| format!("Failed to create job directory {}", dir.display()))?;

        let generated = dir.join(format!("{}.{}", id, profile.source_extension));
        write_synced(&generated, source).await?;

        let source_path = match &profile.entrypoint {
            Some(name) => {
                let fixed = dir.join(name);
                fs::rename(&generated, &fixed)
                    .await
                    .with_context(|| format!("Failed to rename source to {}", fixed.display()))?;
                fixed
            }
            None => generated,
        };

        debug!(job_id = %id, path = %source_path.display(), "Staged source file");

        Ok(StagedJob {
            id,
            dir,
            source_path,
            released: false,
        })
    }

    /// Stage stdin text for a job. Empty text stages no file.
    pub async fn stage_input(&self, job: &StagedJob, text: &str) -> Result<Option<PathBuf>> {
        self.stage_aux(job, "input.txt", text).await
    }

    /// Stage expected output for a job. Empty text stages no file.
    pub async fn stage_expected(&self, job: &StagedJob, text: &str) -> Result<Option<PathBuf>> {
        self.stage_aux(job, "expected.txt", text).await
    }

    async fn stage_aux(
        &self,
        job: &StagedJob,
        name: &str,
        text: &str,
    ) -> Result<Option<PathBuf>> {
        if text.is_empty() {
            return Ok(None);
        }
        let path = job.dir.join(name);
        write_synced(&path, text).await?;
        Ok(Some(path))
    }
}

/// One staged job directory. Guaranteed to be removed: call `release`
/// on the normal path; `Drop` covers panics and early returns.
#[derive(Debug)]
pub struct StagedJob {
    pub id: Uuid,
    pub dir: PathBuf,
    pub source_path: PathBuf,
    released: bool,
}

impl StagedJob {
    /// Best-effort removal of every staged path and compiler artifact.
    /// Deletion failure is logged, never escalated; it must not fail
    /// the job.
    pub async fn release(mut self) {
        self.released = true;
        if let Err(e) = fs::remove_dir_all(&self.dir).await {
            warn!(
                job_id = %self.id,
                dir = %self.dir.display(),
                error = %e,
                "Failed to release staged job directory"
            );
        }
    }
}

impl Drop for StagedJob {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        // Fallback for error paths that never reached release().
        if let Err(e) = std::fs::remove_dir_all(&self.dir) {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!(
                    job_id = %self.id,
                    dir = %self.dir.display(),
                    error = %e,
                    "Failed to clean up staged job directory on drop"
                );
            }
        }
    }
}

async fn write_synced(path: &Path, text: &str) -> Result<()> {
    let mut file = fs::File::create(path)
        .await
        .with_context(|| format!("Failed to create {}", path.display()))?;
    file.write_all(text.as_bytes())
        .await
        .with_context(|| format!("Failed to write {}", path.display()))?;
    file.sync_all()
        .await
        .with_context(|| format!("Failed to sync {}", path.display()))?;
    Ok(())
}
