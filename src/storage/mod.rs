//! Scratch directory lifecycle: creation, per-request directories, and the stale-file sweep.

use anyhow::Context;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tempfile::TempDir;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::Result;

const SECONDS_PER_HOUR: u64 = 60 * 60;

/// Outcome of one sweep over the scratch directory
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PurgeReport {
    /// Entries that were deleted
    pub removed: Vec<PathBuf>,

    /// Entries that were stale but could not be deleted
    pub failed: usize,
}

/// Process-local storage for files produced by yt-dlp
///
/// Every request works in its own subdirectory so that simultaneous requests for the
/// same video and language never see each other's files.
#[derive(Debug, Clone)]
pub struct ScratchDir {
    root: PathBuf,
    max_age: Duration,
}

impl ScratchDir {
    pub fn new(root: impl Into<PathBuf>, max_age_hours: u64) -> Self {
        Self {
            root: root.into(),
            max_age: Duration::from_secs(max_age_hours.saturating_mul(SECONDS_PER_HOUR)),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create the scratch directory if it does not exist yet
    pub fn ensure(&self) -> Result<()> {
        fs_err::create_dir_all(&self.root).context("Failed to create scratch directory")?;
        Ok(())
    }

    /// A unique directory that is deleted, with its contents, when dropped
    pub fn request_dir(&self, video_id: &str, lang: &str) -> Result<TempDir> {
        self.ensure()?;

        tempfile::Builder::new()
            .prefix(&format!("{video_id}.{lang}."))
            .tempdir_in(&self.root)
            .context("Failed to create request directory")
    }

    /// A unique directory that outlives the request and is left to the sweep
    pub fn persistent_dir(&self, video_id: &str, lang: &str) -> Result<PathBuf> {
        let suffix = Uuid::new_v4().simple().to_string();
        let dir = self
            .root
            .join(format!("{video_id}.{lang}.{}", &suffix[..8]));

        fs_err::create_dir_all(&dir).context("Failed to create download directory")?;
        Ok(dir)
    }

    /// Run the sweep with the configured threshold
    pub async fn purge_stale(&self) -> Result<PurgeReport> {
        self.purge_older_than(self.max_age).await
    }

    /// Delete every entry whose last modification is older than `max_age`
    ///
    /// Individual failures are logged and counted; they never stop the sweep.
    pub async fn purge_older_than(&self, max_age: Duration) -> Result<PurgeReport> {
        let mut report = PurgeReport::default();

        if !self.root.exists() {
            return Ok(report);
        }

        let now = SystemTime::now();
        let mut entries = tokio::fs::read_dir(&self.root)
            .await
            .with_context(|| format!("Failed to read scratch directory {}", self.root.display()))?;

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();

            let metadata = match entry.metadata().await {
                Ok(metadata) => metadata,
                Err(e) => {
                    tracing::warn!("Could not stat {}: {}", path.display(), e);
                    report.failed += 1;
                    continue;
                }
            };

            let age = metadata
                .modified()
                .ok()
                .and_then(|modified| now.duration_since(modified).ok())
                .unwrap_or_default();

            if age <= max_age {
                continue;
            }

            let removed = if metadata.is_dir() {
                tokio::fs::remove_dir_all(&path).await
            } else {
                tokio::fs::remove_file(&path).await
            };

            match removed {
                Ok(()) => {
                    tracing::info!("Removed stale scratch entry: {}", path.display());
                    report.removed.push(path);
                }
                Err(e) => {
                    tracing::warn!("Failed to remove {}: {}", path.display(), e);
                    report.failed += 1;
                }
            }
        }

        Ok(report)
    }

    /// Run the sweep every `interval` until the runtime shuts down
    pub fn spawn_sweeper(self: Arc<Self>, interval: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // The first tick fires immediately; start-up already swept.
            ticker.tick().await;

            loop {
                ticker.tick().await;
                match self.purge_stale().await {
                    Ok(report) => tracing::debug!(
                        removed = report.removed.len(),
                        failed = report.failed,
                        "Scratch sweep finished"
                    ),
                    Err(e) => tracing::error!("Scratch sweep failed: {:#}", e),
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;

    fn backdate(path: &Path, hours: u64) {
        let when = SystemTime::now() - Duration::from_secs(hours * SECONDS_PER_HOUR);
        File::options()
            .write(true)
            .open(path)
            .unwrap()
            .set_modified(when)
            .unwrap();
    }

    #[test]
    fn test_ensure_is_idempotent() {
        let tmp = tempfile::tempdir().unwrap();
        let scratch = ScratchDir::new(tmp.path().join("nested").join("temp"), 24);

        scratch.ensure().unwrap();
        scratch.ensure().unwrap();

        assert!(scratch.root().is_dir());
    }

    #[tokio::test]
    async fn test_huge_max_age_keeps_everything() {
        let tmp = tempfile::tempdir().unwrap();
        let scratch = ScratchDir::new(tmp.path(), u64::MAX);
        assert_eq!(scratch.max_age, Duration::from_secs(u64::MAX));

        let old = tmp.path().join("old.es.vtt");
        fs_err::write(&old, "WEBVTT").unwrap();
        backdate(&old, 24 * 365);

        let report = scratch.purge_stale().await.unwrap();

        assert!(report.removed.is_empty());
        assert!(old.exists());
    }

    #[tokio::test]
    async fn test_purge_only_removes_stale_files() {
        let tmp = tempfile::tempdir().unwrap();
        let scratch = ScratchDir::new(tmp.path(), 24);

        let old = tmp.path().join("old.es.vtt");
        let fresh = tmp.path().join("fresh.es.vtt");
        fs_err::write(&old, "WEBVTT").unwrap();
        fs_err::write(&fresh, "WEBVTT").unwrap();
        backdate(&old, 48);

        let report = scratch.purge_stale().await.unwrap();

        assert_eq!(report.removed, vec![old.clone()]);
        assert_eq!(report.failed, 0);
        assert!(!old.exists());
        assert!(fresh.exists());
    }

    #[tokio::test]
    async fn test_purge_removes_stale_download_dirs() {
        let tmp = tempfile::tempdir().unwrap();
        let scratch = ScratchDir::new(tmp.path(), 24);

        let dir = scratch.persistent_dir("dQw4w9WgXcQ", "en").unwrap();
        fs_err::write(dir.join("dQw4w9WgXcQ.en.srt"), "1").unwrap();
        File::open(&dir)
            .unwrap()
            .set_modified(SystemTime::now() - Duration::from_secs(30 * SECONDS_PER_HOUR))
            .unwrap();

        let report = scratch.purge_older_than(Duration::from_secs(3600)).await.unwrap();

        assert_eq!(report.removed.len(), 1);
        assert!(!dir.exists());
    }

    #[tokio::test]
    async fn test_purge_missing_root_is_empty() {
        let tmp = tempfile::tempdir().unwrap();
        let scratch = ScratchDir::new(tmp.path().join("missing"), 24);

        let report = scratch.purge_stale().await.unwrap();

        assert_eq!(report, PurgeReport::default());
    }

    #[test]
    fn test_request_dir_is_removed_on_drop() {
        let tmp = tempfile::tempdir().unwrap();
        let scratch = ScratchDir::new(tmp.path(), 24);

        let dir = scratch.request_dir("dQw4w9WgXcQ", "es").unwrap();
        let path = dir.path().to_path_buf();
        assert!(path.is_dir());
        assert!(path
            .file_name()
            .unwrap()
            .to_string_lossy()
            .starts_with("dQw4w9WgXcQ.es."));

        drop(dir);
        assert!(!path.exists());
    }

    #[test]
    fn test_persistent_dirs_are_unique() {
        let tmp = tempfile::tempdir().unwrap();
        let scratch = ScratchDir::new(tmp.path(), 24);

        let first = scratch.persistent_dir("dQw4w9WgXcQ", "es").unwrap();
        let second = scratch.persistent_dir("dQw4w9WgXcQ", "es").unwrap();

        assert_ne!(first, second);
        assert!(first.is_dir() && second.is_dir());
    }
}
