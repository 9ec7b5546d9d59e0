// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Lifecycle Reaper
//!
//! After a fixed delay, deletes the installed artifacts from disk while the
//! service keeps running from its already-open files. Removing the binary is
//! also what stops the supervisor from relaunching after the next exit.
//!
//! Every deletion is best-effort: a missing file is skipped silently and any
//! other failure is logged without stopping the remaining deletions. The
//! subscription file is left in place.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::domain::artifact::ArtifactStore;
use crate::domain::work_dir::WorkDirectory;

pub const DEFAULT_REAP_DELAY: Duration = Duration::from_secs(30);

/// Per-file outcome of one reap.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReapReport {
    pub removed: Vec<PathBuf>,
    pub already_absent: Vec<PathBuf>,
    /// Path and rendered error for each deletion that failed.
    pub failed: Vec<(PathBuf, String)>,
}

pub struct LifecycleReaper {
    store: Arc<dyn ArtifactStore>,
    delay: Duration,
}

impl LifecycleReaper {
    pub fn new(store: Arc<dyn ArtifactStore>) -> Self {
        Self {
            store,
            delay: DEFAULT_REAP_DELAY,
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Wait out the delay, then delete. Runs once.
    pub async fn reap(&self, work_dir: &WorkDirectory) -> ReapReport {
        debug!(delay = ?self.delay, "Reaper waiting");
        tokio::time::sleep(self.delay).await;
        self.reap_now(work_dir).await
    }

    /// Delete immediately, skipping the delay.
    pub async fn reap_now(&self, work_dir: &WorkDirectory) -> ReapReport {
        let mut report = ReapReport::default();

        for path in work_dir.reapable_artifacts() {
            match self.store.remove_file(&path).await {
                Ok(true) => {
                    debug!(path = %path.display(), "Reaped artifact");
                    report.removed.push(path);
                }
                Ok(false) => report.already_absent.push(path),
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Failed to reap artifact");
                    report.failed.push((path, e.to_string()));
                }
            }
        }

        metrics::counter!("hyvisor_reaper_removed_total").increment(report.removed.len() as u64);
        info!(
            removed = report.removed.len(),
            absent = report.already_absent.len(),
            failed = report.failed.len(),
            "Reaper finished"
        );
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::installation::ServiceProfile;
    use crate::infrastructure::store::LocalArtifactStore;

    #[tokio::test]
    async fn test_reap_removes_five_artifacts_and_keeps_subscription() {
        let dir = tempfile::tempdir().unwrap();
        let wd = WorkDirectory::new(dir.path(), &ServiceProfile::hysteria2());
        for path in wd.reapable_artifacts() {
            std::fs::write(&path, b"x").unwrap();
        }
        std::fs::write(wd.subscription_path("abc-123"), b"sub\n").unwrap();

        let report = LifecycleReaper::new(Arc::new(LocalArtifactStore::new()))
            .with_delay(Duration::from_millis(1))
            .reap(&wd)
            .await;

        assert_eq!(report.removed.len(), 5);
        assert!(report.failed.is_empty());
        for path in wd.reapable_artifacts() {
            assert!(!path.exists());
        }
        assert!(wd.subscription_path("abc-123").exists());
    }

    #[tokio::test]
    async fn test_reap_tolerates_missing_files() {
        let dir = tempfile::tempdir().unwrap();
        let wd = WorkDirectory::new(dir.path(), &ServiceProfile::hysteria2());
        std::fs::write(wd.config_path(), b"{}").unwrap();

        let report = LifecycleReaper::new(Arc::new(LocalArtifactStore::new()))
            .reap_now(&wd)
            .await;

        assert_eq!(report.removed, vec![wd.config_path()]);
        assert_eq!(report.already_absent.len(), 4);
        assert!(report.failed.is_empty());
    }

    #[tokio::test]
    async fn test_reap_continues_after_a_failure() {
        let dir = tempfile::tempdir().unwrap();
        let wd = WorkDirectory::new(dir.path(), &ServiceProfile::hysteria2());
        // A directory where a file is expected cannot be removed with remove_file.
        std::fs::create_dir(wd.binary_path()).unwrap();
        std::fs::write(wd.key_path(), b"k").unwrap();

        let report = LifecycleReaper::new(Arc::new(LocalArtifactStore::new()))
            .reap_now(&wd)
            .await;

        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].0, wd.binary_path());
        assert_eq!(report.removed, vec![wd.key_path()]);
    }
}
