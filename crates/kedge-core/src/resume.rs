//! Resume-save coordinator: tracks the number of resume-data requests in
//! flight so shutdown can block until every one of them has a terminal
//! alert, without leaking a "forever outstanding" counter if a request's
//! terminal alert is ever dropped.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicI64, Ordering};

use tracing::warn;

use kedge_ids::InfoHash;

use crate::alert::ResumeOutcome;
use crate::engine::TorrentEngine;
use crate::error::{CoreError, CoreResult};
use crate::model::TorrentHandle;

/// Tracks in-flight `save_resume_data` requests.
#[derive(Debug, Default)]
pub struct ResumeCoordinator {
    outstanding: AtomicI64,
    conf_dir: PathBuf,
}

impl ResumeCoordinator {
    /// Construct a coordinator rooted at `conf_dir` (resume files land
    /// under `<conf_dir>/.resume/`).
    #[must_use]
    pub fn new(conf_dir: impl Into<PathBuf>) -> Self {
        Self {
            outstanding: AtomicI64::new(0),
            conf_dir: conf_dir.into(),
        }
    }

    /// Current number of resume-save requests awaiting a terminal alert.
    /// Never goes negative — every decrement is paired with a prior
    /// increment from [`Self::request_save`].
    #[must_use]
    pub fn outstanding(&self) -> i64 {
        self.outstanding.load(Ordering::SeqCst)
    }

    /// Ask the engine to save resume data for `handle`, incrementing
    /// `outstanding` first so a terminal alert arriving before this call
    /// returns can never under-count.
    pub async fn request_save(&self, engine: &dyn TorrentEngine, handle: TorrentHandle, only_if_modified: bool) {
        self.outstanding.fetch_add(1, Ordering::SeqCst);
        engine.save_resume_data(handle, only_if_modified).await;
    }

    /// Handle a `save_resume_data_alert`: persist the resume blob and
    /// decrement `outstanding`.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::ResumeIo`] if the write fails. `outstanding` is
    /// decremented regardless, so the pipeline cannot leak on I/O failure.
    pub async fn on_save_resume_data(&self, info_hash: InfoHash, data: &[u8]) -> CoreResult<()> {
        let path = kedge_store::resume_file(&self.conf_dir, &info_hash);
        let result = kedge_store::save_file(&path, data).await;
        self.outstanding.fetch_sub(1, Ordering::SeqCst);
        result.map_err(|source| CoreError::ResumeIo { info_hash, source })
    }

    /// Handle a `save_resume_data_failed_alert`: decrement `outstanding`
    /// and log unless the failure is the library's "nothing to save"
    /// sentinel.
    pub fn on_save_resume_data_failed(&self, handle: TorrentHandle, outcome: &ResumeOutcome) {
        self.outstanding.fetch_sub(1, Ordering::SeqCst);
        if let ResumeOutcome::Failed(message) = outcome {
            warn!(info_hash = %handle.info_hash(), %message, "resume data save failed");
        }
    }

    /// The conf dir resume files are written under.
    #[must_use]
    pub fn conf_dir(&self) -> &Path {
        &self.conf_dir
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn on_save_resume_data_persists_and_decrements() {
        let dir = tempfile::tempdir().unwrap();
        kedge_store::prepare_dirs(dir.path()).await.unwrap();
        let coordinator = ResumeCoordinator::new(dir.path());
        coordinator.outstanding.fetch_add(1, Ordering::SeqCst);
        let info_hash = kedge_ids::from_hex("0123456789abcdef0123456789abcdef01234567").unwrap();
        coordinator.on_save_resume_data(info_hash, b"resume-bytes").await.unwrap();
        assert_eq!(coordinator.outstanding(), 0);
        let path = kedge_store::resume_file(dir.path(), &info_hash);
        assert!(path.exists());
    }

    #[test]
    fn not_modified_failure_is_silent_but_still_decrements() {
        let coordinator = ResumeCoordinator::new("/tmp/irrelevant");
        coordinator.outstanding.fetch_add(1, Ordering::SeqCst);
        let handle = TorrentHandle::from_info_hash(kedge_ids::InfoHash::from_bytes([1; 20]));
        coordinator.on_save_resume_data_failed(handle, &ResumeOutcome::NotModified);
        assert_eq!(coordinator.outstanding(), 0);
    }

    #[test]
    fn never_goes_negative_across_paired_ops() {
        let coordinator = ResumeCoordinator::new("/tmp/irrelevant");
        assert_eq!(coordinator.outstanding(), 0);
        coordinator.outstanding.fetch_add(1, Ordering::SeqCst);
        let handle = TorrentHandle::from_info_hash(kedge_ids::InfoHash::from_bytes([2; 20]));
        coordinator.on_save_resume_data_failed(handle, &ResumeOutcome::Failed("disk full".into()));
        assert_eq!(coordinator.outstanding(), 0);
    }
}
