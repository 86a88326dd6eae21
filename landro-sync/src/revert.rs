//! Reverting local changes of a receive-only folder
//!
//! A receive-only folder scans and versions local modifications like any
//! other folder, but marks them with [`LocalFlags::RECEIVE_ONLY`] and never
//! sends them to peers. Reverting throws those changes away:
//!
//! - records whose whole history is local are deleted from disk and recorded
//!   as deleted
//! - records with history elsewhere get the empty version vector, which is
//!   older than every other version and in conflict with none, so the next
//!   pull replaces our copy without creating a conflict copy
//!
//! [`LocalFlags::RECEIVE_ONLY`]: landro_index::LocalFlags::RECEIVE_ONLY

use chrono::Utc;
use landro_index::{DeviceId, FileInfo, IgnoreMatcher, LocalIndex};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};

use crate::batch::UpdateBatch;
use crate::classifier::{classify, RevertAction};
use crate::config::RevertConfig;
use crate::delete_queue::{DeleteHandler, DeleteQueue};
use crate::errors::Result;
use crate::folder_state::{
    FolderState, FolderStatus, PullScheduler, PullSignal, StateGuard, StatusReporter,
};
use crate::scan_relay::{ScanRelay, ScanSender, Scanner};

/// Counters for the log line at the end of a pass
#[derive(Debug, Default)]
struct RevertStats {
    deleted_files: usize,
    rolled_back: usize,
    deleted_dirs: usize,
    failed: usize,
}

/// A folder that tracks local changes but never propagates them
pub struct ReceiveOnlyFolder<H: DeleteHandler> {
    folder_id: String,
    device_id: DeviceId,
    config: RevertConfig,
    ignores: Arc<RwLock<Arc<IgnoreMatcher>>>,
    handler: H,
    scanner: Arc<dyn Scanner>,
    status: Arc<dyn StatusReporter>,
    pulls: Arc<dyn PullScheduler>,
}

impl<H: DeleteHandler> ReceiveOnlyFolder<H> {
    pub fn new(
        folder_id: impl Into<String>,
        device_id: DeviceId,
        handler: H,
        scanner: Arc<dyn Scanner>,
    ) -> Self {
        Self {
            folder_id: folder_id.into(),
            device_id,
            config: RevertConfig::default(),
            ignores: Arc::new(RwLock::new(Arc::new(IgnoreMatcher::empty()))),
            handler,
            scanner,
            status: Arc::new(FolderStatus::new()),
            pulls: Arc::new(PullSignal::new()),
        }
    }

    pub fn with_config(mut self, config: RevertConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_ignores(mut self, ignores: IgnoreMatcher) -> Self {
        self.ignores = Arc::new(RwLock::new(Arc::new(ignores)));
        self
    }

    /// Share an ignore matcher slot owned by the folder's lifecycle manager
    pub fn with_shared_ignores(mut self, ignores: Arc<RwLock<Arc<IgnoreMatcher>>>) -> Self {
        self.ignores = ignores;
        self
    }

    pub fn with_status(mut self, status: Arc<dyn StatusReporter>) -> Self {
        self.status = status;
        self
    }

    pub fn with_pull_scheduler(mut self, pulls: Arc<dyn PullScheduler>) -> Self {
        self.pulls = pulls;
        self
    }

    pub fn folder_id(&self) -> &str {
        &self.folder_id
    }

    pub fn device_id(&self) -> DeviceId {
        self.device_id
    }

    pub fn handler(&self) -> &H {
        &self.handler
    }

    pub fn config(&self) -> &RevertConfig {
        &self.config
    }

    /// Replace the ignore patterns used by later passes
    pub async fn set_ignores(&self, ignores: IgnoreMatcher) {
        *self.ignores.write().await = Arc::new(ignores);
    }

    /// Undo every local change recorded in `index`
    ///
    /// Replacement records are written through `apply_batch` in bounded
    /// batches. Failures to delete individual files or directories are logged
    /// and skipped. A failing `apply_batch` stops the pass. Either way the
    /// folder returns to idle and a pull is requested afterwards.
    ///
    /// Callers must not run two reverts of the same folder concurrently.
    pub async fn revert<I, F>(&self, index: &I, mut apply_batch: F)
    where
        I: LocalIndex + ?Sized,
        F: FnMut(Vec<FileInfo>) -> landro_index::Result<()>,
    {
        let _state = StateGuard::enter(self.status.as_ref(), FolderState::Scanning);
        info!("Reverting local changes in folder {}", self.folder_id);

        let ignores = self.ignores.read().await.clone();
        let relay = ScanRelay::start(self.scanner.clone(), self.config.scan_batch_size);

        match self.revert_pass(index, &mut apply_batch, ignores, relay.sender()).await {
            Ok(stats) => info!(
                "Revert of folder {} complete: {} files deleted, {} rolled back, {} directories deleted, {} failures",
                self.folder_id, stats.deleted_files, stats.rolled_back, stats.deleted_dirs, stats.failed
            ),
            Err(e) => error!("Revert of folder {} stopped: {}", self.folder_id, e),
        }

        let relayed = relay.finish().await;
        debug!("Revert relayed {} paths for rescanning", relayed);

        // The index changed but nothing will pull by itself
        self.pulls.request_pull();
    }

    async fn revert_pass<I, F>(
        &self,
        index: &I,
        apply_batch: &mut F,
        ignores: Arc<IgnoreMatcher>,
        scan: ScanSender,
    ) -> Result<RevertStats>
    where
        I: LocalIndex + ?Sized,
        F: FnMut(Vec<FileInfo>) -> landro_index::Result<()>,
    {
        let mut stats = RevertStats::default();
        let mut queue = DeleteQueue::new(&self.handler, ignores, scan);
        let mut batch = UpdateBatch::new(self.config.max_batch_files, self.config.max_batch_bytes);

        for file in index.local_entries()? {
            let replacement = match classify(&file, self.device_id) {
                RevertAction::None => continue,
                RevertAction::Delete => match queue.handle(&file).await {
                    Ok(true) => {
                        stats.deleted_files += 1;
                        file.deleted_by(self.device_id)
                    }
                    Ok(false) => continue,
                    Err(e) => {
                        warn!("Revert: deleting {}: {}", file.name, e);
                        stats.failed += 1;
                        continue;
                    }
                },
                RevertAction::RollBack => {
                    stats.rolled_back += 1;
                    file.rolled_back()
                }
            };

            batch.append(replacement);
            batch.flush_if_full(apply_batch)?;
        }
        batch.flush(apply_batch)?;

        debug!("Revert: {} directories queued for removal", queue.queued());
        let (deleted, err) = queue.flush().await;
        if let Some(e) = err {
            warn!("Revert: removing directories: {}", e);
        }

        let now = Utc::now();
        stats.deleted_dirs = deleted.len();
        for dir in deleted {
            batch.append(FileInfo::deleted_directory(dir, now, self.device_id));
            batch.flush_if_full(apply_batch)?;
        }
        batch.flush(apply_batch)?;

        Ok(stats)
    }
}
