//! Ordered deletion of reverted files and directories
//!
//! Files are removed as they are encountered. Directories are held back and
//! removed at the end, deepest first, so that a directory is only attempted
//! once everything queued beneath it has been dealt with.

use async_trait::async_trait;
use landro_index::{FileInfo, IgnoreMatcher};
use std::sync::Arc;
use tracing::debug;

use crate::errors::{Result, SyncError};
use crate::scan_relay::ScanSender;

/// Filesystem removal capability of a folder
#[async_trait]
pub trait DeleteHandler: Send + Sync {
    /// Remove the file described by `file`
    async fn delete_file(&self, file: &FileInfo, scan: &ScanSender) -> Result<()>;

    /// Remove the directory `name`, which fails while it still has content
    /// that is not deletable under `ignores`
    async fn delete_dir(&self, name: &str, ignores: &IgnoreMatcher, scan: &ScanSender)
        -> Result<()>;
}

pub struct DeleteQueue<'a, H: DeleteHandler + ?Sized> {
    handler: &'a H,
    ignores: Arc<IgnoreMatcher>,
    dirs: Vec<String>,
    scan: ScanSender,
}

impl<'a, H: DeleteHandler + ?Sized> DeleteQueue<'a, H> {
    pub fn new(handler: &'a H, ignores: Arc<IgnoreMatcher>, scan: ScanSender) -> Self {
        Self {
            handler,
            ignores,
            dirs: Vec::new(),
            scan,
        }
    }

    /// Delete a file now or queue a directory for [`DeleteQueue::flush`]
    ///
    /// `Ok(true)` means the file was removed. `Ok(false)` means nothing was
    /// removed yet: the path is ignored and not deletable, or it is a
    /// directory that has been queued. An error means removal was attempted
    /// and failed.
    pub async fn handle(&mut self, file: &FileInfo) -> Result<bool> {
        let ignored = self.ignores.match_path(&file.name);
        if ignored.is_ignored() && !ignored.is_deletable() {
            debug!("Not deleting ignored {}", file.name);
            return Ok(false);
        }

        if file.is_directory() {
            self.dirs.push(file.name.clone());
            return Ok(false);
        }

        self.handler.delete_file(file, &self.scan).await?;
        Ok(true)
    }

    /// Number of directories waiting for the flush
    pub fn queued(&self) -> usize {
        self.dirs.len()
    }

    /// Remove queued directories from the leaves inward
    ///
    /// Every queued directory is attempted even after failures. Returns the
    /// directories actually removed and the first failure seen.
    pub async fn flush(&mut self) -> (Vec<String>, Option<SyncError>) {
        let mut dirs = std::mem::take(&mut self.dirs);
        dirs.sort_unstable_by(|a, b| b.cmp(a));

        let mut deleted = Vec::new();
        let mut first_error = None;

        for dir in dirs {
            match self.handler.delete_dir(&dir, &self.ignores, &self.scan).await {
                Ok(()) => {
                    debug!("Removed directory {}", dir);
                    deleted.push(dir);
                }
                Err(e) => {
                    debug!("Could not remove directory {}: {}", dir, e);
                    if first_error.is_none() {
                        first_error = Some(e);
                    }
                }
            }
        }

        (deleted, first_error)
    }
}
