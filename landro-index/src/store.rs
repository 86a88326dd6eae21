//! Local index access
//!
//! The revert machinery only needs two things from an index: a snapshot of
//! the records this device has, and a way to write back replacement records
//! in bounded transactions. [`MemoryIndex`] provides both in-process.

use std::collections::BTreeMap;
use std::sync::RwLock;
use tracing::debug;

use crate::errors::{IndexError, Result};
use crate::file_info::FileInfo;

/// Source of the local device's records
pub trait LocalIndex: Send + Sync {
    /// Point-in-time snapshot of local records in index order
    ///
    /// Writes made while the iterator is alive are not observed by it.
    fn local_entries(&self) -> Result<Box<dyn Iterator<Item = FileInfo> + Send + '_>>;
}

/// In-memory index keyed by file name
#[derive(Debug, Default)]
pub struct MemoryIndex {
    files: RwLock<BTreeMap<String, FileInfo>>,
}

impl MemoryIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_entries(entries: impl IntoIterator<Item = FileInfo>) -> Self {
        Self {
            files: RwLock::new(entries.into_iter().map(|f| (f.name.clone(), f)).collect()),
        }
    }

    /// Upsert a batch of records as one atomic write
    pub fn apply_batch(&self, batch: Vec<FileInfo>) -> Result<()> {
        let mut files = self
            .files
            .write()
            .map_err(|_| IndexError::Storage("index lock poisoned".to_string()))?;
        debug!("Applying index batch of {} records", batch.len());
        for file in batch {
            files.insert(file.name.clone(), file);
        }
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<FileInfo> {
        self.files.read().ok()?.get(name).cloned()
    }

    pub fn len(&self) -> usize {
        self.files.read().map(|f| f.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Records currently carrying the receive-only change mark
    pub fn local_changed(&self) -> Vec<FileInfo> {
        self.files
            .read()
            .map(|files| {
                files
                    .values()
                    .filter(|f| f.is_receive_only_changed())
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }
}

impl LocalIndex for MemoryIndex {
    fn local_entries(&self) -> Result<Box<dyn Iterator<Item = FileInfo> + Send + '_>> {
        let snapshot: Vec<FileInfo> = self
            .files
            .read()
            .map_err(|_| IndexError::Storage("index lock poisoned".to_string()))?
            .values()
            .cloned()
            .collect();
        Ok(Box::new(snapshot.into_iter()))
    }
}
