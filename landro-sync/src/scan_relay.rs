//! Relay of touched paths to the folder scanner
//!
//! A revert pass mutates the filesystem directly. Paths it touches, or finds
//! in an unexpected state, are sent here so the scanner can reconcile them
//! instead of later mistaking our own mutations for user changes. The relay
//! task ends when every sender has been dropped.

use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::errors::Result;

/// Rescans parts of a folder on request
#[async_trait]
pub trait Scanner: Send + Sync {
    /// Rescan the given folder-relative paths
    async fn scan_paths(&self, paths: Vec<String>) -> Result<()>;
}

/// Sending half of the relay channel
#[derive(Debug, Clone)]
pub struct ScanSender {
    tx: mpsc::UnboundedSender<String>,
}

impl ScanSender {
    pub fn from_channel(tx: mpsc::UnboundedSender<String>) -> Self {
        Self { tx }
    }

    /// Sender whose messages go nowhere
    pub fn detached() -> Self {
        let (tx, _rx) = mpsc::unbounded_channel();
        Self { tx }
    }

    /// Ask for `path` to be rescanned
    pub fn notify(&self, path: impl Into<String>) {
        let path = path.into();
        if self.tx.send(path).is_err() {
            debug!("Scan relay closed, dropping path");
        }
    }
}

/// Background task forwarding relayed paths to a [`Scanner`]
///
/// Dropping the relay closes our half of the channel, so the task stops on
/// every exit path of its owner. [`ScanRelay::finish`] additionally waits for
/// the last scan to complete.
pub struct ScanRelay {
    sender: ScanSender,
    handle: JoinHandle<usize>,
}

impl ScanRelay {
    /// Spawn the relay task on the current runtime
    pub fn start(scanner: Arc<dyn Scanner>, batch_size: usize) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = tokio::spawn(Self::run(scanner, rx, batch_size.max(1)));
        Self {
            sender: ScanSender::from_channel(tx),
            handle,
        }
    }

    pub fn sender(&self) -> ScanSender {
        self.sender.clone()
    }

    /// Close the channel and wait for the relay to drain
    ///
    /// Returns the number of distinct paths handed to the scanner. Clones of
    /// the sender must be dropped first or this waits for them.
    pub async fn finish(self) -> usize {
        let ScanRelay { sender, handle } = self;
        drop(sender);
        match handle.await {
            Ok(relayed) => relayed,
            Err(e) => {
                warn!("Scan relay task failed: {}", e);
                0
            }
        }
    }

    async fn run(
        scanner: Arc<dyn Scanner>,
        mut rx: mpsc::UnboundedReceiver<String>,
        batch_size: usize,
    ) -> usize {
        let mut seen = HashSet::new();
        let mut pending = Vec::new();

        while let Some(path) = rx.recv().await {
            if !seen.insert(path.clone()) {
                continue;
            }
            pending.push(path);
            if pending.len() >= batch_size {
                Self::scan(scanner.as_ref(), std::mem::take(&mut pending)).await;
            }
        }

        if !pending.is_empty() {
            Self::scan(scanner.as_ref(), pending).await;
        }

        debug!("Scan relay finished after {} paths", seen.len());
        seen.len()
    }

    async fn scan(scanner: &dyn Scanner, paths: Vec<String>) {
        debug!("Relaying {} paths to scanner", paths.len());
        if let Err(e) = scanner.scan_paths(paths).await {
            warn!("Scanning relayed paths failed: {}", e);
        }
    }
}
