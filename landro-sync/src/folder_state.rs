//! Folder status reporting and pull requests

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::{watch, Notify};
use tracing::trace;

/// Externally visible activity of a folder
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FolderState {
    Idle,
    Scanning,
}

/// Receives folder state changes
pub trait StatusReporter: Send + Sync {
    fn set_state(&self, state: FolderState);
}

/// Triggers the pull side of a folder
pub trait PullScheduler: Send + Sync {
    /// Ask for a pull soon; repeated requests before it runs coalesce
    fn request_pull(&self);
}

/// Sets a state on creation and restores [`FolderState::Idle`] on drop
pub struct StateGuard<'a> {
    reporter: &'a dyn StatusReporter,
}

impl<'a> StateGuard<'a> {
    pub fn enter(reporter: &'a dyn StatusReporter, state: FolderState) -> Self {
        reporter.set_state(state);
        Self { reporter }
    }
}

impl Drop for StateGuard<'_> {
    fn drop(&mut self) {
        self.reporter.set_state(FolderState::Idle);
    }
}

/// Folder state observable by status consumers
#[derive(Debug)]
pub struct FolderStatus {
    tx: watch::Sender<FolderState>,
}

impl FolderStatus {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(FolderState::Idle);
        Self { tx }
    }

    pub fn current(&self) -> FolderState {
        *self.tx.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<FolderState> {
        self.tx.subscribe()
    }
}

impl Default for FolderStatus {
    fn default() -> Self {
        Self::new()
    }
}

impl StatusReporter for FolderStatus {
    fn set_state(&self, state: FolderState) {
        trace!("Folder state -> {:?}", state);
        self.tx.send_replace(state);
    }
}

/// Coalescing pull trigger
#[derive(Debug, Default)]
pub struct PullSignal {
    notify: Notify,
    requests: AtomicU64,
}

impl PullSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of pull requests received
    pub fn requests(&self) -> u64 {
        self.requests.load(Ordering::Relaxed)
    }

    /// Wait until a pull has been requested
    pub async fn requested(&self) {
        self.notify.notified().await;
    }
}

impl PullScheduler for PullSignal {
    fn request_pull(&self) {
        self.requests.fetch_add(1, Ordering::Relaxed);
        self.notify.notify_one();
    }
}
