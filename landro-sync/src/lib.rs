//! Receive-only folder reconciliation for landropic
//!
//! This crate undoes local changes made in a receive-only folder:
//! - Classifying locally changed records as local-only or shared history
//! - Deleting local-only files immediately and directories leaves-first
//! - Rolling back shared records to the empty version vector
//! - Writing replacement records in bounded index batches
//! - Relaying touched paths to the folder scanner

pub mod batch;
pub mod classifier;
pub mod config;
pub mod delete_queue;
pub mod errors;
pub mod folder_state;
pub mod fs_delete;
pub mod revert;
pub mod scan_relay;

pub use batch::UpdateBatch;
pub use classifier::{classify, RevertAction};
pub use config::RevertConfig;
pub use delete_queue::{DeleteHandler, DeleteQueue};
pub use errors::{Result, SyncError};
pub use folder_state::{
    FolderState, FolderStatus, PullScheduler, PullSignal, StateGuard, StatusReporter,
};
pub use fs_delete::FolderFs;
pub use revert::ReceiveOnlyFolder;
pub use scan_relay::{ScanRelay, ScanSender, Scanner};
