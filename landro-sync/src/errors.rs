//! Error types for sync operations

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Index error: {0}")]
    Index(#[from] landro_index::IndexError),

    #[error("Directory not empty: {0}")]
    NotEmpty(String),

    #[error("File type changed on disk: {0}")]
    TypeMismatch(String),

    #[error("Invalid path: {0}")]
    InvalidPath(String),

    #[error("Scan failed: {0}")]
    Scan(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, SyncError>;
