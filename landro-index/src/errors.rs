use thiserror::Error;

#[derive(Error, Debug)]
pub enum IndexError {
    #[error("Invalid ignore pattern {pattern:?}: {reason}")]
    InvalidPattern { pattern: String, reason: String },

    #[error("Storage error: {0}")]
    Storage(String),
}

pub type Result<T> = std::result::Result<T, IndexError>;
