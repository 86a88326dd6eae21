//! Revert configuration

use serde::{Deserialize, Serialize};

use crate::errors::{Result, SyncError};

/// Maximum number of records written to the index in one transaction
pub const MAX_BATCH_SIZE_FILES: usize = 1000;
/// Maximum estimated size of one index transaction
pub const MAX_BATCH_SIZE_BYTES: usize = 250 * 1024;
/// Relayed paths handed to the scanner at once
pub const SCAN_BATCH_SIZE: usize = 100;

/// Tunables for a revert pass
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RevertConfig {
    /// Flush the pending index batch once it holds this many records
    pub max_batch_files: usize,
    /// Flush the pending index batch once its size estimate reaches this
    pub max_batch_bytes: usize,
    /// Number of touched paths the scan relay collects before scanning
    pub scan_batch_size: usize,
}

impl Default for RevertConfig {
    fn default() -> Self {
        Self {
            max_batch_files: MAX_BATCH_SIZE_FILES,
            max_batch_bytes: MAX_BATCH_SIZE_BYTES,
            scan_batch_size: SCAN_BATCH_SIZE,
        }
    }
}

impl RevertConfig {
    /// Parse and validate a TOML document; missing keys take defaults
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: RevertConfig =
            toml::from_str(content).map_err(|e| SyncError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_batch_files == 0 {
            return Err(SyncError::Config("max_batch_files must be at least 1".to_string()));
        }
        if self.max_batch_bytes == 0 {
            return Err(SyncError::Config("max_batch_bytes must be at least 1".to_string()));
        }
        if self.scan_batch_size == 0 {
            return Err(SyncError::Config("scan_batch_size must be at least 1".to_string()));
        }
        Ok(())
    }
}
