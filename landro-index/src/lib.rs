//! Local file index model for landropic
//!
//! Version vectors, file records with their device-local flags, ignore
//! pattern matching and the index access traits used by folder services.

pub mod errors;
pub mod file_info;
pub mod ignore;
pub mod store;
pub mod version;

pub use errors::{IndexError, Result};
pub use file_info::{FileInfo, FileType, LocalFlags};
pub use ignore::{IgnoreMatcher, IgnoreResult};
pub use store::{LocalIndex, MemoryIndex};
pub use version::{DeviceId, VectorOrdering, VersionVector};
