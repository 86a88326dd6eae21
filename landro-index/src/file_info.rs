//! File records as stored in the local index

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::ops::{BitAnd, BitOr, Not};

use crate::version::{DeviceId, VersionVector};

/// Kind of filesystem object a record describes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FileType {
    File,
    Directory,
    Symlink,
}

/// Device-local flag bits; these never leave this device
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LocalFlags(u32);

impl LocalFlags {
    pub const NONE: LocalFlags = LocalFlags(0);
    /// Changed locally while the folder is receive-only
    pub const RECEIVE_ONLY: LocalFlags = LocalFlags(1 << 0);
    /// Matched by an ignore pattern at scan time
    pub const IGNORED: LocalFlags = LocalFlags(1 << 1);
    /// Could not be synced and should not be announced
    pub const MUST_RESCAN: LocalFlags = LocalFlags(1 << 2);

    pub const fn bits(self) -> u32 {
        self.0
    }

    pub const fn contains(self, other: LocalFlags) -> bool {
        self.0 & other.0 == other.0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Flags with every bit of `other` cleared
    pub const fn without(self, other: LocalFlags) -> LocalFlags {
        LocalFlags(self.0 & !other.0)
    }
}

impl BitOr for LocalFlags {
    type Output = LocalFlags;

    fn bitor(self, rhs: LocalFlags) -> LocalFlags {
        LocalFlags(self.0 | rhs.0)
    }
}

impl BitAnd for LocalFlags {
    type Output = LocalFlags;

    fn bitand(self, rhs: LocalFlags) -> LocalFlags {
        LocalFlags(self.0 & rhs.0)
    }
}

impl Not for LocalFlags {
    type Output = LocalFlags;

    fn not(self) -> LocalFlags {
        LocalFlags(!self.0)
    }
}

/// Fixed per-record overhead used by [`FileInfo::size_estimate`]
const RECORD_OVERHEAD: usize = 48;
/// Bytes per version vector counter used by [`FileInfo::size_estimate`]
const COUNTER_SIZE: usize = 16;

/// One entry of the local index
///
/// Records are values: changing a record means building a replacement and
/// writing it back, never editing the copy the index holds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileInfo {
    /// Folder-relative path using `/` separators, unique within the index
    pub name: String,
    pub file_type: FileType,
    pub size: u64,
    pub modified_at: DateTime<Utc>,
    pub modified_by: DeviceId,
    pub deleted: bool,
    pub version: VersionVector,
    pub local_flags: LocalFlags,
}

impl FileInfo {
    /// New, non-deleted file record with no history
    pub fn new(name: impl Into<String>, file_type: FileType) -> Self {
        Self {
            name: name.into(),
            file_type,
            size: 0,
            modified_at: Utc::now(),
            modified_by: DeviceId::LOCAL,
            deleted: false,
            version: VersionVector::new(),
            local_flags: LocalFlags::NONE,
        }
    }

    pub fn with_version(mut self, version: VersionVector) -> Self {
        self.version = version;
        self
    }

    pub fn with_flags(mut self, flags: LocalFlags) -> Self {
        self.local_flags = flags;
        self
    }

    pub fn with_size(mut self, size: u64) -> Self {
        self.size = size;
        self
    }

    pub fn with_modified(mut self, modified_at: DateTime<Utc>, modified_by: DeviceId) -> Self {
        self.modified_at = modified_at;
        self.modified_by = modified_by;
        self
    }

    pub fn is_directory(&self) -> bool {
        self.file_type == FileType::Directory
    }

    /// Whether this record was changed locally in a receive-only folder
    pub fn is_receive_only_changed(&self) -> bool {
        self.local_flags.contains(LocalFlags::RECEIVE_ONLY)
    }

    /// Copy of this record with its history dropped and the local-change
    /// mark cleared, so the next pull takes whatever the cluster has.
    pub fn rolled_back(&self) -> FileInfo {
        FileInfo {
            version: VersionVector::new(),
            local_flags: self.local_flags.without(LocalFlags::RECEIVE_ONLY),
            ..self.clone()
        }
    }

    /// Deletion record for this file as performed by `device`
    ///
    /// The version is empty so that, should the file resurface anywhere, our
    /// delete is strictly older than it.
    pub fn deleted_by(&self, device: DeviceId) -> FileInfo {
        FileInfo {
            name: self.name.clone(),
            file_type: self.file_type,
            size: 0,
            modified_at: self.modified_at,
            modified_by: device,
            deleted: true,
            version: VersionVector::new(),
            local_flags: LocalFlags::NONE,
        }
    }

    /// Deletion record for a directory removed at `at` by `device`
    pub fn deleted_directory(name: impl Into<String>, at: DateTime<Utc>, device: DeviceId) -> FileInfo {
        FileInfo {
            name: name.into(),
            file_type: FileType::Directory,
            size: 0,
            modified_at: at,
            modified_by: device,
            deleted: true,
            version: VersionVector::new(),
            local_flags: LocalFlags::NONE,
        }
    }

    /// Approximate encoded size of this record in bytes
    ///
    /// Used to bound index write transactions, not for allocation.
    pub fn size_estimate(&self) -> usize {
        RECORD_OVERHEAD + self.name.len() + COUNTER_SIZE * self.version.len()
    }
}
