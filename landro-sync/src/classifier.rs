//! Deciding how to undo a local change

use landro_index::{DeviceId, FileInfo};

/// What reverting a record requires
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RevertAction {
    /// Not changed locally; nothing to undo
    None,
    /// Only this device ever had the file, so it goes away entirely
    Delete,
    /// The file has history elsewhere; drop our version so the next pull
    /// takes the cluster's copy without raising a conflict
    RollBack,
}

/// Classify a record for the revert pass of device `local`
pub fn classify(file: &FileInfo, local: DeviceId) -> RevertAction {
    if !file.is_receive_only_changed() {
        return RevertAction::None;
    }

    if file.version.is_only(local) {
        RevertAction::Delete
    } else {
        RevertAction::RollBack
    }
}
