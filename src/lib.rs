//! Landropic workspace root
//!
//! Re-exports the member crates and hosts integration tests that exercise
//! them together.

pub use landro_index as index;
pub use landro_sync as sync;
