//! Version vectors for file history
//!
//! Every file record carries a version vector: one logical counter per
//! device that has modified the file. Comparing two vectors tells us whether
//! one history contains the other or whether they diverged.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;

/// Short numeric identity of a device, as recorded in version vectors
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DeviceId(pub u64);

impl DeviceId {
    /// Placeholder identity for "this device" in index queries
    pub const LOCAL: DeviceId = DeviceId(0);
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016X}", self.0)
    }
}

/// Relationship between two version vectors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VectorOrdering {
    Equal,
    /// Self strictly dominates the other vector
    Greater,
    /// The other vector strictly dominates self
    Lesser,
    /// Neither dominates; the histories diverged
    Concurrent,
}

/// Per-device logical clock for a single file
///
/// The empty vector is strictly older than every non-empty vector and never
/// concurrent with anything, which makes it the canonical "drop my history"
/// value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionVector {
    counters: BTreeMap<DeviceId, u64>,
}

impl VersionVector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a vector from (device, counter) pairs; later pairs win on duplicates
    pub fn from_counters(counters: impl IntoIterator<Item = (DeviceId, u64)>) -> Self {
        Self {
            counters: counters.into_iter().collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.counters.is_empty()
    }

    pub fn len(&self) -> usize {
        self.counters.len()
    }

    /// Counter recorded for `device`, zero when absent
    pub fn counter(&self, device: DeviceId) -> u64 {
        self.counters.get(&device).copied().unwrap_or(0)
    }

    pub fn counters(&self) -> impl Iterator<Item = (DeviceId, u64)> + '_ {
        self.counters.iter().map(|(id, value)| (*id, *value))
    }

    /// The only device in the vector, if exactly one is present
    pub fn single_owner(&self) -> Option<DeviceId> {
        if self.counters.len() == 1 {
            self.counters.keys().next().copied()
        } else {
            None
        }
    }

    /// True when `device` is the only device that ever touched this history
    pub fn is_only(&self, device: DeviceId) -> bool {
        self.single_owner() == Some(device)
    }

    /// Record a new local modification by `device`
    ///
    /// The counter becomes strictly greater than every counter currently in
    /// the vector so the result dominates anything this device has seen.
    pub fn update(&mut self, device: DeviceId) {
        let next = self.counters.values().copied().max().unwrap_or(0) + 1;
        let entry = self.counters.entry(device).or_insert(0);
        *entry = (*entry + 1).max(next);
    }

    /// Pointwise maximum of both vectors
    pub fn merge(&mut self, other: &VersionVector) {
        for (device, &value) in &other.counters {
            let entry = self.counters.entry(*device).or_insert(0);
            *entry = (*entry).max(value);
        }
    }

    pub fn compare(&self, other: &VersionVector) -> VectorOrdering {
        let mut greater = false;
        let mut lesser = false;

        for device in self.counters.keys().chain(other.counters.keys()) {
            match self.counter(*device).cmp(&other.counter(*device)) {
                Ordering::Greater => greater = true,
                Ordering::Less => lesser = true,
                Ordering::Equal => {}
            }
            if greater && lesser {
                return VectorOrdering::Concurrent;
            }
        }

        match (greater, lesser) {
            (true, false) => VectorOrdering::Greater,
            (false, true) => VectorOrdering::Lesser,
            _ => VectorOrdering::Equal,
        }
    }

    pub fn is_concurrent(&self, other: &VersionVector) -> bool {
        self.compare(other) == VectorOrdering::Concurrent
    }
}

impl fmt::Display for VersionVector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, (device, value)) in self.counters().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}:{}", device, value)?;
        }
        write!(f, "}}")
    }
}
