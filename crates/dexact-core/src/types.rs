//! Strong type definitions for dexact.
//!
//! Partition ids and buffer keys are newtypes so an id can never be
//! confused with an index into a state vector.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a simulation partition.
///
/// Carried as int64 on the wire; peers that encode the id as int32 decode
/// to the same value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PartitionId(pub i64);

impl PartitionId {
    /// Get the raw id.
    pub const fn get(self) -> i64 {
        self.0
    }
}

impl fmt::Display for PartitionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for PartitionId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

/// Key under which a partition's latest values are buffered.
///
/// Which variant is used depends on the completeness policy: count
/// thresholds key by raw partition id, keyed sets by logical name.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum StateKey {
    /// Raw partition id.
    Partition(PartitionId),
    /// Logical name assigned by a keyed-set policy.
    Named(String),
}

impl StateKey {
    /// The partition id, if this key is id-based.
    pub fn as_partition(&self) -> Option<PartitionId> {
        match self {
            StateKey::Partition(id) => Some(*id),
            StateKey::Named(_) => None,
        }
    }

    /// The logical name, if this key is name-based.
    pub fn as_name(&self) -> Option<&str> {
        match self {
            StateKey::Partition(_) => None,
            StateKey::Named(name) => Some(name),
        }
    }
}

impl fmt::Display for StateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StateKey::Partition(id) => write!(f, "#{}", id),
            StateKey::Named(name) => f.write_str(name),
        }
    }
}

impl From<PartitionId> for StateKey {
    fn from(id: PartitionId) -> Self {
        StateKey::Partition(id)
    }
}

impl From<&str> for StateKey {
    fn from(name: &str) -> Self {
        StateKey::Named(name.to_string())
    }
}

impl From<String> for StateKey {
    fn from(name: String) -> Self {
        StateKey::Named(name)
    }
}
