//! Completeness policies: when does a set of partition updates form a round.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::error::PolicyError;
use crate::types::{PartitionId, StateKey};

/// Rule deciding when the buffered updates constitute a complete snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompletenessPolicy {
    /// Complete once updates for `n` distinct partition ids have arrived.
    ///
    /// States are keyed by [`StateKey::Partition`].
    CountThreshold(usize),

    /// Complete once every logical name in the map's range has an update.
    ///
    /// States are keyed by [`StateKey::Named`]. Several ids may share a
    /// name; the most recent of them wins.
    KeyedSet(BTreeMap<PartitionId, String>),
}

impl CompletenessPolicy {
    /// Expect exactly `n` distinct partitions per round.
    pub fn count(n: usize) -> Result<Self, PolicyError> {
        let policy = CompletenessPolicy::CountThreshold(n);
        policy.validate()?;
        Ok(policy)
    }

    /// Expect one update per logical name, keyed by partition id.
    pub fn keyed<I, S>(entries: I) -> Result<Self, PolicyError>
    where
        I: IntoIterator<Item = (i64, S)>,
        S: Into<String>,
    {
        let map = entries
            .into_iter()
            .map(|(id, name)| (PartitionId(id), name.into()))
            .collect();
        let policy = CompletenessPolicy::KeyedSet(map);
        policy.validate()?;
        Ok(policy)
    }

    /// Check that the policy can ever be satisfied.
    pub fn validate(&self) -> Result<(), PolicyError> {
        match self {
            CompletenessPolicy::CountThreshold(0) => Err(PolicyError::ZeroCount),
            CompletenessPolicy::CountThreshold(_) => Ok(()),
            CompletenessPolicy::KeyedSet(map) => {
                if map.is_empty() {
                    return Err(PolicyError::EmptyKeyedSet);
                }
                if let Some((id, _)) = map.iter().find(|(_, name)| name.is_empty()) {
                    return Err(PolicyError::EmptyName(id.get()));
                }
                Ok(())
            }
        }
    }

    /// Map a partition id to the key its values are buffered under.
    ///
    /// Returns `None` when a keyed set does not mention the id.
    pub fn key_for(&self, id: PartitionId) -> Option<StateKey> {
        match self {
            CompletenessPolicy::CountThreshold(_) => Some(StateKey::Partition(id)),
            CompletenessPolicy::KeyedSet(map) => map.get(&id).cloned().map(StateKey::Named),
        }
    }

    /// Number of distinct keys a complete round holds.
    pub fn required(&self) -> usize {
        match self {
            CompletenessPolicy::CountThreshold(n) => *n,
            CompletenessPolicy::KeyedSet(_) => self.required_names().len(),
        }
    }

    /// Distinct logical names a keyed set waits for (empty for count thresholds).
    pub fn required_names(&self) -> BTreeSet<&str> {
        match self {
            CompletenessPolicy::CountThreshold(_) => BTreeSet::new(),
            CompletenessPolicy::KeyedSet(map) => map.values().map(String::as_str).collect(),
        }
    }
}

/// How the coordinator treats a second update for a key within one round.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicatePolicy {
    /// The newest values and time replace the old ones.
    #[default]
    Overwrite,
    /// A duplicate is a protocol violation and closes the connection.
    Reject,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_count_zero_rejected() {
        assert_eq!(CompletenessPolicy::count(0), Err(PolicyError::ZeroCount));
        assert!(CompletenessPolicy::count(1).is_ok());
    }

    #[test]
    fn test_keyed_empty_rejected() {
        let empty: Vec<(i64, &str)> = vec![];
        assert_eq!(CompletenessPolicy::keyed(empty), Err(PolicyError::EmptyKeyedSet));
        assert_eq!(
            CompletenessPolicy::keyed([(4, "")]),
            Err(PolicyError::EmptyName(4))
        );
    }

    #[test]
    fn test_key_for_count_threshold() {
        let policy = CompletenessPolicy::count(3).unwrap();
        assert_eq!(
            policy.key_for(PartitionId(9)),
            Some(StateKey::Partition(PartitionId(9)))
        );
        assert_eq!(policy.required(), 3);
    }

    #[test]
    fn test_key_for_keyed_set() {
        let policy = CompletenessPolicy::keyed([(0, "actions"), (1, "proc1")]).unwrap();
        assert_eq!(policy.key_for(PartitionId(1)), Some(StateKey::from("proc1")));
        assert_eq!(policy.key_for(PartitionId(2)), None);
        assert_eq!(policy.required(), 2);
    }

    #[test]
    fn test_shared_names_count_once() {
        let policy = CompletenessPolicy::keyed([(0, "edges"), (1, "edges"), (2, "lights")]).unwrap();
        assert_eq!(policy.required(), 2);
    }

    #[test]
    fn test_duplicate_policy_serde() {
        let parsed: DuplicatePolicy = serde_json::from_str("\"reject\"").unwrap();
        assert_eq!(parsed, DuplicatePolicy::Reject);
        assert_eq!(DuplicatePolicy::default(), DuplicatePolicy::Overwrite);
    }
}
