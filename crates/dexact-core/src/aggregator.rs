//! Per-round aggregation buffer.
//!
//! The aggregator collects the latest values per key until the active
//! completeness policy is satisfied. It belongs to exactly one connection
//! and is reset, never recreated, between rounds.

use std::collections::btree_map;
use std::collections::BTreeMap;

use crate::policy::CompletenessPolicy;
use crate::types::{PartitionId, StateKey};

/// Outcome of [`Aggregator::insert`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    /// The key had no entry in this round.
    Inserted,
    /// The key already had an entry; it was overwritten.
    Replaced,
}

/// Buffer of partition states for the round in progress.
#[derive(Debug, Default)]
pub struct Aggregator {
    entries: BTreeMap<StateKey, Vec<f64>>,
    /// Time of the most recent insert; `None` after a reset.
    round_time: Option<f64>,
}

impl Aggregator {
    /// Create an empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the values for `key`, replacing any earlier entry.
    ///
    /// `round_time` always takes the time of the latest insert.
    pub fn insert(&mut self, key: StateKey, values: Vec<f64>, time: f64) -> InsertOutcome {
        self.round_time = Some(time);
        match self.entries.insert(key, values) {
            Some(_) => InsertOutcome::Replaced,
            None => InsertOutcome::Inserted,
        }
    }

    /// Whether the buffered entries satisfy `policy`.
    pub fn is_complete(&self, policy: &CompletenessPolicy) -> bool {
        match policy {
            CompletenessPolicy::CountThreshold(n) => self.entries.len() == *n,
            CompletenessPolicy::KeyedSet(map) => map.values().all(|name| {
                self.entries
                    .keys()
                    .any(|key| key.as_name() == Some(name.as_str()))
            }),
        }
    }

    /// Copy the buffer out for a decision.
    ///
    /// Returns `None` if nothing was inserted since the last reset.
    pub fn snapshot(&self) -> Option<Snapshot> {
        let time = self.round_time?;
        Some(Snapshot {
            time,
            states: StateMap(self.entries.clone()),
        })
    }

    /// Drop every entry and forget the round time.
    pub fn reset(&mut self) {
        self.entries.clear();
        self.round_time = None;
    }

    /// Number of distinct keys buffered.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the buffer holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether `key` has an entry in the current round.
    pub fn contains(&self, key: &StateKey) -> bool {
        self.entries.contains_key(key)
    }

    /// Time of the latest insert in the current round.
    pub fn round_time(&self) -> Option<f64> {
        self.round_time
    }
}

/// Independent copy of a complete round, handed to the action taker.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    /// Authoritative round time (last write wins).
    pub time: f64,
    /// Buffered states by key.
    pub states: StateMap,
}

/// Read-only view of the states in a snapshot.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StateMap(BTreeMap<StateKey, Vec<f64>>);

impl StateMap {
    /// States of a partition buffered by id.
    pub fn partition(&self, id: i64) -> Option<&[f64]> {
        self.get(&StateKey::Partition(PartitionId(id)))
    }

    /// States buffered under a logical name.
    pub fn named(&self, name: &str) -> Option<&[f64]> {
        self.0
            .iter()
            .find(|(key, _)| key.as_name() == Some(name))
            .map(|(_, values)| values.as_slice())
    }

    pub fn get(&self, key: &StateKey) -> Option<&[f64]> {
        self.0.get(key).map(Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> btree_map::Iter<'_, StateKey, Vec<f64>> {
        self.0.iter()
    }

    /// Take ownership of the underlying map.
    pub fn into_inner(self) -> BTreeMap<StateKey, Vec<f64>> {
        self.0
    }
}

impl FromIterator<(StateKey, Vec<f64>)> for StateMap {
    fn from_iter<I: IntoIterator<Item = (StateKey, Vec<f64>)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a StateMap {
    type Item = (&'a StateKey, &'a Vec<f64>);
    type IntoIter = btree_map::Iter<'a, StateKey, Vec<f64>>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn pid(id: i64) -> StateKey {
        StateKey::Partition(PartitionId(id))
    }

    #[test]
    fn test_insert_overwrites_and_tracks_latest_time() {
        let mut agg = Aggregator::new();
        assert_eq!(agg.insert(pid(0), vec![1.0], 1.0), InsertOutcome::Inserted);
        assert_eq!(agg.insert(pid(0), vec![2.0], 3.0), InsertOutcome::Replaced);

        let snap = agg.snapshot().unwrap();
        assert_eq!(snap.time, 3.0);
        assert_eq!(snap.states.partition(0), Some(&[2.0][..]));
        assert_eq!(agg.len(), 1);
    }

    #[test]
    fn test_time_is_last_write_even_if_older() {
        let mut agg = Aggregator::new();
        agg.insert(pid(0), vec![], 5.0);
        agg.insert(pid(1), vec![], 4.0);
        assert_eq!(agg.round_time(), Some(4.0));
    }

    #[test]
    fn test_reset_clears_everything() {
        let policy = CompletenessPolicy::count(1).unwrap();
        let mut agg = Aggregator::new();
        agg.insert(pid(2), vec![1.0], 1.0);
        assert!(agg.is_complete(&policy));

        agg.reset();
        assert!(agg.is_empty());
        assert_eq!(agg.round_time(), None);
        assert!(agg.snapshot().is_none());
        assert!(!agg.is_complete(&policy));

        let keyed = CompletenessPolicy::keyed([(0, "actions"), (1, "signals")]).unwrap();
        agg.insert(StateKey::from("actions"), vec![1.0], 2.0);
        agg.insert(StateKey::from("signals"), vec![2.0], 2.0);
        assert!(agg.is_complete(&keyed));

        agg.reset();
        assert!(agg.is_empty());
        assert!(!agg.is_complete(&keyed));
    }

    #[test]
    fn test_snapshot_is_independent() {
        let mut agg = Aggregator::new();
        agg.insert(pid(0), vec![1.0, 2.0], 1.0);
        let snap = agg.snapshot().unwrap();

        agg.insert(pid(0), vec![9.0], 2.0);
        agg.reset();

        assert_eq!(snap.time, 1.0);
        assert_eq!(snap.states.partition(0), Some(&[1.0, 2.0][..]));
    }

    #[test]
    fn test_is_complete_is_repeatable() {
        let policy = CompletenessPolicy::count(2).unwrap();
        let mut agg = Aggregator::new();
        agg.insert(pid(0), vec![], 0.0);
        agg.insert(pid(1), vec![], 0.0);
        assert!(agg.is_complete(&policy));
        assert!(agg.is_complete(&policy));
        assert_eq!(agg.len(), 2);
    }

    #[test]
    fn test_keyed_set_ignores_partition_keys() {
        let policy = CompletenessPolicy::keyed([(0, "actions")]).unwrap();
        let mut agg = Aggregator::new();
        agg.insert(pid(0), vec![1.0], 0.0);
        assert!(!agg.is_complete(&policy));
        agg.insert(StateKey::from("actions"), vec![1.0], 0.0);
        assert!(agg.is_complete(&policy));
    }

    #[test]
    fn test_state_map_lookup_by_name() {
        let states: StateMap = [(StateKey::from("actions"), vec![2.0])].into_iter().collect();
        assert_eq!(states.named("actions"), Some(&[2.0][..]));
        assert_eq!(states.named("missing"), None);
    }

    proptest! {
        #[test]
        fn test_count_completeness_order_independent(
            ids in (1usize..12).prop_flat_map(|n| Just((0..n as i64).collect::<Vec<_>>()).prop_shuffle())
        ) {
            let policy = CompletenessPolicy::count(ids.len()).unwrap();
            let mut agg = Aggregator::new();
            let mut fired = 0;

            for (i, id) in ids.iter().enumerate() {
                prop_assert!(!agg.is_complete(&policy));
                agg.insert(pid(*id), vec![*id as f64], 1.0);
                if agg.is_complete(&policy) {
                    fired += 1;
                    prop_assert_eq!(i + 1, ids.len());
                }
            }
            prop_assert_eq!(fired, 1);
        }

        #[test]
        fn test_keyed_completeness_with_duplicates(
            order in Just(vec![0i64, 1, 2]).prop_shuffle(),
            dups in prop::collection::vec(0i64..3, 0..6),
        ) {
            let policy = CompletenessPolicy::keyed([(0, "a"), (1, "b"), (2, "c")]).unwrap();
            let mut agg = Aggregator::new();

            // duplicates of the first-arriving name land before the rest
            let first = order[0];
            for _ in &dups {
                agg.insert(policy.key_for(PartitionId(first)).unwrap(), vec![0.0], 0.0);
                prop_assert!(!agg.is_complete(&policy));
            }
            for (i, id) in order.iter().enumerate() {
                agg.insert(policy.key_for(PartitionId(*id)).unwrap(), vec![1.0], 1.0);
                prop_assert_eq!(agg.is_complete(&policy), i == 2);
            }
        }
    }
}
