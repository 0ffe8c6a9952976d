//! Proptest generators for property-based testing.

use proptest::prelude::*;

use dexact_core::{PartitionId, PartitionUpdate};

/// A partition id, including negatives.
pub fn partition_id() -> impl Strategy<Value = PartitionId> {
    (-1000i64..=1000).prop_map(PartitionId)
}

/// A finite state value.
pub fn state_value() -> impl Strategy<Value = f64> {
    prop::num::f64::NORMAL | prop::num::f64::ZERO | prop::num::f64::SUBNORMAL
}

/// A state vector of up to `max_len` values.
pub fn state_values(max_len: usize) -> impl Strategy<Value = Vec<f64>> {
    prop::collection::vec(state_value(), 0..=max_len)
}

/// A non-negative simulated time.
pub fn cumulative_time() -> impl Strategy<Value = f64> {
    0.0f64..1.0e6
}

/// An arbitrary update.
pub fn partition_update() -> impl Strategy<Value = PartitionUpdate> {
    (partition_id(), state_values(16), cumulative_time()).prop_map(|(id, values, time)| {
        PartitionUpdate {
            partition_id: id,
            values,
            cumulative_time: time,
        }
    })
}

/// Ids `0..n` in a random order.
pub fn shuffled_ids(n: usize) -> impl Strategy<Value = Vec<i64>> {
    Just((0..n as i64).collect::<Vec<_>>()).prop_shuffle()
}

/// One round of updates: ids `0..n` in a random order, all at `time`.
///
/// Each partition's single value equals its id, so a decision can check
/// which states it was handed.
pub fn round(n: usize, time: f64) -> impl Strategy<Value = Vec<PartitionUpdate>> {
    shuffled_ids(n).prop_map(move |ids| {
        ids.into_iter()
            .map(|id| PartitionUpdate::new(id, vec![id as f64], time))
            .collect()
    })
}

/// Parameters for a round with repeated reports.
#[derive(Debug, Clone)]
pub struct RoundParams {
    /// Number of distinct partitions the round needs.
    pub partitions: usize,
    /// Arrival order of updates; every id in `0..partitions` appears at
    /// least once and the last id listed completes the round.
    pub arrivals: Vec<i64>,
}

impl Arbitrary for RoundParams {
    type Parameters = ();
    type Strategy = BoxedStrategy<Self>;

    fn arbitrary_with(_: Self::Parameters) -> Self::Strategy {
        (1usize..=8)
            .prop_flat_map(|n| {
                let repeats = prop::collection::vec(0..n as i64, 0..8);
                (Just(n), shuffled_ids(n), repeats)
            })
            .prop_map(|(partitions, order, repeats)| {
                // repeats go before the final first-time arrival
                let (last, firsts) = order.split_last().map_or((0, &[][..]), |(l, f)| (*l, f));
                let mut arrivals: Vec<i64> = firsts.to_vec();
                arrivals.extend(repeats.into_iter().filter(|id| *id != last));
                arrivals.push(last);
                RoundParams {
                    partitions,
                    arrivals,
                }
            })
            .boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dexact_core::{Aggregator, CompletenessPolicy};

    proptest! {
        #[test]
        fn test_round_completes_on_last_update(updates in round(5, 2.0)) {
            let policy = CompletenessPolicy::count(5).unwrap();
            let mut agg = Aggregator::new();

            for (i, update) in updates.into_iter().enumerate() {
                prop_assert!(!agg.is_complete(&policy));
                let key = policy.key_for(update.partition_id).unwrap();
                agg.insert(key, update.values, update.cumulative_time);
                prop_assert_eq!(agg.is_complete(&policy), i == 4);
            }
        }

        #[test]
        fn test_round_params_complete_exactly_at_end(params: RoundParams) {
            let policy = CompletenessPolicy::count(params.partitions).unwrap();
            let mut agg = Aggregator::new();
            let last = params.arrivals.len() - 1;

            for (i, id) in params.arrivals.iter().enumerate() {
                let key = policy.key_for(PartitionId(*id)).unwrap();
                agg.insert(key, vec![], 0.0);
                prop_assert_eq!(agg.is_complete(&policy), i == last);
            }
        }
    }
}
