//! Arrival-order properties of complete rounds, driven through a coordinator.

use dexact::{CompletenessPolicy, PartitionUpdate, SessionConfig};
use dexact_testkit::fixtures::{connect_memory, Call, RecordingTaker};
use dexact_testkit::generators::{round, RoundParams};
use proptest::prelude::*;

/// Feed `updates` to a fresh coordinator and collect every result until close.
fn run_round(partitions: usize, updates: Vec<PartitionUpdate>) -> (Vec<Call>, Vec<Vec<f64>>) {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap();

    runtime.block_on(async move {
        let (taker, log) = RecordingTaker::new(CompletenessPolicy::count(partitions).unwrap());
        let (mut sim, handle) = connect_memory(taker, SessionConfig::default());

        for update in updates {
            sim.send_update(update.partition_id.get(), update.values, update.cumulative_time)
                .await
                .unwrap();
        }
        sim.close().await.unwrap();

        let mut results = Vec::new();
        while let Some(result) = sim.recv_result().await.unwrap() {
            results.push(result);
        }
        handle.await.unwrap().unwrap();
        (log.calls(), results)
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn test_any_arrival_order_decides_once(updates in round(6, 4.0)) {
        let (calls, results) = run_round(6, updates);

        prop_assert_eq!(results, vec![vec![4.0, 6.0, 1.0]]);
        prop_assert_eq!(calls.len(), 1);
        for (key, values) in calls[0].states.iter() {
            let id = key.as_partition().unwrap().get();
            prop_assert_eq!(values, &vec![id as f64]);
        }
    }

    #[test]
    fn test_repeated_reports_still_decide_once(params: RoundParams) {
        let updates = params
            .arrivals
            .iter()
            .map(|&id| PartitionUpdate::new(id, vec![], 1.0))
            .collect();
        let (calls, results) = run_round(params.partitions, updates);

        prop_assert_eq!(results.len(), 1);
        prop_assert_eq!(calls[0].states.len(), params.partitions);
    }
}
