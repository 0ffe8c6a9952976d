//! Golden wire vectors for compatibility with the simulation's protobuf schema.
//!
//! Every frame listed in the testkit must decode to its documented
//! contents, canonical frames must be reproduced byte for byte, and legacy
//! frames must drive a full round through a coordinator.

use dexact::core::{decode_update, encode_result, FnTaker};
use dexact::{CompletenessPolicy, SessionConfig, StateMap};
use dexact_testkit::fixtures::connect_memory;
use dexact_testkit::vectors::{result_vectors, update_vectors, verify_all_vectors};

#[test]
fn test_all_vectors_verify() {
    if let Err(failures) = verify_all_vectors() {
        panic!("golden vector failures:\n{}", failures.join("\n"));
    }
}

#[test]
fn test_canonical_results_match_bytes() {
    for vector in result_vectors().into_iter().filter(|v| v.canonical) {
        assert_eq!(
            hex::encode(encode_result(vector.values)),
            vector.frame,
            "{}",
            vector.name
        );
    }
}

#[test]
fn test_legacy_updates_decode() {
    for vector in update_vectors().into_iter().filter(|v| !v.canonical) {
        let update = decode_update(&vector.frame_bytes()).unwrap();
        assert_eq!(update, vector.update(), "{}", vector.name);
    }
}

#[tokio::test]
async fn test_legacy_frames_complete_a_round() {
    let legacy: Vec<_> = update_vectors().into_iter().filter(|v| !v.canonical).collect();
    let taker = FnTaker::new(
        CompletenessPolicy::count(legacy.len()).unwrap(),
        |time, states: StateMap| {
            let total: f64 = states.iter().flat_map(|(_, v)| v.iter()).sum();
            Ok(vec![time, total])
        },
    );
    let (mut sim, handle) = connect_memory(taker, SessionConfig::default());

    for vector in &legacy {
        sim.send_raw(vector.frame_bytes()).await.unwrap();
    }

    let result = sim.recv_result().await.unwrap().unwrap();
    let last = legacy.last().unwrap();
    let expected_total: f64 = legacy.iter().flat_map(|v| v.values.iter()).sum();
    assert_eq!(result, vec![last.cumulative_time, expected_total]);

    sim.close().await.unwrap();
    handle.await.unwrap().unwrap();
}
