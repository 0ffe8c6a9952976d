//! Golden wire vectors.
//!
//! Frames are protobuf bytes as exchanged with the simulation. Canonical
//! vectors are exactly what this codec emits; legacy vectors come from
//! peers that predate `schema_version` and must still decode.

use dexact_core::{decode_result, decode_update, encode_result, encode_update, PartitionUpdate};

/// A `PartitionState` frame and the update it carries.
#[derive(Debug, Clone)]
pub struct UpdateVector {
    pub name: &'static str,
    pub partition_id: i64,
    pub cumulative_time: f64,
    pub values: &'static [f64],
    /// Frame bytes (hex).
    pub frame: &'static str,
    /// Whether `encode_update` produces exactly `frame`.
    pub canonical: bool,
}

/// A `State` frame carrying an action vector.
#[derive(Debug, Clone)]
pub struct ResultVector {
    pub name: &'static str,
    pub values: &'static [f64],
    /// Frame bytes (hex).
    pub frame: &'static str,
    /// Whether `encode_result` produces exactly `frame`.
    pub canonical: bool,
}

impl UpdateVector {
    pub fn update(&self) -> PartitionUpdate {
        PartitionUpdate::new(self.partition_id, self.values.to_vec(), self.cumulative_time)
    }

    pub fn frame_bytes(&self) -> Vec<u8> {
        hex::decode(self.frame).unwrap_or_default()
    }
}

impl ResultVector {
    pub fn frame_bytes(&self) -> Vec<u8> {
        hex::decode(self.frame).unwrap_or_default()
    }
}

pub fn update_vectors() -> Vec<UpdateVector> {
    vec![
        UpdateVector {
            name: "all defaults",
            partition_id: 0,
            cumulative_time: 0.0,
            values: &[],
            // zero scalars are omitted; only the empty state and version remain
            frame: "1a007801",
            canonical: true,
        },
        UpdateVector {
            name: "single value",
            partition_id: 2,
            cumulative_time: 1.0,
            values: &[3.0],
            frame: "09000000000000f03f10021a0a0a0800000000000008407801",
            canonical: true,
        },
        UpdateVector {
            name: "negative partition id",
            partition_id: -1,
            cumulative_time: 2.5,
            values: &[1.5, -0.5],
            frame: "09000000000000044010ffffffffffffffffff011a120a10000000000000f83f000000000000e0bf7801",
            canonical: true,
        },
        UpdateVector {
            name: "legacy three values",
            partition_id: 7,
            cumulative_time: 12.0,
            values: &[0.25, 0.5, 0.75],
            frame: "09000000000000284010071a1a0a18000000000000d03f000000000000e03f000000000000e83f",
            canonical: false,
        },
        UpdateVector {
            name: "legacy missing state",
            partition_id: 1,
            cumulative_time: 3.0,
            values: &[],
            frame: "0900000000000008401001",
            canonical: false,
        },
    ]
}

pub fn result_vectors() -> Vec<ResultVector> {
    vec![
        ResultVector {
            name: "empty action",
            values: &[],
            frame: "7801",
            canonical: true,
        },
        ResultVector {
            name: "single action",
            values: &[1.5],
            frame: "0a08000000000000f83f7801",
            canonical: true,
        },
        ResultVector {
            name: "traffic light phases",
            values: &[0.0, 1.0],
            frame: "0a100000000000000000000000000000f03f7801",
            canonical: true,
        },
        ResultVector {
            name: "legacy mixed values",
            values: &[-2.0, 4.5, 0.1],
            frame: "0a1800000000000000c000000000000012409a9999999999b93f",
            canonical: false,
        },
    ]
}

/// Check every vector, collecting a message per mismatch.
pub fn verify_all_vectors() -> Result<(), Vec<String>> {
    let mut failures = Vec::new();

    for vector in update_vectors() {
        let frame = vector.frame_bytes();
        match decode_update(&frame) {
            Ok(update) if update == vector.update() => {}
            Ok(update) => failures.push(format!("{}: decoded {:?}", vector.name, update)),
            Err(e) => failures.push(format!("{}: {}", vector.name, e)),
        }
        if vector.canonical && encode_update(&vector.update()).as_ref() != frame.as_slice() {
            failures.push(format!("{}: encoding differs", vector.name));
        }
    }

    for vector in result_vectors() {
        let frame = vector.frame_bytes();
        match decode_result(&frame) {
            Ok(values) if values == vector.values => {}
            Ok(values) => failures.push(format!("{}: decoded {:?}", vector.name, values)),
            Err(e) => failures.push(format!("{}: {}", vector.name, e)),
        }
        if vector.canonical && encode_result(vector.values).as_ref() != frame.as_slice() {
            failures.push(format!("{}: encoding differs", vector.name));
        }
    }

    if failures.is_empty() {
        Ok(())
    } else {
        Err(failures)
    }
}
