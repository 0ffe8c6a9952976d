//! Protobuf wire codec.
//!
//! The schema matches `partition_state.proto` used by the simulation:
//!
//! ```text
//! message PartitionState {
//!   double cumulative_timesteps = 1;
//!   int64  partition_index      = 2;
//!   State  state                = 3;
//!   optional uint32 schema_version = 15;
//! }
//! message State {
//!   repeated double values = 1;
//!   optional uint32 schema_version = 15;
//! }
//! ```
//!
//! Protobuf skips unknown fields, so adding fields never breaks older
//! decoders. `schema_version` is bumped only for breaking changes; frames
//! without it come from legacy peers and are treated as version 1.

use bytes::Bytes;
use prost::Message;

use crate::error::WireError;
use crate::types::PartitionId;
use crate::update::PartitionUpdate;

/// Schema version stamped on every encoded frame.
pub const SCHEMA_VERSION: u32 = 1;

/// Frames larger than this are rejected before decoding.
pub const MAX_FRAME_BYTES: usize = 16 * 1024 * 1024;

/// A state vector; also the `Result` message sent back to the simulation.
#[derive(Clone, PartialEq, Message)]
pub struct State {
    #[prost(double, repeated, tag = "1")]
    pub values: Vec<f64>,
    #[prost(uint32, optional, tag = "15")]
    pub schema_version: Option<u32>,
}

/// One partition's state at one time; the `Update` message.
#[derive(Clone, PartialEq, Message)]
pub struct PartitionState {
    #[prost(double, tag = "1")]
    pub cumulative_timesteps: f64,
    #[prost(int64, tag = "2")]
    pub partition_index: i64,
    #[prost(message, optional, tag = "3")]
    pub state: Option<State>,
    #[prost(uint32, optional, tag = "15")]
    pub schema_version: Option<u32>,
}

/// Encode an action result for the simulation.
pub fn encode_result(values: &[f64]) -> Bytes {
    let msg = State {
        values: values.to_vec(),
        schema_version: Some(SCHEMA_VERSION),
    };
    Bytes::from(msg.encode_to_vec())
}

/// Decode an incoming update frame.
pub fn decode_update(frame: &[u8]) -> Result<PartitionUpdate, WireError> {
    check_size(frame)?;
    let msg = PartitionState::decode(frame)?;
    check_version(msg.schema_version)?;

    let values = match msg.state {
        Some(state) => {
            check_version(state.schema_version)?;
            state.values
        }
        None => Vec::new(),
    };

    Ok(PartitionUpdate {
        partition_id: PartitionId(msg.partition_index),
        values,
        cumulative_time: msg.cumulative_timesteps,
    })
}

/// Encode an update, as the simulation side does.
pub fn encode_update(update: &PartitionUpdate) -> Bytes {
    let msg = PartitionState {
        cumulative_timesteps: update.cumulative_time,
        partition_index: update.partition_id.get(),
        state: Some(State {
            values: update.values.clone(),
            schema_version: None,
        }),
        schema_version: Some(SCHEMA_VERSION),
    };
    Bytes::from(msg.encode_to_vec())
}

/// Decode an action result, as the simulation side does.
pub fn decode_result(frame: &[u8]) -> Result<Vec<f64>, WireError> {
    check_size(frame)?;
    let msg = State::decode(frame)?;
    check_version(msg.schema_version)?;
    Ok(msg.values)
}

fn check_size(frame: &[u8]) -> Result<(), WireError> {
    if frame.len() > MAX_FRAME_BYTES {
        return Err(WireError::FrameTooLarge {
            size: frame.len(),
            limit: MAX_FRAME_BYTES,
        });
    }
    Ok(())
}

fn check_version(version: Option<u32>) -> Result<(), WireError> {
    match version {
        Some(found) if found > SCHEMA_VERSION => Err(WireError::UnsupportedSchemaVersion {
            supported: SCHEMA_VERSION,
            found,
        }),
        _ => Ok(()),
    }
}
