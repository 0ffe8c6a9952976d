//! # dexact core
//!
//! Pure primitives for round-synchronized action exchange: partition
//! updates, completeness policies, the per-round aggregation buffer, the
//! decision contract, and the protobuf wire codec.
//!
//! This crate performs no I/O. Transports and the round loop live in
//! `dexact-session`.
//!
//! ## Key Types
//!
//! - [`PartitionUpdate`] - One decoded frame from the simulation
//! - [`CompletenessPolicy`] - When a set of updates forms a complete round
//! - [`Aggregator`] - Buffer for the round in progress
//! - [`Snapshot`] / [`StateMap`] - Independent copy handed to the decision
//! - [`ActionTaker`] - The pluggable decision component
//!
//! ## Example
//!
//! ```rust
//! use dexact_core::{Aggregator, CompletenessPolicy, PartitionId};
//!
//! let policy = CompletenessPolicy::count(2).unwrap();
//! let mut agg = Aggregator::new();
//!
//! for (id, value) in [(1, 2.0), (0, 1.0)] {
//!     let key = policy.key_for(PartitionId(id)).unwrap();
//!     agg.insert(key, vec![value], 1.0);
//! }
//!
//! assert!(agg.is_complete(&policy));
//! let snapshot = agg.snapshot().unwrap();
//! agg.reset();
//! assert_eq!(snapshot.states.partition(0), Some(&[1.0][..]));
//! ```

pub mod aggregator;
pub mod decision;
pub mod error;
pub mod policy;
pub mod types;
pub mod update;
pub mod wire;

pub use aggregator::{Aggregator, InsertOutcome, Snapshot, StateMap};
pub use decision::{ActionTaker, FnTaker};
pub use error::{DecisionError, PolicyError, WireError};
pub use policy::{CompletenessPolicy, DuplicatePolicy};
pub use types::{PartitionId, StateKey};
pub use update::PartitionUpdate;
pub use wire::{decode_result, decode_update, encode_result, encode_update, MAX_FRAME_BYTES, SCHEMA_VERSION};
