//! # dexact testkit
//!
//! Testing utilities for dexact.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Golden vectors**: protobuf frames with known contents, checked against the codec
//! - **Generators**: Proptest strategies for updates and shuffled rounds
//! - **Fixtures**: A scripted simulation peer and a recording action taker
//!
//! ## Golden Vectors
//!
//! ```rust
//! use dexact_testkit::vectors::verify_all_vectors;
//!
//! assert!(verify_all_vectors().is_ok());
//! ```
//!
//! ## Test Fixtures
//!
//! ```rust,no_run
//! use dexact_core::CompletenessPolicy;
//! use dexact_session::SessionConfig;
//! use dexact_testkit::fixtures::{connect_memory, RecordingTaker};
//!
//! async fn example() {
//!     let (taker, log) = RecordingTaker::new(CompletenessPolicy::count(1).unwrap());
//!     let (mut sim, _handle) = connect_memory(taker, SessionConfig::default());
//!     sim.send_update(0, vec![1.0], 0.5).await.unwrap();
//!     let action = sim.recv_result().await.unwrap();
//!     assert_eq!(log.len(), 1);
//! }
//! ```

pub mod fixtures;
pub mod generators;
pub mod vectors;

pub use fixtures::{connect_memory, Call, CallLog, RecordingTaker, ScriptedSimulation};
pub use generators::RoundParams;
pub use vectors::{result_vectors, update_vectors, verify_all_vectors, ResultVector, UpdateVector};
