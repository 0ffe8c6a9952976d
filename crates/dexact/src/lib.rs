//! # dexact
//!
//! Round-synchronized action exchange between a running simulation and an
//! external decision component.
//!
//! ## Overview
//!
//! A simulation emits one state message per partition per timestep. The
//! action taker waits until its completeness policy is met, computes an
//! action vector from the snapshot, and sends it back before the
//! simulation proceeds.
//!
//! - **Completeness**: a count of distinct partitions, or a keyed set of
//!   partition ids mapped to logical names
//! - **Isolation**: every connection has its own buffer and its own action
//!   taker instance
//! - **Roles**: host the endpoint (server) or dial the simulation (client)
//!
//! ## Usage
//!
//! ```rust,no_run
//! use dexact::{launch, CompletenessPolicy};
//!
//! #[tokio::main]
//! async fn main() -> dexact::Result<()> {
//!     let policy = CompletenessPolicy::count(3)?;
//!     launch(
//!         policy,
//!         |_time, states| {
//!             let first = states.partition(0).unwrap_or_default();
//!             Ok(first.iter().map(|v| v + 0.1).collect())
//!         },
//!         "127.0.0.1",
//!         2112,
//!     )
//!     .await
//! }
//! ```
//!
//! ## Re-exports
//!
//! - `dexact::core` - Updates, policies, aggregation, wire codec
//! - `dexact::session` - Channels, round coordinator, server and client

pub mod config;
pub mod demos;
pub mod error;
pub mod launch;

// Re-export component crates
pub use dexact_core as core;
pub use dexact_session as session;

pub use config::{LaunchConfig, PolicyConfig, Role, SessionSection};
pub use error::{LaunchError, Result};
pub use launch::{launch, launch_until, launch_with, shutdown_signal, PolicyOverride};

// Re-export commonly used types
pub use dexact_core::{
    ActionTaker, CompletenessPolicy, DecisionError, DuplicatePolicy, FnTaker, PartitionId,
    PartitionUpdate, StateKey, StateMap,
};
pub use dexact_session::{DecisionMode, Endpoint, SessionConfig, SessionError};
