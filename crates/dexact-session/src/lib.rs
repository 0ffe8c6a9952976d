//! # dexact session
//!
//! Round coordination over bidirectional channels.
//!
//! ## Overview
//!
//! A simulation streams one frame per partition per timestep. For every
//! connection, a [`RoundCoordinator`] buffers those frames until the action
//! taker's completeness policy is met, hands an independent snapshot to the
//! taker, sends the resulting action vector back, and starts the next round.
//!
//! Connections never share state. A malformed frame or a panicking taker
//! ends only the connection it happened on.
//!
//! ## Roles
//!
//! - [`Server`] hosts the WebSocket endpoint and accepts simulations
//! - [`run_client`] dials a simulation that hosts the endpoint
//!
//! Both roles run the same coordinator.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use dexact_core::{CompletenessPolicy, FnTaker};
//! use dexact_session::{Server, SessionConfig};
//!
//! async fn example() -> dexact_session::Result<()> {
//!     let server = Server::bind("127.0.0.1:2112", Some("/simio".into()), SessionConfig::default()).await?;
//!     server
//!         .serve(|| {
//!             FnTaker::new(CompletenessPolicy::count(3).unwrap(), |_time, states| {
//!                 Ok(vec![states.partition(0).map_or(0.0, |v| v[0] + 0.1)])
//!             })
//!         })
//!         .await
//! }
//! ```
//!
//! ## Round Flow
//!
//! ```text
//! Simulation                           Action taker
//!   |-------- PartitionState (id 0) --->|
//!   |-------- PartitionState (id 1) --->|
//!   |-------- PartitionState (id 2) --->|  complete: snapshot, reset, decide
//!   |<------- State (actions) ----------|
//!   |-------- PartitionState (id 0) --->|  next round
//! ```

pub mod channel;
pub mod client;
pub mod config;
pub mod coordinator;
pub mod endpoint;
pub mod error;
pub mod server;
pub mod websocket;

pub use channel::{memory::MemoryChannel, Channel};
pub use client::run_client;
pub use config::{DecisionMode, SessionConfig};
pub use coordinator::{ConnectionEnd, ConnectionId, ConnectionReport, RoundCoordinator, RoundStats};
pub use endpoint::{Endpoint, EndpointError, DEFAULT_PATH, DEFAULT_PORT};
pub use error::{Result, SessionError};
pub use server::{spawn_connection, Server};
pub use websocket::WebSocketChannel;
