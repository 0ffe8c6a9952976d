//! Error types for the session module.

use std::time::Duration;

use dexact_core::{DecisionError, PolicyError, WireError};
use thiserror::Error;

/// Errors that can occur while running a connection.
///
/// Every variant is scoped to a single connection; none of them affects
/// other connections hosted by the same server.
#[derive(Debug, Error)]
pub enum SessionError {
    /// Frame could not be decoded.
    #[error("protocol decode error: {0}")]
    Decode(#[from] WireError),

    /// Frame decoded but violates the session protocol.
    #[error("protocol violation: {0}")]
    ProtocolViolation(String),

    /// Peer went away while a round was only partly buffered.
    #[error("connection closed mid-round with {buffered} partition(s) buffered")]
    ConnectionClosed { buffered: usize },

    /// Round did not complete within the configured window.
    #[error("round not complete after {0:?}")]
    RoundTimeout(Duration),

    /// The action taker reported a failure.
    #[error("decision function failed: {0}")]
    Decision(#[from] DecisionError),

    /// The action taker panicked; its private state is gone.
    #[error("decision function panicked")]
    DecisionPanicked,

    /// Transport-level error.
    #[error("transport error: {0}")]
    Transport(String),

    /// Opening handshake failed.
    #[error("handshake failed: {0}")]
    Handshake(String),

    /// The action taker's completeness policy is unusable.
    #[error("invalid completeness policy: {0}")]
    Policy(#[from] PolicyError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl SessionError {
    /// Whether the error ends the connection it occurred on.
    ///
    /// Round timeouts and decision failures only abort the round unless the
    /// session is configured to close on them.
    pub fn is_connection_fatal(&self) -> bool {
        !matches!(
            self,
            SessionError::RoundTimeout(_) | SessionError::Decision(_)
        )
    }
}

/// Result type for session operations.
pub type Result<T> = std::result::Result<T, SessionError>;
