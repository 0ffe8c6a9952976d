//! Error types for dexact core.

use thiserror::Error;

/// Errors raised while encoding or decoding wire frames.
#[derive(Debug, Error)]
pub enum WireError {
    #[error("malformed frame: {0}")]
    Decode(#[from] prost::DecodeError),

    #[error("frame of {size} bytes exceeds limit of {limit}")]
    FrameTooLarge { size: usize, limit: usize },

    #[error("unsupported schema version: supported={supported}, found={found}")]
    UnsupportedSchemaVersion { supported: u32, found: u32 },
}

/// Invalid completeness policy descriptors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PolicyError {
    #[error("count threshold must be at least 1")]
    ZeroCount,

    #[error("keyed set must name at least one partition")]
    EmptyKeyedSet,

    #[error("invalid partition id {0:?} in keyed set")]
    InvalidPartitionKey(String),

    #[error("empty logical name for partition {0}")]
    EmptyName(i64),
}

/// Failure reported by an action taker.
///
/// A failed decision aborts the current round; nothing is sent.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct DecisionError {
    message: String,
}

impl DecisionError {
    /// Create a decision error with a human-readable message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// The message describing the failure.
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<String> for DecisionError {
    fn from(message: String) -> Self {
        Self { message }
    }
}

impl From<&str> for DecisionError {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}
