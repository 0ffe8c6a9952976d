//! Error types for launching an action taker.

use std::path::PathBuf;

use dexact_core::PolicyError;
use dexact_session::SessionError;
use thiserror::Error;

/// Errors that can occur while configuring or launching.
#[derive(Debug, Error)]
pub enum LaunchError {
    /// Config file could not be read.
    #[error("failed to read config {}: {source}", .path.display())]
    ReadConfig {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Config file is not valid TOML or has unknown fields.
    #[error("invalid config: {0}")]
    ParseConfig(#[from] toml::de::Error),

    /// Environment override could not be parsed.
    #[error("invalid value {value:?} for {var}")]
    InvalidEnv { var: &'static str, value: String },

    /// Configured completeness policy is unusable.
    #[error("invalid completeness policy: {0}")]
    Policy(#[from] PolicyError),

    /// Server or client failed.
    #[error("session error: {0}")]
    Session(#[from] SessionError),

    /// No demo action taker by that name.
    #[error("unknown demo {0:?}")]
    UnknownDemo(String),
}

/// Result type for launch operations.
pub type Result<T> = std::result::Result<T, LaunchError>;
