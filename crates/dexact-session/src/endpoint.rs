//! WebSocket endpoint addresses.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Default port a simulation expects the action taker on.
pub const DEFAULT_PORT: u16 = 2112;

/// Default upgrade path.
pub const DEFAULT_PATH: &str = "/simio";

/// Error parsing an [`Endpoint`].
#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid endpoint {input:?}: {reason}")]
pub struct EndpointError {
    pub input: String,
    pub reason: &'static str,
}

/// Host, port and optional upgrade path of a WebSocket endpoint.
///
/// Parses from `host:port`, `host:port/path` or `ws://host:port/path`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub host: String,
    pub port: u16,
    pub path: Option<String>,
}

impl Endpoint {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            path: None,
        }
    }

    /// Set the upgrade path. A leading `/` is added if missing; an empty
    /// path clears it.
    pub fn with_path(mut self, path: impl AsRef<str>) -> Self {
        self.path = normalize_path(path.as_ref());
        self
    }

    /// `host:port`, suitable for binding a listener.
    pub fn authority(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// `ws://host:port/path`, suitable for dialing.
    pub fn url(&self) -> String {
        format!("ws://{}{}", self.authority(), self.path.as_deref().unwrap_or(""))
    }
}

impl Default for Endpoint {
    fn default() -> Self {
        Endpoint::new("127.0.0.1", DEFAULT_PORT).with_path(DEFAULT_PATH)
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.url())
    }
}

impl FromStr for Endpoint {
    type Err = EndpointError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let fail = |reason| EndpointError {
            input: input.to_string(),
            reason,
        };

        let rest = input.strip_prefix("ws://").unwrap_or(input);
        let (authority, path) = match rest.find('/') {
            Some(slash) => rest.split_at(slash),
            None => (rest, ""),
        };
        let (host, port) = authority
            .rsplit_once(':')
            .ok_or_else(|| fail("expected host:port"))?;
        if host.is_empty() {
            return Err(fail("empty host"));
        }
        let port = port.parse::<u16>().map_err(|_| fail("port is not a number in 0..=65535"))?;

        Ok(Endpoint::new(host, port).with_path(path))
    }
}

fn normalize_path(path: &str) -> Option<String> {
    match path.trim() {
        "" => None,
        p if p.starts_with('/') => Some(p.to_string()),
        p => Some(format!("/{}", p)),
    }
}
