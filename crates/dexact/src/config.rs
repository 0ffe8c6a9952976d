//! Launch configuration.
//!
//! Sources, later ones winning:
//!
//! 1. built-in defaults (`127.0.0.1:2112/simio`, server role)
//! 2. a TOML file, from an explicit path or `$DEXACT_CONFIG`
//! 3. `DEXACT_HOST`, `DEXACT_PORT` and `DEXACT_PATH`
//!
//! ```toml
//! host = "0.0.0.0"
//! port = 2112
//! path = "/simio"
//! role = "server"
//!
//! [policy.keyed]
//! "0" = "edge_states"
//!
//! [session]
//! round_timeout_ms = 5000
//! decision_mode = "blocking"
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use dexact_core::{CompletenessPolicy, DuplicatePolicy, PolicyError};
use dexact_session::{DecisionMode, Endpoint, SessionConfig, DEFAULT_PATH, DEFAULT_PORT};
use serde::{Deserialize, Serialize};

use crate::error::{LaunchError, Result};

/// Env var naming the config file when no path is given.
pub const CONFIG_ENV: &str = "DEXACT_CONFIG";

/// Which side of the connection the action taker plays.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Host the endpoint; the simulation dials in.
    #[default]
    Server,
    /// Dial a simulation that hosts the endpoint.
    Client,
}

/// Completeness policy as written in a config file.
///
/// Keyed-set ids are strings because TOML table keys are.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyConfig {
    Count(usize),
    Keyed(BTreeMap<String, String>),
}

impl PolicyConfig {
    pub fn to_policy(&self) -> std::result::Result<CompletenessPolicy, PolicyError> {
        match self {
            PolicyConfig::Count(n) => CompletenessPolicy::count(*n),
            PolicyConfig::Keyed(entries) => {
                let parsed = entries
                    .iter()
                    .map(|(id, name)| {
                        id.trim()
                            .parse::<i64>()
                            .map(|id| (id, name.clone()))
                            .map_err(|_| PolicyError::InvalidPartitionKey(id.clone()))
                    })
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                CompletenessPolicy::keyed(parsed)
            }
        }
    }
}

/// The `[session]` table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SessionSection {
    pub round_timeout_ms: Option<u64>,
    pub close_on_round_timeout: bool,
    pub max_rounds: Option<u64>,
    pub duplicates: DuplicatePolicy,
    pub close_on_decision_error: bool,
    pub decision_mode: DecisionMode,
}

impl From<&SessionSection> for SessionConfig {
    fn from(section: &SessionSection) -> Self {
        SessionConfig {
            round_timeout: section.round_timeout_ms.map(Duration::from_millis),
            close_on_round_timeout: section.close_on_round_timeout,
            max_rounds: section.max_rounds,
            duplicates: section.duplicates,
            close_on_decision_error: section.close_on_decision_error,
            decision_mode: section.decision_mode,
        }
    }
}

/// Everything needed to launch an action taker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LaunchConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Upgrade path; empty accepts any path.
    #[serde(default = "default_path")]
    pub path: String,
    #[serde(default)]
    pub role: Role,
    /// Replaces the action taker's own completeness policy when set.
    #[serde(default)]
    pub policy: Option<PolicyConfig>,
    #[serde(default)]
    pub session: SessionSection,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}
fn default_port() -> u16 {
    DEFAULT_PORT
}
fn default_path() -> String {
    DEFAULT_PATH.to_string()
}

impl Default for LaunchConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            path: default_path(),
            role: Role::default(),
            policy: None,
            session: SessionSection::default(),
        }
    }
}

impl LaunchConfig {
    /// Parse a TOML document; missing fields take their defaults.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Read a TOML file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|source| LaunchError::ReadConfig {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Load from `path` (or `$DEXACT_CONFIG`, or defaults) and apply env overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = path
            .map(Path::to_path_buf)
            .or_else(|| std::env::var_os(CONFIG_ENV).map(PathBuf::from));

        let mut config = match path {
            Some(path) => Self::from_file(&path)?,
            None => Self::default(),
        };
        config.apply_env(|var| std::env::var(var).ok())?;
        Ok(config)
    }

    /// Apply `DEXACT_HOST`, `DEXACT_PORT` and `DEXACT_PATH` using `lookup`.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&'static str) -> Option<String>,
    {
        if let Some(host) = lookup("DEXACT_HOST") {
            self.host = host;
        }
        if let Some(value) = lookup("DEXACT_PORT") {
            self.port = value.trim().parse().map_err(|_| LaunchError::InvalidEnv {
                var: "DEXACT_PORT",
                value,
            })?;
        }
        if let Some(path) = lookup("DEXACT_PATH") {
            self.path = path;
        }
        Ok(())
    }

    pub fn endpoint(&self) -> Endpoint {
        Endpoint::new(self.host.clone(), self.port).with_path(&self.path)
    }

    pub fn session_config(&self) -> SessionConfig {
        SessionConfig::from(&self.session)
    }

    /// The configured policy override, validated.
    pub fn policy_override(&self) -> Result<Option<CompletenessPolicy>> {
        Ok(self.policy.as_ref().map(PolicyConfig::to_policy).transpose()?)
    }
}
