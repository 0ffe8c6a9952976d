//! Per-connection session configuration.

use std::time::Duration;

use dexact_core::DuplicatePolicy;
use serde::{Deserialize, Serialize};

/// Where the action taker runs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionMode {
    /// On the connection task. Suits short computations.
    #[default]
    Inline,
    /// On tokio's blocking pool, so long computations cannot stall other
    /// connections sharing a worker thread.
    Blocking,
}

/// Configuration applied to every connection, server and client alike.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Maximum time from a round's first update to its completion.
    pub round_timeout: Option<Duration>,
    /// Close the connection when a round times out (otherwise reset and wait).
    pub close_on_round_timeout: bool,
    /// Stop after this many completed rounds; `None` runs until the peer closes.
    pub max_rounds: Option<u64>,
    /// Treatment of repeated updates for a key within one round.
    pub duplicates: DuplicatePolicy,
    /// Close the connection when the action taker fails (otherwise skip the round).
    pub close_on_decision_error: bool,
    /// Where the action taker runs.
    pub decision_mode: DecisionMode,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            round_timeout: None,
            close_on_round_timeout: false,
            max_rounds: None,
            duplicates: DuplicatePolicy::Overwrite,
            close_on_decision_error: false,
            decision_mode: DecisionMode::Inline,
        }
    }
}

impl SessionConfig {
    /// Set the per-round timeout.
    pub fn with_round_timeout(mut self, timeout: Duration) -> Self {
        self.round_timeout = Some(timeout);
        self
    }

    /// Stop after `rounds` completed rounds.
    pub fn with_max_rounds(mut self, rounds: u64) -> Self {
        self.max_rounds = Some(rounds);
        self
    }

    pub fn with_duplicates(mut self, duplicates: DuplicatePolicy) -> Self {
        self.duplicates = duplicates;
        self
    }

    pub fn with_decision_mode(mut self, mode: DecisionMode) -> Self {
        self.decision_mode = mode;
        self
    }
}
