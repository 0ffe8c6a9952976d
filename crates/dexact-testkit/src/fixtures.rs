//! Test fixtures and helpers.
//!
//! A scripted simulation peer, a recording action taker, and a helper
//! wiring both to a coordinator over an in-memory channel.

use std::sync::{Arc, Mutex};

use bytes::Bytes;
use dexact_core::{
    decode_result, encode_update, ActionTaker, CompletenessPolicy, DecisionError, PartitionUpdate,
    StateMap,
};
use dexact_session::channel::memory::{self, MemoryChannel};
use dexact_session::{spawn_connection, Channel, ConnectionReport, Result, SessionConfig};
use tokio::task::JoinHandle;

/// The simulation's end of a connection, driven by a test script.
pub struct ScriptedSimulation<C> {
    channel: C,
}

impl<C: Channel> ScriptedSimulation<C> {
    pub fn new(channel: C) -> Self {
        Self { channel }
    }

    /// Send one partition update.
    pub async fn send_update(&mut self, partition_id: i64, values: Vec<f64>, time: f64) -> Result<()> {
        let update = PartitionUpdate::new(partition_id, values, time);
        self.channel.send(encode_update(&update)).await
    }

    /// Send one update per `(id, values)` pair, all at `time`.
    pub async fn send_round(&mut self, time: f64, partitions: &[(i64, Vec<f64>)]) -> Result<()> {
        for (id, values) in partitions {
            self.send_update(*id, values.clone(), time).await?;
        }
        Ok(())
    }

    /// Send raw bytes, e.g. a malformed or hand-encoded frame.
    pub async fn send_raw(&mut self, frame: impl Into<Bytes>) -> Result<()> {
        self.channel.send(frame.into()).await
    }

    /// Next action vector, or `None` once the action taker closed.
    pub async fn recv_result(&mut self) -> Result<Option<Vec<f64>>> {
        match self.channel.recv().await? {
            Some(frame) => Ok(Some(decode_result(&frame)?)),
            None => Ok(None),
        }
    }

    pub async fn close(&mut self) -> Result<()> {
        self.channel.close().await
    }

    pub fn into_inner(self) -> C {
        self.channel
    }
}

/// One recorded call to [`RecordingTaker`].
#[derive(Debug, Clone, PartialEq)]
pub struct Call {
    pub time: f64,
    pub states: StateMap,
}

/// Shared view of the calls a [`RecordingTaker`] received.
#[derive(Debug, Clone, Default)]
pub struct CallLog(Arc<Mutex<Vec<Call>>>);

impl CallLog {
    pub fn calls(&self) -> Vec<Call> {
        self.0.lock().map(|calls| calls.clone()).unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.0.lock().map(|calls| calls.len()).unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn push(&self, call: Call) {
        if let Ok(mut calls) = self.0.lock() {
            calls.push(call);
        }
    }
}

/// Records every call and answers `[time, number of states, round number]`.
///
/// Clones share the call log but count rounds separately.
#[derive(Clone)]
pub struct RecordingTaker {
    policy: CompletenessPolicy,
    log: CallLog,
    rounds: u64,
}

impl RecordingTaker {
    pub fn new(policy: CompletenessPolicy) -> (Self, CallLog) {
        let log = CallLog::default();
        let taker = Self {
            policy,
            log: log.clone(),
            rounds: 0,
        };
        (taker, log)
    }
}

impl ActionTaker for RecordingTaker {
    fn completeness(&self) -> CompletenessPolicy {
        self.policy.clone()
    }

    fn take_next_action(&mut self, time: f64, states: StateMap) -> std::result::Result<Vec<f64>, DecisionError> {
        self.rounds += 1;
        let answer = vec![time, states.len() as f64, self.rounds as f64];
        self.log.push(Call { time, states });
        Ok(answer)
    }
}

/// Run `taker` behind a coordinator on an in-memory channel.
pub fn connect_memory<T: ActionTaker>(
    taker: T,
    config: SessionConfig,
) -> (
    ScriptedSimulation<MemoryChannel>,
    JoinHandle<Result<ConnectionReport>>,
) {
    let (simulation, taker_end) = memory::named_pair("simulation", "action-taker");
    let handle = spawn_connection(taker_end, taker, config);
    (ScriptedSimulation::new(simulation), handle)
}
