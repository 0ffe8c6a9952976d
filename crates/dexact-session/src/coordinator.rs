//! Round coordinator: drives one connection through successive rounds.
//!
//! Each connection owns exactly one coordinator, which in turn owns the
//! channel, the aggregation buffer, the completeness policy and the action
//! taker. Nothing here is shared with other connections, so no locking is
//! needed: every mutation happens on the connection's own task.
//!
//! Per round:
//!
//! ```text
//! recv -> decode -> insert -> complete? -> snapshot + reset -> decide -> encode -> send
//! ```

use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};

use bytes::Bytes;
use dexact_core::{
    decode_update, encode_result, ActionTaker, Aggregator, CompletenessPolicy, DuplicatePolicy,
    InsertOutcome, PartitionUpdate, Snapshot, StateMap,
};
use tokio::time::Instant;
use tracing::{debug, info, warn, Instrument};

use crate::channel::Channel;
use crate::config::{DecisionMode, SessionConfig};
use crate::error::{Result, SessionError};

/// Process-unique connection identifier, used in logs and reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(pub u64);

impl ConnectionId {
    /// Allocate the next identifier.
    pub fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// How a connection ended when it ended without error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionEnd {
    /// Peer closed between rounds.
    PeerClosed,
    /// Peer closed with a round partly buffered; the partial round was
    /// dropped without invoking the action taker.
    PeerClosedMidRound { discarded: usize },
    /// `max_rounds` rounds were completed and the channel was closed.
    RoundLimitReached,
}

/// Counters collected over a connection's lifetime.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoundStats {
    pub frames_received: u64,
    pub rounds_completed: u64,
    /// Rounds dropped because the action taker failed.
    pub rounds_aborted: u64,
    pub rounds_timed_out: u64,
    /// Updates that overwrote an earlier update for the same key.
    pub duplicate_updates: u64,
}

/// Summary of a finished connection.
#[derive(Debug, Clone)]
pub struct ConnectionReport {
    pub id: ConnectionId,
    pub peer: String,
    pub stats: RoundStats,
    pub end: ConnectionEnd,
}

/// Drives the receive/aggregate/decide/send cycle for one connection.
pub struct RoundCoordinator<C, T> {
    id: ConnectionId,
    channel: C,
    /// `None` only after the action taker panicked.
    taker: Option<T>,
    policy: CompletenessPolicy,
    aggregator: Aggregator,
    config: SessionConfig,
    /// When the first update of the round in progress arrived.
    round_started: Option<Instant>,
    stats: RoundStats,
}

impl<C: Channel, T: ActionTaker> RoundCoordinator<C, T> {
    /// Bind a channel and an action taker into a new coordinator.
    ///
    /// Fails if the taker's completeness policy can never be satisfied.
    pub fn new(id: ConnectionId, channel: C, taker: T, config: SessionConfig) -> Result<Self> {
        let policy = taker.completeness();
        policy.validate()?;

        Ok(Self {
            id,
            channel,
            taker: Some(taker),
            policy,
            aggregator: Aggregator::new(),
            config,
            round_started: None,
            stats: RoundStats::default(),
        })
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn policy(&self) -> &CompletenessPolicy {
        &self.policy
    }

    /// Run rounds until the peer closes, the round limit is reached, or a
    /// connection-fatal error occurs. The channel is closed on return.
    pub async fn run(self) -> Result<ConnectionReport> {
        let span = tracing::info_span!("connection", id = %self.id, peer = %self.channel.peer());
        self.run_inner().instrument(span).await
    }

    async fn run_inner(mut self) -> Result<ConnectionReport> {
        info!(policy = ?self.policy, "connection opened");

        let outcome = self.drive().await;
        if let Err(e) = self.channel.close().await {
            debug!(error = %e, "close failed");
        }

        match outcome {
            Ok(end) => {
                info!(?end, rounds = self.stats.rounds_completed, "connection finished");
                Ok(ConnectionReport {
                    id: self.id,
                    peer: self.channel.peer().to_string(),
                    stats: self.stats,
                    end,
                })
            }
            Err(e) => {
                warn!(error = %e, rounds = self.stats.rounds_completed, "connection failed");
                Err(e)
            }
        }
    }

    async fn drive(&mut self) -> Result<ConnectionEnd> {
        loop {
            if self.round_limit_reached() {
                return Ok(ConnectionEnd::RoundLimitReached);
            }

            let frame = match self.next_frame().await {
                Ok(Some(frame)) => frame,
                Ok(None) => return Ok(ConnectionEnd::PeerClosed),
                Err(SessionError::ConnectionClosed { buffered }) => {
                    debug!(buffered, "peer closed mid-round, partial round discarded");
                    self.clear_round();
                    return Ok(ConnectionEnd::PeerClosedMidRound {
                        discarded: buffered,
                    });
                }
                Err(SessionError::RoundTimeout(window)) => {
                    self.stats.rounds_timed_out += 1;
                    warn!(?window, buffered = self.aggregator.len(), "round timed out");
                    self.clear_round();
                    if self.config.close_on_round_timeout {
                        return Err(SessionError::RoundTimeout(window));
                    }
                    continue;
                }
                Err(e) => return Err(e),
            };

            self.stats.frames_received += 1;
            let update = decode_update(&frame)?;
            self.ingest(update)?;

            if self.aggregator.is_complete(&self.policy) {
                self.complete_round().await?;
            }
        }
    }

    /// Wait for the next frame, bounded by the round deadline if one applies.
    async fn next_frame(&mut self) -> Result<Option<Bytes>> {
        let received = match (self.config.round_timeout, self.round_started) {
            (Some(window), Some(started)) => {
                tokio::time::timeout_at(started + window, self.channel.recv())
                    .await
                    .map_err(|_| SessionError::RoundTimeout(window))??
            }
            _ => self.channel.recv().await?,
        };

        match received {
            Some(frame) => Ok(Some(frame)),
            None if self.aggregator.is_empty() => Ok(None),
            None => Err(SessionError::ConnectionClosed {
                buffered: self.aggregator.len(),
            }),
        }
    }

    fn ingest(&mut self, update: PartitionUpdate) -> Result<()> {
        let key = self.policy.key_for(update.partition_id).ok_or_else(|| {
            SessionError::ProtocolViolation(format!(
                "partition {} is not in the keyed set",
                update.partition_id
            ))
        })?;

        if self.config.duplicates == DuplicatePolicy::Reject && self.aggregator.contains(&key) {
            return Err(SessionError::ProtocolViolation(format!(
                "second update for {} within one round",
                key
            )));
        }

        debug!(partition = %update.partition_id, %key, time = update.cumulative_time, "update buffered");
        if self.aggregator.insert(key, update.values, update.cumulative_time) == InsertOutcome::Replaced {
            self.stats.duplicate_updates += 1;
            debug!("overwrote earlier update in this round");
        }

        if self.round_started.is_none() {
            self.round_started = Some(Instant::now());
        }
        Ok(())
    }

    async fn complete_round(&mut self) -> Result<()> {
        let snapshot = self.aggregator.snapshot();
        self.clear_round();

        let Some(Snapshot { time, states }) = snapshot else {
            return Ok(());
        };

        match self.decide(time, states).await {
            Ok(values) => {
                self.channel.send(encode_result(&values)).await?;
                self.stats.rounds_completed += 1;
                debug!(
                    round = self.stats.rounds_completed,
                    time,
                    outputs = values.len(),
                    "round complete"
                );
                Ok(())
            }
            Err(SessionError::Decision(e)) => {
                self.stats.rounds_aborted += 1;
                warn!(error = %e, time, "decision failed, round aborted");
                if self.config.close_on_decision_error {
                    return Err(SessionError::Decision(e));
                }
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    async fn decide(&mut self, time: f64, states: StateMap) -> Result<Vec<f64>> {
        match self.config.decision_mode {
            DecisionMode::Inline => {
                let taker = self.taker.as_mut().ok_or(SessionError::DecisionPanicked)?;
                match panic::catch_unwind(AssertUnwindSafe(|| taker.take_next_action(time, states))) {
                    Ok(result) => Ok(result?),
                    Err(_) => {
                        self.taker = None;
                        Err(SessionError::DecisionPanicked)
                    }
                }
            }
            DecisionMode::Blocking => {
                let mut taker = self.taker.take().ok_or(SessionError::DecisionPanicked)?;
                let joined = tokio::task::spawn_blocking(move || {
                    let result = taker.take_next_action(time, states);
                    (taker, result)
                })
                .await;

                match joined {
                    Ok((taker, result)) => {
                        self.taker = Some(taker);
                        Ok(result?)
                    }
                    Err(_) => Err(SessionError::DecisionPanicked),
                }
            }
        }
    }

    fn clear_round(&mut self) {
        self.aggregator.reset();
        self.round_started = None;
    }

    fn round_limit_reached(&self) -> bool {
        self.config
            .max_rounds
            .is_some_and(|max| self.stats.rounds_completed >= max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::memory::{self, MemoryChannel};
    use dexact_core::{decode_result, encode_update, DecisionError, FnTaker};
    use std::time::Duration;

    async fn send(peer: &mut MemoryChannel, id: i64, values: Vec<f64>, time: f64) {
        let frame = encode_update(&PartitionUpdate::new(id, values, time));
        peer.send(frame).await.unwrap();
    }

    async fn recv(peer: &mut MemoryChannel) -> Option<Vec<f64>> {
        peer.recv()
            .await
            .unwrap()
            .map(|frame| decode_result(&frame).unwrap())
    }

    fn sum_taker(n: usize) -> impl ActionTaker {
        FnTaker::new(CompletenessPolicy::count(n).unwrap(), |time, states: StateMap| {
            let total: f64 = states.iter().flat_map(|(_, v)| v.iter()).sum();
            Ok(vec![total, time])
        })
    }

    fn start<T: ActionTaker>(
        taker: T,
        config: SessionConfig,
    ) -> (MemoryChannel, tokio::task::JoinHandle<Result<ConnectionReport>>) {
        let (sim, taker_end) = memory::named_pair("sim", "taker");
        let coordinator = RoundCoordinator::new(ConnectionId::next(), taker_end, taker, config).unwrap();
        (sim, tokio::spawn(coordinator.run()))
    }

    #[tokio::test]
    async fn test_rounds_repeat_on_one_connection() {
        let (mut sim, handle) = start(sum_taker(2), SessionConfig::default());

        send(&mut sim, 0, vec![1.0], 1.0).await;
        send(&mut sim, 1, vec![2.0], 1.0).await;
        assert_eq!(recv(&mut sim).await, Some(vec![3.0, 1.0]));

        send(&mut sim, 1, vec![5.0], 2.0).await;
        send(&mut sim, 0, vec![5.0], 2.0).await;
        assert_eq!(recv(&mut sim).await, Some(vec![10.0, 2.0]));

        drop(sim);
        let report = handle.await.unwrap().unwrap();
        assert_eq!(report.end, ConnectionEnd::PeerClosed);
        assert_eq!(report.stats.rounds_completed, 2);
        assert_eq!(report.stats.frames_received, 4);
        assert_eq!(report.peer, "sim");
    }

    #[tokio::test]
    async fn test_duplicate_overwrites_and_time_is_last_write() {
        let (mut sim, handle) = start(sum_taker(2), SessionConfig::default());

        send(&mut sim, 0, vec![1.0], 1.0).await;
        send(&mut sim, 0, vec![4.0], 3.0).await;
        send(&mut sim, 1, vec![2.0], 2.0).await;
        assert_eq!(recv(&mut sim).await, Some(vec![6.0, 2.0]));

        drop(sim);
        let report = handle.await.unwrap().unwrap();
        assert_eq!(report.stats.duplicate_updates, 1);
    }

    #[tokio::test]
    async fn test_duplicate_rejected_when_configured() {
        let config = SessionConfig::default().with_duplicates(DuplicatePolicy::Reject);
        let (mut sim, handle) = start(sum_taker(2), config);

        send(&mut sim, 0, vec![1.0], 1.0).await;
        send(&mut sim, 0, vec![1.0], 1.0).await;

        assert!(matches!(
            handle.await.unwrap(),
            Err(SessionError::ProtocolViolation(_))
        ));
        assert_eq!(recv(&mut sim).await, None);
    }

    #[tokio::test]
    async fn test_close_mid_round_skips_decision() {
        let taker = FnTaker::new(CompletenessPolicy::count(3).unwrap(), |_, _| {
            panic!("decision must not run for a partial round")
        });
        let (mut sim, handle) = start(taker, SessionConfig::default());

        send(&mut sim, 0, vec![1.0], 1.0).await;
        send(&mut sim, 1, vec![1.0], 1.0).await;
        drop(sim);

        let report = handle.await.unwrap().unwrap();
        assert_eq!(report.end, ConnectionEnd::PeerClosedMidRound { discarded: 2 });
        assert_eq!(report.stats.rounds_completed, 0);
    }

    #[tokio::test]
    async fn test_malformed_frame_is_fatal() {
        let (mut sim, handle) = start(sum_taker(2), SessionConfig::default());

        send(&mut sim, 0, vec![1.0], 1.0).await;
        sim.send(Bytes::from_static(&[0xff, 0xff, 0xff])).await.unwrap();

        assert!(matches!(handle.await.unwrap(), Err(SessionError::Decode(_))));
        assert_eq!(recv(&mut sim).await, None);
    }

    #[tokio::test]
    async fn test_unknown_keyed_partition_is_fatal() {
        let taker = FnTaker::new(
            CompletenessPolicy::keyed([(0, "actions")]).unwrap(),
            |_, _| Ok(vec![]),
        );
        let (mut sim, handle) = start(taker, SessionConfig::default());

        send(&mut sim, 7, vec![1.0], 1.0).await;

        assert!(matches!(
            handle.await.unwrap(),
            Err(SessionError::ProtocolViolation(_))
        ));
    }

    #[tokio::test]
    async fn test_decision_error_aborts_round_only() {
        let mut fail_next = true;
        let taker = FnTaker::new(CompletenessPolicy::count(1).unwrap(), move |time, _| {
            if std::mem::take(&mut fail_next) {
                return Err(DecisionError::new("not ready"));
            }
            Ok(vec![time])
        });
        let (mut sim, handle) = start(taker, SessionConfig::default());

        send(&mut sim, 0, vec![], 1.0).await;
        send(&mut sim, 0, vec![], 2.0).await;
        // the failed first round sent nothing
        assert_eq!(recv(&mut sim).await, Some(vec![2.0]));

        drop(sim);
        let report = handle.await.unwrap().unwrap();
        assert_eq!(report.stats.rounds_aborted, 1);
        assert_eq!(report.stats.rounds_completed, 1);
    }

    #[tokio::test]
    async fn test_decision_error_closes_when_configured() {
        let taker = FnTaker::new(CompletenessPolicy::count(1).unwrap(), |_, _| {
            Err(DecisionError::new("broken"))
        });
        let config = SessionConfig {
            close_on_decision_error: true,
            ..SessionConfig::default()
        };
        let (mut sim, handle) = start(taker, config);

        send(&mut sim, 0, vec![], 1.0).await;

        assert!(matches!(handle.await.unwrap(), Err(SessionError::Decision(_))));
        assert_eq!(recv(&mut sim).await, None);
    }

    #[tokio::test]
    async fn test_decision_panic_is_fatal() {
        let taker = FnTaker::new(CompletenessPolicy::count(1).unwrap(), |_, _| panic!("boom"));
        let (mut sim, handle) = start(taker, SessionConfig::default());

        send(&mut sim, 0, vec![], 1.0).await;

        assert!(matches!(handle.await.unwrap(), Err(SessionError::DecisionPanicked)));
        assert_eq!(recv(&mut sim).await, None);
    }

    #[tokio::test]
    async fn test_blocking_mode_keeps_private_state() {
        let mut rounds = 0.0;
        let taker = FnTaker::new(CompletenessPolicy::count(1).unwrap(), move |_, _| {
            rounds += 1.0;
            Ok(vec![rounds])
        });
        let config = SessionConfig::default().with_decision_mode(DecisionMode::Blocking);
        let (mut sim, handle) = start(taker, config);

        for expected in [1.0, 2.0, 3.0] {
            send(&mut sim, 0, vec![], 0.0).await;
            assert_eq!(recv(&mut sim).await, Some(vec![expected]));
        }

        drop(sim);
        assert_eq!(handle.await.unwrap().unwrap().stats.rounds_completed, 3);
    }

    #[tokio::test]
    async fn test_round_limit_closes_channel() {
        let (mut sim, handle) = start(sum_taker(1), SessionConfig::default().with_max_rounds(1));

        send(&mut sim, 0, vec![1.0], 1.0).await;
        assert_eq!(recv(&mut sim).await, Some(vec![1.0, 1.0]));
        assert_eq!(recv(&mut sim).await, None);

        let report = handle.await.unwrap().unwrap();
        assert_eq!(report.end, ConnectionEnd::RoundLimitReached);
    }

    #[tokio::test(start_paused = true)]
    async fn test_round_timeout_resets_buffer() {
        let config = SessionConfig::default().with_round_timeout(Duration::from_secs(5));
        let (mut sim, handle) = start(sum_taker(2), config);

        send(&mut sim, 0, vec![100.0], 1.0).await;
        tokio::time::sleep(Duration::from_secs(6)).await;

        // the stale partition 0 entry must not count toward this round
        send(&mut sim, 1, vec![1.0], 2.0).await;
        send(&mut sim, 0, vec![2.0], 2.0).await;
        assert_eq!(recv(&mut sim).await, Some(vec![3.0, 2.0]));

        drop(sim);
        let report = handle.await.unwrap().unwrap();
        assert_eq!(report.stats.rounds_timed_out, 1);
        assert_eq!(report.stats.rounds_completed, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_round_timeout_closes_when_configured() {
        let config = SessionConfig {
            close_on_round_timeout: true,
            ..SessionConfig::default().with_round_timeout(Duration::from_millis(250))
        };
        let (mut sim, handle) = start(sum_taker(2), config);

        send(&mut sim, 0, vec![1.0], 1.0).await;

        assert!(matches!(
            handle.await.unwrap(),
            Err(SessionError::RoundTimeout(_))
        ));
        assert_eq!(recv(&mut sim).await, None);
    }

    #[tokio::test]
    async fn test_invalid_policy_rejected() {
        let (_, end) = memory::pair();
        let taker = FnTaker::new(CompletenessPolicy::CountThreshold(0), |_, _| Ok(vec![]));
        assert!(matches!(
            RoundCoordinator::new(ConnectionId::next(), end, taker, SessionConfig::default()),
            Err(SessionError::Policy(_))
        ));
    }
}
