//! The decision contract consumed by the round coordinator.

use crate::aggregator::StateMap;
use crate::error::DecisionError;
use crate::policy::CompletenessPolicy;

/// A decision component taking part in the simulation.
///
/// One instance is bound to one connection. Any private state it keeps
/// (cooldowns, phase counters) persists across that connection's rounds
/// and is never seen by another connection.
pub trait ActionTaker: Send + 'static {
    /// The rule deciding when a round's snapshot is complete.
    fn completeness(&self) -> CompletenessPolicy;

    /// Compute the action vector for a complete round.
    ///
    /// Must be deterministic given its inputs and its own private state.
    fn take_next_action(&mut self, time: f64, states: StateMap) -> Result<Vec<f64>, DecisionError>;
}

/// Adapts a completeness policy plus a closure into an [`ActionTaker`].
///
/// Cloning yields an independent instance, which makes `FnTaker` usable
/// as a per-connection factory.
#[derive(Clone)]
pub struct FnTaker<F> {
    policy: CompletenessPolicy,
    decide: F,
}

impl<F> FnTaker<F>
where
    F: FnMut(f64, StateMap) -> Result<Vec<f64>, DecisionError> + Send + 'static,
{
    pub fn new(policy: CompletenessPolicy, decide: F) -> Self {
        Self { policy, decide }
    }
}

impl<F> ActionTaker for FnTaker<F>
where
    F: FnMut(f64, StateMap) -> Result<Vec<f64>, DecisionError> + Send + 'static,
{
    fn completeness(&self) -> CompletenessPolicy {
        self.policy.clone()
    }

    fn take_next_action(&mut self, time: f64, states: StateMap) -> Result<Vec<f64>, DecisionError> {
        (self.decide)(time, states)
    }
}

impl<T: ActionTaker + ?Sized> ActionTaker for Box<T> {
    fn completeness(&self) -> CompletenessPolicy {
        (**self).completeness()
    }

    fn take_next_action(&mut self, time: f64, states: StateMap) -> Result<Vec<f64>, DecisionError> {
        (**self).take_next_action(time, states)
    }
}
