//! Demo action takers for the example simulations.

use dexact_core::{ActionTaker, CompletenessPolicy, DecisionError, PartitionId, StateMap};

/// Names accepted by [`factory`].
pub const DEMOS: &[&str] = &["example", "passthrough", "counter", "traffic_light"];

/// Constructor for a demo action taker, by name.
pub fn factory(name: &str) -> Option<fn() -> Box<dyn ActionTaker>> {
    let make: fn() -> Box<dyn ActionTaker> = match name {
        "example" => boxed::<ExampleTaker>,
        "passthrough" => boxed::<PassthroughTaker>,
        "counter" => boxed::<CounterTaker>,
        "traffic_light" => boxed::<TrafficLightTaker>,
        _ => return None,
    };
    Some(make)
}

fn boxed<T: ActionTaker + Default>() -> Box<dyn ActionTaker> {
    Box::new(T::default())
}

fn keyed_one(partition: PartitionId, name: &str) -> CompletenessPolicy {
    CompletenessPolicy::KeyedSet([(partition, name.to_string())].into_iter().collect())
}

/// Waits for three partitions and nudges partition 0's state by `0.1`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExampleTaker;

impl ActionTaker for ExampleTaker {
    fn completeness(&self) -> CompletenessPolicy {
        CompletenessPolicy::CountThreshold(3)
    }

    fn take_next_action(&mut self, _time: f64, states: StateMap) -> Result<Vec<f64>, DecisionError> {
        let first = states
            .partition(0)
            .ok_or_else(|| DecisionError::new("no state for partition 0"))?;
        Ok(first.iter().map(|value| value + 0.1).collect())
    }
}

/// Returns the `actions` partition unchanged.
#[derive(Debug, Clone)]
pub struct PassthroughTaker {
    partition: PartitionId,
}

impl PassthroughTaker {
    pub fn new(partition: i64) -> Self {
        Self {
            partition: PartitionId(partition),
        }
    }
}

impl Default for PassthroughTaker {
    fn default() -> Self {
        Self::new(0)
    }
}

impl ActionTaker for PassthroughTaker {
    fn completeness(&self) -> CompletenessPolicy {
        keyed_one(self.partition, "actions")
    }

    fn take_next_action(&mut self, _time: f64, states: StateMap) -> Result<Vec<f64>, DecisionError> {
        states
            .named("actions")
            .map(<[f64]>::to_vec)
            .ok_or_else(|| DecisionError::new("no actions state"))
    }
}

/// Increments `counter_state`, starting from 1 when it is empty.
#[derive(Debug, Clone)]
pub struct CounterTaker {
    partition: PartitionId,
}

impl CounterTaker {
    pub fn new(partition: i64) -> Self {
        Self {
            partition: PartitionId(partition),
        }
    }
}

impl Default for CounterTaker {
    fn default() -> Self {
        Self::new(0)
    }
}

impl ActionTaker for CounterTaker {
    fn completeness(&self) -> CompletenessPolicy {
        keyed_one(self.partition, "counter_state")
    }

    fn take_next_action(&mut self, _time: f64, states: StateMap) -> Result<Vec<f64>, DecisionError> {
        match states.named("counter_state").and_then(|values| values.first()) {
            Some(count) => Ok(vec![count + 1.0]),
            None => Ok(vec![1.0]),
        }
    }
}

struct EdgeLayout {
    capacity: usize,
    start: usize,
}

/// Slots of each road edge within the `edge_states` vector.
const EDGE_LAYOUT: [EdgeLayout; 7] = [
    EdgeLayout { capacity: 8, start: 0 },  // west entry
    EdgeLayout { capacity: 7, start: 8 },  // south entry
    EdgeLayout { capacity: 7, start: 15 }, // junction A to B
    EdgeLayout { capacity: 6, start: 22 }, // junction A to north exit
    EdgeLayout { capacity: 6, start: 28 }, // north entry
    EdgeLayout { capacity: 8, start: 34 }, // junction B to east exit
    EdgeLayout { capacity: 7, start: 42 }, // junction B to south exit
];

const WEST_ENTRY: usize = 0;
const SOUTH_ENTRY: usize = 1;
const A_TO_B: usize = 2;
const NORTH_ENTRY: usize = 4;

/// A phase only flips when one queue beats the other by this factor.
const HYSTERESIS: f64 = 1.2;

/// Two-junction traffic light controller favouring the longer queue.
///
/// Junction A chooses between the west (phase 0) and south (phase 1)
/// approaches; junction B between through traffic from A (phase 0) and the
/// north entry (phase 1). Phases are held for at least
/// `min_phase_duration` after any switch.
#[derive(Debug, Clone)]
pub struct TrafficLightTaker {
    partition: PartitionId,
    min_phase_duration: f64,
    last_switch_time: f64,
    junction_a_phase: u8,
    junction_b_phase: u8,
}

impl TrafficLightTaker {
    pub fn new(partition: i64) -> Self {
        Self {
            partition: PartitionId(partition),
            min_phase_duration: 6.0,
            last_switch_time: 0.0,
            junction_a_phase: 0,
            junction_b_phase: 0,
        }
    }

    pub fn with_min_phase_duration(mut self, duration: f64) -> Self {
        self.min_phase_duration = duration;
        self
    }

    pub fn phases(&self) -> (u8, u8) {
        (self.junction_a_phase, self.junction_b_phase)
    }
}

impl Default for TrafficLightTaker {
    fn default() -> Self {
        Self::new(0)
    }
}

impl ActionTaker for TrafficLightTaker {
    fn completeness(&self) -> CompletenessPolicy {
        keyed_one(self.partition, "edge_states")
    }

    fn take_next_action(&mut self, time: f64, states: StateMap) -> Result<Vec<f64>, DecisionError> {
        let queues = queue_lengths(states.named("edge_states").unwrap_or_default());

        let desired_a = favour(self.junction_a_phase, queues[SOUTH_ENTRY], queues[WEST_ENTRY]);
        let desired_b = favour(self.junction_b_phase, queues[NORTH_ENTRY], queues[A_TO_B]);

        if time - self.last_switch_time >= self.min_phase_duration {
            if desired_a != self.junction_a_phase {
                self.junction_a_phase = desired_a;
                self.last_switch_time = time;
            }
            if desired_b != self.junction_b_phase {
                self.junction_b_phase = desired_b;
                self.last_switch_time = time;
            }
        }

        Ok(vec![
            f64::from(self.junction_a_phase),
            f64::from(self.junction_b_phase),
        ])
    }
}

/// Occupied slots per edge; a slot is occupied when its value is non-negative.
fn queue_lengths(edge_states: &[f64]) -> [f64; 7] {
    EDGE_LAYOUT.map(|edge| {
        edge_states
            .iter()
            .skip(edge.start)
            .take(edge.capacity)
            .filter(|slot| **slot >= 0.0)
            .count() as f64
    })
}

/// Phase 1 when `challenger` clearly dominates, phase 0 when `incumbent`
/// does, otherwise keep `current`.
fn favour(current: u8, challenger: f64, incumbent: f64) -> u8 {
    if challenger > incumbent * HYSTERESIS {
        1
    } else if challenger * HYSTERESIS < incumbent {
        0
    } else {
        current
    }
}
