//! Partition updates: one decoded incoming frame.

use serde::{Deserialize, Serialize};

use crate::types::PartitionId;

/// State reported by one partition at one point in simulated time.
///
/// Immutable once decoded; the aggregator takes ownership of the values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartitionUpdate {
    /// Which partition produced the state.
    pub partition_id: PartitionId,
    /// The partition's state vector, in order.
    pub values: Vec<f64>,
    /// Cumulative simulated time at which the state was produced.
    pub cumulative_time: f64,
}

impl PartitionUpdate {
    /// Create an update.
    pub fn new(partition_id: i64, values: Vec<f64>, cumulative_time: f64) -> Self {
        Self {
            partition_id: PartitionId(partition_id),
            values,
            cumulative_time,
        }
    }
}
