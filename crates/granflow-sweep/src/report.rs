//! Execution summary of a sweep.

use granflow_core::{ConfigKey, FlowError, RunProvenance, SimulationConfig};
use serde::{Deserialize, Serialize};

/// A trial that produced no result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrialFailure {
    /// Obstacle count of the failed trial.
    pub obstacle_count: u32,
    /// Acceleration of the failed trial.
    pub acceleration: f64,
    /// Repetition index of the failed trial.
    pub repetition_index: u32,
    /// Error reported for the trial.
    pub error: FlowError,
}

impl TrialFailure {
    pub(crate) fn new(config: &SimulationConfig, error: FlowError) -> Self {
        Self {
            obstacle_count: config.obstacle_count,
            acceleration: config.acceleration,
            repetition_index: config.repetition_index,
            error,
        }
    }

    /// Aggregation key of the failed trial.
    pub fn key(&self) -> ConfigKey {
        ConfigKey::new(self.obstacle_count, self.acceleration)
    }
}

/// Summary of a sweep execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepReport {
    /// Hash of the plan driving the sweep.
    pub plan_hash: String,
    /// Number of trials scheduled.
    pub total: usize,
    /// Number of trials that produced a result.
    pub completed: usize,
    /// Number of trials dropped after a failure.
    pub failed: usize,
    /// Failure details, ordered by configuration and repetition.
    pub failures: Vec<TrialFailure>,
    /// Configurations for which every repetition failed.
    pub uncovered: Vec<ConfigKey>,
    /// Provenance of the sweep run.
    pub provenance: RunProvenance,
}
