//! Per-trial records produced by a sweep.

use serde::{Deserialize, Serialize};

use crate::config::{ConfigKey, TrialConfig};

/// Outcome of one completed trial: its configuration and discharge times.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrialResult {
    /// Discharge timestamps in seconds, in the order the engine wrote them.
    pub exit_times: Vec<f64>,
    /// Configuration subset needed downstream.
    pub config: TrialConfig,
}

impl TrialResult {
    /// Creates a new trial result.
    pub fn new(config: TrialConfig, exit_times: Vec<f64>) -> Self {
        Self { exit_times, config }
    }

    /// Aggregation key of the trial.
    pub fn key(&self) -> ConfigKey {
        self.config.key()
    }
}
