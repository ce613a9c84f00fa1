//! Steady-state flow rate from a trial's discharge timestamps.

use granflow_core::{ErrorInfo, FlowError, TrialConfig};
use serde::{Deserialize, Serialize};

/// Slope estimator applied to the cumulative discharge curve. One estimator
/// is used for a whole analysis run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SlopeEstimator {
    /// Ordinary least-squares regression of cumulative count on time.
    #[default]
    LeastSquares,
    /// Count difference over time difference between the first and last
    /// retained discharges.
    Endpoint,
}

/// Time threshold before which discharges are ignored.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", tag = "kind", content = "value")]
pub enum CutoffPolicy {
    /// Fraction of each trial's own `max_time`.
    FractionOfMaxTime(f64),
    /// The same absolute time for every trial.
    Fixed(f64),
}

impl Default for CutoffPolicy {
    fn default() -> Self {
        CutoffPolicy::FractionOfMaxTime(0.5)
    }
}

impl CutoffPolicy {
    /// Cutoff applied to the given trial.
    pub fn cutoff_for(&self, config: &TrialConfig) -> f64 {
        match *self {
            CutoffPolicy::FractionOfMaxTime(fraction) => config.max_time * fraction,
            CutoffPolicy::Fixed(time) => time,
        }
    }
}

fn insufficient(message: impl Into<String>, retained: usize, cutoff: f64) -> FlowError {
    FlowError::InsufficientData(
        ErrorInfo::new("flow-rate", message)
            .with_context("retained", retained)
            .with_context("cutoff", cutoff),
    )
}

/// Retained discharge times (`>= cutoff`), sorted ascending. The cumulative
/// count of the i-th entry is `i + 1`.
pub fn steady_state_times(exit_times: &[f64], cutoff: f64) -> Vec<f64> {
    let mut times: Vec<f64> = exit_times
        .iter()
        .copied()
        .filter(|time| *time >= cutoff)
        .collect();
    times.sort_by(f64::total_cmp);
    times
}

/// Estimates the steady-state flow rate (discharges per unit time).
///
/// Fails with [`FlowError::InsufficientData`] when fewer than two discharges
/// survive the cutoff, or when they all share one timestamp.
pub fn estimate(
    exit_times: &[f64],
    cutoff: f64,
    estimator: SlopeEstimator,
) -> Result<f64, FlowError> {
    let times = steady_state_times(exit_times, cutoff);
    if times.len() < 2 {
        return Err(insufficient(
            format!("{} discharge(s) after cutoff, need at least 2", times.len()),
            times.len(),
            cutoff,
        ));
    }
    let slope = match estimator {
        SlopeEstimator::LeastSquares => least_squares_slope(&times),
        SlopeEstimator::Endpoint => endpoint_slope(&times),
    };
    slope.ok_or_else(|| insufficient("retained discharges share a single timestamp", times.len(), cutoff))
}

fn least_squares_slope(times: &[f64]) -> Option<f64> {
    let n = times.len() as f64;
    let mean_t = times.iter().sum::<f64>() / n;
    let mean_count = (n + 1.0) / 2.0;
    let mut sxy = 0.0;
    let mut sxx = 0.0;
    for (idx, t) in times.iter().enumerate() {
        let dt = t - mean_t;
        sxy += dt * ((idx + 1) as f64 - mean_count);
        sxx += dt * dt;
    }
    (sxx > 0.0).then(|| sxy / sxx)
}

fn endpoint_slope(times: &[f64]) -> Option<f64> {
    let first = times[0];
    let last = times[times.len() - 1];
    let span = last - first;
    (span > 0.0).then(|| (times.len() - 1) as f64 / span)
}

/// Full cumulative discharge curve `(time, count)` of one trial.
pub fn cumulative_discharges(exit_times: &[f64]) -> Vec<(f64, usize)> {
    let mut times = exit_times.to_vec();
    times.sort_by(f64::total_cmp);
    times
        .into_iter()
        .enumerate()
        .map(|(idx, time)| (time, idx + 1))
        .collect()
}
