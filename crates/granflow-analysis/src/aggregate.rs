//! Groups per-trial flow rates by configuration and reduces them to
//! mean/standard-deviation tables.

use std::collections::BTreeMap;

use granflow_core::{Accel, ConfigKey, TrialResult};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::flow_rate::{cumulative_discharges, estimate, CutoffPolicy, SlopeEstimator};
use crate::table::{FlowRateTable, StatTable};

/// A trial left out of aggregation, with the configuration that identifies it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExcludedTrial {
    /// Obstacle count of the trial.
    pub obstacle_count: u32,
    /// Driving acceleration of the trial.
    pub acceleration: Accel,
    /// Simulated duration of the trial.
    pub max_time: f64,
    /// Discharges recorded by the trial.
    pub discharges: usize,
    /// Why the trial could not be used.
    pub reason: String,
}

/// Flow-rate samples plus the bookkeeping of what was left out.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FlowRateSamples {
    /// Usable samples per configuration, each cell sorted ascending.
    pub rates: FlowRateTable,
    /// Trials without a usable flow rate.
    pub excluded: Vec<ExcludedTrial>,
    /// Configurations that had trials but none of them usable.
    pub empty_configurations: Vec<ConfigKey>,
}

impl FlowRateSamples {
    /// Number of usable samples across all configurations.
    pub fn usable(&self) -> usize {
        self.rates.iter().map(|(_, _, samples)| samples.len()).sum()
    }
}

/// Mean and population standard deviation of a set of samples.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    /// Arithmetic mean.
    pub mean: f64,
    /// Population (divide-by-n) standard deviation.
    pub std: f64,
}

/// Reduces samples to mean and population standard deviation. Samples are
/// summed in ascending order so the result does not depend on arrival order.
pub fn summarize(samples: &[f64]) -> Option<Summary> {
    if samples.is_empty() {
        return None;
    }
    let mut sorted = samples.to_vec();
    sorted.sort_by(f64::total_cmp);
    let n = sorted.len() as f64;
    let mean = sorted.iter().sum::<f64>() / n;
    let variance = sorted.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n;
    Some(Summary {
        mean,
        std: variance.sqrt(),
    })
}

/// Applies the flow-rate estimator to every trial and groups the usable
/// rates by (obstacle count, acceleration).
pub fn flow_rate_samples(
    trials: &[TrialResult],
    cutoff: CutoffPolicy,
    estimator: SlopeEstimator,
) -> FlowRateSamples {
    let mut rates = FlowRateTable::new();
    let mut seen: BTreeMap<ConfigKey, usize> = BTreeMap::new();
    let mut excluded = Vec::new();

    for trial in trials {
        let key = trial.key();
        seen.entry(key).or_default();
        let limit = cutoff.cutoff_for(&trial.config);
        match estimate(&trial.exit_times, limit, estimator) {
            Ok(rate) => {
                *seen.entry(key).or_default() += 1;
                rates
                    .entry_or_default(key.obstacle_count, key.acceleration)
                    .push(rate);
            }
            Err(err) => {
                warn!(
                    obstacle_count = key.obstacle_count,
                    acceleration = %key.acceleration,
                    max_time = trial.config.max_time,
                    discharges = trial.exit_times.len(),
                    error = %err,
                    "trial excluded from flow-rate aggregation"
                );
                excluded.push(ExcludedTrial {
                    obstacle_count: key.obstacle_count,
                    acceleration: key.acceleration,
                    max_time: trial.config.max_time,
                    discharges: trial.exit_times.len(),
                    reason: err.info().message.clone(),
                });
            }
        }
    }

    let rates = rates.map(|samples| {
        let mut samples = samples.clone();
        samples.sort_by(f64::total_cmp);
        samples
    });
    excluded.sort_by_key(|trial| (trial.obstacle_count, trial.acceleration, trial.discharges));
    let empty_configurations = seen
        .into_iter()
        .filter(|(_, usable)| *usable == 0)
        .map(|(key, _)| key)
        .collect();
    debug!(cells = rates.len(), excluded = excluded.len(), "flow rates grouped");

    FlowRateSamples {
        rates,
        excluded,
        empty_configurations,
    }
}

/// Mean flow rate per configuration.
pub fn mean_table(rates: &FlowRateTable) -> StatTable {
    summary_table(rates, |summary| summary.mean)
}

/// Population standard deviation of the flow rate per configuration.
pub fn std_table(rates: &FlowRateTable) -> StatTable {
    summary_table(rates, |summary| summary.std)
}

fn summary_table(rates: &FlowRateTable, pick: impl Fn(Summary) -> f64) -> StatTable {
    rates
        .iter()
        .filter_map(|(row, col, samples)| {
            summarize(samples).map(|summary| (row, col, pick(summary)))
        })
        .collect()
}

/// Per-trial resistance `m·a/Q` reduced to mean and standard deviation per
/// configuration. Trials whose flow rate is not positive are skipped.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct NaiveResistance {
    /// Mean per-trial resistance.
    pub mean: StatTable,
    /// Population standard deviation of the per-trial resistance.
    pub std: StatTable,
}

/// Computes [`NaiveResistance`] from the raw trials.
pub fn naive_resistance(
    trials: &[TrialResult],
    cutoff: CutoffPolicy,
    estimator: SlopeEstimator,
) -> NaiveResistance {
    let mut samples = FlowRateTable::new();
    for trial in trials {
        let limit = cutoff.cutoff_for(&trial.config);
        let Ok(rate) = estimate(&trial.exit_times, limit, estimator) else {
            continue;
        };
        if rate <= 0.0 || !rate.is_finite() {
            continue;
        }
        let key = trial.key();
        samples
            .entry_or_default(key.obstacle_count, key.acceleration)
            .push(trial.config.particle_mass * key.acceleration.value() / rate);
    }
    NaiveResistance {
        mean: mean_table(&samples),
        std: std_table(&samples),
    }
}

/// Cumulative discharge curves of every repetition, grouped by configuration.
/// Repetitions keep the order they have in the result store.
pub fn cumulative_by_configuration(
    trials: &[TrialResult],
) -> BTreeMap<ConfigKey, Vec<Vec<(f64, usize)>>> {
    let mut curves: BTreeMap<ConfigKey, Vec<Vec<(f64, usize)>>> = BTreeMap::new();
    for trial in trials {
        curves
            .entry(trial.key())
            .or_default()
            .push(cumulative_discharges(&trial.exit_times));
    }
    curves
}

#[cfg(test)]
mod tests {
    use super::*;
    use granflow_core::TrialConfig;

    fn trial(obstacle_count: u32, acceleration: f64, exit_times: Vec<f64>) -> TrialResult {
        TrialResult::new(
            TrialConfig {
                obstacle_count,
                acceleration,
                particle_mass: 1.0,
                max_time: 10.0,
            },
            exit_times,
        )
    }

    #[test]
    fn population_standard_deviation() {
        let summary = summarize(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]).expect("summary");
        assert_eq!(summary.mean, 5.0);
        assert_eq!(summary.std, 2.0);
        assert!(summarize(&[]).is_none());
    }

    #[test]
    fn unusable_trials_are_excluded_and_empty_configurations_listed() {
        let trials = vec![
            trial(80, 1.0, vec![5.0, 6.0, 7.0, 8.0]),
            trial(80, 1.0, vec![1.0]),
            trial(90, 1.0, vec![]),
        ];
        let samples = flow_rate_samples(&trials, CutoffPolicy::default(), SlopeEstimator::Endpoint);
        assert_eq!(samples.usable(), 1);
        assert_eq!(samples.excluded.len(), 2);
        assert_eq!(samples.empty_configurations, vec![ConfigKey::new(90, 1.0)]);
        assert_eq!(samples.rates.get(80, Accel(1.0)), Some(&vec![1.0]));
        assert!(samples.rates.get(90, Accel(1.0)).is_none());
    }

    #[test]
    fn naive_resistance_is_mass_times_acceleration_over_rate() {
        let trials = vec![trial(80, 2.0, vec![5.0, 6.0, 7.0])];
        let naive = naive_resistance(&trials, CutoffPolicy::default(), SlopeEstimator::Endpoint);
        assert_eq!(naive.mean.get(80, Accel(2.0)), Some(&2.0));
        assert_eq!(naive.std.get(80, Accel(2.0)), Some(&0.0));
    }

    #[test]
    fn cumulative_curves_group_repetitions() {
        let trials = vec![
            trial(80, 1.0, vec![3.0, 1.0]),
            trial(80, 1.0, vec![2.0]),
        ];
        let curves = cumulative_by_configuration(&trials);
        let runs = &curves[&ConfigKey::new(80, 1.0)];
        assert_eq!(runs.len(), 2);
        assert_eq!(runs[0], vec![(1.0, 1), (3.0, 2)]);
    }
}
