//! End-to-end analysis of a result store: flow rates, statistics and
//! resistance fits.

use std::collections::BTreeMap;

use granflow_core::{
    stable_hash_string, ConfigKey, ErrorInfo, FlowError, RunProvenance, TrialResult,
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::aggregate::{
    flow_rate_samples, mean_table, naive_resistance, std_table, ExcludedTrial, NaiveResistance,
};
use crate::flow_rate::{CutoffPolicy, SlopeEstimator};
use crate::resistance::{fit_all, ResistanceCurve, ResistanceGrid};
use crate::table::StatTable;

/// Settings of one analysis run.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct AnalysisOpts {
    /// Slope estimator applied to every trial.
    pub estimator: SlopeEstimator,
    /// Steady-state cutoff.
    pub cutoff: CutoffPolicy,
    /// Candidate grid of the resistance fit.
    pub grid: ResistanceGrid,
    /// Fail when any configuration ends with no usable trial.
    pub strict_coverage: bool,
}

/// Everything derived from one analysis run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    /// Settings the report was produced with.
    pub opts: AnalysisOpts,
    /// Trials in the input store.
    pub trials: usize,
    /// Trials that contributed a flow rate.
    pub usable: usize,
    /// Trials without a usable flow rate.
    pub excluded: Vec<ExcludedTrial>,
    /// Configurations skipped because none of their trials were usable.
    pub empty_configurations: Vec<ConfigKey>,
    /// Mean flow rate, obstacle count → acceleration.
    pub mean_flow_rate: StatTable,
    /// Population standard deviation of the flow rate.
    pub std_flow_rate: StatTable,
    /// Fitted resistance per obstacle count.
    pub resistance: ResistanceCurve,
    /// Per-trial `m·a/Q` statistics.
    pub naive_resistance: NaiveResistance,
    /// Hash of the input trials plus generation metadata.
    pub provenance: RunProvenance,
}

impl AnalysisReport {
    /// Best resistance per obstacle count.
    pub fn best_resistances(&self) -> BTreeMap<u32, f64> {
        self.resistance
            .iter()
            .map(|(obstacle_count, fit)| (*obstacle_count, fit.best_resistance))
            .collect()
    }
}

/// Runs the full analysis over the trials of a result store.
pub fn analyze(trials: &[TrialResult], opts: &AnalysisOpts) -> Result<AnalysisReport, FlowError> {
    if trials.is_empty() {
        return Err(FlowError::EmptyResultSet(ErrorInfo::new(
            "empty-store",
            "result store contains no trials",
        )));
    }

    let samples = flow_rate_samples(trials, opts.cutoff, opts.estimator);
    let usable = samples.usable();
    if usable == 0 {
        return Err(FlowError::EmptyResultSet(
            ErrorInfo::new("no-usable-trials", "no trial produced a usable flow rate")
                .with_context("trials", trials.len())
                .with_context("excluded", samples.excluded.len())
                .with_hint("check max_time and the steady-state cutoff"),
        ));
    }
    for key in &samples.empty_configurations {
        warn!(
            obstacle_count = key.obstacle_count,
            acceleration = %key.acceleration,
            "configuration has no usable trials, skipped"
        );
    }
    if opts.strict_coverage && !samples.empty_configurations.is_empty() {
        let listed: Vec<String> = samples
            .empty_configurations
            .iter()
            .map(|key| format!("m{}_a{}", key.obstacle_count, key.acceleration))
            .collect();
        return Err(FlowError::EmptyResultSet(
            ErrorInfo::new(
                "coverage",
                format!(
                    "{} configuration(s) have no usable trials",
                    samples.empty_configurations.len()
                ),
            )
            .with_context("configurations", listed.join(",")),
        ));
    }

    let mean_flow_rate = mean_table(&samples.rates);
    let std_flow_rate = std_table(&samples.rates);
    let masses = particle_masses(trials)?;
    let resistance = fit_all(&opts.grid, &mean_flow_rate, &masses)?;
    let naive_resistance = naive_resistance(trials, opts.cutoff, opts.estimator);
    let input_hash = stable_hash_string(&trials)?;

    info!(
        trials = trials.len(),
        usable,
        excluded = samples.excluded.len(),
        obstacle_counts = resistance.len(),
        "analysis complete"
    );

    Ok(AnalysisReport {
        opts: *opts,
        trials: trials.len(),
        usable,
        excluded: samples.excluded,
        empty_configurations: samples.empty_configurations,
        mean_flow_rate,
        std_flow_rate,
        resistance,
        naive_resistance,
        provenance: RunProvenance::stamp(
            "granflow-analysis",
            env!("CARGO_PKG_VERSION"),
            input_hash,
        ),
    })
}

/// Particle mass per obstacle count; all trials of one obstacle count must agree.
fn particle_masses(trials: &[TrialResult]) -> Result<BTreeMap<u32, f64>, FlowError> {
    let mut masses = BTreeMap::new();
    for trial in trials {
        let mass = trial.config.particle_mass;
        let recorded = *masses.entry(trial.config.obstacle_count).or_insert(mass);
        if recorded != mass {
            return Err(FlowError::Config(
                ErrorInfo::new("mixed-mass", "trials of one obstacle count disagree on particle mass")
                    .with_context("obstacle_count", trial.config.obstacle_count)
                    .with_context("first", recorded)
                    .with_context("other", mass),
            ));
        }
    }
    Ok(masses)
}
