//! Bounded parallel execution of trials and persistence of a finished sweep.

use std::any::Any;
use std::collections::BTreeSet;
use std::fs;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};

use crossbeam_channel::unbounded;
use granflow_core::serde::to_canonical_json_bytes;
use granflow_core::{io_error, ErrorInfo, FlowError, RunProvenance, SimulationConfig, TrialResult};
use tracing::{debug, info, warn};

use crate::engine::SimulationEngine;
use crate::outputs::read_discharges;
use crate::plan::SweepPlan;
use crate::report::{SweepReport, TrialFailure};
use crate::store::{self, ResultStore, RESULTS_FILE};

/// Sub-directory holding per-trial engine output.
pub const TRIALS_DIR: &str = "trials";
/// Sweep report file name.
pub const SWEEP_REPORT_FILE: &str = "sweep_report.json";
/// Plan snapshot file name.
pub const PLAN_FILE: &str = "plan.yaml";

/// Options governing trial execution.
#[derive(Debug, Clone)]
pub struct SweepOpts {
    /// Number of trials executed simultaneously.
    pub parallelism: usize,
    /// Keep per-trial engine output after absorption.
    pub keep_raw_outputs: bool,
}

impl SweepOpts {
    /// Options taken from a plan.
    pub fn from_plan(plan: &SweepPlan) -> Self {
        Self {
            parallelism: plan.scheduler.parallelism,
            keep_raw_outputs: plan.keep_raw_outputs,
        }
    }
}

/// Results of a sweep: the absorbed trials and the execution summary.
#[derive(Debug, Clone)]
pub struct SweepOutcome {
    /// Results of every successful trial, in completion order.
    pub store: ResultStore,
    /// Execution summary.
    pub report: SweepReport,
}

/// Trials that finished executing, successful or not.
#[derive(Debug, Clone, Default)]
pub struct TrialBatch {
    /// Successful trials in completion order.
    pub store: ResultStore,
    /// Failed trials in completion order.
    pub failures: Vec<TrialFailure>,
}

struct TrialMessage<'a> {
    config: &'a SimulationConfig,
    dir: PathBuf,
    result: Result<TrialResult, FlowError>,
}

/// Invokes one trial in its own output directory and returns that directory.
pub fn run_trial(
    engine: &dyn SimulationEngine,
    config: &SimulationConfig,
    dir: &Path,
) -> Result<PathBuf, FlowError> {
    fs::create_dir_all(dir).map_err(|err| {
        FlowError::SimulationFailure(
            ErrorInfo::new("trial-dir", err.to_string()).with_context("path", dir.display()),
        )
    })?;
    engine.run(config, dir)?;
    Ok(dir.to_path_buf())
}

/// Converts the engine output of a finished trial into a [`TrialResult`].
pub fn absorb_trial(config: &SimulationConfig, dir: &Path) -> Result<TrialResult, FlowError> {
    let exit_times = read_discharges(dir).map_err(|err| {
        FlowError::SimulationFailure(
            ErrorInfo::new("engine-output", err.info().message.clone())
                .with_context("obstacle_count", config.obstacle_count)
                .with_context("acceleration", config.acceleration)
                .with_context("repetition", config.repetition_index)
                .with_context("path", dir.display()),
        )
    })?;
    Ok(TrialResult::new(config.trial_config(), exit_times))
}

fn engine_panic(config: &SimulationConfig, payload: &(dyn Any + Send)) -> FlowError {
    let message = payload
        .downcast_ref::<&str>()
        .map(|msg| msg.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "engine panicked".to_string());
    FlowError::SimulationFailure(
        ErrorInfo::new("engine-panic", message)
            .with_context("obstacle_count", config.obstacle_count)
            .with_context("acceleration", config.acceleration)
            .with_context("repetition", config.repetition_index),
    )
}

fn cleanup_trial_dir(dir: &Path) {
    if let Err(err) = fs::remove_dir_all(dir) {
        warn!(path = %dir.display(), error = %err, "failed to remove trial output");
    }
}

/// Executes `trials` on a pool of `opts.parallelism` workers. Results are
/// consumed on the calling thread as they complete, so the store has a
/// single writer. Failed trials are logged and reported, never propagated.
pub fn run_trials(
    trials: &[SimulationConfig],
    engine: &dyn SimulationEngine,
    root: &Path,
    opts: &SweepOpts,
) -> Result<TrialBatch, FlowError> {
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(opts.parallelism.max(1))
        .thread_name(|idx| format!("granflow-trial-{idx}"))
        .build()
        .map_err(|err| io_error("thread_pool", err))?;
    let total = trials.len();
    let (tx, rx) = unbounded::<TrialMessage<'_>>();

    let batch = pool.in_place_scope(|scope| {
        for config in trials {
            let tx = tx.clone();
            scope.spawn(move |_| {
                let dir = root.join(config.trial_dir_name());
                let result = panic::catch_unwind(AssertUnwindSafe(|| {
                    run_trial(engine, config, &dir).and_then(|dir| absorb_trial(config, &dir))
                }))
                .unwrap_or_else(|payload| Err(engine_panic(config, payload.as_ref())));
                let _ = tx.send(TrialMessage {
                    config,
                    dir,
                    result,
                });
            });
        }
        drop(tx);

        let mut batch = TrialBatch::default();
        for (done, message) in rx.iter().enumerate() {
            let config = message.config;
            match message.result {
                Ok(trial) => {
                    debug!(
                        obstacle_count = config.obstacle_count,
                        acceleration = config.acceleration,
                        repetition = config.repetition_index,
                        discharges = trial.exit_times.len(),
                        "trial absorbed"
                    );
                    batch.store.push(trial);
                    if !opts.keep_raw_outputs {
                        cleanup_trial_dir(&message.dir);
                    }
                }
                Err(err) => {
                    warn!(
                        obstacle_count = config.obstacle_count,
                        acceleration = config.acceleration,
                        repetition = config.repetition_index,
                        max_time = config.max_time,
                        error = %err,
                        "trial failed; excluded from results"
                    );
                    batch.failures.push(TrialFailure::new(config, err));
                }
            }
            info!("{}/{} simulations completed", done + 1, total);
        }
        batch
    });
    Ok(batch)
}

/// Runs every trial of `plan`, writing engine output under
/// `out/trials/<trial>`.
pub fn run_sweep(
    plan: &SweepPlan,
    engine: &dyn SimulationEngine,
    out: &Path,
) -> Result<SweepOutcome, FlowError> {
    plan.validate()?;
    let plan_hash = plan.plan_hash()?;
    let trials = plan.trials();
    let root = out.join(TRIALS_DIR);
    fs::create_dir_all(&root).map_err(|err| io_error("sweep_out_dir", err))?;
    info!(
        trials = trials.len(),
        parallelism = plan.scheduler.parallelism,
        "starting sweep"
    );

    let TrialBatch {
        store,
        mut failures,
    } = run_trials(&trials, engine, &root, &SweepOpts::from_plan(plan))?;

    failures.sort_by(|a, b| {
        a.key()
            .cmp(&b.key())
            .then(a.repetition_index.cmp(&b.repetition_index))
    });
    let covered: BTreeSet<_> = store.iter().map(|trial| trial.key()).collect();
    let uncovered: Vec<_> = trials
        .iter()
        .map(|config| config.key())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .filter(|key| !covered.contains(key))
        .collect();
    for key in &uncovered {
        warn!(
            obstacle_count = key.obstacle_count,
            acceleration = key.acceleration.value(),
            "every repetition failed for configuration"
        );
    }

    let report = SweepReport {
        plan_hash: plan_hash.clone(),
        total: trials.len(),
        completed: store.len(),
        failed: failures.len(),
        failures,
        uncovered,
        provenance: RunProvenance::stamp("granflow-sweep", env!("CARGO_PKG_VERSION"), plan_hash),
    };
    info!(
        completed = report.completed,
        failed = report.failed,
        "sweep finished"
    );
    Ok(SweepOutcome { store, report })
}

/// Persists the results file, sweep report and a snapshot of the plan.
pub fn persist_sweep(
    out: &Path,
    plan: &SweepPlan,
    outcome: &SweepOutcome,
) -> Result<(), FlowError> {
    store::save(&outcome.store, &out.join(RESULTS_FILE))?;
    let report_bytes = to_canonical_json_bytes(&outcome.report)?;
    fs::write(out.join(SWEEP_REPORT_FILE), report_bytes)
        .map_err(|err| io_error("sweep_report_write", err))?;
    fs::write(out.join(PLAN_FILE), plan.to_yaml_string()?)
        .map_err(|err| io_error("plan_write", err))?;
    Ok(())
}
