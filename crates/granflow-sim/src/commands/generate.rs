use std::error::Error;
use std::fs;
use std::path::PathBuf;

use clap::Args;
use granflow_core::{ErrorInfo, FlowError};
use granflow_sweep::{load_plan, persist_sweep, run_sweep, ProcessEngine, PLAN_FILE};
use tracing::info;

#[derive(Args, Debug)]
pub struct GenerateArgs {
    /// Output directory for trial artefacts and persisted results.
    pub dir: PathBuf,
    /// YAML sweep plan; defaults to `<dir>/plan.yaml`.
    #[arg(long)]
    pub plan: Option<PathBuf>,
    /// Override the worker pool width from the plan.
    #[arg(long)]
    pub parallelism: Option<usize>,
    /// Keep per-trial engine output after absorption.
    #[arg(long)]
    pub keep_raw: bool,
}

pub fn run(args: &GenerateArgs) -> Result<(), Box<dyn Error>> {
    fs::create_dir_all(&args.dir)?;
    let plan_path = args
        .plan
        .clone()
        .unwrap_or_else(|| args.dir.join(PLAN_FILE));
    let mut plan = load_plan(&plan_path)?;
    if let Some(parallelism) = args.parallelism {
        plan.scheduler.parallelism = parallelism;
    }
    plan.keep_raw_outputs |= args.keep_raw;

    let engine = ProcessEngine::from_spec(&plan.engine);
    let outcome = run_sweep(&plan, &engine, &args.dir)?;
    persist_sweep(&args.dir, &plan, &outcome)?;

    let report = &outcome.report;
    println!(
        "{}/{} simulations completed, {} failed",
        report.completed, report.total, report.failed
    );
    for failure in &report.failures {
        println!(
            "  failed: obstacle_count={} acceleration={} repetition={}: {}",
            failure.obstacle_count, failure.acceleration, failure.repetition_index, failure.error
        );
    }
    info!(dir = %args.dir.display(), "results persisted");

    if outcome.store.is_empty() {
        return Err(Box::new(FlowError::EmptyResultSet(
            ErrorInfo::new("sweep-empty", "every trial of the sweep failed")
                .with_context("trials", report.total),
        )));
    }
    Ok(())
}
