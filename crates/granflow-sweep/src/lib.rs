#![deny(missing_docs)]
#![doc = "Parametric sweep orchestration: engine invocation, bounded parallel dispatch and durable result storage."]

mod dispatch;
mod engine;
/// Readers for engine output files.
pub mod outputs;
mod plan;
mod report;
/// Durable result store.
pub mod store;

pub use dispatch::{
    absorb_trial, persist_sweep, run_sweep, run_trial, run_trials, SweepOpts, SweepOutcome,
    TrialBatch, PLAN_FILE, SWEEP_REPORT_FILE, TRIALS_DIR,
};
pub use engine::{engine_args, ProcessEngine, SimulationEngine};
pub use plan::{load_plan, BaseParams, EngineSpec, LinearRange, Scheduler, SweepPlan};
pub use report::{SweepReport, TrialFailure};
pub use store::{ResultStore, RESULTS_FILE};
