use std::error::Error;
use std::path::PathBuf;

use clap::{Args, ValueEnum};
use granflow_analysis::{
    analyze, export_analysis, AnalysisOpts, CutoffPolicy, SlopeEstimator, ANALYSIS_DIR,
};
use granflow_sweep::store::{self, RESULTS_FILE};
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum EstimatorArg {
    /// Least-squares regression of cumulative count on time.
    LeastSquares,
    /// Count difference over time difference of the first and last discharge.
    Endpoint,
}

impl From<EstimatorArg> for SlopeEstimator {
    fn from(arg: EstimatorArg) -> Self {
        match arg {
            EstimatorArg::LeastSquares => SlopeEstimator::LeastSquares,
            EstimatorArg::Endpoint => SlopeEstimator::Endpoint,
        }
    }
}

#[derive(Args, Debug)]
pub struct PlotArgs {
    /// Sweep directory holding `results.json`.
    pub dir: PathBuf,
    /// Slope estimator applied to every trial.
    #[arg(long, value_enum, default_value_t = EstimatorArg::LeastSquares)]
    pub estimator: EstimatorArg,
    /// Steady-state cutoff as a fraction of each trial's max_time.
    #[arg(long, default_value_t = 0.5)]
    pub cutoff_fraction: f64,
    /// Fail when any configuration has no usable trial.
    #[arg(long)]
    pub strict_coverage: bool,
}

pub fn run(args: &PlotArgs) -> Result<(), Box<dyn Error>> {
    if !(0.0..=1.0).contains(&args.cutoff_fraction) {
        return Err(format!(
            "--cutoff-fraction must lie in [0, 1], got {}",
            args.cutoff_fraction
        )
        .into());
    }
    let results = store::load(&args.dir.join(RESULTS_FILE))?;
    let opts = AnalysisOpts {
        estimator: args.estimator.into(),
        cutoff: CutoffPolicy::FractionOfMaxTime(args.cutoff_fraction),
        strict_coverage: args.strict_coverage,
        ..AnalysisOpts::default()
    };
    let report = analyze(results.trials(), &opts)?;
    let out = args.dir.join(ANALYSIS_DIR);
    let written = export_analysis(&out, &report, results.trials())?;
    info!(files = written.len(), dir = %out.display(), "analysis exported");

    println!(
        "{} of {} trials usable, {} excluded",
        report.usable,
        report.trials,
        report.excluded.len()
    );
    for key in &report.empty_configurations {
        println!(
            "  skipped: obstacle_count={} acceleration={} has no usable trials",
            key.obstacle_count, key.acceleration
        );
    }
    for (obstacle_count, resistance) in report.best_resistances() {
        println!("obstacle_count={obstacle_count} resistance={resistance:.4}");
    }
    Ok(())
}
