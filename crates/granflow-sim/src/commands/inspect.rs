use std::error::Error;
use std::path::PathBuf;

use clap::Args;
use granflow_analysis::{estimate, CutoffPolicy, SlopeEstimator};
use granflow_sweep::outputs::read_trial_outputs;
use serde_json::json;

#[derive(Args, Debug)]
pub struct InspectArgs {
    /// Trial directory written by the engine.
    pub trial_dir: PathBuf,
}

pub fn run(args: &InspectArgs) -> Result<(), Box<dyn Error>> {
    let outputs = read_trial_outputs(&args.trial_dir)?;
    let echo = &outputs.config;
    let config = echo.trial_config()?;
    let cutoff = CutoffPolicy::default().cutoff_for(&config);
    let rate = |estimator: SlopeEstimator| estimate(&outputs.discharges, cutoff, estimator).ok();

    let first = outputs.discharges.iter().copied().reduce(f64::min);
    let last = outputs.discharges.iter().copied().reduce(f64::max);
    let summary = json!({
        "dir": outputs.dir.display().to_string(),
        "config": echo,
        "discharges": {
            "count": outputs.discharges.len(),
            "first": first,
            "last": last,
            "cutoff": cutoff,
        },
        "flow_rate": {
            "least_squares": rate(SlopeEstimator::LeastSquares),
            "endpoint": rate(SlopeEstimator::Endpoint),
        },
        "obstacles": outputs.obstacles.as_ref().map(Vec::len),
        "snapshots": outputs.snapshots.as_ref().map(|snapshots| json!({
            "count": snapshots.len(),
            "first_time": snapshots.first().map(|snapshot| snapshot.time),
            "last_time": snapshots.last().map(|snapshot| snapshot.time),
        })),
    });
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}
