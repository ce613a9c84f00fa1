//! CSV and JSON artefacts written by an analysis run.

use std::fmt::Display;
use std::fs;
use std::path::{Path, PathBuf};

use granflow_core::serde::to_canonical_json_bytes;
use granflow_core::{ErrorInfo, FlowError, TrialResult};

use crate::aggregate::cumulative_by_configuration;
use crate::pipeline::AnalysisReport;
use crate::table::PivotTable;

/// Directory (relative to the sweep directory) holding analysis artefacts.
pub const ANALYSIS_DIR: &str = "analysis";
/// Mean flow rate, obstacle count → acceleration.
pub const MEAN_FILE: &str = "flow_rate_mean.csv";
/// Mean flow rate, acceleration → obstacle count.
pub const MEAN_PIVOTED_FILE: &str = "flow_rate_mean_by_acceleration.csv";
/// Flow-rate standard deviation, obstacle count → acceleration.
pub const STD_FILE: &str = "flow_rate_std.csv";
/// Flow-rate standard deviation, acceleration → obstacle count.
pub const STD_PIVOTED_FILE: &str = "flow_rate_std_by_acceleration.csv";
/// Best resistance per obstacle count.
pub const RESISTANCE_FILE: &str = "resistance.csv";
/// Squared-error curves of the resistance fits.
pub const ERROR_CURVES_FILE: &str = "resistance_error_curves.csv";
/// Per-trial `m·a/Q` statistics.
pub const NAIVE_RESISTANCE_FILE: &str = "naive_resistance.csv";
/// Cumulative discharge curves of repeated trials.
pub const CUMULATIVE_FILE: &str = "cumulative_discharges.csv";
/// Structured report.
pub const REPORT_FILE: &str = "analysis_report.json";

fn export_error(path: &Path, err: impl ToString) -> FlowError {
    FlowError::Io(ErrorInfo::new("analysis-export", err.to_string()).with_context("path", path.display()))
}

fn open_csv(path: &Path) -> Result<csv::Writer<fs::File>, FlowError> {
    csv::Writer::from_path(path).map_err(|err| export_error(path, err))
}

/// Writes a two-key table as `row,col,value` records under the given headers.
pub fn write_table<R, C, V>(
    path: &Path,
    headers: [&str; 3],
    table: &PivotTable<R, C, V>,
) -> Result<(), FlowError>
where
    R: Ord + Copy + Display,
    C: Ord + Copy + Display,
    V: Display,
{
    let mut wtr = open_csv(path)?;
    wtr.write_record(headers)
        .map_err(|err| export_error(path, err))?;
    for (row, col, value) in table.iter() {
        wtr.write_record([row.to_string(), col.to_string(), value.to_string()])
            .map_err(|err| export_error(path, err))?;
    }
    wtr.flush().map_err(|err| export_error(path, err))
}

fn write_resistance(path: &Path, report: &AnalysisReport) -> Result<(), FlowError> {
    let mut wtr = open_csv(path)?;
    wtr.write_record(["obstacle_count", "best_resistance", "squared_error"])
        .map_err(|err| export_error(path, err))?;
    for (obstacle_count, fit) in &report.resistance {
        wtr.write_record([
            obstacle_count.to_string(),
            fit.best_resistance.to_string(),
            fit.min_error().to_string(),
        ])
        .map_err(|err| export_error(path, err))?;
    }
    wtr.flush().map_err(|err| export_error(path, err))
}

fn write_error_curves(path: &Path, report: &AnalysisReport) -> Result<(), FlowError> {
    let mut wtr = open_csv(path)?;
    wtr.write_record(["obstacle_count", "candidate", "squared_error"])
        .map_err(|err| export_error(path, err))?;
    for (obstacle_count, fit) in &report.resistance {
        for point in &fit.squared_error {
            wtr.write_record([
                obstacle_count.to_string(),
                point.resistance.to_string(),
                point.squared_error.to_string(),
            ])
            .map_err(|err| export_error(path, err))?;
        }
    }
    wtr.flush().map_err(|err| export_error(path, err))
}

fn write_naive_resistance(path: &Path, report: &AnalysisReport) -> Result<(), FlowError> {
    let mut wtr = open_csv(path)?;
    wtr.write_record(["obstacle_count", "acceleration", "mean", "std"])
        .map_err(|err| export_error(path, err))?;
    let naive = &report.naive_resistance;
    for (obstacle_count, acceleration, mean) in naive.mean.iter() {
        let std = naive.std.get(obstacle_count, acceleration).copied().unwrap_or(0.0);
        wtr.write_record([
            obstacle_count.to_string(),
            acceleration.to_string(),
            mean.to_string(),
            std.to_string(),
        ])
        .map_err(|err| export_error(path, err))?;
    }
    wtr.flush().map_err(|err| export_error(path, err))
}

fn write_cumulative(path: &Path, trials: &[TrialResult]) -> Result<(), FlowError> {
    let mut wtr = open_csv(path)?;
    wtr.write_record(["obstacle_count", "acceleration", "trial", "time", "count"])
        .map_err(|err| export_error(path, err))?;
    for (key, runs) in cumulative_by_configuration(trials) {
        for (trial, curve) in runs.iter().enumerate() {
            for (time, count) in curve {
                wtr.write_record([
                    key.obstacle_count.to_string(),
                    key.acceleration.to_string(),
                    trial.to_string(),
                    time.to_string(),
                    count.to_string(),
                ])
                .map_err(|err| export_error(path, err))?;
            }
        }
    }
    wtr.flush().map_err(|err| export_error(path, err))
}

/// Writes every analysis artefact into `out_dir`, returning the paths written.
pub fn export_analysis(
    out_dir: &Path,
    report: &AnalysisReport,
    trials: &[TrialResult],
) -> Result<Vec<PathBuf>, FlowError> {
    fs::create_dir_all(out_dir).map_err(|err| export_error(out_dir, err))?;
    let path = |name: &str| out_dir.join(name);

    write_table(
        &path(MEAN_FILE),
        ["obstacle_count", "acceleration", "mean_flow_rate"],
        &report.mean_flow_rate,
    )?;
    write_table(
        &path(MEAN_PIVOTED_FILE),
        ["acceleration", "obstacle_count", "mean_flow_rate"],
        &report.mean_flow_rate.pivot(),
    )?;
    write_table(
        &path(STD_FILE),
        ["obstacle_count", "acceleration", "std_flow_rate"],
        &report.std_flow_rate,
    )?;
    write_table(
        &path(STD_PIVOTED_FILE),
        ["acceleration", "obstacle_count", "std_flow_rate"],
        &report.std_flow_rate.pivot(),
    )?;
    write_resistance(&path(RESISTANCE_FILE), report)?;
    write_error_curves(&path(ERROR_CURVES_FILE), report)?;
    write_naive_resistance(&path(NAIVE_RESISTANCE_FILE), report)?;
    write_cumulative(&path(CUMULATIVE_FILE), trials)?;

    let report_path = path(REPORT_FILE);
    let bytes = to_canonical_json_bytes(report)?;
    fs::write(&report_path, bytes).map_err(|err| export_error(&report_path, err))?;

    Ok([
        MEAN_FILE,
        MEAN_PIVOTED_FILE,
        STD_FILE,
        STD_PIVOTED_FILE,
        RESISTANCE_FILE,
        ERROR_CURVES_FILE,
        NAIVE_RESISTANCE_FILE,
        CUMULATIVE_FILE,
        REPORT_FILE,
    ]
    .into_iter()
    .map(path)
    .collect())
}
