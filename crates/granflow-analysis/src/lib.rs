#![deny(missing_docs)]
#![doc = "Flow-rate estimation, aggregation and resistance fitting over granular flow sweep results."]

pub mod aggregate;
pub mod export;
pub mod flow_rate;
pub mod pipeline;
pub mod resistance;
pub mod table;

pub use aggregate::{
    cumulative_by_configuration, flow_rate_samples, mean_table, naive_resistance, std_table,
    summarize, ExcludedTrial, FlowRateSamples, NaiveResistance, Summary,
};
pub use export::{export_analysis, write_table, ANALYSIS_DIR, REPORT_FILE};
pub use flow_rate::{cumulative_discharges, estimate, steady_state_times, CutoffPolicy, SlopeEstimator};
pub use pipeline::{analyze, AnalysisOpts, AnalysisReport};
pub use resistance::{
    fit_all, fit_resistance, fit_resistance_on, ErrorPoint, ResistanceCurve, ResistanceFit,
    ResistanceGrid,
};
pub use table::{Cell, FlowRateTable, PivotTable, PivotedStatTable, StatTable, TableEntry};
