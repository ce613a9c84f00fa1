#![deny(missing_docs)]
#![doc = "Core types and errors shared by the granflow sweep and analysis crates."]

pub mod config;
pub mod errors;
/// Canonical hashing helpers.
pub mod hash;
pub mod provenance;
pub mod serde;
pub mod trial;

pub use config::{integral_count_from_f64, Accel, ConfigKey, SimulationConfig, TrialConfig};
pub use errors::{config_error, io_error, ErrorInfo, FlowError};
pub use hash::stable_hash_string;
pub use provenance::RunProvenance;
pub use trial::TrialResult;
