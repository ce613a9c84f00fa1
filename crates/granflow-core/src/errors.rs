//! Structured error types shared across granflow crates.

use std::collections::BTreeMap;
use std::fmt::{self, Display};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Structured payload attached to every [`FlowError`] variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorInfo {
    /// Stable machine readable error code.
    pub code: String,
    /// Human readable diagnostic message.
    pub message: String,
    /// Contextual key value pairs (configuration values, paths, etc.).
    #[serde(default)]
    pub context: BTreeMap<String, String>,
    /// Optional hint that may help the caller resolve the issue.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

impl ErrorInfo {
    /// Creates a new error payload with the provided code and message.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            context: BTreeMap::new(),
            hint: None,
        }
    }

    /// Adds a context entry to the payload.
    pub fn with_context(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.context.insert(key.into(), value.to_string());
        self
    }

    /// Sets a human readable hint for remediation.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

/// Canonical error type for sweep execution and transport analysis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[serde(tag = "family", content = "detail")]
pub enum FlowError {
    /// The external simulation engine could not be run or exited non-zero.
    #[error("simulation failure: {0}")]
    SimulationFailure(ErrorInfo),
    /// Too few post-cutoff discharge events to estimate a flow rate.
    #[error("insufficient data: {0}")]
    InsufficientData(ErrorInfo),
    /// Persisted sweep results are missing or cannot be parsed.
    #[error("result store corrupt: {0}")]
    ResultStoreCorrupt(ErrorInfo),
    /// An analysis pass ended up with no usable results.
    #[error("empty result set: {0}")]
    EmptyResultSet(ErrorInfo),
    /// Invalid plan, parameter range or malformed engine output.
    #[error("config error: {0}")]
    Config(ErrorInfo),
    /// Filesystem failures outside the result store.
    #[error("io error: {0}")]
    Io(ErrorInfo),
}

impl Display for ErrorInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (code: {})", self.message, self.code)?;
        if !self.context.is_empty() {
            write!(f, " | context: [")?;
            for (idx, (key, value)) in self.context.iter().enumerate() {
                if idx > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{key}={value}")?;
            }
            write!(f, "]")?;
        }
        if let Some(hint) = &self.hint {
            write!(f, " | hint: {hint}")?;
        }
        Ok(())
    }
}

impl FlowError {
    /// Returns a reference to the payload describing the error.
    pub fn info(&self) -> &ErrorInfo {
        match self {
            FlowError::SimulationFailure(info)
            | FlowError::InsufficientData(info)
            | FlowError::ResultStoreCorrupt(info)
            | FlowError::EmptyResultSet(info)
            | FlowError::Config(info)
            | FlowError::Io(info) => info,
        }
    }

    /// Adds a context entry to the payload, keeping the variant.
    pub fn with_context(self, key: impl Into<String>, value: impl ToString) -> Self {
        match self {
            FlowError::SimulationFailure(info) => {
                FlowError::SimulationFailure(info.with_context(key, value))
            }
            FlowError::InsufficientData(info) => {
                FlowError::InsufficientData(info.with_context(key, value))
            }
            FlowError::ResultStoreCorrupt(info) => {
                FlowError::ResultStoreCorrupt(info.with_context(key, value))
            }
            FlowError::EmptyResultSet(info) => FlowError::EmptyResultSet(info.with_context(key, value)),
            FlowError::Config(info) => FlowError::Config(info.with_context(key, value)),
            FlowError::Io(info) => FlowError::Io(info.with_context(key, value)),
        }
    }

    /// Whether the error is scoped to a single trial and may be recovered
    /// by excluding that trial.
    pub fn is_per_trial(&self) -> bool {
        matches!(
            self,
            FlowError::SimulationFailure(_) | FlowError::InsufficientData(_)
        )
    }
}

/// Shorthand for an [`FlowError::Io`] built from any displayable error.
pub fn io_error(code: &str, err: impl ToString) -> FlowError {
    FlowError::Io(ErrorInfo::new(code, err.to_string()))
}

/// Shorthand for an [`FlowError::Config`] built from any displayable error.
pub fn config_error(code: &str, err: impl ToString) -> FlowError {
    FlowError::Config(ErrorInfo::new(code, err.to_string()))
}
