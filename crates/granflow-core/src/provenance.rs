//! Provenance descriptors attached to sweep and analysis artefacts.

use std::collections::BTreeMap;

use chrono::Utc;
use serde::{Deserialize, Serialize};

/// Provenance information attached to every persisted report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct RunProvenance {
    /// Hash of the input plan used to produce the data.
    pub input_hash: String,
    /// ISO-8601 timestamp recording when the artefact was generated.
    pub created_at: String,
    /// Version map for all tools involved in the run.
    pub tool_versions: BTreeMap<String, String>,
}

impl RunProvenance {
    /// Stamps a new provenance record for the given tool and input hash.
    pub fn stamp(tool: &str, version: &str, input_hash: impl Into<String>) -> Self {
        let mut tool_versions = BTreeMap::new();
        tool_versions.insert(tool.to_string(), version.to_string());
        Self {
            input_hash: input_hash.into(),
            created_at: Utc::now().to_rfc3339(),
            tool_versions,
        }
    }
}
