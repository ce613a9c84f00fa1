//! Append-only collection of trial results and its durable JSON form.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use granflow_core::serde::{from_json_slice, to_canonical_json_bytes};
use granflow_core::{ErrorInfo, FlowError, TrialResult};
use serde::{Deserialize, Serialize};

/// Default results file name inside a sweep directory.
pub const RESULTS_FILE: &str = "results.json";

fn corrupt(code: &str, path: &Path, err: impl ToString) -> FlowError {
    FlowError::ResultStoreCorrupt(
        ErrorInfo::new(code, err.to_string()).with_context("path", path.display()),
    )
}

/// Ordered trial results. Repeated configurations are expected.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResultStore {
    trials: Vec<TrialResult>,
}

impl ResultStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a completed trial.
    pub fn push(&mut self, trial: TrialResult) {
        self.trials.push(trial);
    }

    /// Trials in insertion order.
    pub fn trials(&self) -> &[TrialResult] {
        &self.trials
    }

    /// Number of stored trials.
    pub fn len(&self) -> usize {
        self.trials.len()
    }

    /// Whether the store holds no trials.
    pub fn is_empty(&self) -> bool {
        self.trials.is_empty()
    }

    /// Iterates over stored trials.
    pub fn iter(&self) -> std::slice::Iter<'_, TrialResult> {
        self.trials.iter()
    }
}

impl FromIterator<TrialResult> for ResultStore {
    fn from_iter<I: IntoIterator<Item = TrialResult>>(iter: I) -> Self {
        Self {
            trials: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a ResultStore {
    type Item = &'a TrialResult;
    type IntoIter = std::slice::Iter<'a, TrialResult>;

    fn into_iter(self) -> Self::IntoIter {
        self.trials.iter()
    }
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|name| name.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

/// Writes the whole store to `path`. The data goes to a sibling temporary
/// file that is synced and renamed into place, so readers only ever see a
/// complete file.
pub fn save(store: &ResultStore, path: &Path) -> Result<(), FlowError> {
    if let Some(bad) = store
        .iter()
        .flat_map(|trial| trial.exit_times.iter())
        .find(|time| !time.is_finite())
    {
        return Err(FlowError::Config(
            ErrorInfo::new("store-non-finite", "exit times must be finite")
                .with_context("value", bad),
        ));
    }
    let bytes = to_canonical_json_bytes(store)?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .map_err(|err| FlowError::Io(ErrorInfo::new("store-dir", err.to_string())))?;
    }
    let tmp = temp_path(path);
    let write = || -> std::io::Result<()> {
        let mut writer = BufWriter::new(File::create(&tmp)?);
        writer.write_all(&bytes)?;
        writer.flush()?;
        writer.get_ref().sync_all()?;
        fs::rename(&tmp, path)
    };
    write().map_err(|err| {
        let _ = fs::remove_file(&tmp);
        FlowError::Io(
            ErrorInfo::new("store-write", err.to_string()).with_context("path", path.display()),
        )
    })
}

/// Reloads a store written by [`save`].
pub fn load(path: &Path) -> Result<ResultStore, FlowError> {
    let bytes = fs::read(path).map_err(|err| corrupt("store-read", path, err))?;
    from_json_slice(&bytes).map_err(|err| corrupt("store-parse", path, err))
}
