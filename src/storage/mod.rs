//! Storage module for persisting harvested candidates
//!
//! This module handles:
//! - In-memory accumulation of candidate records, de-duplicated by URL
//! - Atomic CSV checkpoints of the accumulated table
//! - Reading a previous table back for resumption and statistics
//! - The run-state sidecar that records how far a run got

mod run_state;
mod store;

pub use run_state::{state_path_for, RunState};
pub use store::{read_table, ResultStore};

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("CSV error for {path}: {source}")]
    Csv { path: PathBuf, source: csv::Error },

    #[error("IO error for {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Table {path} has unexpected header: {found}")]
    Header { path: PathBuf, found: String },

    #[error("Failed to encode run state: {0}")]
    Encode(#[from] toml::ser::Error),

    #[error("Failed to decode run state {path}: {source}")]
    Decode {
        path: PathBuf,
        source: toml::de::Error,
    },
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Status of a harvest run
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Running,
    Completed,
    Interrupted,
    Failed,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Interrupted => "interrupted",
            Self::Failed => "failed",
        }
    }

    /// Returns true if a later run should pick up where this one stopped
    pub fn is_resumable(&self) -> bool {
        !matches!(self, Self::Completed)
    }
}

/// Writes a file by filling a sibling temp file and renaming it over `path`
///
/// Readers of `path` see either the previous content or the new content in
/// full. On error the temp file is removed and `path` is untouched.
pub(crate) fn write_atomic<F>(path: &Path, fill: F) -> StorageResult<()>
where
    F: FnOnce(&mut File) -> StorageResult<()>,
{
    let io_err = |source| StorageError::Io {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(io_err)?;
    }

    let temp_path = temp_path_for(path);
    let result = (|| {
        let mut file = File::create(&temp_path).map_err(io_err)?;
        fill(&mut file)?;
        file.flush().map_err(io_err)?;
        file.sync_all().map_err(io_err)?;
        fs::rename(&temp_path, path).map_err(io_err)
    })();

    if result.is_err() {
        let _ = fs::remove_file(&temp_path);
    }
    result
}

fn temp_path_for(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}
