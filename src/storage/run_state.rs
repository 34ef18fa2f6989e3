//! Run-state sidecar
//!
//! Written next to the candidate table on every checkpoint so an interrupted
//! run can resume from the page after the last one it completed.

use crate::storage::{write_atomic, RunStatus, StorageError, StorageResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Progress marker for one harvest run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunState {
    pub status: RunStatus,

    /// Last listing page whose profiles were fully merged, 0 if none
    pub last_page: u32,

    /// Candidates in the table at the time of writing
    pub records: usize,

    /// SHA-256 of the configuration file the run was started with
    #[serde(default)]
    pub config_hash: String,

    pub started_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl RunState {
    /// Creates the state for a run starting now
    pub fn start(config_hash: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            status: RunStatus::Running,
            last_page: 0,
            records: 0,
            config_hash: config_hash.into(),
            started_at: now,
            updated_at: now,
        }
    }

    /// Reads a state file, `Ok(None)` if it does not exist
    pub fn load(path: &Path) -> StorageResult<Option<Self>> {
        if !path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(path).map_err(|source| StorageError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let state = toml::from_str(&content).map_err(|source| StorageError::Decode {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Some(state))
    }

    /// Writes the state file atomically, stamping `updated_at`
    pub fn save(&mut self, path: &Path) -> StorageResult<()> {
        self.updated_at = Utc::now();
        let encoded = toml::to_string(self)?;
        write_atomic(path, |file| {
            file.write_all(encoded.as_bytes())
                .map_err(|source| StorageError::Io {
                    path: path.to_path_buf(),
                    source,
                })
        })
    }
}

/// Location of the state sidecar for a table path
pub fn state_path_for(table: &Path) -> PathBuf {
    let mut name = table
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".state.toml");
    table.with_file_name(name)
}
