//! Durable storage for volume history and alert timestamps
//!
//! The alerting engine only sees the [`StateStore`] trait, so the backend can
//! be swapped without touching the statistics or cooldown logic:
//! - `json`: two pretty-printed JSON documents, rewritten atomically each sweep
//! - `sqlite`: one database file, each save is a single transaction

mod json_file;
mod sqlite;

pub use json_file::JsonFileStore;
pub use sqlite::SqliteStore;

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::cooldown::AlertTimestamps;
use crate::error::PersistenceResult;
use crate::history::HistoryMap;

/// Storage backend for the alerting engine's persisted state.
///
/// Loads of missing state return empty maps. Saves overwrite everything
/// previously stored for that document.
pub trait StateStore: Send + Sync {
    fn load_history(&self) -> PersistenceResult<HistoryMap>;

    fn save_history(&self, history: &HistoryMap) -> PersistenceResult<()>;

    fn load_alert_timestamps(&self) -> PersistenceResult<AlertTimestamps>;

    fn save_alert_timestamps(&self, timestamps: &AlertTimestamps) -> PersistenceResult<()>;

    /// Human-readable location for logs
    fn describe(&self) -> String;
}

/// Available storage backends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StateBackend {
    #[default]
    Json,
    Sqlite,
}

impl std::str::FromStr for StateBackend {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "json" => Ok(StateBackend::Json),
            "sqlite" => Ok(StateBackend::Sqlite),
            _ => Err(format!(
                "Unknown state backend: {}. Use 'json' or 'sqlite'",
                s
            )),
        }
    }
}

/// Whether the configured backend has written anything under `state_dir`
pub fn state_exists(
    state_dir: impl AsRef<Path>,
    backend: StateBackend,
    volume_file: &str,
    timestamps_file: &str,
    sqlite_file: &str,
) -> bool {
    let state_dir = state_dir.as_ref();
    match backend {
        StateBackend::Json => {
            state_dir.join(volume_file).is_file() || state_dir.join(timestamps_file).is_file()
        }
        StateBackend::Sqlite => state_dir.join(sqlite_file).is_file(),
    }
}

/// Build the configured backend rooted at `state_dir`
pub fn create_state_store(
    state_dir: impl AsRef<Path>,
    backend: StateBackend,
    volume_file: &str,
    timestamps_file: &str,
    sqlite_file: &str,
) -> Result<Box<dyn StateStore>> {
    let state_dir = state_dir.as_ref();
    std::fs::create_dir_all(state_dir)
        .with_context(|| format!("Failed to create state directory {}", state_dir.display()))?;

    let store: Box<dyn StateStore> = match backend {
        StateBackend::Json => Box::new(JsonFileStore::new(
            state_dir.join(volume_file),
            state_dir.join(timestamps_file),
        )),
        StateBackend::Sqlite => Box::new(
            SqliteStore::open(state_dir.join(sqlite_file))
                .context("Failed to open SQLite state store")?,
        ),
    };

    info!("State store: {}", store.describe());
    Ok(store)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_from_str() {
        assert_eq!("json".parse::<StateBackend>(), Ok(StateBackend::Json));
        assert_eq!("SQLite".parse::<StateBackend>(), Ok(StateBackend::Sqlite));
        assert!("redis".parse::<StateBackend>().is_err());
    }

    #[test]
    fn test_create_state_store_creates_directory() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("state").join("alerts");

        let store = create_state_store(
            &nested,
            StateBackend::Json,
            "volume-data.json",
            "alert-timestamps.json",
            "alerts.db",
        )
        .unwrap();

        assert!(nested.is_dir());
        assert!(store.load_history().unwrap().is_empty());
    }

    #[test]
    fn test_state_exists_per_backend() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nowhere");
        let files = ("volume-data.json", "alert-timestamps.json", "alerts.db");

        assert!(!state_exists(&missing, StateBackend::Json, files.0, files.1, files.2));
        assert!(!missing.exists());

        std::fs::write(dir.path().join(files.1), "{}").unwrap();
        assert!(state_exists(dir.path(), StateBackend::Json, files.0, files.1, files.2));
        assert!(!state_exists(dir.path(), StateBackend::Sqlite, files.0, files.1, files.2));

        SqliteStore::open(dir.path().join(files.2)).unwrap();
        assert!(state_exists(dir.path(), StateBackend::Sqlite, files.0, files.1, files.2));
    }
}
