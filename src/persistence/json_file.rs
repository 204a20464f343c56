//! Flat JSON file backend
//!
//! `volume-data.json`: `{"BTC/USDT": [{"timestamp": 1700000000000, "volume": 1.5}, ...]}`
//! `alert-timestamps.json`: `{"BTC/USDT": 1700000000000}`

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use super::StateStore;
use crate::cooldown::AlertTimestamps;
use crate::error::{PersistenceError, PersistenceResult};
use crate::history::HistoryMap;

#[derive(Debug, Clone)]
pub struct JsonFileStore {
    volume_path: PathBuf,
    timestamps_path: PathBuf,
}

impl JsonFileStore {
    pub fn new(volume_path: impl Into<PathBuf>, timestamps_path: impl Into<PathBuf>) -> Self {
        Self {
            volume_path: volume_path.into(),
            timestamps_path: timestamps_path.into(),
        }
    }

    /// Store using the default file names inside `dir`
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self::new(
            dir.join("volume-data.json"),
            dir.join("alert-timestamps.json"),
        )
    }

    pub fn volume_path(&self) -> &Path {
        &self.volume_path
    }

    pub fn timestamps_path(&self) -> &Path {
        &self.timestamps_path
    }
}

/// Read a document; a missing file is an empty document
fn read_document<T: DeserializeOwned + Default>(path: &Path) -> PersistenceResult<T> {
    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            debug!("{} not found, using empty state", path.display());
            return Ok(T::default());
        }
        Err(source) => {
            return Err(PersistenceError::Read {
                path: path.to_path_buf(),
                source,
            })
        }
    };

    if contents.trim().is_empty() {
        return Ok(T::default());
    }

    serde_json::from_str(&contents).map_err(|source| PersistenceError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Overwrite a document by writing a sibling temp file and renaming it into place
fn write_document<T: Serialize>(path: &Path, value: &T) -> PersistenceResult<()> {
    let json = serde_json::to_string_pretty(value)?;

    let write_err = |source: std::io::Error| PersistenceError::Write {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(write_err)?;
    }

    let mut tmp_name = path.as_os_str().to_owned();
    tmp_name.push(".tmp");
    let tmp_path = PathBuf::from(tmp_name);

    fs::write(&tmp_path, json).map_err(write_err)?;
    fs::rename(&tmp_path, path).map_err(write_err)?;

    debug!("State written to: {}", path.display());
    Ok(())
}

impl StateStore for JsonFileStore {
    fn load_history(&self) -> PersistenceResult<HistoryMap> {
        read_document(&self.volume_path)
    }

    fn save_history(&self, history: &HistoryMap) -> PersistenceResult<()> {
        write_document(&self.volume_path, history)
    }

    fn load_alert_timestamps(&self) -> PersistenceResult<AlertTimestamps> {
        read_document(&self.timestamps_path)
    }

    fn save_alert_timestamps(&self, timestamps: &AlertTimestamps) -> PersistenceResult<()> {
        write_document(&self.timestamps_path, timestamps)
    }

    fn describe(&self) -> String {
        format!(
            "json ({}, {})",
            self.volume_path.display(),
            self.timestamps_path.display()
        )
    }
}
