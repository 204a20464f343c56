//! SQLite backend
//!
//! Each save replaces the whole document inside one transaction, so a crash
//! mid-write leaves the previous state intact.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use rusqlite::{params, Connection};
use tracing::{debug, info};

use super::StateStore;
use crate::cooldown::AlertTimestamps;
use crate::error::PersistenceResult;
use crate::history::HistoryMap;
use crate::{Symbol, SymbolObservation};

pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
    db_path: PathBuf,
}

impl SqliteStore {
    pub fn open<P: AsRef<Path>>(db_path: P) -> PersistenceResult<Self> {
        let db_path = db_path.as_ref();
        let conn = Connection::open(db_path)?;

        // Enable WAL mode for better concurrency
        conn.pragma_update(None, "journal_mode", "WAL")?;

        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
            db_path: db_path.to_path_buf(),
        };
        store.create_tables()?;
        info!("SQLite state store initialized at {}", db_path.display());
        Ok(store)
    }

    #[cfg(test)]
    pub(crate) fn in_memory() -> PersistenceResult<Self> {
        let store = Self {
            conn: Arc::new(Mutex::new(Connection::open_in_memory()?)),
            db_path: PathBuf::from(":memory:"),
        };
        store.create_tables()?;
        Ok(store)
    }

    fn lock(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn create_tables(&self) -> PersistenceResult<()> {
        let conn = self.lock();

        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS volume_history (
                symbol TEXT NOT NULL,
                seq INTEGER NOT NULL,
                timestamp INTEGER NOT NULL,
                volume REAL NOT NULL,
                PRIMARY KEY (symbol, seq)
            );
            CREATE TABLE IF NOT EXISTS alert_timestamps (
                symbol TEXT PRIMARY KEY,
                last_alert_ms INTEGER NOT NULL
            );",
        )?;

        debug!("Database schema created/verified");
        Ok(())
    }
}

impl StateStore for SqliteStore {
    fn load_history(&self) -> PersistenceResult<HistoryMap> {
        let conn = self.lock();
        let mut stmt = conn.prepare(
            "SELECT symbol, timestamp, volume FROM volume_history ORDER BY symbol, seq",
        )?;

        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    SymbolObservation::new(row.get(1)?, row.get(2)?),
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let mut history = HistoryMap::new();
        for (symbol, observation) in rows {
            history.entry(Symbol::new(symbol)).or_default().push(observation);
        }

        debug!("Loaded history for {} symbols", history.len());
        Ok(history)
    }

    fn save_history(&self, history: &HistoryMap) -> PersistenceResult<()> {
        let mut conn = self.lock();
        let tx = conn.transaction()?;

        tx.execute("DELETE FROM volume_history", [])?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO volume_history (symbol, seq, timestamp, volume) VALUES (?1, ?2, ?3, ?4)",
            )?;
            for (symbol, observations) in history {
                for (seq, obs) in observations.iter().enumerate() {
                    stmt.execute(params![symbol.as_str(), seq as i64, obs.timestamp, obs.volume])?;
                }
            }
        }
        tx.commit()?;

        debug!("History saved: {} symbols", history.len());
        Ok(())
    }

    fn load_alert_timestamps(&self) -> PersistenceResult<AlertTimestamps> {
        let conn = self.lock();
        let mut stmt = conn.prepare("SELECT symbol, last_alert_ms FROM alert_timestamps")?;

        let stamps = stmt
            .query_map([], |row| {
                Ok((Symbol::new(row.get::<_, String>(0)?), row.get::<_, i64>(1)?))
            })?
            .collect::<Result<AlertTimestamps, _>>()?;

        Ok(stamps)
    }

    fn save_alert_timestamps(&self, timestamps: &AlertTimestamps) -> PersistenceResult<()> {
        let mut conn = self.lock();
        let tx = conn.transaction()?;

        tx.execute("DELETE FROM alert_timestamps", [])?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO alert_timestamps (symbol, last_alert_ms) VALUES (?1, ?2)",
            )?;
            for (symbol, last_alert) in timestamps {
                stmt.execute(params![symbol.as_str(), last_alert])?;
            }
        }
        tx.commit()?;

        debug!("Alert timestamps saved: {} symbols", timestamps.len());
        Ok(())
    }

    fn describe(&self) -> String {
        format!("sqlite ({})", self.db_path.display())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_database_loads_empty() {
        let store = SqliteStore::in_memory().unwrap();
        assert!(store.load_history().unwrap().is_empty());
        assert!(store.load_alert_timestamps().unwrap().is_empty());
    }

    #[test]
    fn test_history_round_trip_preserves_order() {
        let store = SqliteStore::in_memory().unwrap();

        let mut history = HistoryMap::new();
        // Timestamps deliberately not sorted: order must come from insertion
        history.insert(
            Symbol::new("BTC/USDT"),
            vec![
                SymbolObservation::new(30, 3.0),
                SymbolObservation::new(10, 1.0),
                SymbolObservation::new(20, 2.0),
            ],
        );
        history.insert(Symbol::new("ETH/USDT"), vec![SymbolObservation::new(5, 0.5)]);

        store.save_history(&history).unwrap();
        assert_eq!(store.load_history().unwrap(), history);
    }

    #[test]
    fn test_save_replaces_previous_content() {
        let store = SqliteStore::in_memory().unwrap();

        let mut stamps = AlertTimestamps::new();
        stamps.insert(Symbol::new("BTC/USDT"), 100);
        stamps.insert(Symbol::new("ETH/USDT"), 200);
        store.save_alert_timestamps(&stamps).unwrap();

        stamps.remove(&Symbol::new("ETH/USDT"));
        stamps.insert(Symbol::new("BTC/USDT"), 300);
        store.save_alert_timestamps(&stamps).unwrap();

        assert_eq!(store.load_alert_timestamps().unwrap(), stamps);
    }

    #[test]
    fn test_file_database_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("alerts.db");

        let mut stamps = AlertTimestamps::new();
        stamps.insert(Symbol::new("SOL/USDT"), 1_700_000_000_000);
        {
            let store = SqliteStore::open(&path).unwrap();
            store.save_alert_timestamps(&stamps).unwrap();
        }

        let reopened = SqliteStore::open(&path).unwrap();
        assert_eq!(reopened.load_alert_timestamps().unwrap(), stamps);
    }
}
