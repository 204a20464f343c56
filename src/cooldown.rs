//! Per-symbol alert cooldown
//!
//! Volume and price alerts share one timestamp map, so an alert of either kind
//! silences both for that symbol until the cooldown elapses.

use std::collections::BTreeMap;

use tracing::{debug, warn};

use crate::error::PersistenceResult;
use crate::persistence::StateStore;
use crate::Symbol;

/// Persisted form: symbol -> last alert time in epoch milliseconds
pub type AlertTimestamps = BTreeMap<Symbol, i64>;

#[derive(Debug, Clone)]
pub struct CooldownGate {
    cooldown_ms: i64,
    last_alerts: AlertTimestamps,
}

impl CooldownGate {
    pub fn new(cooldown_ms: i64) -> Self {
        Self::from_entries(cooldown_ms, AlertTimestamps::new())
    }

    pub fn from_entries(cooldown_ms: i64, last_alerts: AlertTimestamps) -> Self {
        Self {
            cooldown_ms,
            last_alerts,
        }
    }

    /// Load stamps from durable storage; unreadable state yields an empty gate
    pub fn load(store: &dyn StateStore, cooldown_ms: i64) -> Self {
        match store.load_alert_timestamps() {
            Ok(entries) => {
                debug!("Loaded alert timestamps for {} symbols", entries.len());
                Self::from_entries(cooldown_ms, entries)
            }
            Err(e) => {
                warn!("Could not load alert timestamps ({}), starting empty", e);
                Self::new(cooldown_ms)
            }
        }
    }

    /// Milliseconds since the symbol's last alert. Stamps later than `now`
    /// (clock skew or a hand-edited state file) are ignored.
    fn elapsed_ms(&self, symbol: &Symbol, now: i64) -> Option<i64> {
        self.last_alerts
            .get(symbol)
            .map(|&last| now.saturating_sub(last))
            .filter(|elapsed| *elapsed >= 0)
    }

    /// True iff the symbol alerted less than `cooldown_ms` before `now`
    pub fn is_suppressed(&self, symbol: &Symbol, now: i64) -> bool {
        self.elapsed_ms(symbol, now)
            .is_some_and(|elapsed| elapsed < self.cooldown_ms)
    }

    pub fn record_alert(&mut self, symbol: &Symbol, now: i64) {
        self.last_alerts.insert(symbol.clone(), now);
    }

    pub fn last_alert(&self, symbol: &Symbol) -> Option<i64> {
        self.last_alerts.get(symbol).copied()
    }

    /// Milliseconds until the symbol may alert again, zero if it already can
    pub fn remaining_ms(&self, symbol: &Symbol, now: i64) -> i64 {
        self.elapsed_ms(symbol, now)
            .map(|elapsed| self.cooldown_ms.saturating_sub(elapsed).max(0))
            .unwrap_or(0)
    }

    pub fn cooldown_ms(&self) -> i64 {
        self.cooldown_ms
    }

    pub fn entries(&self) -> &AlertTimestamps {
        &self.last_alerts
    }

    pub fn save(&self, store: &dyn StateStore) -> PersistenceResult<()> {
        store.save_alert_timestamps(&self.last_alerts)
    }
}
