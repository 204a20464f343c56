//! Rolling per-symbol volume history
//!
//! Each symbol owns a bounded FIFO window of recent observations. Windows are
//! created lazily on the first observation and never exceed the configured
//! capacity: pushing into a full window evicts the oldest entry.

use std::collections::{BTreeMap, VecDeque};

use tracing::{debug, warn};

use crate::persistence::StateStore;
use crate::{Symbol, SymbolObservation};

/// Persisted form of the history: symbol -> observations, oldest first
pub type HistoryMap = BTreeMap<Symbol, Vec<SymbolObservation>>;

/// Bounded FIFO of observations for one symbol
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryWindow {
    capacity: usize,
    observations: VecDeque<SymbolObservation>,
}

impl HistoryWindow {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            observations: VecDeque::with_capacity(capacity),
        }
    }

    /// Build from stored observations, keeping the most recent `capacity`
    pub fn from_observations(capacity: usize, observations: Vec<SymbolObservation>) -> Self {
        let mut window = Self::new(capacity);
        for obs in observations {
            window.push(obs);
        }
        window
    }

    /// Append the newest observation, evicting the oldest beyond capacity
    pub fn push(&mut self, observation: SymbolObservation) {
        self.observations.push_back(observation);
        while self.observations.len() > self.capacity {
            self.observations.pop_front();
        }
    }

    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn latest(&self) -> Option<&SymbolObservation> {
        self.observations.back()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SymbolObservation> {
        self.observations.iter()
    }

    pub fn volumes(&self) -> Vec<f64> {
        self.observations.iter().map(|o| o.volume).collect()
    }

    pub fn to_vec(&self) -> Vec<SymbolObservation> {
        self.observations.iter().copied().collect()
    }
}

/// In-memory owner of every symbol's history window
#[derive(Debug, Clone)]
pub struct HistoryStore {
    capacity: usize,
    windows: BTreeMap<Symbol, HistoryWindow>,
}

impl HistoryStore {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            windows: BTreeMap::new(),
        }
    }

    /// Build from a persisted map, truncating windows longer than `capacity`
    pub fn from_map(capacity: usize, map: HistoryMap) -> Self {
        let mut store = Self::new(capacity);
        for (symbol, observations) in map {
            if observations.len() > store.capacity {
                debug!(
                    "Truncating stored history for {} from {} to {} entries",
                    symbol,
                    observations.len(),
                    store.capacity
                );
            }
            store
                .windows
                .insert(symbol, HistoryWindow::from_observations(store.capacity, observations));
        }
        store
    }

    /// Load from durable storage. Missing or unreadable state yields an empty store.
    pub fn load(store: &dyn StateStore, capacity: usize) -> Self {
        match store.load_history() {
            Ok(map) => {
                debug!("Loaded volume history for {} symbols", map.len());
                Self::from_map(capacity, map)
            }
            Err(e) => {
                warn!("Could not load volume history ({}), starting empty", e);
                Self::new(capacity)
            }
        }
    }

    /// Append an observation to the symbol's window and return the updated window
    pub fn record(&mut self, symbol: &Symbol, observation: SymbolObservation) -> &HistoryWindow {
        let capacity = self.capacity;
        let window = self
            .windows
            .entry(symbol.clone())
            .or_insert_with(|| HistoryWindow::new(capacity));
        window.push(observation);
        window
    }

    /// Persist the full mapping, overwriting prior content
    pub fn save(&self, store: &dyn StateStore) -> crate::error::PersistenceResult<()> {
        store.save_history(&self.snapshot())
    }

    pub fn window(&self, symbol: &Symbol) -> Option<&HistoryWindow> {
        self.windows.get(symbol)
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.windows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }

    /// Owned copy of every window in persisted form
    pub fn snapshot(&self) -> HistoryMap {
        self.windows
            .iter()
            .map(|(symbol, window)| (symbol.clone(), window.to_vec()))
            .collect()
    }
}
