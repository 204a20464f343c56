//! Alerting loop
//!
//! One sweep walks the symbol set: fetch ticker → record volume → volume
//! predicate → cooldown → notify, then the same for the price-change
//! predicate. Each sweep ends by flushing history and alert stamps to the
//! [`StateStore`].
//!
//! At most one sweep runs at a time. A timer tick that arrives while a sweep
//! is still running is dropped with a warning.

use std::future::Future;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::cooldown::{AlertTimestamps, CooldownGate};
use crate::error::{FetchError, FetchResult};
use crate::history::{HistoryMap, HistoryStore};
use crate::market::MarketDataSource;
use crate::notify::NotificationSink;
use crate::persistence::StateStore;
use crate::statistics::{
    is_price_change_significant, is_volume_anomalous, price_change_pct, volume_baseline,
};
use crate::{MarketSnapshot, Symbol, SymbolObservation};

/// Candles fetched for the price-change check: previous and current
const PRICE_CANDLE_LIMIT: u32 = 2;

/// Source of "now" in epoch milliseconds
pub trait Clock: Send + Sync {
    fn now_ms(&self) -> i64;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> i64 {
        Utc::now().timestamp_millis()
    }
}

/// Clock that only moves when told to
#[derive(Debug, Default)]
pub struct ManualClock {
    now_ms: AtomicI64,
}

impl ManualClock {
    pub fn new(now_ms: i64) -> Self {
        Self {
            now_ms: AtomicI64::new(now_ms),
        }
    }

    pub fn set(&self, now_ms: i64) {
        self.now_ms.store(now_ms, Ordering::SeqCst);
    }

    pub fn advance(&self, delta_ms: i64) {
        self.now_ms.fetch_add(delta_ms, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> i64 {
        self.now_ms.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum AlertKind {
    VolumeSpike {
        volume: f64,
        mean: f64,
        std_dev: f64,
    },
    PriceMove {
        timeframe: String,
        change_pct: f64,
        price: f64,
    },
}

/// An alert that passed the cooldown gate
#[derive(Debug, Clone, PartialEq)]
pub struct Alert {
    pub symbol: Symbol,
    pub kind: AlertKind,
    pub timestamp: i64,
}

impl Alert {
    pub fn is_volume(&self) -> bool {
        matches!(self.kind, AlertKind::VolumeSpike { .. })
    }

    pub fn is_price(&self) -> bool {
        matches!(self.kind, AlertKind::PriceMove { .. })
    }

    /// Notification text; `quote` labels volumes when the symbol has no quote part
    pub fn message(&self, quote: &str) -> String {
        let quote = self.symbol.quote().unwrap_or(quote);
        match &self.kind {
            AlertKind::VolumeSpike {
                volume,
                mean,
                std_dev,
            } => format!(
                "\n*** ALERT: {} has high volume! ***\n\
                 Current Volume: {:.2} {}\n\
                 Average Volume: {:.2} {}\n\
                 Standard Deviation: {:.2}\n",
                self.symbol, volume, quote, mean, quote, std_dev
            ),
            AlertKind::PriceMove {
                timeframe,
                change_pct,
                price,
            } => format!(
                "\n*** ALERT: {} has a significant price change! ***\n\
                 Price Change ({}): {:.2}%\n\
                 Current Price: {}\n",
                self.symbol, timeframe, change_pct, price
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SymbolFailure {
    pub symbol: Symbol,
    pub error: String,
}

/// Outcome of one sweep
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SweepReport {
    pub sweep: u64,
    pub symbols_scanned: usize,
    pub failures: Vec<SymbolFailure>,
    pub alerts: Vec<Alert>,
    /// Both documents were written
    pub persisted: bool,
}

impl SweepReport {
    fn new(sweep: u64) -> Self {
        Self {
            sweep,
            ..Default::default()
        }
    }
}

/// In-memory state owned by whichever sweep holds the lock
struct LoopState {
    history: HistoryStore,
    cooldown: CooldownGate,
    /// Last symbol list the exchange returned
    symbols_cache: Vec<Symbol>,
    sweep_count: u64,
}

pub struct AlertingLoop {
    config: Config,
    market: Arc<dyn MarketDataSource>,
    notifier: Arc<dyn NotificationSink>,
    store: Arc<dyn StateStore>,
    clock: Arc<dyn Clock>,
    state: Mutex<LoopState>,
}

impl AlertingLoop {
    /// Build the loop and load persisted history and alert stamps
    pub fn new(
        config: Config,
        market: Arc<dyn MarketDataSource>,
        notifier: Arc<dyn NotificationSink>,
        store: Arc<dyn StateStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let history = HistoryStore::load(store.as_ref(), config.alerts.historical_window);
        let cooldown = CooldownGate::load(store.as_ref(), config.alerts.cooldown_ms);
        info!(
            "Loaded state from {}: {} symbols with history, {} alert stamps",
            store.describe(),
            history.len(),
            cooldown.entries().len()
        );

        Self {
            config,
            market,
            notifier,
            store,
            clock,
            state: Mutex::new(LoopState {
                history,
                cooldown,
                symbols_cache: Vec::new(),
                sweep_count: 0,
            }),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Copy of the in-memory history and alert stamps
    pub async fn snapshot(&self) -> (HistoryMap, AlertTimestamps) {
        let state = self.state.lock().await;
        (state.history.snapshot(), state.cooldown.entries().clone())
    }

    pub async fn send_startup_message(&self) {
        let message = format!(
            "Volume alert monitor started successfully! Watching {} {} markets",
            self.market.name(),
            self.config.exchange.quote_currency
        );
        if let Err(e) = self.notifier.send(&message).await {
            warn!("Startup notification via {} failed: {}", self.notifier.name(), e);
        }
    }

    /// Run one sweep, waiting for any sweep in progress to finish first
    pub async fn run_once(&self) -> SweepReport {
        let mut state = self.state.lock().await;
        self.sweep(&mut state).await
    }

    /// Run one sweep unless another is in progress
    pub async fn try_sweep(&self) -> Option<SweepReport> {
        match self.state.try_lock() {
            Ok(mut state) => Some(self.sweep(&mut state).await),
            Err(_) => {
                warn!("Previous sweep still running, dropping this tick");
                None
            }
        }
    }

    /// Sweep on every timer tick until a shutdown message arrives.
    ///
    /// A sweep in flight at shutdown is allowed to finish so its state is
    /// persisted.
    pub async fn run(self: Arc<Self>, mut shutdown_rx: mpsc::Receiver<()>) {
        let period = self.config.alerts.sweep_interval();
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut in_flight: Option<JoinHandle<Option<SweepReport>>> = None;

        info!("Alerting loop started, sweeping every {:?}", period);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if in_flight.as_ref().is_some_and(|handle| !handle.is_finished()) {
                        warn!("Sweep still running at tick, dropping this tick");
                        continue;
                    }
                    let this = Arc::clone(&self);
                    in_flight = Some(tokio::spawn(async move { this.try_sweep().await }));
                }
                Some(()) = shutdown_rx.recv() => {
                    info!("Shutdown signal received");
                    break;
                }
            }
        }

        if let Some(handle) = in_flight {
            if !handle.is_finished() {
                info!("Waiting for in-flight sweep to finish...");
            }
            if let Err(e) = handle.await {
                error!("Sweep task failed: {}", e);
            }
        }

        info!("Alerting loop stopped");
    }

    async fn sweep(&self, state: &mut LoopState) -> SweepReport {
        state.sweep_count += 1;
        let mut report = SweepReport::new(state.sweep_count);
        let symbols = self.resolve_symbols(state).await;
        debug!("Sweep #{} over {} symbols", report.sweep, symbols.len());

        let mut dirty = false;
        for symbol in &symbols {
            report.symbols_scanned += 1;
            if let Err(e) = self
                .process_symbol(state, symbol, &mut dirty, &mut report.alerts)
                .await
            {
                warn!("Error processing {}: {}", symbol, e);
                report.failures.push(SymbolFailure {
                    symbol: symbol.clone(),
                    error: e.to_string(),
                });
            }
        }

        if dirty {
            report.persisted = self.persist(state);
        }

        info!(
            "Sweep #{} done: {} scanned, {} failed, {} alerts{}",
            report.sweep,
            report.symbols_scanned,
            report.failures.len(),
            report.alerts.len(),
            if report.persisted { ", state saved" } else { "" }
        );
        report
    }

    async fn resolve_symbols(&self, state: &mut LoopState) -> Vec<Symbol> {
        let max = self.config.exchange.max_symbols;
        if let Some(fixed) = self.config.exchange.fixed_symbols() {
            return fixed.into_iter().take(max).collect();
        }

        let quote = &self.config.exchange.quote_currency;
        match self.fetch(self.market.list_symbols(quote)).await {
            Ok(mut symbols) => {
                symbols.truncate(max);
                state.symbols_cache = symbols.clone();
                symbols
            }
            Err(e) => {
                warn!(
                    "Could not list {} markets ({}), reusing {} cached symbols",
                    quote,
                    e,
                    state.symbols_cache.len()
                );
                state.symbols_cache.clone()
            }
        }
    }

    async fn process_symbol(
        &self,
        state: &mut LoopState,
        symbol: &Symbol,
        dirty: &mut bool,
        alerts: &mut Vec<Alert>,
    ) -> FetchResult<()> {
        let ticker = self.fetch(self.market.fetch_ticker(symbol)).await?;
        let snapshot = MarketSnapshot::from_ticker(symbol.clone(), ticker);
        let now = self.clock.now_ms();

        // The current reading is part of the baseline it is compared against
        let window = state
            .history
            .record(symbol, SymbolObservation::new(now, snapshot.quote_volume));
        *dirty = true;

        let threshold = self.config.alerts.alert_threshold_std_dev;
        // The baseline is only kept for the message text
        let volume_spike = if is_volume_anomalous(window, snapshot.quote_volume, threshold) {
            volume_baseline(window)
        } else {
            None
        };

        if let Some(baseline) = volume_spike {
            if state.cooldown.is_suppressed(symbol, now) {
                debug!("{} volume alert suppressed by cooldown", symbol);
            } else {
                let alert = Alert {
                    symbol: symbol.clone(),
                    kind: AlertKind::VolumeSpike {
                        volume: snapshot.quote_volume,
                        mean: baseline.mean,
                        std_dev: baseline.std_dev,
                    },
                    timestamp: now,
                };
                self.emit(state, alert, alerts).await;
            }
        }

        if state.cooldown.is_suppressed(symbol, now) {
            return Ok(());
        }

        let timeframe = &self.config.alerts.price_change_timeframe;
        let candles = self
            .fetch(self.market.fetch_ohlcv(symbol, timeframe, PRICE_CANDLE_LIMIT))
            .await?;
        let snapshot = snapshot.with_candles(&candles);

        let Some(previous_close) = snapshot.previous_close else {
            debug!("{}: not enough {} candles for price check", symbol, timeframe);
            return Ok(());
        };

        let threshold_pct = self.config.alerts.price_change_threshold_pct;
        if is_price_change_significant(previous_close, snapshot.last_price, threshold_pct) {
            if let Ok(change_pct) = price_change_pct(previous_close, snapshot.last_price) {
                let alert = Alert {
                    symbol: symbol.clone(),
                    kind: AlertKind::PriceMove {
                        timeframe: timeframe.clone(),
                        change_pct,
                        price: snapshot.last_price,
                    },
                    timestamp: now,
                };
                self.emit(state, alert, alerts).await;
            }
        }

        Ok(())
    }

    /// Notify and stamp; the stamp is recorded even when delivery fails
    async fn emit(&self, state: &mut LoopState, alert: Alert, alerts: &mut Vec<Alert>) {
        let message = alert.message(&self.config.exchange.quote_currency);
        if let Err(e) = self.notifier.send(&message).await {
            warn!(
                "Failed to deliver alert for {} via {}: {}",
                alert.symbol,
                self.notifier.name(),
                e
            );
        }
        state.cooldown.record_alert(&alert.symbol, alert.timestamp);
        alerts.push(alert);
    }

    fn persist(&self, state: &LoopState) -> bool {
        let mut ok = true;
        if let Err(e) = state.history.save(self.store.as_ref()) {
            error!("Failed to save volume history to {}: {}", self.store.describe(), e);
            ok = false;
        }
        if let Err(e) = state.cooldown.save(self.store.as_ref()) {
            error!("Failed to save alert timestamps to {}: {}", self.store.describe(), e);
            ok = false;
        }
        ok
    }

    /// Apply the per-fetch timeout
    async fn fetch<T>(&self, call: impl Future<Output = FetchResult<T>>) -> FetchResult<T> {
        let limit = self.config.exchange.fetch_timeout();
        tokio::time::timeout(limit, call)
            .await
            .unwrap_or(Err(FetchError::Timeout(limit)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_volume_message() {
        let alert = Alert {
            symbol: Symbol::new("BTC/USDT"),
            kind: AlertKind::VolumeSpike {
                volume: 100.0,
                mean: 22.857142,
                std_dev: 31.4934,
            },
            timestamp: 0,
        };
        let message = alert.message("USDT");

        assert!(alert.is_volume());
        assert!(message.contains("*** ALERT: BTC/USDT has high volume! ***"));
        assert!(message.contains("Current Volume: 100.00 USDT"));
        assert!(message.contains("Average Volume: 22.86 USDT"));
        assert!(message.contains("Standard Deviation: 31.49"));
    }

    #[test]
    fn test_price_message() {
        let alert = Alert {
            symbol: Symbol::new("ETH/USDT"),
            kind: AlertKind::PriceMove {
                timeframe: "1d".to_string(),
                change_pct: -6.25,
                price: 93.75,
            },
            timestamp: 0,
        };
        let message = alert.message("USDT");

        assert!(alert.is_price());
        assert!(message.contains("*** ALERT: ETH/USDT has a significant price change! ***"));
        assert!(message.contains("Price Change (1d): -6.25%"));
        assert!(message.contains("Current Price: 93.75"));
    }

    #[test]
    fn test_message_falls_back_to_configured_quote() {
        let alert = Alert {
            symbol: Symbol::new("BTCUSDT"),
            kind: AlertKind::VolumeSpike {
                volume: 1.0,
                mean: 0.5,
                std_dev: 0.1,
            },
            timestamp: 0,
        };
        assert!(alert.message("USDT").contains("Current Volume: 1.00 USDT"));
    }

    #[test]
    fn test_manual_clock() {
        let clock = ManualClock::new(1_000);
        clock.advance(500);
        assert_eq!(clock.now_ms(), 1_500);
        clock.set(42);
        assert_eq!(clock.now_ms(), 42);
    }

    #[test]
    fn test_system_clock_is_epoch_ms() {
        // 2020-01-01 in epoch milliseconds
        assert!(SystemClock.now_ms() > 1_577_836_800_000);
    }
}
