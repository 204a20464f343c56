//! Configuration management
//!
//! Loads an optional JSON configuration file (every field has a default) and
//! overlays notification credentials from the environment.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use crate::binance::is_valid_interval;
use crate::dashboard::FrameParams;
use crate::persistence::StateBackend;
use crate::Symbol;

const SUPPORTED_EXCHANGES: &[&str] = &["binance"];

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub exchange: ExchangeConfig,
    pub alerts: AlertConfig,
    pub state: StateConfig,
    pub notifications: NotificationConfig,
    pub dashboard: DashboardConfig,
}

impl Config {
    /// Load configuration from JSON file, then apply environment overrides
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let mut config: Config =
            serde_json::from_str(&contents).context("Failed to parse config JSON")?;
        config.apply_env();
        Ok(config)
    }

    /// Load from `path` when given, otherwise defaults plus environment
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config = match path {
            Some(path) => Self::from_file(path)?,
            None => {
                let mut config = Config::default();
                config.apply_env();
                config
            }
        };
        config.validate()?;
        Ok(config)
    }

    /// Load notification credentials from environment if set
    pub fn apply_env(&mut self) {
        if let Ok(token) = std::env::var("TELEGRAM_BOT_TOKEN") {
            if !token.trim().is_empty() {
                self.notifications.telegram_bot_token = Some(token);
            }
        }
        if let Ok(chat_id) = std::env::var("TELEGRAM_CHAT_ID") {
            if !chat_id.trim().is_empty() {
                self.notifications.telegram_chat_id = Some(chat_id);
            }
        }
    }

    /// Reject settings the engine cannot run with
    pub fn validate(&self) -> Result<()> {
        if !SUPPORTED_EXCHANGES.contains(&self.exchange.id.to_lowercase().as_str()) {
            bail!(
                "Unsupported exchange '{}'. Supported: {}",
                self.exchange.id,
                SUPPORTED_EXCHANGES.join(", ")
            );
        }
        if self.exchange.quote_currency.trim().is_empty() {
            bail!("exchange.quote_currency must not be empty");
        }
        if self.exchange.max_symbols == 0 {
            bail!("exchange.max_symbols must be at least 1");
        }
        if self.exchange.fetch_timeout_ms == 0 {
            bail!("exchange.fetch_timeout_ms must be positive");
        }
        if self.alerts.historical_window == 0 {
            bail!("alerts.historical_window must be at least 1");
        }
        if !(self.alerts.alert_threshold_std_dev >= 0.0) {
            bail!("alerts.alert_threshold_std_dev must be non-negative");
        }
        if !(self.alerts.price_change_threshold_pct >= 0.0) {
            bail!("alerts.price_change_threshold_pct must be non-negative");
        }
        if self.alerts.cooldown_ms < 0 {
            bail!("alerts.cooldown_ms must be non-negative");
        }
        if self.alerts.sweep_interval_ms == 0 {
            bail!("alerts.sweep_interval_ms must be positive");
        }
        if !is_valid_interval(&self.alerts.price_change_timeframe) {
            bail!(
                "Invalid alerts.price_change_timeframe '{}'",
                self.alerts.price_change_timeframe
            );
        }
        if !is_valid_interval(&self.dashboard.timeframe) {
            bail!("Invalid dashboard.timeframe '{}'", self.dashboard.timeframe);
        }
        if self.dashboard.supertrend_period == 0 {
            bail!("dashboard.supertrend_period must be at least 1");
        }
        if !(self.dashboard.supertrend_multiplier > 0.0) {
            bail!("dashboard.supertrend_multiplier must be positive");
        }
        if self.dashboard.refresh_interval_ms == 0 {
            bail!("dashboard.refresh_interval_ms must be positive");
        }
        Ok(())
    }
}

/// Exchange configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExchangeConfig {
    pub id: String,
    pub quote_currency: String,
    /// Fixed symbol list; when absent the exchange listing is used
    #[serde(skip_serializing_if = "Option::is_none")]
    pub symbols: Option<Vec<String>>,
    /// Cap on symbols scanned per sweep
    pub max_symbols: usize,
    pub fetch_timeout_ms: u64,
}

impl Default for ExchangeConfig {
    fn default() -> Self {
        ExchangeConfig {
            id: "binance".to_string(),
            quote_currency: "USDT".to_string(),
            symbols: None,
            max_symbols: 10,
            fetch_timeout_ms: 10_000,
        }
    }
}

impl ExchangeConfig {
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_millis(self.fetch_timeout_ms)
    }

    pub fn fixed_symbols(&self) -> Option<Vec<Symbol>> {
        self.symbols
            .as_ref()
            .map(|list| list.iter().map(|s| Symbol::new(s.trim().to_uppercase())).collect())
    }
}

/// Alerting thresholds and timing
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertConfig {
    /// Observations kept per symbol for the volume baseline
    pub historical_window: usize,
    pub alert_threshold_std_dev: f64,
    pub price_change_timeframe: String,
    pub price_change_threshold_pct: f64,
    pub cooldown_ms: i64,
    pub sweep_interval_ms: u64,
}

impl Default for AlertConfig {
    fn default() -> Self {
        AlertConfig {
            historical_window: 7,
            alert_threshold_std_dev: 2.0,
            price_change_timeframe: "1d".to_string(),
            price_change_threshold_pct: 5.0,
            cooldown_ms: 24 * 60 * 60 * 1000,
            sweep_interval_ms: 15_000,
        }
    }
}

impl AlertConfig {
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_millis(self.sweep_interval_ms)
    }
}

/// Durable state location
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StateConfig {
    pub backend: StateBackend,
    pub dir: PathBuf,
    pub volume_data_file: String,
    pub alert_timestamps_file: String,
    pub sqlite_file: String,
}

impl Default for StateConfig {
    fn default() -> Self {
        StateConfig {
            backend: StateBackend::Json,
            dir: PathBuf::from("."),
            volume_data_file: "volume-data.json".to_string(),
            alert_timestamps_file: "alert-timestamps.json".to_string(),
            sqlite_file: "market-alerts.db".to_string(),
        }
    }
}

/// Notification sinks
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationConfig {
    /// Ring the terminal bell on console alerts
    pub console_bell: bool,
    #[serde(skip_serializing)]
    pub telegram_bot_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub telegram_chat_id: Option<String>,
    pub startup_message: bool,
    pub timeout_ms: u64,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        NotificationConfig {
            console_bell: true,
            telegram_bot_token: None,
            telegram_chat_id: None,
            startup_message: true,
            timeout_ms: 10_000,
        }
    }
}

impl NotificationConfig {
    /// Telegram credentials when both token and chat id are present
    pub fn telegram(&self) -> Option<(&str, &str)> {
        match (&self.telegram_bot_token, &self.telegram_chat_id) {
            (Some(token), Some(chat)) => Some((token.as_str(), chat.as_str())),
            _ => None,
        }
    }
}

/// SuperTrend dashboard
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    pub symbol: String,
    pub timeframe: String,
    pub supertrend_period: usize,
    pub supertrend_multiplier: f64,
    pub refresh_interval_ms: u64,
    pub volume_bars: usize,
    pub candle_limit: u32,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        DashboardConfig {
            symbol: "BTC/USDT".to_string(),
            timeframe: "1h".to_string(),
            supertrend_period: 10,
            supertrend_multiplier: 3.0,
            refresh_interval_ms: 30_000,
            volume_bars: 50,
            candle_limit: 500,
        }
    }
}

impl DashboardConfig {
    pub fn frame_params(&self) -> FrameParams {
        FrameParams {
            supertrend_period: self.supertrend_period,
            supertrend_multiplier: self.supertrend_multiplier,
            volume_bars: self.volume_bars,
        }
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_millis(self.refresh_interval_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_reference_constants() {
        let config = Config::default();
        assert_eq!(config.exchange.id, "binance");
        assert_eq!(config.exchange.quote_currency, "USDT");
        assert_eq!(config.exchange.max_symbols, 10);
        assert_eq!(config.alerts.historical_window, 7);
        assert_eq!(config.alerts.alert_threshold_std_dev, 2.0);
        assert_eq!(config.alerts.price_change_timeframe, "1d");
        assert_eq!(config.alerts.price_change_threshold_pct, 5.0);
        assert_eq!(config.alerts.cooldown_ms, 86_400_000);
        assert_eq!(config.alerts.sweep_interval(), Duration::from_secs(15));
        assert_eq!(config.state.volume_data_file, "volume-data.json");
        assert_eq!(config.state.alert_timestamps_file, "alert-timestamps.json");
        assert_eq!(config.dashboard.refresh_interval(), Duration::from_secs(30));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: Config = serde_json::from_str(
            r#"{"alerts": {"historical_window": 14}, "state": {"backend": "sqlite"}}"#,
        )
        .unwrap();

        assert_eq!(config.alerts.historical_window, 14);
        assert_eq!(config.alerts.alert_threshold_std_dev, 2.0);
        assert_eq!(config.state.backend, StateBackend::Sqlite);
        assert_eq!(config.exchange.max_symbols, 10);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = Config::default();
        config.alerts.historical_window = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.exchange.id = "kraken".to_string();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.alerts.price_change_timeframe = "2d".to_string();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.alerts.alert_threshold_std_dev = f64::NAN;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.alerts.sweep_interval_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_fixed_symbols_normalized() {
        let mut config = ExchangeConfig::default();
        assert!(config.fixed_symbols().is_none());

        config.symbols = Some(vec!["btc/usdt".to_string(), " ETH/USDT ".to_string()]);
        assert_eq!(
            config.fixed_symbols().unwrap(),
            vec![Symbol::new("BTC/USDT"), Symbol::new("ETH/USDT")]
        );
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("alerts.json");
        fs::write(&path, r#"{"exchange": {"quote_currency": "BTC", "max_symbols": 3}}"#).unwrap();

        let config = Config::from_file(&path).unwrap();
        assert_eq!(config.exchange.quote_currency, "BTC");
        assert_eq!(config.exchange.max_symbols, 3);

        assert!(Config::from_file(dir.path().join("missing.json")).is_err());
    }

    #[test]
    fn test_telegram_requires_both_credentials() {
        let mut notifications = NotificationConfig::default();
        notifications.telegram_bot_token = Some("token".to_string());
        assert!(notifications.telegram().is_none());

        notifications.telegram_chat_id = Some("42".to_string());
        assert_eq!(notifications.telegram(), Some(("token", "42")));
    }
}
