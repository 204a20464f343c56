//! Market Alerts
//!
//! Polls an exchange's public market data, keeps a rolling per-symbol volume
//! history and raises cooldown-gated alerts on volume spikes and large price
//! moves. Also feeds a SuperTrend dashboard from the same market data.

pub mod alerting;
pub mod binance;
pub mod config;
pub mod cooldown;
pub mod dashboard;
pub mod error;
pub mod history;
pub mod indicators;
pub mod market;
pub mod notify;
pub mod persistence;
pub mod statistics;
pub mod types;

pub use config::Config;
pub use types::*;
