//! Binance API response types

use chrono::DateTime;
use serde::{Deserialize, Deserializer};

use crate::{Candle, Symbol, Ticker};

/// Binance encodes decimals as JSON strings
fn de_str_f64<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    s.parse::<f64>().map_err(serde::de::Error::custom)
}

/// Binance kline/candlestick data
/// API returns an array: [open_time, open, high, low, close, volume, close_time,
///                        quote_volume, trades, taker_buy_base, taker_buy_quote, ignore];
/// only the OHLCV prefix is kept
#[derive(Debug, Clone, PartialEq)]
pub struct BinanceKline {
    pub open_time: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl BinanceKline {
    /// Parse from raw JSON array returned by Binance API
    pub fn from_raw(raw: &[serde_json::Value]) -> Option<Self> {
        if raw.len() < 6 {
            return None;
        }

        Some(BinanceKline {
            open_time: raw[0].as_i64()?,
            open: raw[1].as_str()?.parse().ok()?,
            high: raw[2].as_str()?.parse().ok()?,
            low: raw[3].as_str()?.parse().ok()?,
            close: raw[4].as_str()?.parse().ok()?,
            volume: raw[5].as_str()?.parse().ok()?,
        })
    }

    pub fn to_candle(&self) -> Option<Candle> {
        Some(Candle {
            datetime: DateTime::from_timestamp_millis(self.open_time)?,
            open: self.open,
            high: self.high,
            low: self.low,
            close: self.close,
            volume: self.volume,
        })
    }
}

/// `/ticker/24hr` response for a single symbol
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ticker24hr {
    pub symbol: String,
    #[serde(deserialize_with = "de_str_f64")]
    pub last_price: f64,
    #[serde(deserialize_with = "de_str_f64")]
    pub quote_volume: f64,
}

impl From<&Ticker24hr> for Ticker {
    fn from(t: &Ticker24hr) -> Self {
        Ticker {
            last_price: t.last_price,
            quote_volume: t.quote_volume,
        }
    }
}

/// `/exchangeInfo` response, reduced to the symbol list
#[derive(Debug, Clone, Deserialize)]
pub struct ExchangeInfo {
    pub symbols: Vec<SymbolInfo>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SymbolInfo {
    pub symbol: String,
    pub status: String,
    pub base_asset: String,
    pub quote_asset: String,
}

impl ExchangeInfo {
    /// Symbols currently trading against `quote`, in listing order
    pub fn trading_symbols(&self, quote: &str) -> Vec<Symbol> {
        self.symbols
            .iter()
            .filter(|s| s.status == "TRADING" && s.quote_asset.eq_ignore_ascii_case(quote))
            .map(|s| Symbol::from_assets(&s.base_asset, &s.quote_asset))
            .collect()
    }
}

/// Valid Binance intervals
pub const BINANCE_INTERVALS: &[&str] = &[
    "1m", "3m", "5m", "15m", "30m", "1h", "2h", "4h", "6h", "8h", "12h", "1d", "3d", "1w", "1M",
];

/// Check if interval is valid for Binance
pub fn is_valid_interval(interval: &str) -> bool {
    BINANCE_INTERVALS.contains(&interval)
}
