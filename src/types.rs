//! Core data types shared by the alerting engine and the dashboard feed

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// OHLCV candlestick data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub datetime: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl ta::Open for Candle {
    fn open(&self) -> f64 {
        self.open
    }
}

impl ta::High for Candle {
    fn high(&self) -> f64 {
        self.high
    }
}

impl ta::Low for Candle {
    fn low(&self) -> f64 {
        self.low
    }
}

impl ta::Close for Candle {
    fn close(&self) -> f64 {
        self.close
    }
}

impl ta::Volume for Candle {
    fn volume(&self) -> f64 {
        self.volume
    }
}

/// Market symbol in unified `BASE/QUOTE` form, e.g. `BTC/USDT`
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Symbol(pub String);

impl Symbol {
    pub fn new(s: impl Into<String>) -> Self {
        Symbol(s.into())
    }

    /// Build from separate base and quote assets
    pub fn from_assets(base: &str, quote: &str) -> Self {
        Symbol(format!("{}/{}", base.to_uppercase(), quote.to_uppercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Exchange pair format without separator (`BTC/USDT` -> `BTCUSDT`)
    pub fn to_pair(&self) -> String {
        self.0.replace('/', "").to_uppercase()
    }

    /// Quote asset, if the symbol is in unified form
    pub fn quote(&self) -> Option<&str> {
        self.0.split_once('/').map(|(_, quote)| quote)
    }
}

impl std::fmt::Display for Symbol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One volume reading for a symbol. Immutable once created.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SymbolObservation {
    /// Milliseconds since epoch
    pub timestamp: i64,
    pub volume: f64,
}

impl SymbolObservation {
    pub fn new(timestamp: i64, volume: f64) -> Self {
        Self { timestamp, volume }
    }
}

/// Latest ticker values used by the alerting engine
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ticker {
    pub last_price: f64,
    /// Rolling 24h volume in quote currency
    pub quote_volume: f64,
}

/// Transient per-sweep data for one symbol
#[derive(Debug, Clone, PartialEq)]
pub struct MarketSnapshot {
    pub symbol: Symbol,
    pub last_price: f64,
    pub quote_volume: f64,
    /// Close of the previous candle in the price-change timeframe
    pub previous_close: Option<f64>,
}

impl MarketSnapshot {
    pub fn from_ticker(symbol: Symbol, ticker: Ticker) -> Self {
        Self {
            symbol,
            last_price: ticker.last_price,
            quote_volume: ticker.quote_volume,
            previous_close: None,
        }
    }

    /// Take the previous close from the older of the two most recent candles
    pub fn with_candles(mut self, candles: &[Candle]) -> Self {
        self.previous_close = if candles.len() > 1 {
            candles.get(candles.len() - 2).map(|c| c.close)
        } else {
            None
        };
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candle(close: f64) -> Candle {
        Candle {
            datetime: Utc::now(),
            open: close,
            high: close,
            low: close,
            close,
            volume: 1.0,
        }
    }

    #[test]
    fn test_symbol_pair_conversion() {
        let symbol = Symbol::new("BTC/USDT");
        assert_eq!(symbol.to_pair(), "BTCUSDT");
        assert_eq!(symbol.quote(), Some("USDT"));
        assert_eq!(Symbol::from_assets("eth", "usdt").as_str(), "ETH/USDT");
        assert_eq!(Symbol::new("BTCUSDT").quote(), None);
    }

    #[test]
    fn test_snapshot_previous_close() {
        let ticker = Ticker {
            last_price: 106.0,
            quote_volume: 5_000.0,
        };
        let snapshot = MarketSnapshot::from_ticker(Symbol::new("BTC/USDT"), ticker)
            .with_candles(&[candle(100.0), candle(105.0)]);
        assert_eq!(snapshot.previous_close, Some(100.0));

        let single = MarketSnapshot::from_ticker(Symbol::new("BTC/USDT"), ticker)
            .with_candles(&[candle(100.0)]);
        assert_eq!(single.previous_close, None);
    }
}
