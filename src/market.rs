//! Market-data collaborator interface
//!
//! Anything that can serve tickers, candles and a symbol listing can drive the
//! alerting engine and the dashboard. [`crate::binance::BinanceClient`] is the
//! production implementation; tests plug in in-memory fakes.

use async_trait::async_trait;

use crate::error::FetchResult;
use crate::{Candle, Symbol, Ticker};

#[async_trait]
pub trait MarketDataSource: Send + Sync {
    /// Latest price and rolling 24h quote volume
    async fn fetch_ticker(&self, symbol: &Symbol) -> FetchResult<Ticker>;

    /// Most recent `limit` candles of `timeframe`, oldest first
    async fn fetch_ohlcv(&self, symbol: &Symbol, timeframe: &str, limit: u32)
        -> FetchResult<Vec<Candle>>;

    /// Tradable symbols quoted in `quote_currency`
    async fn list_symbols(&self, quote_currency: &str) -> FetchResult<Vec<Symbol>>;

    /// Exchange name for logs
    fn name(&self) -> &'static str;
}
