//! Binance public REST client
//!
//! No API key required: only the public market data endpoints are used.
//!
//! # Example
//! ```no_run
//! use std::time::Duration;
//! use market_alerts::binance::BinanceClient;
//! use market_alerts::market::MarketDataSource;
//! use market_alerts::Symbol;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let client = BinanceClient::new(Duration::from_secs(10))?;
//!     let ticker = client.fetch_ticker(&Symbol::new("BTC/USDT")).await?;
//!     println!("BTC/USDT last={} quote_volume={}", ticker.last_price, ticker.quote_volume);
//!     Ok(())
//! }
//! ```

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use tracing::debug;

use super::types::{BinanceKline, ExchangeInfo, Ticker24hr};
use crate::error::{FetchError, FetchResult};
use crate::market::MarketDataSource;
use crate::{Candle, Symbol, Ticker};

/// Base URL for Binance API
const BINANCE_API_BASE: &str = "https://api.binance.com/api/v3";

/// Maximum klines per request (Binance limit)
const MAX_KLINES_PER_REQUEST: u32 = 1000;

/// Binance API client
#[derive(Debug, Clone)]
pub struct BinanceClient {
    client: Client,
    base_url: String,
}

impl BinanceClient {
    /// Create a client whose HTTP requests give up after `timeout`
    pub fn new(timeout: Duration) -> FetchResult<Self> {
        Self::with_base_url(BINANCE_API_BASE, timeout)
    }

    /// Create a client against another API root (testnet, proxy)
    pub fn with_base_url(base_url: impl Into<String>, timeout: Duration) -> FetchResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .pool_idle_timeout(Duration::from_secs(90))
            .build()?;

        Ok(BinanceClient {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, String)],
    ) -> FetchResult<T> {
        let url = format!("{}/{}", self.base_url, path);

        let response = self.client.get(&url).query(params).send().await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(FetchError::Api { status, body });
        }

        let body = response.text().await?;
        serde_json::from_str(&body)
            .map_err(|e| FetchError::Malformed(format!("{}: {}", path, e)))
    }

    /// Fetch the rolling 24h ticker for one pair
    pub async fn get_ticker_24hr(&self, pair: &str) -> FetchResult<Ticker24hr> {
        debug!("Fetching 24h ticker: symbol={}", pair);
        self.get_json("ticker/24hr", &[("symbol", pair.to_string())])
            .await
    }

    /// Fetch klines (candlestick data) from Binance
    ///
    /// # Arguments
    /// * `pair` - Binance trading pair (e.g., "BTCUSDT")
    /// * `interval` - Timeframe (e.g., "1h", "4h", "1d")
    /// * `limit` - Number of klines to fetch (max 1000)
    pub async fn get_klines(
        &self,
        pair: &str,
        interval: &str,
        limit: u32,
    ) -> FetchResult<Vec<BinanceKline>> {
        let limit = limit.clamp(1, MAX_KLINES_PER_REQUEST);

        debug!(
            "Fetching klines: symbol={}, interval={}, limit={}",
            pair, interval, limit
        );

        let raw_data: Vec<Vec<serde_json::Value>> = self
            .get_json(
                "klines",
                &[
                    ("symbol", pair.to_string()),
                    ("interval", interval.to_string()),
                    ("limit", limit.to_string()),
                ],
            )
            .await?;

        raw_data
            .iter()
            .map(|row| {
                BinanceKline::from_raw(row)
                    .ok_or_else(|| FetchError::Malformed(format!("bad kline row for {}", pair)))
            })
            .collect()
    }

    /// Fetch the exchange's symbol listing
    pub async fn get_exchange_info(&self) -> FetchResult<ExchangeInfo> {
        self.get_json("exchangeInfo", &[]).await
    }

    /// Check server connectivity
    pub async fn ping(&self) -> FetchResult<bool> {
        let url = format!("{}/ping", self.base_url);
        let response = self.client.get(&url).send().await?;
        Ok(response.status().is_success())
    }
}

#[async_trait]
impl MarketDataSource for BinanceClient {
    async fn fetch_ticker(&self, symbol: &Symbol) -> FetchResult<Ticker> {
        let ticker = self.get_ticker_24hr(&symbol.to_pair()).await?;
        Ok(Ticker::from(&ticker))
    }

    async fn fetch_ohlcv(
        &self,
        symbol: &Symbol,
        timeframe: &str,
        limit: u32,
    ) -> FetchResult<Vec<Candle>> {
        let klines = self.get_klines(&symbol.to_pair(), timeframe, limit).await?;
        klines
            .iter()
            .map(|k| {
                k.to_candle()
                    .ok_or_else(|| FetchError::Malformed(format!("bad open time {}", k.open_time)))
            })
            .collect()
    }

    async fn list_symbols(&self, quote_currency: &str) -> FetchResult<Vec<Symbol>> {
        let info = self.get_exchange_info().await?;
        let symbols = info.trading_symbols(quote_currency);
        debug!("Found {} {} markets", symbols.len(), quote_currency);
        Ok(symbols)
    }

    fn name(&self) -> &'static str {
        "binance"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_creation() {
        let client = BinanceClient::with_base_url("https://example.test/api/v3/", Duration::from_secs(5))
            .unwrap();
        assert_eq!(client.base_url, "https://example.test/api/v3");
        assert_eq!(client.name(), "binance");
    }
}
