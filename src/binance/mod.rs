//! Binance public market data: tickers, klines and the symbol listing.
//! No API key needed for these endpoints.

mod client;
mod types;

pub use client::BinanceClient;
pub use types::*;
