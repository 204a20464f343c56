//! Dashboard command
//!
//! Fetches candles on a fixed refresh interval and renders a SuperTrend frame.
//! A failed refresh is shown on the dashboard and retried on the next tick.

use anyhow::{Context, Result};
use tokio::sync::mpsc;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{error, info};

use market_alerts::binance::{is_valid_interval, BinanceClient};
use market_alerts::dashboard::{build_frame, DashboardSink, LogDashboard};
use market_alerts::market::MarketDataSource;
use market_alerts::{Config, Symbol};

pub fn run(
    config_path: Option<String>,
    symbol: Option<String>,
    timeframe: Option<String>,
    once: bool,
) -> Result<()> {
    let mut config = super::load_config(config_path.as_deref())?;
    if let Some(symbol) = symbol {
        config.dashboard.symbol = symbol.to_uppercase();
    }
    if let Some(timeframe) = timeframe {
        if !is_valid_interval(&timeframe) {
            anyhow::bail!("Invalid timeframe '{}'", timeframe);
        }
        config.dashboard.timeframe = timeframe;
    }

    let runtime = super::build_runtime()?;
    runtime.block_on(run_async(config, once))
}

/// Fetch candles and render one frame, logging failures to the dashboard
async fn refresh(
    market: &dyn MarketDataSource,
    config: &Config,
    symbol: &Symbol,
    sink: &mut dyn DashboardSink,
) {
    let dashboard = &config.dashboard;
    let candles = match market
        .fetch_ohlcv(symbol, &dashboard.timeframe, dashboard.candle_limit)
        .await
    {
        Ok(candles) => candles,
        Err(e) => {
            sink.log(&format!("Error fetching data for {}: {}", symbol, e));
            return;
        }
    };

    match build_frame(symbol, &dashboard.timeframe, &candles, &dashboard.frame_params()) {
        Ok(frame) => sink.render(&frame),
        Err(e) => sink.log(&format!("Error updating dashboard for {}: {}", symbol, e)),
    }
}

async fn run_async(config: Config, once: bool) -> Result<()> {
    let symbol = Symbol::new(config.dashboard.symbol.clone());
    info!(
        "Dashboard for {} ({}), SuperTrend {} x {}, refresh every {} ms",
        symbol,
        config.dashboard.timeframe,
        config.dashboard.supertrend_period,
        config.dashboard.supertrend_multiplier,
        config.dashboard.refresh_interval_ms
    );

    let market = BinanceClient::new(config.exchange.fetch_timeout())
        .context("Failed to build exchange client")?;
    let mut sink = LogDashboard::new();

    if once {
        refresh(&market, &config, &symbol, &mut sink).await;
        return Ok(());
    }

    let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);

    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                let _ = shutdown_tx.send(()).await;
            }
            Err(e) => {
                error!("Error setting up signal handler: {}", e);
            }
        }
    });

    let mut ticker = interval(config.dashboard.refresh_interval());
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                refresh(&market, &config, &symbol, &mut sink).await;
            }
            Some(()) = shutdown_rx.recv() => {
                info!("Shutdown signal received");
                break;
            }
        }
    }

    info!("Dashboard closed after {} frames", sink.frames_rendered());
    Ok(())
}
