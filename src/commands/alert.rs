//! Alert command
//!
//! Runs the alerting loop until Ctrl+C, or a single sweep with `--once`.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::sync::mpsc;
use tracing::{error, info, warn};

use market_alerts::alerting::{AlertingLoop, SystemClock};
use market_alerts::binance::BinanceClient;
use market_alerts::notify::{ConsoleNotifier, FanoutNotifier, NotificationSink, TelegramNotifier};
use market_alerts::persistence::{create_state_store, StateStore};
use market_alerts::Config;

pub fn run(
    config_path: Option<String>,
    state_dir: Option<String>,
    interval_ms: Option<u64>,
    once: bool,
) -> Result<()> {
    let mut config = super::load_config(config_path.as_deref())?;
    if let Some(dir) = state_dir {
        config.state.dir = dir.into();
    }
    if let Some(ms) = interval_ms {
        if ms == 0 {
            anyhow::bail!("--interval-ms must be positive");
        }
        config.alerts.sweep_interval_ms = ms;
    }

    let runtime = super::build_runtime()?;
    runtime.block_on(run_async(config, once))
}

fn build_notifier(config: &Config) -> Result<FanoutNotifier> {
    let mut sinks: Vec<Box<dyn NotificationSink>> =
        vec![Box::new(ConsoleNotifier::new(config.notifications.console_bell))];

    match config.notifications.telegram() {
        Some((token, chat_id)) => {
            let telegram = TelegramNotifier::new(
                token,
                chat_id,
                Duration::from_millis(config.notifications.timeout_ms),
            )
            .context("Failed to build Telegram client")?;
            sinks.push(Box::new(telegram));
            info!("Telegram notifications enabled");
        }
        None => info!("Telegram not configured, alerts go to the console only"),
    }

    Ok(FanoutNotifier::new(sinks))
}

async fn run_async(config: Config, once: bool) -> Result<()> {
    let symbols = match config.exchange.fixed_symbols() {
        Some(list) => list
            .iter()
            .map(|s| s.to_string())
            .collect::<Vec<_>>()
            .join(", "),
        None => format!("top {} listed", config.exchange.max_symbols),
    };

    info!("╔══════════════════════════════════════════════════════════════╗");
    info!("║                 MARKET ALERTS - VOLUME & PRICE               ║");
    info!("╠══════════════════════════════════════════════════════════════╣");
    info!("║ Exchange: {:<50} ║", config.exchange.id);
    info!("║ Quote: {:<53} ║", config.exchange.quote_currency);
    info!("║ Symbols: {:<51} ║", symbols);
    info!(
        "║ Volume: {:<52} ║",
        format!(
            "{} std devs over {} observations",
            config.alerts.alert_threshold_std_dev, config.alerts.historical_window
        )
    );
    info!(
        "║ Price: {:<53} ║",
        format!(
            "{}% over {}",
            config.alerts.price_change_threshold_pct, config.alerts.price_change_timeframe
        )
    );
    info!("║ Cooldown: {:<50} ║", format!("{} ms", config.alerts.cooldown_ms));
    info!("║ Sweep Interval: {:<44} ║", format!("{} ms", config.alerts.sweep_interval_ms));
    info!("╚══════════════════════════════════════════════════════════════╝");

    let market = BinanceClient::new(config.exchange.fetch_timeout())
        .context("Failed to build exchange client")?;
    match market.ping().await {
        Ok(true) => info!("Exchange reachable"),
        Ok(false) | Err(_) => warn!("Exchange ping failed, sweeps will retry each tick"),
    }

    let store: Arc<dyn StateStore> = Arc::from(create_state_store(
        &config.state.dir,
        config.state.backend,
        &config.state.volume_data_file,
        &config.state.alert_timestamps_file,
        &config.state.sqlite_file,
    )?);
    let notifier = Arc::new(build_notifier(&config)?);
    let startup_message = config.notifications.startup_message;

    let alerting = Arc::new(AlertingLoop::new(
        config,
        Arc::new(market),
        notifier,
        store,
        Arc::new(SystemClock),
    ));

    if once {
        let report = alerting.run_once().await;
        if !report.persisted && report.symbols_scanned > 0 {
            warn!("State was not saved this sweep");
        }
        return Ok(());
    }

    if startup_message {
        alerting.send_startup_message().await;
    }

    let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>(1);

    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Received Ctrl+C, initiating shutdown...");
                let _ = shutdown_tx.send(()).await;
            }
            Err(e) => {
                error!("Error setting up signal handler: {}", e);
            }
        }
    });

    alerting.run(shutdown_rx).await;
    info!("Alert session ended.");
    Ok(())
}
