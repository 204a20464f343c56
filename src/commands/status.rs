//! Status command: print persisted history windows and cooldowns

use anyhow::Result;
use chrono::{TimeZone, Utc};
use itertools::Itertools;
use tracing::info;

use market_alerts::alerting::{Clock, SystemClock};
use market_alerts::cooldown::CooldownGate;
use market_alerts::history::HistoryStore;
use market_alerts::persistence::{create_state_store, state_exists};
use market_alerts::statistics::volume_baseline;

pub fn run(config_path: Option<String>) -> Result<()> {
    let config = super::load_config(config_path.as_deref())?;
    let state = &config.state;
    if !state_exists(
        &state.dir,
        state.backend,
        &state.volume_data_file,
        &state.alert_timestamps_file,
        &state.sqlite_file,
    ) {
        info!("No persisted state in {}", state.dir.display());
        return Ok(());
    }

    let store = create_state_store(
        &config.state.dir,
        config.state.backend,
        &config.state.volume_data_file,
        &config.state.alert_timestamps_file,
        &config.state.sqlite_file,
    )?;

    let history = HistoryStore::load(store.as_ref(), config.alerts.historical_window);
    let cooldown = CooldownGate::load(store.as_ref(), config.alerts.cooldown_ms);
    let now = SystemClock.now_ms();

    info!("State: {}", store.describe());
    info!("{} symbols with volume history", history.len());

    for (symbol, window) in history.snapshot() {
        let volumes = window
            .iter()
            .map(|obs| format!("{:.0}", obs.volume))
            .join(", ");
        let baseline = history
            .window(&symbol)
            .and_then(volume_baseline)
            .map(|b| format!("mean {:.2}, std dev {:.2}", b.mean, b.std_dev))
            .unwrap_or_else(|| "no baseline yet".to_string());
        info!("{:<14} [{}] {}", symbol.as_str(), volumes, baseline);
    }

    if cooldown.entries().is_empty() {
        info!("No alerts recorded");
        return Ok(());
    }

    info!("{} symbols have alerted", cooldown.entries().len());
    for (symbol, &last) in cooldown.entries() {
        let when = Utc
            .timestamp_millis_opt(last)
            .single()
            .map(|t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string())
            .unwrap_or_else(|| last.to_string());
        let remaining = cooldown.remaining_ms(symbol, now);
        if remaining > 0 {
            info!(
                "{:<14} last alert {}, cooling down for {} more min",
                symbol.as_str(),
                when,
                remaining / 60_000
            );
        } else {
            info!("{:<14} last alert {}, ready", symbol.as_str(), when);
        }
    }

    Ok(())
}
