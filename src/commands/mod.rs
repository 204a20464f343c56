pub mod alert;
pub mod dashboard;
pub mod status;

use std::path::Path;

use anyhow::{Context, Result};
use market_alerts::Config;

/// Load config from an optional path; defaults plus environment otherwise
pub fn load_config(config_path: Option<&str>) -> Result<Config> {
    dotenv::dotenv().ok();
    match config_path {
        Some(path) => Config::load(Some(Path::new(path)))
            .with_context(|| format!("Failed to load config from {}", path)),
        None => Config::load(None),
    }
}

pub fn build_runtime() -> Result<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to build tokio runtime")
}
