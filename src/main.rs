//! Market alerts - main entry point
//!
//! This binary provides three subcommands:
//! - alert: Run the volume and price-change alerting loop
//! - dashboard: Refresh a SuperTrend dashboard for one symbol
//! - status: Show persisted history and cooldowns

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod commands;

#[derive(Parser, Debug)]
#[command(name = "market-alerts")]
#[command(about = "Volume spike and price change alerts for crypto markets", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the alerting loop
    Alert {
        /// Path to configuration file (defaults apply when omitted)
        #[arg(short, long)]
        config: Option<String>,

        /// Directory for persisted state (overrides config file)
        #[arg(long)]
        state_dir: Option<String>,

        /// Sweep interval in milliseconds (overrides config file)
        #[arg(long)]
        interval_ms: Option<u64>,

        /// Run a single sweep and exit
        #[arg(long)]
        once: bool,
    },

    /// Show a SuperTrend dashboard for one symbol
    Dashboard {
        /// Path to configuration file (defaults apply when omitted)
        #[arg(short, long)]
        config: Option<String>,

        /// Symbol in BASE/QUOTE form, e.g. BTC/USDT (overrides config file)
        #[arg(short, long)]
        symbol: Option<String>,

        /// Candle timeframe, e.g. "1h", "4h", "1d" (overrides config file)
        #[arg(short, long)]
        timeframe: Option<String>,

        /// Render a single frame and exit
        #[arg(long)]
        once: bool,
    },

    /// Show persisted volume history and alert cooldowns
    Status {
        /// Path to configuration file (defaults apply when omitted)
        #[arg(short, long)]
        config: Option<String>,
    },
}

fn setup_logging(verbose: bool, command_name: &str) -> Result<()> {
    std::fs::create_dir_all("logs")?;

    // {command}_{date}.log
    let log_filename = format!(
        "{}_{}.log",
        command_name,
        chrono::Local::now().format("%Y-%m-%d_%H-%M-%S")
    );
    let log_path = PathBuf::from("logs").join(&log_filename);

    // Filter out noisy HTTP crates
    let level = if verbose { "debug" } else { "info" };
    let filter_str = format!(
        "{},hyper=warn,hyper_util=warn,reqwest=warn,rustls=warn,h2=warn",
        level
    );
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&filter_str));

    let file_appender = tracing_appender::rolling::never("logs", &log_filename);

    let console_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_line_number(true)
        .with_file(true)
        .with_ansi(true);

    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(file_appender)
        .with_target(true)
        .with_line_number(true)
        .with_file(true)
        .with_ansi(false);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .init();

    info!("Log file: {}", log_path.display());
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let command_name = match &cli.command {
        Commands::Alert { .. } => "alert",
        Commands::Dashboard { .. } => "dashboard",
        Commands::Status { .. } => "status",
    };
    setup_logging(cli.verbose, command_name)?;

    match cli.command {
        Commands::Alert {
            config,
            state_dir,
            interval_ms,
            once,
        } => commands::alert::run(config, state_dir, interval_ms, once),

        Commands::Dashboard {
            config,
            symbol,
            timeframe,
            once,
        } => commands::dashboard::run(config, symbol, timeframe, once),

        Commands::Status { config } => commands::status::run(config),
    }
}
