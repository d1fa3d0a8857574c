//! Trend & hedge strategies - diagnostics entry point
//!
//! This binary provides two subcommands:
//! - check: Validate a configuration and construct its strategy
//! - channels: Print channel bands and trend over a CSV of bars

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod commands;

#[derive(Parser, Debug)]
#[command(name = "trend-hedge-strategies")]
#[command(about = "Channel trend and hedging grid strategy diagnostics", long_about = None)]
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
    /// Load and validate a configuration, then construct its strategy
    Check {
        /// Path to configuration file
        #[arg(short, long, default_value = "configs/trend_channel.json")]
        config: String,
    },

    /// Feed bars through the channel engine and print bands and trend
    Channels {
        /// Path to configuration file (periods are read from its strategy section)
        #[arg(short, long, default_value = "configs/trend_channel.json")]
        config: String,

        /// CSV of bars: datetime,open,high,low,close[,volume]
        #[arg(short, long)]
        data: String,

        /// Number of most recent bars to print
        #[arg(short, long, default_value = "20")]
        last: usize,
    },
}

fn setup_logging(verbose: bool, command_name: &str) -> Result<()> {
    // Create logs directory
    std::fs::create_dir_all("logs")?;

    // Create log file with naming pattern: {command}_{date}.log
    let log_filename = format!(
        "{}_{}.log",
        command_name,
        chrono::Local::now().format("%Y-%m-%d_%H-%M-%S")
    );
    let log_path = PathBuf::from("logs").join(&log_filename);

    let level = if verbose { "debug" } else { "info" };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    // File appender
    let file_appender = tracing_appender::rolling::never("logs", &log_filename);

    let console_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_line_number(true)
        .with_file(true)
        .with_ansi(true);

    // File layer - same format but without ANSI colors
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

    info!("Logging initialized");
    info!("Log file: {}", log_path.display());

    Ok(())
}

fn main() -> Result<()> {
    // Optional .env with STRATEGY_LABEL / RUST_LOG
    dotenv::dotenv().ok();

    let cli = Cli::parse();

    let command_name = match &cli.command {
        Commands::Check { .. } => "check",
        Commands::Channels { .. } => "channels",
    };

    setup_logging(cli.verbose, command_name)?;

    match cli.command {
        Commands::Check { config } => commands::check::run(config),
        Commands::Channels { config, data, last } => commands::channels::run(config, data, last),
    }
}
