//! Activity Reports - customer activity report pipeline
//!
//! Pulls per-customer daily activity logs from the report API, aggregates
//! them per date, enriches locations through reverse geocoding and exports
//! the result as CSV or PDF.

mod cli;
mod commands;
mod config;
mod defaults;
mod error;
mod services;
mod types;

use anyhow::Result;
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use tracing_appender::rolling::{RollingFileAppender, Rotation};

use crate::cli::{Cli, Command};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Logs directory - use LOGS_DIR env var or default to ./logs
    let logs_dir = std::env::var("LOGS_DIR")
        .unwrap_or_else(|_| "./logs".to_string());
    std::fs::create_dir_all(&logs_dir).ok();

    // File appender for persistent logs (daily rotation)
    let file_appender = RollingFileAppender::new(
        Rotation::DAILY,
        &logs_dir,
        "reports.log",
    );
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    // Initialize logging - both stderr and file
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,activity_reports=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(tracing_subscriber::fmt::layer().with_writer(non_blocking).with_ansi(false))
        .init();

    let config = config::Config::from_env()?;
    info!("Configuration loaded (report API at {})", config.report_api_url);

    let result = match cli.command {
        Command::Customers => commands::customers(&config).await,
        Command::Individual { email, date, pdf } => {
            commands::individual(&config, &email, date, pdf).await
        }
        Command::Daily { date } => commands::daily(&config, date).await,
        Command::Range { from, to } => commands::range(&config, from, to).await,
        Command::Group { from, to, pdf } => commands::group(&config, from, to, pdf).await,
    };

    if let Err(e) = &result {
        error!("Command failed: {:#}", e);
    }

    result
}
