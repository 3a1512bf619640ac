//! Equidia ingest
//!
//! Fetches the French race calendar and raw race data from the equidia.fr
//! public API into SQLite, and extracts analysis data with SQL.

mod analysis;
mod cli;
mod config;
mod equidia;
mod import;
mod outcome;
mod storage;
mod types;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::cli::{Cli, Commands};
use crate::config::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "equidia_ingest=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    // Load configuration
    let config = AppConfig::load()?;
    tracing::debug!("Configuration loaded: {:?}", config);

    match cli.command {
        Commands::Calendar {
            start,
            end,
            output_dir,
        } => cli::run_calendar(config, start, end, output_dir).await,
        Commands::Import { races } => cli::run_import(config, races).await,
        Commands::Extract { query, output } => cli::run_extract(config, query, output),
    }
}
