//! CLI commands for equidia-ingest.
//!
//! Supports calendar fetching, raw race data import and analysis extraction.

use anyhow::Context;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

use crate::analysis;
use crate::config::AppConfig;
use crate::equidia::calendar::{read_race_list, write_export};
use crate::equidia::{CalendarFetcher, DateRange, EquidiaClient, FixedDelay};
use crate::import::RaceImporter;
use crate::outcome::{CsvOutcomeLog, TracingSink};
use crate::storage::RawDataRepository;

#[derive(Parser)]
#[command(name = "equidia-ingest")]
#[command(version, about = "Equidia race data acquisition and extraction", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Fetch the race calendar for a date range and export it as CSV
    Calendar {
        /// First day (YYYY-MM-DD)
        #[arg(long, default_value = "2019-12-01")]
        start: NaiveDate,

        /// Last day, included (YYYY-MM-DD)
        #[arg(long, default_value = "2019-12-31")]
        end: NaiveDate,

        /// Directory for the export file
        #[arg(short, long)]
        output_dir: Option<PathBuf>,
    },

    /// Download raw data for every race of a calendar export into the database
    Import {
        /// Calendar export to import
        #[arg(value_name = "RACES_CSV", default_value = "racesequidia_20190401_20190430.csv")]
        races: PathBuf,
    },

    /// Run the analysis query against the database
    Extract {
        /// SQL file override
        #[arg(short, long)]
        query: Option<PathBuf>,

        /// Write the result set to this CSV file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

/// Fetch the calendar for `start..=end` and write the export file.
pub async fn run_calendar(
    config: AppConfig,
    start: NaiveDate,
    end: NaiveDate,
    output_dir: Option<PathBuf>,
) -> anyhow::Result<()> {
    let range = DateRange::new(start, end)?;
    let output_dir = output_dir.unwrap_or(config.output.dir);
    let path = output_dir.join(range.export_file_name());
    tracing::info!("Calendar {} to {} -> {}", range.start(), range.end(), path.display());

    let client = EquidiaClient::new(Duration::from_secs(config.api.timeout_secs))?;
    let pacer = FixedDelay::from_millis(config.pacing.calendar_delay_ms);
    let fetcher = CalendarFetcher::new(&client, &pacer, &config.api.base_url);

    let report = fetcher.fetch_range(range).await;

    std::fs::create_dir_all(&output_dir)
        .with_context(|| format!("Failed to create {}", output_dir.display()))?;
    write_export(&path, &report.entries)?;

    tracing::info!(
        "Wrote {} races to {} ({} days failed)",
        report.entries.len(),
        path.display(),
        report.failed_dates.len()
    );

    Ok(())
}

/// Import every race listed in `races` into the raw-data table.
pub async fn run_import(config: AppConfig, races: PathBuf) -> anyhow::Result<()> {
    let entries = read_race_list(&races)?;
    tracing::info!("Loaded {} races from {}", entries.len(), races.display());

    let repo = RawDataRepository::open(&config.database.path, &config.database.raw_data_path)?;
    let csv_log = CsvOutcomeLog::open(&config.logs.success_file, &config.logs.error_file)?;

    let client = EquidiaClient::new(Duration::from_secs(config.api.timeout_secs))?;
    let pacer = FixedDelay::from_millis(config.pacing.race_delay_ms);
    tracing::debug!("Pausing {:?} between races", pacer.delay());

    let summary = RaceImporter::new(&client, &pacer, &config.api.base_url, &repo)
        .with_sink(csv_log)
        .with_sink(TracingSink)
        .run(&entries)
        .await;

    let stored = repo.count()?;
    repo.close()?;

    tracing::info!("raw_data.races_raw_data holds {} rows", stored);
    tracing::info!(
        "Import done: {}/{} races inserted, {} insert errors, {} invalid codes, {} downloads ok, {} failed",
        summary.inserted,
        summary.races,
        summary.insert_failures,
        summary.invalid_codes,
        summary.downloads_ok,
        summary.downloads_failed
    );

    Ok(())
}

/// Run the analysis query and optionally export the rows.
pub fn run_extract(
    config: AppConfig,
    query: Option<PathBuf>,
    output: Option<PathBuf>,
) -> anyhow::Result<()> {
    let query_file = query.unwrap_or(config.analysis.query_file);
    tracing::info!("Running {}", query_file.display());

    let result = analysis::extract(&config.database, &query_file)?;
    tracing::info!("Fetched {} rows ({} columns)", result.rows.len(), result.columns.len());

    if let Some(path) = output {
        analysis::write_csv(&result, &path)?;
        tracing::info!("Wrote {}", path.display());
    }

    Ok(())
}
