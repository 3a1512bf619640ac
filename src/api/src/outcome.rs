//! Download outcomes and the sinks they are routed to.
//!
//! Every request made for a race yields a [`DownloadOutcome`]. The importer
//! hands each one to the configured sinks: the append-only CSV logs and the
//! tracing log. A race rejected before any request is made is reported to
//! the sinks as a race-level failure.

use anyhow::{Context, Result};
use std::fs::{File, OpenOptions};
use std::path::Path;
use tracing::{error, info, warn};

use crate::equidia::FetchFailure;
use crate::types::{Category, RaceCalendarEntry, RaceCodeError, RaceKey};

const ERROR_MESSAGE: &str = "Download failed";

/// Result of one request for one race category
#[derive(Debug, Clone, PartialEq)]
pub struct DownloadOutcome {
    pub key: RaceKey,
    pub category: Category,
    pub result: Result<(), FetchFailure>,
}

impl DownloadOutcome {
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }

    /// HTTP status of a failed request, when known
    pub fn status(&self) -> Option<u16> {
        self.result.as_ref().err().and_then(FetchFailure::status)
    }
}

/// Destination for download outcomes
pub trait OutcomeSink {
    fn record(&mut self, outcome: &DownloadOutcome) -> Result<()>;

    /// A race skipped because its code could not be parsed
    fn record_rejected(&mut self, entry: &RaceCalendarEntry, error: &RaceCodeError) -> Result<()>;
}

/// Append-only CSV logs, one for successes and one for errors.
///
/// Success rows: `date, race_code, track, category`.
/// Error rows: `date, race_code, track, category, "Download failed"[, status]`.
/// A rejected race is one error row under `main_results` with its raw code.
pub struct CsvOutcomeLog {
    successes: csv::Writer<File>,
    errors: csv::Writer<File>,
}

impl CsvOutcomeLog {
    pub fn open(success_path: &Path, error_path: &Path) -> Result<Self> {
        Ok(Self {
            successes: append_writer(success_path)?,
            errors: append_writer(error_path)?,
        })
    }
}

fn append_writer(path: &Path) -> Result<csv::Writer<File>> {
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("Failed to open log file {}", path.display()))?;

    Ok(csv::WriterBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_writer(file))
}

impl OutcomeSink for CsvOutcomeLog {
    fn record(&mut self, outcome: &DownloadOutcome) -> Result<()> {
        let date = outcome.key.date.to_string();
        let code = outcome.key.code.to_string();
        let mut row = vec![
            date,
            code,
            outcome.key.track.clone(),
            outcome.category.label().to_string(),
        ];

        // Flushed per row so an aborted run keeps what it logged
        if outcome.is_success() {
            self.successes.write_record(&row)?;
            self.successes.flush()?;
        } else {
            row.push(ERROR_MESSAGE.to_string());
            if let Some(status) = outcome.status() {
                row.push(status.to_string());
            }
            self.errors.write_record(&row)?;
            self.errors.flush()?;
        }

        Ok(())
    }

    fn record_rejected(&mut self, entry: &RaceCalendarEntry, _error: &RaceCodeError) -> Result<()> {
        self.errors.write_record([
            entry.date.to_string().as_str(),
            entry.pmu_num.as_str(),
            entry.hippodrome.as_str(),
            Category::MainResults.label(),
            ERROR_MESSAGE,
        ])?;
        self.errors.flush()?;
        Ok(())
    }
}

/// Outcomes as log events
pub struct TracingSink;

impl OutcomeSink for TracingSink {
    fn record(&mut self, outcome: &DownloadOutcome) -> Result<()> {
        match &outcome.result {
            Ok(()) => info!(
                "Downloaded {} data for {} at {}",
                outcome.category, outcome.key.code, outcome.key.date
            ),
            Err(e) => warn!(
                "Error downloading {} data for {} at {}: {}",
                outcome.category, outcome.key.code, outcome.key.date, e
            ),
        }
        Ok(())
    }

    fn record_rejected(&mut self, entry: &RaceCalendarEntry, error: &RaceCodeError) -> Result<()> {
        error!(
            "Skipping race at {} ({}): {}",
            entry.date, entry.hippodrome, error
        );
        Ok(())
    }
}
