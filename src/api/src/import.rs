//! Race data import loop.
//!
//! For every race of the list: validate the code, download the six
//! categories, route the outcomes to the sinks, insert the merged record
//! and pause. Each stage is contained to its race. A race with an invalid
//! code makes no request, so it is reported to the sinks and not paced.

use tracing::{error, info, warn};

use crate::equidia::race_data::download_race;
use crate::equidia::{JsonSource, Pacer};
use crate::outcome::OutcomeSink;
use crate::storage::RawDataRepository;
use crate::types::RaceCalendarEntry;

/// Counters for one import run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportSummary {
    pub races: usize,
    pub inserted: usize,
    pub insert_failures: usize,
    pub invalid_codes: usize,
    pub downloads_ok: usize,
    pub downloads_failed: usize,
}

/// Imports a race list into the raw-data table
pub struct RaceImporter<'a, S, P> {
    source: &'a S,
    pacer: &'a P,
    base_url: &'a str,
    repo: &'a RawDataRepository,
    sinks: Vec<Box<dyn OutcomeSink + 'a>>,
}

impl<'a, S: JsonSource, P: Pacer> RaceImporter<'a, S, P> {
    pub fn new(source: &'a S, pacer: &'a P, base_url: &'a str, repo: &'a RawDataRepository) -> Self {
        Self {
            source,
            pacer,
            base_url,
            repo,
            sinks: Vec::new(),
        }
    }

    /// Route every download outcome to `sink` as well
    pub fn with_sink(mut self, sink: impl OutcomeSink + 'a) -> Self {
        self.sinks.push(Box::new(sink));
        self
    }

    pub async fn run(&mut self, races: &[RaceCalendarEntry]) -> ImportSummary {
        let mut summary = ImportSummary::default();

        for entry in races {
            summary.races += 1;

            let key = match entry.race_key() {
                Ok(key) => key,
                Err(e) => {
                    summary.invalid_codes += 1;
                    for sink in self.sinks.iter_mut() {
                        if let Err(sink_err) = sink.record_rejected(entry, &e) {
                            warn!("Failed to record rejected race {}: {:#}", entry.pmu_num, sink_err);
                        }
                    }
                    continue;
                }
            };
            info!("{} {} {}", key.date, key.track, key.code);

            let download = download_race(self.source, self.base_url, &key).await;
            summary.downloads_ok += download.succeeded();
            summary.downloads_failed += download.failed();

            for outcome in &download.outcomes {
                for sink in self.sinks.iter_mut() {
                    if let Err(e) = sink.record(outcome) {
                        warn!("Failed to record outcome for {} at {}: {:#}", key.code, key.date, e);
                    }
                }
            }

            match self.repo.insert_race(&download.record) {
                Ok(()) => {
                    info!("Successfully inserted data for {} at {}", key.code, key.date);
                    summary.inserted += 1;
                }
                Err(e) => {
                    error!("Error inserting data for race at {}: {:#}", key.date, e);
                    summary.insert_failures += 1;
                }
            }

            self.pacer.pause().await;
        }

        summary
    }
}
