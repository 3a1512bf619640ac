//! Daily race calendar.
//!
//! Fetches `dailyreunions/{date}` for every day of a range and flattens the
//! reunions into one row per course. The rows are exported as CSV and read
//! back by the race data importer.

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::Value;
use std::path::Path;
use tracing::{error, info};

use super::http::{FetchFailure, JsonSource};
use super::pacing::Pacer;
use super::Endpoint;
use crate::types::{RaceCalendarEntry, RaceCode};

const EXPORT_HEADER: [&str; 4] = ["date", "hippodrome", "pmu_num", "discipline"];

#[derive(Debug, Deserialize)]
struct Reunion {
    num_reunion: u32,
    #[serde(default)]
    lib_reunion: Option<String>,
    #[serde(default)]
    courses_by_day: Vec<Course>,
}

#[derive(Debug, Deserialize)]
struct Course {
    num_course_pmu: u32,
    #[serde(default)]
    discipline: Option<String>,
}

/// Inclusive range of race days
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    start: NaiveDate,
    end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self> {
        if end < start {
            bail!("End date {} is before start date {}", end, start);
        }
        Ok(Self { start, end })
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    /// Every day from start to end, both included
    pub fn days(&self) -> impl Iterator<Item = NaiveDate> {
        let end = self.end;
        self.start.iter_days().take_while(move |d| *d <= end)
    }

    /// Export file name, e.g. `racesequidia_20191201_20191231.csv`
    pub fn export_file_name(&self) -> String {
        format!(
            "racesequidia_{}_{}.csv",
            self.start.format("%Y%m%d"),
            self.end.format("%Y%m%d")
        )
    }
}

/// Flatten a `dailyreunions` response into calendar rows
pub fn parse_reunions(date: NaiveDate, body: Value) -> Result<Vec<RaceCalendarEntry>, FetchFailure> {
    let reunions: Vec<Reunion> =
        serde_json::from_value(body).map_err(|e| FetchFailure::InvalidBody(e.to_string()))?;

    let mut entries = Vec::new();
    for reunion in reunions {
        let hippodrome = reunion.lib_reunion.unwrap_or_default();
        for course in reunion.courses_by_day {
            entries.push(RaceCalendarEntry {
                date,
                hippodrome: hippodrome.clone(),
                pmu_num: RaceCode::new(reunion.num_reunion, course.num_course_pmu).to_string(),
                discipline: course.discipline,
            });
        }
    }

    Ok(entries)
}

/// Rows gathered over a date range
#[derive(Debug, Default)]
pub struct CalendarReport {
    pub entries: Vec<RaceCalendarEntry>,
    pub failed_dates: Vec<NaiveDate>,
}

/// Walks a date range one request per day
pub struct CalendarFetcher<'a, S, P> {
    source: &'a S,
    pacer: &'a P,
    base_url: &'a str,
}

impl<'a, S: JsonSource, P: Pacer> CalendarFetcher<'a, S, P> {
    pub fn new(source: &'a S, pacer: &'a P, base_url: &'a str) -> Self {
        Self {
            source,
            pacer,
            base_url,
        }
    }

    /// Races of a single day
    pub async fn fetch_day(&self, date: NaiveDate) -> Result<Vec<RaceCalendarEntry>, FetchFailure> {
        let url = Endpoint::DailyReunions(date).url(self.base_url);
        let body = self.source.get_json(&url).await?;
        parse_reunions(date, body)
    }

    /// Races of every day in the range; a failed day contributes no rows
    pub async fn fetch_range(&self, range: DateRange) -> CalendarReport {
        let mut report = CalendarReport::default();

        for date in range.days() {
            match self.fetch_day(date).await {
                Ok(entries) => {
                    info!("{}: {} races", date, entries.len());
                    report.entries.extend(entries);
                }
                Err(e) => {
                    error!("Error fetching race calendar for {}: {}", date, e);
                    report.failed_dates.push(date);
                }
            }
            self.pacer.pause().await;
        }

        report
    }
}

/// Write the calendar export, replacing any previous file of that name
pub fn write_export(path: &Path, entries: &[RaceCalendarEntry]) -> Result<()> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_path(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;

    writer.write_record(EXPORT_HEADER)?;
    for entry in entries {
        writer.serialize(entry)?;
    }
    writer.flush()?;

    Ok(())
}

/// Read a calendar export back as the importer's race list
pub fn read_race_list(path: &Path) -> Result<Vec<RaceCalendarEntry>> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("Failed to open race list {}", path.display()))?;

    let mut entries = Vec::new();
    for (i, row) in reader.deserialize().enumerate() {
        let entry: RaceCalendarEntry =
            row.with_context(|| format!("Invalid race list row {} in {}", i + 2, path.display()))?;
        entries.push(entry);
    }

    Ok(entries)
}
