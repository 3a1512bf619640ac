//! Client side of the equidia.fr public API.
//!
//! Endpoint construction, the HTTP client, request pacing and the two
//! acquisition steps (daily calendar, per-race data).

pub mod calendar;
pub mod http;
pub mod pacing;
pub mod race_data;

pub use calendar::{CalendarFetcher, DateRange};
pub use http::{EquidiaClient, FetchFailure, JsonSource};
pub use pacing::{FixedDelay, Pacer};

use chrono::NaiveDate;

use crate::types::{Category, RaceCode};

/// Base URL of the public API
pub const BASE_URL: &str = "https://api.equidia.fr/api/public/";

/// API endpoints consumed by the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    /// Reunions and their courses for one day
    DailyReunions(NaiveDate),
    /// One data category of one race
    Race {
        date: NaiveDate,
        code: RaceCode,
        category: Category,
    },
}

impl Endpoint {
    /// Path relative to the API base
    pub fn path(&self) -> String {
        match self {
            Endpoint::DailyReunions(date) => format!("dailyreunions/{}", date),
            Endpoint::Race {
                date,
                code,
                category,
            } => {
                let r = code.reunion_segment();
                let c = code.course_segment();
                match category {
                    Category::MainResults => format!("v2/courses/{}/{}/{}", date, r, c),
                    Category::Odds => format!("courses/{}/{}/{}/pari_simple", date, r, c),
                    Category::Pronos => format!("courses/{}/{}/{}/pronostic", date, r, c),
                    Category::Tracking => format!("v2/tracking/{}/{}/{}", date, r, c),
                    Category::Notule => format!("courses/{}/{}/{}/notule", date, r, c),
                    Category::Rapports => format!("courses/{}/{}/{}/rapports", date, r, c),
                }
            }
        }
    }

    /// Absolute URL against `base_url`
    pub fn url(&self, base_url: &str) -> String {
        format!("{}/{}", base_url.trim_end_matches('/'), self.path())
    }
}
