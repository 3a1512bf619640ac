//! Race identifiers, calendar rows and merged race records.

use chrono::NaiveDate;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;
use thiserror::Error;

/// Rejected PMU race code
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RaceCodeError {
    #[error("race code '{0}' has no reunion part (R<n>)")]
    MissingReunion(String),
    #[error("race code '{0}' has no course part (C<n>)")]
    MissingCourse(String),
    #[error("race code '{0}' has a number out of range")]
    OutOfRange(String),
    #[error("race code '{0}' has a zero-padded number")]
    LeadingZero(String),
}

fn reunion_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"R(\d+)").expect("static regex"))
}

fn course_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"C(\d+)").expect("static regex"))
}

/// PMU race code `R<n>C<m>`: reunion `n`, course `m` within that reunion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RaceCode {
    pub reunion: u32,
    pub course: u32,
}

impl RaceCode {
    pub fn new(reunion: u32, course: u32) -> Self {
        Self { reunion, course }
    }

    /// Path segment for the reunion, e.g. `R1`
    pub fn reunion_segment(&self) -> String {
        format!("R{}", self.reunion)
    }

    /// Path segment for the course, e.g. `C4`
    pub fn course_segment(&self) -> String {
        format!("C{}", self.course)
    }
}

impl fmt::Display for RaceCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "R{}C{}", self.reunion, self.course)
    }
}

impl FromStr for RaceCode {
    type Err = RaceCodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let reunion = reunion_re()
            .captures(s)
            .ok_or_else(|| RaceCodeError::MissingReunion(s.to_string()))?;
        let course = course_re()
            .captures(s)
            .ok_or_else(|| RaceCodeError::MissingCourse(s.to_string()))?;

        // R01 and R1 would name the same race under different strings
        let parse = |digits: &str| {
            if digits.len() > 1 && digits.starts_with('0') {
                return Err(RaceCodeError::LeadingZero(s.to_string()));
            }
            digits
                .parse::<u32>()
                .map_err(|_| RaceCodeError::OutOfRange(s.to_string()))
        };

        Ok(Self {
            reunion: parse(&reunion[1])?,
            course: parse(&course[1])?,
        })
    }
}

/// Identity of one race on one day
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RaceKey {
    pub date: NaiveDate,
    pub track: String,
    pub code: RaceCode,
}

/// One row of the race calendar export, also the input row of the importer.
///
/// `pmu_num` stays raw text so a malformed code only rejects its own race.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RaceCalendarEntry {
    pub date: NaiveDate,
    pub hippodrome: String,
    pub pmu_num: String,
    #[serde(default)]
    pub discipline: Option<String>,
}

impl RaceCalendarEntry {
    /// Validate the race code and build the race identity
    pub fn race_key(&self) -> Result<RaceKey, RaceCodeError> {
        Ok(RaceKey {
            date: self.date,
            track: self.hippodrome.clone(),
            code: self.pmu_num.parse()?,
        })
    }
}

/// Data categories fetched for a race, in request order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    MainResults,
    Odds,
    Pronos,
    Tracking,
    Notule,
    Rapports,
}

impl Category {
    pub const ALL: [Category; 6] = [
        Category::MainResults,
        Category::Odds,
        Category::Pronos,
        Category::Tracking,
        Category::Notule,
        Category::Rapports,
    ];

    /// Name used in outcome logs
    pub fn label(&self) -> &'static str {
        match self {
            Category::MainResults => "main_results",
            Category::Odds => "odds",
            Category::Pronos => "pronos",
            Category::Tracking => "tracking",
            Category::Notule => "notule",
            Category::Rapports => "rapports",
        }
    }

    /// Key under which the payload is merged; the main result has none
    /// because its fields form the base record.
    pub fn record_key(&self) -> Option<&'static str> {
        match self {
            Category::MainResults => None,
            other => Some(other.label()),
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Merged raw payloads for one race
#[derive(Debug, Clone, PartialEq)]
pub struct RaceRecord {
    pub key: RaceKey,
    payload: Map<String, Value>,
}

impl RaceRecord {
    /// Start from an empty base; used as-is when the main result is missing
    pub fn new(key: RaceKey) -> Self {
        Self {
            key,
            payload: Map::new(),
        }
    }

    /// Merge the main result fields into the base record
    pub fn set_main(&mut self, fields: Map<String, Value>) {
        self.payload.extend(fields);
    }

    /// Store a supplementary payload under its category key
    pub fn insert_category(&mut self, category: Category, value: Value) {
        match category.record_key() {
            Some(key) => {
                self.payload.insert(key.to_string(), value);
            }
            None => {
                if let Value::Object(fields) = value {
                    self.set_main(fields);
                }
            }
        }
    }

    #[cfg(test)]
    pub fn payload(&self) -> &Map<String, Value> {
        &self.payload
    }

    /// Serialize as UTF-8 JSON text, non-ASCII kept verbatim
    pub fn to_json_text(&self) -> serde_json::Result<String> {
        serde_json::to_string(&self.payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn key() -> RaceKey {
        RaceKey {
            date: NaiveDate::from_ymd_opt(2019, 12, 1).unwrap(),
            track: "Vincennes".to_string(),
            code: RaceCode::new(1, 1),
        }
    }

    #[test]
    fn test_parse_race_code() {
        let code: RaceCode = "R1C4".parse().unwrap();
        assert_eq!(code, RaceCode::new(1, 4));
        assert_eq!(code.to_string(), "R1C4");
        assert_eq!(code.reunion_segment(), "R1");
        assert_eq!(code.course_segment(), "C4");

        let code: RaceCode = "R12C10".parse().unwrap();
        assert_eq!(code, RaceCode::new(12, 10));
    }

    #[test]
    fn test_parse_race_code_invalid() {
        assert_eq!(
            "C4".parse::<RaceCode>(),
            Err(RaceCodeError::MissingReunion("C4".to_string()))
        );
        assert_eq!(
            "R1".parse::<RaceCode>(),
            Err(RaceCodeError::MissingCourse("R1".to_string()))
        );
        assert!("".parse::<RaceCode>().is_err());
        assert!(matches!(
            "R99999999999C1".parse::<RaceCode>(),
            Err(RaceCodeError::OutOfRange(_))
        ));
    }

    #[test]
    fn test_parse_race_code_rejects_zero_padding() {
        assert_eq!(
            "R01C2".parse::<RaceCode>(),
            Err(RaceCodeError::LeadingZero("R01C2".to_string()))
        );
        assert_eq!(
            "R1C02".parse::<RaceCode>(),
            Err(RaceCodeError::LeadingZero("R1C02".to_string()))
        );
        assert_eq!("R0C10".parse::<RaceCode>(), Ok(RaceCode::new(0, 10)));
    }

    #[test]
    fn test_entry_race_key() {
        let entry = RaceCalendarEntry {
            date: NaiveDate::from_ymd_opt(2019, 12, 1).unwrap(),
            hippodrome: "Vincennes".to_string(),
            pmu_num: "R1C1".to_string(),
            discipline: Some("Attelé".to_string()),
        };
        assert_eq!(entry.race_key().unwrap(), key());

        let bad = RaceCalendarEntry {
            pmu_num: "bogus".to_string(),
            ..entry
        };
        assert!(bad.race_key().is_err());
    }

    #[test]
    fn test_category_keys() {
        assert_eq!(Category::MainResults.record_key(), None);
        assert_eq!(Category::MainResults.label(), "main_results");
        let keys: Vec<_> = Category::ALL.iter().filter_map(|c| c.record_key()).collect();
        assert_eq!(keys, vec!["odds", "pronos", "tracking", "notule", "rapports"]);
    }

    #[test]
    fn test_record_merge() {
        let mut record = RaceRecord::new(key());
        record.insert_category(Category::MainResults, json!({"id": 42}));
        record.insert_category(Category::Odds, json!({}));
        record.insert_category(Category::Rapports, json!([1, 2]));

        let parsed: Value = serde_json::from_str(&record.to_json_text().unwrap()).unwrap();
        assert_eq!(parsed, json!({"id": 42, "odds": {}, "rapports": [1, 2]}));
    }

    #[test]
    fn test_record_keeps_non_ascii() {
        let mut record = RaceRecord::new(key());
        record.insert_category(Category::MainResults, json!({"discipline": "Attelé"}));
        assert!(record.to_json_text().unwrap().contains("Attelé"));
    }
}
