//! Configuration for the Equidia ingest pipeline.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::equidia::BASE_URL;

/// API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_base_url() -> String {
    BASE_URL.to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Pauses between work items
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PacingConfig {
    /// After each calendar day
    #[serde(default = "default_calendar_delay_ms")]
    pub calendar_delay_ms: u64,
    /// After each imported race
    #[serde(default = "default_race_delay_ms")]
    pub race_delay_ms: u64,
}

fn default_calendar_delay_ms() -> u64 {
    250
}

fn default_race_delay_ms() -> u64 {
    750
}

impl Default for PacingConfig {
    fn default() -> Self {
        Self {
            calendar_delay_ms: default_calendar_delay_ms(),
            race_delay_ms: default_race_delay_ms(),
        }
    }
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Main SQLite database
    #[serde(default = "default_db_path")]
    pub path: PathBuf,
    /// Database attached as the `raw_data` schema
    #[serde(default = "default_raw_data_path")]
    pub raw_data_path: PathBuf,
}

fn default_db_path() -> PathBuf {
    PathBuf::from("data/equidia.db")
}

fn default_raw_data_path() -> PathBuf {
    PathBuf::from("data/raw_data.db")
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
            raw_data_path: default_raw_data_path(),
        }
    }
}

/// Download outcome log files
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogsConfig {
    #[serde(default = "default_success_file")]
    pub success_file: PathBuf,
    #[serde(default = "default_error_file")]
    pub error_file: PathBuf,
}

fn default_success_file() -> PathBuf {
    PathBuf::from("successful_downloads.csv")
}

fn default_error_file() -> PathBuf {
    PathBuf::from("download_errors.csv")
}

impl Default for LogsConfig {
    fn default() -> Self {
        Self {
            success_file: default_success_file(),
            error_file: default_error_file(),
        }
    }
}

/// Calendar export location
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_output_dir")]
    pub dir: PathBuf,
}

fn default_output_dir() -> PathBuf {
    PathBuf::from(".")
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: default_output_dir(),
        }
    }
}

/// Analysis extraction
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    #[serde(default = "default_query_file")]
    pub query_file: PathBuf,
}

fn default_query_file() -> PathBuf {
    PathBuf::from("sql_scripts/queries/french_trotting_2019_analysis_data_extraction.sql")
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            query_file: default_query_file(),
        }
    }
}

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub pacing: PacingConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub logs: LogsConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub analysis: AnalysisConfig,
}

impl AppConfig {
    /// Load configuration from environment and config file
    pub fn load() -> anyhow::Result<Self> {
        Self::load_from(config::File::with_name("config").required(false))
    }

    fn load_from<S>(file: S) -> anyhow::Result<Self>
    where
        S: config::Source + Send + Sync + 'static,
    {
        let config = config::Config::builder()
            // Start with defaults
            .add_source(config::Config::try_from(&AppConfig::default())?)
            // Add config file if exists
            .add_source(file)
            // Override with environment variables (EQUIDIA_DATABASE__PATH, etc.)
            .add_source(
                config::Environment::with_prefix("EQUIDIA")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        Ok(config.try_deserialize()?)
    }
}
