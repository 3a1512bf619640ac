//! SQLite schema for the raw-data staging layer
//!
//! Tables:
//! - raw_data.races_raw_data: one merged JSON payload per imported race

use rusqlite::{Connection, Result};

/// Schema name the raw-data database is attached under
pub const RAW_DATA_SCHEMA: &str = "raw_data";

/// Create all tables in the attached raw-data schema
pub fn create_tables(conn: &Connection) -> Result<()> {
    // Re-imports append rows, so no uniqueness on the race identity
    conn.execute(
        r#"
        CREATE TABLE IF NOT EXISTS raw_data.races_raw_data (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            date TEXT NOT NULL,
            hippodrome TEXT NOT NULL,
            pmu_num TEXT NOT NULL,
            race_json TEXT NOT NULL,
            inserted_at TEXT DEFAULT (datetime('now'))
        )
        "#,
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS raw_data.idx_races_raw_data_race ON races_raw_data(date, pmu_num)",
        [],
    )?;

    Ok(())
}
