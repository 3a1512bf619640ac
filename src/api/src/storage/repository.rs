//! SQLite repository for raw race payloads and ad-hoc analysis queries

use anyhow::{bail, Context, Result};
#[cfg(test)]
use chrono::NaiveDate;
use rusqlite::types::ValueRef;
use rusqlite::{params, Connection, OpenFlags};
use serde_json::Value;
use std::path::Path;

use super::schema::{create_tables, RAW_DATA_SCHEMA};
use crate::types::RaceRecord;

/// Stored raw payload row
#[cfg(test)]
#[derive(Debug, Clone, PartialEq)]
pub struct RawRaceRow {
    pub date: NaiveDate,
    pub hippodrome: String,
    pub pmu_num: String,
    pub race_json: String,
}

/// Column names and rows of an executed query
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryResult {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

/// Repository over one connection, held for the whole batch
pub struct RawDataRepository {
    conn: Connection,
}

impl RawDataRepository {
    /// Open the main database, attach the raw-data database and create tables
    pub fn open(db_path: &Path, raw_data_path: &Path) -> Result<Self> {
        for path in [db_path, raw_data_path] {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)
                    .context("Failed to create database directory")?;
            }
        }

        let conn = Connection::open(db_path)
            .with_context(|| format!("Failed to open database {}", db_path.display()))?;

        conn.execute(
            &format!("ATTACH DATABASE ?1 AS {}", RAW_DATA_SCHEMA),
            params![raw_data_path.to_string_lossy().into_owned()],
        )
        .with_context(|| format!("Failed to attach {}", raw_data_path.display()))?;

        create_tables(&conn)?;

        Ok(Self { conn })
    }

    /// Open both existing databases read-only, without touching the schema.
    ///
    /// Fails if either file is missing; nothing is created on disk.
    pub fn open_read_only(db_path: &Path, raw_data_path: &Path) -> Result<Self> {
        for path in [db_path, raw_data_path] {
            if !path.is_file() {
                bail!("Database {} does not exist", path.display());
            }
        }

        let conn = Connection::open_with_flags(
            db_path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_URI,
        )
        .with_context(|| format!("Failed to open database {}", db_path.display()))?;

        conn.execute(
            &format!("ATTACH DATABASE ?1 AS {}", RAW_DATA_SCHEMA),
            params![read_only_uri(raw_data_path)],
        )
        .with_context(|| format!("Failed to attach {}", raw_data_path.display()))?;

        Ok(Self { conn })
    }

    /// Create an in-memory repository (for testing)
    #[cfg(test)]
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute(
            &format!("ATTACH DATABASE ':memory:' AS {}", RAW_DATA_SCHEMA),
            [],
        )?;
        create_tables(&conn)?;
        Ok(Self { conn })
    }

    #[cfg(test)]
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    // ==================== Insert Operations ====================

    /// Insert one merged race record and commit it right away
    pub fn insert_race(&self, record: &RaceRecord) -> Result<()> {
        let race_json = record.to_json_text()?;

        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            r#"
            INSERT INTO raw_data.races_raw_data
            (date, hippodrome, pmu_num, race_json)
            VALUES (?1, ?2, ?3, ?4)
            "#,
            params![
                record.key.date.to_string(),
                record.key.track,
                record.key.code.to_string(),
                race_json,
            ],
        )?;
        tx.commit()?;

        Ok(())
    }

    // ==================== Query Operations ====================

    /// Get total stored row count
    pub fn count(&self) -> Result<i64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM raw_data.races_raw_data",
            [],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    /// All rows stored for a race, oldest first
    #[cfg(test)]
    pub fn find(&self, date: NaiveDate, pmu_num: &str) -> Result<Vec<RawRaceRow>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT date, hippodrome, pmu_num, race_json
            FROM raw_data.races_raw_data
            WHERE date = ?1 AND pmu_num = ?2
            ORDER BY id
            "#,
        )?;

        let rows = stmt.query_map(params![date.to_string(), pmu_num], |row| {
            let date_str: String = row.get(0)?;
            let hippodrome: String = row.get(1)?;
            let pmu_num: String = row.get(2)?;
            let race_json: String = row.get(3)?;
            Ok((date_str, hippodrome, pmu_num, race_json))
        })?;

        let mut result = Vec::new();
        for row in rows {
            let (date_str, hippodrome, pmu_num, race_json) = row?;
            result.push(RawRaceRow {
                date: NaiveDate::parse_from_str(&date_str, "%Y-%m-%d")?,
                hippodrome,
                pmu_num,
                race_json,
            });
        }

        Ok(result)
    }

    /// Execute caller-supplied SQL verbatim and fetch the full result set
    pub fn run_query(&self, sql: &str) -> Result<QueryResult> {
        let mut stmt = self.conn.prepare(sql).context("Failed to prepare query")?;
        let columns: Vec<String> = stmt.column_names().iter().map(|c| c.to_string()).collect();
        let width = columns.len();

        let rows = stmt.query_map([], |row| {
            (0..width)
                .map(|i| row.get_ref(i).map(to_json))
                .collect::<rusqlite::Result<Vec<_>>>()
        })?;

        let rows = rows
            .collect::<rusqlite::Result<Vec<_>>>()
            .context("Failed to fetch query results")?;

        Ok(QueryResult { columns, rows })
    }

    /// Close the connection, reporting any pending error
    pub fn close(self) -> Result<()> {
        self.conn
            .close()
            .map_err(|(_, e)| e)
            .context("Failed to close database")
    }
}

/// `file:` URI opening `path` read-only
fn read_only_uri(path: &Path) -> String {
    let mut uri = String::from("file:");
    for c in path.to_string_lossy().chars() {
        match c {
            '%' => uri.push_str("%25"),
            '?' => uri.push_str("%3f"),
            '#' => uri.push_str("%23"),
            c => uri.push(c),
        }
    }
    uri.push_str("?mode=ro");
    uri
}

fn to_json(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::from(i),
        ValueRef::Real(f) => Value::from(f),
        ValueRef::Text(bytes) => Value::String(String::from_utf8_lossy(bytes).into_owned()),
        ValueRef::Blob(bytes) => Value::String(bytes.iter().map(|b| format!("{:02x}", b)).collect()),
    }
}
