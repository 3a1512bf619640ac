//! Analysis data extraction: run a stored SQL query against the database.

use anyhow::{bail, Context, Result};
use serde_json::Value;
use std::path::Path;

use crate::config::DatabaseConfig;
use crate::storage::{QueryResult, RawDataRepository};

/// Execute the query in `query_file` and fetch every row.
///
/// Both database files must already exist; they are checked before
/// connecting, and the connection is read-only.
pub fn extract(db: &DatabaseConfig, query_file: &Path) -> Result<QueryResult> {
    if !db.path.exists() {
        bail!(
            "Database {} does not exist; set EQUIDIA_DATABASE__PATH or database.path in the config file",
            db.path.display()
        );
    }
    if !db.raw_data_path.exists() {
        bail!(
            "Raw data database {} does not exist; set EQUIDIA_DATABASE__RAW_DATA_PATH or database.raw_data_path in the config file",
            db.raw_data_path.display()
        );
    }

    let sql = std::fs::read_to_string(query_file)
        .with_context(|| format!("Failed to read query file {}", query_file.display()))?;

    let repo = RawDataRepository::open_read_only(&db.path, &db.raw_data_path)?;
    let result = repo.run_query(&sql)?;
    repo.close()?;

    Ok(result)
}

/// Write a result set as CSV with a header row
pub fn write_csv(result: &QueryResult, path: &Path) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;

    writer.write_record(&result.columns)?;
    for row in &result.rows {
        writer.write_record(row.iter().map(cell))?;
    }
    writer.flush()?;

    Ok(())
}

fn cell(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Category, RaceCode, RaceKey, RaceRecord};
    use chrono::NaiveDate;
    use serde_json::json;
    use std::path::PathBuf;

    fn db_config(dir: &Path) -> DatabaseConfig {
        DatabaseConfig {
            path: dir.join("equidia.db"),
            raw_data_path: dir.join("raw_data.db"),
        }
    }

    fn seed(db: &DatabaseConfig) {
        let repo = RawDataRepository::open(&db.path, &db.raw_data_path).unwrap();
        for course in 1..=2 {
            let mut record = RaceRecord::new(RaceKey {
                date: NaiveDate::from_ymd_opt(2019, 12, 1).unwrap(),
                track: "Vincennes".to_string(),
                code: RaceCode::new(1, course),
            });
            record.insert_category(Category::MainResults, json!({"libelle": format!("Prix {}", course)}));
            repo.insert_race(&record).unwrap();
        }
        repo.close().unwrap();
    }

    #[test]
    fn test_extract_runs_query_file() {
        let dir = tempfile::tempdir().unwrap();
        let db = db_config(dir.path());
        seed(&db);

        let query = dir.path().join("query.sql");
        std::fs::write(
            &query,
            "SELECT pmu_num, json_extract(race_json, '$.libelle') AS libelle \
             FROM raw_data.races_raw_data ORDER BY pmu_num",
        )
        .unwrap();

        let result = extract(&db, &query).unwrap();
        assert_eq!(result.columns, vec!["pmu_num", "libelle"]);
        assert_eq!(
            result.rows,
            vec![
                vec![json!("R1C1"), json!("Prix 1")],
                vec![json!("R1C2"), json!("Prix 2")],
            ]
        );
    }

    #[test]
    fn test_extract_refuses_missing_database() {
        let dir = tempfile::tempdir().unwrap();
        let db = db_config(dir.path());
        let query = dir.path().join("query.sql");
        std::fs::write(&query, "SELECT 1").unwrap();

        assert!(extract(&db, &query).is_err());
        // Nothing was created by the failed attempt
        assert!(!db.path.exists());
    }

    #[test]
    fn test_extract_refuses_missing_raw_data() {
        let dir = tempfile::tempdir().unwrap();
        let db = db_config(dir.path());
        std::fs::write(&db.path, b"").unwrap();
        let query = dir.path().join("query.sql");
        std::fs::write(&query, "SELECT COUNT(*) FROM raw_data.races_raw_data").unwrap();

        assert!(extract(&db, &query).is_err());
        assert!(!db.raw_data_path.exists());
    }

    #[test]
    fn test_extract_does_not_write() {
        let dir = tempfile::tempdir().unwrap();
        let db = db_config(dir.path());
        seed(&db);
        let query = dir.path().join("query.sql");
        std::fs::write(&query, "DELETE FROM raw_data.races_raw_data").unwrap();

        assert!(extract(&db, &query).is_err());

        let repo = RawDataRepository::open(&db.path, &db.raw_data_path).unwrap();
        assert_eq!(repo.count().unwrap(), 2);
    }

    #[test]
    fn test_extract_missing_query_file() {
        let dir = tempfile::tempdir().unwrap();
        let db = db_config(dir.path());
        seed(&db);

        assert!(extract(&db, &PathBuf::from("does/not/exist.sql")).is_err());
    }

    #[test]
    fn test_write_csv() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");
        let result = QueryResult {
            columns: vec!["a".to_string(), "b".to_string()],
            rows: vec![vec![json!("x"), Value::Null], vec![json!(3), json!(1.5)]],
        };

        write_csv(&result, &path).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "a,b\nx,\n3,1.5\n");
    }
}
