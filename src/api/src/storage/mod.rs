//! SQLite storage for raw race payloads
//!
//! The raw-data database is attached as schema `raw_data`, so payloads land
//! in `raw_data.races_raw_data` next to whatever analysis tables live in the
//! main database.

pub mod repository;
pub mod schema;

pub use repository::{QueryResult, RawDataRepository};
