use std::path::Path;

use _model::{ParseKeyError, SearchStatus};
use rusqlite::Connection;
use serde::Serialize;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, StoreError>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),
    #[error("grid point {location} has unknown status {value:?}")]
    InvalidStatus { location: String, value: String },
    #[error("stored grid location {location:?} is malformed")]
    InvalidLocation {
        location: String,
        source: ParseKeyError,
    },
}

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS places (
        place_id TEXT PRIMARY KEY,
        name TEXT NOT NULL
    );
    CREATE TABLE IF NOT EXISTS types (
        type_id INTEGER PRIMARY KEY AUTOINCREMENT,
        type_name TEXT NOT NULL UNIQUE
    );
    CREATE TABLE IF NOT EXISTS place_types (
        place_id TEXT NOT NULL REFERENCES places (place_id),
        type_id INTEGER NOT NULL REFERENCES types (type_id),
        PRIMARY KEY (place_id, type_id)
    );
    CREATE TABLE IF NOT EXISTS search_grid (
        location TEXT PRIMARY KEY,
        status TEXT NOT NULL DEFAULT 'pending' CHECK (status IN ('pending', 'completed'))
    );
";

pub fn open(path: &Path) -> Result<Connection> {
    setup(Connection::open(path)?)
}

pub fn open_in_memory() -> Result<Connection> {
    setup(Connection::open_in_memory()?)
}

fn setup(conn: Connection) -> Result<Connection> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.execute_batch(SCHEMA)?;
    Ok(conn)
}

pub fn parse_status(location: &str, value: String) -> Result<SearchStatus> {
    value.parse().map_err(|_| StoreError::InvalidStatus {
        location: location.to_string(),
        value,
    })
}

#[derive(Debug, Default, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub places: u64,
    pub types: u64,
    pub associations: u64,
    pub pending: u64,
    pub completed: u64,
}

pub fn summary(conn: &Connection) -> Result<Summary> {
    let count = |sql: &str| conn.query_row(sql, [], |row| row.get::<_, u64>(0));
    Ok(Summary {
        places: count("SELECT COUNT(*) FROM places")?,
        types: count("SELECT COUNT(*) FROM types")?,
        associations: count("SELECT COUNT(*) FROM place_types")?,
        pending: count("SELECT COUNT(*) FROM search_grid WHERE status = 'pending'")?,
        completed: count("SELECT COUNT(*) FROM search_grid WHERE status = 'completed'")?,
    })
}
