//! SQLite result store implementation.

use chrono::{DateTime, NaiveDateTime, Utc};
use rusqlite::{params, Connection, Result as SqlResult};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;

use super::models::*;

/// Database error types.
#[derive(Error, Debug)]
pub enum DbError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("Migration error: {0}")]
    Migration(String),
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Append-only persistence of check results, one series per target key.
pub trait ResultStore: Send + Sync {
    /// Append one outcome, creating the target's series on first use.
    fn append(&self, outcome: &ProbeOutcome) -> Result<(), DbError>;

    /// All outcomes recorded for `key`, newest first.
    fn query(&self, key: &str) -> Result<Vec<ProbeOutcome>, DbError>;

    /// Keys of every series that has been written.
    fn series_keys(&self) -> Result<Vec<String>, DbError>;

    /// Full snapshot across every series.
    ///
    /// Series are queried one by one. A series that fails to load is left
    /// out of `records` and reported in `Snapshot::omitted`.
    fn query_all(&self) -> Result<Snapshot, DbError> {
        let mut snapshot = Snapshot::default();

        for key in self.series_keys()? {
            match self.query(&key) {
                Ok(history) => snapshot.records.extend(history),
                Err(e) => {
                    tracing::error!("Store: Omitting series {} from snapshot: {}", key, e);
                    snapshot.omitted.push(key);
                }
            }
        }

        Ok(snapshot)
    }
}

/// Thread-safe SQLite store.
#[derive(Clone)]
pub struct Store {
    conn: Arc<Mutex<Connection>>,
}

impl Store {
    /// Create a new store with the given database path.
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, DbError> {
        let conn = Connection::open(path)?;
        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        store.init()?;
        Ok(store)
    }

    /// Initialize the schema.
    fn init(&self) -> Result<(), DbError> {
        let conn = self.conn()?;
        conn.execute_batch(include_str!("../../migrations/000001_init.up.sql"))
            .map_err(|e| DbError::Migration(format!("Migration 1 failed: {}", e)))?;
        Ok(())
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, DbError> {
        self.conn
            .lock()
            .map_err(|_| DbError::Unavailable("connection lock poisoned".into()))
    }
}

impl ResultStore for Store {
    fn append(&self, outcome: &ProbeOutcome) -> Result<(), DbError> {
        let conn = self.conn()?;
        let tx = conn.unchecked_transaction()?;

        tx.execute(
            "INSERT OR IGNORE INTO series (key) VALUES (?1)",
            params![outcome.key],
        )?;
        tx.execute(
            "INSERT INTO outcomes (key, created_at, result) VALUES (?1, ?2, ?3)",
            params![
                outcome.key,
                outcome.timestamp.format(MINUTE_FORMAT).to_string(),
                outcome.outcome.as_str(),
            ],
        )?;

        tx.commit()?;
        Ok(())
    }

    fn query(&self, key: &str) -> Result<Vec<ProbeOutcome>, DbError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT key, created_at, result FROM outcomes
             WHERE key = ?1 ORDER BY created_at DESC, id DESC",
        )?;

        let results = stmt
            .query_map(params![key], |row| {
                let key: String = row.get(0)?;
                let time_str: String = row.get(1)?;
                let result: String = row.get(2)?;
                Ok((key, time_str, result))
            })?
            .collect::<SqlResult<Vec<_>>>()?;

        Ok(results
            .into_iter()
            .filter_map(|(key, time_str, result)| match parse_db_time(&time_str) {
                Some(timestamp) => Some(ProbeOutcome {
                    key,
                    timestamp,
                    outcome: Outcome::from_db(&result),
                }),
                None => {
                    tracing::warn!("Store: Skipping row with bad timestamp {:?} for {}", time_str, key);
                    None
                }
            })
            .collect())
    }

    fn series_keys(&self) -> Result<Vec<String>, DbError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare("SELECT key FROM series ORDER BY key ASC")?;
        let keys = stmt
            .query_map([], |row| row.get(0))?
            .collect::<SqlResult<Vec<String>>>()?;
        Ok(keys)
    }
}

/// Parse a datetime string from the database.
fn parse_db_time(s: &str) -> Option<DateTime<Utc>> {
    let formats = [MINUTE_FORMAT, "%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%SZ"];

    for fmt in &formats {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt.and_utc());
        }
    }

    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}
