//! SQLite-backed local implementation of the clinic data API.
//!
//! Serves the same filtering, search, ordering and paging rules as the clinic server, so the
//! desk can run offline and tests can exercise it end to end. It also carries the mutations
//! other clinic workflows perform (issuing invoices, moving visits along), which the desk
//! itself never calls.

mod api;
mod billing;
mod patients;
mod schema;
mod staff;
mod visits;

pub use schema::SCHEMA;

use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::Connection;
use thiserror::Error;

use crate::api::ApiError;
use crate::clock::{Clock, SystemClock};

/// Local store errors.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Record not found: {0}")]
    NotFound(String),

    #[error("Invalid record: {0}")]
    Invalid(String),

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(what) => ApiError::NotFound(what),
            StoreError::Invalid(why) => ApiError::Rejected(why),
            StoreError::Sqlite(rusqlite::Error::SqliteFailure(e, msg))
                if e.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                ApiError::Rejected(msg.unwrap_or_else(|| e.to_string()))
            }
            other => ApiError::Store(other.to_string()),
        }
    }
}

/// Local clinic database.
pub struct LocalStore {
    conn: Mutex<Connection>,
    clock: Arc<dyn Clock>,
}

impl LocalStore {
    /// Open store at path, creating if needed.
    pub fn open<P: AsRef<Path>>(path: P) -> StoreResult<Self> {
        Self::with_connection(Connection::open(path)?, Arc::new(SystemClock))
    }

    /// Create in-memory store (for testing).
    pub fn open_in_memory() -> StoreResult<Self> {
        Self::with_connection(Connection::open_in_memory()?, Arc::new(SystemClock))
    }

    /// In-memory store stamping records with `clock`.
    pub fn in_memory_with_clock(clock: Arc<dyn Clock>) -> StoreResult<Self> {
        Self::with_connection(Connection::open_in_memory()?, clock)
    }

    fn with_connection(conn: Connection, clock: Arc<dyn Clock>) -> StoreResult<Self> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
            clock,
        })
    }

    fn conn(&self) -> StoreResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| StoreError::Unavailable("connection lock poisoned".into()))
    }

    fn timestamp(&self) -> (DateTime<Utc>, String) {
        let now = self.clock.now();
        (now, now.to_rfc3339_opts(SecondsFormat::Micros, true))
    }
}

impl std::fmt::Debug for LocalStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalStore").finish_non_exhaustive()
    }
}

/// Parse a stored timestamp column.
fn parse_timestamp(idx: usize, raw: String) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(&raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
        })
}

/// Parse a stored decimal column.
fn parse_decimal(idx: usize, raw: String) -> rusqlite::Result<rust_decimal::Decimal> {
    raw.parse().map_err(|e: rust_decimal::Error| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}

/// Escape `%`, `_` and `\` for a LIKE pattern using `ESCAPE '\'`.
fn like_pattern(term: &str) -> String {
    let mut pattern = String::with_capacity(term.len() + 2);
    pattern.push('%');
    for ch in term.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(ch);
    }
    pattern.push('%');
    pattern
}
