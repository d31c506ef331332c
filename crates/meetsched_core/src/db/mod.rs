//! SQLite storage bootstrap, schema migrations and connection pooling.
//!
//! # Responsibility
//! - Open and configure SQLite connections for the meeting store.
//! - Apply schema migrations in deterministic order.
//! - Share a bounded set of connections across concurrent requests.
//!
//! # Invariants
//! - Migration version is tracked via `PRAGMA user_version`.
//! - No meeting data is read or written before migrations succeed.
//! - Every wait on storage is bounded by the configured store timeout.

use rusqlite::ErrorCode;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Duration;

pub mod migrations;
mod open;
mod pool;

pub use open::{open_db, open_db_in_memory, DEFAULT_BUSY_TIMEOUT};
pub use pool::{DbPool, PoolOptions, PooledConnection};

pub type DbResult<T> = Result<T, DbError>;

#[derive(Debug)]
pub enum DbError {
    Sqlite(rusqlite::Error),
    UnsupportedSchemaVersion {
        db_version: u32,
        latest_supported: u32,
    },
    /// No pooled connection became free within the store timeout.
    PoolTimeout { waited: Duration },
    /// The pool has been shut down.
    PoolClosed,
}

impl DbError {
    /// Returns whether the failure is a bounded wait that expired.
    ///
    /// Covers both pool checkout and SQLite lock waits (`busy_timeout`).
    pub fn is_timeout(&self) -> bool {
        match self {
            Self::PoolTimeout { .. } => true,
            Self::Sqlite(rusqlite::Error::SqliteFailure(err, _)) => matches!(
                err.code,
                ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked
            ),
            _ => false,
        }
    }
}

impl Display for DbError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite(err) => write!(f, "{err}"),
            Self::UnsupportedSchemaVersion {
                db_version,
                latest_supported,
            } => write!(
                f,
                "database schema version {db_version} is newer than supported {latest_supported}"
            ),
            Self::PoolTimeout { waited } => write!(
                f,
                "timed out after {}ms waiting for a database connection",
                waited.as_millis()
            ),
            Self::PoolClosed => write!(f, "database pool is shut down"),
        }
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sqlite(err) => Some(err),
            _ => None,
        }
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}
