//! Read and write scopes over the meeting repository.
//!
//! # Responsibility
//! - Hand a repository to callers for the duration of one unit of work.
//! - Make check-then-insert sequences atomic across connections and
//!   processes sharing the database.
//!
//! # Invariants
//! - `write` holds the SQLite write lock (`BEGIN IMMEDIATE`) for the whole
//!   closure, so no other writer can interleave between a conflict query
//!   and the insert that depends on it.
//! - `write` commits only when the closure succeeds.
//! - Every scope waits on storage for at most the pool's store timeout.

use crate::db::DbPool;
use crate::repo::meeting_repo::{MeetingRepository, RepoError, SqliteMeetingRepository};
use log::{debug, warn};
use rusqlite::TransactionBehavior;
use std::sync::Arc;

/// Unit-of-work boundary for meeting repository access.
pub trait MeetingStore {
    /// Runs `f` against a repository without taking the write lock.
    fn read<T, E, F>(&self, f: F) -> Result<T, E>
    where
        E: From<RepoError>,
        F: FnOnce(&dyn MeetingRepository) -> Result<T, E>;

    /// Runs `f` inside an exclusive write transaction.
    ///
    /// Changes made through the repository are committed when `f` returns
    /// `Ok` and rolled back when it returns `Err`.
    fn write<T, E, F>(&self, f: F) -> Result<T, E>
    where
        E: From<RepoError>,
        F: FnOnce(&dyn MeetingRepository) -> Result<T, E>;
}

/// Meeting store backed by the shared SQLite connection pool.
#[derive(Clone)]
pub struct SqliteMeetingStore {
    pool: Arc<DbPool>,
}

impl SqliteMeetingStore {
    pub fn new(pool: Arc<DbPool>) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &Arc<DbPool> {
        &self.pool
    }
}

impl MeetingStore for SqliteMeetingStore {
    fn read<T, E, F>(&self, f: F) -> Result<T, E>
    where
        E: From<RepoError>,
        F: FnOnce(&dyn MeetingRepository) -> Result<T, E>,
    {
        let conn = self.pool.acquire().map_err(RepoError::from)?;
        f(&SqliteMeetingRepository::new(&conn))
    }

    fn write<T, E, F>(&self, f: F) -> Result<T, E>
    where
        E: From<RepoError>,
        F: FnOnce(&dyn MeetingRepository) -> Result<T, E>,
    {
        let mut conn = self.pool.acquire().map_err(RepoError::from)?;
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(RepoError::from)?;

        let outcome = f(&SqliteMeetingRepository::new(&tx));
        match outcome {
            Ok(value) => {
                tx.commit().map_err(RepoError::from)?;
                Ok(value)
            }
            Err(err) => {
                match tx.rollback() {
                    Ok(()) => debug!("event=store_write module=repo status=rolled_back"),
                    Err(rollback_err) => warn!(
                        "event=store_write module=repo status=error error_code=rollback_failed error={rollback_err}"
                    ),
                }
                Err(err)
            }
        }
    }
}
