//! Fixed-size SQLite connection pool.
//!
//! # Responsibility
//! - Open every connection once at startup and hand them out per request.
//! - Bound checkout waits by the store timeout.
//! - Drain outstanding connections on shutdown.
//!
//! # Invariants
//! - `idle.len() + checked_out == size` until shutdown starts.
//! - No connection is handed out after `shutdown` has been called.

use super::open::{open_db, open_db_in_memory};
use super::{DbError, DbResult};
use log::{info, warn};
use rusqlite::Connection;
use std::ops::{Deref, DerefMut};
use std::path::Path;
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

/// Pool sizing and wait bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolOptions {
    /// Number of connections opened up front. Values below 1 are raised to 1.
    pub size: usize,
    /// Upper bound for checkout waits and for SQLite lock waits.
    pub store_timeout: Duration,
}

impl Default for PoolOptions {
    fn default() -> Self {
        Self {
            size: 4,
            store_timeout: super::DEFAULT_BUSY_TIMEOUT,
        }
    }
}

struct PoolState {
    idle: Vec<Connection>,
    checked_out: usize,
    closed: bool,
}

/// Process-wide pool shared by the store and every request.
pub struct DbPool {
    state: Mutex<PoolState>,
    returned: Condvar,
    size: usize,
    store_timeout: Duration,
}

impl DbPool {
    /// Opens `options.size` connections to one database file.
    ///
    /// # Errors
    /// - Any connection bootstrap or migration failure.
    pub fn open(path: impl AsRef<Path>, options: PoolOptions) -> DbResult<Self> {
        let size = options.size.max(1);
        let mut connections = Vec::with_capacity(size);
        for _ in 0..size {
            connections.push(open_db(path.as_ref(), options.store_timeout)?);
        }
        info!("event=pool_open module=db status=ok mode=file size={size}");
        Ok(Self::from_connections(connections, options.store_timeout))
    }

    /// Opens a single-connection pool over a private in-memory database.
    ///
    /// In-memory databases are per connection, so the pool size is always 1.
    pub fn open_in_memory(store_timeout: Duration) -> DbResult<Self> {
        let conn = open_db_in_memory()?;
        conn.busy_timeout(store_timeout)?;
        info!("event=pool_open module=db status=ok mode=memory size=1");
        Ok(Self::from_connections(vec![conn], store_timeout))
    }

    fn from_connections(connections: Vec<Connection>, store_timeout: Duration) -> Self {
        Self {
            size: connections.len(),
            state: Mutex::new(PoolState {
                idle: connections,
                checked_out: 0,
                closed: false,
            }),
            returned: Condvar::new(),
            store_timeout,
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn store_timeout(&self) -> Duration {
        self.store_timeout
    }

    /// Number of connections currently waiting in the pool.
    pub fn idle_count(&self) -> usize {
        self.lock_state().idle.len()
    }

    /// Checks out one connection, waiting at most the store timeout.
    ///
    /// # Errors
    /// - `DbError::PoolTimeout` when every connection stays busy.
    /// - `DbError::PoolClosed` after `shutdown`.
    pub fn acquire(&self) -> DbResult<PooledConnection<'_>> {
        let deadline = Instant::now() + self.store_timeout;
        let mut state = self.lock_state();
        loop {
            if state.closed {
                return Err(DbError::PoolClosed);
            }
            if let Some(conn) = state.idle.pop() {
                state.checked_out += 1;
                return Ok(PooledConnection {
                    pool: self,
                    conn: Some(conn),
                });
            }

            let now = Instant::now();
            if now >= deadline {
                warn!(
                    "event=pool_acquire module=db status=error error_code=pool_timeout timeout_ms={} size={}",
                    self.store_timeout.as_millis(),
                    self.size
                );
                return Err(DbError::PoolTimeout {
                    waited: self.store_timeout,
                });
            }
            state = self
                .returned
                .wait_timeout(state, deadline - now)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }
    }

    /// Stops checkouts, waits up to `grace` for outstanding connections, and
    /// closes every connection the pool still holds.
    ///
    /// Calling this more than once is harmless.
    ///
    /// # Errors
    /// - `DbError::PoolTimeout` when connections are still checked out after
    ///   `grace`; those connections are closed when their holders drop them.
    pub fn shutdown(&self, grace: Duration) -> DbResult<()> {
        let deadline = Instant::now() + grace;
        let mut state = self.lock_state();
        state.closed = true;
        self.returned.notify_all();

        while state.checked_out > 0 {
            let now = Instant::now();
            if now >= deadline {
                let outstanding = state.checked_out;
                state.idle.clear();
                warn!(
                    "event=pool_shutdown module=db status=error error_code=drain_timeout outstanding={outstanding}"
                );
                return Err(DbError::PoolTimeout { waited: grace });
            }
            state = self
                .returned
                .wait_timeout(state, deadline - now)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }

        let closed = state.idle.len();
        state.idle.clear();
        info!("event=pool_shutdown module=db status=ok closed={closed}");
        Ok(())
    }

    fn release(&self, conn: Connection) {
        let mut state = self.lock_state();
        state.checked_out = state.checked_out.saturating_sub(1);
        let discarded = if state.closed {
            Some(conn)
        } else {
            state.idle.push(conn);
            None
        };
        drop(state);
        self.returned.notify_all();
        drop(discarded);
    }

    fn lock_state(&self) -> MutexGuard<'_, PoolState> {
        // Pool bookkeeping stays consistent even if a holder panicked.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Connection checked out of a `DbPool`; returned to the pool on drop.
pub struct PooledConnection<'pool> {
    pool: &'pool DbPool,
    conn: Option<Connection>,
}

impl Deref for PooledConnection<'_> {
    type Target = Connection;

    fn deref(&self) -> &Self::Target {
        match self.conn.as_ref() {
            Some(conn) => conn,
            None => unreachable!("pooled connection is present until drop"),
        }
    }
}

impl DerefMut for PooledConnection<'_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        match self.conn.as_mut() {
            Some(conn) => conn,
            None => unreachable!("pooled connection is present until drop"),
        }
    }
}

impl Drop for PooledConnection<'_> {
    fn drop(&mut self) {
        if let Some(conn) = self.conn.take() {
            self.pool.release(conn);
        }
    }
}
