//! Connection bootstrap utilities for SQLite.
//!
//! # Responsibility
//! - Open file or in-memory SQLite connections.
//! - Configure pragmas and lock-wait bounds required by the store.
//! - Trigger schema migrations before returning a usable connection.
//!
//! # Invariants
//! - Returned connections have `foreign_keys=ON`.
//! - Returned connections never wait on a lock longer than their busy timeout.
//! - Returned connections have migrations fully applied.

use super::migrations::apply_migrations;
use super::DbResult;
use log::{error, info};
use rusqlite::Connection;
use std::path::Path;
use std::time::{Duration, Instant};

/// Lock-wait bound used when the caller does not configure one.
pub const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(10);

/// Opens a SQLite database file and applies all pending migrations.
///
/// File databases run in WAL mode so readers do not block the writer.
///
/// # Side effects
/// - Emits `db_open` logging events with duration and status.
pub fn open_db(path: impl AsRef<Path>, busy_timeout: Duration) -> DbResult<Connection> {
    let path = path.as_ref();
    bootstrap("file", busy_timeout, || Connection::open(path))
}

/// Opens a private in-memory database and applies all pending migrations.
///
/// # Side effects
/// - Emits `db_open` logging events with duration and status.
pub fn open_db_in_memory() -> DbResult<Connection> {
    bootstrap("memory", DEFAULT_BUSY_TIMEOUT, Connection::open_in_memory)
}

fn bootstrap(
    mode: &'static str,
    busy_timeout: Duration,
    open: impl FnOnce() -> rusqlite::Result<Connection>,
) -> DbResult<Connection> {
    let started_at = Instant::now();
    info!("event=db_open module=db status=start mode={mode}");

    let mut conn = open().map_err(|err| {
        error!(
            "event=db_open module=db status=error mode={mode} duration_ms={} error_code=db_open_failed error={err}",
            started_at.elapsed().as_millis()
        );
        err
    })?;

    if let Err(err) = configure(&mut conn, mode, busy_timeout) {
        error!(
            "event=db_open module=db status=error mode={mode} duration_ms={} error_code=db_bootstrap_failed error={err}",
            started_at.elapsed().as_millis()
        );
        return Err(err);
    }

    info!(
        "event=db_open module=db status=ok mode={mode} duration_ms={}",
        started_at.elapsed().as_millis()
    );
    Ok(conn)
}

fn configure(conn: &mut Connection, mode: &str, busy_timeout: Duration) -> DbResult<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(busy_timeout)?;
    if mode == "file" {
        // journal_mode returns the resulting mode as a row.
        conn.query_row("PRAGMA journal_mode = WAL;", [], |row| row.get::<_, String>(0))?;
    }
    apply_migrations(conn)?;
    Ok(())
}
