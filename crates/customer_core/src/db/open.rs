//! Connection bootstrap utilities for SQLite.
//!
//! # Responsibility
//! - Open file, URI or in-memory SQLite connections.
//! - Configure connection pragmas required by repository behavior.
//!
//! # Invariants
//! - Files are opened read-write without create: a missing database is an
//!   unreachable database.
//! - Returned connections have `foreign_keys=ON` and a bounded busy timeout.
//! - Returned connections have answered one read (header probe).

use super::conn_str::{ConnectionString, OpenTarget};
use super::DbResult;
use log::{error, info};
use rusqlite::{Connection, OpenFlags};
use std::time::{Duration, Instant};

/// Busy wait applied when callers do not configure one.
pub const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Longest busy wait SQLite accepts (`i32::MAX` milliseconds).
pub const MAX_BUSY_TIMEOUT: Duration = Duration::from_millis(i32::MAX as u64);

/// Caps `timeout` at what `sqlite3_busy_timeout` can represent.
pub fn clamp_busy_timeout(timeout: Duration) -> Duration {
    timeout.min(MAX_BUSY_TIMEOUT)
}

/// Opens the database described by `conn_str`.
///
/// # Side effects
/// - Emits `db_open` logging events with duration and status.
pub fn open_db(conn_str: &ConnectionString, busy_timeout: Duration) -> DbResult<Connection> {
    let started_at = Instant::now();
    let mode = conn_str.mode();
    info!("event=db_open module=db status=start mode={mode}");

    let opened = match conn_str.target() {
        OpenTarget::Memory => Connection::open_in_memory(),
        OpenTarget::Path(path) => Connection::open_with_flags(path, open_flags()),
        OpenTarget::Uri(uri) => Connection::open_with_flags(uri, open_flags()),
    };

    let conn = match opened {
        Ok(conn) => conn,
        Err(err) => {
            error!(
                "event=db_open module=db status=error mode={} duration_ms={} error_code=db_open_failed error={}",
                mode,
                started_at.elapsed().as_millis(),
                err
            );
            return Err(err.into());
        }
    };

    match bootstrap_connection(&conn, busy_timeout) {
        Ok(()) => {
            info!(
                "event=db_open module=db status=ok mode={} duration_ms={}",
                mode,
                started_at.elapsed().as_millis()
            );
            Ok(conn)
        }
        Err(err) => {
            error!(
                "event=db_open module=db status=error mode={} duration_ms={} error_code=db_bootstrap_failed error={}",
                mode,
                started_at.elapsed().as_millis(),
                err
            );
            Err(err)
        }
    }
}

fn open_flags() -> OpenFlags {
    OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_URI | OpenFlags::SQLITE_OPEN_NO_MUTEX
}

fn bootstrap_connection(conn: &Connection, busy_timeout: Duration) -> DbResult<()> {
    conn.busy_timeout(clamp_busy_timeout(busy_timeout))?;
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    // Forces a header read so "not a database" fails here, not on first query.
    conn.query_row("PRAGMA schema_version;", [], |row| row.get::<_, i64>(0))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{clamp_busy_timeout, MAX_BUSY_TIMEOUT};
    use std::time::Duration;

    #[test]
    fn clamp_busy_timeout_caps_oversized_waits() {
        let thirty_days = Duration::from_secs(30 * 24 * 60 * 60);
        assert_eq!(clamp_busy_timeout(thirty_days), MAX_BUSY_TIMEOUT);
        assert_eq!(
            clamp_busy_timeout(Duration::from_secs(5)),
            Duration::from_secs(5)
        );
    }
}
