//! Connection bootstrap utilities for project databases.
//!
//! # Responsibility
//! - Open file or in-memory SQLite connections.
//! - Restore a project file into an in-memory working connection and write
//!   it back on save.
//! - Trigger schema migrations before returning a usable connection.
//!
//! # Invariants
//! - Returned connections have `foreign_keys=ON`.
//! - Returned connections have migrations fully applied.

use super::migrations::apply_migrations;
use super::DbResult;
use log::{error, info};
use rusqlite::backup::Progress;
use rusqlite::{Connection, DatabaseName};
use std::path::Path;
use std::time::{Duration, Instant};

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Opens a SQLite database file in place and applies all pending migrations.
///
/// # Side effects
/// - Migrations are written to the file itself.
/// - Emits `db_open` logging events with duration and status.
pub fn open_db(path: impl AsRef<Path>) -> DbResult<Connection> {
    let path = path.as_ref();
    timed_open("file", || Connection::open(path))
}

/// Opens an empty in-memory database and applies all pending migrations.
pub fn open_db_in_memory() -> DbResult<Connection> {
    timed_open("memory", Connection::open_in_memory)
}

/// Restores the project file at `path` into a fresh in-memory connection.
///
/// The file is left untouched: migrations run against the working copy and
/// only reach the disk through [`save_db_to_file`].
pub fn load_db_into_memory(path: impl AsRef<Path>) -> DbResult<Connection> {
    let path = path.as_ref();
    timed_open("restore", || {
        let mut conn = Connection::open_in_memory()?;
        conn.restore(DatabaseName::Main, path, None::<fn(Progress)>)?;
        Ok(conn)
    })
}

/// Writes the whole working connection to `path` using the online backup API.
pub fn save_db_to_file(conn: &Connection, path: impl AsRef<Path>) -> DbResult<()> {
    let started_at = Instant::now();
    match conn.backup(DatabaseName::Main, path.as_ref(), None) {
        Ok(()) => {
            info!(
                "event=db_save module=db status=ok duration_ms={}",
                started_at.elapsed().as_millis()
            );
            Ok(())
        }
        Err(err) => {
            error!(
                "event=db_save module=db status=error duration_ms={} error_code=db_backup_failed error={}",
                started_at.elapsed().as_millis(),
                err
            );
            Err(err.into())
        }
    }
}

fn timed_open(
    mode: &'static str,
    opener: impl FnOnce() -> rusqlite::Result<Connection>,
) -> DbResult<Connection> {
    let started_at = Instant::now();
    info!("event=db_open module=db status=start mode={mode}");

    let mut conn = opener().map_err(|err| {
        error!(
            "event=db_open module=db status=error mode={mode} duration_ms={} error_code=db_open_failed error={}",
            started_at.elapsed().as_millis(),
            err
        );
        err
    })?;

    if let Err(err) = bootstrap_connection(&mut conn) {
        error!(
            "event=db_open module=db status=error mode={mode} duration_ms={} error_code=db_bootstrap_failed error={}",
            started_at.elapsed().as_millis(),
            err
        );
        return Err(err);
    }

    info!(
        "event=db_open module=db status=ok mode={mode} duration_ms={}",
        started_at.elapsed().as_millis()
    );
    Ok(conn)
}

fn bootstrap_connection(conn: &mut Connection) -> DbResult<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(BUSY_TIMEOUT)?;
    apply_migrations(conn)?;
    Ok(())
}
