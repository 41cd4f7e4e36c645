//! Connection opening and configuration for `SQLite`.

use crate::{Error, Result};
use rusqlite::Connection;
use std::path::Path;

/// How long a statement waits on a locked database before failing.
pub const BUSY_TIMEOUT_MS: u32 = 5000;

/// Opens a connection to `path`, or an in-memory database when `path` is
/// `None` or `":memory:"`, and applies [`configure_connection`].
///
/// # Errors
///
/// Returns [`Error::Persistence`] if the file cannot be opened.
pub fn open_connection(path: Option<&Path>) -> Result<Connection> {
    let conn = match path {
        Some(p) if p != Path::new(":memory:") => Connection::open(p)
            .map_err(|e| Error::persistence("open_sqlite", format!("{}: {e}", p.display())))?,
        _ => Connection::open_in_memory()
            .map_err(|e| Error::persistence("open_sqlite_in_memory", e))?,
    };

    configure_connection(&conn)?;
    Ok(conn)
}

/// Configures a `SQLite` connection for concurrent use.
///
/// # Configuration Applied
///
/// - **WAL mode**: concurrent readers with a single writer
/// - **NORMAL synchronous**: durable at checkpoints, fast commits
/// - **`busy_timeout`**: waits [`BUSY_TIMEOUT_MS`] on lock contention instead
///   of failing with `SQLITE_BUSY`
///
/// In-memory databases ignore WAL and keep their `memory` journal.
///
/// # Errors
///
/// Returns [`Error::Persistence`] if the busy timeout cannot be set.
pub fn configure_connection(conn: &Connection) -> Result<()> {
    // journal_mode answers with a row, and in-memory databases refuse WAL,
    // so the result is not checked.
    let _ = conn.pragma_update(None, "journal_mode", "WAL");
    let _ = conn.pragma_update(None, "synchronous", "NORMAL");
    conn.pragma_update(None, "busy_timeout", BUSY_TIMEOUT_MS)
        .map_err(|e| Error::persistence("configure_sqlite", e))?;

    Ok(())
}
