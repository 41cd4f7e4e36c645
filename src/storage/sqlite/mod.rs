//! Shared `SQLite` infrastructure.
//!
//! Connection configuration lives here so that the persistence backend and
//! any tooling that opens the same file apply identical pragmas.

mod connection;

pub use connection::{BUSY_TIMEOUT_MS, configure_connection, open_connection};
