//! Storage layer abstraction.
//!
//! One trait, [`ItemStore`], with interchangeable backends:
//! - **Volatile**: [`MapStore`], an ordered map owned by the process
//! - **Durable**: [`SqliteStore`] (`SQLite` file) and [`PostgresStore`]
//!   (PostgreSQL pool, `postgres` feature)
//!
//! The backend is chosen once at startup by
//! [`BackendFactory`](crate::services::BackendFactory).

// Allow significant_drop_tightening - dropping database connections slightly early
// provides no meaningful benefit.
#![allow(clippy::significant_drop_tightening)]

mod lock;
mod metrics;
pub mod persistence;
mod row;
pub mod sqlite;
pub mod traits;

pub use lock::acquire_lock;
pub use metrics::{record_operation_metrics, timed};
pub use persistence::{MapStore, PostgresStore, SqliteStore};
pub use row::ItemRow;
pub use traits::ItemStore;

use crate::{Error, Result};

/// Longest identifier PostgreSQL accepts without truncation.
const MAX_TABLE_NAME_LEN: usize = 63;

/// Checks that `name` can be spliced into SQL as a table identifier.
///
/// Table names come from configuration and cannot be bound as statement
/// parameters, so only `[A-Za-z_][A-Za-z0-9_]*` is accepted.
///
/// # Errors
///
/// Returns [`Error::InvalidConfig`] for anything else.
pub fn validate_table_name(name: &str) -> Result<()> {
    let mut chars = name.chars();
    let valid_start = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_');
    let valid_rest = chars.all(|c| c.is_ascii_alphanumeric() || c == '_');

    if valid_start && valid_rest && name.len() <= MAX_TABLE_NAME_LEN {
        Ok(())
    } else {
        Err(Error::InvalidConfig(format!(
            "table name '{name}' must match [A-Za-z_][A-Za-z0-9_]* and be at most {MAX_TABLE_NAME_LEN} characters"
        )))
    }
}
