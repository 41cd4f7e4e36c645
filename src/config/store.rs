//! Storage configuration.

use crate::{Error, Result};
use secrecy::SecretString;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Which [`ItemStore`](crate::storage::ItemStore) implementation to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StoreBackend {
    /// [`MapStore`](crate::storage::MapStore), volatile.
    #[default]
    Memory,
    /// [`SqliteStore`](crate::storage::SqliteStore).
    Sqlite,
    /// [`PostgresStore`](crate::storage::PostgresStore).
    Postgres,
}

impl StoreBackend {
    /// Returns the canonical name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Memory => "memory",
            Self::Sqlite => "sqlite",
            Self::Postgres => "postgres",
        }
    }
}

impl fmt::Display for StoreBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StoreBackend {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "memory" | "map" => Ok(Self::Memory),
            "sqlite" => Ok(Self::Sqlite),
            "postgres" | "postgresql" => Ok(Self::Postgres),
            other => Err(Error::InvalidConfig(format!(
                "unknown store backend '{other}': expected memory, sqlite or postgres"
            ))),
        }
    }
}

/// Relational database settings, shared by the `SQLite` (table only) and
/// PostgreSQL backends.
///
/// `Debug` output redacts the password.
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// Database user.
    pub user: String,
    /// Database password.
    pub password: SecretString,
    /// Database host.
    pub host: String,
    /// Database port.
    pub port: u16,
    /// Database name.
    pub name: String,
    /// Table holding the items.
    pub table: String,
    /// Maximum pooled connections.
    pub pool_max_size: usize,
}

impl DatabaseConfig {
    /// Default database user.
    pub const DEFAULT_USER: &'static str = "postgres";
    /// Default database host.
    pub const DEFAULT_HOST: &'static str = "localhost";
    /// Default database port.
    pub const DEFAULT_PORT: u16 = 5432;
    /// Default database name.
    pub const DEFAULT_NAME: &'static str = "todo";
    /// Default item table.
    pub const DEFAULT_TABLE: &'static str = "todo_items";
    /// Default pool size.
    pub const DEFAULT_POOL_MAX_SIZE: usize = 16;
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            user: Self::DEFAULT_USER.to_string(),
            password: SecretString::from(String::new()),
            host: Self::DEFAULT_HOST.to_string(),
            port: Self::DEFAULT_PORT,
            name: Self::DEFAULT_NAME.to_string(),
            table: Self::DEFAULT_TABLE.to_string(),
            pool_max_size: Self::DEFAULT_POOL_MAX_SIZE,
        }
    }
}

/// Backend selection plus per-backend settings.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Selected backend.
    pub backend: StoreBackend,
    /// `SQLite` database file; `:memory:` for a private in-memory database.
    pub sqlite_path: PathBuf,
    /// Relational settings.
    pub database: DatabaseConfig,
}

impl StoreConfig {
    /// Default `SQLite` file.
    pub const DEFAULT_SQLITE_PATH: &'static str = "todo.sqlite3";
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::default(),
            sqlite_path: PathBuf::from(Self::DEFAULT_SQLITE_PATH),
            database: DatabaseConfig::default(),
        }
    }
}
