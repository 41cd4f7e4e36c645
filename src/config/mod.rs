//! Configuration management.
//!
//! Settings come from the process environment, optionally seeded from a
//! `.env` file by the binary. Parsing goes through a lookup function so the
//! same code reads `std::env` in production and a map in tests.
//!
//! | Variable | Default |
//! |----------|---------|
//! | `API_SERVER_HOST` | `localhost` |
//! | `API_SERVER_PORT` | `8080` |
//! | `TODO_SHUTDOWN_TIMEOUT_SECS` | `5` |
//! | `TODO_STORE_BACKEND` | `memory` |
//! | `TODO_SQLITE_PATH` | `todo.sqlite3` |
//! | `DB_USER` / `DB_PASS` / `DB_HOST` / `DB_PORT` / `DB_NAME` | `postgres` / empty / `localhost` / `5432` / `todo` |
//! | `DB_TABLE` | `todo_items` |
//! | `DB_POOL_MAX_SIZE` | `16` |
//! | `TODO_LOG_FORMAT` | `pretty` |
//! | `RUST_LOG` | unset |
//! | `TODO_METRICS_ENABLED` / `TODO_METRICS_PORT` | `false` / `9090` |

mod store;

pub use store::{DatabaseConfig, StoreBackend, StoreConfig};

use crate::observability::{LogFormat, LoggingConfig, MetricsConfig};
use crate::{Error, Result};
use secrecy::ExposeSecret;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// HTTP listener settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Bind host name or address.
    pub host: String,
    /// Bind port.
    pub port: u16,
    /// How long shutdown waits for in-flight requests.
    pub shutdown_timeout: Duration,
}

impl ServerConfig {
    /// Default bind host.
    pub const DEFAULT_HOST: &'static str = "localhost";
    /// Default bind port.
    pub const DEFAULT_PORT: u16 = 8080;
    /// Default graceful-shutdown deadline.
    pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

    /// Returns `host:port`.
    #[must_use]
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: Self::DEFAULT_HOST.to_string(),
            port: Self::DEFAULT_PORT,
            shutdown_timeout: Self::DEFAULT_SHUTDOWN_TIMEOUT,
        }
    }
}

/// Main configuration for todo-app.
#[derive(Debug, Clone, Default)]
pub struct TodoConfig {
    /// HTTP listener.
    pub server: ServerConfig,
    /// Storage backend selection and settings.
    pub store: StoreConfig,
    /// Log output.
    pub logging: LoggingConfig,
    /// Prometheus exporter.
    pub metrics: MetricsConfig,
}

impl TodoConfig {
    /// Reads the configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] if a variable is set to a value that
    /// cannot be parsed.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads the configuration through `lookup`.
    ///
    /// Unset and empty variables take their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] if a variable is set to a value that
    /// cannot be parsed.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use std::collections::HashMap;
    /// use todo_app::{StoreBackend, TodoConfig};
    ///
    /// let env = HashMap::from([("TODO_STORE_BACKEND", "sqlite"), ("API_SERVER_PORT", "3000")]);
    /// let config = TodoConfig::from_lookup(|k| env.get(k).map(ToString::to_string))?;
    /// assert_eq!(config.store.backend, StoreBackend::Sqlite);
    /// assert_eq!(config.server.port, 3000);
    /// # Ok::<(), todo_app::Error>(())
    /// ```
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = Env(lookup);

        let server = ServerConfig {
            host: env.string("API_SERVER_HOST", ServerConfig::DEFAULT_HOST),
            port: env.parse("API_SERVER_PORT", ServerConfig::DEFAULT_PORT)?,
            shutdown_timeout: Duration::from_secs(env.parse(
                "TODO_SHUTDOWN_TIMEOUT_SECS",
                ServerConfig::DEFAULT_SHUTDOWN_TIMEOUT.as_secs(),
            )?),
        };

        let database = DatabaseConfig {
            user: env.string("DB_USER", DatabaseConfig::DEFAULT_USER),
            password: env.string("DB_PASS", "").into(),
            host: env.string("DB_HOST", DatabaseConfig::DEFAULT_HOST),
            port: env.parse("DB_PORT", DatabaseConfig::DEFAULT_PORT)?,
            name: env.string("DB_NAME", DatabaseConfig::DEFAULT_NAME),
            table: env.string("DB_TABLE", DatabaseConfig::DEFAULT_TABLE),
            pool_max_size: env.parse("DB_POOL_MAX_SIZE", DatabaseConfig::DEFAULT_POOL_MAX_SIZE)?,
        };
        if database.pool_max_size == 0 {
            return Err(Error::InvalidConfig(
                "DB_POOL_MAX_SIZE must be at least 1".to_string(),
            ));
        }

        let store = StoreConfig {
            backend: env.parse("TODO_STORE_BACKEND", StoreBackend::default())?,
            sqlite_path: env
                .get("TODO_SQLITE_PATH")
                .map_or_else(|| StoreConfig::DEFAULT_SQLITE_PATH.into(), Into::into),
            database,
        };

        let logging = LoggingConfig {
            format: env.parse("TODO_LOG_FORMAT", LogFormat::default())?,
            filter: env.get("RUST_LOG"),
        };

        let metrics = MetricsConfig {
            enabled: env.flag("TODO_METRICS_ENABLED", false)?,
            port: env.parse("TODO_METRICS_PORT", MetricsConfig::DEFAULT_PORT)?,
        };

        Ok(Self {
            server,
            store,
            logging,
            metrics,
        })
    }
}

/// Renders the configuration as `KEY=value` lines with the password masked.
impl fmt::Display for TodoConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let db = &self.store.database;
        let password = if db.password.expose_secret().is_empty() {
            ""
        } else {
            "********"
        };

        writeln!(f, "API_SERVER_HOST={}", self.server.host)?;
        writeln!(f, "API_SERVER_PORT={}", self.server.port)?;
        writeln!(
            f,
            "TODO_SHUTDOWN_TIMEOUT_SECS={}",
            self.server.shutdown_timeout.as_secs()
        )?;
        writeln!(f, "TODO_STORE_BACKEND={}", self.store.backend)?;
        writeln!(f, "TODO_SQLITE_PATH={}", self.store.sqlite_path.display())?;
        writeln!(f, "DB_USER={}", db.user)?;
        writeln!(f, "DB_PASS={password}")?;
        writeln!(f, "DB_HOST={}", db.host)?;
        writeln!(f, "DB_PORT={}", db.port)?;
        writeln!(f, "DB_NAME={}", db.name)?;
        writeln!(f, "DB_TABLE={}", db.table)?;
        writeln!(f, "DB_POOL_MAX_SIZE={}", db.pool_max_size)?;
        writeln!(f, "TODO_LOG_FORMAT={}", self.logging.format)?;
        writeln!(
            f,
            "RUST_LOG={}",
            self.logging.filter.as_deref().unwrap_or_default()
        )?;
        writeln!(f, "TODO_METRICS_ENABLED={}", self.metrics.enabled)?;
        write!(f, "TODO_METRICS_PORT={}", self.metrics.port)
    }
}

/// Typed access to a variable lookup.
struct Env<F>(F);

impl<F> Env<F>
where
    F: Fn(&str) -> Option<String>,
{
    /// Returns the trimmed value, treating empty as unset.
    fn get(&self, key: &str) -> Option<String> {
        (self.0)(key)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    fn string(&self, key: &str, default: &str) -> String {
        self.get(key).unwrap_or_else(|| default.to_string())
    }

    fn parse<T>(&self, key: &str, default: T) -> Result<T>
    where
        T: FromStr,
        T::Err: fmt::Display,
    {
        self.get(key).map_or(Ok(default), |raw| {
            raw.parse()
                .map_err(|e| Error::InvalidConfig(format!("{key}={raw}: {e}")))
        })
    }

    fn flag(&self, key: &str, default: bool) -> Result<bool> {
        self.get(key).map_or(Ok(default), |raw| {
            match raw.to_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => Ok(true),
                "0" | "false" | "no" | "off" => Ok(false),
                _ => Err(Error::InvalidConfig(format!(
                    "{key}={raw}: expected true or false"
                ))),
            }
        })
    }
}
