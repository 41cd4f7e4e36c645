//! Structured logging configuration.

use crate::{Error, Result};
use std::fmt;
use std::str::FromStr;
use tracing_subscriber::EnvFilter;

/// Output format of the fmt layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Multi-line, human oriented.
    #[default]
    Pretty,
    /// Single-line text.
    Compact,
    /// One JSON object per event.
    Json,
}

impl LogFormat {
    /// Returns the canonical name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pretty => "pretty",
            Self::Compact => "compact",
            Self::Json => "json",
        }
    }
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LogFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "pretty" => Ok(Self::Pretty),
            "compact" | "text" => Ok(Self::Compact),
            "json" => Ok(Self::Json),
            other => Err(Error::InvalidConfig(format!(
                "unknown log format '{other}': expected pretty, compact or json"
            ))),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoggingConfig {
    /// Output format.
    pub format: LogFormat,
    /// `RUST_LOG`-style directives; unset means `info` (or `debug` when verbose).
    pub filter: Option<String>,
}

impl LoggingConfig {
    /// Builds the filter for the subscriber.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] if the directives do not parse.
    pub fn env_filter(&self, verbose: bool) -> Result<EnvFilter> {
        let directives = self
            .filter
            .as_deref()
            .unwrap_or(if verbose { "debug" } else { "info" });
        EnvFilter::try_new(directives)
            .map_err(|e| Error::InvalidConfig(format!("RUST_LOG={directives}: {e}")))
    }
}
