//! Item status values.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Lifecycle status of an item.
///
/// Any status may follow any other: updates only check set membership,
/// they do not enforce `CREATED → STARTED → COMPLETED` ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ItemStatus {
    /// Freshly added.
    #[default]
    Created,
    /// Work has begun.
    Started,
    /// Done.
    Completed,
}

impl ItemStatus {
    /// Returns the canonical string form, as serialized and stored.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Created => "CREATED",
            Self::Started => "STARTED",
            Self::Completed => "COMPLETED",
        }
    }

    /// Returns every status value.
    #[must_use]
    pub const fn all() -> [Self; 3] {
        [Self::Created, Self::Started, Self::Completed]
    }

    /// Parses a status string, case-insensitively.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "CREATED" => Some(Self::Created),
            "STARTED" => Some(Self::Started),
            "COMPLETED" => Some(Self::Completed),
            _ => None,
        }
    }
}

impl fmt::Display for ItemStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ItemStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s).ok_or_else(|| Error::InvalidStatus(s.to_string()))
    }
}
