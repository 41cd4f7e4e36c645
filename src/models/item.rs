//! Item types and identifiers.

use super::ItemStatus;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Unique identifier for an item.
///
/// Assigned by the storage backend on insert and never changed afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(i64);

impl ItemId {
    /// Creates a new item ID.
    #[must_use]
    pub const fn new(id: i64) -> Self {
        Self(id)
    }

    /// Returns the raw integer value.
    #[must_use]
    pub const fn get(self) -> i64 {
        self.0
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for ItemId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

impl FromStr for ItemId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        s.parse::<i64>()
            .map(Self)
            .map_err(|e| Error::MalformedRequest(format!("invalid item id '{s}': {e}")))
    }
}

/// A persisted to-do item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    /// Unique identifier.
    pub id: ItemId,
    /// Free-form task description.
    pub task: String,
    /// Current status.
    pub status: ItemStatus,
}

impl Item {
    /// Attaches an id to an unsaved item.
    #[must_use]
    pub fn from_new(id: ItemId, item: NewItem) -> Self {
        Self {
            id,
            task: item.task,
            status: item.status,
        }
    }
}

/// An item that has not been assigned an id yet.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct NewItem {
    /// Free-form task description.
    #[serde(default)]
    pub task: String,
    /// Initial status. The service always resets this to `CREATED`.
    #[serde(default)]
    pub status: ItemStatus,
}

impl NewItem {
    /// Creates a new unsaved item with status `CREATED`.
    #[must_use]
    pub fn new(task: impl Into<String>) -> Self {
        Self {
            task: task.into(),
            status: ItemStatus::Created,
        }
    }
}

/// A partial update.
///
/// A field takes part in the merge only when it is present and non-empty;
/// `{"task": ""}` leaves the stored task untouched. `status` stays a raw
/// string so that validation happens at merge time.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ItemPatch {
    /// Replacement task text.
    #[serde(default)]
    pub task: Option<String>,
    /// Replacement status, validated against [`ItemStatus`].
    #[serde(default)]
    pub status: Option<String>,
}

impl ItemPatch {
    /// Sets the replacement task.
    #[must_use]
    pub fn with_task(mut self, task: impl Into<String>) -> Self {
        self.task = Some(task.into());
        self
    }

    /// Sets the replacement status.
    #[must_use]
    pub fn with_status(mut self, status: impl Into<String>) -> Self {
        self.status = Some(status.into());
        self
    }

    /// Returns the task if it should be applied.
    #[must_use]
    pub fn task(&self) -> Option<&str> {
        self.task.as_deref().filter(|t| !t.is_empty())
    }

    /// Returns the status text if it should be applied.
    #[must_use]
    pub fn status(&self) -> Option<&str> {
        self.status.as_deref().filter(|s| !s.is_empty())
    }

    /// Returns true if applying this patch cannot change anything.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.task().is_none() && self.status().is_none()
    }

    /// Merges the present fields into `item`.
    ///
    /// The status is validated before anything is written, so on error
    /// `item` is left exactly as it was.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidStatus`] if the status is not a known value.
    pub fn apply_to(&self, item: &mut Item) -> Result<()> {
        let status = self.status().map(str::parse::<ItemStatus>).transpose()?;

        if let Some(task) = self.task() {
            item.task = task.to_string();
        }
        if let Some(status) = status {
            item.status = status;
        }
        Ok(())
    }
}
