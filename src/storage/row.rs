//! Row decoding shared by the relational backends.

use crate::models::{Item, ItemId, ItemStatus};
use crate::{Error, Result};

/// Raw column values of one item row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemRow {
    /// `id` column.
    pub id: i64,
    /// `task` column.
    pub task: String,
    /// `status` column, canonical upper-case text.
    pub status: String,
}

impl ItemRow {
    /// Converts the row into an [`Item`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::Persistence`] if the stored status is not a known
    /// value; rows are never coerced to a default status.
    pub fn into_item(self) -> Result<Item> {
        let status = ItemStatus::parse(&self.status).ok_or_else(|| {
            Error::persistence(
                "decode_item_row",
                format!("row {} has unknown status '{}'", self.id, self.status),
            )
        })?;

        Ok(Item {
            id: ItemId::new(self.id),
            task: self.task,
            status,
        })
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn test_into_item() {
        let row = ItemRow {
            id: 3,
            task: "Buy milk".to_string(),
            status: "STARTED".to_string(),
        };
        let item = row.into_item().unwrap();
        assert_eq!(item.id, ItemId::new(3));
        assert_eq!(item.task, "Buy milk");
        assert_eq!(item.status, ItemStatus::Started);
    }

    #[test]
    fn test_into_item_rejects_unknown_status() {
        let row = ItemRow {
            id: 3,
            task: String::new(),
            status: "archived".to_string(),
        };
        let err = row.into_item().unwrap_err();
        assert!(matches!(err, Error::Persistence { ref cause, .. } if cause.contains("archived")));
    }
}
