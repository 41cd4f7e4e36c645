//! Volatile in-process backend.

use crate::models::{Item, ItemId, NewItem};
use crate::storage::traits::ItemStore;
use crate::storage::{acquire_lock, timed};
use crate::{Error, Result};
use std::collections::BTreeMap;
use std::sync::Mutex;
use tracing::instrument;

const BACKEND: &str = "memory";

/// The open state of a [`MapStore`]: the items plus the id counter that
/// belongs to them.
#[derive(Debug, Default)]
struct MapTable {
    items: BTreeMap<ItemId, Item>,
    next_id: i64,
}

impl MapTable {
    fn insert(&mut self, new_item: &NewItem) -> Item {
        let id = ItemId::new(self.next_id);
        self.next_id += 1;
        let item = Item::from_new(id, new_item.clone());
        self.items.insert(id, item.clone());
        item
    }
}

/// Items held in an ordered map for the lifetime of the process.
///
/// Ids come from a counter owned by the open table, starting at 0. Closing
/// the store discards its items; opening it again starts an empty table
/// with the counter back at 0.
#[derive(Debug, Default)]
pub struct MapStore {
    table: Mutex<Option<MapTable>>,
}

impl MapStore {
    /// Creates a closed store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs `f` against the open table.
    fn with_table<T>(&self, f: impl FnOnce(&mut MapTable) -> Result<T>) -> Result<T> {
        let mut guard = acquire_lock(&self.table);
        let table = guard.as_mut().ok_or(Error::NotReady { backend: BACKEND })?;
        f(table)
    }
}

impl ItemStore for MapStore {
    fn backend_name(&self) -> &'static str {
        BACKEND
    }

    fn open(&self) -> Result<()> {
        let mut guard = acquire_lock(&self.table);
        if guard.is_none() {
            tracing::debug!("opening in-memory item table");
            *guard = Some(MapTable::default());
        }
        Ok(())
    }

    fn verify_connection(&self) -> Result<()> {
        self.with_table(|_| Ok(()))
    }

    fn close(&self) -> Result<()> {
        acquire_lock(&self.table).take();
        Ok(())
    }

    #[instrument(skip(self, item), fields(operation = "add", backend = BACKEND))]
    fn add(&self, item: &NewItem) -> Result<Item> {
        timed(BACKEND, "add", || self.with_table(|t| Ok(t.insert(item))))
    }

    #[instrument(skip(self), fields(operation = "get", backend = BACKEND, item.id = %id))]
    fn get(&self, id: ItemId) -> Result<Item> {
        timed(BACKEND, "get", || {
            self.with_table(|t| t.items.get(&id).cloned().ok_or(Error::NotFound { id }))
        })
    }

    #[instrument(skip(self), fields(operation = "get_all", backend = BACKEND))]
    fn get_all(&self) -> Result<Vec<Item>> {
        timed(BACKEND, "get_all", || {
            self.with_table(|t| Ok(t.items.values().cloned().collect()))
        })
    }

    #[instrument(skip(self, item), fields(operation = "update", backend = BACKEND, item.id = %id))]
    fn update(&self, id: ItemId, item: &Item) -> Result<()> {
        timed(BACKEND, "update", || {
            self.with_table(|t| {
                let slot = t.items.get_mut(&id).ok_or(Error::NotFound { id })?;
                *slot = Item {
                    id,
                    task: item.task.clone(),
                    status: item.status,
                };
                Ok(())
            })
        })
    }

    #[instrument(skip(self), fields(operation = "delete", backend = BACKEND, item.id = %id))]
    fn delete(&self, id: ItemId) -> Result<()> {
        timed(BACKEND, "delete", || {
            self.with_table(|t| {
                t.items
                    .remove(&id)
                    .map(|_| ())
                    .ok_or(Error::NotFound { id })
            })
        })
    }

    fn count(&self) -> Result<usize> {
        self.with_table(|t| Ok(t.items.len()))
    }
}
