//! To-do item service.
//!
//! Business rules that hold for every backend: new items always start as
//! `CREATED`, updates are field-level merges with status validation, and
//! search is a case-insensitive substring match on the task.

use crate::Result;
use crate::models::{Item, ItemId, ItemPatch, ItemStatus, NewItem};
use crate::observability::current_request_id;
use crate::storage::ItemStore;
use std::sync::Arc;
use std::time::Instant;
use tracing::instrument;

/// Service for managing to-do items.
///
/// Holds no per-item state between calls; every operation works on fresh
/// copies obtained from the store.
#[derive(Clone)]
pub struct TodoService {
    store: Arc<dyn ItemStore>,
}

impl TodoService {
    /// Creates a service over an opened store.
    #[must_use]
    pub fn new(store: Arc<dyn ItemStore>) -> Self {
        Self { store }
    }

    /// Returns the underlying store.
    #[must_use]
    pub fn store(&self) -> &Arc<dyn ItemStore> {
        &self.store
    }

    /// Adds a new item.
    ///
    /// Any caller-supplied status is replaced with `CREATED`. Empty tasks are
    /// accepted.
    ///
    /// # Errors
    ///
    /// Returns the store's error if persisting fails.
    #[instrument(
        skip(self, item),
        fields(operation = "todo.add", backend = self.store.backend_name())
    )]
    pub fn add(&self, item: NewItem) -> Result<Item> {
        let start = Instant::now();
        let item = NewItem {
            status: ItemStatus::Created,
            ..item
        };
        let result = self.store.add(&item);
        record("add", start, &result);
        if let Ok(created) = &result {
            tracing::debug!(
                request_id = ?current_request_id(),
                item.id = %created.id,
                "item added"
            );
        }
        result
    }

    /// Retrieves one item.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`](crate::Error::NotFound) carrying `id` if
    /// the item does not exist.
    #[instrument(skip(self), fields(operation = "todo.get", item.id = %id))]
    pub fn get(&self, id: ItemId) -> Result<Item> {
        let start = Instant::now();
        let result = self.store.get(id);
        record("get", start, &result);
        result
    }

    /// Retrieves every item, in the store's documented order.
    ///
    /// # Errors
    ///
    /// Returns the store's error if reading fails.
    #[instrument(skip(self), fields(operation = "todo.get_all"))]
    pub fn get_all(&self) -> Result<Vec<Item>> {
        let start = Instant::now();
        let result = self.store.get_all();
        record("get_all", start, &result);
        result
    }

    /// Merges `patch` into the stored item and returns the persisted result.
    ///
    /// Only present, non-empty fields are merged. An empty patch still goes
    /// through the store and returns the unchanged item. The fetch, merge
    /// and write are separate store calls, so two concurrent updates of the
    /// same id can lose one of them.
    ///
    /// # Errors
    ///
    /// - [`Error::NotFound`](crate::Error::NotFound) if `id` does not exist
    /// - [`Error::InvalidStatus`](crate::Error::InvalidStatus) if the patch
    ///   carries an unknown status; nothing is written
    /// - the store's error if persisting fails
    #[instrument(skip(self, patch), fields(operation = "todo.update", item.id = %id))]
    pub fn update(&self, id: ItemId, patch: &ItemPatch) -> Result<Item> {
        let start = Instant::now();
        let result = (|| {
            let mut item = self.store.get(id)?;
            patch.apply_to(&mut item)?;
            self.store.update(id, &item)?;
            self.store.get(id)
        })();
        record("update", start, &result);
        result
    }

    /// Deletes an item.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`](crate::Error::NotFound) if `id` does not
    /// exist, including when it was already deleted.
    #[instrument(skip(self), fields(operation = "todo.delete", item.id = %id))]
    pub fn delete(&self, id: ItemId) -> Result<()> {
        let start = Instant::now();
        let result = self.store.delete(id);
        record("delete", start, &result);
        result
    }

    /// Returns the items whose task contains `query`, ignoring case.
    ///
    /// An empty query matches every item. Results keep the store's order.
    ///
    /// # Errors
    ///
    /// Returns the store's error if reading fails.
    #[instrument(skip(self), fields(operation = "todo.search"))]
    pub fn search(&self, query: &str) -> Result<Vec<Item>> {
        let start = Instant::now();
        let result = self.store.get_all().map(|items| filter_by_task(items, query));
        record("search", start, &result);
        if let Ok(found) = &result {
            tracing::debug!(
                request_id = ?current_request_id(),
                matches = found.len(),
                "search complete"
            );
        }
        result
    }
}

/// Keeps the items whose task contains `query` case-insensitively.
fn filter_by_task(items: Vec<Item>, query: &str) -> Vec<Item> {
    let needle = query.to_lowercase();
    let mut matches = Vec::with_capacity(items.len() / 4);
    matches.extend(
        items
            .into_iter()
            .filter(|item| item.task.to_lowercase().contains(&needle)),
    );
    matches
}

fn record<T>(operation: &'static str, start: Instant, result: &Result<T>) {
    let status = if result.is_ok() { "success" } else { "error" };
    metrics::counter!(
        "todo_operations_total",
        "operation" => operation,
        "status" => status
    )
    .increment(1);
    metrics::histogram!("todo_operation_duration_ms", "operation" => operation)
        .record(start.elapsed().as_secs_f64() * 1000.0);
}
