//! Item store trait.

use crate::Result;
use crate::models::{Item, ItemId, NewItem};

/// Trait for item persistence backends.
///
/// Stores are the only owners of persisted items. Every read hands out an
/// independent copy; callers never hold references into the store.
///
/// All methods block. Async callers must dispatch through
/// `tokio::task::spawn_blocking` (see [`crate::api`]).
///
/// # Lifecycle
///
/// A store starts closed. [`open`](Self::open) allocates its resources,
/// [`close`](Self::close) releases them. Data operations and
/// [`verify_connection`](Self::verify_connection) on a closed store fail
/// with [`Error::NotReady`](crate::Error::NotReady).
///
/// # Identity
///
/// The store assigns ids in [`add`](Self::add): the volatile backend from a
/// counter it owns, the relational backends through auto-increment columns.
/// An assigned id is never reused for another live item.
pub trait ItemStore: Send + Sync {
    /// Short label for logs and metrics (e.g. `"memory"`, `"sqlite"`).
    fn backend_name(&self) -> &'static str;

    /// Allocates the underlying resources. Opening an open store is a no-op.
    fn open(&self) -> Result<()>;

    /// Checks that the store is open and its resources are usable.
    fn verify_connection(&self) -> Result<()>;

    /// Releases the underlying resources. Closing a closed store is a no-op.
    fn close(&self) -> Result<()>;

    /// Persists a new item and returns it with its assigned id.
    fn add(&self, item: &NewItem) -> Result<Item>;

    /// Retrieves an item by ID.
    ///
    /// Fails with [`Error::NotFound`](crate::Error::NotFound) if absent.
    fn get(&self, id: ItemId) -> Result<Item>;

    /// Returns every stored item.
    fn get_all(&self) -> Result<Vec<Item>>;

    /// Replaces the stored record at `id` with `item`.
    ///
    /// The stored id stays `id` whatever `item.id` says.
    fn update(&self, id: ItemId, item: &Item) -> Result<()>;

    /// Deletes the item at `id`.
    ///
    /// Fails with [`Error::NotFound`](crate::Error::NotFound) if absent.
    fn delete(&self, id: ItemId) -> Result<()>;

    /// Returns true if an item with `id` is stored.
    fn exists(&self, id: ItemId) -> Result<bool> {
        match self.get(id) {
            Ok(_) => Ok(true),
            Err(crate::Error::NotFound { .. }) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Returns the number of stored items.
    fn count(&self) -> Result<usize> {
        Ok(self.get_all()?.len())
    }
}
