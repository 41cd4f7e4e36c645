//! # todo-app
//!
//! A small CRUD web service for managing to-do items.
//!
//! Items are created, fetched, updated with partial patches, deleted and
//! searched by case-insensitive substring. Persistence is pluggable behind
//! the [`ItemStore`] trait:
//!
//! - [`MapStore`]: volatile, process-local
//! - [`SqliteStore`]: durable, single file
//! - [`PostgresStore`]: durable, pooled (`postgres` feature)
//!
//! ## Layers
//!
//! ```text
//! api (axum)  ──▶  TodoService  ──▶  dyn ItemStore
//! ```
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//! use todo_app::{ItemPatch, ItemStatus, ItemStore, MapStore, NewItem, TodoService};
//!
//! let store = Arc::new(MapStore::new());
//! store.open()?;
//!
//! let service = TodoService::new(store);
//! let item = service.add(NewItem::new("Buy milk"))?;
//! assert_eq!(item.status, ItemStatus::Created);
//!
//! let patch = ItemPatch::default().with_status("STARTED");
//! let updated = service.update(item.id, &patch)?;
//! assert_eq!(updated.status, ItemStatus::Started);
//! assert_eq!(updated.task, "Buy milk");
//! # Ok::<(), todo_app::Error>(())
//! ```

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![warn(missing_docs)]
#![forbid(unsafe_code)]
#![allow(clippy::multiple_crate_versions)]

use thiserror::Error as ThisError;

pub mod api;
pub mod config;
pub mod models;
pub mod observability;
pub mod services;
pub mod storage;

pub use api::{ApiError, ApiServer};
pub use config::{DatabaseConfig, ServerConfig, StoreBackend, StoreConfig, TodoConfig};
pub use models::{Item, ItemId, ItemPatch, ItemStatus, NewItem};
pub use services::{BackendFactory, TodoService};
pub use storage::{ItemStore, MapStore, PostgresStore, SqliteStore};

/// Error type for todo-app operations.
///
/// | Variant | Raised When |
/// |---------|-------------|
/// | `NotFound` | No stored item has the requested id |
/// | `InvalidStatus` | A status string is outside `CREATED`, `STARTED`, `COMPLETED` |
/// | `Persistence` | Backend I/O, connectivity, or zero rows affected by an update |
/// | `MalformedRequest` | Undecodable request body or non-integer id |
/// | `NotReady` | A store is used before `open` or after `close` |
/// | `InvalidConfig` | An environment value cannot be parsed |
/// | `FeatureNotEnabled` | A backend was compiled out |
/// | `OperationFailed` | Process plumbing fails (logging, metrics exporter, runtime) |
#[derive(Debug, ThisError)]
pub enum Error {
    /// The item does not exist.
    #[error("item with id {id} not found")]
    NotFound {
        /// The id that was looked up.
        id: ItemId,
    },

    /// A status value outside the enumerated set.
    #[error("invalid status '{0}': expected one of CREATED, STARTED, COMPLETED")]
    InvalidStatus(String),

    /// A storage operation failed.
    ///
    /// Raised when:
    /// - `SQLite` or PostgreSQL statements fail
    /// - The connection pool cannot hand out a connection
    /// - An update affects zero rows in a durable backend
    /// - A stored row cannot be decoded
    #[error("operation '{operation}' failed: {cause}")]
    Persistence {
        /// The operation that failed.
        operation: String,
        /// The underlying cause.
        cause: String,
    },

    /// The request could not be decoded.
    #[error("malformed request: {0}")]
    MalformedRequest(String),

    /// The store has not been opened, or has been closed.
    #[error("storage backend '{backend}' is not ready: call open() first")]
    NotReady {
        /// The backend label.
        backend: &'static str,
    },

    /// A configuration value is invalid.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Feature not enabled (requires feature flag).
    #[error("feature not enabled: {0} (compile with --features {0})")]
    FeatureNotEnabled(String),

    /// A process-level operation outside storage failed.
    #[error("operation '{operation}' failed: {cause}")]
    OperationFailed {
        /// The operation that failed.
        operation: String,
        /// The underlying cause.
        cause: String,
    },
}

impl Error {
    /// Builds a [`Error::Persistence`] from an operation label and any displayable cause.
    pub fn persistence(operation: impl Into<String>, cause: impl std::fmt::Display) -> Self {
        Self::Persistence {
            operation: operation.into(),
            cause: cause.to_string(),
        }
    }
}

/// Result type alias for todo-app operations.
pub type Result<T> = std::result::Result<T, Error>;
