//! Backend factory for storage layer initialization.
//!
//! Maps a [`StoreConfig`] to a concrete [`ItemStore`]. The store is
//! constructed but not opened; callers own the lifecycle.
//!
//! ```text
//! StoreConfig.backend
//!   ├── memory   → MapStore
//!   ├── sqlite   → SqliteStore (TODO_SQLITE_PATH, DB_TABLE)
//!   └── postgres → PostgresStore (DB_*)
//! ```

use crate::Result;
use crate::config::{StoreBackend, StoreConfig};
use crate::storage::{ItemStore, MapStore, PostgresStore, SqliteStore};
use std::sync::Arc;

/// Factory for creating storage backends.
///
/// # Example
///
/// ```rust
/// use todo_app::{BackendFactory, StoreConfig};
///
/// let store = BackendFactory::create(&StoreConfig::default())?;
/// assert_eq!(store.backend_name(), "memory");
/// # Ok::<(), todo_app::Error>(())
/// ```
pub struct BackendFactory;

impl BackendFactory {
    /// Creates the configured backend.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`](crate::Error::InvalidConfig) if the
    /// backend rejects its settings (for example an unusable table name).
    pub fn create(config: &StoreConfig) -> Result<Arc<dyn ItemStore>> {
        let store: Arc<dyn ItemStore> = match config.backend {
            StoreBackend::Memory => Arc::new(MapStore::new()),
            StoreBackend::Sqlite => Arc::new(SqliteStore::new(
                config.sqlite_path.clone(),
                config.database.table.clone(),
            )?),
            StoreBackend::Postgres => Arc::new(PostgresStore::new(&config.database)?),
        };

        tracing::debug!(backend = store.backend_name(), "storage backend created");
        Ok(store)
    }
}
