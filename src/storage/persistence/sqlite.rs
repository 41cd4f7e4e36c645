//! `SQLite`-based item backend.
//!
//! Durable storage in a single file (or an in-memory database for tests).

use crate::models::{Item, ItemId, NewItem};
use crate::storage::sqlite::open_connection;
use crate::storage::traits::ItemStore;
use crate::storage::{ItemRow, acquire_lock, timed, validate_table_name};
use crate::{Error, Result};
use rusqlite::{Connection, OptionalExtension, params};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::instrument;

const BACKEND: &str = "sqlite";

/// `SQLite`-based item backend.
///
/// # Concurrency Model
///
/// Uses a `Mutex<Connection>` for thread-safe access. `SQLite`'s WAL mode and
/// `busy_timeout` pragma mitigate contention between processes sharing the
/// file; within the process every statement runs under the mutex.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE IF NOT EXISTS <table> (
///     id INTEGER PRIMARY KEY AUTOINCREMENT,
///     task TEXT NOT NULL,
///     status TEXT NOT NULL
/// )
/// ```
///
/// `AUTOINCREMENT` keeps ids of deleted rows from being handed out again.
pub struct SqliteStore {
    /// Open connection, `None` while closed.
    ///
    /// Protected by Mutex because `rusqlite::Connection` is not `Sync`.
    conn: Mutex<Option<Connection>>,
    /// Path to the database file (None for in-memory).
    db_path: Option<PathBuf>,
    /// Validated table name.
    table: String,
}

impl SqliteStore {
    /// Creates a closed store backed by the file at `db_path`.
    ///
    /// Nothing touches the filesystem until [`ItemStore::open`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] if `table` is not a plain identifier.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use todo_app::{ItemStore, SqliteStore};
    ///
    /// let store = SqliteStore::new("todo.sqlite3", "todo_items")?;
    /// assert_eq!(store.backend_name(), "sqlite");
    /// # Ok::<(), todo_app::Error>(())
    /// ```
    pub fn new(db_path: impl Into<PathBuf>, table: impl Into<String>) -> Result<Self> {
        Self::build(Some(db_path.into()), table.into())
    }

    /// Creates a closed store over a private in-memory database.
    ///
    /// Each `open` after a `close` starts from an empty database.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] if `table` is not a plain identifier.
    pub fn in_memory(table: impl Into<String>) -> Result<Self> {
        Self::build(None, table.into())
    }

    fn build(db_path: Option<PathBuf>, table: String) -> Result<Self> {
        validate_table_name(&table)?;
        Ok(Self {
            conn: Mutex::new(None),
            db_path,
            table,
        })
    }

    /// Returns the database path (None for in-memory).
    #[must_use]
    pub fn db_path(&self) -> Option<&Path> {
        self.db_path.as_deref()
    }

    /// Returns the table holding the items.
    #[must_use]
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Runs `f` against the open connection.
    fn with_conn<T>(&self, f: impl FnOnce(&Connection) -> Result<T>) -> Result<T> {
        let guard = acquire_lock(&self.conn);
        let conn = guard.as_ref().ok_or(Error::NotReady { backend: BACKEND })?;
        f(conn)
    }

    /// Creates the item table if it does not exist.
    fn initialize(&self, conn: &Connection) -> Result<()> {
        conn.execute(
            &format!(
                "CREATE TABLE IF NOT EXISTS {} (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    task TEXT NOT NULL,
                    status TEXT NOT NULL
                )",
                self.table
            ),
            [],
        )
        .map_err(|e| Error::persistence("create_items_table", e))?;
        Ok(())
    }

    fn read_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<ItemRow> {
        Ok(ItemRow {
            id: row.get(0)?,
            task: row.get(1)?,
            status: row.get(2)?,
        })
    }
}

impl ItemStore for SqliteStore {
    fn backend_name(&self) -> &'static str {
        BACKEND
    }

    #[instrument(skip(self), fields(operation = "open", backend = BACKEND, table = %self.table))]
    fn open(&self) -> Result<()> {
        let mut guard = acquire_lock(&self.conn);
        if guard.is_some() {
            return Ok(());
        }

        let conn = open_connection(self.db_path.as_deref())?;
        self.initialize(&conn)?;
        *guard = Some(conn);
        tracing::info!(path = ?self.db_path, "sqlite store opened");
        Ok(())
    }

    fn verify_connection(&self) -> Result<()> {
        self.with_conn(|conn| {
            conn.query_row("SELECT 1", [], |_| Ok(()))
                .map_err(|e| Error::persistence("verify_sqlite", e))
        })
    }

    fn close(&self) -> Result<()> {
        let Some(conn) = acquire_lock(&self.conn).take() else {
            return Ok(());
        };
        conn.close()
            .map_err(|(_, e)| Error::persistence("close_sqlite", e))?;
        tracing::info!("sqlite store closed");
        Ok(())
    }

    #[instrument(skip(self, item), fields(operation = "add", backend = BACKEND))]
    fn add(&self, item: &NewItem) -> Result<Item> {
        timed(BACKEND, "add", || {
            self.with_conn(|conn| {
                conn.execute(
                    &format!("INSERT INTO {} (task, status) VALUES (?1, ?2)", self.table),
                    params![item.task, item.status.as_str()],
                )
                .map_err(|e| Error::persistence("insert_item", e))?;

                Ok(Item::from_new(
                    ItemId::new(conn.last_insert_rowid()),
                    item.clone(),
                ))
            })
        })
    }

    #[instrument(skip(self), fields(operation = "get", backend = BACKEND, item.id = %id))]
    fn get(&self, id: ItemId) -> Result<Item> {
        timed(BACKEND, "get", || {
            self.with_conn(|conn| {
                let row = conn
                    .query_row(
                        &format!("SELECT id, task, status FROM {} WHERE id = ?1", self.table),
                        params![id.get()],
                        Self::read_row,
                    )
                    .optional()
                    .map_err(|e| Error::persistence("get_item", e))?;

                row.ok_or(Error::NotFound { id })?.into_item()
            })
        })
    }

    #[instrument(skip(self), fields(operation = "get_all", backend = BACKEND))]
    fn get_all(&self) -> Result<Vec<Item>> {
        timed(BACKEND, "get_all", || {
            self.with_conn(|conn| {
                let mut stmt = conn
                    .prepare(&format!(
                        "SELECT id, task, status FROM {} ORDER BY id DESC",
                        self.table
                    ))
                    .map_err(|e| Error::persistence("get_all_items", e))?;

                let rows = stmt
                    .query_map([], Self::read_row)
                    .map_err(|e| Error::persistence("get_all_items", e))?
                    .collect::<rusqlite::Result<Vec<_>>>()
                    .map_err(|e| Error::persistence("get_all_items", e))?;

                rows.into_iter().map(ItemRow::into_item).collect()
            })
        })
    }

    #[instrument(skip(self, item), fields(operation = "update", backend = BACKEND, item.id = %id))]
    fn update(&self, id: ItemId, item: &Item) -> Result<()> {
        timed(BACKEND, "update", || {
            self.with_conn(|conn| {
                let affected = conn
                    .execute(
                        &format!(
                            "UPDATE {} SET task = ?1, status = ?2 WHERE id = ?3",
                            self.table
                        ),
                        params![item.task, item.status.as_str(), id.get()],
                    )
                    .map_err(|e| Error::persistence("update_item", e))?;

                if affected == 0 {
                    return Err(Error::persistence(
                        "update_item",
                        format!("no rows affected for id {id}"),
                    ));
                }
                Ok(())
            })
        })
    }

    #[instrument(skip(self), fields(operation = "delete", backend = BACKEND, item.id = %id))]
    fn delete(&self, id: ItemId) -> Result<()> {
        timed(BACKEND, "delete", || {
            self.with_conn(|conn| {
                let affected = conn
                    .execute(
                        &format!("DELETE FROM {} WHERE id = ?1", self.table),
                        params![id.get()],
                    )
                    .map_err(|e| Error::persistence("delete_item", e))?;

                if affected == 0 {
                    return Err(Error::NotFound { id });
                }
                Ok(())
            })
        })
    }

    fn count(&self) -> Result<usize> {
        self.with_conn(|conn| {
            let n: i64 = conn
                .query_row(&format!("SELECT COUNT(*) FROM {}", self.table), [], |row| {
                    row.get(0)
                })
                .map_err(|e| Error::persistence("count_items", e))?;
            usize::try_from(n).map_err(|e| Error::persistence("count_items", e))
        })
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use crate::models::ItemStatus;
    use tempfile::TempDir;

    fn open_store() -> SqliteStore {
        let store = SqliteStore::in_memory("todo_items").unwrap();
        store.open().unwrap();
        store
    }

    #[test]
    fn test_rejects_bad_table_name() {
        assert!(matches!(
            SqliteStore::in_memory("items; --"),
            Err(Error::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_add_assigns_database_ids() {
        let store = open_store();
        let a = store.add(&NewItem::new("A")).unwrap();
        let b = store.add(&NewItem::new("B")).unwrap();
        assert!(b.id > a.id);
        assert_eq!(store.get(a.id).unwrap(), a);
    }

    #[test]
    fn test_get_all_descending() {
        let store = open_store();
        for task in ["A", "B", "C"] {
            store.add(&NewItem::new(task)).unwrap();
        }
        let tasks: Vec<String> = store
            .get_all()
            .unwrap()
            .into_iter()
            .map(|i| i.task)
            .collect();
        assert_eq!(tasks, vec!["C", "B", "A"]);
    }

    #[test]
    fn test_update_zero_rows_is_persistence_error() {
        let store = open_store();
        let ghost = Item {
            id: ItemId::new(42),
            task: "ghost".to_string(),
            status: ItemStatus::Started,
        };
        let err = store.update(ghost.id, &ghost).unwrap_err();
        assert!(matches!(err, Error::Persistence { ref cause, .. } if cause.contains("no rows")));
    }

    #[test]
    fn test_delete_zero_rows_is_not_found() {
        let store = open_store();
        let item = store.add(&NewItem::new("A")).unwrap();
        store.delete(item.id).unwrap();
        assert!(matches!(
            store.delete(item.id),
            Err(Error::NotFound { id }) if id == item.id
        ));
    }

    #[test]
    fn test_unknown_stored_status_is_persistence_error() {
        let store = open_store();
        let item = store.add(&NewItem::new("A")).unwrap();
        store
            .with_conn(|conn| {
                conn.execute(
                    "UPDATE todo_items SET status = 'archived' WHERE id = ?1",
                    params![item.id.get()],
                )
                .unwrap();
                Ok(())
            })
            .unwrap();

        assert!(matches!(
            store.get(item.id),
            Err(Error::Persistence { .. })
        ));
    }

    #[test]
    fn test_file_store_survives_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("todo.sqlite3");

        let store = SqliteStore::new(&path, "todo_items").unwrap();
        store.open().unwrap();
        let item = store.add(&NewItem::new("persisted")).unwrap();
        store.close().unwrap();

        let reopened = SqliteStore::new(&path, "todo_items").unwrap();
        reopened.open().unwrap();
        assert_eq!(reopened.get(item.id).unwrap().task, "persisted");
        assert_eq!(reopened.count().unwrap(), 1);
        assert_eq!(reopened.db_path(), Some(path.as_path()));
    }

    #[test]
    fn test_lifecycle_not_ready() {
        let store = SqliteStore::in_memory("todo_items").unwrap();
        assert!(matches!(
            store.verify_connection(),
            Err(Error::NotReady { backend: "sqlite" })
        ));

        store.open().unwrap();
        store.open().unwrap();
        store.verify_connection().unwrap();

        store.close().unwrap();
        store.close().unwrap();
        assert!(matches!(store.get_all(), Err(Error::NotReady { .. })));
    }
}
