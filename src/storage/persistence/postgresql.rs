//! PostgreSQL-based item backend.
//!
//! Pooled durable storage. The pool is async (deadpool-postgres over
//! tokio-postgres); the blocking [`ItemStore`](crate::storage::ItemStore)
//! methods drive it on the tokio runtime captured when the store is opened.

#[cfg(feature = "postgres")]
mod implementation {
    use crate::config::DatabaseConfig;
    use crate::models::{Item, ItemId, NewItem};
    use crate::storage::traits::ItemStore;
    use crate::storage::{ItemRow, acquire_lock, timed, validate_table_name};
    use crate::{Error, Result};
    use deadpool_postgres::{Config, ManagerConfig, Pool, PoolConfig, RecyclingMethod, Runtime};
    use secrecy::ExposeSecret;
    use std::future::Future;
    use std::sync::Mutex;
    use std::time::Duration;
    use tokio::runtime::Handle;
    use tokio_postgres::NoTls;
    use tracing::instrument;

    const BACKEND: &str = "postgres";

    /// Wait/create/recycle timeout for pooled connections.
    const POOL_TIMEOUT: Duration = Duration::from_secs(5);

    /// Helper to map pool errors.
    fn pool_error(e: impl std::fmt::Display) -> Error {
        Error::persistence("postgres_get_client", e)
    }

    /// Resources held while the store is open.
    struct Connected {
        pool: Pool,
        handle: Handle,
        /// Runtime created by `open` when none was running.
        owned_runtime: Option<tokio::runtime::Runtime>,
    }

    /// PostgreSQL-based item backend.
    ///
    /// # Schema
    ///
    /// ```sql
    /// CREATE TABLE IF NOT EXISTS <table> (
    ///     id BIGSERIAL PRIMARY KEY,
    ///     task TEXT NOT NULL,
    ///     status TEXT NOT NULL
    /// )
    /// ```
    pub struct PostgresStore {
        /// Pool settings, applied on every `open`.
        config: Config,
        /// Validated table name.
        table: String,
        /// Open pool, `None` while closed.
        state: Mutex<Option<Connected>>,
    }

    impl PostgresStore {
        /// Creates a closed store from discrete connection settings.
        ///
        /// # Errors
        ///
        /// Returns [`Error::InvalidConfig`] if the table name is not a plain
        /// identifier.
        pub fn new(db: &DatabaseConfig) -> Result<Self> {
            let mut cfg = Config::new();
            cfg.host = Some(db.host.clone());
            cfg.port = Some(db.port);
            cfg.user = Some(db.user.clone());
            let password = db.password.expose_secret();
            if !password.is_empty() {
                cfg.password = Some(password.to_string());
            }
            cfg.dbname = Some(db.name.clone());
            Self::build(cfg, db.table.clone(), db.pool_max_size)
        }

        /// Creates a closed store from a `postgresql://` connection URL.
        ///
        /// # Errors
        ///
        /// Returns [`Error::InvalidConfig`] if the URL cannot be parsed or the
        /// table name is not a plain identifier.
        pub fn from_url(url: &str, table: impl Into<String>) -> Result<Self> {
            let parsed = url
                .parse::<tokio_postgres::Config>()
                .map_err(|e| Error::InvalidConfig(format!("postgres url: {e}")))?;

            let mut cfg = Config::new();
            cfg.host = parsed.get_hosts().first().map(host_to_string);
            cfg.port = parsed.get_ports().first().copied();
            cfg.user = parsed.get_user().map(String::from);
            cfg.password = parsed
                .get_password()
                .map(|p| String::from_utf8_lossy(p).to_string());
            cfg.dbname = parsed.get_dbname().map(String::from);
            Self::build(cfg, table.into(), DatabaseConfig::DEFAULT_POOL_MAX_SIZE)
        }

        fn build(mut config: Config, table: String, pool_max_size: usize) -> Result<Self> {
            validate_table_name(&table)?;
            config.pool = Some(PoolConfig {
                max_size: pool_max_size,
                timeouts: deadpool_postgres::Timeouts {
                    wait: Some(POOL_TIMEOUT),
                    create: Some(POOL_TIMEOUT),
                    recycle: Some(POOL_TIMEOUT),
                },
                ..Default::default()
            });
            config.manager = Some(ManagerConfig {
                recycling_method: RecyclingMethod::Fast,
            });
            Ok(Self {
                config,
                table,
                state: Mutex::new(None),
            })
        }

        /// Returns the table holding the items.
        #[must_use]
        pub fn table(&self) -> &str {
            &self.table
        }

        /// Drives `f` to completion against the open pool.
        ///
        /// The state lock is released before the query runs, so concurrent
        /// callers share the pool. Must not be called from an async worker
        /// thread; the HTTP layer reaches the store through `spawn_blocking`.
        fn run<T, F, Fut>(&self, f: F) -> Result<T>
        where
            F: FnOnce(Pool) -> Fut,
            Fut: Future<Output = Result<T>>,
        {
            let (pool, handle) = {
                let guard = acquire_lock(&self.state);
                let connected = guard.as_ref().ok_or(Error::NotReady { backend: BACKEND })?;
                (connected.pool.clone(), connected.handle.clone())
            };
            handle.block_on(f(pool))
        }

        fn connect(&self) -> Result<Connected> {
            let (handle, owned_runtime) = match Handle::try_current() {
                Ok(handle) => (handle, None),
                Err(_) => {
                    // Handle::block_on on a current-thread runtime cannot drive
                    // I/O, so the private runtime gets one worker.
                    let rt = tokio::runtime::Builder::new_multi_thread()
                        .worker_threads(1)
                        .enable_all()
                        .build()
                        .map_err(|e| Error::persistence("postgres_create_runtime", e))?;
                    (rt.handle().clone(), Some(rt))
                },
            };

            let pool = self
                .config
                .create_pool(Some(Runtime::Tokio1), NoTls)
                .map_err(|e| Error::persistence("postgres_create_pool", e))?;

            let create = format!(
                "CREATE TABLE IF NOT EXISTS {} (
                    id BIGSERIAL PRIMARY KEY,
                    task TEXT NOT NULL,
                    status TEXT NOT NULL
                )",
                self.table
            );
            handle.block_on(async {
                let client = pool.get().await.map_err(pool_error)?;
                client
                    .batch_execute(&create)
                    .await
                    .map_err(|e| Error::persistence("create_items_table", e))
            })?;

            Ok(Connected {
                pool,
                handle,
                owned_runtime,
            })
        }
    }

    /// Extracts host string from tokio-postgres Host.
    #[cfg(unix)]
    fn host_to_string(h: &tokio_postgres::config::Host) -> String {
        match h {
            tokio_postgres::config::Host::Tcp(s) => s.clone(),
            tokio_postgres::config::Host::Unix(p) => p.to_string_lossy().to_string(),
        }
    }

    /// Extracts host string from tokio-postgres Host (Windows: Tcp only).
    #[cfg(not(unix))]
    fn host_to_string(h: &tokio_postgres::config::Host) -> String {
        let tokio_postgres::config::Host::Tcp(s) = h;
        s.clone()
    }

    fn read_row(row: &tokio_postgres::Row) -> Result<ItemRow> {
        let decode = |e: tokio_postgres::Error| Error::persistence("decode_item_row", e);
        Ok(ItemRow {
            id: row.try_get("id").map_err(decode)?,
            task: row.try_get("task").map_err(decode)?,
            status: row.try_get("status").map_err(decode)?,
        })
    }

    impl ItemStore for PostgresStore {
        fn backend_name(&self) -> &'static str {
            BACKEND
        }

        #[instrument(
            skip(self),
            fields(operation = "open", backend = BACKEND, table = %self.table)
        )]
        fn open(&self) -> Result<()> {
            let mut guard = acquire_lock(&self.state);
            if guard.is_none() {
                *guard = Some(self.connect()?);
                tracing::info!("postgres store opened");
            }
            Ok(())
        }

        fn verify_connection(&self) -> Result<()> {
            self.run(|pool| async move {
                let client = pool.get().await.map_err(pool_error)?;
                client
                    .simple_query("SELECT 1")
                    .await
                    .map(|_| ())
                    .map_err(|e| Error::persistence("verify_postgres", e))
            })
        }

        fn close(&self) -> Result<()> {
            let Some(connected) = acquire_lock(&self.state).take() else {
                return Ok(());
            };
            connected.pool.close();
            if let Some(rt) = connected.owned_runtime {
                rt.shutdown_background();
            }
            tracing::info!("postgres store closed");
            Ok(())
        }

        #[instrument(skip(self, item), fields(operation = "add", backend = BACKEND))]
        fn add(&self, item: &NewItem) -> Result<Item> {
            let sql = format!(
                "INSERT INTO {} (task, status) VALUES ($1, $2) RETURNING id",
                self.table
            );
            timed(BACKEND, "add", || {
                self.run(|pool| async move {
                    let client = pool.get().await.map_err(pool_error)?;
                    let row = client
                        .query_one(&sql, &[&item.task, &item.status.as_str()])
                        .await
                        .map_err(|e| Error::persistence("insert_item", e))?;
                    let id: i64 = row
                        .try_get(0)
                        .map_err(|e| Error::persistence("insert_item", e))?;
                    Ok(Item::from_new(ItemId::new(id), item.clone()))
                })
            })
        }

        #[instrument(skip(self), fields(operation = "get", backend = BACKEND, item.id = %id))]
        fn get(&self, id: ItemId) -> Result<Item> {
            let sql = format!("SELECT id, task, status FROM {} WHERE id = $1", self.table);
            timed(BACKEND, "get", || {
                self.run(|pool| async move {
                    let client = pool.get().await.map_err(pool_error)?;
                    let row = client
                        .query_opt(&sql, &[&id.get()])
                        .await
                        .map_err(|e| Error::persistence("get_item", e))?
                        .ok_or(Error::NotFound { id })?;
                    read_row(&row)?.into_item()
                })
            })
        }

        #[instrument(skip(self), fields(operation = "get_all", backend = BACKEND))]
        fn get_all(&self) -> Result<Vec<Item>> {
            let sql = format!(
                "SELECT id, task, status FROM {} ORDER BY id DESC",
                self.table
            );
            timed(BACKEND, "get_all", || {
                self.run(|pool| async move {
                    let client = pool.get().await.map_err(pool_error)?;
                    let rows = client
                        .query(&sql, &[])
                        .await
                        .map_err(|e| Error::persistence("get_all_items", e))?;
                    rows.iter()
                        .map(|row| read_row(row)?.into_item())
                        .collect()
                })
            })
        }

        #[instrument(
            skip(self, item),
            fields(operation = "update", backend = BACKEND, item.id = %id)
        )]
        fn update(&self, id: ItemId, item: &Item) -> Result<()> {
            let sql = format!(
                "UPDATE {} SET task = $1, status = $2 WHERE id = $3",
                self.table
            );
            timed(BACKEND, "update", || {
                self.run(|pool| async move {
                    let client = pool.get().await.map_err(pool_error)?;
                    let affected = client
                        .execute(&sql, &[&item.task, &item.status.as_str(), &id.get()])
                        .await
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
            let sql = format!("DELETE FROM {} WHERE id = $1", self.table);
            timed(BACKEND, "delete", || {
                self.run(|pool| async move {
                    let client = pool.get().await.map_err(pool_error)?;
                    let affected = client
                        .execute(&sql, &[&id.get()])
                        .await
                        .map_err(|e| Error::persistence("delete_item", e))?;
                    if affected == 0 {
                        return Err(Error::NotFound { id });
                    }
                    Ok(())
                })
            })
        }
    }

    impl Drop for PostgresStore {
        fn drop(&mut self) {
            let _ = self.close();
        }
    }
}

#[cfg(feature = "postgres")]
pub use implementation::PostgresStore;

#[cfg(not(feature = "postgres"))]
mod stub {
    use crate::config::DatabaseConfig;
    use crate::models::{Item, ItemId, NewItem};
    use crate::storage::traits::ItemStore;
    use crate::storage::validate_table_name;
    use crate::{Error, Result};

    fn disabled<T>() -> Result<T> {
        Err(Error::FeatureNotEnabled("postgres".to_string()))
    }

    /// Stub PostgreSQL backend when feature is not enabled.
    ///
    /// Constructs like the real backend; every operation fails with
    /// [`Error::FeatureNotEnabled`].
    pub struct PostgresStore {
        table: String,
    }

    impl PostgresStore {
        /// Creates a stub store.
        ///
        /// # Errors
        ///
        /// Returns [`Error::InvalidConfig`] if the table name is not a plain
        /// identifier.
        pub fn new(db: &DatabaseConfig) -> Result<Self> {
            validate_table_name(&db.table)?;
            Ok(Self {
                table: db.table.clone(),
            })
        }

        /// Creates a stub store; the URL is ignored.
        ///
        /// # Errors
        ///
        /// Returns [`Error::InvalidConfig`] if the table name is not a plain
        /// identifier.
        pub fn from_url(_url: &str, table: impl Into<String>) -> Result<Self> {
            let table = table.into();
            validate_table_name(&table)?;
            Ok(Self { table })
        }

        /// Returns the table holding the items.
        #[must_use]
        pub fn table(&self) -> &str {
            &self.table
        }
    }

    impl ItemStore for PostgresStore {
        fn backend_name(&self) -> &'static str {
            "postgres"
        }

        fn open(&self) -> Result<()> {
            disabled()
        }

        fn verify_connection(&self) -> Result<()> {
            disabled()
        }

        fn close(&self) -> Result<()> {
            Ok(())
        }

        fn add(&self, _item: &NewItem) -> Result<Item> {
            disabled()
        }

        fn get(&self, _id: ItemId) -> Result<Item> {
            disabled()
        }

        fn get_all(&self) -> Result<Vec<Item>> {
            disabled()
        }

        fn update(&self, _id: ItemId, _item: &Item) -> Result<()> {
            disabled()
        }

        fn delete(&self, _id: ItemId) -> Result<()> {
            disabled()
        }
    }
}

#[cfg(not(feature = "postgres"))]
pub use stub::PostgresStore;
