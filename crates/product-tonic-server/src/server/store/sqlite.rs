use core::{str::FromStr, time::Duration};
use product_tonic_core::{Error, Result};
use sqlx::{
    Sqlite, SqlitePool,
    pool::PoolConnection,
    sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteQueryResult},
};

// AUTOINCREMENT keeps ids monotonic, so a deleted id is never handed out
// again.
const CREATE_TABLE: &str = "CREATE TABLE IF NOT EXISTS `Product` (\
     `ID` INTEGER PRIMARY KEY AUTOINCREMENT,\
     `Name` VARCHAR(200) DEFAULT NULL,\
     `Price` VARCHAR(200) DEFAULT NULL,\
     `Creator` VARCHAR(200) DEFAULT NULL,\
     `Unit` VARCHAR(200) DEFAULT NULL,\
     `Category` VARCHAR(200) DEFAULT NULL,\
     `Description` VARCHAR(1024) DEFAULT NULL,\
     `Date` TIMESTAMP NULL DEFAULT NULL)";

/// SQLite-backed [`ProductStore`](super::ProductStore).
#[derive(Clone, Debug)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Opens a pool against `url`, creating the database file if missing.
    ///
    /// Every connection to `sqlite::memory:` is a separate database, so an
    /// in-memory URL is pinned to a single connection that never expires.
    pub async fn connect(
        url: &str,
        max_connections: u32,
        acquire_timeout: Duration,
    ) -> core::result::Result<Self, sqlx::Error> {
        let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);
        let in_memory = url.contains(":memory:") || url.contains("mode=memory");

        let pool_options = SqlitePoolOptions::new().acquire_timeout(acquire_timeout);
        let pool_options = if in_memory {
            pool_options
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            pool_options.max_connections(max_connections)
        };

        let pool = pool_options.connect_with(options).await?;
        Ok(Self::from_pool(pool))
    }

    /// Opens a fresh private in-memory database.
    pub async fn in_memory() -> core::result::Result<Self, sqlx::Error> {
        Self::connect("sqlite::memory:", 1, Duration::from_secs(5)).await
    }

    pub fn from_pool(pool: SqlitePool) -> Self {
        Self { pool }
    }

    async fn lease(&self) -> Result<PoolConnection<Sqlite>> {
        self.pool
            .acquire()
            .await
            .map_err(Error::storage("failed to connect to database"))
    }
}

sql_product_store!(
    SqliteStore,
    create_table = CREATE_TABLE,
    insert_id = |res: SqliteQueryResult| -> Result<i64> { Ok(res.last_insert_rowid()) },
);
