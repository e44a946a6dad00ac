//! Relational storage for products.
//!
//! [`ProductStore`] is the seam between the gRPC handler and SQL. Each
//! backend owns a `sqlx` pool and leases exactly one connection per call;
//! the lease is a `PoolConnection` that returns to the pool when dropped, so
//! it is released on every exit path.
//!
//! The store reports raw SQL outcomes (row lists, affected-row counts). The
//! decisions that turn those into `NOT_FOUND` or integrity errors are made
//! by the handler.
//!
//! ## Backends
//!
//! - [`mysql::MySqlStore`] - `mysql://` URLs.
//! - [`sqlite::SqliteStore`] - `sqlite:` URLs, including `sqlite::memory:`.

/// Implements [`ProductStore`] over the shared statements for a backend type
/// that has a `pool` field and a `lease()` method.
///
/// - `create_table`: the backend's DDL.
/// - `insert_id`: reads the generated id out of the insert's query result.
/// - `check`: optional backend-specific validation run before leasing a
///   connection for Create and Update.
macro_rules! sql_product_store {
    (
        $store:ty,
        create_table = $create_table:expr,
        insert_id = $insert_id:expr
        $(, check = $check:expr)?
        $(,)?
    ) => {
        #[::tonic::async_trait]
        impl $crate::server::store::ProductStore for $store {
            async fn init_schema(&self) -> ::product_tonic_core::Result<()> {
                let mut conn = self.lease().await?;
                ::sqlx::query($create_table)
                    .execute(&mut *conn)
                    .await
                    .map_err(::product_tonic_core::Error::storage("failed to create table"))?;
                Ok(())
            }

            async fn insert(
                &self,
                fields: &$crate::server::store::ProductFields,
            ) -> ::product_tonic_core::Result<i64> {
                $( ($check)(fields)?; )?
                let mut conn = self.lease().await?;
                let res = ::sqlx::query($crate::server::store::INSERT)
                    .bind(&fields.name)
                    .bind(&fields.price)
                    .bind(&fields.creator)
                    .bind(&fields.unit)
                    .bind(&fields.category)
                    .bind(&fields.description)
                    .bind(fields.date)
                    .execute(&mut *conn)
                    .await
                    .map_err(::product_tonic_core::Error::storage("failed to insert into Product"))?;
                ($insert_id)(res)
            }

            async fn select_by_id(
                &self,
                id: i64,
            ) -> ::product_tonic_core::Result<Vec<$crate::server::store::ProductRow>> {
                let mut conn = self.lease().await?;
                ::sqlx::query_as::<_, $crate::server::store::ProductRow>(
                    $crate::server::store::SELECT_BY_ID,
                )
                .bind(id)
                .fetch_all(&mut *conn)
                .await
                .map_err(::product_tonic_core::Error::storage("failed to select from Product"))
            }

            async fn update(
                &self,
                id: i64,
                fields: &$crate::server::store::ProductFields,
            ) -> ::product_tonic_core::Result<u64> {
                $( ($check)(fields)?; )?
                let mut conn = self.lease().await?;
                let res = ::sqlx::query($crate::server::store::UPDATE)
                    .bind(&fields.name)
                    .bind(&fields.price)
                    .bind(&fields.creator)
                    .bind(&fields.unit)
                    .bind(&fields.category)
                    .bind(&fields.description)
                    .bind(fields.date)
                    .bind(id)
                    .execute(&mut *conn)
                    .await
                    .map_err(::product_tonic_core::Error::storage("failed to update Product"))?;
                Ok(res.rows_affected())
            }

            async fn delete(&self, id: i64) -> ::product_tonic_core::Result<u64> {
                let mut conn = self.lease().await?;
                let res = ::sqlx::query($crate::server::store::DELETE)
                    .bind(id)
                    .execute(&mut *conn)
                    .await
                    .map_err(::product_tonic_core::Error::storage("failed to delete Product"))?;
                Ok(res.rows_affected())
            }

            async fn select_all(
                &self,
            ) -> ::product_tonic_core::Result<Vec<$crate::server::store::ProductRow>> {
                let mut conn = self.lease().await?;
                ::sqlx::query_as::<_, $crate::server::store::ProductRow>(
                    $crate::server::store::SELECT_ALL,
                )
                .fetch_all(&mut *conn)
                .await
                .map_err(::product_tonic_core::Error::storage("failed to select from Product"))
            }

            async fn close(&self) {
                self.pool.close().await;
            }
        }
    };
}

pub mod mysql;
pub mod row;
pub mod sqlite;

use crate::server::config::ServerConfig;
use anyhow::{Context, bail};
use product_tonic_core::Result;
use std::sync::Arc;

pub use row::{ProductFields, ProductRow};

// Every statement uses the same canonical column order:
// ID, Name, Price, Creator, Unit, Category, Description, Date.
pub(crate) const SELECT_BY_ID: &str = "SELECT \
     `ID`, `Name`, `Price`, `Creator`, `Unit`, `Category`, `Description`, `Date` \
     FROM Product WHERE `ID` = ?";

pub(crate) const SELECT_ALL: &str = "SELECT \
     `ID`, `Name`, `Price`, `Creator`, `Unit`, `Category`, `Description`, `Date` \
     FROM Product";

pub(crate) const INSERT: &str = "INSERT INTO Product \
     (`Name`, `Price`, `Creator`, `Unit`, `Category`, `Description`, `Date`) \
     VALUES (?, ?, ?, ?, ?, ?, ?)";

pub(crate) const UPDATE: &str = "UPDATE Product SET \
     `Name` = ?, `Price` = ?, `Creator` = ?, `Unit` = ?, `Category` = ?, `Description` = ?, `Date` = ? \
     WHERE `ID` = ?";

pub(crate) const DELETE: &str = "DELETE FROM Product WHERE `ID` = ?";

/// Storage operations backing the product service.
#[tonic::async_trait]
pub trait ProductStore: Send + Sync + 'static {
    /// Creates the `Product` table if it does not exist. Idempotent.
    async fn init_schema(&self) -> Result<()>;

    /// Inserts a product and returns the generated id.
    async fn insert(&self, fields: &ProductFields) -> Result<i64>;

    /// Returns every row whose `ID` equals `id`. More than one row means the
    /// uniqueness invariant was broken.
    async fn select_by_id(&self, id: i64) -> Result<Vec<ProductRow>>;

    /// Overwrites every mutable column of row `id`, returning rows affected.
    async fn update(&self, id: i64, fields: &ProductFields) -> Result<u64>;

    /// Deletes row `id`, returning rows affected.
    async fn delete(&self, id: i64) -> Result<u64>;

    /// Returns all rows in storage order.
    async fn select_all(&self) -> Result<Vec<ProductRow>>;

    /// Closes the pool. Pending leases finish; new ones fail.
    async fn close(&self);
}

/// Opens the backend named by the scheme of `config.database_url`.
pub async fn connect(config: &ServerConfig) -> anyhow::Result<Arc<dyn ProductStore>> {
    let url = config.database_url.as_str();
    let store: Arc<dyn ProductStore> = if url.starts_with("mysql://") {
        Arc::new(
            mysql::MySqlStore::connect(url, config.db_max_connections, config.db_acquire_timeout)
                .await
                .context("failed to open MySQL pool")?,
        )
    } else if url.starts_with("sqlite:") {
        Arc::new(
            sqlite::SqliteStore::connect(url, config.db_max_connections, config.db_acquire_timeout)
                .await
                .context("failed to open SQLite pool")?,
        )
    } else {
        bail!("unsupported database URL scheme in `{}`", redact(url));
    };
    Ok(store)
}

/// Hides the password component of a connection URL for logs and errors.
pub fn redact(url: &str) -> String {
    let Some((scheme, rest)) = url.split_once("://") else {
        return url.to_string();
    };
    let Some((userinfo, host)) = rest.rsplit_once('@') else {
        return url.to_string();
    };
    match userinfo.split_once(':') {
        Some((user, _)) => format!("{scheme}://{user}:***@{host}"),
        None => url.to_string(),
    }
}
