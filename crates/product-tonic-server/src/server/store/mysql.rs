use super::ProductFields;
use chrono::{DateTime, Utc};
use core::time::Duration;
use product_tonic_core::{Error, Result};
use sqlx::{
    MySql, MySqlPool,
    mysql::{MySqlPoolOptions, MySqlQueryResult},
    pool::PoolConnection,
};

// DATETIME rather than TIMESTAMP: TIMESTAMP stops at 2038-01-19 and cannot
// hold the epoch itself. sqlx pins the session time zone to UTC on connect.
const CREATE_TABLE: &str = "CREATE TABLE IF NOT EXISTS `Product` (\
     `ID` bigint(20) NOT NULL AUTO_INCREMENT,\
     `Name` varchar(200) DEFAULT NULL,\
     `Price` varchar(200) DEFAULT NULL,\
     `Creator` varchar(200) DEFAULT NULL,\
     `Unit` varchar(200) DEFAULT NULL,\
     `Category` varchar(200) DEFAULT NULL,\
     `Description` varchar(1024) DEFAULT NULL,\
     `Date` datetime(6) NULL DEFAULT NULL,\
     PRIMARY KEY (`ID`),\
     UNIQUE KEY `ID_UNIQUE` (`ID`))";

/// Seconds of `1000-01-01T00:00:00Z`, the earliest value a MySQL `DATETIME`
/// column accepts. The upper bound (`9999-12-31`) matches the wire range.
pub const MIN_DATETIME_SECONDS: i64 = -30_610_224_000;

/// MySQL-backed [`ProductStore`](super::ProductStore).
#[derive(Clone, Debug)]
pub struct MySqlStore {
    pool: MySqlPool,
}

impl MySqlStore {
    /// Opens a pool against `url`. The pool connects lazily, so a database
    /// that is briefly unavailable at startup only fails the first lease.
    pub async fn connect(
        url: &str,
        max_connections: u32,
        acquire_timeout: Duration,
    ) -> core::result::Result<Self, sqlx::Error> {
        let pool = MySqlPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(acquire_timeout)
            .connect_lazy(url)?;
        Ok(Self::from_pool(pool))
    }

    pub fn from_pool(pool: MySqlPool) -> Self {
        Self { pool }
    }

    async fn lease(&self) -> Result<PoolConnection<MySql>> {
        self.pool
            .acquire()
            .await
            .map_err(Error::storage("failed to connect to database"))
    }
}

/// Rejects dates the `DATETIME` column cannot store, before any connection
/// is leased.
fn check_date_range(fields: &ProductFields) -> Result<()> {
    check_datetime(&fields.date)
}

fn check_datetime(date: &DateTime<Utc>) -> Result<()> {
    if date.timestamp() < MIN_DATETIME_SECONDS {
        return Err(Error::InvalidTimestamp {
            reason: format!("timestamp: {date} before 1000-01-01"),
        });
    }
    Ok(())
}

sql_product_store!(
    MySqlStore,
    create_table = CREATE_TABLE,
    insert_id = |res: MySqlQueryResult| -> Result<i64> {
        i64::try_from(res.last_insert_id())
            .map_err(Error::storage("failed to retrieve id for created Product"))
    },
    check = check_date_range,
);
