//! Row mapping between protobuf messages and `Product` table rows.

use chrono::{DateTime, Utc};
use product_tonic_core::{
    Error, Result,
    proto::Product,
    timestamp::{from_datetime, to_datetime},
};

/// A `Product` row as read from storage, decoded by column name.
///
/// Text columns are nullable in the schema; `NULL` maps to an empty string
/// on the wire.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
#[sqlx(rename_all = "PascalCase")]
pub struct ProductRow {
    #[sqlx(rename = "ID")]
    pub id: i64,
    pub name: Option<String>,
    pub price: Option<String>,
    pub creator: Option<String>,
    pub unit: Option<String>,
    pub category: Option<String>,
    pub description: Option<String>,
    pub date: Option<DateTime<Utc>>,
}

impl From<ProductRow> for Product {
    fn from(row: ProductRow) -> Self {
        Product {
            id: row.id,
            name: row.name.unwrap_or_default(),
            price: row.price.unwrap_or_default(),
            creator: row.creator.unwrap_or_default(),
            unit: row.unit.unwrap_or_default(),
            category: row.category.unwrap_or_default(),
            description: row.description.unwrap_or_default(),
            date: row.date.as_ref().map(from_datetime),
        }
    }
}

/// The mutable columns of a product, validated and ready to bind.
///
/// Bind order is `Name, Price, Creator, Unit, Category, Description, Date`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductFields {
    pub name: String,
    pub price: String,
    pub creator: String,
    pub unit: String,
    pub category: String,
    pub description: String,
    pub date: DateTime<Utc>,
}

impl TryFrom<Product> for ProductFields {
    type Error = Error;

    /// Fails with [`Error::InvalidTimestamp`] if `date` is missing or out of
    /// range. The message `id` is not part of the fields.
    fn try_from(product: Product) -> Result<Self> {
        let date = to_datetime(product.date.as_ref())?;
        Ok(Self {
            name: product.name,
            price: product.price,
            creator: product.creator,
            unit: product.unit,
            category: product.category,
            description: product.description,
            date,
        })
    }
}
