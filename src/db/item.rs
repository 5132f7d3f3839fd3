//! Inventory item record

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::sqlite_helpers::{str_to_datetime, str_to_decimal, str_to_uuid};

/// One inventory record.
///
/// Callers supply fully-formed items: id generation, timestamp stamping,
/// and field validation (non-empty `name`, `qty >= 0`, non-negative
/// `cost`) happen above this layer. The store treats the record as
/// opaque apart from keying on `id` and indexing the queryable fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    /// Primary key, assigned at creation, immutable.
    pub id: Uuid,
    /// Display label.
    pub name: String,
    /// Optional secondary identifier. Uniqueness is NOT enforced; duplicate
    /// skus are a UI-level warning, not a storage invariant.
    pub sku: Option<String>,
    /// On-hand quantity. Callers never pass a negative value; the store
    /// does not clamp.
    pub qty: i64,
    /// Unit cost.
    pub cost: Decimal,
    /// Optional free-text location label.
    pub location: Option<String>,
    /// Stamped by the caller on every create/update.
    pub updated_at: DateTime<Utc>,
}

impl sqlx::FromRow<'_, sqlx::sqlite::SqliteRow> for Item {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> sqlx::Result<Self> {
        use sqlx::Row;

        let id_str: String = row.try_get("id")?;
        let cost_str: String = row.try_get("cost")?;
        let updated_str: String = row.try_get("updated_at")?;

        Ok(Self {
            id: str_to_uuid(&id_str).map_err(|e| sqlx::Error::Decode(e.into()))?,
            name: row.try_get("name")?,
            sku: row.try_get("sku")?,
            qty: row.try_get("qty")?,
            cost: str_to_decimal(&cost_str).map_err(|e| sqlx::Error::Decode(e.into()))?,
            location: row.try_get("location")?,
            updated_at: str_to_datetime(&updated_str).map_err(|e| sqlx::Error::Decode(e.into()))?,
        })
    }
}
