//! Persistent backend over an embedded SQLite database
//!
//! Opening the store runs the versioned schema upgrade before the value
//! exists, so no contract method can race initialization. Bulk mutations
//! run inside one transaction per call with entries applied sequentially,
//! which keeps failure attribution deterministic.

use std::path::Path;

use serde_json::Value as JsonValue;
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use tokio::sync::RwLock;
use tracing::{info, warn};
use uuid::Uuid;

use crate::db::item::Item;
use crate::db::movement::Movement;
use crate::db::sqlite_helpers::{datetime_to_str, decimal_to_str, uuid_to_str};
use crate::db::{SETTINGS_KEY, StoreStats, schema};
use crate::error::{Result, StoreError};

const ITEM_COLUMNS: &str = "id, name, sku, qty, cost, location, updated_at";
const MOVEMENT_COLUMNS: &str =
    "id, item_id, action, before_qty, after_qty, delta, reason, recorded_at";

const UPSERT_ITEM_SQL: &str = r#"
    INSERT INTO items (id, name, sku, qty, cost, location, updated_at)
    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
    ON CONFLICT (id) DO UPDATE SET
        name = excluded.name,
        sku = excluded.sku,
        qty = excluded.qty,
        cost = excluded.cost,
        location = excluded.location,
        updated_at = excluded.updated_at
"#;

/// SQLite-backed store for items, movements, and settings.
pub struct SqliteStore {
    pool: SqlitePool,
    /// Transient snapshot of the items table, dropped on every mutation.
    /// Reads between mutations are served from here without touching the
    /// database.
    cache: RwLock<Option<Vec<Item>>>,
}

impl SqliteStore {
    /// Open (creating if missing) the database at `path` and bring its
    /// schema up to date. Any failure here is fatal to the instance.
    pub async fn open(path: &Path, max_connections: u32) -> Result<Self> {
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await
            .map_err(StoreError::Initialization)?;

        schema::upgrade(&pool)
            .await
            .map_err(StoreError::Initialization)?;

        info!(path = %path.display(), "Opened inventory store");
        Ok(Self {
            pool,
            cache: RwLock::new(None),
        })
    }

    async fn invalidate_cache(&self) {
        *self.cache.write().await = None;
    }

    /// Every stored item, unordered. Fresh snapshot per call; the caller
    /// owns ordering.
    pub async fn all(&self) -> Result<Vec<Item>> {
        if let Some(items) = self.cache.read().await.as_ref() {
            return Ok(items.clone());
        }

        let items = sqlx::query_as::<_, Item>(&format!("SELECT {} FROM items", ITEM_COLUMNS))
            .fetch_all(&self.pool)
            .await?;

        *self.cache.write().await = Some(items.clone());
        Ok(items)
    }

    /// Insert `item`, or fully replace the stored record with the same id.
    pub async fn upsert(&self, item: &Item) -> Result<()> {
        bind_item(sqlx::query(UPSERT_ITEM_SQL), item)
            .execute(&self.pool)
            .await?;
        self.invalidate_cache().await;
        Ok(())
    }

    /// Upsert each entry in order within one transaction. The first
    /// failing entry aborts the call with [StoreError::BulkAborted]; the
    /// transaction then rolls back, so no entry from an aborted call is
    /// persisted. There is no atomicity across calls.
    pub async fn bulk_upsert(&self, items: &[Item]) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        for (index, item) in items.iter().enumerate() {
            bind_item(sqlx::query(UPSERT_ITEM_SQL), item)
                .execute(&mut *tx)
                .await
                .map_err(|e| StoreError::BulkAborted {
                    index,
                    id: item.id,
                    source: e,
                })?;
        }
        tx.commit().await?;
        self.invalidate_cache().await;
        Ok(())
    }

    /// Remove each matching record in order within one transaction.
    /// Missing ids are silently ignored.
    pub async fn bulk_remove(&self, ids: &[Uuid]) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        for (index, id) in ids.iter().enumerate() {
            sqlx::query("DELETE FROM items WHERE id = ?1")
                .bind(uuid_to_str(*id))
                .execute(&mut *tx)
                .await
                .map_err(|e| StoreError::BulkAborted {
                    index,
                    id: *id,
                    source: e,
                })?;
        }
        tx.commit().await?;
        self.invalidate_cache().await;
        Ok(())
    }

    /// Delete the record with `id` if present; no-op when absent.
    pub async fn remove(&self, id: Uuid) -> Result<()> {
        sqlx::query("DELETE FROM items WHERE id = ?1")
            .bind(uuid_to_str(id))
            .execute(&self.pool)
            .await?;
        self.invalidate_cache().await;
        Ok(())
    }

    /// Remove all items and movements and drop the read cache. Settings
    /// survive; this is a data-only reset.
    pub async fn clear(&self) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM items").execute(&mut *tx).await?;
        sqlx::query("DELETE FROM movements")
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        self.invalidate_cache().await;
        Ok(())
    }

    /// First record whose sku equals `sku`. The sku index is non-unique;
    /// which of several duplicates is returned is unspecified.
    pub async fn find_by_sku(&self, sku: &str) -> Result<Option<Item>> {
        let item = sqlx::query_as::<_, Item>(&format!(
            "SELECT {} FROM items WHERE sku = ?1 LIMIT 1",
            ITEM_COLUMNS
        ))
        .bind(sku)
        .fetch_optional(&self.pool)
        .await?;
        Ok(item)
    }

    /// Aggregate view over all items, computed fresh per call.
    pub async fn stats(&self) -> Result<StoreStats> {
        Ok(StoreStats::from_items(&self.all().await?))
    }

    /// Items at or below `threshold` quantity.
    pub async fn low_stock(&self, threshold: i64) -> Result<Vec<Item>> {
        let mut items = self.all().await?;
        items.retain(|i| i.qty <= threshold);
        Ok(items)
    }

    /// Append one movement row.
    pub async fn record_movement(&self, movement: &Movement) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO movements (id, item_id, action, before_qty, after_qty, delta, reason, recorded_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
        )
        .bind(uuid_to_str(movement.id))
        .bind(uuid_to_str(movement.item_id))
        .bind(movement.action.as_str())
        .bind(movement.before_qty)
        .bind(movement.after_qty)
        .bind(movement.delta)
        .bind(movement.reason.as_deref())
        .bind(datetime_to_str(movement.recorded_at))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Movement history for one item, most recent first.
    pub async fn movements_for_item(&self, item_id: Uuid) -> Result<Vec<Movement>> {
        let movements = sqlx::query_as::<_, Movement>(&format!(
            "SELECT {} FROM movements WHERE item_id = ?1 ORDER BY recorded_at DESC",
            MOVEMENT_COLUMNS
        ))
        .bind(uuid_to_str(item_id))
        .fetch_all(&self.pool)
        .await?;
        Ok(movements)
    }

    /// Latest movements across all items, most recent first.
    pub async fn recent_movements(&self, limit: u32) -> Result<Vec<Movement>> {
        let movements = sqlx::query_as::<_, Movement>(&format!(
            "SELECT {} FROM movements ORDER BY recorded_at DESC LIMIT ?1",
            MOVEMENT_COLUMNS
        ))
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(movements)
    }

    /// The application settings value, or `None` when never saved.
    ///
    /// Fails open: a retrieval or decode error is logged and reported as
    /// "no settings", since missing settings are a valid, expected state
    /// that the caller resolves with defaults.
    pub async fn load_settings(&self) -> Option<JsonValue> {
        let row: std::result::Result<Option<(String,)>, sqlx::Error> =
            sqlx::query_as("SELECT value FROM settings WHERE key = ?1")
                .bind(SETTINGS_KEY)
                .fetch_optional(&self.pool)
                .await;

        match row {
            Ok(Some((raw,))) => match serde_json::from_str(&raw) {
                Ok(value) => Some(value),
                Err(e) => {
                    warn!("Stored settings are not valid JSON, using defaults: {}", e);
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                warn!("Failed to load settings, using defaults: {}", e);
                None
            }
        }
    }

    /// Replace the settings record wholesale.
    pub async fn save_settings(&self, value: &JsonValue) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO settings (key, value)
            VALUES (?1, ?2)
            ON CONFLICT (key) DO UPDATE SET value = excluded.value
            "#,
        )
        .bind(SETTINGS_KEY)
        .bind(value.to_string())
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

fn bind_item<'q>(
    query: sqlx::query::Query<'q, sqlx::Sqlite, sqlx::sqlite::SqliteArguments<'q>>,
    item: &'q Item,
) -> sqlx::query::Query<'q, sqlx::Sqlite, sqlx::sqlite::SqliteArguments<'q>> {
    query
        .bind(uuid_to_str(item.id))
        .bind(&item.name)
        .bind(item.sku.as_deref())
        .bind(item.qty)
        .bind(decimal_to_str(item.cost))
        .bind(item.location.as_deref())
        .bind(datetime_to_str(item.updated_at))
}
