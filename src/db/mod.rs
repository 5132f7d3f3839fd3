//! Store backends and selection
//!
//! One interface type, [Store], over a closed set of two variants: the
//! persistent SQLite backend and the in-memory fallback. The variant is
//! chosen once at construction by [Store::open] and dispatched by match;
//! there is no runtime downgrade if the persistent backend later fails.

pub mod item;
pub mod memory;
pub mod movement;
pub mod schema;
pub mod sqlite;
pub mod sqlite_helpers;

use std::collections::HashSet;
use std::path::Path;

use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::Value as JsonValue;
use tracing::warn;
use uuid::Uuid;

pub use item::Item;
pub use memory::MemoryStore;
pub use movement::{Movement, MovementAction};
pub use sqlite::SqliteStore;

use crate::config::StoreConfig;
use crate::error::Result;

/// Key of the single settings record. Exactly one settings value exists
/// at a time; saving replaces it wholesale.
pub const SETTINGS_KEY: &str = "app";

/// Aggregate view over the item collection, computed fresh from a full
/// snapshot on every call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoreStats {
    /// Number of stored items.
    pub items: usize,
    /// Sum of all quantities.
    pub total_qty: i64,
    /// Sum of `qty * cost` over all items.
    pub total_value: Decimal,
    /// Number of distinct non-empty location labels.
    pub locations: usize,
}

impl StoreStats {
    pub fn from_items(items: &[Item]) -> Self {
        let mut total_qty = 0;
        let mut total_value = Decimal::ZERO;
        let mut locations = HashSet::new();
        for item in items {
            total_qty += item.qty;
            total_value += Decimal::from(item.qty) * item.cost;
            if let Some(location) = item.location.as_deref() {
                if !location.is_empty() {
                    locations.insert(location);
                }
            }
        }
        Self {
            items: items.len(),
            total_qty,
            total_value,
            locations: locations.len(),
        }
    }
}

/// The store handle the Application Controller dispatches every mutation
/// and query through. Owned for the process lifetime.
pub enum Store {
    Sqlite(SqliteStore),
    Memory(MemoryStore),
}

impl Store {
    /// Select and construct a backend. Made once per process: if the
    /// config names a database path whose directory is usable, the SQLite
    /// backend is opened (awaiting schema readiness); otherwise a
    /// read-only in-memory fallback is returned. An open failure after a
    /// successful probe propagates as
    /// [Initialization](crate::error::StoreError::Initialization) rather
    /// than silently downgrading.
    pub async fn open(config: &StoreConfig) -> Result<Self> {
        match &config.database_path {
            Some(path) if storage_dir_usable(path) => Ok(Self::Sqlite(
                SqliteStore::open(path, config.max_connections).await?,
            )),
            Some(path) => {
                warn!(
                    path = %path.display(),
                    "Storage directory unusable, falling back to read-only in-memory store"
                );
                Ok(Self::Memory(MemoryStore::read_only()))
            }
            None => {
                warn!("No database path configured, using read-only in-memory store");
                Ok(Self::Memory(MemoryStore::read_only()))
            }
        }
    }

    /// A writable in-memory store (ephemeral sessions, tests).
    pub fn in_memory() -> Self {
        Self::Memory(MemoryStore::new())
    }

    /// Whether state survives process exit. The controller shows a
    /// persistent warning banner when this is false.
    pub fn is_persistent(&self) -> bool {
        matches!(self, Self::Sqlite(_))
    }

    pub fn is_read_only(&self) -> bool {
        match self {
            Self::Sqlite(_) => false,
            Self::Memory(m) => m.is_read_only(),
        }
    }

    /// Every stored item, unordered, as a fresh snapshot.
    pub async fn all(&self) -> Result<Vec<Item>> {
        match self {
            Self::Sqlite(s) => s.all().await,
            Self::Memory(m) => m.all().await,
        }
    }

    /// Insert `item`, or fully replace the record with the same id. No
    /// partial-field merge; callers supply the complete record.
    pub async fn upsert(&self, item: &Item) -> Result<()> {
        match self {
            Self::Sqlite(s) => s.upsert(item).await,
            Self::Memory(m) => m.upsert(item).await,
        }
    }

    /// Upsert each entry sequentially within one per-call scope. Best
    /// effort: a failure partway surfaces as
    /// [BulkAborted](crate::error::StoreError::BulkAborted) naming the
    /// entry; whether earlier entries remain applied is backend-specific
    /// (SQLite rolls the call back, memory does not). No cross-call
    /// atomicity.
    pub async fn bulk_upsert(&self, items: &[Item]) -> Result<()> {
        match self {
            Self::Sqlite(s) => s.bulk_upsert(items).await,
            Self::Memory(m) => m.bulk_upsert(items).await,
        }
    }

    /// Remove each matching record; missing ids are silently ignored.
    pub async fn bulk_remove(&self, ids: &[Uuid]) -> Result<()> {
        match self {
            Self::Sqlite(s) => s.bulk_remove(ids).await,
            Self::Memory(m) => m.bulk_remove(ids).await,
        }
    }

    /// Delete the record with `id` if present; no-op when absent.
    pub async fn remove(&self, id: Uuid) -> Result<()> {
        match self {
            Self::Sqlite(s) => s.remove(id).await,
            Self::Memory(m) => m.remove(id).await,
        }
    }

    /// Remove all items and movements and drop any read cache. Settings
    /// are unaffected.
    pub async fn clear(&self) -> Result<()> {
        match self {
            Self::Sqlite(s) => s.clear().await,
            Self::Memory(m) => m.clear().await,
        }
    }

    /// First record with that sku, or `None`. Among duplicate skus, which
    /// record is returned is unspecified.
    pub async fn find_by_sku(&self, sku: &str) -> Result<Option<Item>> {
        match self {
            Self::Sqlite(s) => s.find_by_sku(sku).await,
            Self::Memory(m) => m.find_by_sku(sku).await,
        }
    }

    /// Aggregate statistics over all items.
    pub async fn stats(&self) -> Result<StoreStats> {
        match self {
            Self::Sqlite(s) => s.stats().await,
            Self::Memory(m) => m.stats().await,
        }
    }

    /// Items whose quantity is at or below `threshold`.
    pub async fn low_stock(&self, threshold: i64) -> Result<Vec<Item>> {
        match self {
            Self::Sqlite(s) => s.low_stock(threshold).await,
            Self::Memory(m) => m.low_stock(threshold).await,
        }
    }

    /// Append one movement to the log.
    pub async fn record_movement(&self, movement: &Movement) -> Result<()> {
        match self {
            Self::Sqlite(s) => s.record_movement(movement).await,
            Self::Memory(m) => m.record_movement(movement).await,
        }
    }

    /// Movement history for one item, most recent first.
    pub async fn movements_for_item(&self, item_id: Uuid) -> Result<Vec<Movement>> {
        match self {
            Self::Sqlite(s) => s.movements_for_item(item_id).await,
            Self::Memory(m) => m.movements_for_item(item_id).await,
        }
    }

    /// Latest movements across all items, most recent first.
    pub async fn recent_movements(&self, limit: u32) -> Result<Vec<Movement>> {
        match self {
            Self::Sqlite(s) => s.recent_movements(limit).await,
            Self::Memory(m) => m.recent_movements(limit).await,
        }
    }

    /// The settings value, or `None` when never saved or on any retrieval
    /// error (fail-open; the caller owns defaulting).
    pub async fn load_settings(&self) -> Option<JsonValue> {
        match self {
            Self::Sqlite(s) => s.load_settings().await,
            Self::Memory(m) => m.load_settings().await,
        }
    }

    /// Replace the settings record wholesale.
    pub async fn save_settings(&self, value: &JsonValue) -> Result<()> {
        match self {
            Self::Sqlite(s) => s.save_settings(value).await,
            Self::Memory(m) => m.save_settings(value).await,
        }
    }
}

/// Probe whether the directory holding `path` exists (or can be created)
/// and accepts writes.
fn storage_dir_usable(path: &Path) -> bool {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => std::path::PathBuf::from("."),
    };
    if std::fs::create_dir_all(&dir).is_err() {
        return false;
    }
    let probe = dir.join(".stockroom-write-probe");
    match std::fs::write(&probe, b"probe") {
        Ok(()) => {
            let _ = std::fs::remove_file(&probe);
            true
        }
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn item(qty: i64, cost: &str, location: Option<&str>) -> Item {
        Item {
            id: Uuid::new_v4(),
            name: "widget".to_string(),
            sku: None,
            qty,
            cost: cost.parse().unwrap(),
            location: location.map(str::to_string),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_stats_aggregation() {
        let items = [
            item(2, "5", Some("A")),
            item(3, "1", Some("A")),
            item(0, "9", Some("B")),
        ];
        let stats = StoreStats::from_items(&items);
        assert_eq!(stats.items, 3);
        assert_eq!(stats.total_qty, 5);
        assert_eq!(stats.total_value, Decimal::from(13));
        assert_eq!(stats.locations, 2);
    }

    #[test]
    fn test_stats_ignores_empty_locations() {
        let items = [item(1, "1", Some("")), item(1, "1", None)];
        let stats = StoreStats::from_items(&items);
        assert_eq!(stats.locations, 0);
    }

    #[test]
    fn test_stats_empty() {
        let stats = StoreStats::from_items(&[]);
        assert_eq!(stats.items, 0);
        assert_eq!(stats.total_qty, 0);
        assert_eq!(stats.total_value, Decimal::ZERO);
        assert_eq!(stats.locations, 0);
    }
}
