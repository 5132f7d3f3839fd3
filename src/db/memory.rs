//! In-memory fallback backend
//!
//! Used when no persistent storage is available. State lives for the
//! process lifetime only and is discarded on exit; the selector surfaces
//! this through [Store::is_persistent](crate::db::Store::is_persistent)
//! so the caller can warn the user. The read-only flag turns every
//! mutation into an immediate [StoreError::ReadOnly] without touching
//! state.

use std::collections::HashMap;

use serde_json::Value as JsonValue;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::db::item::Item;
use crate::db::movement::Movement;
use crate::db::StoreStats;
use crate::error::{Result, StoreError};

#[derive(Default)]
struct MemoryState {
    items: HashMap<Uuid, Item>,
    movements: Vec<Movement>,
    settings: Option<JsonValue>,
}

/// Process-lifetime store holding items in a map keyed by id.
pub struct MemoryStore {
    state: RwLock<MemoryState>,
    read_only: bool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            state: RwLock::new(MemoryState::default()),
            read_only: false,
        }
    }

    /// A store whose mutating operations all fail with
    /// [StoreError::ReadOnly]. The selector uses this when the host has
    /// no persistent storage, so a session can still browse whatever the
    /// controller loads without pretending writes stick.
    pub fn read_only() -> Self {
        Self {
            state: RwLock::new(MemoryState::default()),
            read_only: true,
        }
    }

    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    fn check_writable(&self) -> Result<()> {
        if self.read_only {
            return Err(StoreError::ReadOnly);
        }
        Ok(())
    }

    pub async fn all(&self) -> Result<Vec<Item>> {
        Ok(self.state.read().await.items.values().cloned().collect())
    }

    pub async fn upsert(&self, item: &Item) -> Result<()> {
        self.check_writable()?;
        self.state.write().await.items.insert(item.id, item.clone());
        Ok(())
    }

    /// Upsert each entry in order. Map inserts cannot fail, so unlike the
    /// SQLite backend this never aborts partway; were it extended with a
    /// failing path, entries applied before the abort would stay applied.
    pub async fn bulk_upsert(&self, items: &[Item]) -> Result<()> {
        self.check_writable()?;
        let mut state = self.state.write().await;
        for item in items {
            state.items.insert(item.id, item.clone());
        }
        Ok(())
    }

    pub async fn bulk_remove(&self, ids: &[Uuid]) -> Result<()> {
        self.check_writable()?;
        let mut state = self.state.write().await;
        for id in ids {
            state.items.remove(id);
        }
        Ok(())
    }

    pub async fn remove(&self, id: Uuid) -> Result<()> {
        self.check_writable()?;
        self.state.write().await.items.remove(&id);
        Ok(())
    }

    pub async fn clear(&self) -> Result<()> {
        self.check_writable()?;
        let mut state = self.state.write().await;
        state.items.clear();
        state.movements.clear();
        Ok(())
    }

    pub async fn find_by_sku(&self, sku: &str) -> Result<Option<Item>> {
        Ok(self
            .state
            .read()
            .await
            .items
            .values()
            .find(|i| i.sku.as_deref() == Some(sku))
            .cloned())
    }

    pub async fn stats(&self) -> Result<StoreStats> {
        Ok(StoreStats::from_items(&self.all().await?))
    }

    pub async fn low_stock(&self, threshold: i64) -> Result<Vec<Item>> {
        let mut items = self.all().await?;
        items.retain(|i| i.qty <= threshold);
        Ok(items)
    }

    pub async fn record_movement(&self, movement: &Movement) -> Result<()> {
        self.check_writable()?;
        self.state.write().await.movements.push(movement.clone());
        Ok(())
    }

    pub async fn movements_for_item(&self, item_id: Uuid) -> Result<Vec<Movement>> {
        let state = self.state.read().await;
        let mut movements: Vec<Movement> = state
            .movements
            .iter()
            .filter(|m| m.item_id == item_id)
            .cloned()
            .collect();
        movements.sort_by(|a, b| b.recorded_at.cmp(&a.recorded_at));
        Ok(movements)
    }

    pub async fn recent_movements(&self, limit: u32) -> Result<Vec<Movement>> {
        let state = self.state.read().await;
        let mut movements: Vec<Movement> = state.movements.clone();
        movements.sort_by(|a, b| b.recorded_at.cmp(&a.recorded_at));
        movements.truncate(limit as usize);
        Ok(movements)
    }

    pub async fn load_settings(&self) -> Option<JsonValue> {
        self.state.read().await.settings.clone()
    }

    pub async fn save_settings(&self, value: &JsonValue) -> Result<()> {
        self.check_writable()?;
        self.state.write().await.settings = Some(value.clone());
        Ok(())
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}
