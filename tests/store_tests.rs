//! Integration tests for the store contract
//!
//! Every contract property is exercised against both backends: the
//! SQLite store on a temporary file and the in-memory store. Durability,
//! schema reopening, and the read-only fallback are backend-specific and
//! tested separately at the end.

use assert_matches::assert_matches;
use chrono::{Duration, Utc};
use rust_decimal::Decimal;
use pretty_assertions::assert_eq;
use serde_json::json;
use tempfile::TempDir;
use uuid::Uuid;

use stockroom::{Item, Movement, Store, StoreConfig, StoreError};

fn item(name: &str, sku: Option<&str>, qty: i64, cost: &str, location: Option<&str>) -> Item {
    Item {
        id: Uuid::new_v4(),
        name: name.to_string(),
        sku: sku.map(str::to_string),
        qty,
        cost: cost.parse().unwrap(),
        location: location.map(str::to_string),
        updated_at: Utc::now(),
    }
}

async fn sqlite_store() -> (Store, TempDir) {
    let dir = TempDir::new().unwrap();
    let config = StoreConfig::at_path(dir.path().join("test.db"));
    let store = Store::open(&config).await.unwrap();
    assert!(store.is_persistent());
    (store, dir)
}

fn memory_store() -> Store {
    Store::in_memory()
}

// Run one contract check against both backends.
macro_rules! both_backends {
    ($name:ident, $check:ident) => {
        mod $name {
            use super::*;

            #[tokio::test]
            async fn sqlite() {
                let (store, _dir) = sqlite_store().await;
                $check(&store).await;
            }

            #[tokio::test]
            async fn memory() {
                let store = memory_store();
                $check(&store).await;
            }
        }
    };
}

async fn check_upsert_then_read_back(store: &Store) {
    let a = item("Hex bolts", Some("HB-10"), 40, "0.12", Some("Aisle 3"));
    store.upsert(&a).await.unwrap();

    let all = store.all().await.unwrap();
    assert_eq!(all, vec![a.clone()]);

    let found = store.find_by_sku("HB-10").await.unwrap().unwrap();
    assert_eq!(found, a);
}
both_backends!(upsert_then_read_back, check_upsert_then_read_back);

async fn check_upsert_is_idempotent(store: &Store) {
    let a = item("Washers", None, 7, "0.05", None);
    store.upsert(&a).await.unwrap();
    store.upsert(&a).await.unwrap();

    let all = store.all().await.unwrap();
    assert_eq!(all, vec![a]);
}
both_backends!(upsert_is_idempotent, check_upsert_is_idempotent);

async fn check_upsert_replaces_whole_record(store: &Store) {
    let mut a = item("Tape", Some("T-1"), 3, "1.50", Some("Shelf 2"));
    store.upsert(&a).await.unwrap();

    a.name = "Duct tape".to_string();
    a.qty = 9;
    a.location = None;
    store.upsert(&a).await.unwrap();

    let all = store.all().await.unwrap();
    assert_eq!(all, vec![a]);
}
both_backends!(upsert_replaces_whole_record, check_upsert_replaces_whole_record);

async fn check_remove_deletes_and_missing_is_noop(store: &Store) {
    let a = item("Glue", None, 2, "4.00", None);
    let b = item("Clamps", None, 5, "2.25", None);
    store.upsert(&a).await.unwrap();
    store.upsert(&b).await.unwrap();

    store.remove(a.id).await.unwrap();
    let all = store.all().await.unwrap();
    assert!(all.iter().all(|i| i.id != a.id));
    assert_eq!(all, vec![b.clone()]);

    // Removing a missing id is a no-op, not an error
    store.remove(Uuid::new_v4()).await.unwrap();
    assert_eq!(store.all().await.unwrap(), vec![b]);
}
both_backends!(remove_behavior, check_remove_deletes_and_missing_is_noop);

async fn check_bulk_upsert_and_remove(store: &Store) {
    let items: Vec<Item> = (0..5)
        .map(|i| item(&format!("Part {i}"), None, i, "1.00", None))
        .collect();
    store.bulk_upsert(&items).await.unwrap();
    assert_eq!(store.all().await.unwrap().len(), 5);

    // One existing id, one missing: the existing one goes, no error
    let missing = Uuid::new_v4();
    store.bulk_remove(&[items[0].id, missing]).await.unwrap();

    let all = store.all().await.unwrap();
    assert_eq!(all.len(), 4);
    assert!(all.iter().all(|i| i.id != items[0].id));
}
both_backends!(bulk_upsert_and_remove, check_bulk_upsert_and_remove);

async fn check_find_by_sku_missing(store: &Store) {
    store
        .upsert(&item("Rope", Some("R-2"), 1, "3.00", None))
        .await
        .unwrap();
    assert!(store.find_by_sku("nope").await.unwrap().is_none());
}
both_backends!(find_by_sku_missing, check_find_by_sku_missing);

async fn check_find_by_sku_duplicates_returns_one(store: &Store) {
    let a = item("Bolt box A", Some("DUP"), 1, "1.00", None);
    let b = item("Bolt box B", Some("DUP"), 2, "1.00", None);
    store.bulk_upsert(&[a.clone(), b.clone()]).await.unwrap();

    // Which duplicate wins is unspecified; it must be one of them.
    let found = store.find_by_sku("DUP").await.unwrap().unwrap();
    assert!(found == a || found == b);
}
both_backends!(find_by_sku_duplicates, check_find_by_sku_duplicates_returns_one);

async fn check_stats(store: &Store) {
    store
        .bulk_upsert(&[
            item("A", None, 2, "5", Some("A")),
            item("B", None, 3, "1", Some("A")),
            item("C", None, 0, "9", Some("B")),
        ])
        .await
        .unwrap();

    let stats = store.stats().await.unwrap();
    assert_eq!(stats.items, 3);
    assert_eq!(stats.total_qty, 5);
    assert_eq!(stats.total_value, Decimal::from(13));
    assert_eq!(stats.locations, 2);
}
both_backends!(stats, check_stats);

async fn check_low_stock(store: &Store) {
    store
        .bulk_upsert(&[
            item("Low", None, 1, "1", None),
            item("Edge", None, 3, "1", None),
            item("Fine", None, 10, "1", None),
        ])
        .await
        .unwrap();

    let mut low = store.low_stock(3).await.unwrap();
    low.sort_by(|a, b| a.name.cmp(&b.name));
    let names: Vec<&str> = low.iter().map(|i| i.name.as_str()).collect();
    assert_eq!(names, vec!["Edge", "Low"]);
}
both_backends!(low_stock, check_low_stock);

async fn check_clear_keeps_settings(store: &Store) {
    store
        .upsert(&item("Doomed", None, 1, "1", None))
        .await
        .unwrap();
    store
        .save_settings(&json!({"theme": "dark", "lowStockThreshold": 5}))
        .await
        .unwrap();

    store.clear().await.unwrap();

    assert!(store.all().await.unwrap().is_empty());
    assert_eq!(store.stats().await.unwrap().items, 0);
    assert_eq!(
        store.load_settings().await,
        Some(json!({"theme": "dark", "lowStockThreshold": 5}))
    );
}
both_backends!(clear_keeps_settings, check_clear_keeps_settings);

async fn check_clear_erases_movements(store: &Store) {
    let a = item("Tracked", None, 4, "1", None);
    store.upsert(&a).await.unwrap();
    store
        .record_movement(&Movement::for_adjustment(&a, 2, None))
        .await
        .unwrap();
    assert_eq!(store.movements_for_item(a.id).await.unwrap().len(), 1);

    store.clear().await.unwrap();
    assert!(store.movements_for_item(a.id).await.unwrap().is_empty());
    assert!(store.recent_movements(10).await.unwrap().is_empty());
}
both_backends!(clear_erases_movements, check_clear_erases_movements);

async fn check_settings_lifecycle(store: &Store) {
    // Before any save: absent, not an error
    assert_eq!(store.load_settings().await, None);

    store.save_settings(&json!({"theme": "light"})).await.unwrap();
    assert_eq!(store.load_settings().await, Some(json!({"theme": "light"})));

    // Wholesale replace, not a merge
    store.save_settings(&json!({"currency": "€"})).await.unwrap();
    assert_eq!(store.load_settings().await, Some(json!({"currency": "€"})));
}
both_backends!(settings_lifecycle, check_settings_lifecycle);

async fn check_movement_log(store: &Store) {
    let a = item("Screws", None, 10, "0.02", None);
    let b = item("Nails", None, 5, "0.01", None);
    store.bulk_upsert(&[a.clone(), b.clone()]).await.unwrap();

    let t0 = Utc::now() - Duration::seconds(30);
    let mk = |target: &Item, delta: i64, offset: i64, reason: &str| {
        let mut m = Movement::for_adjustment(target, delta, Some(reason.to_string()));
        m.recorded_at = t0 + Duration::seconds(offset);
        m
    };

    store.record_movement(&mk(&a, 5, 0, "restock")).await.unwrap();
    store.record_movement(&mk(&b, -1, 5, "used one")).await.unwrap();
    store.record_movement(&mk(&a, -3, 10, "order #7")).await.unwrap();

    let for_a = store.movements_for_item(a.id).await.unwrap();
    assert_eq!(for_a.len(), 2);
    // Most recent first
    assert_eq!(for_a[0].delta, -3);
    assert_eq!(for_a[0].before_qty, 10);
    assert_eq!(for_a[0].after_qty, 7);
    assert_eq!(for_a[1].delta, 5);

    let recent = store.recent_movements(2).await.unwrap();
    assert_eq!(recent.len(), 2);
    assert_eq!(recent[0].item_id, a.id);
    assert_eq!(recent[1].item_id, b.id);
}
both_backends!(movement_log, check_movement_log);

async fn check_sequential_order_preserved(store: &Store) {
    // A remove issued strictly after an upsert for the same id always
    // results in absence, never a resurrected record.
    let a = item("Ghost", Some("G-1"), 1, "1", None);
    for _ in 0..20 {
        store.upsert(&a).await.unwrap();
        store.remove(a.id).await.unwrap();
    }
    assert!(store.all().await.unwrap().is_empty());
    assert!(store.find_by_sku("G-1").await.unwrap().is_none());
}
both_backends!(sequential_order_preserved, check_sequential_order_preserved);

// ---------------------------------------------------------------------------
// SQLite-specific: durability and schema reopening
// ---------------------------------------------------------------------------

#[tokio::test]
async fn sqlite_reopen_sees_previous_data() {
    let dir = TempDir::new().unwrap();
    let config = StoreConfig::at_path(dir.path().join("persist.db"));

    let a = item("Durable", Some("D-1"), 2, "10.50", Some("Back room"));
    {
        let store = Store::open(&config).await.unwrap();
        store.upsert(&a).await.unwrap();
        store.save_settings(&json!({"theme": "dark"})).await.unwrap();
    }

    // Reopening re-runs the schema upgrade, which must be a no-op, and
    // must see everything written by the first handle.
    let store = Store::open(&config).await.unwrap();
    assert_eq!(store.all().await.unwrap(), vec![a]);
    assert_eq!(store.load_settings().await, Some(json!({"theme": "dark"})));
}

#[tokio::test]
async fn sqlite_read_cache_survives_mutation_cycle() {
    let (store, _dir) = sqlite_store().await;
    let a = item("Cached", None, 1, "1", None);

    store.upsert(&a).await.unwrap();
    // Two consecutive reads (second one served from cache) agree
    assert_eq!(store.all().await.unwrap(), store.all().await.unwrap());

    // Mutation invalidates: the next read reflects it
    store.remove(a.id).await.unwrap();
    assert!(store.all().await.unwrap().is_empty());
}

// ---------------------------------------------------------------------------
// Fallback selection and read-only behavior
// ---------------------------------------------------------------------------

#[tokio::test]
async fn selector_without_path_falls_back_read_only() {
    let store = Store::open(&StoreConfig::ephemeral()).await.unwrap();
    assert!(!store.is_persistent());
    assert!(store.is_read_only());
}

#[tokio::test]
async fn read_only_store_rejects_mutations_without_effect() {
    let store = Store::open(&StoreConfig::ephemeral()).await.unwrap();
    let a = item("Rejected", None, 1, "1", None);

    assert_matches!(store.upsert(&a).await, Err(StoreError::ReadOnly));
    assert_matches!(store.bulk_upsert(&[a.clone()]).await, Err(StoreError::ReadOnly));
    assert_matches!(store.bulk_remove(&[a.id]).await, Err(StoreError::ReadOnly));
    assert_matches!(store.remove(a.id).await, Err(StoreError::ReadOnly));
    assert_matches!(store.clear().await, Err(StoreError::ReadOnly));
    assert_matches!(
        store.save_settings(&json!({"theme": "light"})).await,
        Err(StoreError::ReadOnly)
    );
    assert_matches!(
        store
            .record_movement(&Movement::for_adjustment(&a, 1, None))
            .await,
        Err(StoreError::ReadOnly)
    );

    // Reads still succeed and show no new state
    assert!(store.all().await.unwrap().is_empty());
    assert_eq!(store.load_settings().await, None);
    assert_eq!(store.stats().await.unwrap().items, 0);
}

#[tokio::test]
async fn writable_memory_store_accepts_mutations() {
    let store = Store::in_memory();
    assert!(!store.is_persistent());
    assert!(!store.is_read_only());

    let a = item("Ephemeral", None, 1, "1", None);
    store.upsert(&a).await.unwrap();
    assert_eq!(store.all().await.unwrap(), vec![a]);
}
