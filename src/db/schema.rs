//! Versioned, additive schema upgrades
//!
//! The schema version lives in `PRAGMA user_version` and only ever
//! increases. Each upgrade step adds tables or indexes; nothing is ever
//! dropped or rewritten, so reopening an older database applies exactly
//! the steps it is missing and reopening a current one is a no-op.
//!
//! - v1: items table, indexes on name / sku / location / updated_at
//! - v2: settings table
//! - v3: movements table, indexes on item_id / recorded_at

use sqlx::SqlitePool;
use tracing::{debug, info};

/// Current schema version. Bump when adding a step to [upgrade].
pub const SCHEMA_VERSION: i64 = 3;

const V1_ITEMS: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS items (
        id TEXT PRIMARY KEY,
        name TEXT NOT NULL,
        sku TEXT,
        qty INTEGER NOT NULL DEFAULT 0,
        cost TEXT NOT NULL DEFAULT '0',
        location TEXT,
        updated_at TEXT NOT NULL
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_items_name ON items (name)",
    // Deliberately non-unique: duplicate skus are a UI-level warning.
    "CREATE INDEX IF NOT EXISTS idx_items_sku ON items (sku)",
    "CREATE INDEX IF NOT EXISTS idx_items_location ON items (location)",
    "CREATE INDEX IF NOT EXISTS idx_items_updated_at ON items (updated_at)",
];

const V2_SETTINGS: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS settings (
        key TEXT PRIMARY KEY,
        value TEXT NOT NULL
    )
    "#,
];

const V3_MOVEMENTS: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS movements (
        id TEXT PRIMARY KEY,
        item_id TEXT NOT NULL,
        action TEXT NOT NULL,
        before_qty INTEGER NOT NULL,
        after_qty INTEGER NOT NULL,
        delta INTEGER NOT NULL,
        reason TEXT,
        recorded_at TEXT NOT NULL
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_movements_item_id ON movements (item_id)",
    "CREATE INDEX IF NOT EXISTS idx_movements_recorded_at ON movements (recorded_at)",
];

/// Read the stored schema version.
async fn current_version(pool: &SqlitePool) -> Result<i64, sqlx::Error> {
    let (version,): (i64,) = sqlx::query_as("PRAGMA user_version")
        .fetch_one(pool)
        .await?;
    Ok(version)
}

/// Record the new schema version. PRAGMA does not support bind
/// parameters; the value is a trusted constant.
async fn set_version(pool: &SqlitePool, version: i64) -> Result<(), sqlx::Error> {
    sqlx::query(&format!("PRAGMA user_version = {}", version))
        .execute(pool)
        .await?;
    Ok(())
}

async fn run_step(pool: &SqlitePool, statements: &[&str]) -> Result<(), sqlx::Error> {
    for stmt in statements {
        sqlx::query(stmt.trim()).execute(pool).await?;
    }
    Ok(())
}

/// Bring the database up to [SCHEMA_VERSION]. Idempotent; called once
/// while opening the store, before any contract method can run.
pub async fn upgrade(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    let from = current_version(pool).await?;
    if from >= SCHEMA_VERSION {
        debug!(version = from, "Schema already current");
        return Ok(());
    }

    if from < 1 {
        run_step(pool, V1_ITEMS).await?;
        info!("Created items table and indexes");
    }
    if from < 2 {
        run_step(pool, V2_SETTINGS).await?;
        info!("Created settings table");
    }
    if from < 3 {
        run_step(pool, V3_MOVEMENTS).await?;
        info!("Created movements table and indexes");
    }

    set_version(pool, SCHEMA_VERSION).await?;
    info!(from, to = SCHEMA_VERSION, "Schema upgraded");
    Ok(())
}
