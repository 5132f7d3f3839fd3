//! Stock movement log records
//!
//! Every quantity adjustment the controller applies is mirrored by one
//! append-only movement row, so the history of an item's stock level can
//! be rendered without reconstructing it from item snapshots.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::Item;
use crate::db::sqlite_helpers::{str_to_datetime, str_to_uuid};

/// Direction of a stock movement, derived from the sign of the delta.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MovementAction {
    Add,
    Remove,
    /// Zero-delta correction (e.g. a recount that confirmed the level).
    Adjust,
}

impl MovementAction {
    pub fn from_delta(delta: i64) -> Self {
        match delta {
            d if d > 0 => Self::Add,
            d if d < 0 => Self::Remove,
            _ => Self::Adjust,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Add => "ADD",
            Self::Remove => "REMOVE",
            Self::Adjust => "ADJUST",
        }
    }

    fn parse(s: &str) -> anyhow::Result<Self> {
        match s {
            "ADD" => Ok(Self::Add),
            "REMOVE" => Ok(Self::Remove),
            "ADJUST" => Ok(Self::Adjust),
            other => Err(anyhow::anyhow!("Unknown movement action '{}'", other)),
        }
    }
}

/// One entry in the movement log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Movement {
    pub id: Uuid,
    pub item_id: Uuid,
    pub action: MovementAction,
    pub before_qty: i64,
    pub after_qty: i64,
    pub delta: i64,
    pub reason: Option<String>,
    pub recorded_at: DateTime<Utc>,
}

impl Movement {
    /// Build a movement for applying `delta` to `item`'s current quantity.
    /// The item itself is not modified; the controller applies the new
    /// quantity via `upsert` and records the movement alongside.
    pub fn for_adjustment(item: &Item, delta: i64, reason: Option<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            item_id: item.id,
            action: MovementAction::from_delta(delta),
            before_qty: item.qty,
            after_qty: item.qty + delta,
            delta,
            reason,
            recorded_at: Utc::now(),
        }
    }
}

impl sqlx::FromRow<'_, sqlx::sqlite::SqliteRow> for Movement {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> sqlx::Result<Self> {
        use sqlx::Row;

        let id_str: String = row.try_get("id")?;
        let item_id_str: String = row.try_get("item_id")?;
        let action_str: String = row.try_get("action")?;
        let recorded_str: String = row.try_get("recorded_at")?;

        Ok(Self {
            id: str_to_uuid(&id_str).map_err(|e| sqlx::Error::Decode(e.into()))?,
            item_id: str_to_uuid(&item_id_str).map_err(|e| sqlx::Error::Decode(e.into()))?,
            action: MovementAction::parse(&action_str).map_err(|e| sqlx::Error::Decode(e.into()))?,
            before_qty: row.try_get("before_qty")?,
            after_qty: row.try_get("after_qty")?,
            delta: row.try_get("delta")?,
            reason: row.try_get("reason")?,
            recorded_at: str_to_datetime(&recorded_str).map_err(|e| sqlx::Error::Decode(e.into()))?,
        })
    }
}
