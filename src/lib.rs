//! Stockroom - persistence layer for a local-first inventory tracker
//!
//! Items, a stock movement log, and a single settings record, stored in
//! an embedded SQLite database with a read-only in-memory fallback when
//! no persistent storage is available. The UI layer (rendering, forms,
//! CSV/JSON codecs) lives elsewhere and dispatches every mutation and
//! query through [Store].
//!
//! ```no_run
//! use stockroom::{Store, StoreConfig};
//!
//! # async fn run() -> anyhow::Result<()> {
//! let config = StoreConfig::from_env()?;
//! let store = Store::open(&config).await?;
//! if !store.is_persistent() {
//!     // surface a "changes won't be saved" banner
//! }
//! let _stats = store.stats().await?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod db;
pub mod error;

pub use config::StoreConfig;
pub use db::{Item, MemoryStore, Movement, MovementAction, SqliteStore, Store, StoreStats};
pub use error::{Result, StoreError};
