//! Store configuration management

use std::env;
use std::path::PathBuf;

use anyhow::{Context, Result};

/// Store configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Path of the SQLite database file. `None` (or an unusable
    /// directory) makes the selector fall back to the read-only
    /// in-memory store.
    pub database_path: Option<PathBuf>,

    /// Maximum connections in the SQLite pool.
    pub max_connections: u32,
}

impl StoreConfig {
    /// Load configuration from environment variables.
    ///
    /// `STOCKROOM_DB_PATH=:none:` forces the in-memory fallback, which is
    /// useful for trying the app without touching disk.
    pub fn from_env() -> Result<Self> {
        // Load .env if present; ignore absence
        dotenvy::dotenv().ok();

        let database_path = match env::var("STOCKROOM_DB_PATH") {
            Ok(v) if v == ":none:" => None,
            Ok(v) => Some(PathBuf::from(v)),
            Err(_) => Some(PathBuf::from("./data/stockroom.db")),
        };

        Ok(Self {
            database_path,

            max_connections: env::var("STOCKROOM_DB_MAX_CONNECTIONS")
                .unwrap_or_else(|_| "5".to_string())
                .parse()
                .context("Invalid STOCKROOM_DB_MAX_CONNECTIONS")?,
        })
    }

    /// Configuration pointing at a specific database file.
    pub fn at_path(path: impl Into<PathBuf>) -> Self {
        Self {
            database_path: Some(path.into()),
            max_connections: 5,
        }
    }

    /// Configuration with no persistent storage at all.
    pub fn ephemeral() -> Self {
        Self {
            database_path: None,
            max_connections: 5,
        }
    }
}
