//! Configuration types for the pantry system.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{PantryError, Result};

/// Main configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PantryConfig {
    /// Database configuration.
    #[serde(default)]
    pub database: DatabaseConfig,
}

impl PantryConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        toml::from_str(&content)
            .map_err(|e| PantryError::config(format!("Failed to parse config: {}", e)))
    }
}

/// Database configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Path to the SQLite database file.
    pub path: PathBuf,

    /// Enable WAL mode (recommended).
    #[serde(default = "default_true")]
    pub wal_mode: bool,

    /// SQLite cache size in KB (negative = KB, positive = pages).
    #[serde(default = "default_cache_size")]
    pub cache_size: i32,

    /// Busy timeout in milliseconds. Concurrent writers serialize through
    /// SQLite's own locking; this bounds how long a writer waits before
    /// the engine reports busy.
    #[serde(default = "default_busy_timeout")]
    pub busy_timeout_ms: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_database_path(),
            wal_mode: true,
            cache_size: -16000, // 16MB
            busy_timeout_ms: 5000,
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_cache_size() -> i32 {
    -16000
}

fn default_busy_timeout() -> u32 {
    5000
}

/// Default database location: `~/.pantry/db.sqlite`.
pub fn default_database_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".pantry")
        .join("db.sqlite")
}
