//! Storage layer.
//!
//! SQLite is the only backend. The pool is created once by the binaries and
//! handed to every component explicitly; nothing here keeps global state.

use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use tracing::info;

use crate::config::StorageConfig;

pub mod models;
pub mod schema;
pub mod sqlite;

pub use models::{Customer, LineItem, Order, Product, RefreshLog, RefreshStatus};

/// Result type for storage operations.
pub type Result<T> = std::result::Result<T, StorageError>;

/// Errors that can occur during storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Invalid timestamp: {0}")]
    InvalidTimestamp(String),

    #[error("Invalid refresh status: {0}")]
    InvalidStatus(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Path value selecting a private in-memory database.
pub const MEMORY_PATH: &str = ":memory:";

/// Open the SQLite pool described by `config` and create the schema.
///
/// An in-memory database lives on a single connection, so the pool is
/// capped at one connection in that case.
pub async fn connect(config: &StorageConfig) -> Result<SqlitePool> {
    info!(path = %config.path, "opening sqlite storage");

    if config.path == MEMORY_PATH {
        return connect_memory().await;
    }

    if let Some(parent) = Path::new(&config.path).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let options = SqliteConnectOptions::new()
        .filename(&config.path)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(Duration::from_secs(30))
        .create_if_missing(true)
        .foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(config.max_connections.max(1))
        .connect_with(options)
        .await?;

    sqlite::init_schema(&pool).await?;
    Ok(pool)
}

/// Open a fresh in-memory database with the schema applied.
pub async fn connect_memory() -> Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);

    // The database disappears with its connection, so it must never be recycled.
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .min_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await?;

    sqlite::init_schema(&pool).await?;
    Ok(pool)
}
