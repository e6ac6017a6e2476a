//! SQLite implementations of the sales store.
//!
//! Entity functions take a `&mut SqliteConnection` so the caller decides
//! whether they run inside a transaction. Refresh log functions take the
//! pool, because audit rows must never share the batch transaction.

mod entities;
mod refresh_log;

pub use entities::{
    find_customer, find_order, find_product, insert_customer, insert_line_item, insert_order,
    insert_product,
};
pub use refresh_log::{finish_refresh_log, insert_refresh_log, recent_refresh_logs};

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use sqlx::SqlitePool;

use super::schema::SCHEMA;
use super::{Result, StorageError};

/// Date format used for the `orders.date` column.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Create tables and indexes if they don't exist.
pub async fn init_schema(pool: &SqlitePool) -> Result<()> {
    sqlx::query("PRAGMA foreign_keys = ON").execute(pool).await?;

    for statement in SCHEMA {
        sqlx::query(statement).execute(pool).await?;
    }

    Ok(())
}

/// Fixed-width RFC 3339 so stored timestamps sort correctly as text.
pub(crate) fn format_timestamp(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub(crate) fn parse_timestamp(value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| StorageError::InvalidTimestamp(format!("{value}: {e}")))
}

pub(crate) fn parse_date(value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value, DATE_FORMAT)
        .map_err(|e| StorageError::InvalidTimestamp(format!("{value}: {e}")))
}
