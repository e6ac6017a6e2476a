//! One transaction per run.

use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, error, info};

use super::coerce::{coerce_row, CoercionPolicy};
use super::row::SalesRow;
use super::upsert::{RowWriter, WriteCounts};
use super::{IngestError, Result};
use crate::storage::StorageError;

/// Outcome of a committed batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSummary {
    /// Source rows written.
    pub rows: usize,
    pub counts: WriteCounts,
}

/// Writes all rows of a run atomically: every entity and fact commits
/// together, or the transaction is rolled back and nothing is kept.
pub struct BatchLoader<'a> {
    pool: &'a SqlitePool,
    policy: CoercionPolicy,
}

impl<'a> BatchLoader<'a> {
    pub fn new(pool: &'a SqlitePool, policy: CoercionPolicy) -> Self {
        Self { pool, policy }
    }

    pub async fn load(&self, rows: &[SalesRow]) -> Result<BatchSummary> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| IngestError::TransactionBegin(StorageError::from(e)))?;

        let counts = match apply_rows(&mut tx, rows, self.policy).await {
            Ok(counts) => counts,
            Err(err) => {
                if let Err(rollback) = tx.rollback().await {
                    error!(error = %rollback, "rollback failed after batch error");
                }
                debug!(error = %err, "batch rolled back");
                return Err(err);
            }
        };

        tx.commit()
            .await
            .map_err(|e| IngestError::CommitFailure(StorageError::from(e)))?;

        info!(
            rows = rows.len(),
            customers_created = counts.customers_created,
            products_created = counts.products_created,
            orders_created = counts.orders_created,
            line_items = counts.line_items,
            "batch committed"
        );

        Ok(BatchSummary {
            rows: rows.len(),
            counts,
        })
    }
}

async fn apply_rows(
    conn: &mut SqliteConnection,
    rows: &[SalesRow],
    policy: CoercionPolicy,
) -> Result<WriteCounts> {
    let mut writer = RowWriter::new();

    for (index, row) in rows.iter().enumerate() {
        let line = coerce_row(row, index + 1, policy)?;
        writer.apply(conn, &line).await?;
    }

    Ok(writer.counts())
}
