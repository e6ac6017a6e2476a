//! Refresh audit trail.
//!
//! Every run gets exactly one `data_refresh_logs` row. It is inserted as
//! `PROCESSING` before the source is read and moved to `COMPLETED` or
//! `FAILED` when the run ends. All writes go through the pool directly, so
//! they are never part of (or undone by) the batch transaction.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;

use crate::storage::{sqlite, RefreshLog, RefreshStatus, Result};

/// Records the lifecycle of ingestion runs.
#[derive(Clone)]
pub struct AuditRecorder {
    pool: SqlitePool,
}

impl AuditRecorder {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Persist a new `PROCESSING` row stamped with the current time.
    pub async fn open(&self) -> Result<RefreshLog> {
        let log = sqlite::insert_refresh_log(&self.pool, Utc::now(), RefreshStatus::Processing).await?;
        debug!(refresh_id = log.id, "refresh log opened");
        Ok(log)
    }

    /// Mark the run `COMPLETED` with the number of rows it loaded.
    pub async fn complete(&self, log: &mut RefreshLog, rows: i64, message: &str) -> Result<()> {
        log.rows_processed = rows;
        self.finish(log, RefreshStatus::Completed, message).await
    }

    /// Mark the run `FAILED`. The processed count is left at zero.
    pub async fn fail(&self, log: &mut RefreshLog, message: &str) -> Result<()> {
        log.rows_processed = 0;
        self.finish(log, RefreshStatus::Failed, message).await
    }

    /// Most recent runs, newest first.
    pub async fn history(&self, limit: u64) -> Result<Vec<RefreshLog>> {
        sqlite::recent_refresh_logs(&self.pool, limit).await
    }

    // The in-memory log is updated before the write so callers can still
    // report the outcome if persisting it fails.
    async fn finish(&self, log: &mut RefreshLog, status: RefreshStatus, message: &str) -> Result<()> {
        log.status = status;
        log.message = message.to_string();
        log.end_time = Some(Utc::now().max(log.start_time));

        sqlite::finish_refresh_log(&self.pool, log).await?;
        debug!(refresh_id = log.id, status = %status, "refresh log finalized");
        Ok(())
    }
}
