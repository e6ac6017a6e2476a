//! Refresh runs: the entry point used by the CLI and the HTTP API.

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::SqlitePool;
use tokio::sync::Mutex;
use tracing::{error, info, warn};

use super::audit::AuditRecorder;
use super::batch::{BatchLoader, BatchSummary};
use super::{row, IngestError};
use crate::config::IngestConfig;
use crate::storage::{RefreshLog, RefreshStatus};

/// Message recorded for a successful run.
pub const SUCCESS_MESSAGE: &str = "Data loaded successfully";

/// Result of one run, as reported to callers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RefreshOutcome {
    pub success: bool,
    pub message: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub rows_processed: i64,
}

impl RefreshOutcome {
    fn from_log(log: &RefreshLog) -> Self {
        Self {
            success: log.status == RefreshStatus::Completed,
            message: log.message.clone(),
            start_time: log.start_time,
            end_time: log.end_time.unwrap_or(log.start_time),
            rows_processed: log.rows_processed,
        }
    }
}

/// A failed run: the error plus the outcome that was recorded for it.
#[derive(Debug, thiserror::Error)]
#[error("{error}")]
pub struct RefreshFailure {
    pub outcome: RefreshOutcome,
    #[source]
    pub error: IngestError,
}

/// Runs ingestions against one store, one at a time.
pub struct RefreshService {
    pool: SqlitePool,
    config: IngestConfig,
    recorder: AuditRecorder,
    run_lock: Mutex<()>,
}

impl RefreshService {
    pub fn new(pool: SqlitePool, config: IngestConfig) -> Self {
        let recorder = AuditRecorder::new(pool.clone());
        Self {
            pool,
            config,
            recorder,
            run_lock: Mutex::new(()),
        }
    }

    /// Load the configured CSV file.
    pub async fn refresh(&self) -> Result<RefreshOutcome, RefreshFailure> {
        let path = self.config.csv_path.clone();
        self.refresh_from(Path::new(&path)).await
    }

    /// Load `path` as one all-or-nothing batch.
    ///
    /// Whatever happens after the audit row is opened, it is finalized before
    /// this returns.
    pub async fn refresh_from(&self, path: &Path) -> Result<RefreshOutcome, RefreshFailure> {
        let _guard = self.run_lock.lock().await;

        let mut log = match self.recorder.open().await {
            Ok(log) => log,
            Err(e) => {
                let error = IngestError::AuditWrite(e);
                error!(error = %error, "refresh not started");
                let now = Utc::now();
                return Err(RefreshFailure {
                    outcome: RefreshOutcome {
                        success: false,
                        message: error.audit_message(),
                        start_time: now,
                        end_time: now,
                        rows_processed: 0,
                    },
                    error,
                });
            }
        };

        info!(refresh_id = log.id, path = %path.display(), "refresh started");

        match self.run(path).await {
            Ok(summary) => {
                let rows = summary.rows as i64;
                if let Err(e) = self.recorder.complete(&mut log, rows, SUCCESS_MESSAGE).await {
                    error!(refresh_id = log.id, error = %e, "failed to finalize refresh log");
                }
                info!(refresh_id = log.id, rows, "refresh completed");
                Ok(RefreshOutcome::from_log(&log))
            }
            Err(error) => {
                let message = error.audit_message();
                if let Err(e) = self.recorder.fail(&mut log, &message).await {
                    error!(refresh_id = log.id, error = %e, "failed to finalize refresh log");
                }
                warn!(refresh_id = log.id, error = %error, "refresh failed");
                Err(RefreshFailure {
                    outcome: RefreshOutcome::from_log(&log),
                    error,
                })
            }
        }
    }

    /// Most recent audit rows, newest first.
    pub async fn history(&self, limit: u64) -> crate::storage::Result<Vec<RefreshLog>> {
        self.recorder.history(limit).await
    }

    /// Number of audit rows returned when no limit is given.
    pub fn history_limit(&self) -> u64 {
        self.config.history_limit
    }

    async fn run(&self, path: &Path) -> Result<BatchSummary, IngestError> {
        let rows = row::parse_file(path)?;
        BatchLoader::new(&self.pool, self.config.coercion)
            .load(&rows)
            .await
    }
}
