//! Bulk CSV ingestion.
//!
//! One run reads the source, then writes every row inside a single
//! transaction:
//!
//! ```text
//! audit::open ──> row::parse ──> batch::load ──┬──> audit::complete
//!   (PROCESSING)                  (coerce,      └──> audit::fail
//!                                  upsert, fact)
//! ```
//!
//! The audit row is written on the pool, outside the batch transaction, so a
//! rollback never erases it.

use std::fmt;

use crate::storage::StorageError;

pub mod audit;
pub mod batch;
pub mod coerce;
pub mod row;
pub mod service;
pub mod upsert;

pub use audit::AuditRecorder;
pub use batch::{BatchLoader, BatchSummary};
pub use coerce::{coerce_row, CoercionPolicy, SaleLine};
pub use row::{parse_file, parse_reader, SalesRow, COLUMN_COUNT};
pub use service::{RefreshFailure, RefreshOutcome, RefreshService, SUCCESS_MESSAGE};
pub use upsert::{RowWriter, Upserted, WriteCounts};

/// Result type for ingestion operations.
pub type Result<T> = std::result::Result<T, IngestError>;

/// Entity kinds created by a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Customer,
    Product,
    Order,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            EntityKind::Customer => "customer",
            EntityKind::Product => "product",
            EntityKind::Order => "order",
        })
    }
}

/// Errors that end an ingestion run.
///
/// Every variant is terminal: the batch is rolled back and the run's audit
/// row is marked `FAILED`.
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("cannot read source {path}: {source}")]
    SourceUnreadable {
        path: String,
        #[source]
        source: csv::Error,
    },

    #[error("CSV file has insufficient data")]
    InsufficientData,

    #[error("row {row} has insufficient columns: expected 15, found {fields}")]
    MalformedRow { row: usize, fields: usize },

    #[error("row {row}: cannot convert {field} value {value:?}")]
    FieldCoercion {
        row: usize,
        field: &'static str,
        value: String,
    },

    #[error("failed to create {entity} {id}: {source}")]
    EntityWriteFailure {
        entity: EntityKind,
        id: String,
        #[source]
        source: StorageError,
    },

    #[error("failed to create order item for order {order_id}, product {product_id}: {source}")]
    FactWriteFailure {
        order_id: String,
        product_id: String,
        #[source]
        source: StorageError,
    },

    #[error("failed to begin transaction: {0}")]
    TransactionBegin(#[source] StorageError),

    #[error("failed to commit transaction: {0}")]
    CommitFailure(#[source] StorageError),

    #[error("failed to create refresh log: {0}")]
    AuditWrite(#[source] StorageError),
}

impl IngestError {
    /// Message recorded on the run's audit row, prefixed by the failing stage.
    pub fn audit_message(&self) -> String {
        match self {
            IngestError::SourceUnreadable { .. }
            | IngestError::InsufficientData
            | IngestError::MalformedRow { .. } => format!("Error parsing CSV: {self}"),
            IngestError::FieldCoercion { .. } => format!("Error converting field: {self}"),
            IngestError::EntityWriteFailure { entity, .. } => {
                format!("Error creating {entity}: {self}")
            }
            IngestError::FactWriteFailure { .. } => format!("Error creating order item: {self}"),
            IngestError::TransactionBegin(_) => format!("Error starting transaction: {self}"),
            IngestError::CommitFailure(_) => format!("Error committing transaction: {self}"),
            IngestError::AuditWrite(_) => format!("Error recording refresh: {self}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_audit_message_names_stage() {
        let err = IngestError::MalformedRow { row: 3, fields: 14 };
        assert_eq!(
            err.audit_message(),
            "Error parsing CSV: row 3 has insufficient columns: expected 15, found 14"
        );

        let err = IngestError::EntityWriteFailure {
            entity: EntityKind::Product,
            id: "P9".to_string(),
            source: StorageError::InvalidStatus("x".to_string()),
        };
        assert!(err.audit_message().starts_with("Error creating product: "));
        assert!(err.audit_message().contains("P9"));
    }

    #[test]
    fn test_insufficient_data_message() {
        assert_eq!(
            IngestError::InsufficientData.audit_message(),
            "Error parsing CSV: CSV file has insufficient data"
        );
    }
}
