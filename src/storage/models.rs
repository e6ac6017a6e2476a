//! Row types for the sales tables and the refresh audit log.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

use super::StorageError;

/// A customer, keyed by its external id.
#[derive(Debug, Clone, PartialEq)]
pub struct Customer {
    pub id: String,
    pub name: String,
    pub email: String,
    pub address: String,
}

/// A product, keyed by its external id.
#[derive(Debug, Clone, PartialEq)]
pub struct Product {
    pub id: String,
    pub name: String,
    pub category: String,
    pub unit_price: f64,
}

/// An order placed by an existing customer.
#[derive(Debug, Clone, PartialEq)]
pub struct Order {
    pub id: String,
    pub customer_id: String,
    pub region: String,
    pub date: NaiveDate,
    pub payment_method: String,
    pub shipping_cost: f64,
}

/// One sold line of an order. Never deduplicated.
#[derive(Debug, Clone, PartialEq)]
pub struct LineItem {
    pub order_id: String,
    pub product_id: String,
    pub quantity: i64,
    pub unit_price: f64,
    pub discount: f64,
}

/// Lifecycle state of a refresh log row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RefreshStatus {
    Processing,
    Completed,
    Failed,
}

impl RefreshStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RefreshStatus::Processing => "PROCESSING",
            RefreshStatus::Completed => "COMPLETED",
            RefreshStatus::Failed => "FAILED",
        }
    }

    /// True once a run has reached `COMPLETED` or `FAILED`.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, RefreshStatus::Processing)
    }
}

impl fmt::Display for RefreshStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RefreshStatus {
    type Err = StorageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PROCESSING" => Ok(RefreshStatus::Processing),
            "COMPLETED" => Ok(RefreshStatus::Completed),
            "FAILED" => Ok(RefreshStatus::Failed),
            other => Err(StorageError::InvalidStatus(other.to_string())),
        }
    }
}

/// Audit record of one ingestion run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RefreshLog {
    pub id: i64,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub status: RefreshStatus,
    pub message: String,
    pub rows_processed: i64,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_round_trips_through_text() {
        for status in [
            RefreshStatus::Processing,
            RefreshStatus::Completed,
            RefreshStatus::Failed,
        ] {
            assert_eq!(status.as_str().parse::<RefreshStatus>().unwrap(), status);
        }
    }

    #[test]
    fn test_unknown_status_is_rejected() {
        let err = "DONE".parse::<RefreshStatus>().unwrap_err();
        assert!(matches!(err, StorageError::InvalidStatus(s) if s == "DONE"));
    }

    #[test]
    fn test_status_serializes_upper_case() {
        let json = serde_json::to_string(&RefreshStatus::Completed).unwrap();
        assert_eq!(json, "\"COMPLETED\"");
        assert!(!RefreshStatus::Processing.is_terminal());
        assert!(RefreshStatus::Failed.is_terminal());
    }
}
