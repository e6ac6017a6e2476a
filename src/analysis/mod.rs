//! Read-side aggregates over ingested sales.

use chrono::NaiveDate;
use serde::Serialize;
use sqlx::{Row, SqlitePool};

use crate::storage::sqlite::DATE_FORMAT;
use crate::storage::StorageError;

/// Errors from analysis queries.
#[derive(Debug, thiserror::Error)]
pub enum AnalysisError {
    #[error("Invalid {field} format. Use YYYY-MM-DD")]
    InvalidDate { field: &'static str, value: String },

    #[error("start_date {start} is after end_date {end}")]
    InvalidRange { start: NaiveDate, end: NaiveDate },

    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl From<sqlx::Error> for AnalysisError {
    fn from(err: sqlx::Error) -> Self {
        AnalysisError::Storage(StorageError::Database(err))
    }
}

/// Customer and order figures for a date range.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CustomerAnalysis {
    pub total_customers: i64,
    pub total_orders: i64,
    pub average_order_value: f64,
}

/// Parse a `YYYY-MM-DD` request parameter.
pub fn parse_date_param(field: &'static str, value: &str) -> Result<NaiveDate, AnalysisError> {
    NaiveDate::parse_from_str(value, DATE_FORMAT).map_err(|_| AnalysisError::InvalidDate {
        field,
        value: value.to_string(),
    })
}

const ORDER_TOTALS_SQL: &str = "SELECT COUNT(DISTINCT customer_id) AS total_customers, \
     COUNT(*) AS total_orders \
     FROM orders WHERE date BETWEEN ?1 AND ?2";

const AVERAGE_LINE_VALUE_SQL: &str = "SELECT COALESCE(AVG(order_items.unit_price * order_items.quantity * (1.0 - order_items.discount)), 0.0) AS average \
     FROM order_items JOIN orders ON orders.id = order_items.order_id \
     WHERE orders.date BETWEEN ?1 AND ?2";

/// Aggregate orders dated within `[start, end]`, both ends inclusive.
///
/// The average is taken over line items: `unit_price * quantity * (1 - discount)`,
/// or zero when no line item falls in the range.
pub async fn customer_analysis(
    pool: &SqlitePool,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<CustomerAnalysis, AnalysisError> {
    if start > end {
        return Err(AnalysisError::InvalidRange { start, end });
    }

    let start = start.format(DATE_FORMAT).to_string();
    let end = end.format(DATE_FORMAT).to_string();

    let totals = sqlx::query(ORDER_TOTALS_SQL)
        .bind(&start)
        .bind(&end)
        .fetch_one(pool)
        .await?;

    let average = sqlx::query(AVERAGE_LINE_VALUE_SQL)
        .bind(&start)
        .bind(&end)
        .fetch_one(pool)
        .await?;

    Ok(CustomerAnalysis {
        total_customers: totals.get("total_customers"),
        total_orders: totals.get("total_orders"),
        average_order_value: average.get("average"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_date_param() {
        assert_eq!(
            parse_date_param("start_date", "2024-02-29").unwrap(),
            NaiveDate::from_ymd_opt(2024, 2, 29).unwrap()
        );

        let err = parse_date_param("end_date", "02/03/2024").unwrap_err();
        assert_eq!(err.to_string(), "Invalid end_date format. Use YYYY-MM-DD");
    }

    #[tokio::test]
    async fn test_empty_store_yields_zeroes() {
        let pool = crate::storage::connect_memory().await.unwrap();
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let end = NaiveDate::from_ymd_opt(2024, 12, 31).unwrap();

        let result = customer_analysis(&pool, start, end).await.unwrap();
        assert_eq!(
            result,
            CustomerAnalysis {
                total_customers: 0,
                total_orders: 0,
                average_order_value: 0.0,
            }
        );
    }

    #[tokio::test]
    async fn test_reversed_range_rejected() {
        let pool = crate::storage::connect_memory().await.unwrap();
        let start = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        let end = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();

        let err = customer_analysis(&pool, start, end).await.unwrap_err();
        assert!(matches!(err, AnalysisError::InvalidRange { .. }));
    }
}
