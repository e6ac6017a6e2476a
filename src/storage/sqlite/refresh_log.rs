//! Refresh audit log rows.

use chrono::{DateTime, Utc};
use sea_query::{Expr, Order, Query, SqliteQueryBuilder};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use super::{format_timestamp, parse_timestamp};
use crate::storage::schema::DataRefreshLogs;
use crate::storage::{RefreshLog, RefreshStatus, Result};

/// Insert a new log row and return it with its generated id.
pub async fn insert_refresh_log(
    pool: &SqlitePool,
    start_time: DateTime<Utc>,
    status: RefreshStatus,
) -> Result<RefreshLog> {
    let created_at = Utc::now();

    let query = Query::insert()
        .into_table(DataRefreshLogs::Table)
        .columns([
            DataRefreshLogs::StartTime,
            DataRefreshLogs::Status,
            DataRefreshLogs::Message,
            DataRefreshLogs::RowsProcessed,
            DataRefreshLogs::CreatedAt,
        ])
        .values_panic([
            format_timestamp(start_time).into(),
            status.as_str().into(),
            "".into(),
            0i64.into(),
            format_timestamp(created_at).into(),
        ])
        .to_string(SqliteQueryBuilder);

    let result = sqlx::query(&query).execute(pool).await?;

    Ok(RefreshLog {
        id: result.last_insert_rowid(),
        start_time,
        end_time: None,
        status,
        message: String::new(),
        rows_processed: 0,
        created_at,
    })
}

/// Persist the terminal fields of `log`.
pub async fn finish_refresh_log(pool: &SqlitePool, log: &RefreshLog) -> Result<()> {
    let end_time = log.end_time.map(format_timestamp);

    let query = Query::update()
        .table(DataRefreshLogs::Table)
        .values([
            (DataRefreshLogs::EndTime, end_time.into()),
            (DataRefreshLogs::Status, log.status.as_str().into()),
            (DataRefreshLogs::Message, log.message.as_str().into()),
            (DataRefreshLogs::RowsProcessed, log.rows_processed.into()),
        ])
        .and_where(Expr::col(DataRefreshLogs::Id).eq(log.id))
        .to_string(SqliteQueryBuilder);

    sqlx::query(&query).execute(pool).await?;

    Ok(())
}

/// Most recent log rows, newest first.
pub async fn recent_refresh_logs(pool: &SqlitePool, limit: u64) -> Result<Vec<RefreshLog>> {
    let query = Query::select()
        .columns([
            DataRefreshLogs::Id,
            DataRefreshLogs::StartTime,
            DataRefreshLogs::EndTime,
            DataRefreshLogs::Status,
            DataRefreshLogs::Message,
            DataRefreshLogs::RowsProcessed,
            DataRefreshLogs::CreatedAt,
        ])
        .from(DataRefreshLogs::Table)
        .order_by(DataRefreshLogs::CreatedAt, Order::Desc)
        .order_by(DataRefreshLogs::Id, Order::Desc)
        .limit(limit)
        .to_string(SqliteQueryBuilder);

    let rows = sqlx::query(&query).fetch_all(pool).await?;

    rows.iter().map(decode_log).collect()
}

fn decode_log(row: &SqliteRow) -> Result<RefreshLog> {
    let start_time: String = row.get("start_time");
    let end_time: Option<String> = row.get("end_time");
    let status: String = row.get("status");
    let created_at: String = row.get("created_at");

    Ok(RefreshLog {
        id: row.get("id"),
        start_time: parse_timestamp(&start_time)?,
        end_time: end_time.as_deref().map(parse_timestamp).transpose()?,
        status: status.parse()?,
        message: row.get("message"),
        rows_processed: row.get("rows_processed"),
        created_at: parse_timestamp(&created_at)?,
    })
}
