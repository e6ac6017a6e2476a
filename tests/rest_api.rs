//! REST API tests driven through the axum router.
//!
//! Run with: cargo test --test rest_api

mod common;

use std::sync::Arc;

use axum::body::Body;
use axum::Router;
use http::{Method, Request, StatusCode};
use serde_json::Value;
use sqlx::SqlitePool;
use tower::ServiceExt;

use common::{memory_pool, service, three_rows, write_csv};
use sales_ingest::handlers::rest::{router, ApiState};

fn app(pool: &SqlitePool, csv_path: &std::path::Path) -> Router {
    router(Arc::new(ApiState {
        pool: pool.clone(),
        refresh: service(pool, csv_path),
    }))
}

async fn call(app: &Router, method: Method, uri: &str) -> (StatusCode, Value) {
    let req = Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap();

    let resp = app.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let body = axum::body::to_bytes(resp.into_body(), 1024 * 1024)
        .await
        .unwrap();
    let json = serde_json::from_slice(&body).unwrap();
    (status, json)
}

#[tokio::test]
async fn test_health() {
    let dir = tempfile::tempdir().unwrap();
    let pool = memory_pool().await;
    let app = app(&pool, &dir.path().join("sales.csv"));

    let (status, json) = call(&app, Method::GET, "/api/v1/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");
}

#[tokio::test]
async fn test_analysis_requires_both_dates() {
    let dir = tempfile::tempdir().unwrap();
    let pool = memory_pool().await;
    let app = app(&pool, &dir.path().join("sales.csv"));

    let (status, json) = call(
        &app,
        Method::GET,
        "/api/v1/analysis/customer?start_date=2024-01-01",
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        json["error"],
        "Missing required query parameters: end_date"
    );

    let (status, _) = call(&app, Method::GET, "/api/v1/analysis/customer").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_analysis_rejects_bad_dates() {
    let dir = tempfile::tempdir().unwrap();
    let pool = memory_pool().await;
    let app = app(&pool, &dir.path().join("sales.csv"));

    let (status, json) = call(
        &app,
        Method::GET,
        "/api/v1/analysis/customer?start_date=01/01/2024&end_date=2024-12-31",
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "Invalid start_date format. Use YYYY-MM-DD");

    let (status, _) = call(
        &app,
        Method::GET,
        "/api/v1/analysis/customer?start_date=2024-12-31&end_date=2024-01-01",
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_analysis_on_empty_store_is_zero() {
    let dir = tempfile::tempdir().unwrap();
    let pool = memory_pool().await;
    let app = app(&pool, &dir.path().join("sales.csv"));

    let (status, json) = call(
        &app,
        Method::GET,
        "/api/v1/analysis/customer?start_date=2024-01-01&end_date=2024-12-31",
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["total_customers"], 0);
    assert_eq!(json["total_orders"], 0);
    assert_eq!(json["average_order_value"].as_f64().unwrap(), 0.0);
}

#[tokio::test]
async fn test_refresh_then_analyse_then_history() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_csv(dir.path(), "sales.csv", &three_rows());
    let pool = memory_pool().await;
    let app = app(&pool, &path);

    let (status, json) = call(&app, Method::POST, "/api/v1/data/refresh").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["success"], true);
    assert_eq!(json["rows_processed"], 3);
    assert_eq!(json["message"], "Data loaded successfully");

    let (status, json) = call(
        &app,
        Method::GET,
        "/api/v1/analysis/customer?start_date=2024-01-01&end_date=2024-01-31",
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["total_customers"], 1);
    assert_eq!(json["total_orders"], 1);
    let average = json["average_order_value"].as_f64().unwrap();
    assert!((average - 11.25).abs() < 1e-9, "average was {average}");

    let (_, json) = call(
        &app,
        Method::GET,
        "/api/v1/analysis/customer?start_date=2024-01-01&end_date=2024-12-31",
    )
    .await;
    assert_eq!(json["total_customers"], 2);
    assert_eq!(json["total_orders"], 2);
    let average = json["average_order_value"].as_f64().unwrap();
    assert!((average - 16.5).abs() < 1e-9, "average was {average}");

    let (status, json) = call(&app, Method::GET, "/api/v1/data/refresh/history").await;
    assert_eq!(status, StatusCode::OK);
    let logs = json.as_array().unwrap();
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0]["status"], "COMPLETED");
    assert_eq!(logs[0]["rows_processed"], 3);
    assert!(logs[0]["end_time"].is_string());
}

#[tokio::test]
async fn test_failed_refresh_is_500_and_recorded() {
    let dir = tempfile::tempdir().unwrap();
    let pool = memory_pool().await;
    let app = app(&pool, &dir.path().join("missing.csv"));

    let (status, json) = call(&app, Method::POST, "/api/v1/data/refresh").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    let message = json["error"].as_str().unwrap();
    assert!(message.starts_with("Failed to refresh data:"), "{message}");

    let (_, json) = call(&app, Method::GET, "/api/v1/data/refresh/history").await;
    let logs = json.as_array().unwrap();
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0]["status"], "FAILED");
    assert_eq!(logs[0]["rows_processed"], 0);
}

#[tokio::test]
async fn test_history_honours_limit() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_csv(dir.path(), "sales.csv", &three_rows());
    let pool = memory_pool().await;
    let app = app(&pool, &path);

    for _ in 0..3 {
        let (status, _) = call(&app, Method::POST, "/api/v1/data/refresh").await;
        assert_eq!(status, StatusCode::OK);
    }

    let (_, json) = call(&app, Method::GET, "/api/v1/data/refresh/history?limit=2").await;
    assert_eq!(json.as_array().unwrap().len(), 2);

    let (_, json) = call(&app, Method::GET, "/api/v1/data/refresh/history").await;
    let logs = json.as_array().unwrap();
    assert_eq!(logs.len(), 3);
    assert!(logs[0]["id"].as_i64().unwrap() > logs[2]["id"].as_i64().unwrap());
}
