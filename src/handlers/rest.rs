//! REST API over the sales store.
//!
//! Endpoints:
//! - `GET /api/v1/health`: health check
//! - `GET /api/v1/analysis/customer?start_date=..&end_date=..`: customer/order aggregates
//! - `POST /api/v1/data/refresh`: run one ingestion of the configured CSV file
//! - `GET /api/v1/data/refresh/history[?limit=N]`: most recent refresh log rows

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::{Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;
use sqlx::SqlitePool;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::analysis::{self, AnalysisError, CustomerAnalysis};
use crate::ingest::{RefreshOutcome, RefreshService};
use crate::storage::RefreshLog;

/// Shared state for axum handlers.
pub struct ApiState {
    pub pool: SqlitePool,
    pub refresh: RefreshService,
}

type AppState = Arc<ApiState>;

/// Start the REST server on `host:port`.
///
/// When `port` is 0, the OS assigns an ephemeral port. The actual bound
/// port is always logged so it can be discovered.
pub async fn serve(
    state: Arc<ApiState>,
    host: &str,
    port: u16,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let app = router(state);
    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    let actual_port = listener.local_addr()?.port();
    info!(host, port = actual_port, "sales REST API listening");
    axum::serve(listener, app).await?;
    Ok(())
}

/// Build the axum router (separated for testing).
pub fn router(state: Arc<ApiState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any);

    Router::new()
        .route("/api/v1/health", get(health))
        .route("/api/v1/analysis/customer", get(customer_analysis))
        .route("/api/v1/data/refresh", post(refresh_data))
        .route("/api/v1/data/refresh/history", get(refresh_history))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

// ============================================================================
// Errors
// ============================================================================

/// Error body returned by every endpoint: `{"error": "..."}`.
#[derive(Debug)]
struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    fn internal(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: message.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

// ============================================================================
// Handlers
// ============================================================================

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

#[derive(Debug, Deserialize)]
struct AnalysisParams {
    start_date: Option<String>,
    end_date: Option<String>,
}

async fn customer_analysis(
    State(state): State<AppState>,
    Query(params): Query<AnalysisParams>,
) -> Result<Json<CustomerAnalysis>, ApiError> {
    let (start, end) = match (params.start_date, params.end_date) {
        (Some(start), Some(end)) => (start, end),
        (start, end) => {
            let missing: Vec<&str> = [("start_date", start.is_none()), ("end_date", end.is_none())]
                .into_iter()
                .filter(|(_, absent)| *absent)
                .map(|(name, _)| name)
                .collect();
            return Err(ApiError::bad_request(format!(
                "Missing required query parameters: {}",
                missing.join(", ")
            )));
        }
    };

    let start = analysis::parse_date_param("start_date", &start)
        .map_err(|e| ApiError::bad_request(e.to_string()))?;
    let end = analysis::parse_date_param("end_date", &end)
        .map_err(|e| ApiError::bad_request(e.to_string()))?;

    match analysis::customer_analysis(&state.pool, start, end).await {
        Ok(result) => Ok(Json(result)),
        Err(e @ AnalysisError::InvalidRange { .. }) => Err(ApiError::bad_request(e.to_string())),
        Err(e) => {
            error!(error = %e, "customer analysis failed");
            Err(ApiError::internal(format!("Failed to get analysis: {e}")))
        }
    }
}

async fn refresh_data(State(state): State<AppState>) -> Result<Json<RefreshOutcome>, ApiError> {
    state
        .refresh
        .refresh()
        .await
        .map(Json)
        .map_err(|failure| ApiError::internal(format!("Failed to refresh data: {failure}")))
}

#[derive(Debug, Deserialize)]
struct HistoryParams {
    limit: Option<u64>,
}

async fn refresh_history(
    State(state): State<AppState>,
    Query(params): Query<HistoryParams>,
) -> Result<Json<Vec<RefreshLog>>, ApiError> {
    let limit = params.limit.unwrap_or_else(|| state.refresh.history_limit());

    state.refresh.history(limit).await.map(Json).map_err(|e| {
        error!(error = %e, "failed to read refresh history");
        ApiError::internal(format!("Failed to get refresh history: {e}"))
    })
}
