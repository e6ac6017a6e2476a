//! sales-server: REST API over the sales store
//!
//! ## Architecture
//! ```text
//! [HTTP client] -> [sales-server :8080] -> [RefreshService] -> [SQLite]
//!                          |                                      ^
//!                          +------> [analysis queries] -----------+
//! ```
//!
//! ## Configuration
//! - SALES_CONFIG: path to a YAML config file (optional)
//! - SALES__SERVER__PORT / SALES__STORAGE__PATH / SALES__INGEST__CSV_PATH: overrides
//! - SALES_LOG: tracing filter (default: info)

use std::sync::Arc;

use tracing::info;

use sales_ingest::config::Config;
use sales_ingest::handlers::rest::{self, ApiState};
use sales_ingest::ingest::RefreshService;
use sales_ingest::storage;
use sales_ingest::utils::bootstrap::init_tracing;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    init_tracing();

    let config = Config::load(None)?;
    info!(
        storage = %config.storage.path,
        csv = %config.ingest.csv_path,
        "starting sales-server"
    );

    let pool = storage::connect(&config.storage).await?;
    let state = Arc::new(ApiState {
        refresh: RefreshService::new(pool.clone(), config.ingest.clone()),
        pool,
    });

    rest::serve(state, &config.server.host, config.server.port).await
}
