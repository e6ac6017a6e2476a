//! sales-load: one-shot CSV ingestion
//!
//! Loads a CSV file into the configured store and prints a summary of the
//! run. Exits non-zero if the load failed; the failure is still recorded in
//! the refresh log.

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Instant;

use clap::Parser;
use tracing::error;

use sales_ingest::config::Config;
use sales_ingest::ingest::{RefreshOutcome, RefreshService};
use sales_ingest::storage;
use sales_ingest::utils::bootstrap::init_tracing;

#[derive(Parser, Debug)]
#[command(name = "sales-load")]
#[command(about = "Load a sales CSV file into the store", long_about = None)]
struct Args {
    /// CSV file to load (defaults to ingest.csv_path from config).
    #[arg(long)]
    csv: Option<PathBuf>,
    /// YAML config file.
    #[arg(long)]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    init_tracing();
    let args = Args::parse();

    let config = Config::load(args.config.as_deref())?;
    let csv_path = args
        .csv
        .unwrap_or_else(|| PathBuf::from(&config.ingest.csv_path));

    if !csv_path.exists() {
        error!(path = %csv_path.display(), "CSV file does not exist");
        return Ok(ExitCode::FAILURE);
    }

    println!("Starting data load from: {}", csv_path.display());
    println!("Database: {}", config.storage.path);

    let started = Instant::now();
    let pool = storage::connect(&config.storage).await?;
    let service = RefreshService::new(pool, config.ingest.clone());

    let (outcome, code) = match service.refresh_from(&csv_path).await {
        Ok(outcome) => (outcome, ExitCode::SUCCESS),
        Err(failure) => {
            error!(error = %failure, "error processing CSV data");
            (failure.outcome, ExitCode::FAILURE)
        }
    };

    print_summary(&outcome, started.elapsed().as_secs_f64());
    Ok(code)
}

fn print_summary(outcome: &RefreshOutcome, seconds: f64) {
    let status = if outcome.success { "COMPLETED" } else { "FAILED" };

    println!("\nData Load Results:");
    println!("==================");
    println!("Status: {status}");
    println!("Message: {}", outcome.message);
    println!("Start Time: {}", outcome.start_time.to_rfc3339());
    println!("End Time: {}", outcome.end_time.to_rfc3339());
    println!("Rows Processed: {}", outcome.rows_processed);
    println!("Total Duration: {seconds:.2} seconds");
}
