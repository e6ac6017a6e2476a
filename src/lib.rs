//! Sales ingestion
//!
//! Loads sales records from a CSV file into SQLite as customers, products,
//! orders and line items, keeps an audit trail of every load, and serves
//! aggregate queries over the result through a REST API.

pub mod analysis;
pub mod config;
pub mod handlers;
pub mod ingest;
pub mod storage;
pub mod utils;
