//! CSV source parsing.
//!
//! Only the shape of each record is checked here. Values stay as strings
//! until [`super::coerce`] converts them.

use std::io::Read;
use std::path::Path;

use csv::{ReaderBuilder, StringRecord};
use tracing::debug;

use super::{IngestError, Result};

/// Number of fields every data row must carry.
pub const COLUMN_COUNT: usize = 15;

/// One untyped data row, in source column order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SalesRow {
    pub order_id: String,
    pub product_id: String,
    pub customer_id: String,
    pub product_name: String,
    pub category: String,
    pub region: String,
    pub date_of_sale: String,
    pub quantity_sold: String,
    pub unit_price: String,
    pub discount: String,
    pub shipping_cost: String,
    pub payment_method: String,
    pub customer_name: String,
    pub customer_email: String,
    pub customer_address: String,
}

impl SalesRow {
    /// Build a row from a record already known to have enough fields.
    /// Fields beyond the fifteenth are ignored.
    fn from_record(record: &StringRecord) -> Self {
        let field = |i: usize| record.get(i).unwrap_or_default().to_string();

        Self {
            order_id: field(0),
            product_id: field(1),
            customer_id: field(2),
            product_name: field(3),
            category: field(4),
            region: field(5),
            date_of_sale: field(6),
            quantity_sold: field(7),
            unit_price: field(8),
            discount: field(9),
            shipping_cost: field(10),
            payment_method: field(11),
            customer_name: field(12),
            customer_email: field(13),
            customer_address: field(14),
        }
    }
}

/// Parse the CSV file at `path`.
pub fn parse_file(path: &Path) -> Result<Vec<SalesRow>> {
    let display = path.display().to_string();

    let reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(path)
        .map_err(|source| IngestError::SourceUnreadable {
            path: display.clone(),
            source,
        })?;

    collect_rows(reader, &display)
}

/// Parse CSV from any reader. `name` identifies the source in errors.
pub fn parse_reader<R: Read>(reader: R, name: &str) -> Result<Vec<SalesRow>> {
    let reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);

    collect_rows(reader, name)
}

fn collect_rows<R: Read>(mut reader: csv::Reader<R>, name: &str) -> Result<Vec<SalesRow>> {
    let mut rows = Vec::new();

    for (index, record) in reader.records().enumerate() {
        let record = record.map_err(|source| IngestError::SourceUnreadable {
            path: name.to_string(),
            source,
        })?;

        // Data rows are numbered from 1; the header is not counted.
        let row = index + 1;
        if record.len() < COLUMN_COUNT {
            return Err(IngestError::MalformedRow {
                row,
                fields: record.len(),
            });
        }

        rows.push(SalesRow::from_record(&record));
    }

    if rows.is_empty() {
        return Err(IngestError::InsufficientData);
    }

    debug!(source = name, rows = rows.len(), "parsed CSV source");
    Ok(rows)
}
