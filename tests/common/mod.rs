//! Shared utilities for integration tests.
//!
//! Builds CSV fixtures on disk and inspects the in-memory SQLite store.

#![allow(dead_code)]

use std::path::{Path, PathBuf};

use sqlx::SqlitePool;

use sales_ingest::config::{Config, IngestConfig};
use sales_ingest::ingest::{CoercionPolicy, RefreshService};
use sales_ingest::storage;

pub const HEADER: &str = "Order ID,Product ID,Customer ID,Product Name,Category,Region,Date of Sale,Quantity Sold,Unit Price,Discount,Shipping Cost,Payment Method,Customer Name,Customer Email,Customer Address";

/// One sale, rendered as a 15-field CSV line by [`Sale::line`].
#[derive(Debug, Clone)]
pub struct Sale {
    pub order_id: &'static str,
    pub product_id: &'static str,
    pub customer_id: &'static str,
    pub customer_name: &'static str,
    pub date: &'static str,
    pub quantity: &'static str,
    pub unit_price: &'static str,
    pub discount: &'static str,
}

impl Sale {
    pub fn new(
        order_id: &'static str,
        product_id: &'static str,
        customer_id: &'static str,
        customer_name: &'static str,
    ) -> Self {
        Self {
            order_id,
            product_id,
            customer_id,
            customer_name,
            date: "2024-01-10",
            quantity: "1",
            unit_price: "10.00",
            discount: "0",
        }
    }

    pub fn on(mut self, date: &'static str) -> Self {
        self.date = date;
        self
    }

    pub fn priced(
        mut self,
        quantity: &'static str,
        unit_price: &'static str,
        discount: &'static str,
    ) -> Self {
        self.quantity = quantity;
        self.unit_price = unit_price;
        self.discount = discount;
        self
    }

    pub fn line(&self) -> String {
        format!(
            "{},{},{},Product {},Category,North America,{},{},{},{},5.00,Credit Card,{},{}@example.com,\"1 Main St, Springfield\"",
            self.order_id,
            self.product_id,
            self.customer_id,
            self.product_id,
            self.date,
            self.quantity,
            self.unit_price,
            self.discount,
            self.customer_name,
            self.customer_name.to_lowercase(),
        )
    }
}

/// Write a header plus `lines` to `name` inside `dir`.
pub fn write_csv(dir: &Path, name: &str, lines: &[String]) -> PathBuf {
    let mut body = String::from(HEADER);
    body.push('\n');
    for line in lines {
        body.push_str(line);
        body.push('\n');
    }

    let path = dir.join(name);
    std::fs::write(&path, body).expect("Failed to write CSV fixture");
    path
}

/// The three-row fixture: two rows share customer C1 and order O1.
pub fn three_rows() -> Vec<String> {
    vec![
        Sale::new("O1", "P1", "C1", "Alice").priced("2", "10.00", "0").line(),
        Sale::new("O1", "P2", "C1", "Impostor").priced("1", "5.00", "0.5").line(),
        Sale::new("O2", "P1", "C2", "Bob")
            .on("2024-02-15")
            .priced("3", "10.00", "0.1")
            .line(),
    ]
}

/// Open the store the test configuration describes (in-memory SQLite).
pub async fn memory_pool() -> SqlitePool {
    storage::connect(&Config::for_test().storage)
        .await
        .expect("Failed to open in-memory store")
}

pub fn ingest_config(csv_path: &Path, coercion: CoercionPolicy) -> IngestConfig {
    IngestConfig {
        csv_path: csv_path.to_string_lossy().into_owned(),
        coercion,
        history_limit: 10,
    }
}

pub fn service(pool: &SqlitePool, csv_path: &Path) -> RefreshService {
    RefreshService::new(pool.clone(), ingest_config(csv_path, CoercionPolicy::Lenient))
}

pub async fn count(pool: &SqlitePool, table: &str) -> i64 {
    sqlx::query_scalar::<_, i64>(&format!("SELECT COUNT(*) FROM {table}"))
        .fetch_one(pool)
        .await
        .expect("Failed to count rows")
}

/// Row counts of (customers, products, orders, order_items).
pub async fn entity_counts(pool: &SqlitePool) -> (i64, i64, i64, i64) {
    (
        count(pool, "customers").await,
        count(pool, "products").await,
        count(pool, "orders").await,
        count(pool, "order_items").await,
    )
}

/// Make SQLite reject any insert into `table` whose `column` equals `value`.
pub async fn reject_insert(pool: &SqlitePool, table: &str, column: &str, value: &str) {
    let sql = format!(
        "CREATE TRIGGER reject_{table} BEFORE INSERT ON {table} \
         WHEN NEW.{column} = '{value}' \
         BEGIN SELECT RAISE(ABORT, 'rejected by test trigger'); END"
    );
    sqlx::query(&sql)
        .execute(pool)
        .await
        .expect("Failed to install trigger");
}

/// Make every transaction that inserts an order item fail at COMMIT.
///
/// Each item inserts an orphan into a table whose foreign key is deferred,
/// so the violation is only detected when the transaction commits.
pub async fn fail_commit_after_item(pool: &SqlitePool) {
    let statements = [
        "CREATE TABLE commit_guard_parent (id INTEGER PRIMARY KEY)",
        "CREATE TABLE commit_guard (\
         parent_id INTEGER REFERENCES commit_guard_parent(id) DEFERRABLE INITIALLY DEFERRED)",
        "CREATE TRIGGER orphan_on_item AFTER INSERT ON order_items \
         BEGIN INSERT INTO commit_guard (parent_id) VALUES (NEW.id); END",
    ];
    for sql in statements {
        sqlx::query(sql)
            .execute(pool)
            .await
            .expect("Failed to install commit guard");
    }
}
