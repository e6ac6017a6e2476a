//! Create-once entity writes and line item appends.

use std::collections::HashSet;

use sqlx::SqliteConnection;
use tracing::trace;

use super::coerce::SaleLine;
use super::{EntityKind, IngestError, Result};
use crate::storage::{self, sqlite, Customer, Order, Product};

/// Result of a create-once write.
#[derive(Debug, Clone, PartialEq)]
pub enum Upserted<T> {
    /// No row had this id; the candidate was stored.
    Created(T),
    /// A row already existed and was left as it was.
    Existing(T),
}

impl<T> Upserted<T> {
    pub fn was_created(&self) -> bool {
        matches!(self, Upserted::Created(_))
    }

    pub fn into_inner(self) -> T {
        match self {
            Upserted::Created(v) | Upserted::Existing(v) => v,
        }
    }
}

/// Ensure a customer with `candidate.id` exists. An existing row is never updated.
pub async fn ensure_customer(
    conn: &mut SqliteConnection,
    candidate: &Customer,
) -> storage::Result<Upserted<Customer>> {
    if let Some(existing) = sqlite::find_customer(conn, &candidate.id).await? {
        return Ok(Upserted::Existing(existing));
    }
    if sqlite::insert_customer(conn, candidate).await? {
        return Ok(Upserted::Created(candidate.clone()));
    }
    // Another writer got there first; its row wins.
    let stored = sqlite::find_customer(conn, &candidate.id).await?;
    Ok(Upserted::Existing(stored.unwrap_or_else(|| candidate.clone())))
}

/// Ensure a product with `candidate.id` exists.
pub async fn ensure_product(
    conn: &mut SqliteConnection,
    candidate: &Product,
) -> storage::Result<Upserted<Product>> {
    if let Some(existing) = sqlite::find_product(conn, &candidate.id).await? {
        return Ok(Upserted::Existing(existing));
    }
    if sqlite::insert_product(conn, candidate).await? {
        return Ok(Upserted::Created(candidate.clone()));
    }
    let stored = sqlite::find_product(conn, &candidate.id).await?;
    Ok(Upserted::Existing(stored.unwrap_or_else(|| candidate.clone())))
}

/// Ensure an order with `candidate.id` exists. Its customer must already exist.
pub async fn ensure_order(
    conn: &mut SqliteConnection,
    candidate: &Order,
) -> storage::Result<Upserted<Order>> {
    if let Some(existing) = sqlite::find_order(conn, &candidate.id).await? {
        return Ok(Upserted::Existing(existing));
    }
    if sqlite::insert_order(conn, candidate).await? {
        return Ok(Upserted::Created(candidate.clone()));
    }
    let stored = sqlite::find_order(conn, &candidate.id).await?;
    Ok(Upserted::Existing(stored.unwrap_or_else(|| candidate.clone())))
}

/// What a run wrote.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriteCounts {
    pub customers_created: usize,
    pub products_created: usize,
    pub orders_created: usize,
    pub line_items: usize,
}

/// Applies rows of one run, remembering which ids it has already ensured.
///
/// The id sets only skip repeated existence checks; the store stays the
/// authority on whether an entity exists.
#[derive(Debug, Default)]
pub struct RowWriter {
    customers: HashSet<String>,
    products: HashSet<String>,
    orders: HashSet<String>,
    counts: WriteCounts,
}

impl RowWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Write one row: customer, product, order, then the line item.
    pub async fn apply(&mut self, conn: &mut SqliteConnection, line: &SaleLine) -> Result<()> {
        if !self.customers.contains(&line.customer.id) {
            let upserted = ensure_customer(conn, &line.customer)
                .await
                .map_err(|source| IngestError::EntityWriteFailure {
                    entity: EntityKind::Customer,
                    id: line.customer.id.clone(),
                    source,
                })?;
            if upserted.was_created() {
                self.counts.customers_created += 1;
            }
            self.customers.insert(line.customer.id.clone());
        }

        if !self.products.contains(&line.product.id) {
            let upserted = ensure_product(conn, &line.product)
                .await
                .map_err(|source| IngestError::EntityWriteFailure {
                    entity: EntityKind::Product,
                    id: line.product.id.clone(),
                    source,
                })?;
            if upserted.was_created() {
                self.counts.products_created += 1;
            }
            self.products.insert(line.product.id.clone());
        }

        if !self.orders.contains(&line.order.id) {
            let upserted = ensure_order(conn, &line.order)
                .await
                .map_err(|source| IngestError::EntityWriteFailure {
                    entity: EntityKind::Order,
                    id: line.order.id.clone(),
                    source,
                })?;
            if upserted.was_created() {
                self.counts.orders_created += 1;
            }
            self.orders.insert(line.order.id.clone());
        }

        let item_id = sqlite::insert_line_item(conn, &line.item)
            .await
            .map_err(|source| IngestError::FactWriteFailure {
                order_id: line.item.order_id.clone(),
                product_id: line.item.product_id.clone(),
                source,
            })?;
        self.counts.line_items += 1;

        trace!(item_id, order_id = %line.item.order_id, "line item appended");
        Ok(())
    }

    pub fn counts(&self) -> WriteCounts {
        self.counts
    }
}
