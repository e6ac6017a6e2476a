//! String field conversion.

use chrono::NaiveDate;
use serde::Deserialize;
use tracing::debug;

use super::row::SalesRow;
use super::{IngestError, Result};
use crate::storage::sqlite::DATE_FORMAT;
use crate::storage::{Customer, LineItem, Order, Product};

/// How unparsable numeric and date fields are handled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CoercionPolicy {
    /// Substitute the type's zero value and keep going.
    #[default]
    Lenient,
    /// Fail the run with [`IngestError::FieldCoercion`].
    Strict,
}

/// The entities and fact described by one source row.
#[derive(Debug, Clone, PartialEq)]
pub struct SaleLine {
    pub customer: Customer,
    pub product: Product,
    pub order: Order,
    pub item: LineItem,
}

/// Date substituted for an unparsable sale date: 0001-01-01.
pub fn zero_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(1, 1, 1).unwrap_or(NaiveDate::MIN)
}

/// Convert row `index` (1-based) into typed entities.
pub fn coerce_row(row: &SalesRow, index: usize, policy: CoercionPolicy) -> Result<SaleLine> {
    let conv = Converter { index, policy };

    let quantity = conv.integer("quantity", &row.quantity_sold)?;
    let unit_price = conv.decimal("unit_price", &row.unit_price)?;
    let discount = conv.decimal("discount", &row.discount)?;
    let shipping_cost = conv.decimal("shipping_cost", &row.shipping_cost)?;
    let date = conv.date("date_of_sale", &row.date_of_sale)?;

    Ok(SaleLine {
        customer: Customer {
            id: row.customer_id.clone(),
            name: row.customer_name.clone(),
            email: row.customer_email.clone(),
            address: row.customer_address.clone(),
        },
        product: Product {
            id: row.product_id.clone(),
            name: row.product_name.clone(),
            category: row.category.clone(),
            unit_price,
        },
        order: Order {
            id: row.order_id.clone(),
            customer_id: row.customer_id.clone(),
            region: row.region.clone(),
            date,
            payment_method: row.payment_method.clone(),
            shipping_cost,
        },
        item: LineItem {
            order_id: row.order_id.clone(),
            product_id: row.product_id.clone(),
            quantity,
            unit_price,
            discount,
        },
    })
}

struct Converter {
    index: usize,
    policy: CoercionPolicy,
}

impl Converter {
    fn integer(&self, field: &'static str, value: &str) -> Result<i64> {
        self.resolve(field, value, value.parse().ok(), 0)
    }

    // Non-finite values would not survive the round trip through SQL text.
    fn decimal(&self, field: &'static str, value: &str) -> Result<f64> {
        let parsed = value.parse::<f64>().ok().filter(|v| v.is_finite());
        self.resolve(field, value, parsed, 0.0)
    }

    fn date(&self, field: &'static str, value: &str) -> Result<NaiveDate> {
        let parsed = NaiveDate::parse_from_str(value, DATE_FORMAT).ok();
        self.resolve(field, value, parsed, zero_date())
    }

    fn resolve<T>(&self, field: &'static str, value: &str, parsed: Option<T>, zero: T) -> Result<T> {
        match (parsed, self.policy) {
            (Some(v), _) => Ok(v),
            (None, CoercionPolicy::Lenient) => {
                debug!(row = self.index, field, value, "unparsable field replaced with zero value");
                Ok(zero)
            }
            (None, CoercionPolicy::Strict) => Err(IngestError::FieldCoercion {
                row: self.index,
                field,
                value: value.to_string(),
            }),
        }
    }
}
