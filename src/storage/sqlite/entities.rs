//! Customer, product, order and line item rows.

use chrono::Utc;
use sea_query::{Expr, OnConflict, Query, SqliteQueryBuilder};
use sqlx::{Row, SqliteConnection};

use super::{format_timestamp, parse_date, DATE_FORMAT};
use crate::storage::schema::{Customers, OrderItems, Orders, Products};
use crate::storage::{Customer, LineItem, Order, Product, Result};

/// Look up a customer by id.
pub async fn find_customer(conn: &mut SqliteConnection, id: &str) -> Result<Option<Customer>> {
    let query = Query::select()
        .columns([
            Customers::Id,
            Customers::Name,
            Customers::Email,
            Customers::Address,
        ])
        .from(Customers::Table)
        .and_where(Expr::col(Customers::Id).eq(id))
        .to_string(SqliteQueryBuilder);

    let row = sqlx::query(&query).fetch_optional(&mut *conn).await?;

    Ok(row.map(|row| Customer {
        id: row.get("id"),
        name: row.get("name"),
        email: row.get("email"),
        address: row.get("address"),
    }))
}

/// Insert a customer unless one with the same id already exists.
///
/// Returns `false` when the id was taken; the stored row is left untouched.
pub async fn insert_customer(conn: &mut SqliteConnection, customer: &Customer) -> Result<bool> {
    let now = format_timestamp(Utc::now());

    let query = Query::insert()
        .into_table(Customers::Table)
        .columns([
            Customers::Id,
            Customers::Name,
            Customers::Email,
            Customers::Address,
            Customers::CreatedAt,
            Customers::UpdatedAt,
        ])
        .values_panic([
            customer.id.as_str().into(),
            customer.name.as_str().into(),
            customer.email.as_str().into(),
            customer.address.as_str().into(),
            now.clone().into(),
            now.into(),
        ])
        .on_conflict(OnConflict::column(Customers::Id).do_nothing().to_owned())
        .to_string(SqliteQueryBuilder);

    let result = sqlx::query(&query).execute(&mut *conn).await?;
    Ok(result.rows_affected() > 0)
}

/// Look up a product by id.
pub async fn find_product(conn: &mut SqliteConnection, id: &str) -> Result<Option<Product>> {
    let query = Query::select()
        .columns([
            Products::Id,
            Products::Name,
            Products::Category,
            Products::UnitPrice,
        ])
        .from(Products::Table)
        .and_where(Expr::col(Products::Id).eq(id))
        .to_string(SqliteQueryBuilder);

    let row = sqlx::query(&query).fetch_optional(&mut *conn).await?;

    Ok(row.map(|row| Product {
        id: row.get("id"),
        name: row.get("name"),
        category: row.get("category"),
        unit_price: row.get("unit_price"),
    }))
}

/// Insert a product unless one with the same id already exists.
pub async fn insert_product(conn: &mut SqliteConnection, product: &Product) -> Result<bool> {
    let now = format_timestamp(Utc::now());

    let query = Query::insert()
        .into_table(Products::Table)
        .columns([
            Products::Id,
            Products::Name,
            Products::Category,
            Products::UnitPrice,
            Products::CreatedAt,
            Products::UpdatedAt,
        ])
        .values_panic([
            product.id.as_str().into(),
            product.name.as_str().into(),
            product.category.as_str().into(),
            product.unit_price.into(),
            now.clone().into(),
            now.into(),
        ])
        .on_conflict(OnConflict::column(Products::Id).do_nothing().to_owned())
        .to_string(SqliteQueryBuilder);

    let result = sqlx::query(&query).execute(&mut *conn).await?;
    Ok(result.rows_affected() > 0)
}

/// Look up an order by id.
pub async fn find_order(conn: &mut SqliteConnection, id: &str) -> Result<Option<Order>> {
    let query = Query::select()
        .columns([
            Orders::Id,
            Orders::CustomerId,
            Orders::Region,
            Orders::Date,
            Orders::PaymentMethod,
            Orders::ShippingCost,
        ])
        .from(Orders::Table)
        .and_where(Expr::col(Orders::Id).eq(id))
        .to_string(SqliteQueryBuilder);

    let row = sqlx::query(&query).fetch_optional(&mut *conn).await?;

    match row {
        Some(row) => {
            let date: String = row.get("date");
            Ok(Some(Order {
                id: row.get("id"),
                customer_id: row.get("customer_id"),
                region: row.get("region"),
                date: parse_date(&date)?,
                payment_method: row.get("payment_method"),
                shipping_cost: row.get("shipping_cost"),
            }))
        }
        None => Ok(None),
    }
}

/// Insert an order unless one with the same id already exists.
///
/// The referenced customer must already be visible on `conn`.
pub async fn insert_order(conn: &mut SqliteConnection, order: &Order) -> Result<bool> {
    let now = format_timestamp(Utc::now());
    let date = order.date.format(DATE_FORMAT).to_string();

    let query = Query::insert()
        .into_table(Orders::Table)
        .columns([
            Orders::Id,
            Orders::CustomerId,
            Orders::Region,
            Orders::Date,
            Orders::PaymentMethod,
            Orders::ShippingCost,
            Orders::CreatedAt,
            Orders::UpdatedAt,
        ])
        .values_panic([
            order.id.as_str().into(),
            order.customer_id.as_str().into(),
            order.region.as_str().into(),
            date.into(),
            order.payment_method.as_str().into(),
            order.shipping_cost.into(),
            now.clone().into(),
            now.into(),
        ])
        .on_conflict(OnConflict::column(Orders::Id).do_nothing().to_owned())
        .to_string(SqliteQueryBuilder);

    let result = sqlx::query(&query).execute(&mut *conn).await?;
    Ok(result.rows_affected() > 0)
}

/// Append a line item and return its generated id.
pub async fn insert_line_item(conn: &mut SqliteConnection, item: &LineItem) -> Result<i64> {
    let now = format_timestamp(Utc::now());

    let query = Query::insert()
        .into_table(OrderItems::Table)
        .columns([
            OrderItems::OrderId,
            OrderItems::ProductId,
            OrderItems::Quantity,
            OrderItems::UnitPrice,
            OrderItems::Discount,
            OrderItems::CreatedAt,
            OrderItems::UpdatedAt,
        ])
        .values_panic([
            item.order_id.as_str().into(),
            item.product_id.as_str().into(),
            item.quantity.into(),
            item.unit_price.into(),
            item.discount.into(),
            now.clone().into(),
            now.into(),
        ])
        .to_string(SqliteQueryBuilder);

    let result = sqlx::query(&query).execute(&mut *conn).await?;
    Ok(result.last_insert_rowid())
}
