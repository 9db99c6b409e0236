//! Order business logic - placing orders, listing them, and moving their status.
//!
//! Order lines snapshot the product name and unit price at creation. The client's
//! `totalAmount` is checked against the sum of those snapshots. Stock is checked
//! but never decremented.

use crate::{
    core::locks::{EntityLocks, LockKey},
    entities::{Order, OrderItem, OrderStatus, PaymentStatus, Product, order, order_item},
    errors::{Error, Result},
};
use chrono::Utc;
use sea_orm::{QueryOrder, Set, TransactionTrait, prelude::*};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{info, instrument};

/// Largest accepted gap between the submitted and the computed total.
pub const TOTAL_TOLERANCE: f64 = 0.01;

/// A requested order line.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderLine {
    /// Product to buy
    pub product_id: i64,
    /// Units to buy
    pub quantity: i32,
}

/// Input for `create_order`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NewOrder {
    /// Lines to buy
    pub products: Vec<OrderLine>,
    /// Total the client expects to pay
    pub total_amount: Option<f64>,
    /// Destination address
    pub shipping_address: String,
    /// Payment method label
    pub payment_method: Option<String>,
}

/// An order with its lines.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderView {
    /// The order row
    #[serde(flatten)]
    pub order: order::Model,
    /// Its lines
    pub items: Vec<order_item::Model>,
}

/// Finds an order by id, visible only to the user who placed it.
pub(crate) async fn require_order<C>(db: &C, user_id: i64, order_id: i64) -> Result<order::Model>
where
    C: ConnectionTrait,
{
    Order::find_by_id(order_id)
        .filter(order::Column::UserId.eq(user_id))
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("Order", order_id))
}

fn check_new_order(new_order: &NewOrder) -> Result<f64> {
    if new_order.products.is_empty() {
        return Err(Error::invalid_input("An order needs at least one product"));
    }
    if new_order.products.iter().any(|line| line.quantity < 1) {
        return Err(Error::invalid_input("Quantity must be at least 1"));
    }
    if new_order.shipping_address.trim().is_empty() {
        return Err(Error::invalid_input("Shipping address is required"));
    }
    match new_order.total_amount {
        Some(total) if total.is_finite() && total >= 0.0 => Ok(total),
        Some(_) => Err(Error::invalid_input("totalAmount must be a non-negative number")),
        None => Err(Error::invalid_input("totalAmount is required")),
    }
}

/// Places an order for the user.
///
/// # Errors
/// Returns:
/// - `InvalidInput` for no lines, a quantity below 1, a blank address, or a total
///   that does not match the lines
/// - `NotFound` for an unknown product
/// - `InvalidState` if a product does not have enough stock
#[instrument(skip(db, new_order), fields(lines = new_order.products.len()))]
pub async fn create_order(
    db: &DatabaseConnection,
    user_id: i64,
    new_order: NewOrder,
) -> Result<OrderView> {
    let claimed_total = check_new_order(&new_order)?;

    // Quantities per product, so a product listed twice is checked against stock once.
    let mut wanted: BTreeMap<i64, i32> = BTreeMap::new();
    for line in &new_order.products {
        let slot = wanted.entry(line.product_id).or_default();
        *slot = slot.saturating_add(line.quantity);
    }

    let txn = db.begin().await?;
    let mut snapshots = Vec::with_capacity(new_order.products.len());
    let mut computed_total = 0.0;
    for line in &new_order.products {
        let listed = Product::find_by_id(line.product_id)
            .one(&txn)
            .await?
            .ok_or_else(|| Error::not_found("Product", line.product_id))?;
        let total_wanted = wanted.get(&line.product_id).copied().unwrap_or(line.quantity);
        if total_wanted > listed.stock {
            return Err(Error::invalid_state(format!(
                "Only {} unit(s) of {} in stock",
                listed.stock, listed.name
            )));
        }
        computed_total += listed.price * f64::from(line.quantity);
        snapshots.push((listed, line.quantity));
    }

    if (computed_total - claimed_total).abs() > TOTAL_TOLERANCE {
        return Err(Error::invalid_input(format!(
            "totalAmount {claimed_total:.2} does not match the order lines ({computed_total:.2})"
        )));
    }

    let now = Utc::now();
    let placed = order::ActiveModel {
        user_id: Set(user_id),
        total_amount: Set(computed_total),
        shipping_address: Set(new_order.shipping_address.trim().to_string()),
        payment_method: Set(new_order.payment_method),
        status: Set(OrderStatus::Pending),
        payment_status: Set(PaymentStatus::Pending),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    let mut items = Vec::with_capacity(snapshots.len());
    for (listed, quantity) in snapshots {
        let item = order_item::ActiveModel {
            order_id: Set(placed.id),
            product_id: Set(Some(listed.id)),
            product_name: Set(listed.name),
            unit_price: Set(listed.price),
            quantity: Set(quantity),
            ..Default::default()
        }
        .insert(&txn)
        .await?;
        items.push(item);
    }

    txn.commit().await?;
    info!(order_id = placed.id, user_id, total = placed.total_amount, "Order placed");
    Ok(OrderView {
        order: placed,
        items,
    })
}

/// Lists the user's orders, newest first, each with its lines.
///
/// # Errors
/// Returns an error if the database query fails.
pub async fn list_orders(db: &DatabaseConnection, user_id: i64) -> Result<Vec<OrderView>> {
    let rows = Order::find()
        .filter(order::Column::UserId.eq(user_id))
        .order_by_desc(order::Column::CreatedAt)
        .order_by_desc(order::Column::Id)
        .find_with_related(OrderItem)
        .all(db)
        .await?;

    Ok(rows
        .into_iter()
        .map(|(order, mut items)| {
            items.sort_by_key(|item| item.id);
            OrderView { order, items }
        })
        .collect())
}

/// Moves an order forward: `Pending → Shipped | Delivered`, `Shipped → Delivered`.
///
/// # Errors
/// Returns `NotFound` if the order does not exist or belongs to someone else, and
/// `InvalidState` for any other transition (cancelling goes through `cancel_order`).
#[instrument(skip(db, locks))]
pub async fn update_order_status(
    db: &DatabaseConnection,
    locks: &EntityLocks,
    user_id: i64,
    order_id: i64,
    status: OrderStatus,
) -> Result<order::Model> {
    let _guard = locks.acquire(LockKey::Order(order_id)).await;

    let current = require_order(db, user_id, order_id).await?;
    if !current.status.can_advance_to(status) {
        return Err(Error::invalid_state(format!(
            "Cannot change order status from {:?} to {status:?}",
            current.status
        )));
    }

    let mut active: order::ActiveModel = current.into();
    active.status = Set(status);
    active.updated_at = Set(Utc::now());
    let updated = active.update(db).await?;
    info!(order_id, status = ?updated.status, "Order status updated");
    Ok(updated)
}

/// Cancels a pending order.
///
/// # Errors
/// Returns `NotFound` if the order does not exist or belongs to someone else, and
/// `InvalidState` unless the order is `Pending`.
#[instrument(skip(db, locks))]
pub async fn cancel_order(
    db: &DatabaseConnection,
    locks: &EntityLocks,
    user_id: i64,
    order_id: i64,
) -> Result<order::Model> {
    let _guard = locks.acquire(LockKey::Order(order_id)).await;

    let current = require_order(db, user_id, order_id).await?;
    if current.status != OrderStatus::Pending {
        return Err(Error::invalid_state("Only pending orders can be cancelled"));
    }

    let mut active: order::ActiveModel = current.into();
    active.status = Set(OrderStatus::Cancelled);
    active.updated_at = Set(Utc::now());
    let cancelled = active.update(db).await?;
    info!(order_id, "Order cancelled");
    Ok(cancelled)
}
