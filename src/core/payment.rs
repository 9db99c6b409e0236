//! Mock payment - records a payment outcome on an order.
//!
//! There is no gateway. The caller reports the outcome, `Paid` by default, and
//! the order's payment status is updated under the order lock.

use crate::{
    core::{
        locks::{EntityLocks, LockKey},
        order::require_order,
    },
    entities::{OrderStatus, PaymentStatus, order},
    errors::{Error, Result},
};
use chrono::Utc;
use sea_orm::{Set, prelude::*};
use tracing::{info, instrument};

/// Applies a mock payment result to one of the user's orders.
///
/// # Errors
/// Returns `NotFound` if the order does not exist or belongs to someone else, and
/// `InvalidState` if it is already paid or was cancelled.
#[instrument(skip(db, locks))]
pub async fn process_payment(
    db: &DatabaseConnection,
    locks: &EntityLocks,
    user_id: i64,
    order_id: i64,
    payment_status: Option<PaymentStatus>,
) -> Result<order::Model> {
    let _guard = locks.acquire(LockKey::Order(order_id)).await;

    let current = require_order(db, user_id, order_id).await?;
    if current.payment_status == PaymentStatus::Paid {
        return Err(Error::invalid_state("Order is already paid"));
    }
    if current.status == OrderStatus::Cancelled {
        return Err(Error::invalid_state("Cancelled orders cannot be paid"));
    }

    let mut active: order::ActiveModel = current.into();
    active.payment_status = Set(payment_status.unwrap_or(PaymentStatus::Paid));
    active.updated_at = Set(Utc::now());
    let updated = active.update(db).await?;
    info!(order_id, payment_status = ?updated.payment_status, "Payment processed");
    Ok(updated)
}
