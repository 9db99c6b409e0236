//! Order entity - Immutable snapshot of purchased lines plus a mutable status.
//!
//! Orders are never deleted; cancelling is a status change.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Fulfilment status of an order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
pub enum OrderStatus {
    /// Placed, not yet shipped
    #[sea_orm(string_value = "Pending")]
    Pending,
    /// Handed to the carrier
    #[sea_orm(string_value = "Shipped")]
    Shipped,
    /// Received by the buyer
    #[sea_orm(string_value = "Delivered")]
    Delivered,
    /// Cancelled while still pending
    #[sea_orm(string_value = "Cancelled")]
    Cancelled,
}

impl OrderStatus {
    /// Whether a status update may move an order from `self` to `next`.
    ///
    /// `Cancelled` is never a valid target here; cancellation has its own
    /// operation that only accepts `Pending` orders.
    #[must_use]
    pub const fn can_advance_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Shipped | Self::Delivered) | (Self::Shipped, Self::Delivered)
        )
    }
}

/// Payment status of an order (mock payment flow).
#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
pub enum PaymentStatus {
    /// Awaiting payment
    #[sea_orm(string_value = "Pending")]
    Pending,
    /// Payment succeeded
    #[sea_orm(string_value = "Paid")]
    Paid,
    /// Payment attempt failed
    #[sea_orm(string_value = "Failed")]
    Failed,
}

/// Order database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "orders")]
#[serde(rename_all = "camelCase")]
pub struct Model {
    /// Unique identifier for the order
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Buyer who placed the order
    pub user_id: i64,
    /// Total charged, validated against the line items at creation
    pub total_amount: f64,
    /// Where the order ships to
    pub shipping_address: String,
    /// Payment method chosen by the buyer (e.g. "card")
    pub payment_method: Option<String>,
    /// Fulfilment status
    pub status: OrderStatus,
    /// Payment status
    pub payment_status: PaymentStatus,
    /// When the order was placed
    pub created_at: DateTimeUtc,
    /// When status or payment status last changed
    pub updated_at: DateTimeUtc,
}

/// Defines relationships between Order and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each order belongs to one user
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id"
    )]
    User,
    /// One order has many lines
    #[sea_orm(has_many = "super::order_item::Entity")]
    Items,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl Related<super::order_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Items.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
