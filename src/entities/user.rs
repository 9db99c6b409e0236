//! User entity - Represents a registered account.
//!
//! Every user starts as a buyer. Creating a store promotes the user to seller.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Account role, stored as lowercase text.
#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Default role for new accounts
    #[sea_orm(string_value = "buyer")]
    Buyer,
    /// A user who owns a store
    #[sea_orm(string_value = "seller")]
    Seller,
    /// Administrative account
    #[sea_orm(string_value = "admin")]
    Admin,
}

/// User database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "users")]
#[serde(rename_all = "camelCase")]
pub struct Model {
    /// Unique identifier for the user
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Display name shown next to ratings
    pub name: String,
    /// Login email, unique across accounts
    #[sea_orm(unique)]
    pub email: String,
    /// Salted password digest (`salt$hex`)
    #[serde(skip_serializing)]
    pub password_digest: String,
    /// Account role
    pub role: Role,
    /// Default shipping address
    pub address: Option<String>,
    /// Contact phone number
    pub phone: Option<String>,
    /// When the account was created
    pub created_at: DateTimeUtc,
}

/// Defines relationships between User and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// A seller owns at most one store
    #[sea_orm(has_one = "super::store::Entity")]
    Store,
    /// A user holds any number of login sessions
    #[sea_orm(has_many = "super::session::Entity")]
    Sessions,
    /// A user has at most one cart
    #[sea_orm(has_one = "super::cart::Entity")]
    Cart,
    /// A user places many orders
    #[sea_orm(has_many = "super::order::Entity")]
    Orders,
}

impl Related<super::store::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Store.def()
    }
}

impl Related<super::session::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Sessions.def()
    }
}

impl Related<super::cart::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Cart.def()
    }
}

impl Related<super::order::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Orders.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
