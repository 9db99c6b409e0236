//! Store entity - A seller's catalog container.
//!
//! A store is owned by exactly one user. Its product list is every product whose
//! `store_id` points here, so the two directions of the link cannot disagree.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Store database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "stores")]
#[serde(rename_all = "camelCase")]
pub struct Model {
    /// Unique identifier for the store
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Public shop name
    pub shop_name: String,
    /// Physical or mailing address of the shop
    pub address: String,
    /// Free-text store category (e.g. "electronics")
    pub category: String,
    /// The seller who owns this store
    #[sea_orm(unique)]
    pub owner_id: i64,
    /// When the store was created
    pub created_at: DateTimeUtc,
}

/// Defines relationships between Store and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each store belongs to one user
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::OwnerId",
        to = "super::user::Column::Id",
        on_delete = "Cascade"
    )]
    Owner,
    /// One store lists many products
    #[sea_orm(has_many = "super::product::Entity")]
    Products,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Owner.def()
    }
}

impl Related<super::product::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Products.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
