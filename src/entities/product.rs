//! Product entity - Represents an item listed by a store.
//!
//! Each product belongs to one store and one category, optionally one subcategory.
//! `average_rating` is derived from the product's ratings and is only written by
//! the rating aggregator.

use super::json::StringList;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Product database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "products")]
#[serde(rename_all = "camelCase")]
pub struct Model {
    /// Unique identifier for the product
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Name of the product (e.g., "Wireless Mouse")
    pub name: String,
    /// Long-form description
    pub description: String,
    /// Base price per unit
    pub price: f64,
    /// Units in stock
    pub stock: i32,
    /// Category this product is listed under
    pub category_id: i64,
    /// Optional subcategory within the category
    pub subcategory_id: Option<i64>,
    /// Store that owns this product
    pub store_id: i64,
    /// Image paths, in display order
    #[sea_orm(column_type = "Json")]
    pub images: StringList,
    /// Feature bullet points
    #[sea_orm(column_type = "Json")]
    pub features: StringList,
    /// Mean of all current rating values, 0 when unrated
    pub average_rating: f64,
    /// When the product was created
    pub created_at: DateTimeUtc,
    /// When the product was last modified
    pub updated_at: DateTimeUtc,
}

/// Defines relationships between Product and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each product belongs to one store
    #[sea_orm(
        belongs_to = "super::store::Entity",
        from = "Column::StoreId",
        to = "super::store::Column::Id",
        on_delete = "Cascade"
    )]
    Store,
    /// Each product is listed under one category
    #[sea_orm(
        belongs_to = "super::category::Entity",
        from = "Column::CategoryId",
        to = "super::category::Column::Id"
    )]
    Category,
    /// A product may sit in one subcategory
    #[sea_orm(
        belongs_to = "super::subcategory::Entity",
        from = "Column::SubcategoryId",
        to = "super::subcategory::Column::Id",
        on_delete = "SetNull"
    )]
    Subcategory,
    /// One product collects many ratings
    #[sea_orm(has_many = "super::rating::Entity")]
    Ratings,
    /// One product offers many variations
    #[sea_orm(has_many = "super::variation::Entity")]
    Variations,
}

impl Related<super::store::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Store.def()
    }
}

impl Related<super::category::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Category.def()
    }
}

impl Related<super::subcategory::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Subcategory.def()
    }
}

impl Related<super::rating::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Ratings.def()
    }
}

impl Related<super::variation::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Variations.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
