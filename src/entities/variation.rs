//! Variation entity - A priced, stocked sub-item of a product (size/colour etc).

use super::json::{AttributeMap, StringList};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Variation database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "variations")]
#[serde(rename_all = "camelCase")]
pub struct Model {
    /// Unique identifier for the variation
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Parent product
    pub product_id: i64,
    /// Label such as "Red - Medium"
    pub name: String,
    /// Price of this variation
    pub price: f64,
    /// Units in stock
    pub stock: i32,
    /// Stock keeping unit
    pub sku: String,
    /// Dynamic attributes (size, colour, storage...)
    #[sea_orm(column_type = "Json")]
    pub attributes: AttributeMap,
    /// Optional description
    pub description: Option<String>,
    /// Feature bullet points
    #[sea_orm(column_type = "Json")]
    pub features: StringList,
    /// Image paths
    #[sea_orm(column_type = "Json")]
    pub images: StringList,
}

/// Defines relationships between Variation and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each variation belongs to one product
    #[sea_orm(
        belongs_to = "super::product::Entity",
        from = "Column::ProductId",
        to = "super::product::Column::Id",
        on_delete = "Cascade"
    )]
    Product,
}

impl Related<super::product::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Product.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
