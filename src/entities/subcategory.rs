//! Subcategory entity - Second level of the taxonomy, always under one category.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Subcategory database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "subcategories")]
#[serde(rename_all = "camelCase")]
pub struct Model {
    /// Unique identifier for the subcategory
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Subcategory name (e.g., "Laptops")
    pub name: String,
    /// Optional longer description
    pub description: Option<String>,
    /// Parent category
    pub category_id: i64,
    /// When the subcategory was created
    pub created_at: DateTimeUtc,
    /// When the subcategory was last modified
    pub updated_at: DateTimeUtc,
}

/// Defines relationships between Subcategory and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each subcategory belongs to one category
    #[sea_orm(
        belongs_to = "super::category::Entity",
        from = "Column::CategoryId",
        to = "super::category::Column::Id",
        on_delete = "Cascade"
    )]
    Category,
}

impl Related<super::category::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Category.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
