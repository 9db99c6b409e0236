//! Rating entity - One user's score for one product.
//!
//! `(product_id, user_id)` is unique. `user_id` deliberately has no foreign key so
//! that ratings survive the deletion of their author.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Rating database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "ratings")]
#[serde(rename_all = "camelCase")]
pub struct Model {
    /// Unique identifier for the rating
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Rated product
    pub product_id: i64,
    /// Author of the rating
    pub user_id: i64,
    /// Score from 1 to 5
    pub rating: i32,
    /// Optional free-text review
    pub comment: Option<String>,
    /// When the rating was first submitted
    pub created_at: DateTimeUtc,
    /// When the rating was last replaced
    pub updated_at: DateTimeUtc,
}

/// Defines relationships between Rating and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each rating belongs to one product
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
