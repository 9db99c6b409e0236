//! Database configuration module for the storefront.
//!
//! This module handles the database connection and table creation using `SeaORM`.
//! Tables are generated from the entity definitions with `Schema::create_table_from_entity`,
//! so the schema always matches the Rust structs. Composite uniqueness rules that the
//! entity macros cannot express (one rating per user per product, one line per product
//! per cart) are added as explicit indexes.

use crate::entities::{
    Cart, CartItem, Category, Order, OrderItem, Product, Rating, Session, Store, Subcategory,
    User, Variation, cart_item, rating,
};
use crate::errors::Result;
use sea_orm::{
    ConnectionTrait, Database, DatabaseConnection, EntityTrait, Schema, sea_query::Index,
};
use tracing::{debug, info, instrument};

/// Establishes a connection to the database at `database_url`.
///
/// # Errors
/// Returns an error if the URL is invalid or the database cannot be opened.
#[instrument]
pub async fn create_connection(database_url: &str) -> Result<DatabaseConnection> {
    debug!("Connecting to database");
    Database::connect(database_url).await.map_err(Into::into)
}

async fn create_table_for<C, E>(db: &C, schema: &Schema, entity: E) -> Result<()>
where
    C: ConnectionTrait,
    E: EntityTrait,
{
    let builder = db.get_database_backend();
    let mut statement = schema.create_table_from_entity(entity);
    statement.if_not_exists();
    db.execute(builder.build(&statement)).await?;
    Ok(())
}

/// Creates all tables and indexes if they do not exist yet.
///
/// Parents are created before children so foreign keys resolve on every backend.
///
/// # Errors
/// Returns an error if any DDL statement fails.
pub async fn create_tables(db: &DatabaseConnection) -> Result<()> {
    let builder = db.get_database_backend();
    let schema = Schema::new(builder);

    create_table_for(db, &schema, User).await?;
    create_table_for(db, &schema, Session).await?;
    create_table_for(db, &schema, Store).await?;
    create_table_for(db, &schema, Category).await?;
    create_table_for(db, &schema, Subcategory).await?;
    create_table_for(db, &schema, Product).await?;
    create_table_for(db, &schema, Rating).await?;
    create_table_for(db, &schema, Variation).await?;
    create_table_for(db, &schema, Cart).await?;
    create_table_for(db, &schema, CartItem).await?;
    create_table_for(db, &schema, Order).await?;
    create_table_for(db, &schema, OrderItem).await?;

    let one_rating_per_user = Index::create()
        .name("idx_ratings_product_user")
        .table(Rating)
        .col(rating::Column::ProductId)
        .col(rating::Column::UserId)
        .unique()
        .if_not_exists()
        .to_owned();
    db.execute(builder.build(&one_rating_per_user)).await?;

    let one_line_per_product = Index::create()
        .name("idx_cart_items_cart_product")
        .table(CartItem)
        .col(cart_item::Column::CartId)
        .col(cart_item::Column::ProductId)
        .unique()
        .if_not_exists()
        .to_owned();
    db.execute(builder.build(&one_line_per_product)).await?;

    info!("Database tables ensured");
    Ok(())
}
