//! Shared test utilities for the storefront.
//!
//! This module provides helpers for setting up an in-memory database and creating
//! users, stores, categories, products and orders with sensible defaults.

use crate::{
    core::{
        account::hash_password,
        locks::EntityLocks,
        order::{self, NewOrder, OrderLine, OrderView},
        product::{self, NewProduct},
        store::{self, NewStore},
    },
    entities::{Role, User, category, user},
    errors::{Error, Result},
};
use chrono::Utc;
use sea_orm::{ActiveModelTrait, DatabaseConnection, EntityTrait, Set};

/// Password given to every user created by `create_test_user`.
pub const TEST_PASSWORD: &str = "password";

/// Creates an in-memory `SQLite` database with all tables initialized.
/// This is the standard setup for all integration tests.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    let db = sea_orm::Database::connect("sqlite::memory:").await?;
    crate::config::database::create_tables(&db).await?;
    Ok(db)
}

/// Creates a buyer whose password is `TEST_PASSWORD`.
pub async fn create_test_user(
    db: &DatabaseConnection,
    name: &str,
    email: &str,
) -> Result<user::Model> {
    user::ActiveModel {
        name: Set(name.to_string()),
        email: Set(email.to_string()),
        password_digest: Set(hash_password(TEST_PASSWORD)?),
        role: Set(Role::Buyer),
        address: Set(None),
        phone: Set(None),
        created_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(db)
    .await
    .map_err(Into::into)
}

/// Creates a user and opens a store for them, returning the promoted seller.
pub async fn create_test_store(
    db: &DatabaseConnection,
    name: &str,
    email: &str,
) -> Result<(user::Model, crate::entities::store::Model)> {
    let owner = create_test_user(db, name, email).await?;
    let shop = store::create_store(
        db,
        &EntityLocks::new(),
        owner.id,
        NewStore {
            shop_name: format!("{name}'s Shop"),
            address: "1 Market St".to_string(),
            category: "general".to_string(),
        },
    )
    .await?;
    // Reload to pick up the seller role
    let seller = User::find_by_id(owner.id)
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("User", owner.id))?;
    Ok((seller, shop))
}

/// Sets up a database with one seller and their store.
/// Returns (db, seller, store) for catalog-related tests.
pub async fn setup_with_store() -> Result<(
    DatabaseConnection,
    user::Model,
    crate::entities::store::Model,
)> {
    let db = setup_test_db().await?;
    let (seller, shop) = create_test_store(&db, "Sam", "sam@example.com").await?;
    Ok((db, seller, shop))
}

/// Creates a category with no description.
pub async fn create_test_category(db: &DatabaseConnection, name: &str) -> Result<category::Model> {
    crate::core::catalog::create_category(db, name, None).await
}

/// Creates a product in the seller's store.
///
/// # Defaults
/// * price: 10.0
/// * stock: 10
pub async fn create_test_product(
    db: &DatabaseConnection,
    seller_id: i64,
    category_id: i64,
    name: &str,
) -> Result<crate::entities::product::Model> {
    create_custom_product(db, seller_id, category_id, name, 10.0, 10).await
}

/// Creates a product with a custom price and stock.
pub async fn create_custom_product(
    db: &DatabaseConnection,
    seller_id: i64,
    category_id: i64,
    name: &str,
    price: f64,
    stock: i32,
) -> Result<crate::entities::product::Model> {
    product::create_product(
        db,
        &EntityLocks::new(),
        seller_id,
        NewProduct {
            name: Some(name.to_string()),
            description: Some("Test product".to_string()),
            price: Some(price),
            stock: Some(stock),
            category_id: Some(category_id),
            ..Default::default()
        },
    )
    .await
}

/// Places a single-line order at the product's current price.
pub async fn create_test_order(
    db: &DatabaseConnection,
    user_id: i64,
    product_id: i64,
    quantity: i32,
) -> Result<OrderView> {
    let total = product::get_product_by_id(db, product_id)
        .await?
        .map_or(0.0, |p| p.price * f64::from(quantity));
    order::create_order(
        db,
        user_id,
        NewOrder {
            products: vec![OrderLine {
                product_id,
                quantity,
            }],
            total_amount: Some(total),
            shipping_address: "1 Main St".to_string(),
            payment_method: None,
        },
    )
    .await
}
