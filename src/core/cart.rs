//! Cart business logic - one cart per user, one line per product.
//!
//! Every mutation runs under the user's cart lock so that concurrent adds of the
//! same product merge into a single line with the summed quantity.

use crate::{
    core::locks::{EntityLocks, LockKey},
    entities::{Cart, CartItem, Product, cart, cart_item, product},
    errors::{Error, Result},
};
use chrono::Utc;
use sea_orm::{QueryOrder, Set, TransactionTrait, prelude::*};
use serde::Serialize;
use tracing::{debug, instrument};

/// One cart line as presented to the buyer.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
    /// Cart item id, used by update/remove
    pub id: i64,
    /// Product in the line
    pub product_id: i64,
    /// Current product name
    pub name: String,
    /// Current product price
    pub unit_price: f64,
    /// Units in the line
    pub quantity: i32,
    /// `unit_price * quantity`
    pub line_total: f64,
}

/// A cart with its lines and subtotal.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartView {
    /// Cart id
    pub id: i64,
    /// Owner
    pub user_id: i64,
    /// Lines, oldest first
    pub items: Vec<CartLine>,
    /// Sum of all line totals
    pub subtotal: f64,
}

fn check_quantity(quantity: i32) -> Result<i32> {
    if quantity < 1 {
        return Err(Error::invalid_input("Quantity must be at least 1"));
    }
    Ok(quantity)
}

fn check_stock(found: &product::Model, quantity: i32) -> Result<()> {
    if quantity > found.stock {
        return Err(Error::invalid_state(format!(
            "Only {} unit(s) of {} in stock",
            found.stock, found.name
        )));
    }
    Ok(())
}

async fn find_cart<C>(db: &C, user_id: i64) -> Result<Option<cart::Model>>
where
    C: ConnectionTrait,
{
    Cart::find()
        .filter(cart::Column::UserId.eq(user_id))
        .one(db)
        .await
        .map_err(Into::into)
}

async fn require_cart<C>(db: &C, user_id: i64) -> Result<cart::Model>
where
    C: ConnectionTrait,
{
    find_cart(db, user_id)
        .await?
        .ok_or_else(|| Error::not_found("Cart", user_id))
}

/// Finds a line by id, but only inside `cart_id`.
async fn require_line<C>(db: &C, cart_id: i64, item_id: i64) -> Result<cart_item::Model>
where
    C: ConnectionTrait,
{
    CartItem::find_by_id(item_id)
        .filter(cart_item::Column::CartId.eq(cart_id))
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("Cart item", item_id))
}

async fn touch<C>(db: &C, found: cart::Model) -> Result<cart::Model>
where
    C: ConnectionTrait,
{
    let mut active: cart::ActiveModel = found.into();
    active.updated_at = Set(Utc::now());
    active.update(db).await.map_err(Into::into)
}

async fn load_view<C>(db: &C, found: &cart::Model) -> Result<CartView>
where
    C: ConnectionTrait,
{
    let rows = CartItem::find()
        .filter(cart_item::Column::CartId.eq(found.id))
        .order_by_asc(cart_item::Column::Id)
        .find_also_related(Product)
        .all(db)
        .await?;

    let items: Vec<CartLine> = rows
        .into_iter()
        .filter_map(|(line, listed)| {
            listed.map(|p| CartLine {
                id: line.id,
                product_id: line.product_id,
                name: p.name,
                unit_price: p.price,
                quantity: line.quantity,
                line_total: p.price * f64::from(line.quantity),
            })
        })
        .collect();
    let subtotal = items.iter().map(|line| line.line_total).sum();

    Ok(CartView {
        id: found.id,
        user_id: found.user_id,
        items,
        subtotal,
    })
}

/// Adds `quantity` units of a product, creating the cart on first use and merging
/// into an existing line for the same product.
///
/// # Errors
/// Returns `InvalidInput` for a quantity below 1, `NotFound` for an unknown product,
/// and `InvalidState` if the resulting line would exceed the product's stock.
#[instrument(skip(db, locks))]
pub async fn add_to_cart(
    db: &DatabaseConnection,
    locks: &EntityLocks,
    user_id: i64,
    product_id: i64,
    quantity: i32,
) -> Result<CartView> {
    let quantity = check_quantity(quantity)?;

    let _guard = locks.acquire(LockKey::Cart(user_id)).await;
    let txn = db.begin().await?;

    let listed = Product::find_by_id(product_id)
        .one(&txn)
        .await?
        .ok_or_else(|| Error::not_found("Product", product_id))?;

    let found = match find_cart(&txn, user_id).await? {
        Some(found) => found,
        None => {
            let now = Utc::now();
            cart::ActiveModel {
                user_id: Set(user_id),
                created_at: Set(now),
                updated_at: Set(now),
                ..Default::default()
            }
            .insert(&txn)
            .await?
        }
    };

    let existing = CartItem::find()
        .filter(cart_item::Column::CartId.eq(found.id))
        .filter(cart_item::Column::ProductId.eq(product_id))
        .one(&txn)
        .await?;
    match existing {
        Some(line) => {
            let merged = line.quantity.saturating_add(quantity);
            check_stock(&listed, merged)?;
            let mut active: cart_item::ActiveModel = line.into();
            active.quantity = Set(merged);
            active.update(&txn).await?;
        }
        None => {
            check_stock(&listed, quantity)?;
            cart_item::ActiveModel {
                cart_id: Set(found.id),
                product_id: Set(product_id),
                quantity: Set(quantity),
                ..Default::default()
            }
            .insert(&txn)
            .await?;
        }
    }

    let found = touch(&txn, found).await?;
    let view = load_view(&txn, &found).await?;
    txn.commit().await?;
    debug!(user_id, product_id, quantity, "Added to cart");
    Ok(view)
}

/// Returns the user's cart.
///
/// # Errors
/// Returns `NotFound` if the user has never added anything.
pub async fn get_cart(db: &DatabaseConnection, user_id: i64) -> Result<CartView> {
    let found = require_cart(db, user_id).await?;
    load_view(db, &found).await
}

/// Sets the quantity of one line in the user's cart.
///
/// # Errors
/// Returns `InvalidInput` for a quantity below 1, `NotFound` if the cart or the line
/// (within this user's cart) does not exist, and `InvalidState` if it exceeds stock.
#[instrument(skip(db, locks))]
pub async fn update_line(
    db: &DatabaseConnection,
    locks: &EntityLocks,
    user_id: i64,
    item_id: i64,
    quantity: i32,
) -> Result<CartView> {
    let quantity = check_quantity(quantity)?;

    let _guard = locks.acquire(LockKey::Cart(user_id)).await;
    let txn = db.begin().await?;

    let found = require_cart(&txn, user_id).await?;
    let line = require_line(&txn, found.id, item_id).await?;
    let listed = Product::find_by_id(line.product_id)
        .one(&txn)
        .await?
        .ok_or_else(|| Error::not_found("Product", line.product_id))?;
    check_stock(&listed, quantity)?;

    let mut active: cart_item::ActiveModel = line.into();
    active.quantity = Set(quantity);
    active.update(&txn).await?;

    let found = touch(&txn, found).await?;
    let view = load_view(&txn, &found).await?;
    txn.commit().await?;
    Ok(view)
}

/// Removes one line from the user's cart.
///
/// # Errors
/// Returns `NotFound` if the cart or the line (within this user's cart) does not exist.
#[instrument(skip(db, locks))]
pub async fn remove_line(
    db: &DatabaseConnection,
    locks: &EntityLocks,
    user_id: i64,
    item_id: i64,
) -> Result<CartView> {
    let _guard = locks.acquire(LockKey::Cart(user_id)).await;
    let txn = db.begin().await?;

    let found = require_cart(&txn, user_id).await?;
    require_line(&txn, found.id, item_id)
        .await?
        .delete(&txn)
        .await?;

    let found = touch(&txn, found).await?;
    let view = load_view(&txn, &found).await?;
    txn.commit().await?;
    Ok(view)
}

/// Empties the user's cart. The cart itself is kept.
///
/// # Errors
/// Returns `NotFound` if the user has no cart.
#[instrument(skip(db, locks))]
pub async fn clear_cart(
    db: &DatabaseConnection,
    locks: &EntityLocks,
    user_id: i64,
) -> Result<CartView> {
    let _guard = locks.acquire(LockKey::Cart(user_id)).await;
    let txn = db.begin().await?;

    let found = require_cart(&txn, user_id).await?;
    CartItem::delete_many()
        .filter(cart_item::Column::CartId.eq(found.id))
        .exec(&txn)
        .await?;

    let found = touch(&txn, found).await?;
    let view = load_view(&txn, &found).await?;
    txn.commit().await?;
    Ok(view)
}
