//! Product business logic - listing, detail, and owner-gated mutation.
//!
//! A product always belongs to the store of the user who created it. Mutations
//! re-resolve the acting user's store from the database and compare it with the
//! product's `store_id`; nothing cached on the request is trusted.

use crate::{
    core::{
        catalog::{get_category_by_id, get_subcategory_by_id},
        locks::{EntityLocks, LockKey},
        rating::{RatingView, present_ratings, ratings_for_product},
        store::{find_store_for_owner, non_blank},
    },
    entities::{
        AttributeMap, Cart, CartItem, OrderItem, Product, Rating, Variation, cart, cart_item,
        category, order_item, product, rating, subcategory, variation,
    },
    errors::{Error, Result},
};
use chrono::Utc;
use sea_orm::{QueryOrder, QuerySelect, Set, TransactionTrait, prelude::*, sea_query::Expr};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{info, instrument};

/// A variation submitted together with a new product.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NewVariation {
    /// Label such as "Red - Medium"
    pub name: String,
    /// Price of the variation
    pub price: f64,
    /// Units in stock
    pub stock: i32,
    /// Stock keeping unit
    pub sku: String,
    /// Dynamic attributes
    pub attributes: BTreeMap<String, String>,
    /// Optional description
    pub description: Option<String>,
    /// Feature bullet points
    pub features: Vec<String>,
    /// Image paths
    pub images: Vec<String>,
}

/// Input for `create_product`. Required fields are `Option` so that a missing
/// value can be reported as invalid input rather than a decoding failure.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NewProduct {
    /// Product name
    pub name: Option<String>,
    /// Long-form description
    pub description: Option<String>,
    /// Unit price
    pub price: Option<f64>,
    /// Units in stock, 0 when omitted
    pub stock: Option<i32>,
    /// Category to list the product under
    pub category_id: Option<i64>,
    /// Optional subcategory; must belong to `category_id`
    pub subcategory_id: Option<i64>,
    /// Image paths
    pub images: Vec<String>,
    /// Feature bullet points
    pub features: Vec<String>,
    /// Variations inserted with the product
    pub variations: Vec<NewVariation>,
}

/// Partial update for `update_product`; `None` leaves a field unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProductChanges {
    /// New name
    pub name: Option<String>,
    /// New description
    pub description: Option<String>,
    /// New price
    pub price: Option<f64>,
    /// New stock level
    pub stock: Option<i32>,
    /// Move to another category
    pub category_id: Option<i64>,
    /// Move to another subcategory
    pub subcategory_id: Option<i64>,
    /// Replace the image list
    pub images: Option<Vec<String>>,
    /// Replace the feature list
    pub features: Option<Vec<String>>,
}

/// A product with everything a detail page shows.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductDetail {
    /// The product row
    #[serde(flatten)]
    pub product: product::Model,
    /// Its category
    pub category: Option<category::Model>,
    /// Its subcategory, if any
    pub subcategory: Option<subcategory::Model>,
    /// Its variations
    pub variations: Vec<variation::Model>,
    /// Its ratings with author names
    pub ratings: Vec<RatingView>,
}

fn check_price(price: f64, field: &str) -> Result<f64> {
    if price.is_finite() && price >= 0.0 {
        Ok(price)
    } else {
        Err(Error::invalid_input(format!(
            "{field} must be a non-negative number"
        )))
    }
}

fn check_stock(stock: i32, field: &str) -> Result<i32> {
    if stock >= 0 {
        Ok(stock)
    } else {
        Err(Error::invalid_input(format!("{field} cannot be negative")))
    }
}

fn check_variation(variation: &NewVariation) -> Result<()> {
    if variation.name.trim().is_empty() || variation.sku.trim().is_empty() {
        return Err(Error::invalid_input("Each variation needs a name and a sku"));
    }
    check_price(variation.price, "Variation price")?;
    check_stock(variation.stock, "Variation stock")?;
    Ok(())
}

/// Ensures `subcategory_id` exists and sits under `category_id`.
async fn check_subcategory<C>(db: &C, category_id: i64, subcategory_id: i64) -> Result<()>
where
    C: ConnectionTrait,
{
    match get_subcategory_by_id(db, subcategory_id).await? {
        Some(sub) if sub.category_id == category_id => Ok(()),
        Some(_) => Err(Error::invalid_input(
            "Subcategory does not belong to the selected category",
        )),
        None => Err(Error::not_found("Subcategory", subcategory_id)),
    }
}

/// Resolves the acting user's store and checks that it owns `found`.
async fn check_owner<C>(db: &C, user_id: i64, found: &product::Model) -> Result<()>
where
    C: ConnectionTrait,
{
    match find_store_for_owner(db, user_id).await? {
        Some(owned) if owned.id == found.store_id => Ok(()),
        Some(_) => Err(Error::permission_denied(
            "You can only modify products from your own store.",
        )),
        None => Err(Error::permission_denied(
            "You must create a store before managing products.",
        )),
    }
}

/// Creates a product, and its variations, in the acting user's store. The category
/// lock is held from the category check to the commit, so the category cannot be
/// deleted underneath the insert.
///
/// # Errors
/// Returns:
/// - `PermissionDenied` if the user has no store
/// - `InvalidInput` for missing or malformed fields
/// - `NotFound` if the category or subcategory does not exist
#[instrument(skip(db, locks, new_product))]
pub async fn create_product(
    db: &DatabaseConnection,
    locks: &EntityLocks,
    owner_id: i64,
    new_product: NewProduct,
) -> Result<product::Model> {
    let owned = find_store_for_owner(db, owner_id).await?.ok_or_else(|| {
        Error::permission_denied("You must create a store before adding products.")
    })?;

    let name = new_product.name.as_deref().map(str::trim).unwrap_or_default();
    let description = new_product
        .description
        .as_deref()
        .map(str::trim)
        .unwrap_or_default();
    let (Some(price), Some(category_id)) = (new_product.price, new_product.category_id) else {
        return Err(Error::invalid_input("All fields are required."));
    };
    if name.is_empty() || description.is_empty() {
        return Err(Error::invalid_input("All fields are required."));
    }
    let price = check_price(price, "Price")?;
    let stock = check_stock(new_product.stock.unwrap_or(0), "Stock")?;
    for variation in &new_product.variations {
        check_variation(variation)?;
    }

    let _guard = locks.acquire(LockKey::Category(category_id)).await;
    let txn = db.begin().await?;
    get_category_by_id(&txn, category_id)
        .await?
        .ok_or_else(|| Error::not_found("Category", category_id))?;
    if let Some(subcategory_id) = new_product.subcategory_id {
        check_subcategory(&txn, category_id, subcategory_id).await?;
    }

    let now = Utc::now();
    let created = product::ActiveModel {
        name: Set(name.to_string()),
        description: Set(description.to_string()),
        price: Set(price),
        stock: Set(stock),
        category_id: Set(category_id),
        subcategory_id: Set(new_product.subcategory_id),
        store_id: Set(owned.id),
        images: Set(new_product.images.into()),
        features: Set(new_product.features.into()),
        average_rating: Set(0.0),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    for variation in new_product.variations {
        variation::ActiveModel {
            product_id: Set(created.id),
            name: Set(variation.name.trim().to_string()),
            price: Set(variation.price),
            stock: Set(variation.stock),
            sku: Set(variation.sku.trim().to_string()),
            attributes: Set(AttributeMap::from(variation.attributes)),
            description: Set(variation.description),
            features: Set(variation.features.into()),
            images: Set(variation.images.into()),
            ..Default::default()
        }
        .insert(&txn)
        .await?;
    }

    txn.commit().await?;
    info!(product_id = created.id, store_id = owned.id, "Product created");
    Ok(created)
}

/// Fetches a product row by id.
///
/// # Errors
/// Returns an error if the database query fails.
pub async fn get_product_by_id<C>(db: &C, product_id: i64) -> Result<Option<product::Model>>
where
    C: ConnectionTrait,
{
    Product::find_by_id(product_id)
        .one(db)
        .await
        .map_err(Into::into)
}

/// Loads a product with its category, subcategory, variations and ratings.
///
/// # Errors
/// Returns `NotFound` if the product does not exist.
pub async fn get_product(db: &DatabaseConnection, product_id: i64) -> Result<ProductDetail> {
    let found = get_product_by_id(db, product_id)
        .await?
        .ok_or_else(|| Error::not_found("Product", product_id))?;

    let category = get_category_by_id(db, found.category_id).await?;
    let subcategory = match found.subcategory_id {
        Some(id) => get_subcategory_by_id(db, id).await?,
        None => None,
    };
    let variations = Variation::find()
        .filter(variation::Column::ProductId.eq(product_id))
        .order_by_asc(variation::Column::Id)
        .all(db)
        .await?;
    let ratings = present_ratings(db, ratings_for_product(db, product_id).await?).await?;

    Ok(ProductDetail {
        product: found,
        category,
        subcategory,
        variations,
        ratings,
    })
}

/// Applies a partial update to a product owned by the acting user's store.
///
/// # Errors
/// Returns `NotFound` if the product does not exist, `PermissionDenied` if the
/// acting user's store does not own it, and `InvalidInput` for malformed fields.
#[instrument(skip(db, locks, changes))]
pub async fn update_product(
    db: &DatabaseConnection,
    locks: &EntityLocks,
    acting_user: i64,
    product_id: i64,
    changes: ProductChanges,
) -> Result<product::Model> {
    let _guard = locks.acquire(LockKey::Product(product_id)).await;

    let current = get_product_by_id(db, product_id)
        .await?
        .ok_or_else(|| Error::not_found("Product", product_id))?;
    check_owner(db, acting_user, &current).await?;

    let mut active: product::ActiveModel = current.clone().into();
    if let Some(name) = non_blank(changes.name, "name")? {
        active.name = Set(name);
    }
    if let Some(description) = non_blank(changes.description, "description")? {
        active.description = Set(description);
    }
    if let Some(price) = changes.price {
        active.price = Set(check_price(price, "Price")?);
    }
    if let Some(stock) = changes.stock {
        active.stock = Set(check_stock(stock, "Stock")?);
    }
    if let Some(images) = changes.images {
        active.images = Set(images.into());
    }
    if let Some(features) = changes.features {
        active.features = Set(features.into());
    }

    let category_id = changes.category_id.unwrap_or(current.category_id);
    let _category_guard = if changes.category_id.is_some() || changes.subcategory_id.is_some() {
        Some(locks.acquire(LockKey::Category(category_id)).await)
    } else {
        None
    };
    if changes.category_id.is_some() {
        get_category_by_id(db, category_id)
            .await?
            .ok_or_else(|| Error::not_found("Category", category_id))?;
        active.category_id = Set(category_id);
    }
    match changes.subcategory_id {
        Some(subcategory_id) => {
            check_subcategory(db, category_id, subcategory_id).await?;
            active.subcategory_id = Set(Some(subcategory_id));
        }
        // Moving category drops a subcategory that no longer fits.
        None if category_id != current.category_id => {
            active.subcategory_id = Set(None);
        }
        None => {}
    }

    if !active.is_changed() {
        return Ok(current);
    }
    active.updated_at = Set(Utc::now());
    let updated = active.update(db).await?;
    info!(product_id, "Product updated");
    Ok(updated)
}

/// Deletes a product owned by the acting user's store, together with its ratings,
/// variations and cart lines. Past order lines keep their snapshot.
///
/// # Errors
/// Returns `NotFound` if the product does not exist and `PermissionDenied` if the
/// acting user's store does not own it.
#[instrument(skip(db, locks))]
pub async fn delete_product(
    db: &DatabaseConnection,
    locks: &EntityLocks,
    acting_user: i64,
    product_id: i64,
) -> Result<()> {
    let _guard = locks.acquire(LockKey::Product(product_id)).await;
    // Every cart holding the product, locked in user order
    let mut holders: Vec<i64> = Cart::find()
        .inner_join(CartItem)
        .filter(cart_item::Column::ProductId.eq(product_id))
        .select_only()
        .column(cart::Column::UserId)
        .distinct()
        .into_tuple()
        .all(db)
        .await?;
    holders.sort_unstable();
    let mut cart_guards = Vec::with_capacity(holders.len());
    for user_id in holders {
        cart_guards.push(locks.acquire(LockKey::Cart(user_id)).await);
    }
    let txn = db.begin().await?;

    let found = get_product_by_id(&txn, product_id)
        .await?
        .ok_or_else(|| Error::not_found("Product", product_id))?;
    check_owner(&txn, acting_user, &found).await?;

    Rating::delete_many()
        .filter(rating::Column::ProductId.eq(product_id))
        .exec(&txn)
        .await?;
    Variation::delete_many()
        .filter(variation::Column::ProductId.eq(product_id))
        .exec(&txn)
        .await?;
    CartItem::delete_many()
        .filter(cart_item::Column::ProductId.eq(product_id))
        .exec(&txn)
        .await?;
    OrderItem::update_many()
        .col_expr(
            order_item::Column::ProductId,
            Expr::value(Option::<i64>::None),
        )
        .filter(order_item::Column::ProductId.eq(product_id))
        .exec(&txn)
        .await?;
    found.delete(&txn).await?;

    txn.commit().await?;
    info!(product_id, "Product deleted");
    Ok(())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::{
        core::{
            cart::{add_to_cart, get_cart},
            catalog::create_subcategory,
        },
        test_utils::*,
    };
    use std::{sync::Arc, time::Duration};

    fn sample(category_id: i64) -> NewProduct {
        NewProduct {
            name: Some("Lamp".to_string()),
            description: Some("A desk lamp".to_string()),
            price: Some(25.0),
            stock: Some(4),
            category_id: Some(category_id),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_create_product_requires_store() -> Result<()> {
        let db = setup_test_db().await?;
        let buyer = create_test_user(&db, "Bea", "bea@example.com").await?;
        // No store: refused before the (empty) payload is even looked at
        let locks = EntityLocks::new();
        let result = create_product(&db, &locks, buyer.id, NewProduct::default()).await;
        assert!(matches!(result.unwrap_err(), Error::PermissionDenied { .. }));
        Ok(())
    }

    #[tokio::test]
    async fn test_create_product_validation() -> Result<()> {
        let (db, seller, _) = setup_with_store().await?;
        let category = create_test_category(&db, "Home").await?;

        let mut missing = sample(category.id);
        missing.price = None;
        let result = create_product(&db, &EntityLocks::new(), seller.id, missing).await;
        assert!(matches!(result.unwrap_err(), Error::InvalidInput { .. }));

        let mut negative = sample(category.id);
        negative.stock = Some(-1);
        assert!(create_product(&db, &EntityLocks::new(), seller.id, negative).await.is_err());

        let mut nan = sample(category.id);
        nan.price = Some(f64::NAN);
        assert!(create_product(&db, &EntityLocks::new(), seller.id, nan).await.is_err());

        let unknown = create_product(&db, &EntityLocks::new(), seller.id, sample(999)).await;
        assert!(matches!(unknown.unwrap_err(), Error::NotFound { .. }));
        Ok(())
    }

    #[tokio::test]
    async fn test_subcategory_must_match_category() -> Result<()> {
        let (db, seller, _) = setup_with_store().await?;
        let locks = EntityLocks::new();
        let home = create_test_category(&db, "Home").await?;
        let garden = create_test_category(&db, "Garden").await?;
        let tools = create_subcategory(&db, &locks, garden.id, "Tools", None).await?;

        let mut mismatched = sample(home.id);
        mismatched.subcategory_id = Some(tools.id);
        let result = create_product(&db, &EntityLocks::new(), seller.id, mismatched).await;
        assert!(matches!(result.unwrap_err(), Error::InvalidInput { .. }));
        Ok(())
    }

    #[tokio::test]
    async fn test_create_with_variations_and_detail() -> Result<()> {
        let (db, seller, shop) = setup_with_store().await?;
        let category = create_test_category(&db, "Home").await?;
        let mut new_product = sample(category.id);
        new_product.features = vec!["Dimmable".to_string()];
        new_product.variations = vec![NewVariation {
            name: "Red".to_string(),
            price: 27.5,
            stock: 2,
            sku: "LAMP-RED".to_string(),
            attributes: BTreeMap::from([("colour".to_string(), "red".to_string())]),
            ..Default::default()
        }];

        let created = create_product(&db, &EntityLocks::new(), seller.id, new_product).await?;
        assert_eq!(created.store_id, shop.id);

        let detail = get_product(&db, created.id).await?;
        assert_eq!(detail.category.map(|c| c.id), Some(category.id));
        assert_eq!(detail.variations.len(), 1);
        assert_eq!(detail.variations[0].sku, "LAMP-RED");
        assert_eq!(detail.product.features.0, vec!["Dimmable".to_string()]);
        assert!(detail.ratings.is_empty());

        let bad_variation = NewProduct {
            variations: vec![NewVariation::default()],
            ..sample(category.id)
        };
        let result = create_product(&db, &EntityLocks::new(), seller.id, bad_variation).await;
        assert!(matches!(result.unwrap_err(), Error::InvalidInput { .. }));
        Ok(())
    }

    #[tokio::test]
    async fn test_only_owner_can_mutate() -> Result<()> {
        let (db, seller, _) = setup_with_store().await?;
        let locks = EntityLocks::new();
        let category = create_test_category(&db, "Home").await?;
        let item = create_test_product(&db, seller.id, category.id, "Lamp").await?;

        let (rival, _) = create_test_store(&db, "Rita", "rita@example.com").await?;
        let buyer = create_test_user(&db, "Bea", "bea@example.com").await?;

        let changes = ProductChanges {
            price: Some(1.0),
            ..Default::default()
        };
        for intruder in [rival.id, buyer.id] {
            let result = update_product(&db, &locks, intruder, item.id, changes.clone()).await;
            assert!(matches!(result.unwrap_err(), Error::PermissionDenied { .. }));
            let result = delete_product(&db, &locks, intruder, item.id).await;
            assert!(matches!(result.unwrap_err(), Error::PermissionDenied { .. }));
        }

        let updated = update_product(&db, &locks, seller.id, item.id, changes).await?;
        assert!((updated.price - 1.0).abs() < f64::EPSILON);

        let missing = update_product(&db, &locks, seller.id, 999, ProductChanges::default()).await;
        assert!(matches!(missing.unwrap_err(), Error::NotFound { .. }));
        Ok(())
    }

    #[tokio::test]
    async fn test_moving_category_clears_subcategory() -> Result<()> {
        let (db, seller, _) = setup_with_store().await?;
        let locks = EntityLocks::new();
        let home = create_test_category(&db, "Home").await?;
        let garden = create_test_category(&db, "Garden").await?;
        let lighting = create_subcategory(&db, &locks, home.id, "Lighting", None).await?;

        let mut new_product = sample(home.id);
        new_product.subcategory_id = Some(lighting.id);
        let item = create_product(&db, &EntityLocks::new(), seller.id, new_product).await?;

        let moved = update_product(
            &db,
            &locks,
            seller.id,
            item.id,
            ProductChanges {
                category_id: Some(garden.id),
                ..Default::default()
            },
        )
        .await?;
        assert_eq!(moved.category_id, garden.id);
        assert_eq!(moved.subcategory_id, None);
        Ok(())
    }

    #[tokio::test]
    async fn test_delete_product_keeps_order_snapshot() -> Result<()> {
        let (db, seller, _) = setup_with_store().await?;
        let locks = EntityLocks::new();
        let category = create_test_category(&db, "Home").await?;
        let item = create_test_product(&db, seller.id, category.id, "Lamp").await?;
        let buyer = create_test_user(&db, "Bea", "bea@example.com").await?;
        let placed = create_test_order(&db, buyer.id, item.id, 2).await?;

        delete_product(&db, &locks, seller.id, item.id).await?;
        assert!(get_product_by_id(&db, item.id).await?.is_none());

        let lines = OrderItem::find()
            .filter(order_item::Column::OrderId.eq(placed.order.id))
            .all(&db)
            .await?;
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].product_id, None);
        assert_eq!(lines[0].product_name, "Lamp");
        Ok(())
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_create_waits_for_category_lock() -> Result<()> {
        let (db, seller, _) = setup_with_store().await?;
        let category = create_test_category(&db, "Home").await?;
        let (db, locks) = (Arc::new(db), Arc::new(EntityLocks::new()));

        let held = locks.acquire(LockKey::Category(category.id)).await;
        let (seller_id, category_id) = (seller.id, category.id);
        let pending = tokio::spawn({
            let (db, locks) = (Arc::clone(&db), Arc::clone(&locks));
            async move { create_product(&db, &locks, seller_id, sample(category_id)).await }
        });
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!pending.is_finished());

        drop(held);
        let created = pending.await.unwrap()?;
        assert_eq!(created.category_id, category.id);
        Ok(())
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_delete_waits_for_carts_holding_the_product() -> Result<()> {
        let (db, seller, _) = setup_with_store().await?;
        let category = create_test_category(&db, "Home").await?;
        let item = create_test_product(&db, seller.id, category.id, "Lamp").await?;
        let buyer = create_test_user(&db, "Bea", "bea@example.com").await?;
        let locks = Arc::new(EntityLocks::new());
        add_to_cart(&db, &locks, buyer.id, item.id, 1).await?;
        let db = Arc::new(db);

        let held = locks.acquire(LockKey::Cart(buyer.id)).await;
        let (seller_id, product_id) = (seller.id, item.id);
        let pending = tokio::spawn({
            let (db, locks) = (Arc::clone(&db), Arc::clone(&locks));
            async move { delete_product(&db, &locks, seller_id, product_id).await }
        });
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!pending.is_finished());

        drop(held);
        pending.await.unwrap()?;
        let view = get_cart(db.as_ref(), buyer.id).await?;
        assert!(view.items.is_empty());
        Ok(())
    }
}
