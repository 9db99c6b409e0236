//! Store business logic - seller onboarding and store management.
//!
//! Creating a store promotes its owner to seller. Ownership is always resolved from
//! the database at call time; no caller-supplied store id is trusted.

use crate::{
    core::locks::{EntityLocks, LockKey},
    entities::{Product, Role, Store, User, product, store, user},
    errors::{Error, Result},
};
use chrono::Utc;
use sea_orm::{QueryOrder, Set, TransactionTrait, prelude::*};
use tracing::{info, instrument};

/// Input for `create_store`
#[derive(Debug, Clone, Default)]
pub struct NewStore {
    /// Public shop name
    pub shop_name: String,
    /// Shop address
    pub address: String,
    /// Free-text store category
    pub category: String,
}

/// Partial update for `update_store`; `None` leaves a field unchanged.
#[derive(Debug, Clone, Default)]
pub struct StoreChanges {
    /// New shop name
    pub shop_name: Option<String>,
    /// New address
    pub address: Option<String>,
    /// New store category
    pub category: Option<String>,
}

/// Looks up the store owned by `user_id`, reading the database every time.
///
/// # Errors
/// Returns an error if the database query fails.
pub async fn find_store_for_owner<C>(db: &C, user_id: i64) -> Result<Option<store::Model>>
where
    C: ConnectionTrait,
{
    Store::find()
        .filter(store::Column::OwnerId.eq(user_id))
        .one(db)
        .await
        .map_err(Into::into)
}

/// Creates a store for a buyer and promotes them to seller.
///
/// # Errors
/// Returns:
/// - `InvalidInput` if any field is blank
/// - `NotFound` if the user does not exist
/// - `PermissionDenied` if the user already has a store or is not a buyer
#[instrument(skip(db, locks, new_store))]
pub async fn create_store(
    db: &DatabaseConnection,
    locks: &EntityLocks,
    user_id: i64,
    new_store: NewStore,
) -> Result<store::Model> {
    let shop_name = new_store.shop_name.trim();
    let address = new_store.address.trim();
    let category = new_store.category.trim();
    if shop_name.is_empty() || address.is_empty() || category.is_empty() {
        return Err(Error::invalid_input(
            "All fields are required: shopName, address, category.",
        ));
    }

    let _guard = locks.acquire(LockKey::User(user_id)).await;
    let txn = db.begin().await?;

    let owner = User::find_by_id(user_id)
        .one(&txn)
        .await?
        .ok_or_else(|| Error::not_found("User", user_id))?;
    if owner.role != Role::Buyer || find_store_for_owner(&txn, user_id).await?.is_some() {
        return Err(Error::permission_denied("Your store is already created"));
    }

    let created = store::ActiveModel {
        shop_name: Set(shop_name.to_string()),
        address: Set(address.to_string()),
        category: Set(category.to_string()),
        owner_id: Set(user_id),
        created_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    let mut owner: user::ActiveModel = owner.into();
    owner.role = Set(Role::Seller);
    owner.update(&txn).await?;

    txn.commit().await?;
    info!(store_id = created.id, owner_id = user_id, "Store created");
    Ok(created)
}

/// Applies a partial update to the caller's store.
///
/// # Errors
/// Returns `PermissionDenied` if the caller is not a seller with a store, and
/// `InvalidInput` if a provided field is blank.
#[instrument(skip(db, changes))]
pub async fn update_store(
    db: &DatabaseConnection,
    user_id: i64,
    changes: StoreChanges,
) -> Result<store::Model> {
    let owner = User::find_by_id(user_id)
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("User", user_id))?;
    if owner.role != Role::Seller {
        return Err(Error::permission_denied(
            "Only sellers can update store details.",
        ));
    }
    let current = find_store_for_owner(db, user_id)
        .await?
        .ok_or_else(|| Error::permission_denied("Only sellers can update store details."))?;

    let mut active: store::ActiveModel = current.clone().into();
    if let Some(shop_name) = non_blank(changes.shop_name, "shopName")? {
        active.shop_name = Set(shop_name);
    }
    if let Some(address) = non_blank(changes.address, "address")? {
        active.address = Set(address);
    }
    if let Some(category) = non_blank(changes.category, "category")? {
        active.category = Set(category);
    }
    if !active.is_changed() {
        return Ok(current);
    }
    active.update(db).await.map_err(Into::into)
}

/// Trims an optional field, rejecting a provided-but-blank value.
pub(crate) fn non_blank(value: Option<String>, field: &str) -> Result<Option<String>> {
    match value.map(|v| v.trim().to_string()) {
        Some(v) if v.is_empty() => Err(Error::invalid_input(format!("{field} cannot be empty"))),
        other => Ok(other),
    }
}

/// Returns a store and every product it lists.
///
/// # Errors
/// Returns `NotFound` if the store does not exist.
pub async fn store_products(
    db: &DatabaseConnection,
    store_id: i64,
) -> Result<(store::Model, Vec<product::Model>)> {
    let found = Store::find_by_id(store_id)
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("Store", store_id))?;
    let products = Product::find()
        .filter(product::Column::StoreId.eq(store_id))
        .order_by_asc(product::Column::Id)
        .all(db)
        .await?;
    Ok((found, products))
}
