//! Catalog taxonomy - categories and their subcategories.
//!
//! Deleting a category is a two-phase operation inside one transaction: children
//! first, then the parent. The category lock is shared with subcategory creation,
//! so a subcategory can never be attached to a category that is going away.

use crate::{
    core::{
        locks::{EntityLocks, LockKey},
        store::non_blank,
    },
    entities::{Category, Product, Subcategory, category, product, subcategory},
    errors::{Error, Result},
};
use chrono::Utc;
use sea_orm::{QueryOrder, Set, TransactionTrait, prelude::*};
use serde::Serialize;
use tracing::{info, instrument};

/// A category with the number of products listed under it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategorySummary {
    /// Category id
    pub id: i64,
    /// Category name
    pub name: String,
    /// Products currently referencing the category
    pub product_count: u64,
}

/// Creates a category.
///
/// # Errors
/// Returns `InvalidInput` if the name is blank.
#[instrument(skip(db, description))]
pub async fn create_category(
    db: &DatabaseConnection,
    name: &str,
    description: Option<String>,
) -> Result<category::Model> {
    let name = name.trim();
    if name.is_empty() {
        return Err(Error::invalid_input("Category name is required"));
    }
    category::ActiveModel {
        name: Set(name.to_string()),
        description: Set(description),
        created_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(db)
    .await
    .map_err(Into::into)
}

/// Lists every category with its product count, ordered by name.
///
/// # Errors
/// Returns an error if a database query fails.
pub async fn list_categories(db: &DatabaseConnection) -> Result<Vec<CategorySummary>> {
    let categories = Category::find()
        .order_by_asc(category::Column::Name)
        .all(db)
        .await?;

    let mut summaries = Vec::with_capacity(categories.len());
    for found in categories {
        let product_count = Product::find()
            .filter(product::Column::CategoryId.eq(found.id))
            .count(db)
            .await?;
        summaries.push(CategorySummary {
            id: found.id,
            name: found.name,
            product_count,
        });
    }
    Ok(summaries)
}

/// Fetches a category by id.
///
/// # Errors
/// Returns an error if the database query fails.
pub async fn get_category_by_id<C>(db: &C, category_id: i64) -> Result<Option<category::Model>>
where
    C: ConnectionTrait,
{
    Category::find_by_id(category_id)
        .one(db)
        .await
        .map_err(Into::into)
}

/// Renames and/or re-describes a category.
///
/// # Errors
/// Returns `NotFound` if the category does not exist and `InvalidInput` for a blank name.
#[instrument(skip(db, name, description))]
pub async fn update_category(
    db: &DatabaseConnection,
    category_id: i64,
    name: Option<String>,
    description: Option<String>,
) -> Result<category::Model> {
    let current = get_category_by_id(db, category_id)
        .await?
        .ok_or_else(|| Error::not_found("Category", category_id))?;

    let mut active: category::ActiveModel = current.clone().into();
    if let Some(name) = non_blank(name, "name")? {
        active.name = Set(name);
    }
    if description.is_some() {
        active.description = Set(description);
    }
    if !active.is_changed() {
        return Ok(current);
    }
    active.update(db).await.map_err(Into::into)
}

/// Deletes a category after deleting all of its subcategories.
///
/// # Errors
/// Returns `NotFound` if the category does not exist and `InvalidState` if any
/// product is still listed under it.
#[instrument(skip(db, locks))]
pub async fn delete_category(
    db: &DatabaseConnection,
    locks: &EntityLocks,
    category_id: i64,
) -> Result<u64> {
    let _guard = locks.acquire(LockKey::Category(category_id)).await;
    let txn = db.begin().await?;

    let found = get_category_by_id(&txn, category_id)
        .await?
        .ok_or_else(|| Error::not_found("Category", category_id))?;

    let listed = Product::find()
        .filter(product::Column::CategoryId.eq(category_id))
        .count(&txn)
        .await?;
    if listed > 0 {
        return Err(Error::invalid_state(format!(
            "Category still has {listed} product(s); move or delete them first"
        )));
    }

    let children = Subcategory::delete_many()
        .filter(subcategory::Column::CategoryId.eq(category_id))
        .exec(&txn)
        .await?
        .rows_affected;
    found.delete(&txn).await?;

    txn.commit().await?;
    info!(category_id, subcategories = children, "Category deleted");
    Ok(children)
}

/// Creates a subcategory under an existing category.
///
/// # Errors
/// Returns `InvalidInput` for a blank name and `NotFound` if the parent does not exist.
#[instrument(skip(db, locks, description))]
pub async fn create_subcategory(
    db: &DatabaseConnection,
    locks: &EntityLocks,
    category_id: i64,
    name: &str,
    description: Option<String>,
) -> Result<subcategory::Model> {
    let name = name.trim();
    if name.is_empty() {
        return Err(Error::invalid_input("Subcategory name is required"));
    }

    let _guard = locks.acquire(LockKey::Category(category_id)).await;
    get_category_by_id(db, category_id)
        .await?
        .ok_or_else(|| Error::not_found("Category", category_id))?;

    let now = Utc::now();
    subcategory::ActiveModel {
        name: Set(name.to_string()),
        description: Set(description),
        category_id: Set(category_id),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await
    .map_err(Into::into)
}

/// Lists the subcategories of a category, ordered by name.
///
/// # Errors
/// Returns an error if the database query fails.
pub async fn list_subcategories(
    db: &DatabaseConnection,
    category_id: i64,
) -> Result<Vec<subcategory::Model>> {
    Subcategory::find()
        .filter(subcategory::Column::CategoryId.eq(category_id))
        .order_by_asc(subcategory::Column::Name)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Fetches a subcategory by id.
///
/// # Errors
/// Returns an error if the database query fails.
pub async fn get_subcategory_by_id<C>(
    db: &C,
    subcategory_id: i64,
) -> Result<Option<subcategory::Model>>
where
    C: ConnectionTrait,
{
    Subcategory::find_by_id(subcategory_id)
        .one(db)
        .await
        .map_err(Into::into)
}

/// Renames and/or re-describes a subcategory.
///
/// # Errors
/// Returns `NotFound` if the subcategory does not exist and `InvalidInput` for a blank name.
#[instrument(skip(db, name, description))]
pub async fn update_subcategory(
    db: &DatabaseConnection,
    subcategory_id: i64,
    name: Option<String>,
    description: Option<String>,
) -> Result<subcategory::Model> {
    let current = get_subcategory_by_id(db, subcategory_id)
        .await?
        .ok_or_else(|| Error::not_found("Subcategory", subcategory_id))?;

    let mut active: subcategory::ActiveModel = current.clone().into();
    if let Some(name) = non_blank(name, "name")? {
        active.name = Set(name);
    }
    if description.is_some() {
        active.description = Set(description);
    }
    if !active.is_changed() {
        return Ok(current);
    }
    active.updated_at = Set(Utc::now());
    active.update(db).await.map_err(Into::into)
}

/// Deletes a single subcategory. Products listed under it keep their category.
///
/// # Errors
/// Returns `NotFound` if the subcategory does not exist.
#[instrument(skip(db))]
pub async fn delete_subcategory(db: &DatabaseConnection, subcategory_id: i64) -> Result<()> {
    let result = Subcategory::delete_by_id(subcategory_id).exec(db).await?;
    if result.rows_affected == 0 {
        return Err(Error::not_found("Subcategory", subcategory_id));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::test_utils::*;

    #[tokio::test]
    async fn test_delete_category_cascades_to_subcategories() -> Result<()> {
        let db = setup_test_db().await?;
        let locks = EntityLocks::new();
        let doomed = create_test_category(&db, "Garden").await?;
        let kept = create_test_category(&db, "Kitchen").await?;
        create_subcategory(&db, &locks, doomed.id, "Tools", None).await?;
        create_subcategory(&db, &locks, doomed.id, "Seeds", None).await?;
        let survivor = create_subcategory(&db, &locks, kept.id, "Pans", None).await?;

        let removed = delete_category(&db, &locks, doomed.id).await?;
        assert_eq!(removed, 2);

        let orphans = Subcategory::find()
            .filter(subcategory::Column::CategoryId.eq(doomed.id))
            .count(&db)
            .await?;
        assert_eq!(orphans, 0);
        assert!(get_category_by_id(&db, doomed.id).await?.is_none());
        assert!(get_subcategory_by_id(&db, survivor.id).await?.is_some());
        Ok(())
    }

    #[tokio::test]
    async fn test_delete_missing_category() -> Result<()> {
        let db = setup_test_db().await?;
        let result = delete_category(&db, &EntityLocks::new(), 42).await;
        assert!(matches!(
            result.unwrap_err(),
            Error::NotFound {
                entity: "Category",
                ..
            }
        ));
        Ok(())
    }

    #[tokio::test]
    async fn test_delete_category_with_products_is_refused() -> Result<()> {
        let (db, seller, _) = setup_with_store().await?;
        let locks = EntityLocks::new();
        let category = create_test_category(&db, "Books").await?;
        let sub = create_subcategory(&db, &locks, category.id, "Poetry", None).await?;
        create_test_product(&db, seller.id, category.id, "Odes").await?;

        let result = delete_category(&db, &locks, category.id).await;
        assert!(matches!(result.unwrap_err(), Error::InvalidState { .. }));
        // Nothing was removed
        assert!(get_subcategory_by_id(&db, sub.id).await?.is_some());
        assert!(get_category_by_id(&db, category.id).await?.is_some());
        Ok(())
    }

    #[tokio::test]
    async fn test_subcategory_requires_parent() -> Result<()> {
        let db = setup_test_db().await?;
        let result = create_subcategory(&db, &EntityLocks::new(), 77, "Lost", None).await;
        assert!(matches!(result.unwrap_err(), Error::NotFound { .. }));
        Ok(())
    }

    #[tokio::test]
    async fn test_list_categories_counts_products() -> Result<()> {
        let (db, seller, _) = setup_with_store().await?;
        let books = create_test_category(&db, "Books").await?;
        let art = create_test_category(&db, "Art").await?;
        create_test_product(&db, seller.id, books.id, "A").await?;
        create_test_product(&db, seller.id, books.id, "B").await?;

        let summaries = list_categories(&db).await?;
        assert_eq!(
            summaries,
            vec![
                CategorySummary {
                    id: art.id,
                    name: "Art".to_string(),
                    product_count: 0
                },
                CategorySummary {
                    id: books.id,
                    name: "Books".to_string(),
                    product_count: 2
                },
            ]
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_update_and_delete_subcategory() -> Result<()> {
        let db = setup_test_db().await?;
        let locks = EntityLocks::new();
        let category = create_test_category(&db, "Music").await?;
        let sub = create_subcategory(&db, &locks, category.id, "Jaz", None).await?;

        let renamed = update_subcategory(&db, sub.id, Some("Jazz".to_string()), None).await?;
        assert_eq!(renamed.name, "Jazz");
        assert_eq!(list_subcategories(&db, category.id).await?.len(), 1);

        delete_subcategory(&db, sub.id).await?;
        let again = delete_subcategory(&db, sub.id).await;
        assert!(matches!(again.unwrap_err(), Error::NotFound { .. }));
        Ok(())
    }

    #[tokio::test]
    async fn test_update_category() -> Result<()> {
        let db = setup_test_db().await?;
        let category = create_test_category(&db, "Toys").await?;

        let updated = update_category(
            &db,
            category.id,
            None,
            Some("Things to play with".to_string()),
        )
        .await?;
        assert_eq!(updated.name, "Toys");
        assert_eq!(updated.description.as_deref(), Some("Things to play with"));

        let missing = update_category(&db, 999, Some("x".to_string()), None).await;
        assert!(matches!(missing.unwrap_err(), Error::NotFound { .. }));
        Ok(())
    }
}
