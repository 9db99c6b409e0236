//! Rating aggregation - one rating per user per product, folded into an average.
//!
//! `RatingBook` is the pure aggregate. `submit_rating` loads a product's ratings
//! into a book, applies the submission, and persists the changed row together
//! with the recomputed `average_rating` in one transaction under the product lock.

use crate::{
    core::locks::{EntityLocks, LockKey},
    entities::{Product, Rating, User, product, rating, user},
    errors::{Error, Result},
};
use chrono::Utc;
use sea_orm::{QueryOrder, Set, TransactionTrait, prelude::*};
use serde::Serialize;
use std::collections::HashMap;
use tracing::{info, instrument};

/// Display name used when a rating's author no longer exists.
pub const UNKNOWN_USER: &str = "Unknown User";

/// Lowest accepted rating value
pub const MIN_RATING: i32 = 1;
/// Highest accepted rating value
pub const MAX_RATING: i32 = 5;

/// One user's entry in a `RatingBook`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RatingEntry {
    /// Author
    pub user_id: i64,
    /// Score
    pub value: i32,
    /// Optional review text
    pub comment: Option<String>,
}

/// A product's ratings, at most one per user.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RatingBook {
    entries: Vec<RatingEntry>,
}

impl RatingBook {
    /// Creates an empty book.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `user_id`'s rating. An existing entry keeps its comment unless a new
    /// one is given. Returns `true` when an existing entry was replaced.
    pub fn submit(&mut self, user_id: i64, value: i32, comment: Option<String>) -> bool {
        if let Some(entry) = self.entries.iter_mut().find(|e| e.user_id == user_id) {
            entry.value = value;
            if comment.is_some() {
                entry.comment = comment;
            }
            return true;
        }
        self.entries.push(RatingEntry {
            user_id,
            value,
            comment,
        });
        false
    }

    /// Mean of all values, `0.0` for an empty book.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn average(&self) -> f64 {
        if self.entries.is_empty() {
            return 0.0;
        }
        let total: i64 = self.entries.iter().map(|e| i64::from(e.value)).sum();
        total as f64 / self.entries.len() as f64
    }

    /// Number of ratings.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the book holds no ratings.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The entry written by `user_id`, if any.
    #[must_use]
    pub fn entry(&self, user_id: i64) -> Option<&RatingEntry> {
        self.entries.iter().find(|e| e.user_id == user_id)
    }
}

impl<'a> FromIterator<&'a rating::Model> for RatingBook {
    fn from_iter<I: IntoIterator<Item = &'a rating::Model>>(iter: I) -> Self {
        Self {
            entries: iter
                .into_iter()
                .map(|r| RatingEntry {
                    user_id: r.user_id,
                    value: r.rating,
                    comment: r.comment.clone(),
                })
                .collect(),
        }
    }
}

/// A rating as shown to clients, with the author's display name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RatingView {
    /// Rating id
    pub id: i64,
    /// Author id
    pub user_id: i64,
    /// Author display name, or `"Unknown User"`
    pub name: String,
    /// Score
    pub rating: i32,
    /// Review text
    pub comment: Option<String>,
}

/// Result of `submit_rating`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RatingOutcome {
    /// The product with its refreshed average
    pub product: product::Model,
    /// Every current rating of the product
    pub ratings: Vec<RatingView>,
    /// Whether the caller's earlier rating was replaced
    pub was_update: bool,
}

/// Checks that a submitted value is present and within range.
///
/// # Errors
/// Returns `InvalidInput` when absent or outside `1..=5`.
pub fn validate_rating(value: Option<i32>) -> Result<i32> {
    match value {
        None => Err(Error::invalid_input("Rating is required")),
        Some(v) if (MIN_RATING..=MAX_RATING).contains(&v) => Ok(v),
        Some(_) => Err(Error::invalid_input(format!(
            "Rating must be between {MIN_RATING} and {MAX_RATING}"
        ))),
    }
}

/// Attaches author display names to ratings, oldest first.
///
/// # Errors
/// Returns an error if the user lookup fails.
pub async fn present_ratings<C>(db: &C, ratings: Vec<rating::Model>) -> Result<Vec<RatingView>>
where
    C: ConnectionTrait,
{
    let author_ids: Vec<i64> = ratings.iter().map(|r| r.user_id).collect();
    let names: HashMap<i64, String> = User::find()
        .filter(user::Column::Id.is_in(author_ids))
        .all(db)
        .await?
        .into_iter()
        .map(|u| (u.id, u.name))
        .collect();

    Ok(ratings
        .into_iter()
        .map(|r| RatingView {
            name: names
                .get(&r.user_id)
                .cloned()
                .unwrap_or_else(|| UNKNOWN_USER.to_string()),
            id: r.id,
            user_id: r.user_id,
            rating: r.rating,
            comment: r.comment,
        })
        .collect())
}

/// Loads a product's ratings in insertion order.
///
/// # Errors
/// Returns an error if the database query fails.
pub async fn ratings_for_product<C>(db: &C, product_id: i64) -> Result<Vec<rating::Model>>
where
    C: ConnectionTrait,
{
    Rating::find()
        .filter(rating::Column::ProductId.eq(product_id))
        .order_by_asc(rating::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Adds or replaces `user_id`'s rating of a product and refreshes its average.
///
/// # Errors
/// Returns `NotFound` if the product does not exist and `InvalidInput` if the
/// rating is absent or out of range.
#[instrument(skip(db, locks, comment))]
pub async fn submit_rating(
    db: &DatabaseConnection,
    locks: &EntityLocks,
    product_id: i64,
    user_id: i64,
    value: Option<i32>,
    comment: Option<String>,
) -> Result<RatingOutcome> {
    let _guard = locks.acquire(LockKey::Product(product_id)).await;
    let txn = db.begin().await?;

    let found = Product::find_by_id(product_id)
        .one(&txn)
        .await?
        .ok_or_else(|| Error::not_found("Product", product_id))?;
    let value = validate_rating(value)?;

    let existing = ratings_for_product(&txn, product_id).await?;
    let mut book: RatingBook = existing.iter().collect();
    let was_update = book.submit(user_id, value, comment);

    let now = Utc::now();
    let submitted = book
        .entry(user_id)
        .ok_or_else(|| Error::invalid_state("Rating was not recorded"))?;
    match existing.into_iter().find(|r| r.user_id == user_id) {
        Some(current) => {
            let mut active: rating::ActiveModel = current.into();
            active.rating = Set(submitted.value);
            active.comment = Set(submitted.comment.clone());
            active.updated_at = Set(now);
            active.update(&txn).await?;
        }
        None => {
            rating::ActiveModel {
                product_id: Set(product_id),
                user_id: Set(user_id),
                rating: Set(submitted.value),
                comment: Set(submitted.comment.clone()),
                created_at: Set(now),
                updated_at: Set(now),
                ..Default::default()
            }
            .insert(&txn)
            .await?;
        }
    }

    let mut active: product::ActiveModel = found.into();
    active.average_rating = Set(book.average());
    let product = active.update(&txn).await?;

    let ratings = present_ratings(&txn, ratings_for_product(&txn, product_id).await?).await?;
    txn.commit().await?;

    info!(
        product_id,
        user_id,
        was_update,
        average = product.average_rating,
        "Rating submitted"
    );
    Ok(RatingOutcome {
        product,
        ratings,
        was_update,
    })
}
