//! Product listing - filtering, price range, sorting, keyword search, pagination.

use crate::{
    config::settings::CatalogConfig,
    entities::{Product, product},
    errors::{Error, Result},
};
use sea_orm::{
    Condition, PaginatorTrait, QueryOrder, Select,
    prelude::*,
    sea_query::{Expr, Func, LikeExpr, SimpleExpr},
};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Query-string parameters accepted by product listings.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductQuery {
    /// Only products in this category
    pub category: Option<i64>,
    /// Inclusive `"min-max"` price bounds
    pub price_range: Option<String>,
    /// `"price"` or `"-price"`
    pub sort_by: Option<String>,
    /// Case-insensitive substring of name or description
    pub keyword: Option<String>,
    /// 1-based page number
    pub page: Option<u64>,
    /// Page size
    pub limit: Option<u64>,
}

/// One page of a product listing.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductPage {
    /// Products on this page
    pub products: Vec<product::Model>,
    /// Matching products across all pages
    pub total: u64,
    /// This page's number
    pub page: u64,
    /// Number of pages
    pub pages: u64,
}

/// Inclusive price bounds parsed from `"min-max"`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PriceRange {
    /// Lower bound
    pub min: f64,
    /// Upper bound
    pub max: f64,
}

impl FromStr for PriceRange {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let malformed =
            || Error::invalid_input(format!("Invalid priceRange '{s}', expected min-max"));
        let (min, max) = s.split_once('-').ok_or_else(malformed)?;
        let min: f64 = min.trim().parse().map_err(|_| malformed())?;
        let max: f64 = max.trim().parse().map_err(|_| malformed())?;
        if !min.is_finite() || !max.is_finite() || min > max {
            return Err(malformed());
        }
        Ok(Self { min, max })
    }
}

/// Ordering applied by `sortBy`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PriceSort {
    /// Cheapest first
    Ascending,
    /// Most expensive first
    Descending,
    /// Insertion order
    #[default]
    Unsorted,
}

impl PriceSort {
    /// Interprets a `sortBy` value; anything unrecognised leaves results unsorted.
    #[must_use]
    pub fn parse(value: Option<&str>) -> Self {
        match value {
            Some("price") => Self::Ascending,
            Some("-price") => Self::Descending,
            _ => Self::Unsorted,
        }
    }
}

fn escape_like(keyword: &str) -> String {
    let mut escaped = String::with_capacity(keyword.len() + 2);
    escaped.push('%');
    for c in keyword.to_lowercase().chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

fn lower_like(column: product::Column, pattern: &str) -> SimpleExpr {
    Expr::expr(Func::lower(Expr::col(column))).like(LikeExpr::new(pattern).escape('\\'))
}

fn build_select(query: &ProductQuery) -> Result<Select<Product>> {
    let mut select = Product::find();

    if let Some(category_id) = query.category {
        select = select.filter(product::Column::CategoryId.eq(category_id));
    }
    if let Some(range) = query.price_range.as_deref().filter(|r| !r.trim().is_empty()) {
        let range: PriceRange = range.parse()?;
        select = select.filter(product::Column::Price.between(range.min, range.max));
    }
    if let Some(keyword) = query.keyword.as_deref().map(str::trim).filter(|k| !k.is_empty()) {
        let pattern = escape_like(keyword);
        select = select.filter(
            Condition::any()
                .add(lower_like(product::Column::Name, &pattern))
                .add(lower_like(product::Column::Description, &pattern)),
        );
    }

    select = match PriceSort::parse(query.sort_by.as_deref()) {
        PriceSort::Ascending => select.order_by_asc(product::Column::Price),
        PriceSort::Descending => select.order_by_desc(product::Column::Price),
        PriceSort::Unsorted => select,
    };
    Ok(select.order_by_asc(product::Column::Id))
}

/// Lists products matching `query`, one page at a time.
///
/// # Errors
/// Returns `InvalidInput` for a malformed price range, a zero page/limit, or a page
/// so large that its offset cannot be represented.
pub async fn list_products(
    db: &DatabaseConnection,
    catalog: &CatalogConfig,
    query: &ProductQuery,
) -> Result<ProductPage> {
    let page = query.page.unwrap_or(1);
    if page == 0 {
        return Err(Error::invalid_input("page must be at least 1"));
    }
    let limit = query.limit.unwrap_or(catalog.default_page_size);
    if limit == 0 {
        return Err(Error::invalid_input("limit must be at least 1"));
    }
    let limit = limit.min(catalog.max_page_size.max(1));
    // SQLite takes OFFSET as a signed 64-bit integer
    (page - 1)
        .checked_mul(limit)
        .filter(|offset| i64::try_from(*offset).is_ok())
        .ok_or_else(|| Error::invalid_input("page is out of range"))?;

    let paginator = build_select(query)?.paginate(db, limit);
    let total = paginator.num_items().await?;
    let products = paginator.fetch_page(page - 1).await?;

    Ok(ProductPage {
        products,
        total,
        page,
        pages: total.div_ceil(limit),
    })
}
