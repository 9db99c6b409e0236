//! Product routes: creation, listing, search, detail, mutation and ratings.

use super::{
    SharedState,
    extract::{AuthUser, JsonBody, PathParam, QueryParams},
};
use crate::{
    core::{
        product::{self, NewProduct, ProductChanges},
        query::{self, ProductPage, ProductQuery},
        rating,
    },
    errors::{Error, Result},
};
use axum::{Json, extract::State, http::StatusCode};
use serde::Deserialize;
use serde_json::{Value, json};

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RatingRequest {
    rating: Option<i32>,
    comment: Option<String>,
}

pub async fn create_product(
    State(state): State<SharedState>,
    AuthUser(user): AuthUser,
    JsonBody(body): JsonBody<NewProduct>,
) -> Result<(StatusCode, Json<Value>)> {
    let created = product::create_product(&state.database, &state.locks, user.id, body).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "Product added successfully.", "product": created })),
    ))
}

pub async fn list_products(
    State(state): State<SharedState>,
    AuthUser(_): AuthUser,
    QueryParams(params): QueryParams<ProductQuery>,
) -> Result<Json<ProductPage>> {
    query::list_products(&state.database, &state.config.catalog, &params)
        .await
        .map(Json)
}

pub async fn category_products(
    State(state): State<SharedState>,
    QueryParams(params): QueryParams<ProductQuery>,
) -> Result<Json<ProductPage>> {
    if params.category.is_none() {
        return Err(Error::invalid_input("category is required"));
    }
    query::list_products(&state.database, &state.config.catalog, &params)
        .await
        .map(Json)
}

pub async fn products_by_keyword(
    State(state): State<SharedState>,
    QueryParams(params): QueryParams<ProductQuery>,
) -> Result<Json<ProductPage>> {
    if params.keyword.as_deref().is_none_or(|k| k.trim().is_empty()) {
        return Err(Error::invalid_input("keyword is required"));
    }
    query::list_products(&state.database, &state.config.catalog, &params)
        .await
        .map(Json)
}

pub async fn get_product(
    State(state): State<SharedState>,
    AuthUser(_): AuthUser,
    PathParam(product_id): PathParam<i64>,
) -> Result<Json<Value>> {
    let detail = product::get_product(&state.database, product_id).await?;
    Ok(Json(json!({ "product": detail })))
}

pub async fn update_product(
    State(state): State<SharedState>,
    AuthUser(user): AuthUser,
    PathParam(product_id): PathParam<i64>,
    JsonBody(body): JsonBody<ProductChanges>,
) -> Result<Json<Value>> {
    let updated =
        product::update_product(&state.database, &state.locks, user.id, product_id, body).await?;
    Ok(Json(json!({ "message": "Product updated", "product": updated })))
}

pub async fn delete_product(
    State(state): State<SharedState>,
    AuthUser(user): AuthUser,
    PathParam(product_id): PathParam<i64>,
) -> Result<Json<Value>> {
    product::delete_product(&state.database, &state.locks, user.id, product_id).await?;
    Ok(Json(json!({ "message": "Product deleted" })))
}

pub async fn submit_rating(
    State(state): State<SharedState>,
    AuthUser(user): AuthUser,
    PathParam(product_id): PathParam<i64>,
    JsonBody(body): JsonBody<RatingRequest>,
) -> Result<Json<Value>> {
    let outcome = rating::submit_rating(
        &state.database,
        &state.locks,
        product_id,
        user.id,
        body.rating,
        body.comment,
    )
    .await?;
    let message = if outcome.was_update {
        "Rating updated"
    } else {
        "Rating added"
    };
    Ok(Json(json!({
        "message": message,
        "averageRating": outcome.product.average_rating,
        "ratings": outcome.ratings,
        "product": outcome.product,
    })))
}
