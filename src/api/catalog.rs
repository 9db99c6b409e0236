//! Category and subcategory routes. These are not behind authentication.

use super::{
    SharedState,
    extract::{JsonBody, PathParam},
};
use crate::{
    core::catalog,
    errors::{Error, Result},
};
use axum::{Json, extract::State, http::StatusCode};
use serde::Deserialize;
use serde_json::{Value, json};

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CategoryRequest {
    name: Option<String>,
    description: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SubcategoryRequest {
    name: Option<String>,
    description: Option<String>,
    category_id: Option<i64>,
}

pub async fn create_category(
    State(state): State<SharedState>,
    JsonBody(body): JsonBody<CategoryRequest>,
) -> Result<(StatusCode, Json<Value>)> {
    let created = catalog::create_category(
        &state.database,
        body.name.as_deref().unwrap_or_default(),
        body.description,
    )
    .await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "Category created", "category": created })),
    ))
}

pub async fn list_categories(State(state): State<SharedState>) -> Result<Json<Value>> {
    let categories = catalog::list_categories(&state.database).await?;
    Ok(Json(json!({ "categories": categories })))
}

pub async fn update_category(
    State(state): State<SharedState>,
    PathParam(category_id): PathParam<i64>,
    JsonBody(body): JsonBody<CategoryRequest>,
) -> Result<Json<Value>> {
    let updated =
        catalog::update_category(&state.database, category_id, body.name, body.description)
            .await?;
    Ok(Json(json!({ "message": "Category updated", "category": updated })))
}

pub async fn delete_category(
    State(state): State<SharedState>,
    PathParam(category_id): PathParam<i64>,
) -> Result<Json<Value>> {
    let removed = catalog::delete_category(&state.database, &state.locks, category_id).await?;
    Ok(Json(json!({
        "message": "Category and its subcategories deleted",
        "subcategoriesDeleted": removed,
    })))
}

pub async fn create_subcategory(
    State(state): State<SharedState>,
    JsonBody(body): JsonBody<SubcategoryRequest>,
) -> Result<(StatusCode, Json<Value>)> {
    let category_id = body
        .category_id
        .ok_or_else(|| Error::invalid_input("categoryId is required"))?;
    let created = catalog::create_subcategory(
        &state.database,
        &state.locks,
        category_id,
        body.name.as_deref().unwrap_or_default(),
        body.description,
    )
    .await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "Subcategory created", "subcategory": created })),
    ))
}

/// The path id is the parent category.
pub async fn list_subcategories(
    State(state): State<SharedState>,
    PathParam(category_id): PathParam<i64>,
) -> Result<Json<Value>> {
    let subcategories = catalog::list_subcategories(&state.database, category_id).await?;
    Ok(Json(json!({ "subcategories": subcategories })))
}

pub async fn update_subcategory(
    State(state): State<SharedState>,
    PathParam(subcategory_id): PathParam<i64>,
    JsonBody(body): JsonBody<SubcategoryRequest>,
) -> Result<Json<Value>> {
    let updated = catalog::update_subcategory(
        &state.database,
        subcategory_id,
        body.name,
        body.description,
    )
    .await?;
    Ok(Json(json!({ "message": "Subcategory updated", "subcategory": updated })))
}

pub async fn delete_subcategory(
    State(state): State<SharedState>,
    PathParam(subcategory_id): PathParam<i64>,
) -> Result<Json<Value>> {
    catalog::delete_subcategory(&state.database, subcategory_id).await?;
    Ok(Json(json!({ "message": "Subcategory deleted" })))
}
