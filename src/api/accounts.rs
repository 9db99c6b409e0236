//! Account and store routes.

use super::{
    SharedState,
    extract::{AuthUser, JsonBody, PathParam},
};
use crate::{
    core::{
        account::{self, Registration, SignedIn},
        store::{self, NewStore, StoreChanges},
    },
    errors::Result,
};
use axum::{Json, extract::State, http::StatusCode};
use serde::Deserialize;
use serde_json::{Value, json};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    #[serde(default)]
    name: String,
    #[serde(default)]
    email: String,
    #[serde(default)]
    password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    email: String,
    #[serde(default)]
    password: String,
}

#[derive(Debug, Deserialize)]
pub struct AddressRequest {
    #[serde(default)]
    address: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StoreRequest {
    shop_name: Option<String>,
    address: Option<String>,
    category: Option<String>,
}

fn signed_in(message: &str, signed_in: SignedIn) -> Value {
    json!({ "message": message, "token": signed_in.token, "user": signed_in.user })
}

pub async fn register(
    State(state): State<SharedState>,
    JsonBody(body): JsonBody<RegisterRequest>,
) -> Result<(StatusCode, Json<Value>)> {
    let registration = Registration {
        name: body.name,
        email: body.email,
        password: body.password,
    };
    let created =
        account::register(&state.database, registration, state.config.sessions.ttl_days).await?;
    Ok((
        StatusCode::CREATED,
        Json(signed_in("User registered successfully", created)),
    ))
}

pub async fn login(
    State(state): State<SharedState>,
    JsonBody(body): JsonBody<LoginRequest>,
) -> Result<Json<Value>> {
    let session = account::login(
        &state.database,
        &body.email,
        &body.password,
        state.config.sessions.ttl_days,
    )
    .await?;
    Ok(Json(signed_in("Login successful", session)))
}

pub async fn profile(
    State(state): State<SharedState>,
    AuthUser(user): AuthUser,
) -> Result<Json<Value>> {
    let owned = store::find_store_for_owner(&state.database, user.id).await?;
    Ok(Json(json!({ "user": user, "store": owned })))
}

pub async fn update_address(
    State(state): State<SharedState>,
    AuthUser(user): AuthUser,
    JsonBody(body): JsonBody<AddressRequest>,
) -> Result<Json<Value>> {
    let updated = account::update_address(&state.database, user.id, &body.address).await?;
    Ok(Json(json!({ "message": "Address updated", "user": updated })))
}

pub async fn create_store(
    State(state): State<SharedState>,
    AuthUser(user): AuthUser,
    JsonBody(body): JsonBody<StoreRequest>,
) -> Result<(StatusCode, Json<Value>)> {
    let new_store = NewStore {
        shop_name: body.shop_name.unwrap_or_default(),
        address: body.address.unwrap_or_default(),
        category: body.category.unwrap_or_default(),
    };
    let created = store::create_store(&state.database, &state.locks, user.id, new_store).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "Store created successfully", "store": created })),
    ))
}

pub async fn update_store(
    State(state): State<SharedState>,
    AuthUser(user): AuthUser,
    JsonBody(body): JsonBody<StoreRequest>,
) -> Result<Json<Value>> {
    let changes = StoreChanges {
        shop_name: body.shop_name,
        address: body.address,
        category: body.category,
    };
    let updated = store::update_store(&state.database, user.id, changes).await?;
    Ok(Json(json!({ "message": "Store updated successfully", "store": updated })))
}

pub async fn store_products(
    State(state): State<SharedState>,
    AuthUser(_): AuthUser,
    PathParam(store_id): PathParam<i64>,
) -> Result<Json<Value>> {
    let (found, products) = store::store_products(&state.database, store_id).await?;
    Ok(Json(json!({ "store": found, "products": products })))
}
