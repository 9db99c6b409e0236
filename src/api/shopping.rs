//! Cart, order and payment routes. Everything here acts on the caller's own data.

use super::{
    SharedState,
    extract::{AuthUser, JsonBody, PathParam},
};
use crate::{
    core::{
        cart::{self, CartView},
        order::{self, NewOrder},
        payment,
    },
    entities::{OrderStatus, PaymentStatus},
    errors::{Error, Result},
};
use axum::{Json, extract::State, http::StatusCode};
use serde::Deserialize;
use serde_json::{Value, json};

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AddToCartRequest {
    product_id: Option<i64>,
    quantity: Option<i32>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct QuantityRequest {
    quantity: Option<i32>,
}

#[derive(Debug, Deserialize)]
pub struct StatusRequest {
    status: OrderStatus,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRequest {
    order_id: i64,
    #[serde(default)]
    payment_status: Option<PaymentStatus>,
}

fn cart_response(message: &str, view: CartView) -> Json<Value> {
    Json(json!({ "message": message, "cart": view }))
}

pub async fn add_to_cart(
    State(state): State<SharedState>,
    AuthUser(user): AuthUser,
    JsonBody(body): JsonBody<AddToCartRequest>,
) -> Result<Json<Value>> {
    let product_id = body
        .product_id
        .ok_or_else(|| Error::invalid_input("productId is required"))?;
    let view = cart::add_to_cart(
        &state.database,
        &state.locks,
        user.id,
        product_id,
        body.quantity.unwrap_or(1),
    )
    .await?;
    Ok(cart_response("Item added to cart successfully", view))
}

pub async fn get_cart(
    State(state): State<SharedState>,
    AuthUser(user): AuthUser,
) -> Result<Json<CartView>> {
    cart::get_cart(&state.database, user.id).await.map(Json)
}

pub async fn clear_cart(
    State(state): State<SharedState>,
    AuthUser(user): AuthUser,
) -> Result<Json<Value>> {
    let view = cart::clear_cart(&state.database, &state.locks, user.id).await?;
    Ok(cart_response("Cart cleared", view))
}

pub async fn update_cart_item(
    State(state): State<SharedState>,
    AuthUser(user): AuthUser,
    PathParam(item_id): PathParam<i64>,
    JsonBody(body): JsonBody<QuantityRequest>,
) -> Result<Json<Value>> {
    let quantity = body
        .quantity
        .ok_or_else(|| Error::invalid_input("quantity is required"))?;
    let view = cart::update_line(&state.database, &state.locks, user.id, item_id, quantity).await?;
    Ok(cart_response("Cart item updated", view))
}

pub async fn remove_cart_item(
    State(state): State<SharedState>,
    AuthUser(user): AuthUser,
    PathParam(item_id): PathParam<i64>,
) -> Result<Json<Value>> {
    let view = cart::remove_line(&state.database, &state.locks, user.id, item_id).await?;
    Ok(cart_response("Item removed from cart", view))
}

pub async fn create_order(
    State(state): State<SharedState>,
    AuthUser(user): AuthUser,
    JsonBody(body): JsonBody<NewOrder>,
) -> Result<(StatusCode, Json<Value>)> {
    let placed = order::create_order(&state.database, user.id, body).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "Order created successfully", "order": placed })),
    ))
}

pub async fn list_orders(
    State(state): State<SharedState>,
    AuthUser(user): AuthUser,
) -> Result<Json<Value>> {
    let orders = order::list_orders(&state.database, user.id).await?;
    Ok(Json(json!({ "orders": orders })))
}

pub async fn update_order_status(
    State(state): State<SharedState>,
    AuthUser(user): AuthUser,
    PathParam(order_id): PathParam<i64>,
    JsonBody(body): JsonBody<StatusRequest>,
) -> Result<Json<Value>> {
    let updated =
        order::update_order_status(&state.database, &state.locks, user.id, order_id, body.status)
            .await?;
    Ok(Json(json!({ "message": "Order status updated", "order": updated })))
}

pub async fn cancel_order(
    State(state): State<SharedState>,
    AuthUser(user): AuthUser,
    PathParam(order_id): PathParam<i64>,
) -> Result<Json<Value>> {
    let cancelled = order::cancel_order(&state.database, &state.locks, user.id, order_id).await?;
    Ok(Json(json!({ "message": "Order cancelled successfully", "order": cancelled })))
}

pub async fn process_payment(
    State(state): State<SharedState>,
    AuthUser(user): AuthUser,
    JsonBody(body): JsonBody<PaymentRequest>,
) -> Result<Json<Value>> {
    let updated = payment::process_payment(
        &state.database,
        &state.locks,
        user.id,
        body.order_id,
        body.payment_status,
    )
    .await?;
    Ok(Json(json!({ "message": "Payment processed successfully", "order": updated })))
}
