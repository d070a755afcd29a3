use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::error::AppError;
use crate::middleware::CurrentUser;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct AddToCartRequest {
    pub product_id: Uuid,
    #[serde(default = "default_quantity")]
    pub quantity: i32,
}

fn default_quantity() -> i32 {
    1
}

#[derive(Debug, Deserialize)]
pub struct UpdateCartRequest {
    pub quantity: i32,
}

pub async fn list_cart(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
) -> Result<impl IntoResponse, AppError> {
    let items = state.cart.list(user_id).await?;
    Ok(Json(items))
}

pub async fn add_to_cart(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    payload: Result<Json<AddToCartRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(payload) = payload?;
    let item = state
        .cart
        .add(user_id, payload.product_id, payload.quantity)
        .await?;
    Ok((StatusCode::CREATED, Json(item)))
}

pub async fn update_cart_item(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Path(line_id): Path<Uuid>,
    payload: Result<Json<UpdateCartRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(payload) = payload?;
    state
        .cart
        .update_quantity(line_id, user_id, payload.quantity)
        .await?;
    Ok(Json(json!({ "message": "Cart item updated" })))
}

pub async fn remove_cart_item(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Path(line_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    state.cart.remove(line_id, user_id).await?;
    Ok(Json(json!({ "message": "Item removed from cart" })))
}

pub async fn clear_cart(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
) -> Result<impl IntoResponse, AppError> {
    let removed = state.cart.clear(user_id).await?;
    Ok(Json(json!({ "message": "Cart cleared", "removed": removed })))
}
