use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::Order;
use crate::error::AppError;
use crate::middleware::CurrentUser;
use crate::use_cases::PlaceOrderInput;
use crate::validation::validate_checkout;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct OrderListQuery {
    pub status: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct OrderListResponse {
    pub orders: Vec<Order>,
    pub total: i64,
}

#[derive(Debug, Deserialize)]
pub struct CreateOrderRequest {
    pub payment_method: String,
    pub shipping_address: String,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdatePaymentRequest {
    pub payment_status: String,
}

pub async fn list_orders(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Query(query): Query<OrderListQuery>,
) -> Result<impl IntoResponse, AppError> {
    let page = state
        .orders
        .list(user_id, query.status.as_deref(), query.limit, query.offset)
        .await?;

    Ok(Json(OrderListResponse {
        orders: page.orders,
        total: page.total,
    }))
}

pub async fn get_order(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Path(order_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let order = state.orders.get(order_id, user_id).await?;
    Ok(Json(order))
}

pub async fn create_order(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    payload: Result<Json<CreateOrderRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(payload) = payload?;
    let fields = validate_checkout(
        &payload.payment_method,
        &payload.shipping_address,
        payload.notes.as_deref(),
    )?;

    let order = state
        .place_order
        .execute(PlaceOrderInput {
            user_id,
            payment_method: fields.payment_method,
            shipping_address: fields.shipping_address,
            notes: fields.notes,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(order)))
}

pub async fn update_order_status(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Path(order_id): Path<Uuid>,
    payload: Result<Json<UpdateStatusRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(payload) = payload?;
    let order = state
        .update_status
        .execute(order_id, user_id, &payload.status)
        .await?;
    Ok(Json(order))
}

pub async fn update_payment_status(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Path(order_id): Path<Uuid>,
    payload: Result<Json<UpdatePaymentRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(payload) = payload?;
    let order = state
        .reconcile_payment
        .execute(order_id, user_id, &payload.payment_status)
        .await?;
    Ok(Json(order))
}
