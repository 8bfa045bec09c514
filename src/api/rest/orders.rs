use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, patch, post};
use axum::Json;
use axum::Router;
use chrono::Utc;
use serde::Deserialize;

use crate::error::AppError;
use crate::geo::GeoPoint;
use crate::models::order::{Order, OrderStatus};
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/orders", post(create_order))
        .route("/orders/customer/:customer_id", get(list_by_customer))
        .route("/orders/:order_id", get(get_order))
        .route("/orders/:order_id/status", patch(update_order_status))
}

#[derive(Deserialize)]
pub struct CreateOrderRequest {
    pub order_id: String,
    pub customer_id: String,
    pub customer_name: String,
    pub customer_contact: String,
    pub customer_coordinate: Vec<f64>,
    #[serde(default)]
    pub customer_location: Option<String>,
    pub shop_id: String,
    pub shop_name: String,
    pub shop_contact: String,
    pub shop_location: Vec<f64>,
    #[serde(default)]
    pub shop_location_text: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Deserialize)]
pub struct UpdateOrderStatusRequest {
    pub status: String,
}

async fn create_order(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateOrderRequest>,
) -> Result<(StatusCode, Json<Order>), AppError> {
    if payload.order_id.trim().is_empty() {
        return Err(AppError::BadRequest("order_id is required".to_string()));
    }
    if GeoPoint::from_pair(&payload.customer_coordinate).is_none()
        || GeoPoint::from_pair(&payload.shop_location).is_none()
    {
        return Err(AppError::BadRequest(
            "location coordinates must be [longitude, latitude] pairs".to_string(),
        ));
    }

    let status = match &payload.status {
        Some(raw) => OrderStatus::parse(raw)
            .ok_or_else(|| AppError::BadRequest(format!("invalid status: {raw}")))?,
        None => OrderStatus::Pending,
    };

    let now = Utc::now();
    let order = Order {
        order_id: payload.order_id,
        customer_id: payload.customer_id,
        customer_name: payload.customer_name,
        customer_contact: payload.customer_contact,
        customer_coordinate: payload.customer_coordinate,
        customer_location: payload.customer_location,
        shop_id: payload.shop_id,
        shop_name: payload.shop_name,
        shop_contact: payload.shop_contact,
        shop_location: payload.shop_location,
        shop_location_text: payload.shop_location_text,
        status,
        created_at: now,
        updated_at: now,
    };

    if !state.orders.try_insert(order.clone()) {
        return Err(AppError::Conflict(format!(
            "an order with id {} already exists",
            order.order_id
        )));
    }

    Ok((StatusCode::CREATED, Json(order)))
}

async fn get_order(
    State(state): State<Arc<AppState>>,
    Path(order_id): Path<String>,
) -> Result<Json<Order>, AppError> {
    state
        .orders
        .find_by_id(&order_id)
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("order {order_id} not found")))
}

async fn update_order_status(
    State(state): State<Arc<AppState>>,
    Path(order_id): Path<String>,
    Json(payload): Json<UpdateOrderStatusRequest>,
) -> Result<Json<Order>, AppError> {
    let status = OrderStatus::parse(&payload.status)
        .ok_or_else(|| AppError::BadRequest(format!("invalid status: {}", payload.status)))?;

    let mut order = state
        .orders
        .find_by_id(&order_id)
        .ok_or_else(|| AppError::NotFound(format!("order {order_id} not found")))?;

    order.status = status;
    let order = state.orders.save(order);

    Ok(Json(order))
}

async fn list_by_customer(
    State(state): State<Arc<AppState>>,
    Path(customer_id): Path<String>,
) -> Json<Vec<Order>> {
    Json(state.orders.find_by_customer(&customer_id))
}
