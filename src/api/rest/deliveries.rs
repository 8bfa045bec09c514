use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, patch, post};
use axum::Json;
use axum::Router;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{info, warn};
use uuid::Uuid;

use crate::engine::assignment::{assign_first_available, run_assignment_pass, PassSummary};
use crate::error::AppError;
use crate::geo::GeoPoint;
use crate::models::delivery::{Delivery, DeliveryStatus};
use crate::models::order::OrderStatus;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/delivery/assign-driver", post(assign_driver))
        .route("/delivery/assign-ready-orders", post(assign_ready_orders))
        .route("/delivery/all", get(list_all))
        .route("/delivery/:id", get(get_delivery))
        .route("/delivery/:id/status", patch(update_status))
        .route("/delivery/:id/driver-location", patch(update_driver_location))
        .route("/delivery/order/:order_id", get(get_by_order))
        .route("/delivery/driver/:driver_id", get(list_by_driver))
        .route("/delivery/shop/:shop_id", get(list_by_shop))
        .route("/delivery/customer/:customer_id", get(list_by_customer))
}

#[derive(Deserialize)]
pub struct AssignDriverRequest {
    pub order_id: String,
}

#[derive(Deserialize)]
pub struct UpdateStatusRequest {
    pub status: String,
}

#[derive(Deserialize)]
pub struct UpdateDriverLocationRequest {
    pub location: Vec<f64>,
    #[serde(default)]
    pub location_text: Option<String>,
}

async fn assign_driver(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<AssignDriverRequest>,
) -> Result<(StatusCode, Json<Delivery>), AppError> {
    if payload.order_id.trim().is_empty() {
        return Err(AppError::BadRequest("order_id is required".to_string()));
    }

    let delivery = assign_first_available(&state, &payload.order_id).await?;
    Ok((StatusCode::CREATED, Json(delivery)))
}

async fn assign_ready_orders(State(state): State<Arc<AppState>>) -> Json<PassSummary> {
    Json(run_assignment_pass(&state).await)
}

async fn list_all(State(state): State<Arc<AppState>>) -> Json<Vec<Delivery>> {
    Json(state.deliveries.list_all())
}

/// Delivery plus a best-effort driver detail lookup. When the directory
/// cannot be reached the snapshot identity is returned instead.
async fn get_delivery(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let delivery = state
        .deliveries
        .get(&id)
        .ok_or_else(|| AppError::NotFound(format!("delivery {id} not found")))?;

    let driver = match state.driver_directory.get_driver(&delivery.driver.id).await {
        Ok(driver) => json!(driver),
        Err(err) => {
            warn!(driver_id = %delivery.driver.id, error = %err, "driver detail lookup failed");
            json!({ "id": delivery.driver.id.clone(), "name": delivery.driver.name.clone() })
        }
    };

    Ok(Json(json!({ "delivery": delivery, "driver": driver })))
}

async fn get_by_order(
    State(state): State<Arc<AppState>>,
    Path(order_id): Path<String>,
) -> Result<Json<Delivery>, AppError> {
    state
        .deliveries
        .find_by_order(&order_id)
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("no delivery found for order {order_id}")))
}

async fn list_by_driver(
    State(state): State<Arc<AppState>>,
    Path(driver_id): Path<String>,
) -> Json<Vec<Delivery>> {
    Json(state.deliveries.list_by_driver(&driver_id))
}

async fn list_by_shop(
    State(state): State<Arc<AppState>>,
    Path(shop_id): Path<String>,
) -> Json<Vec<Delivery>> {
    Json(state.deliveries.list_by_shop(&shop_id))
}

async fn list_by_customer(
    State(state): State<Arc<AppState>>,
    Path(customer_id): Path<String>,
) -> Json<Vec<Delivery>> {
    Json(state.deliveries.list_by_customer(&customer_id))
}

/// Outcome of the secondary effect a status change triggers. The primary
/// mutation has already committed by the time this is produced; the
/// handler only logs it.
enum SecondaryEffect {
    None,
    OrderMarkedDelivered,
    OrderMissing,
    DriverReleased,
    DriverReleaseFailed(String),
}

async fn apply_status_side_effects(state: &AppState, delivery: &Delivery) -> SecondaryEffect {
    match delivery.status {
        DeliveryStatus::Delivered => match state.orders.find_by_id(&delivery.order_id) {
            Some(mut order) => {
                order.status = OrderStatus::Delivered;
                state.orders.save(order);
                SecondaryEffect::OrderMarkedDelivered
            }
            None => SecondaryEffect::OrderMissing,
        },
        DeliveryStatus::Failed | DeliveryStatus::Cancelled => {
            match state
                .driver_directory
                .set_availability(&delivery.driver.id, true)
                .await
            {
                Ok(()) => SecondaryEffect::DriverReleased,
                Err(err) => {
                    state.metrics.driver_directory_errors_total.inc();
                    SecondaryEffect::DriverReleaseFailed(err.to_string())
                }
            }
        }
        _ => SecondaryEffect::None,
    }
}

async fn update_status(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateStatusRequest>,
) -> Result<Json<Delivery>, AppError> {
    let status = DeliveryStatus::parse(&payload.status)
        .ok_or_else(|| AppError::BadRequest(format!("invalid status: {}", payload.status)))?;

    let delivery = match state.deliveries.transition(&id, status) {
        None => return Err(AppError::NotFound(format!("delivery {id} not found"))),
        Some(Err(current)) => {
            return Err(AppError::BadRequest(format!(
                "illegal status transition {current} -> {status}"
            )))
        }
        Some(Ok(delivery)) => delivery,
    };

    match apply_status_side_effects(&state, &delivery).await {
        SecondaryEffect::None => {}
        SecondaryEffect::OrderMarkedDelivered => {
            info!(order_id = %delivery.order_id, "order marked as delivered");
        }
        SecondaryEffect::OrderMissing => {
            warn!(order_id = %delivery.order_id, "order missing during delivered propagation");
        }
        SecondaryEffect::DriverReleased => {
            info!(driver_id = %delivery.driver.id, "driver released back to pool");
        }
        SecondaryEffect::DriverReleaseFailed(err) => {
            warn!(
                driver_id = %delivery.driver.id,
                error = %err,
                "driver release failed; delivery status change stands"
            );
        }
    }

    Ok(Json(delivery))
}

async fn update_driver_location(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateDriverLocationRequest>,
) -> Result<Json<Delivery>, AppError> {
    if GeoPoint::from_pair(&payload.location).is_none() {
        return Err(AppError::BadRequest(
            "invalid location format, expected a [longitude, latitude] pair".to_string(),
        ));
    }

    state
        .deliveries
        .update_driver_location(&id, payload.location, payload.location_text)
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("delivery {id} not found")))
}
