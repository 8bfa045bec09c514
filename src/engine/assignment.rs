//! Driver-to-order assignment. Two deliberately distinct paths: the batch
//! pass matches each ready order to the nearest available driver, while the
//! manual path takes the first available driver with no distance
//! computation. The manual path is an operator fallback, not a bug.

use std::collections::HashSet;
use std::time::Instant;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::clients::driver_directory::DriverFilter;
use crate::error::AppError;
use crate::geo::{haversine_km, round_km, GeoPoint};
use crate::models::delivery::Delivery;
use crate::models::driver::Driver;
use crate::models::order::{Order, OrderStatus};
use crate::state::AppState;

/// Outcome of one batch assignment pass. Always a success shape; "nothing
/// to do" and "no drivers" are distinguished by the message, not an error.
#[derive(Debug, Clone, Serialize)]
pub struct PassSummary {
    pub assigned: usize,
    pub message: String,
}

/// Runs one batch assignment pass over all currently ready orders.
///
/// Per-order failures are contained: a problem with one order is logged
/// and the rest of the pass continues. A delivery is created and the order
/// marked ACCEPTED before the driver availability update is attempted, so
/// the worst inconsistency a crashed or failed secondary call can leave is
/// a driver that looks available while holding a delivery.
pub async fn run_assignment_pass(state: &AppState) -> PassSummary {
    let start = Instant::now();

    let ready = state.orders.find_by_status(OrderStatus::ReadyForPickup);
    if ready.is_empty() {
        debug!("no orders ready for pickup");
        return finish_pass(state, start, "idle", 0, "No orders ready for pickup".to_string());
    }
    info!(count = ready.len(), "found orders ready for pickup");

    let drivers = match state
        .driver_directory
        .list_available(&DriverFilter::default())
        .await
    {
        Ok(drivers) => drivers,
        Err(err) => {
            warn!(error = %err, "driver directory listing failed; treating as no available drivers");
            state.metrics.driver_directory_errors_total.inc();
            Vec::new()
        }
    };
    if drivers.is_empty() {
        info!("no available drivers found");
        return finish_pass(
            state,
            start,
            "no_drivers",
            0,
            "No available drivers found".to_string(),
        );
    }
    info!(count = drivers.len(), "found available drivers");

    // Drivers consumed by this pass only; not persisted between passes.
    let mut assigned_driver_ids: HashSet<String> = HashSet::new();
    let mut assigned = 0;

    for order in &ready {
        if assign_order(state, order, &drivers, &mut assigned_driver_ids).await {
            assigned += 1;
        }
    }

    info!(assigned, "assignment pass complete");
    let message = format!("Successfully assigned {assigned} orders to drivers");
    finish_pass(state, start, "assigned", assigned, message)
}

fn finish_pass(
    state: &AppState,
    start: Instant,
    outcome: &str,
    assigned: usize,
    message: String,
) -> PassSummary {
    state
        .metrics
        .assignment_pass_duration_seconds
        .observe(start.elapsed().as_secs_f64());
    state
        .metrics
        .assignment_passes_total
        .with_label_values(&[outcome])
        .inc();
    state
        .metrics
        .deliveries_assigned_total
        .inc_by(assigned as u64);

    PassSummary { assigned, message }
}

/// Attempts to assign one order. Returns true when a delivery was created.
/// Skips (false) are normal: already assigned, bad coordinates, or no
/// eligible driver left in this pass.
async fn assign_order(
    state: &AppState,
    order: &Order,
    drivers: &[Driver],
    assigned_driver_ids: &mut HashSet<String>,
) -> bool {
    if state.deliveries.find_by_order(&order.order_id).is_some() {
        debug!(order_id = %order.order_id, "order already assigned to a driver");
        return false;
    }

    let Some(shop) = GeoPoint::from_pair(&order.shop_location) else {
        warn!(order_id = %order.order_id, "invalid shop location; skipping order");
        return false;
    };

    // Strictly-less-than comparison: the first driver encountered at the
    // minimum distance wins ties.
    let mut nearest: Option<(&Driver, f64)> = None;
    for driver in drivers {
        if assigned_driver_ids.contains(&driver.id) {
            continue;
        }
        let Some(location) = driver.location() else {
            debug!(driver_id = %driver.id, "driver has no usable location; skipping");
            continue;
        };

        let distance = haversine_km(&shop, &location);
        if nearest.map_or(true, |(_, min)| distance < min) {
            nearest = Some((driver, distance));
        }
    }

    let Some((driver, distance)) = nearest else {
        info!(order_id = %order.order_id, "no unassigned driver available for order");
        return false;
    };

    assigned_driver_ids.insert(driver.id.clone());

    let delivery = Delivery::assigned(order, driver, Some(round_km(distance)));
    if !state.deliveries.try_insert(delivery) {
        // Lost a race with a concurrent pass. The driver was not consumed,
        // so a later order in this pass may still take them.
        debug!(order_id = %order.order_id, "delivery appeared concurrently; skipping");
        assigned_driver_ids.remove(&driver.id);
        return false;
    }

    let mut accepted = order.clone();
    accepted.status = OrderStatus::Accepted;
    state.orders.save(accepted);

    if let Err(err) = state.driver_directory.set_availability(&driver.id, false).await {
        // Logged and swallowed: the delivery and order update stand.
        warn!(
            driver_id = %driver.id,
            error = %err,
            "driver availability update failed; delivery stands"
        );
        state.metrics.driver_directory_errors_total.inc();
    }

    info!(
        order_id = %order.order_id,
        driver_id = %driver.id,
        distance_km = round_km(distance),
        "order assigned"
    );
    true
}

/// Manual single-order assignment: first available driver, no proximity
/// matching.
pub async fn assign_first_available(state: &AppState, order_id: &str) -> Result<Delivery, AppError> {
    let order = state
        .orders
        .find_by_id(order_id)
        .ok_or_else(|| AppError::NotFound(format!("order {order_id} not found")))?;

    if state.deliveries.find_by_order(order_id).is_some() {
        return Err(AppError::Conflict(format!(
            "order {order_id} is already assigned to a driver"
        )));
    }

    let drivers = match state
        .driver_directory
        .list_available(&DriverFilter::default())
        .await
    {
        Ok(drivers) => drivers,
        Err(err) => {
            warn!(error = %err, "driver directory listing failed");
            state.metrics.driver_directory_errors_total.inc();
            Vec::new()
        }
    };
    let Some(driver) = drivers.first() else {
        return Err(AppError::NotFound("no available drivers found".to_string()));
    };

    let delivery = Delivery::assigned(&order, driver, None);
    if !state.deliveries.try_insert(delivery.clone()) {
        return Err(AppError::Conflict(format!(
            "order {order_id} is already assigned to a driver"
        )));
    }

    let mut accepted = order;
    accepted.status = OrderStatus::Accepted;
    state.orders.save(accepted);

    if let Err(err) = state.driver_directory.set_availability(&driver.id, false).await {
        warn!(
            driver_id = %driver.id,
            error = %err,
            "driver availability update failed; delivery stands"
        );
        state.metrics.driver_directory_errors_total.inc();
    }

    info!(order_id = %order_id, driver_id = %driver.id, "order manually assigned");
    Ok(delivery)
}
