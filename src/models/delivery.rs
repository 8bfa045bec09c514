use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::driver::Driver;
use crate::models::order::Order;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DeliveryStatus {
    Assigned,
    PickedUp,
    InTransit,
    Delivered,
    Failed,
    Cancelled,
}

impl DeliveryStatus {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "ASSIGNED" => Some(Self::Assigned),
            "PICKED_UP" => Some(Self::PickedUp),
            "IN_TRANSIT" => Some(Self::InTransit),
            "DELIVERED" => Some(Self::Delivered),
            "FAILED" => Some(Self::Failed),
            "CANCELLED" => Some(Self::Cancelled),
            _ => None,
        }
    }
}

impl std::fmt::Display for DeliveryStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Assigned => "ASSIGNED",
            Self::PickedUp => "PICKED_UP",
            Self::InTransit => "IN_TRANSIT",
            Self::Delivered => "DELIVERED",
            Self::Failed => "FAILED",
            Self::Cancelled => "CANCELLED",
        };
        f.write_str(s)
    }
}

/// Legality of a status change, answered in one place. Forward moves may
/// skip intermediate states; FAILED and CANCELLED are reachable from any
/// active state; DELIVERED, FAILED and CANCELLED absorb everything.
pub fn transition_allowed(from: DeliveryStatus, to: DeliveryStatus) -> bool {
    use DeliveryStatus::*;

    match (from, to) {
        (Delivered | Failed | Cancelled, _) => false,
        (_, Failed | Cancelled) => true,
        (Assigned, PickedUp | InTransit | Delivered) => true,
        (PickedUp, InTransit | Delivered) => true,
        (InTransit, Delivered) => true,
        _ => false,
    }
}

/// Customer details copied from the order when the delivery is created.
/// Snapshots do not track later changes to the source records.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomerSnapshot {
    pub id: String,
    pub name: String,
    pub contact: String,
    pub coordinate: Vec<f64>,
    pub location_text: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShopSnapshot {
    pub id: String,
    pub name: String,
    pub contact: String,
    pub coordinate: Vec<f64>,
    pub location_text: Option<String>,
}

/// Driver details copied at assignment time. `location` is the one snapshot
/// field with a dedicated update operation; it is not synced with the
/// driver directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DriverSnapshot {
    pub id: String,
    pub name: String,
    pub location: Vec<f64>,
    pub location_text: Option<String>,
}

/// The join record tracking fulfillment of one order by one driver.
/// At most one delivery exists per order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Delivery {
    pub id: Uuid,
    pub order_id: String,
    pub customer: CustomerSnapshot,
    pub shop: ShopSnapshot,
    pub driver: DriverSnapshot,
    pub status: DeliveryStatus,
    /// Kilometers from driver to shop at assignment time, two decimals.
    /// Absent on manually assigned deliveries, which skip the distance
    /// computation.
    pub distance_to_shop: Option<f64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Delivery {
    /// Builds a freshly assigned delivery from order and driver snapshots.
    pub fn assigned(order: &Order, driver: &Driver, distance_to_shop: Option<f64>) -> Self {
        let now = Utc::now();

        Self {
            id: Uuid::new_v4(),
            order_id: order.order_id.clone(),
            customer: CustomerSnapshot {
                id: order.customer_id.clone(),
                name: order.customer_name.clone(),
                contact: order.customer_contact.clone(),
                coordinate: order.customer_coordinate.clone(),
                location_text: order.customer_location.clone(),
            },
            shop: ShopSnapshot {
                id: order.shop_id.clone(),
                name: order.shop_name.clone(),
                contact: order.shop_contact.clone(),
                coordinate: order.shop_location.clone(),
                location_text: order.shop_location_text.clone(),
            },
            driver: DriverSnapshot {
                id: driver.id.clone(),
                name: driver.full_name(),
                location: driver.coordinates().cloned().unwrap_or_default(),
                location_text: driver.current_location_text.clone(),
            },
            status: DeliveryStatus::Assigned,
            distance_to_shop,
            created_at: now,
            updated_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::transition_allowed;
    use super::DeliveryStatus::{self, *};

    #[test]
    fn happy_path_moves_forward() {
        assert!(transition_allowed(Assigned, PickedUp));
        assert!(transition_allowed(PickedUp, InTransit));
        assert!(transition_allowed(InTransit, Delivered));
    }

    #[test]
    fn forward_moves_may_skip_states() {
        assert!(transition_allowed(Assigned, InTransit));
        assert!(transition_allowed(Assigned, Delivered));
        assert!(transition_allowed(PickedUp, Delivered));
    }

    #[test]
    fn active_states_may_abort() {
        for from in [Assigned, PickedUp, InTransit] {
            assert!(transition_allowed(from, Failed));
            assert!(transition_allowed(from, Cancelled));
        }
    }

    #[test]
    fn no_backward_moves() {
        assert!(!transition_allowed(PickedUp, Assigned));
        assert!(!transition_allowed(InTransit, PickedUp));
        assert!(!transition_allowed(Delivered, InTransit));
    }

    #[test]
    fn terminal_states_absorb_everything() {
        for from in [Delivered, Failed, Cancelled] {
            for to in [Assigned, PickedUp, InTransit, Delivered, Failed, Cancelled] {
                assert!(!transition_allowed(from, to));
            }
        }
    }

    #[test]
    fn same_state_is_not_a_transition() {
        assert!(!transition_allowed(Assigned, Assigned));
        assert!(!transition_allowed(InTransit, InTransit));
    }

    #[test]
    fn parse_round_trips_every_status() {
        for raw in [
            "ASSIGNED",
            "PICKED_UP",
            "IN_TRANSIT",
            "DELIVERED",
            "FAILED",
            "CANCELLED",
        ] {
            let status = DeliveryStatus::parse(raw).unwrap();
            assert_eq!(status.to_string(), raw);
        }
        assert!(DeliveryStatus::parse("EN_ROUTE").is_none());
    }
}
