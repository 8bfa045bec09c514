use chrono::Utc;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use uuid::Uuid;

use crate::models::delivery::{transition_allowed, Delivery, DeliveryStatus};
use crate::models::order::{Order, OrderStatus};

/// Logical order store keyed by the externally assigned order id.
#[derive(Default)]
pub struct OrderStore {
    orders: DashMap<String, Order>,
}

impl OrderStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn find_by_id(&self, order_id: &str) -> Option<Order> {
        self.orders.get(order_id).map(|entry| entry.value().clone())
    }

    /// Orders in the given status, oldest first. FIFO keeps assignment
    /// passes deterministic and fair.
    pub fn find_by_status(&self, status: OrderStatus) -> Vec<Order> {
        let mut matches: Vec<Order> = self
            .orders
            .iter()
            .filter(|entry| entry.value().status == status)
            .map(|entry| entry.value().clone())
            .collect();
        matches.sort_by_key(|order| order.created_at);
        matches
    }

    pub fn find_by_customer(&self, customer_id: &str) -> Vec<Order> {
        self.orders
            .iter()
            .filter(|entry| entry.value().customer_id == customer_id)
            .map(|entry| entry.value().clone())
            .collect()
    }

    /// Inserts a new order. Returns false when the order id is taken.
    pub fn try_insert(&self, order: Order) -> bool {
        match self.orders.entry(order.order_id.clone()) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(order);
                true
            }
        }
    }

    /// Upserts an order, refreshing its `updated_at`. Returns the record
    /// as stored.
    pub fn save(&self, mut order: Order) -> Order {
        order.updated_at = Utc::now();
        self.orders.insert(order.order_id.clone(), order.clone());
        order
    }

    pub fn len(&self) -> usize {
        self.orders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }
}

/// Delivery store with a unique index on order id: at most one delivery
/// ever exists per order, even across racing assignment passes.
#[derive(Default)]
pub struct DeliveryStore {
    by_id: DashMap<Uuid, Delivery>,
    order_index: DashMap<String, Uuid>,
}

impl DeliveryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Atomically inserts unless a delivery already exists for the order.
    /// Returns false on conflict; the caller treats that as "already
    /// assigned", not as an error.
    pub fn try_insert(&self, delivery: Delivery) -> bool {
        match self.order_index.entry(delivery.order_id.clone()) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(delivery.id);
                self.by_id.insert(delivery.id, delivery);
                true
            }
        }
    }

    pub fn get(&self, id: &Uuid) -> Option<Delivery> {
        self.by_id.get(id).map(|entry| entry.value().clone())
    }

    pub fn find_by_order(&self, order_id: &str) -> Option<Delivery> {
        let delivery_id = *self.order_index.get(order_id)?;
        self.get(&delivery_id)
    }

    pub fn list_all(&self) -> Vec<Delivery> {
        self.by_id
            .iter()
            .map(|entry| entry.value().clone())
            .collect()
    }

    pub fn list_by_driver(&self, driver_id: &str) -> Vec<Delivery> {
        self.by_id
            .iter()
            .filter(|entry| entry.value().driver.id == driver_id)
            .map(|entry| entry.value().clone())
            .collect()
    }

    pub fn list_by_shop(&self, shop_id: &str) -> Vec<Delivery> {
        self.by_id
            .iter()
            .filter(|entry| entry.value().shop.id == shop_id)
            .map(|entry| entry.value().clone())
            .collect()
    }

    pub fn list_by_customer(&self, customer_id: &str) -> Vec<Delivery> {
        self.by_id
            .iter()
            .filter(|entry| entry.value().customer.id == customer_id)
            .map(|entry| entry.value().clone())
            .collect()
    }

    /// Applies a status change if the transition table allows it. Outer
    /// `None`: unknown delivery. Inner `Err`: the current status that
    /// rejected the change, with the record untouched.
    pub fn transition(
        &self,
        id: &Uuid,
        to: DeliveryStatus,
    ) -> Option<Result<Delivery, DeliveryStatus>> {
        let mut entry = self.by_id.get_mut(id)?;
        if !transition_allowed(entry.status, to) {
            return Some(Err(entry.status));
        }
        entry.status = to;
        entry.updated_at = Utc::now();
        Some(Ok(entry.clone()))
    }

    /// Overwrites the stored driver location snapshot. Independent of the
    /// driver's own location in the directory.
    pub fn update_driver_location(
        &self,
        id: &Uuid,
        location: Vec<f64>,
        location_text: Option<String>,
    ) -> Option<Delivery> {
        let mut entry = self.by_id.get_mut(id)?;
        entry.driver.location = location;
        if let Some(text) = location_text {
            entry.driver.location_text = Some(text);
        }
        entry.updated_at = Utc::now();
        Some(entry.clone())
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use uuid::Uuid;

    use super::{DeliveryStore, OrderStore};
    use crate::models::delivery::{
        CustomerSnapshot, Delivery, DeliveryStatus, DriverSnapshot, ShopSnapshot,
    };
    use crate::models::order::{Order, OrderStatus};

    fn order(order_id: &str, status: OrderStatus) -> Order {
        let now = Utc::now();
        Order {
            order_id: order_id.to_string(),
            customer_id: "c1".to_string(),
            customer_name: "Asha".to_string(),
            customer_contact: "+94-77-000".to_string(),
            customer_coordinate: vec![79.85, 6.90],
            customer_location: None,
            shop_id: "s1".to_string(),
            shop_name: "Spice Hut".to_string(),
            shop_contact: "+94-11-000".to_string(),
            shop_location: vec![79.86, 6.92],
            shop_location_text: None,
            status,
            created_at: now,
            updated_at: now,
        }
    }

    fn delivery(order_id: &str) -> Delivery {
        let now = Utc::now();
        Delivery {
            id: Uuid::new_v4(),
            order_id: order_id.to_string(),
            customer: CustomerSnapshot {
                id: "c1".to_string(),
                name: "Asha".to_string(),
                contact: "+94-77-000".to_string(),
                coordinate: vec![79.85, 6.90],
                location_text: None,
            },
            shop: ShopSnapshot {
                id: "s1".to_string(),
                name: "Spice Hut".to_string(),
                contact: "+94-11-000".to_string(),
                coordinate: vec![79.86, 6.92],
                location_text: None,
            },
            driver: DriverSnapshot {
                id: "d1".to_string(),
                name: "Nimal Perera".to_string(),
                location: vec![79.86, 6.93],
                location_text: None,
            },
            status: DeliveryStatus::Assigned,
            distance_to_shop: Some(1.11),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn at_most_one_delivery_per_order() {
        let store = DeliveryStore::new();
        assert!(store.try_insert(delivery("o1")));
        assert!(!store.try_insert(delivery("o1")));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn find_by_order_resolves_through_the_index() {
        let store = DeliveryStore::new();
        let d = delivery("o1");
        let id = d.id;
        store.try_insert(d);

        assert_eq!(store.find_by_order("o1").unwrap().id, id);
        assert!(store.find_by_order("o2").is_none());
    }

    #[test]
    fn illegal_transition_leaves_the_record_untouched() {
        let store = DeliveryStore::new();
        let d = delivery("o1");
        let id = d.id;
        store.try_insert(d);

        store.transition(&id, DeliveryStatus::Delivered).unwrap().unwrap();
        let rejected = store
            .transition(&id, DeliveryStatus::PickedUp)
            .unwrap()
            .unwrap_err();
        assert_eq!(rejected, DeliveryStatus::Delivered);
        assert_eq!(store.get(&id).unwrap().status, DeliveryStatus::Delivered);
    }

    #[test]
    fn ready_orders_come_back_oldest_first() {
        let store = OrderStore::new();
        let mut first = order("o1", OrderStatus::ReadyForPickup);
        first.created_at = Utc::now() - chrono::Duration::minutes(5);
        let second = order("o2", OrderStatus::ReadyForPickup);
        let other = order("o3", OrderStatus::Pending);

        assert!(store.try_insert(second));
        assert!(store.try_insert(first));
        assert!(store.try_insert(other));

        let ready = store.find_by_status(OrderStatus::ReadyForPickup);
        let ids: Vec<&str> = ready.iter().map(|o| o.order_id.as_str()).collect();
        assert_eq!(ids, ["o1", "o2"]);
    }

    #[test]
    fn duplicate_order_ids_are_rejected() {
        let store = OrderStore::new();
        assert!(store.try_insert(order("o1", OrderStatus::Pending)));
        assert!(!store.try_insert(order("o1", OrderStatus::Pending)));
    }
}
