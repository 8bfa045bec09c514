use std::sync::Arc;

use crate::clients::driver_directory::DriverDirectory;
use crate::observability::metrics::Metrics;
use crate::store::{DeliveryStore, OrderStore};

pub struct AppState {
    pub orders: OrderStore,
    pub deliveries: DeliveryStore,
    pub driver_directory: Arc<dyn DriverDirectory>,
    pub metrics: Metrics,
}

impl AppState {
    pub fn new(driver_directory: Arc<dyn DriverDirectory>) -> Self {
        Self {
            orders: OrderStore::new(),
            deliveries: DeliveryStore::new(),
            driver_directory,
            metrics: Metrics::new(),
        }
    }
}
