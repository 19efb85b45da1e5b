use tokio::sync::RwLock;

use crate::engine::route::ServiceTimes;
use crate::events::EventBus;
use crate::observability::metrics::Metrics;
use crate::store::Fleet;

pub struct AppState {
    /// One lock over the whole fleet: choosing a buggy and mutating its queue
    /// happen under the same write guard.
    pub fleet: RwLock<Fleet>,
    pub events: EventBus,
    pub metrics: Metrics,
    pub service_times: ServiceTimes,
}

impl AppState {
    pub fn new(event_buffer_size: usize, service_times: ServiceTimes) -> Self {
        Self::with_fleet(Fleet::new(), event_buffer_size, service_times)
    }

    pub fn with_fleet(fleet: Fleet, event_buffer_size: usize, service_times: ServiceTimes) -> Self {
        Self {
            fleet: RwLock::new(fleet),
            events: EventBus::new(event_buffer_size),
            metrics: Metrics::new(),
            service_times,
        }
    }
}
