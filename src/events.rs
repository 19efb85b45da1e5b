use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::debug;
use uuid::Uuid;

use crate::models::buggy::Buggy;
use crate::models::ride::{RideRequest, RideStatus};
use crate::models::stop::{Stop, StopStatus};
use crate::models::{BuggyId, DriverId, RideId, StopId};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    RideAssigned,
    StopStarted,
    StopCompleted,
    RideCompleted,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::RideAssigned => "ride_assigned",
            EventKind::StopStarted => "stop_started",
            EventKind::StopCompleted => "stop_completed",
            EventKind::RideCompleted => "ride_completed",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum EventStatus {
    Ride(RideStatus),
    Stop(StopStatus),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangeEvent {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub kind: EventKind,
    pub ride_id: RideId,
    pub ride_code: String,
    pub buggy_id: BuggyId,
    pub stop_id: Option<StopId>,
    pub status: EventStatus,
    pub driver_id: Option<DriverId>,
    pub emitted_at: DateTime<Utc>,
}

impl ChangeEvent {
    fn new(kind: EventKind, ride: &RideRequest, buggy: &Buggy, status: EventStatus) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            ride_id: ride.id,
            ride_code: ride.public_code.clone(),
            buggy_id: buggy.id,
            stop_id: None,
            status,
            driver_id: buggy.driver,
            emitted_at: Utc::now(),
        }
    }

    pub fn ride_assigned(ride: &RideRequest, buggy: &Buggy) -> Self {
        Self::new(
            EventKind::RideAssigned,
            ride,
            buggy,
            EventStatus::Ride(ride.status),
        )
    }

    pub fn ride_completed(ride: &RideRequest, buggy: &Buggy) -> Self {
        Self::new(
            EventKind::RideCompleted,
            ride,
            buggy,
            EventStatus::Ride(ride.status),
        )
    }

    pub fn stop_changed(kind: EventKind, stop: &Stop, ride: &RideRequest, buggy: &Buggy) -> Self {
        Self {
            stop_id: Some(stop.id),
            ..Self::new(kind, ride, buggy, EventStatus::Stop(stop.status))
        }
    }
}

/// Fan-out of change events to live views.
///
/// Dispatchers share one broadcast channel and see everything; each driver gets a
/// channel of their own carrying only events for the buggy they operate.
pub struct EventBus {
    dispatchers: broadcast::Sender<ChangeEvent>,
    drivers: DashMap<DriverId, broadcast::Sender<ChangeEvent>>,
    buffer_size: usize,
}

impl EventBus {
    pub fn new(buffer_size: usize) -> Self {
        let (dispatchers, _unused_rx) = broadcast::channel(buffer_size);
        Self {
            dispatchers,
            drivers: DashMap::new(),
            buffer_size,
        }
    }

    pub fn subscribe_dispatcher(&self) -> broadcast::Receiver<ChangeEvent> {
        self.dispatchers.subscribe()
    }

    pub fn subscribe_driver(&self, driver_id: DriverId) -> broadcast::Receiver<ChangeEvent> {
        self.drivers
            .entry(driver_id)
            .or_insert_with(|| broadcast::channel(self.buffer_size).0)
            .subscribe()
    }

    pub fn driver_channels(&self) -> usize {
        self.drivers.len()
    }

    pub fn publish(&self, event: ChangeEvent) {
        let _ = self.dispatchers.send(event.clone());

        let Some(driver_id) = event.driver_id else {
            return;
        };

        let abandoned = match self.drivers.get(&driver_id) {
            Some(tx) => tx.send(event).is_err(),
            None => false,
        };
        if abandoned {
            self.drivers
                .remove_if(&driver_id, |_, tx| tx.receiver_count() == 0);
            debug!(driver_id, "dropped driver channel without listeners");
        }
    }

    pub fn publish_all(&self, events: impl IntoIterator<Item = ChangeEvent>) {
        for event in events {
            self.publish(event);
        }
    }
}
