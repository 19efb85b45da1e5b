use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::AppError;
use crate::graph::PoiGraph;
use crate::models::buggy::Buggy;
use crate::models::ride::RideRequest;
use crate::models::stop::{Stop, StopStatus, StopType};
use crate::models::{BuggyId, PoiId, StopId};

/// Dwell time charged for every stop a buggy still has to serve.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServiceTimes {
    pub pickup_s: u32,
    pub dropoff_s: u32,
}

impl ServiceTimes {
    pub const DEFAULT_PICKUP_S: u32 = 25;
    pub const DEFAULT_DROPOFF_S: u32 = 25;

    pub fn for_stop(&self, stop_type: StopType) -> u32 {
        match stop_type {
            StopType::Pickup => self.pickup_s,
            StopType::Dropoff => self.dropoff_s,
        }
    }
}

impl Default for ServiceTimes {
    fn default() -> Self {
        Self {
            pickup_s: Self::DEFAULT_PICKUP_S,
            dropoff_s: Self::DEFAULT_DROPOFF_S,
        }
    }
}

/// Outcome of simulating a ride appended to the tail of a queue.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct AppendEstimate {
    pub pickup_eta_s: u64,
    pub total_route_s: u64,
    /// Guests on board right before the new pickup boards.
    pub onboard_at_pickup: u32,
}

/// All stops ever planned for one buggy, ordered by `sequence_index`.
///
/// Completed stops stay in the queue for auditing; only pending ones count
/// towards ETAs.
#[derive(Debug, Clone)]
pub struct RouteQueue {
    buggy_id: BuggyId,
    stops: Vec<Stop>,
}

impl RouteQueue {
    pub fn new(buggy_id: BuggyId) -> Self {
        Self {
            buggy_id,
            stops: Vec::new(),
        }
    }

    pub fn stops(&self) -> &[Stop] {
        &self.stops
    }

    pub fn pending(&self) -> impl Iterator<Item = &Stop> {
        self.stops.iter().filter(|stop| stop.is_pending())
    }

    pub fn has_pending(&self) -> bool {
        self.pending().next().is_some()
    }

    pub fn get(&self, stop_id: StopId) -> Option<&Stop> {
        self.stops.iter().find(|stop| stop.id == stop_id)
    }

    pub(crate) fn get_mut(&mut self, stop_id: StopId) -> Option<&mut Stop> {
        self.stops.iter_mut().find(|stop| stop.id == stop_id)
    }

    /// The only stop a driver may start or complete.
    pub fn next_actionable_stop(&self) -> Option<&Stop> {
        self.pending().next()
    }

    /// Seconds until the buggy could reach `pickup` after serving every pending
    /// stop. A buggy with no known position is assumed to start at `pickup`.
    pub fn eta_to_appended_pickup(
        &self,
        buggy: &Buggy,
        pickup: PoiId,
        graph: &PoiGraph,
        service: &ServiceTimes,
    ) -> Result<u64, AppError> {
        let mut position = buggy.current_poi.unwrap_or(pickup);
        let mut elapsed_s = 0u64;

        for stop in self.pending() {
            elapsed_s += graph.travel_time(position, stop.poi)?;
            elapsed_s += u64::from(service.for_stop(stop.stop_type));
            position = stop.poi;
        }

        Ok(elapsed_s + graph.travel_time(position, pickup)?)
    }

    /// Guests aboard once every pending stop has been served.
    pub fn projected_onboard(&self, buggy: &Buggy) -> u32 {
        self.pending()
            .fold(buggy.current_onboard_guests, |onboard, stop| match stop.stop_type {
                StopType::Pickup => onboard + stop.num_guests,
                StopType::Dropoff => onboard.saturating_sub(stop.num_guests),
            })
    }

    pub fn estimate_append(
        &self,
        buggy: &Buggy,
        pickup: PoiId,
        dropoff: PoiId,
        graph: &PoiGraph,
        service: &ServiceTimes,
    ) -> Result<AppendEstimate, AppError> {
        let pickup_eta_s = self.eta_to_appended_pickup(buggy, pickup, graph, service)?;
        let total_route_s = pickup_eta_s
            + u64::from(service.pickup_s)
            + graph.travel_time(pickup, dropoff)?
            + u64::from(service.dropoff_s);

        Ok(AppendEstimate {
            pickup_eta_s,
            total_route_s,
            onboard_at_pickup: self.projected_onboard(buggy),
        })
    }

    /// Appends the ride's pickup and dropoff after every existing stop.
    pub fn append_ride(
        &mut self,
        ride: &RideRequest,
        stop_ids: [StopId; 2],
        now: DateTime<Utc>,
    ) -> [StopId; 2] {
        let first_index = self
            .stops
            .last()
            .map(|stop| stop.sequence_index + 1)
            .unwrap_or(0);

        let [pickup_id, dropoff_id] = stop_ids;
        let legs = [
            (pickup_id, StopType::Pickup, ride.pickup_poi),
            (dropoff_id, StopType::Dropoff, ride.dropoff_poi),
        ];

        for (offset, (id, stop_type, poi)) in (0u32..).zip(legs) {
            self.stops.push(Stop {
                id,
                buggy_id: self.buggy_id,
                ride_id: ride.id,
                stop_type,
                poi,
                sequence_index: first_index + offset,
                status: StopStatus::Planned,
                num_guests: ride.num_guests,
                created_at: now,
                completed_at: None,
            });
        }

        stop_ids
    }
}
