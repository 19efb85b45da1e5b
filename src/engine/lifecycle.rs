use chrono::Utc;
use serde::Serialize;
use tracing::{error, info, warn};

use crate::error::AppError;
use crate::events::{ChangeEvent, EventKind};
use crate::models::buggy::Buggy;
use crate::models::ride::{RideRequest, RideStatus};
use crate::models::stop::{Stop, StopStatus, StopType};
use crate::models::{BuggyId, DriverId, StopId};
use crate::state::AppState;
use crate::store::Fleet;

/// Snapshot of everything a transition touched, taken after it was applied.
#[derive(Debug, Clone, Serialize)]
pub struct StopTransition {
    pub stop: Stop,
    pub ride: RideRequest,
    pub buggy: Buggy,
}

impl StopTransition {
    fn events(&self, kind: EventKind) -> Vec<ChangeEvent> {
        let mut events = vec![ChangeEvent::stop_changed(kind, &self.stop, &self.ride, &self.buggy)];
        if self.ride.status == RideStatus::Completed {
            events.push(ChangeEvent::ride_completed(&self.ride, &self.buggy));
        }
        events
    }
}

impl Fleet {
    fn stop_owner(&self, stop_id: StopId) -> Result<BuggyId, AppError> {
        self.stop_owners
            .get(&stop_id)
            .copied()
            .ok_or_else(|| AppError::NotFound(format!("stop {stop_id} not found")))
    }

    /// Rejects `action` unless the stop is in `expected` and is the lowest pending
    /// stop on its buggy.
    fn check_transition(
        &self,
        stop_id: StopId,
        expected: StopStatus,
        action: &'static str,
    ) -> Result<(BuggyId, Stop), AppError> {
        let buggy_id = self.stop_owner(stop_id)?;
        let route = self
            .routes
            .get(&buggy_id)
            .ok_or_else(|| AppError::Internal(format!("buggy {buggy_id} has no route queue")))?;
        let stop = route
            .get(stop_id)
            .ok_or_else(|| AppError::Internal(format!("stop {stop_id} missing from its route")))?;

        if stop.status != expected {
            return Err(AppError::InvalidTransition {
                stop_id,
                from: stop.status,
                action,
            });
        }

        let next = route.next_actionable_stop().map(|next| next.id);
        if next != Some(stop_id) {
            return Err(AppError::OutOfOrderStop { stop_id, next });
        }

        Ok((buggy_id, stop.clone()))
    }

    fn snapshot(&self, buggy_id: BuggyId, stop_id: StopId) -> Result<StopTransition, AppError> {
        let stop = self
            .stop(stop_id)
            .cloned()
            .ok_or_else(|| AppError::Internal(format!("stop {stop_id} vanished")))?;
        let ride = self
            .rides
            .get(&stop.ride_id)
            .cloned()
            .ok_or_else(|| AppError::Internal(format!("ride {} vanished", stop.ride_id)))?;
        let buggy = self
            .buggies
            .get(&buggy_id)
            .cloned()
            .ok_or_else(|| AppError::Internal(format!("buggy {buggy_id} vanished")))?;
        Ok(StopTransition { stop, ride, buggy })
    }

    /// PLANNED -> ON_ROUTE. Starting a pickup moves the ride to PICKING_UP.
    pub fn start_stop(&mut self, stop_id: StopId) -> Result<StopTransition, AppError> {
        let (buggy_id, stop) = self.check_transition(stop_id, StopStatus::Planned, "start")?;

        if let Some(route_stop) = self
            .routes
            .get_mut(&buggy_id)
            .and_then(|route| route.get_mut(stop_id))
        {
            route_stop.status = StopStatus::OnRoute;
        }
        if stop.stop_type == StopType::Pickup {
            if let Some(ride) = self.rides.get_mut(&stop.ride_id) {
                ride.status = RideStatus::PickingUp;
            }
        }

        self.snapshot(buggy_id, stop_id)
    }

    /// ON_ROUTE -> COMPLETED. Moves the buggy to the stop and boards or drops the
    /// stop's guests; a dropoff finishes the ride.
    pub fn complete_stop(&mut self, stop_id: StopId) -> Result<StopTransition, AppError> {
        let (buggy_id, stop) = self.check_transition(stop_id, StopStatus::OnRoute, "complete")?;

        let buggy = self
            .buggies
            .get(&buggy_id)
            .ok_or_else(|| AppError::Internal(format!("buggy {buggy_id} vanished")))?;
        let onboard = match stop.stop_type {
            StopType::Pickup => buggy.current_onboard_guests + stop.num_guests,
            StopType::Dropoff => buggy
                .current_onboard_guests
                .checked_sub(stop.num_guests)
                .ok_or_else(|| {
                    error!(
                        buggy_id,
                        stop_id,
                        onboard = buggy.current_onboard_guests,
                        dropping = stop.num_guests,
                        "dropoff would leave a negative guest count"
                    );
                    AppError::Internal(format!(
                        "buggy {buggy_id} has fewer guests aboard than stop {stop_id} drops off"
                    ))
                })?,
        };
        if !self.rides.contains_key(&stop.ride_id) {
            return Err(AppError::Internal(format!("ride {} vanished", stop.ride_id)));
        }

        let now = Utc::now();
        if let Some(route_stop) = self
            .routes
            .get_mut(&buggy_id)
            .and_then(|route| route.get_mut(stop_id))
        {
            route_stop.status = StopStatus::Completed;
            route_stop.completed_at = Some(now);
        }
        if let Some(buggy) = self.buggies.get_mut(&buggy_id) {
            buggy.current_onboard_guests = onboard;
            buggy.current_poi = Some(stop.poi);
            buggy.updated_at = now;
        }
        if let Some(ride) = self.rides.get_mut(&stop.ride_id) {
            match stop.stop_type {
                StopType::Pickup => {
                    ride.status = RideStatus::InProgress;
                    ride.pickup_completed_at = Some(now);
                }
                StopType::Dropoff => {
                    ride.status = RideStatus::Completed;
                    ride.dropoff_completed_at = Some(now);
                }
            }
        }

        self.snapshot(buggy_id, stop_id)
    }

    /// Pending stops of every buggy the driver operates, in sequence order.
    pub fn driver_route(&self, driver_id: DriverId) -> Result<Vec<Stop>, AppError> {
        if self.driver(driver_id).is_none() {
            return Err(AppError::NotFound(format!("driver {driver_id} not found")));
        }

        let mut stops: Vec<Stop> = self
            .buggies
            .values()
            .filter(|buggy| buggy.driver == Some(driver_id))
            .filter_map(|buggy| self.routes.get(&buggy.id))
            .flat_map(|route| route.pending().cloned())
            .collect();
        stops.sort_by_key(|stop| (stop.sequence_index, stop.buggy_id));
        Ok(stops)
    }
}

fn record_transition(state: &AppState, action: &str, transition: &StopTransition) {
    let stop_type = match transition.stop.stop_type {
        StopType::Pickup => "pickup",
        StopType::Dropoff => "dropoff",
    };
    state
        .metrics
        .stop_transitions_total
        .with_label_values(&[action, stop_type])
        .inc();
    state
        .metrics
        .buggy_onboard_guests
        .with_label_values(&[&transition.buggy.id.to_string()])
        .set(transition.buggy.current_onboard_guests as i64);
}

pub async fn start_stop(state: &AppState, stop_id: StopId) -> Result<StopTransition, AppError> {
    let outcome = {
        let mut fleet = state.fleet.write().await;
        let outcome = fleet.start_stop(stop_id);
        if let Ok(transition) = &outcome {
            state
                .events
                .publish_all(transition.events(EventKind::StopStarted));
        }
        outcome
    };

    match outcome {
        Ok(transition) => {
            record_transition(state, "start", &transition);
            info!(
                stop_id,
                buggy_id = transition.buggy.id,
                ride_id = transition.ride.id,
                "stop started"
            );
            Ok(transition)
        }
        Err(err) => {
            warn!(stop_id, error = %err, "stop start rejected");
            Err(err)
        }
    }
}

pub async fn complete_stop(state: &AppState, stop_id: StopId) -> Result<StopTransition, AppError> {
    let outcome = {
        let mut fleet = state.fleet.write().await;
        let outcome = fleet.complete_stop(stop_id);
        state.metrics.pending_stops.set(fleet.pending_stop_count() as i64);
        if let Ok(transition) = &outcome {
            state
                .events
                .publish_all(transition.events(EventKind::StopCompleted));
        }
        outcome
    };

    match outcome {
        Ok(transition) => {
            record_transition(state, "complete", &transition);
            info!(
                stop_id,
                buggy_id = transition.buggy.id,
                ride_id = transition.ride.id,
                onboard = transition.buggy.current_onboard_guests,
                "stop completed"
            );
            Ok(transition)
        }
        Err(err) => {
            warn!(stop_id, error = %err, "stop completion rejected");
            Err(err)
        }
    }
}
