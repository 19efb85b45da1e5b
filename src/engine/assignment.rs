use std::time::Instant;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::engine::route::{AppendEstimate, ServiceTimes};
use crate::error::AppError;
use crate::events::ChangeEvent;
use crate::models::assignment::Assignment;
use crate::models::buggy::Buggy;
use crate::models::ride::{generate_public_code, RideRequest, RideStatus};
use crate::models::{BuggyId, StopId};
use crate::state::AppState;
use crate::store::{next_id, Fleet};

#[derive(Debug, Clone, Deserialize)]
pub struct NewRide {
    pub pickup_poi_code: String,
    pub dropoff_poi_code: String,
    pub num_guests: u32,
    #[serde(default)]
    pub room_number: String,
    #[serde(default)]
    pub guest_name: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RideAssignment {
    pub ride: RideRequest,
    pub assigned_buggy: Buggy,
    pub assignment: Assignment,
    pub stop_ids: [StopId; 2],
}

fn check_capacity(buggy: &Buggy, estimate: &AppendEstimate, requested: u32) -> Result<(), AppError> {
    if estimate.onboard_at_pickup + requested > buggy.capacity {
        return Err(AppError::CapacityExceeded {
            buggy_id: buggy.id,
            requested,
            projected: estimate.onboard_at_pickup,
            capacity: buggy.capacity,
        });
    }
    Ok(())
}

impl Fleet {
    /// Draws codes until one is not taken by a stored ride.
    fn unique_public_code(&self, mut generate: impl FnMut() -> String) -> String {
        loop {
            let code = generate();
            if !self.rides.values().any(|ride| ride.public_code == code) {
                return code;
            }
            debug!(code = %code, "public code collision, drawing again");
        }
    }

    /// Picks the active buggy that reaches the pickup soonest and appends the
    /// ride to the tail of its queue.
    ///
    /// Candidates are visited in id order and only a strictly smaller ETA
    /// replaces the current best, so ties go to the older buggy.
    pub fn assign(
        &mut self,
        ride: &mut RideRequest,
        service: &ServiceTimes,
    ) -> Result<(Assignment, [StopId; 2]), AppError> {
        let mut active = 0usize;
        let mut best: Option<(BuggyId, AppendEstimate)> = None;

        for buggy in self.buggies.values().filter(|buggy| buggy.is_active()) {
            active += 1;
            let route = self.routes.get(&buggy.id).ok_or_else(|| {
                AppError::Internal(format!("buggy {} has no route queue", buggy.id))
            })?;
            let estimate = route.estimate_append(
                buggy,
                ride.pickup_poi,
                ride.dropoff_poi,
                &self.graph,
                service,
            )?;

            if let Err(err) = check_capacity(buggy, &estimate, ride.num_guests) {
                debug!(buggy_id = buggy.id, reason = %err, "candidate excluded");
                continue;
            }

            debug!(
                buggy_id = buggy.id,
                pickup_eta_s = estimate.pickup_eta_s,
                "candidate evaluated"
            );
            if best.is_none_or(|(_, current)| estimate.pickup_eta_s < current.pickup_eta_s) {
                best = Some((buggy.id, estimate));
            }
        }

        if active == 0 {
            return Err(AppError::NoActiveBuggies);
        }
        let (buggy_id, estimate) = best.ok_or_else(|| {
            warn!(
                num_guests = ride.num_guests,
                active, "every active buggy is too full for this ride"
            );
            AppError::NoActiveBuggies
        })?;

        let now = Utc::now();
        let stop_ids = [
            next_id(&mut self.sequences.stop),
            next_id(&mut self.sequences.stop),
        ];
        let route = self.routes.get_mut(&buggy_id).ok_or_else(|| {
            AppError::Internal(format!("buggy {buggy_id} has no route queue"))
        })?;
        route.append_ride(ride, stop_ids, now);
        for stop_id in stop_ids {
            self.stop_owners.insert(stop_id, buggy_id);
        }

        ride.status = RideStatus::Assigned;
        ride.assigned_buggy = Some(buggy_id);
        ride.assigned_at = Some(now);

        let assignment = Assignment {
            id: Uuid::new_v4(),
            ride_id: ride.id,
            buggy_id,
            pickup_eta_s: estimate.pickup_eta_s,
            total_route_s: estimate.total_route_s,
            assigned_at: now,
        };
        self.assignments.push(assignment.clone());

        Ok((assignment, stop_ids))
    }

    /// Creates a ride and assigns it in one step. Nothing is stored when no buggy
    /// can take the ride.
    pub fn create_ride(
        &mut self,
        request: NewRide,
        service: &ServiceTimes,
    ) -> Result<RideAssignment, AppError> {
        if request.num_guests == 0 {
            return Err(AppError::BadRequest("num_guests must be positive".to_string()));
        }
        let pickup_poi = self
            .poi_by_code(request.pickup_poi_code.trim())
            .map(|poi| poi.id)
            .ok_or_else(|| {
                AppError::BadRequest(format!(
                    "unknown pickup_poi_code: {}",
                    request.pickup_poi_code
                ))
            })?;
        let dropoff_poi = self
            .poi_by_code(request.dropoff_poi_code.trim())
            .map(|poi| poi.id)
            .ok_or_else(|| {
                AppError::BadRequest(format!(
                    "unknown dropoff_poi_code: {}",
                    request.dropoff_poi_code
                ))
            })?;

        let mut ride = RideRequest {
            id: self.sequences.ride + 1,
            public_code: self.unique_public_code(generate_public_code),
            pickup_poi,
            dropoff_poi,
            num_guests: request.num_guests,
            room_number: request.room_number.trim().to_string(),
            guest_name: request.guest_name.trim().to_string(),
            status: RideStatus::Requested,
            assigned_buggy: None,
            requested_at: Utc::now(),
            assigned_at: None,
            pickup_completed_at: None,
            dropoff_completed_at: None,
        };

        let (assignment, stop_ids) = self.assign(&mut ride, service)?;
        self.sequences.ride = ride.id;
        self.rides.insert(ride.id, ride.clone());

        let assigned_buggy = self
            .buggies
            .get(&assignment.buggy_id)
            .cloned()
            .ok_or_else(|| AppError::Internal(format!("buggy {} vanished", assignment.buggy_id)))?;

        Ok(RideAssignment {
            ride,
            assigned_buggy,
            assignment,
            stop_ids,
        })
    }
}

pub async fn create_ride(state: &AppState, request: NewRide) -> Result<RideAssignment, AppError> {
    let start = Instant::now();

    let outcome = {
        let mut fleet = state.fleet.write().await;
        let outcome = fleet.create_ride(request, &state.service_times);
        state.metrics.pending_stops.set(fleet.pending_stop_count() as i64);
        // Published under the guard so observers see events in commit order.
        if let Ok(created) = &outcome {
            state
                .events
                .publish(ChangeEvent::ride_assigned(&created.ride, &created.assigned_buggy));
        }
        outcome
    };

    let elapsed = start.elapsed().as_secs_f64();
    match &outcome {
        Ok(created) => {
            state.metrics.observe_assignment("success", elapsed);

            info!(
                ride_id = created.ride.id,
                ride_code = %created.ride.public_code,
                buggy_id = created.assigned_buggy.id,
                pickup_eta_s = created.assignment.pickup_eta_s,
                "ride assigned"
            );
        }
        Err(err) => {
            state.metrics.observe_assignment("error", elapsed);
            warn!(error = %err, "ride assignment rejected");
        }
    }

    outcome
}
