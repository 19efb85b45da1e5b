use std::collections::{BTreeMap, HashMap};

use chrono::{NaiveDate, Utc};
use serde::Serialize;
use tracing::{info, warn};

use crate::engine::route::RouteQueue;
use crate::error::AppError;
use crate::graph::PoiGraph;
use crate::models::assignment::Assignment;
use crate::models::buggy::{Buggy, BuggyStatus};
use crate::models::driver::Driver;
use crate::models::poi::{Poi, PoiEdge};
use crate::models::ride::RideRequest;
use crate::models::stop::Stop;
use crate::models::{BuggyId, DriverId, PoiId, RideId, StopId};

#[derive(Debug, Default)]
pub(crate) struct Sequences {
    poi: u64,
    buggy: u64,
    driver: u64,
    pub(crate) ride: u64,
    pub(crate) stop: u64,
}

/// One day. Longer hops are data-entry mistakes.
pub const MAX_EDGE_TRAVEL_S: u32 = 86_400;

pub(crate) fn next_id(counter: &mut u64) -> u64 {
    *counter += 1;
    *counter
}

#[derive(Debug, Clone)]
pub struct NewBuggy {
    pub code: String,
    pub display_name: String,
    pub capacity: u32,
    pub status: BuggyStatus,
    pub current_poi: Option<PoiId>,
    pub driver: Option<DriverId>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct RideSummary {
    pub date: NaiveDate,
    pub total_rides: usize,
    pub avg_wait_time_s: Option<i64>,
}

/// Everything the dispatcher knows about the resort: reference data, the fleet,
/// rides and each buggy's route queue.
///
/// Not synchronised on its own; `AppState` keeps it behind one lock so a
/// read-decide-mutate sequence is a single atomic unit.
#[derive(Debug, Default)]
pub struct Fleet {
    pub(crate) pois: BTreeMap<PoiId, Poi>,
    pub(crate) edges: BTreeMap<(PoiId, PoiId), PoiEdge>,
    pub(crate) graph: PoiGraph,
    pub(crate) buggies: BTreeMap<BuggyId, Buggy>,
    pub(crate) drivers: BTreeMap<DriverId, Driver>,
    pub(crate) rides: BTreeMap<RideId, RideRequest>,
    pub(crate) routes: BTreeMap<BuggyId, RouteQueue>,
    pub(crate) stop_owners: HashMap<StopId, BuggyId>,
    pub(crate) assignments: Vec<Assignment>,
    pub(crate) sequences: Sequences,
}

impl Fleet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn graph(&self) -> &PoiGraph {
        &self.graph
    }

    fn rebuild_graph(&mut self) {
        self.graph = PoiGraph::from_edges(self.edges.values());
        info!(edges = self.graph.edge_count(), "poi graph rebuilt");
    }

    pub fn pois(&self) -> Vec<Poi> {
        self.pois.values().cloned().collect()
    }

    pub fn poi(&self, id: PoiId) -> Option<&Poi> {
        self.pois.get(&id)
    }

    pub fn poi_by_code(&self, code: &str) -> Option<&Poi> {
        self.pois.values().find(|poi| poi.code == code)
    }

    pub fn create_poi(&mut self, code: &str, name: &str) -> Result<Poi, AppError> {
        let code = code.trim();
        if code.is_empty() {
            return Err(AppError::BadRequest("code cannot be empty".to_string()));
        }
        if self.poi_by_code(code).is_some() {
            return Err(AppError::Conflict(format!("poi {code} already exists")));
        }

        let poi = Poi {
            id: next_id(&mut self.sequences.poi),
            code: code.to_string(),
            name: name.trim().to_string(),
        };
        self.pois.insert(poi.id, poi.clone());
        Ok(poi)
    }

    pub fn delete_poi(&mut self, id: PoiId) -> Result<Poi, AppError> {
        if !self.pois.contains_key(&id) {
            return Err(AppError::NotFound(format!("poi {id} not found")));
        }

        let used_by_ride = self
            .rides
            .values()
            .any(|ride| ride.pickup_poi == id || ride.dropoff_poi == id);
        let used_by_stop = self
            .routes
            .values()
            .flat_map(|route| route.stops())
            .any(|stop| stop.poi == id);
        if used_by_ride || used_by_stop {
            return Err(AppError::Conflict(format!(
                "poi {id} is referenced by rides"
            )));
        }

        self.edges
            .retain(|&(from, to), _| from != id && to != id);
        for buggy in self.buggies.values_mut() {
            if buggy.current_poi == Some(id) {
                buggy.current_poi = None;
                buggy.updated_at = Utc::now();
            }
        }
        self.rebuild_graph();

        self.pois
            .remove(&id)
            .ok_or_else(|| AppError::NotFound(format!("poi {id} not found")))
    }

    pub fn edges(&self) -> Vec<PoiEdge> {
        self.edges.values().cloned().collect()
    }

    /// Inserts or replaces `from -> to`, plus `to -> from` when `bidirectional`.
    pub fn upsert_edge(
        &mut self,
        from: PoiId,
        to: PoiId,
        travel_time_s: u32,
        bidirectional: bool,
    ) -> Result<Vec<PoiEdge>, AppError> {
        for id in [from, to] {
            if !self.pois.contains_key(&id) {
                return Err(AppError::NotFound(format!("poi {id} not found")));
            }
        }
        if from == to {
            return Err(AppError::BadRequest(
                "an edge must connect two different pois".to_string(),
            ));
        }
        if travel_time_s == 0 || travel_time_s > MAX_EDGE_TRAVEL_S {
            return Err(AppError::BadRequest(format!(
                "travel_time_s must be between 1 and {MAX_EDGE_TRAVEL_S}"
            )));
        }

        let mut written = vec![PoiEdge {
            from_poi: from,
            to_poi: to,
            travel_time_s,
        }];
        if bidirectional {
            written.push(PoiEdge {
                from_poi: to,
                to_poi: from,
                travel_time_s,
            });
        }

        for edge in &written {
            self.edges
                .insert((edge.from_poi, edge.to_poi), edge.clone());
        }
        self.rebuild_graph();

        Ok(written)
    }

    pub fn delete_edge(&mut self, from: PoiId, to: PoiId) -> Result<PoiEdge, AppError> {
        let edge = self
            .edges
            .remove(&(from, to))
            .ok_or_else(|| AppError::NotFound(format!("edge {from} -> {to} not found")))?;
        self.rebuild_graph();
        Ok(edge)
    }

    pub fn drivers(&self) -> Vec<Driver> {
        self.drivers.values().cloned().collect()
    }

    pub fn driver(&self, id: DriverId) -> Option<&Driver> {
        self.drivers.get(&id)
    }

    pub fn create_driver(&mut self, username: &str, display_name: &str) -> Result<Driver, AppError> {
        let username = username.trim();
        if username.is_empty() {
            return Err(AppError::BadRequest("username cannot be empty".to_string()));
        }
        if self.drivers.values().any(|driver| driver.username == username) {
            return Err(AppError::Conflict(format!(
                "driver {username} already exists"
            )));
        }

        let driver = Driver {
            id: next_id(&mut self.sequences.driver),
            username: username.to_string(),
            display_name: display_name.trim().to_string(),
        };
        self.drivers.insert(driver.id, driver.clone());
        Ok(driver)
    }

    pub fn buggies(&self) -> Vec<Buggy> {
        self.buggies.values().cloned().collect()
    }

    pub fn buggy(&self, id: BuggyId) -> Option<&Buggy> {
        self.buggies.get(&id)
    }

    fn buggy_mut(&mut self, id: BuggyId) -> Result<&mut Buggy, AppError> {
        self.buggies
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound(format!("buggy {id} not found")))
    }

    pub fn create_buggy(&mut self, new: NewBuggy) -> Result<Buggy, AppError> {
        let code = new.code.trim();
        if code.is_empty() {
            return Err(AppError::BadRequest("code cannot be empty".to_string()));
        }
        if new.capacity == 0 {
            return Err(AppError::BadRequest("capacity must be > 0".to_string()));
        }
        if self.buggies.values().any(|buggy| buggy.code == code) {
            return Err(AppError::Conflict(format!("buggy {code} already exists")));
        }
        if let Some(poi) = new.current_poi {
            if !self.pois.contains_key(&poi) {
                return Err(AppError::NotFound(format!("poi {poi} not found")));
            }
        }
        if let Some(driver) = new.driver {
            if !self.drivers.contains_key(&driver) {
                return Err(AppError::NotFound(format!("driver {driver} not found")));
            }
        }

        let buggy = Buggy {
            id: next_id(&mut self.sequences.buggy),
            code: code.to_string(),
            display_name: new.display_name.trim().to_string(),
            capacity: new.capacity,
            status: new.status,
            current_poi: new.current_poi,
            current_onboard_guests: 0,
            driver: None,
            updated_at: Utc::now(),
        };
        self.buggies.insert(buggy.id, buggy.clone());
        self.routes.insert(buggy.id, RouteQueue::new(buggy.id));

        match new.driver {
            Some(driver) => self.set_buggy_driver(buggy.id, Some(driver)),
            None => Ok(buggy),
        }
    }

    pub fn set_buggy_status(&mut self, id: BuggyId, status: BuggyStatus) -> Result<Buggy, AppError> {
        let has_pending = self
            .routes
            .get(&id)
            .is_some_and(RouteQueue::has_pending);
        let buggy = self.buggy_mut(id)?;
        if status == BuggyStatus::Inactive && has_pending {
            warn!(buggy_id = id, "buggy deactivated with stops still queued");
        }
        buggy.status = status;
        buggy.updated_at = Utc::now();
        Ok(buggy.clone())
    }

    pub fn set_buggy_location(&mut self, id: BuggyId, poi: Option<PoiId>) -> Result<Buggy, AppError> {
        if let Some(poi) = poi {
            if !self.pois.contains_key(&poi) {
                return Err(AppError::NotFound(format!("poi {poi} not found")));
            }
        }
        let buggy = self.buggy_mut(id)?;
        buggy.current_poi = poi;
        buggy.updated_at = Utc::now();
        Ok(buggy.clone())
    }

    /// A driver operates at most one buggy; assigning moves them off any other.
    pub fn set_buggy_driver(
        &mut self,
        id: BuggyId,
        driver: Option<DriverId>,
    ) -> Result<Buggy, AppError> {
        if !self.buggies.contains_key(&id) {
            return Err(AppError::NotFound(format!("buggy {id} not found")));
        }
        if let Some(driver) = driver {
            if !self.drivers.contains_key(&driver) {
                return Err(AppError::NotFound(format!("driver {driver} not found")));
            }
            for other in self.buggies.values_mut() {
                if other.id != id && other.driver == Some(driver) {
                    other.driver = None;
                    other.updated_at = Utc::now();
                }
            }
        }

        let buggy = self.buggy_mut(id)?;
        buggy.driver = driver;
        buggy.updated_at = Utc::now();
        Ok(buggy.clone())
    }

    pub fn delete_buggy(&mut self, id: BuggyId) -> Result<Buggy, AppError> {
        if self.routes.get(&id).is_some_and(RouteQueue::has_pending) {
            return Err(AppError::Conflict(format!(
                "buggy {id} still has stops queued"
            )));
        }
        let buggy = self
            .buggies
            .remove(&id)
            .ok_or_else(|| AppError::NotFound(format!("buggy {id} not found")))?;
        if let Some(route) = self.routes.remove(&id) {
            for stop in route.stops() {
                self.stop_owners.remove(&stop.id);
            }
        }
        for ride in self.rides.values_mut() {
            if ride.assigned_buggy == Some(id) {
                ride.assigned_buggy = None;
            }
        }
        Ok(buggy)
    }

    pub fn route(&self, buggy_id: BuggyId) -> Option<&RouteQueue> {
        self.routes.get(&buggy_id)
    }

    pub fn pending_route(&self, buggy_id: BuggyId) -> Result<Vec<Stop>, AppError> {
        self.routes
            .get(&buggy_id)
            .map(|route| route.pending().cloned().collect())
            .ok_or_else(|| AppError::NotFound(format!("buggy {buggy_id} not found")))
    }

    pub fn stop(&self, stop_id: StopId) -> Option<&Stop> {
        let buggy_id = self.stop_owners.get(&stop_id)?;
        self.routes.get(buggy_id)?.get(stop_id)
    }

    pub fn pending_stop_count(&self) -> usize {
        self.routes.values().map(|route| route.pending().count()).sum()
    }

    pub fn ride_count(&self) -> usize {
        self.rides.len()
    }

    pub fn ride(&self, id: RideId) -> Option<&RideRequest> {
        self.rides.get(&id)
    }

    /// Newest first.
    pub fn recent_rides(&self, limit: usize) -> Vec<RideRequest> {
        let mut rides: Vec<RideRequest> = self.rides.values().cloned().collect();
        rides.sort_by(|a, b| b.requested_at.cmp(&a.requested_at).then(b.id.cmp(&a.id)));
        rides.truncate(limit);
        rides
    }

    pub fn assignments(&self) -> &[Assignment] {
        &self.assignments
    }

    pub fn ride_summary(&self, date: NaiveDate) -> RideSummary {
        let todays: Vec<&RideRequest> = self
            .rides
            .values()
            .filter(|ride| ride.requested_at.date_naive() == date)
            .collect();

        let waits: Vec<i64> = todays
            .iter()
            .filter_map(|ride| {
                ride.assigned_at
                    .map(|assigned_at| (assigned_at - ride.requested_at).num_seconds())
            })
            .collect();
        let avg_wait_time_s = if waits.is_empty() {
            None
        } else {
            Some(waits.iter().sum::<i64>() / waits.len() as i64)
        };

        RideSummary {
            date,
            total_rides: todays.len(),
            avg_wait_time_s,
        }
    }
}
