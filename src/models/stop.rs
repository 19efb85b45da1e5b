use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{BuggyId, PoiId, RideId, StopId};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StopType {
    Pickup,
    Dropoff,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StopStatus {
    Planned,
    OnRoute,
    Completed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Stop {
    pub id: StopId,
    pub buggy_id: BuggyId,
    pub ride_id: RideId,
    pub stop_type: StopType,
    pub poi: PoiId,
    pub sequence_index: u32,
    pub status: StopStatus,
    pub num_guests: u32,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Stop {
    pub fn is_pending(&self) -> bool {
        self.status != StopStatus::Completed
    }
}
