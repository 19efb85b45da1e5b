use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{BuggyId, PoiId, RideId};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RideStatus {
    Requested,
    Assigned,
    PickingUp,
    InProgress,
    Completed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RideRequest {
    pub id: RideId,
    pub public_code: String,
    pub pickup_poi: PoiId,
    pub dropoff_poi: PoiId,
    pub num_guests: u32,
    pub room_number: String,
    pub guest_name: String,
    pub status: RideStatus,
    pub assigned_buggy: Option<BuggyId>,
    pub requested_at: DateTime<Utc>,
    pub assigned_at: Option<DateTime<Utc>>,
    pub pickup_completed_at: Option<DateTime<Utc>>,
    pub dropoff_completed_at: Option<DateTime<Utc>>,
}

/// Six uppercase hex characters, short enough to read out to a guest.
pub fn generate_public_code() -> String {
    Uuid::new_v4().simple().to_string()[..6].to_uppercase()
}
