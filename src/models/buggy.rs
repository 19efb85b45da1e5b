use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{BuggyId, DriverId, PoiId};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BuggyStatus {
    Active,
    Inactive,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Buggy {
    pub id: BuggyId,
    pub code: String,
    pub display_name: String,
    pub capacity: u32,
    pub status: BuggyStatus,
    pub current_poi: Option<PoiId>,
    pub current_onboard_guests: u32,
    pub driver: Option<DriverId>,
    pub updated_at: DateTime<Utc>,
}

impl Buggy {
    pub fn is_active(&self) -> bool {
        self.status == BuggyStatus::Active
    }
}
