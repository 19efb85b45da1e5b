use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{BuggyId, RideId};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Assignment {
    pub id: Uuid,
    pub ride_id: RideId,
    pub buggy_id: BuggyId,
    /// Seconds until the buggy reaches the pickup, queued stops included.
    pub pickup_eta_s: u64,
    /// Seconds until the buggy has worked off its whole queue, new ride included.
    pub total_route_s: u64,
    pub assigned_at: DateTime<Utc>,
}
