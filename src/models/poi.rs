use serde::{Deserialize, Serialize};

use crate::models::PoiId;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Poi {
    pub id: PoiId,
    pub code: String,
    pub name: String,
}

/// Directed travel-time edge. A missing reverse edge means that direction is not
/// directly reachable.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PoiEdge {
    pub from_poi: PoiId,
    pub to_poi: PoiId,
    pub travel_time_s: u32,
}
