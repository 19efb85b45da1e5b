use serde::{Deserialize, Serialize};

use crate::models::DriverId;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Driver {
    pub id: DriverId,
    pub username: String,
    pub display_name: String,
}
