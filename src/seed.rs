use tracing::info;

use crate::error::AppError;
use crate::models::buggy::BuggyStatus;
use crate::store::{Fleet, NewBuggy};

const POIS: &[(&str, &str)] = &[
    ("RECEPTION", "Reception"),
    ("BEACH_BAR", "Beach Bar"),
    ("BEL_AIR", "Bel Air"),
    ("MAIN_RESTAURANT", "Main Restaurant"),
    ("MAIN_POOL", "Main Pool"),
    ("MAIN_BAR", "Main Bar"),
    ("SPA", "Spa"),
    ("THE_REEF", "The Reef"),
    ("BEACH_LOUNGE", "Beach Lounge"),
    ("THEATRE", "Theatre"),
];

/// Two-way links in seconds.
const LINKS: &[(&str, &str, u32)] = &[
    ("RECEPTION", "BEL_AIR", 90),
    ("RECEPTION", "MAIN_POOL", 45),
    ("RECEPTION", "SPA", 90),
    ("BEACH_BAR", "BEL_AIR", 120),
    ("BEACH_BAR", "BEACH_LOUNGE", 90),
    ("BEL_AIR", "THE_REEF", 120),
    ("THE_REEF", "BEACH_LOUNGE", 60),
    ("BEACH_LOUNGE", "MAIN_RESTAURANT", 150),
    ("MAIN_RESTAURANT", "MAIN_POOL", 30),
    ("MAIN_RESTAURANT", "MAIN_BAR", 45),
    ("MAIN_BAR", "THEATRE", 60),
];

const DRIVERS: &[(&str, &str)] = &[("driver1", "Driver One"), ("driver2", "Driver Two")];

fn poi_id(fleet: &Fleet, code: &str) -> Result<u64, AppError> {
    fleet
        .poi_by_code(code)
        .map(|poi| poi.id)
        .ok_or_else(|| AppError::Internal(format!("seed poi {code} missing")))
}

/// Loads a small resort: POIs, symmetric edges, two drivers and two active buggies.
pub fn load_demo(fleet: &mut Fleet) -> Result<(), AppError> {
    for (code, name) in POIS {
        fleet.create_poi(code, name)?;
    }
    for (from, to, travel_time_s) in LINKS {
        let from = poi_id(fleet, from)?;
        let to = poi_id(fleet, to)?;
        fleet.upsert_edge(from, to, *travel_time_s, true)?;
    }

    let starts = ["BEL_AIR", "RECEPTION"];
    for (index, ((username, name), start)) in DRIVERS.iter().zip(starts).enumerate() {
        let driver = fleet.create_driver(username, name)?;
        let number = index + 1;
        let current_poi = poi_id(fleet, start)?;
        fleet.create_buggy(NewBuggy {
            code: format!("BUGGY_{number}"),
            display_name: format!("Buggy #{number}"),
            capacity: 4,
            status: BuggyStatus::Active,
            current_poi: Some(current_poi),
            driver: Some(driver.id),
        })?;
    }

    info!(
        pois = POIS.len(),
        edges = fleet.edges().len(),
        buggies = fleet.buggies().len(),
        "demo resort loaded"
    );
    Ok(())
}
