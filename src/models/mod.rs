pub mod assignment;
pub mod buggy;
pub mod driver;
pub mod poi;
pub mod ride;
pub mod stop;

pub type PoiId = u64;
pub type BuggyId = u64;
pub type DriverId = u64;
pub type RideId = u64;
pub type StopId = u64;
