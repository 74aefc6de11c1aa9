//! Domain types for errandplan
//!
//! The plan returned by the service, the citations attached to it, the
//! user's location and the bounded request history.

mod history;
mod location;
mod plan;

pub use history::{MAX_HISTORY_CAPACITY, RequestHistory};
pub use location::{Coordinates, FALLBACK_LABEL, FALLBACK_LATITUDE, FALLBACK_LONGITUDE, Location};
pub use plan::{Alternative, CrowdLevel, ErrandPlan, ErrandStop, GroundingLink, ParkingDifficulty};
