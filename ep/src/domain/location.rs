//! Location types
//!
//! A coordinate pair plus the human-readable label shown to the user.

use serde::{Deserialize, Serialize};

/// Latitude used when the device location is unavailable
pub const FALLBACK_LATITUDE: f64 = 37.7749;

/// Longitude used when the device location is unavailable
pub const FALLBACK_LONGITUDE: f64 = -122.4194;

/// Label for the fallback location
pub const FALLBACK_LABEL: &str = "San Francisco, CA";

/// A latitude/longitude pair in decimal degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }

    /// Whether both components are finite and inside their valid ranges
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }
}

impl std::fmt::Display for Coordinates {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}, {}", self.latitude, self.longitude)
    }
}

/// Where the user is, as far as the planner knows
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub coordinates: Coordinates,
    pub label: String,
}

impl Location {
    /// Location reported by a provider; the label is derived from the pair
    pub fn from_coordinates(coordinates: Coordinates) -> Self {
        Self {
            label: format!(
                "Current location ({:.4}, {:.4})",
                coordinates.latitude, coordinates.longitude
            ),
            coordinates,
        }
    }

    /// Fixed location used on denial or failure
    pub fn fallback() -> Self {
        Self {
            coordinates: Coordinates::new(FALLBACK_LATITUDE, FALLBACK_LONGITUDE),
            label: FALLBACK_LABEL.to_string(),
        }
    }

    pub fn is_fallback(&self) -> bool {
        *self == Self::fallback()
    }
}

impl Default for Location {
    fn default() -> Self {
        Self::fallback()
    }
}
