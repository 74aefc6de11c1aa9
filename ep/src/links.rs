//! Directions link for the whole route

use reqwest::Url;
use tracing::debug;

use crate::domain::{Coordinates, ErrandStop};

const DIRECTIONS_BASE: &str = "https://www.google.com/maps/dir";

/// Build a multi-stop directions URL from `origin` through every stop in order
///
/// Returns `None` for an empty stop list rather than an origin-only
/// `/dir/<lat>,<lon>` URL, which opens a map with nowhere to go.
pub fn directions_url(origin: &Coordinates, stops: &[ErrandStop]) -> Option<String> {
    debug!(stop_count = stops.len(), "directions_url: called");
    if stops.is_empty() {
        return None;
    }

    let mut url = Url::parse(&format!("{}/{},{}", DIRECTIONS_BASE, origin.latitude, origin.longitude)).ok()?;
    {
        let mut segments = url.path_segments_mut().ok()?;
        for stop in stops {
            segments.push(&stop.address);
        }
    }
    Some(url.to_string())
}
