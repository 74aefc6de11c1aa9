//! Request composer
//!
//! Builds the outbound prompt from request text, location, wall-clock time
//! and mode. Pure string construction: nothing here touches session state.

use chrono::{DateTime, Local, TimeZone};
use eyre::Result;
use tracing::debug;

use super::loader::{PlanMode, PromptContext, PromptLoader};
use crate::domain::Location;

/// Template used for every plan request
const PLAN_TEMPLATE: &str = "plan";

/// Format of the local time string embedded in prompts
const TIME_FORMAT: &str = "%A, %B %-d %Y, %-I:%M %p";

/// Composes plan prompts
pub struct RequestComposer {
    loader: PromptLoader,
}

impl RequestComposer {
    pub fn new(loader: PromptLoader) -> Self {
        Self { loader }
    }

    /// Compose a prompt for the given instant
    ///
    /// Identical text, location and mode produce identical prompts apart from
    /// the time line.
    pub fn compose<Tz>(&self, request: &str, location: &Location, mode: PlanMode, now: &DateTime<Tz>) -> Result<String>
    where
        Tz: TimeZone,
        Tz::Offset: std::fmt::Display,
    {
        debug!(request_len = request.len(), %mode, location = %location.coordinates, "RequestComposer::compose: called");
        let context = PromptContext {
            request: request.trim().to_string(),
            has_request: !request.trim().is_empty(),
            coordinates: location.coordinates.to_string(),
            latitude: location.coordinates.latitude,
            longitude: location.coordinates.longitude,
            location_label: location.label.clone(),
            current_time: now.format(TIME_FORMAT).to_string(),
            mode: mode.tag().to_string(),
            is_reroute: mode.is_reroute(),
        };

        self.loader.render(PLAN_TEMPLATE, &context)
    }

    /// Compose a prompt stamped with the local clock
    pub fn compose_now(&self, request: &str, location: &Location, mode: PlanMode) -> Result<String> {
        self.compose(request, location, mode, &Local::now())
    }
}

impl Default for RequestComposer {
    fn default() -> Self {
        Self::new(PromptLoader::embedded_only())
    }
}
