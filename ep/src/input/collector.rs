//! Input collector
//!
//! Owns the request text, the voice capture and the current location, and
//! hands a (text, location) pair to the request composer.

use std::time::Duration;

use tracing::debug;

use super::location::{LocationFix, LocationProvider, resolve_location};
use super::voice::{ToggleResult, VoiceCapture, VoiceState};
use crate::domain::Location;

/// Session input state
pub struct InputCollector {
    text: String,
    voice: VoiceCapture,
    location: Location,
}

impl InputCollector {
    pub fn new(voice: VoiceCapture) -> Self {
        Self {
            text: String::new(),
            voice,
            location: Location::fallback(),
        }
    }

    /// Current request text
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Replace the request text; allowed while a capture is pending
    pub fn set_text(&mut self, text: impl Into<String>) {
        self.text = text.into();
        debug!(text_len = self.text.len(), "InputCollector::set_text: called");
    }

    pub fn clear_text(&mut self) {
        self.text.clear();
    }

    pub fn location(&self) -> &Location {
        &self.location
    }

    /// Override the location directly (e.g. from `--lat/--lon`)
    pub fn set_location(&mut self, location: Location) {
        debug!(label = %location.label, "InputCollector::set_location: called");
        self.location = location;
    }

    /// Request the location from a provider
    ///
    /// May be called again later; the newest answer replaces the old one.
    /// Returns the advisory if the fallback was used.
    pub async fn relocate(&mut self, provider: &dyn LocationProvider, timeout: Duration) -> Option<String> {
        let LocationFix { location, advisory } = resolve_location(provider, timeout).await;
        self.location = location;
        advisory
    }

    pub fn voice_state(&self) -> VoiceState {
        self.voice.state()
    }

    pub fn voice_supported(&self) -> bool {
        self.voice.is_supported()
    }

    pub fn toggle_voice(&mut self) -> ToggleResult {
        self.voice.toggle()
    }

    /// Apply every voice event that has already arrived
    ///
    /// Returns advisories for failed captures.
    pub fn pump_voice(&mut self) -> Vec<String> {
        let mut advisories = Vec::new();
        while let Some(event) = self.voice.try_next_event() {
            if let Some(advisory) = self.voice.apply(event, &mut self.text) {
                advisories.push(advisory);
            }
        }
        advisories
    }
}
