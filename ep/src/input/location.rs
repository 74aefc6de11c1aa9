//! Location capture
//!
//! Best-effort device location. Any denial, failure or timeout falls back to
//! the fixed default location with a non-blocking advisory.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::config::{LocationConfig, LocationSource};
use crate::domain::{Coordinates, Location};
use crate::error::InputCaptureError;

/// Platform geolocation capability
#[async_trait]
pub trait LocationProvider: Send + Sync {
    async fn locate(&self) -> Result<Location, InputCaptureError>;
}

/// Approximate position of the public IP address
pub struct IpLocationProvider {
    http: Client,
    url: String,
}

impl IpLocationProvider {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            url: url.into(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct IpLookup {
    lat: Option<f64>,
    lon: Option<f64>,
    status: Option<String>,
    message: Option<String>,
}

#[async_trait]
impl LocationProvider for IpLocationProvider {
    async fn locate(&self) -> Result<Location, InputCaptureError> {
        debug!(url = %self.url, "IpLocationProvider::locate: called");
        let response = self
            .http
            .get(&self.url)
            .send()
            .await
            .map_err(|e| InputCaptureError::LocationUnavailable(e.to_string()))?;

        if !response.status().is_success() {
            return Err(InputCaptureError::LocationUnavailable(format!(
                "lookup returned HTTP {}",
                response.status().as_u16()
            )));
        }

        let lookup: IpLookup = response
            .json()
            .await
            .map_err(|e| InputCaptureError::LocationUnavailable(e.to_string()))?;

        if lookup.status.as_deref() == Some("fail") {
            return Err(InputCaptureError::LocationDenied(
                lookup.message.unwrap_or_else(|| "lookup refused".to_string()),
            ));
        }

        match (lookup.lat, lookup.lon) {
            (Some(lat), Some(lon)) if Coordinates::new(lat, lon).is_valid() => {
                Ok(Location::from_coordinates(Coordinates::new(lat, lon)))
            }
            _ => Err(InputCaptureError::LocationUnavailable(
                "lookup returned no usable coordinates".to_string(),
            )),
        }
    }
}

/// Location pinned in configuration
pub struct FixedLocationProvider {
    location: Location,
}

impl FixedLocationProvider {
    pub fn new(location: Location) -> Self {
        Self { location }
    }
}

#[async_trait]
impl LocationProvider for FixedLocationProvider {
    async fn locate(&self) -> Result<Location, InputCaptureError> {
        if !self.location.coordinates.is_valid() {
            return Err(InputCaptureError::LocationUnavailable(format!(
                "configured coordinates out of range: {}",
                self.location.coordinates
            )));
        }
        Ok(self.location.clone())
    }
}

/// Location turned off; behaves like a denied permission
pub struct UnavailableLocationProvider;

#[async_trait]
impl LocationProvider for UnavailableLocationProvider {
    async fn locate(&self) -> Result<Location, InputCaptureError> {
        Err(InputCaptureError::LocationDenied("location disabled in config".to_string()))
    }
}

/// Build the provider selected by configuration
pub fn provider_from_config(config: &LocationConfig) -> Box<dyn LocationProvider> {
    debug!(source = ?config.source, "provider_from_config: called");
    match config.source {
        LocationSource::Ip => Box::new(IpLocationProvider::new(config.lookup_url.clone())),
        LocationSource::Fixed => Box::new(FixedLocationProvider::new(Location {
            coordinates: config.fixed_coordinates(),
            label: config.label.clone(),
        })),
        LocationSource::Disabled => Box::new(UnavailableLocationProvider),
    }
}

/// A resolved location plus the advisory to show, if it is the fallback
#[derive(Debug, Clone, PartialEq)]
pub struct LocationFix {
    pub location: Location,
    pub advisory: Option<String>,
}

/// Ask the provider for a location, falling back on any failure
pub async fn resolve_location(provider: &dyn LocationProvider, timeout: Duration) -> LocationFix {
    debug!(?timeout, "resolve_location: called");
    let error = match tokio::time::timeout(timeout, provider.locate()).await {
        Ok(Ok(location)) => {
            info!(label = %location.label, "Location resolved");
            return LocationFix {
                location,
                advisory: None,
            };
        }
        Ok(Err(e)) => e,
        Err(_) => InputCaptureError::LocationUnavailable(format!("no answer within {:?}", timeout)),
    };

    warn!(error = %error, "Location unavailable, using fallback");
    LocationFix {
        location: Location::fallback(),
        advisory: Some(error.advisory()),
    }
}
