//! Plan service request/response types
//!
//! Provider-agnostic: a prompt and a location hint go in, free text and
//! optional citation candidates come out. Nothing here interprets plan content.

use serde::{Deserialize, Serialize};

use crate::domain::Coordinates;

/// Everything needed for one generation call
#[derive(Debug, Clone)]
pub struct GenerateRequest {
    /// Fully composed prompt text
    pub prompt: String,

    /// Coordinates the service should ground results against
    pub location: Option<Coordinates>,
}

impl GenerateRequest {
    pub fn new(prompt: impl Into<String>, location: Option<Coordinates>) -> Self {
        Self {
            prompt: prompt.into(),
            location,
        }
    }
}

/// A citation the service attached to its answer; either half may be missing
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CitationCandidate {
    pub title: Option<String>,
    pub uri: Option<String>,
}

impl CitationCandidate {
    pub fn new(title: Option<&str>, uri: Option<&str>) -> Self {
        Self {
            title: title.map(str::to_string),
            uri: uri.map(str::to_string),
        }
    }
}

/// Raw, uninterpreted service response
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawResponse {
    /// Text payload, expected to contain one JSON object
    pub text: String,

    /// Citation metadata, a separate channel from `text`
    #[serde(default)]
    pub citations: Vec<CitationCandidate>,
}

impl RawResponse {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            citations: Vec::new(),
        }
    }

    pub fn with_citations(mut self, citations: Vec<CitationCandidate>) -> Self {
        self.citations = citations;
        self
    }
}
