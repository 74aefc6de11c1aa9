//! ErrandPlan domain type
//!
//! The structured itinerary returned by the plan service. Field names and enum
//! values are a wire contract with the prompt in `prompts/plan.pmt`; renaming
//! either side without the other breaks decoding.

use std::collections::HashSet;

use serde::{Deserialize, Deserializer, Serialize};
use tracing::debug;

/// How hard it is to park near a stop
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ParkingDifficulty {
    #[serde(alias = "easy", alias = "EASY")]
    Easy,
    #[serde(alias = "moderate", alias = "MODERATE")]
    Moderate,
    #[serde(alias = "difficult", alias = "DIFFICULT")]
    Difficult,
}

impl std::fmt::Display for ParkingDifficulty {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Easy => write!(f, "Easy"),
            Self::Moderate => write!(f, "Moderate"),
            Self::Difficult => write!(f, "Difficult"),
        }
    }
}

/// Expected crowd level at a stop around the arrival estimate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CrowdLevel {
    #[serde(alias = "low", alias = "LOW")]
    Low,
    #[serde(alias = "medium", alias = "MEDIUM")]
    Medium,
    #[serde(alias = "high", alias = "HIGH")]
    High,
}

impl std::fmt::Display for CrowdLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Low => write!(f, "Low"),
            Self::Medium => write!(f, "Medium"),
            Self::High => write!(f, "High"),
        }
    }
}

/// One planned destination
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrandStop {
    /// Opaque identifier, unique within the owning plan
    #[serde(deserialize_with = "deserialize_id")]
    pub id: String,

    pub name: String,

    pub address: String,

    pub category: String,

    /// Why this stop was chosen
    pub reason: String,

    /// Free-text time label ("10:15 AM"), not a parsed timestamp
    pub arrival_estimate: String,

    pub parking_difficulty: ParkingDifficulty,

    pub crowd_level: CrowdLevel,

    /// Not validated
    pub google_maps_url: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parking_advice: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub traffic_note: Option<String>,
}

/// A suggested substitution for one of the requested errands
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Alternative {
    pub original: String,
    pub suggested: String,
    pub benefit: String,
}

/// One complete plan, replaced wholesale on every successful generation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrandPlan {
    pub summary: String,

    /// Visit order; never renumbered
    pub stops: Vec<ErrandStop>,

    pub total_time: String,

    /// Nominally 0-100, not range-enforced
    pub efficiency_score: f64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alternatives: Option<Vec<Alternative>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub household_suggestions: Option<Vec<String>>,

    pub reasoning: String,
}

impl ErrandPlan {
    /// Check invariants serde cannot express
    ///
    /// Returns the first duplicated stop id, if any.
    pub fn validate(&self) -> Result<(), String> {
        debug!(stop_count = self.stops.len(), "ErrandPlan::validate: called");
        let mut seen = HashSet::new();
        for stop in &self.stops {
            if !seen.insert(stop.id.as_str()) {
                debug!(id = %stop.id, "ErrandPlan::validate: duplicate stop id");
                return Err(format!("duplicate stop id '{}'", stop.id));
            }
        }
        Ok(())
    }
}

/// A citation the service attributes to a real-world data source
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroundingLink {
    pub title: String,
    pub uri: String,
}

/// Models are inconsistent about ids; accept `"1"` and `1` alike
fn deserialize_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Text(String),
        Int(i64),
        UInt(u64),
        Float(f64),
    }

    match RawId::deserialize(deserializer)? {
        RawId::Text(s) => Ok(s),
        RawId::Int(n) => Ok(n.to_string()),
        RawId::UInt(n) => Ok(n.to_string()),
        // 1.0 reads as "1"
        RawId::Float(n) if n.is_finite() && n.fract() == 0.0 => Ok(format!("{:.0}", n)),
        RawId::Float(n) => Ok(n.to_string()),
    }
}
