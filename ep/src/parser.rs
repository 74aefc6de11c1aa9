//! Response parser
//!
//! Turns the service's untyped text payload into a validated `ErrandPlan`.
//! The payload is free text that is expected to contain one JSON object,
//! possibly fenced in markdown and surrounded by prose. Nothing here touches
//! application state: a failure simply returns before anything is committed.

use thiserror::Error;
use tracing::debug;

use crate::domain::{ErrandPlan, GroundingLink};
use crate::llm::{CitationCandidate, RawResponse};

/// Title given to citations that carry a URI but no title
pub const UNTITLED_SOURCE: &str = "Source";

/// Why a response could not be turned into a plan
#[derive(Debug, Error)]
pub enum ParseError {
    /// No `{ ... }` span in the payload
    #[error("response contained no plan data")]
    NoPlanData,

    /// The span is not a JSON object of the expected shape
    #[error("plan data is malformed: {0}")]
    MalformedPlan(#[from] serde_json::Error),

    /// Decoded, but breaks a plan invariant
    #[error("plan data is invalid: {0}")]
    InvalidPlan(String),
}

/// Remove markdown code-fence markers, tolerating their absence
pub fn strip_code_fences(text: &str) -> String {
    text.replace("```json", "").replace("```JSON", "").replace("```", "")
}

/// Slice from the first `{` to the last `}` inclusive
pub fn extract_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end < start {
        return None;
    }
    Some(&text[start..=end])
}

/// Decode the plan embedded in a response text payload
pub fn parse_plan(text: &str) -> Result<ErrandPlan, ParseError> {
    debug!(text_len = text.len(), "parse_plan: called");
    let cleaned = strip_code_fences(text);
    let cleaned = cleaned.trim();

    let Some(json) = extract_json_object(cleaned) else {
        debug!("parse_plan: no braces found");
        return Err(ParseError::NoPlanData);
    };

    let plan: ErrandPlan = serde_json::from_str(json)?;
    plan.validate().map_err(ParseError::InvalidPlan)?;

    debug!(stop_count = plan.stops.len(), "parse_plan: decoded plan");
    Ok(plan)
}

/// Keep citations that have a usable URI
pub fn extract_links(candidates: &[CitationCandidate]) -> Vec<GroundingLink> {
    debug!(candidate_count = candidates.len(), "extract_links: called");
    candidates
        .iter()
        .filter_map(|c| {
            let uri = c.uri.as_deref().map(str::trim).filter(|u| !u.is_empty())?;
            let title = c
                .title
                .as_deref()
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .unwrap_or(UNTITLED_SOURCE);
            Some(GroundingLink {
                title: title.to_string(),
                uri: uri.to_string(),
            })
        })
        .collect()
}

/// Parse a full service response into a plan and its citations
///
/// Citations are only extracted once the plan decodes, so a failure yields
/// neither.
pub fn ingest(response: &RawResponse) -> Result<(ErrandPlan, Vec<GroundingLink>), ParseError> {
    let plan = parse_plan(&response.text)?;
    let links = extract_links(&response.citations);
    Ok((plan, links))
}
