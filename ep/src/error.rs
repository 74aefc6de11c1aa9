//! Error taxonomy at the plan controller boundary
//!
//! Every failure in a request cycle ends up as a `PlanError`, which maps to
//! one display-ready message. Input capture problems never reach the
//! controller; they degrade to an advisory. None of these are fatal.

use std::time::Duration;

use thiserror::Error;

use crate::domain::FALLBACK_LABEL;
use crate::llm::LlmError;
use crate::parser::ParseError;

/// Microphone or geolocation problems; recovered locally
#[derive(Debug, Clone, Error)]
pub enum InputCaptureError {
    #[error("microphone access denied: {0}")]
    MicrophoneDenied(String),

    #[error("voice input is not available")]
    SpeechUnavailable,

    #[error("speech recognition failed: {0}")]
    Recognition(String),

    #[error("location access denied: {0}")]
    LocationDenied(String),

    #[error("location unavailable: {0}")]
    LocationUnavailable(String),
}

impl InputCaptureError {
    /// Advisory text shown to the user; never blocks the session
    pub fn advisory(&self) -> String {
        match self {
            Self::MicrophoneDenied(_) => "Microphone access was denied. You can still type your errands.".to_string(),
            Self::SpeechUnavailable => "Voice input is not available here.".to_string(),
            Self::Recognition(reason) => format!("Didn't catch that ({}). Try again or type instead.", reason),
            Self::LocationDenied(_) | Self::LocationUnavailable(_) => {
                format!("Could not get your location; planning from {}.", FALLBACK_LABEL)
            }
        }
    }
}

/// Failure of one plan generation cycle
#[derive(Debug, Error)]
pub enum PlanError {
    #[error("failed to build prompt: {0}")]
    Prompt(String),

    #[error("plan service failed: {0}")]
    Service(LlmError),

    #[error("plan service timed out after {0:?}")]
    Timeout(Duration),

    #[error("response contained no plan data")]
    NoPlanData,

    #[error("plan data is malformed: {0}")]
    MalformedPlan(String),
}

impl From<LlmError> for PlanError {
    fn from(err: LlmError) -> Self {
        match err {
            LlmError::Timeout(after) => Self::Timeout(after),
            other => Self::Service(other),
        }
    }
}

impl From<ParseError> for PlanError {
    fn from(err: ParseError) -> Self {
        match err {
            ParseError::NoPlanData => Self::NoPlanData,
            ParseError::MalformedPlan(e) => Self::MalformedPlan(e.to_string()),
            ParseError::InvalidPlan(reason) => Self::MalformedPlan(reason),
        }
    }
}

impl PlanError {
    /// Single user-facing message for this failure
    pub fn user_message(&self) -> String {
        match self {
            Self::Prompt(_) => "Could not prepare the request. Check your prompt template.".to_string(),
            Self::Service(LlmError::RateLimited { retry_after }) => format!(
                "The planning service is busy. Try again in {} seconds.",
                retry_after.as_secs()
            ),
            Self::Service(_) => "Failed to generate a plan. Please try again.".to_string(),
            Self::Timeout(_) => "The planning service took too long to answer. Please try again.".to_string(),
            Self::NoPlanData => "The planner didn't return a plan. Try rephrasing your errands.".to_string(),
            Self::MalformedPlan(_) => "The planner returned a plan we couldn't read. Please try again.".to_string(),
        }
    }
}
