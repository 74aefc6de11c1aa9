//! errandplan - maps-grounded errand planner
//!
//! Collects a free-text (or dictated) list of errands and the user's location,
//! asks a maps-grounded generative-AI service for an optimized multi-stop
//! route, and parses the reply into a typed plan with cited sources.
//!
//! # Modules
//!
//! - [`domain`] - Plan, stop, location and history types
//! - [`input`] - Request text, voice capture and location capture
//! - [`prompts`] - Prompt templates and the request composer
//! - [`llm`] - Plan service trait and Gemini implementation
//! - [`parser`] - Defensive extraction of the plan from response text
//! - [`controller`] - Request cycles and plan state
//! - [`render`] - Terminal and JSON output
//! - [`config`] - Configuration types and loading
//! - [`cli`] - Command-line interface

pub mod cli;
pub mod config;
pub mod controller;
pub mod domain;
pub mod error;
pub mod input;
pub mod links;
pub mod llm;
pub mod parser;
pub mod prompts;
pub mod render;
pub mod repl;

// Re-export commonly used types
pub use config::{Config, LlmConfig};
pub use controller::{CycleOutcome, PlanController, PlanState};
pub use domain::{Coordinates, ErrandPlan, ErrandStop, GroundingLink, Location, RequestHistory};
pub use error::{InputCaptureError, PlanError};
pub use llm::{GeminiClient, LlmClient, LlmError, RawResponse, create_client};
pub use parser::{ParseError, ingest};
pub use prompts::{PlanMode, RequestComposer};
