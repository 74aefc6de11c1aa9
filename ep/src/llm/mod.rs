//! Plan service client module for errandplan
//!
//! The adapter boundary to the external generative-AI service: text in,
//! text plus citation metadata out.

use std::sync::Arc;

use tracing::debug;

pub mod client;
mod error;
mod gemini;
mod types;

pub use client::LlmClient;
pub use error::LlmError;
pub use gemini::GeminiClient;
pub use types::{CitationCandidate, GenerateRequest, RawResponse};

use crate::config::LlmConfig;

/// Create a plan service client based on the provider specified in config
pub fn create_client(config: &LlmConfig) -> Result<Arc<dyn LlmClient>, LlmError> {
    debug!(provider = %config.provider, model = %config.model, "create_client: called");
    match config.provider.as_str() {
        "gemini" => {
            debug!("create_client: creating Gemini client");
            Ok(Arc::new(GeminiClient::from_config(config)?))
        }
        other => {
            debug!(provider = %other, "create_client: unknown provider");
            Err(LlmError::Config(format!(
                "Unknown plan service provider: '{}'. Supported: gemini",
                other
            )))
        }
    }
}
