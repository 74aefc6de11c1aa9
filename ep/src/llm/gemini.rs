//! Gemini API client implementation
//!
//! Implements the LlmClient trait for the Generative Language API
//! `generateContent` endpoint with the Google Maps grounding tool enabled.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

use super::{CitationCandidate, GenerateRequest, LlmClient, LlmError, RawResponse};
use crate::config::LlmConfig;

/// Initial backoff delay for retries
const INITIAL_BACKOFF_MS: u64 = 1000;

/// Gemini API client
pub struct GeminiClient {
    model: String,
    api_key: String,
    base_url: String,
    http: Client,
    max_retries: u32,
    timeout: Duration,
}

impl GeminiClient {
    /// Create a new client from configuration
    ///
    /// Reads the API key from the environment variable named in the config.
    pub fn from_config(config: &LlmConfig) -> Result<Self, LlmError> {
        debug!(model = %config.model, base_url = %config.base_url, "from_config: called");
        let api_key = config
            .get_api_key()
            .map_err(|e| LlmError::Config(e.to_string()))?;

        let timeout = Duration::from_millis(config.timeout_ms);

        let http = Client::builder().timeout(timeout).build().map_err(LlmError::Network)?;

        Ok(Self {
            model: config.model.clone(),
            api_key,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            http,
            max_retries: config.max_retries,
            timeout,
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/v1beta/models/{}:generateContent", self.base_url, self.model)
    }

    /// Build the request body for the Gemini API
    fn build_request_body(&self, request: &GenerateRequest) -> Value {
        debug!(%self.model, prompt_len = request.prompt.len(), "build_request_body: called");

        let mut body = serde_json::json!({
            "contents": [{
                "role": "user",
                "parts": [{ "text": request.prompt }],
            }],
            "tools": [{ "googleMaps": {} }],
        });

        if let Some(location) = request.location {
            debug!(%location, "build_request_body: adding retrieval location");
            body["toolConfig"] = serde_json::json!({
                "retrievalConfig": {
                    "latLng": {
                        "latitude": location.latitude,
                        "longitude": location.longitude,
                    }
                }
            });
        } else {
            debug!("build_request_body: no location hint");
        }

        body
    }

    /// Parse the Gemini API response
    ///
    /// Only the first candidate is used. Its text parts are concatenated;
    /// grounding chunks become citation candidates.
    fn parse_response(api_response: GeminiResponse) -> RawResponse {
        debug!(candidate_count = api_response.candidates.len(), "parse_response: called");
        let Some(candidate) = api_response.candidates.into_iter().next() else {
            debug!("parse_response: no candidates");
            return RawResponse::default();
        };

        let text = candidate
            .content
            .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect::<String>())
            .unwrap_or_default();

        let citations = candidate
            .grounding_metadata
            .as_ref()
            .map(citations_from_metadata)
            .unwrap_or_default();

        debug!(text_len = text.len(), citation_count = citations.len(), "parse_response: parsed");
        RawResponse { text, citations }
    }

    /// Decode a saved `generateContent` response body
    pub fn decode_response(body: &Value) -> Result<RawResponse, LlmError> {
        let api_response: GeminiResponse = serde_json::from_value(body.clone())?;
        Ok(Self::parse_response(api_response))
    }
}

/// Pull citation candidates out of `groundingMetadata`
///
/// `groundingChunks` entries carry either a `maps` or a `web` source. A missing
/// or non-array field yields no candidates.
fn citations_from_metadata(metadata: &Value) -> Vec<CitationCandidate> {
    let Some(chunks) = metadata.get("groundingChunks").and_then(Value::as_array) else {
        debug!("citations_from_metadata: no groundingChunks array");
        return Vec::new();
    };

    chunks
        .iter()
        .map(|chunk| {
            let source = chunk.get("maps").or_else(|| chunk.get("web"));
            CitationCandidate::new(
                source.and_then(|s| s.get("title")).and_then(Value::as_str),
                source.and_then(|s| s.get("uri")).and_then(Value::as_str),
            )
        })
        .collect()
}

#[async_trait]
impl LlmClient for GeminiClient {
    async fn generate(&self, request: GenerateRequest) -> Result<RawResponse, LlmError> {
        debug!(%self.model, "generate: called");
        let url = self.endpoint();
        let body = self.build_request_body(&request);

        let mut last_error = None;
        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let backoff = INITIAL_BACKOFF_MS * 2u64.pow(attempt - 1);
                warn!(attempt, backoff_ms = backoff, "generate: retrying after transient error");
                tokio::time::sleep(Duration::from_millis(backoff)).await;
            }

            let err = match self
                .http
                .post(&url)
                .header("x-goog-api-key", &self.api_key)
                .header("content-type", "application/json")
                .json(&body)
                .send()
                .await
            {
                Ok(response) if response.status().is_success() => {
                    debug!("generate: success");
                    let api_response: GeminiResponse = response.json().await.map_err(|e| {
                        if e.is_timeout() {
                            LlmError::Timeout(self.timeout)
                        } else {
                            LlmError::Network(e)
                        }
                    })?;
                    return Ok(Self::parse_response(api_response));
                }
                Ok(response) => {
                    let status = response.status().as_u16();
                    let retry_after = response
                        .headers()
                        .get("retry-after")
                        .and_then(|v| v.to_str().ok())
                        .and_then(|s| s.parse::<u64>().ok())
                        .map(Duration::from_secs);
                    let text = response.text().await.unwrap_or_default();
                    LlmError::from_status(status, text, retry_after)
                }
                Err(e) if e.is_timeout() => LlmError::Timeout(self.timeout),
                Err(e) => LlmError::Network(e),
            };

            if err.is_retryable() && attempt < self.max_retries {
                debug!(attempt, error = %err, "generate: transient failure");
                last_error = Some(err);
                continue;
            }

            debug!(attempt, error = %err, "generate: giving up");
            return Err(err);
        }

        Err(last_error.unwrap_or_else(|| LlmError::InvalidResponse("no attempts made".to_string())))
    }

    fn describe(&self) -> String {
        format!("gemini/{}", self.model)
    }
}

// Gemini API response types

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiCandidate {
    content: Option<GeminiContent>,
    grounding_metadata: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct GeminiContent {
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Deserialize)]
struct GeminiPart {
    text: Option<String>,
}
