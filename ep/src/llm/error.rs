//! Plan service errors

use std::time::Duration;
use thiserror::Error;

/// Failure of a single call to the plan service
#[derive(Debug, Error)]
pub enum LlmError {
    /// Client could not be built from configuration
    #[error("Plan service misconfigured: {0}")]
    Config(String),

    #[error("Plan service quota exceeded, retry after {retry_after:?}")]
    RateLimited { retry_after: Duration },

    #[error("Plan service returned HTTP {status}: {message}")]
    ApiError { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Unusable response: {0}")]
    InvalidResponse(String),

    #[error("No answer after {0:?}")]
    Timeout(Duration),

    #[error("Response body is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

impl LlmError {
    /// Classify a non-success HTTP status
    ///
    /// 429 becomes `RateLimited`, using `retry_after` when the server sent one.
    pub fn from_status(status: u16, message: String, retry_after: Option<Duration>) -> Self {
        match status {
            429 => Self::RateLimited {
                retry_after: retry_after.unwrap_or(Duration::from_secs(60)),
            },
            _ => Self::ApiError { status, message },
        }
    }

    /// Worth another attempt when retries are configured
    ///
    /// Quota errors are surfaced immediately rather than retried.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::ApiError { status, .. } => matches!(status, 408 | 500 | 502 | 503 | 504),
            Self::Network(_) | Self::Timeout(_) => true,
            Self::Config(_) | Self::RateLimited { .. } | Self::InvalidResponse(_) | Self::Json(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn api(status: u16) -> LlmError {
        LlmError::from_status(status, "body".to_string(), None)
    }

    #[test]
    fn test_from_status_rate_limit() {
        let err = LlmError::from_status(429, String::new(), Some(Duration::from_secs(7)));
        assert!(matches!(err, LlmError::RateLimited { retry_after } if retry_after == Duration::from_secs(7)));

        let err = api(429);
        assert!(matches!(err, LlmError::RateLimited { retry_after } if retry_after == Duration::from_secs(60)));
    }

    #[test]
    fn test_transient_statuses_retry() {
        for status in [408, 500, 502, 503, 504] {
            assert!(api(status).is_retryable(), "status {} should retry", status);
        }
        assert!(LlmError::Timeout(Duration::from_secs(30)).is_retryable());
    }

    #[test]
    fn test_permanent_failures_do_not_retry() {
        for status in [400, 401, 403, 404, 429, 501] {
            assert!(!api(status).is_retryable(), "status {} should not retry", status);
        }
        assert!(!LlmError::Config("GEMINI_API_KEY not set".to_string()).is_retryable());
        assert!(!LlmError::InvalidResponse("no candidates".to_string()).is_retryable());
    }
}
