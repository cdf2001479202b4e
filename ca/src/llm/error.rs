//! Failures from a provider call

use std::time::Duration;
use thiserror::Error;

/// Retry-After used when a 429 carries no usable header
pub const DEFAULT_RATE_LIMIT_WAIT: Duration = Duration::from_secs(60);

#[derive(Debug, Error)]
pub enum LlmError {
    /// The provider answered 429; the call is abandoned, not retried
    #[error("provider is rate limiting requests (retry in {retry_after:?})")]
    RateLimited { retry_after: Duration },

    #[error("provider returned HTTP {status}: {message}")]
    ApiError { status: u16, message: String },

    #[error("could not reach provider: {0}")]
    Network(#[from] reqwest::Error),

    #[error("no reply within {0:?}")]
    Timeout(Duration),

    #[error("unusable provider reply: {0}")]
    InvalidResponse(String),

    #[error("malformed JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("missing API key: {0}")]
    MissingApiKey(String),

    /// Settings that cannot produce a client, such as an unknown provider
    #[error("bad LLM configuration: {0}")]
    Config(String),
}

impl LlmError {
    /// Error for a non-success HTTP status
    pub fn from_status(status: u16, body: String, retry_after: Option<Duration>) -> Self {
        if status == 429 {
            return Self::RateLimited {
                retry_after: retry_after.unwrap_or(DEFAULT_RATE_LIMIT_WAIT),
            };
        }
        Self::ApiError { status, message: body }
    }

    /// Whether the same request might succeed later
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::RateLimited { .. } | Self::Network(_) | Self::Timeout(_) => true,
            Self::ApiError { status, .. } => *status >= 500,
            Self::InvalidResponse(_) | Self::Json(_) | Self::MissingApiKey(_) | Self::Config(_) => false,
        }
    }

    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::RateLimited { retry_after } => Some(*retry_after),
            _ => None,
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
    fn test_from_status_maps_429_to_rate_limit() {
        let err = LlmError::from_status(429, String::new(), Some(Duration::from_secs(7)));
        assert_eq!(err.retry_after(), Some(Duration::from_secs(7)));

        assert_eq!(api(429).retry_after(), Some(DEFAULT_RATE_LIMIT_WAIT));
        assert!(matches!(api(502), LlmError::ApiError { status: 502, .. }));
    }

    #[test]
    fn test_retryable_classes() {
        assert!(api(429).is_retryable());
        assert!(api(503).is_retryable());
        assert!(!api(401).is_retryable());
        assert!(LlmError::Timeout(Duration::from_secs(30)).is_retryable());
        assert!(!LlmError::InvalidResponse("empty".to_string()).is_retryable());
        assert!(!LlmError::MissingApiKey("ANTHROPIC_API_KEY".to_string()).is_retryable());
        assert!(!LlmError::Config("provider".to_string()).is_retryable());
    }

    #[test]
    fn test_display_mentions_status() {
        assert_eq!(api(400).to_string(), "provider returned HTTP 400: body");
        assert_eq!(api(400).retry_after(), None);
    }
}
