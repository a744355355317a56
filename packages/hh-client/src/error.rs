//! Error types for the HH API client.

use std::time::Duration;

use thiserror::Error;

/// Result type for HH client operations.
pub type Result<T> = std::result::Result<T, HhError>;

/// HH client errors.
///
/// Each failure class is its own variant so callers can pick a retry policy
/// per class: nothing is retried on `AuthFailed`, `RateLimited` and
/// `TransientNetwork` are retried with backoff.
#[derive(Debug, Error)]
pub enum HhError {
    /// Credential rejected (401 / 403)
    #[error("authentication failed (HTTP {status}): {message}")]
    AuthFailed { status: u16, message: String },

    /// The API is throttling this client (429)
    #[error("rate limited by the API (retry after {retry_after:?})")]
    RateLimited { retry_after: Option<Duration> },

    /// Connection failure, timeout or 5xx
    #[error("transient network error: {0}")]
    TransientNetwork(String),

    /// Body did not decode as the expected JSON document
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    /// Any other non-success status (bad request, not found, ...)
    #[error("API error (HTTP {status}): {message}")]
    Api { status: u16, message: String },

    /// Query rejected before it was sent
    #[error("invalid query: {0}")]
    InvalidQuery(#[from] QueryError),

    /// Client could not be built from the given configuration
    #[error("configuration error: {0}")]
    Config(String),
}

impl HhError {
    /// Whether repeating the same request later can succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            HhError::RateLimited { .. } | HhError::TransientNetwork(_)
        )
    }

    pub(crate) fn from_transport(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            HhError::TransientNetwork(format!("request timed out: {}", err))
        } else if err.is_builder() {
            HhError::Config(err.to_string())
        } else {
            HhError::TransientNetwork(err.to_string())
        }
    }
}

/// Validation failures raised by [`crate::SearchQuery`] construction.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
    #[error("{field} must be a numeric code, got {value:?}")]
    InvalidCode { field: &'static str, value: String },

    #[error("per_page must be between 1 and {max}, got {value}")]
    PageSize { value: u32, max: u32 },

    #[error("free-text query must not contain control characters")]
    ControlCharacters,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classes() {
        assert!(HhError::RateLimited { retry_after: None }.is_retryable());
        assert!(HhError::TransientNetwork("reset".into()).is_retryable());

        assert!(!HhError::AuthFailed {
            status: 401,
            message: String::new()
        }
        .is_retryable());
        assert!(!HhError::MalformedResponse("eof".into()).is_retryable());
        assert!(!HhError::Api {
            status: 400,
            message: String::new()
        }
        .is_retryable());
    }
}
