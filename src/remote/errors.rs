//! Remote Store Error Types
//!
//! Structured error handling for object-store operations.
//! Maps HTTP status codes to specific variants for retry decisions.

/// Remote object-store error types
#[derive(Debug, Clone, thiserror::Error)]
pub enum RemoteError {
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Rate limited, try again after backoff")]
    RateLimited,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Server error ({0}): {1}")]
    Server(u16, String),

    #[error("Request timeout")]
    Timeout,

    #[error("Request error: {0}")]
    Request(String),

    #[error("Malformed response: {0}")]
    Decode(String),
}

impl RemoteError {
    /// Whether this error is retryable
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            RemoteError::RateLimited
                | RemoteError::Timeout
                | RemoteError::Network(_)
                | RemoteError::Server(_, _)
        )
    }

    /// Whether the credential itself was rejected
    pub fn is_auth_failure(&self) -> bool {
        matches!(self, RemoteError::Unauthorized(_) | RemoteError::Forbidden(_))
    }

    /// Create a RemoteError from an HTTP status code and response body
    pub fn from_status(status: u16, body: &str) -> Self {
        match status {
            400 if body.contains("bad_auth_token") => RemoteError::Unauthorized(body.to_string()),
            401 => RemoteError::Unauthorized(body.to_string()),
            403 => RemoteError::Forbidden(body.to_string()),
            404 => RemoteError::NotFound(body.to_string()),
            408 => RemoteError::Timeout,
            429 => RemoteError::RateLimited,
            500..=599 => RemoteError::Server(status, body.to_string()),
            _ => RemoteError::Request(format!("HTTP {}: {}", status, body)),
        }
    }
}

impl From<reqwest::Error> for RemoteError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            RemoteError::Timeout
        } else if e.is_decode() {
            RemoteError::Decode(e.to_string())
        } else if e.is_connect() || e.is_request() {
            RemoteError::Network(e.to_string())
        } else {
            RemoteError::Request(e.to_string())
        }
    }
}
