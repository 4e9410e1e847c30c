//! Error types for blueprint-llm

use thiserror::Error;

/// Errors a generation backend can report
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LlmError {
    /// Transport-level failure (connect, TLS, body decode)
    #[error("HTTP error: {0}")]
    Http(String),

    /// Non-success status returned by the API
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// Quota exhausted (HTTP 429)
    #[error("Rate limited: {0}")]
    RateLimited(String),

    /// Call did not finish in time
    #[error("Generation timed out after {0}s")]
    Timeout(u64),

    /// The model returned no text
    #[error("Model returned an empty response")]
    EmptyResponse,

    /// Response body did not have the expected shape
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Backend is missing credentials or configuration
    #[error("Backend is not configured: {0}")]
    NotConfigured(String),
}

impl From<reqwest::Error> for LlmError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            return LlmError::Http(format!("request timed out: {err}"));
        }
        LlmError::Http(err.to_string())
    }
}

impl From<serde_json::Error> for LlmError {
    fn from(err: serde_json::Error) -> Self {
        LlmError::InvalidResponse(err.to_string())
    }
}
