//! Error types for blueprint-ledger

use thiserror::Error;

/// Errors that can occur while writing execution logs
#[derive(Error, Debug)]
pub enum StorageError {
    /// Run was never started in this sink
    #[error("Run not found: {run_id}")]
    RunNotFound { run_id: String },

    /// Run exists but is not accepting writes
    #[error("Run {run_id} is {status}, expected {expected}")]
    InvalidRunState {
        run_id: String,
        status: String,
        expected: String,
    },

    /// Digest string is not 64 hex characters
    #[error("Invalid content digest: {digest}")]
    InvalidDigest { digest: String },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("Serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}
