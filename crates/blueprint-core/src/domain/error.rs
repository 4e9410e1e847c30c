//! Domain-level error taxonomy for blueprint.

use blueprint_ledger::StorageError;
use blueprint_llm::LlmError;

/// Errors that abort a design run.
#[derive(Debug, thiserror::Error)]
pub enum DesignError {
    #[error("requirement not found: {0}")]
    RequirementNotFound(String),

    #[error("unsupported provider: {0} (expected aws or gcp)")]
    UnsupportedProvider(String),

    #[error("stage {stage} failed: {source}")]
    StageFailed {
        stage: String,
        #[source]
        source: LlmError,
    },

    #[error("invalid requirement {key}: {reason}")]
    InvalidRequirement { key: String, reason: String },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for blueprint domain operations.
pub type Result<T> = std::result::Result<T, DesignError>;
