//! Storage trait definitions for blueprint execution logs
//!
//! - `ExecutionLog`: append-only run journal (stage records, sections, summary)
//! - `ContentDigest`: SHA-256 digest used to fingerprint generated documents
//!
//! All traits are async and backend-agnostic. An in-memory fake is provided
//! for testing via the `fakes` module.

use std::path::PathBuf;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use crate::error::StorageError;

/// Result type for storage operations
pub type StorageResult<T> = std::result::Result<T, StorageError>;

// ---------------------------------------------------------------------------
// ContentDigest
// ---------------------------------------------------------------------------

/// Content digest (SHA-256 hex string).
///
/// The inner field is private to guarantee the string is always valid
/// lowercase hex produced by `from_bytes` or validated via `TryFrom<String>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContentDigest(String);

impl ContentDigest {
    /// Compute the SHA-256 digest of the given bytes.
    pub fn from_bytes(data: &[u8]) -> Self {
        use sha2::Digest;
        let mut hasher = Sha256::new();
        hasher.update(data);
        ContentDigest(hex::encode(hasher.finalize()))
    }

    /// Return the full hex string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Short form (first 12 hex chars).
    pub fn short(&self) -> &str {
        &self.0[..12.min(self.0.len())]
    }
}

impl TryFrom<String> for ContentDigest {
    type Error = StorageError;

    fn try_from(s: String) -> std::result::Result<Self, Self::Error> {
        if s.len() != 64 || !s.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(StorageError::InvalidDigest { digest: s });
        }
        Ok(ContentDigest(s.to_ascii_lowercase()))
    }
}

impl std::fmt::Display for ContentDigest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Run records
// ---------------------------------------------------------------------------

/// Unique identifier for a design run
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RunId(pub String);

impl RunId {
    /// Generate a new random RunId
    pub fn new() -> Self {
        RunId(uuid::Uuid::new_v4().to_string())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Metadata attached to a run when it is started
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunMetadata {
    /// Key of the requirement being designed
    pub requirement_key: String,
    /// Provider identifier (e.g. "AWS")
    pub provider: String,
    /// Start timestamp
    pub started_at: DateTime<Utc>,
}

impl RunMetadata {
    pub fn new(requirement_key: impl Into<String>, provider: impl Into<String>) -> Self {
        Self {
            requirement_key: requirement_key.into(),
            provider: provider.into(),
            started_at: Utc::now(),
        }
    }
}

/// One generation stage: the prompt sent and the raw text received
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageRecord {
    /// Stage name (e.g. "overview", "specialized:state")
    pub stage: String,
    pub prompt: String,
    pub response: String,
    pub recorded_at: DateTime<Utc>,
}

impl StageRecord {
    pub fn new(
        stage: impl Into<String>,
        prompt: impl Into<String>,
        response: impl Into<String>,
    ) -> Self {
        Self {
            stage: stage.into(),
            prompt: prompt.into(),
            response: response.into(),
            recorded_at: Utc::now(),
        }
    }
}

/// Status of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunStatus {
    InProgress,
    Completed,
    Failed,
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            RunStatus::InProgress => "IN_PROGRESS",
            RunStatus::Completed => "COMPLETED",
            RunStatus::Failed => "FAILED",
        };
        f.write_str(s)
    }
}

/// Summary written when a run finishes
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionSummary {
    pub requirement_key: String,
    pub provider: String,
    /// Number of diagrams in the final design
    pub diagrams_count: usize,
    /// Terminal status (`Completed` or `Failed`)
    pub status: RunStatus,
    pub duration_ms: u64,
    /// Where the design document was written, if it was
    pub document_path: Option<PathBuf>,
    /// Digest of the rendered design document
    pub document_digest: Option<ContentDigest>,
    /// Error text for failed runs
    pub error: Option<String>,
}

impl ExecutionSummary {
    /// Summary for a run that completed and produced `diagrams_count` diagrams.
    pub fn completed(
        requirement_key: impl Into<String>,
        provider: impl Into<String>,
        diagrams_count: usize,
        duration_ms: u64,
    ) -> Self {
        Self {
            requirement_key: requirement_key.into(),
            provider: provider.into(),
            diagrams_count,
            status: RunStatus::Completed,
            duration_ms,
            document_path: None,
            document_digest: None,
            error: None,
        }
    }

    /// Summary for a run that aborted with `error`.
    pub fn failed(
        requirement_key: impl Into<String>,
        provider: impl Into<String>,
        duration_ms: u64,
        error: impl Into<String>,
    ) -> Self {
        Self {
            requirement_key: requirement_key.into(),
            provider: provider.into(),
            diagrams_count: 0,
            status: RunStatus::Failed,
            duration_ms,
            document_path: None,
            document_digest: None,
            error: Some(error.into()),
        }
    }
}

// ---------------------------------------------------------------------------
// ExecutionLog
// ---------------------------------------------------------------------------

/// Append-only journal of design runs.
///
/// Guarantees:
/// - Records are accepted only between `start_run` and `finish_run`.
/// - `finish_run` is terminal; later writes fail with `InvalidRunState`.
/// - Writes for an unknown run fail with `RunNotFound`.
#[async_trait]
pub trait ExecutionLog: Send + Sync {
    /// Open a run. The run starts in `RunStatus::InProgress`.
    async fn start_run(&self, run_id: &RunId, metadata: RunMetadata) -> StorageResult<()>;

    /// Append one generation stage (prompt and raw response).
    async fn record_stage(&self, run_id: &RunId, record: StageRecord) -> StorageResult<()>;

    /// Append a titled free-form section.
    async fn record_section(&self, run_id: &RunId, title: &str, body: &str) -> StorageResult<()>;

    /// Close the run with its summary.
    async fn finish_run(&self, run_id: &RunId, summary: ExecutionSummary) -> StorageResult<()>;
}
