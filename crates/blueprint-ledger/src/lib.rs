//! Blueprint-Ledger: execution log sink for design runs
//!
//! Every design run streams its stage records (prompt + raw response), free
//! form sections and a final summary into an [`ExecutionLog`]. The pipeline
//! treats the sink as write-only: nothing it returns feeds back into diagram
//! generation.
//!
//! ## Key Components
//!
//! - `ExecutionLog`: async sink trait
//! - `MarkdownExecutionLog`: one markdown file per run
//! - `fakes::MemoryExecutionLog`: in-memory sink for tests

mod error;
pub mod fakes;
pub mod markdown_log;
pub mod storage_traits;

pub use error::StorageError;
pub use markdown_log::MarkdownExecutionLog;
pub use storage_traits::{
    ContentDigest, ExecutionLog, ExecutionSummary, RunId, RunMetadata, RunStatus, StageRecord,
    StorageResult,
};
