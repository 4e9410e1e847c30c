//! Markdown-file execution log.
//!
//! Each run gets its own `EXECUTION_<requirement>_<timestamp>.md` file inside
//! the configured directory. Writes are appends; the file is never rewritten.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::Utc;
use tokio::io::AsyncWriteExt;
use tracing::debug;

use crate::error::StorageError;
use crate::storage_traits::*;

#[derive(Debug, Clone)]
struct OpenRun {
    path: PathBuf,
    status: RunStatus,
}

/// Execution log that writes one markdown file per run.
#[derive(Debug)]
pub struct MarkdownExecutionLog {
    dir: PathBuf,
    runs: Mutex<HashMap<String, OpenRun>>,
}

impl MarkdownExecutionLog {
    /// Create a sink writing into `dir`. The directory is created lazily on
    /// the first `start_run`.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            runs: Mutex::new(HashMap::new()),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the file backing `run_id`, if the run was started here.
    pub fn path_for(&self, run_id: &RunId) -> Option<PathBuf> {
        self.lock().get(&run_id.0).map(|r| r.path.clone())
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, OpenRun>> {
        self.runs.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn open_path(&self, run_id: &RunId) -> StorageResult<PathBuf> {
        let runs = self.lock();
        let run = runs.get(&run_id.0).ok_or_else(|| StorageError::RunNotFound {
            run_id: run_id.0.clone(),
        })?;
        if run.status != RunStatus::InProgress {
            return Err(StorageError::InvalidRunState {
                run_id: run_id.0.clone(),
                status: run.status.to_string(),
                expected: RunStatus::InProgress.to_string(),
            });
        }
        Ok(run.path.clone())
    }

    async fn append(path: &Path, text: &str) -> StorageResult<()> {
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .await?;
        file.write_all(text.as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }
}

/// Keep file names portable: anything outside `[A-Za-z0-9_-]` becomes `_`.
fn sanitize_key(key: &str) -> String {
    key.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

#[async_trait]
impl ExecutionLog for MarkdownExecutionLog {
    async fn start_run(&self, run_id: &RunId, metadata: RunMetadata) -> StorageResult<()> {
        if self.lock().contains_key(&run_id.0) {
            return Err(StorageError::InvalidRunState {
                run_id: run_id.0.clone(),
                status: RunStatus::InProgress.to_string(),
                expected: "absent".to_string(),
            });
        }

        tokio::fs::create_dir_all(&self.dir).await?;
        let file_name = format!(
            "EXECUTION_{}_{}_{}.md",
            sanitize_key(&metadata.requirement_key),
            metadata.started_at.format("%Y%m%d_%H%M%S"),
            run_id.0.chars().take(8).collect::<String>()
        );
        let path = self.dir.join(file_name);

        let header = format!(
            "# EXECUTION_PLAN_ID: {}\n\n## Requirement: {}\n## Provider: {}\n## Started: {}\n",
            run_id,
            metadata.requirement_key,
            metadata.provider,
            metadata.started_at.to_rfc3339()
        );
        Self::append(&path, &header).await?;

        debug!(run_id = %run_id, path = %path.display(), "execution log opened");
        self.lock().insert(
            run_id.0.clone(),
            OpenRun {
                path,
                status: RunStatus::InProgress,
            },
        );
        Ok(())
    }

    async fn record_stage(&self, run_id: &RunId, record: StageRecord) -> StorageResult<()> {
        let path = self.open_path(run_id)?;
        let block = format!(
            "\n## {}\n\n_Recorded: {}_\n\n### Prompt\n```\n{}\n```\n\n### Raw Response\n```\n{}\n```\n",
            record.stage,
            record.recorded_at.to_rfc3339(),
            record.prompt,
            record.response
        );
        Self::append(&path, &block).await
    }

    async fn record_section(&self, run_id: &RunId, title: &str, body: &str) -> StorageResult<()> {
        let path = self.open_path(run_id)?;
        let block = match serde_json::from_str::<serde_json::Value>(body) {
            Ok(value) if value.is_object() || value.is_array() => format!(
                "\n## {}\n\n```json\n{}\n```\n",
                title,
                serde_json::to_string_pretty(&value)?
            ),
            _ => format!("\n## {}\n\n{}\n", title, body.trim_end()),
        };
        Self::append(&path, &block).await
    }

    async fn finish_run(&self, run_id: &RunId, summary: ExecutionSummary) -> StorageResult<()> {
        let path = self.open_path(run_id)?;
        let block = format!(
            "\n## Execution Summary\n\n_Finished: {}_\n\n```json\n{}\n```\n",
            Utc::now().to_rfc3339(),
            serde_json::to_string_pretty(&summary)?
        );
        Self::append(&path, &block).await?;

        if let Some(run) = self.lock().get_mut(&run_id.0) {
            run.status = summary.status;
        }
        Ok(())
    }
}
