//! In-memory fakes for storage traits (testing only)
//!
//! Provides `MemoryExecutionLog`, which satisfies the `ExecutionLog` contract
//! without touching the filesystem.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;

use crate::error::StorageError;
use crate::storage_traits::*;

#[derive(Debug, Clone)]
struct RunState {
    metadata: RunMetadata,
    status: RunStatus,
    stages: Vec<StageRecord>,
    sections: Vec<(String, String)>,
    summary: Option<ExecutionSummary>,
}

/// In-memory execution log backed by a `HashMap<RunId, RunState>`.
#[derive(Debug, Default)]
pub struct MemoryExecutionLog {
    runs: Mutex<HashMap<String, RunState>>,
}

impl MemoryExecutionLog {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, RunState>> {
        self.runs.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn with_open_run<F>(&self, run_id: &RunId, f: F) -> StorageResult<()>
    where
        F: FnOnce(&mut RunState),
    {
        let mut runs = self.lock();
        let state = runs
            .get_mut(&run_id.0)
            .ok_or_else(|| StorageError::RunNotFound {
                run_id: run_id.0.clone(),
            })?;
        if state.status != RunStatus::InProgress {
            return Err(StorageError::InvalidRunState {
                run_id: run_id.0.clone(),
                status: state.status.to_string(),
                expected: RunStatus::InProgress.to_string(),
            });
        }
        f(state);
        Ok(())
    }

    /// Stage records of a run, in append order.
    pub fn stages(&self, run_id: &RunId) -> Vec<StageRecord> {
        self.lock()
            .get(&run_id.0)
            .map(|s| s.stages.clone())
            .unwrap_or_default()
    }

    /// `(title, body)` sections of a run, in append order.
    pub fn sections(&self, run_id: &RunId) -> Vec<(String, String)> {
        self.lock()
            .get(&run_id.0)
            .map(|s| s.sections.clone())
            .unwrap_or_default()
    }

    pub fn summary(&self, run_id: &RunId) -> Option<ExecutionSummary> {
        self.lock().get(&run_id.0).and_then(|s| s.summary.clone())
    }

    pub fn status(&self, run_id: &RunId) -> Option<RunStatus> {
        self.lock().get(&run_id.0).map(|s| s.status)
    }

    pub fn metadata(&self, run_id: &RunId) -> Option<RunMetadata> {
        self.lock().get(&run_id.0).map(|s| s.metadata.clone())
    }

    /// Number of runs ever started.
    pub fn run_count(&self) -> usize {
        self.lock().len()
    }

    /// Ids of every started run, sorted.
    pub fn run_ids(&self) -> Vec<RunId> {
        let mut ids: Vec<RunId> = self.lock().keys().cloned().map(RunId).collect();
        ids.sort_by(|a, b| a.0.cmp(&b.0));
        ids
    }
}

#[async_trait]
impl ExecutionLog for MemoryExecutionLog {
    async fn start_run(&self, run_id: &RunId, metadata: RunMetadata) -> StorageResult<()> {
        let mut runs = self.lock();
        if let Some(existing) = runs.get(&run_id.0) {
            return Err(StorageError::InvalidRunState {
                run_id: run_id.0.clone(),
                status: existing.status.to_string(),
                expected: "absent".to_string(),
            });
        }
        runs.insert(
            run_id.0.clone(),
            RunState {
                metadata,
                status: RunStatus::InProgress,
                stages: Vec::new(),
                sections: Vec::new(),
                summary: None,
            },
        );
        Ok(())
    }

    async fn record_stage(&self, run_id: &RunId, record: StageRecord) -> StorageResult<()> {
        self.with_open_run(run_id, |state| state.stages.push(record))
    }

    async fn record_section(&self, run_id: &RunId, title: &str, body: &str) -> StorageResult<()> {
        self.with_open_run(run_id, |state| {
            state.sections.push((title.to_string(), body.to_string()))
        })
    }

    async fn finish_run(&self, run_id: &RunId, summary: ExecutionSummary) -> StorageResult<()> {
        self.with_open_run(run_id, |state| {
            state.status = summary.status;
            state.summary = Some(summary);
        })
    }
}
