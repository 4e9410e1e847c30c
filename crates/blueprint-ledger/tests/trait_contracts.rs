//! Trait contract tests for ExecutionLog.
//!
//! Both the in-memory fake and the markdown sink must honor the same
//! lifecycle: writes only between `start_run` and `finish_run`.

use blueprint_ledger::fakes::MemoryExecutionLog;
use blueprint_ledger::storage_traits::*;
use blueprint_ledger::{MarkdownExecutionLog, StorageError};

// ===========================================================================
// Shared contract
// ===========================================================================

async fn assert_lifecycle_contract(log: &dyn ExecutionLog) {
    let run_id = RunId::new();

    let err = log
        .record_stage(&run_id, StageRecord::new("overview", "p", "r"))
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::RunNotFound { .. }));

    log.start_run(&run_id, RunMetadata::new("EPIC-1", "AWS"))
        .await
        .unwrap();

    let err = log
        .start_run(&run_id, RunMetadata::new("EPIC-1", "AWS"))
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::InvalidRunState { .. }));

    log.record_stage(&run_id, StageRecord::new("overview", "prompt", "response"))
        .await
        .unwrap();
    log.record_section(&run_id, "Notes", "free text")
        .await
        .unwrap();
    log.finish_run(&run_id, ExecutionSummary::completed("EPIC-1", "AWS", 2, 10))
        .await
        .unwrap();

    let err = log
        .record_section(&run_id, "Late", "too late")
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::InvalidRunState { .. }));

    let err = log
        .finish_run(&run_id, ExecutionSummary::completed("EPIC-1", "AWS", 2, 10))
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::InvalidRunState { .. }));
}

#[tokio::test]
async fn memory_log_honors_lifecycle_contract() {
    let log = MemoryExecutionLog::new();
    assert_lifecycle_contract(&log).await;
}

#[tokio::test]
async fn markdown_log_honors_lifecycle_contract() {
    let dir = tempfile::tempdir().unwrap();
    let log = MarkdownExecutionLog::new(dir.path().join("plans"));
    assert_lifecycle_contract(&log).await;
}

// ===========================================================================
// MemoryExecutionLog accessors
// ===========================================================================

#[tokio::test]
async fn memory_log_keeps_stage_order_and_summary() {
    let log = MemoryExecutionLog::new();
    let run_id = RunId::new();
    log.start_run(&run_id, RunMetadata::new("EPIC-2", "GCP"))
        .await
        .unwrap();
    assert_eq!(log.status(&run_id), Some(RunStatus::InProgress));

    for stage in ["overview", "primary", "relationship"] {
        log.record_stage(&run_id, StageRecord::new(stage, "p", "r"))
            .await
            .unwrap();
    }
    log.finish_run(
        &run_id,
        ExecutionSummary::failed("EPIC-2", "GCP", 5, "primary timed out"),
    )
    .await
    .unwrap();

    let stages: Vec<String> = log.stages(&run_id).into_iter().map(|s| s.stage).collect();
    assert_eq!(stages, vec!["overview", "primary", "relationship"]);
    assert_eq!(log.status(&run_id), Some(RunStatus::Failed));
    assert_eq!(
        log.summary(&run_id).and_then(|s| s.error),
        Some("primary timed out".to_string())
    );
    assert_eq!(log.metadata(&run_id).map(|m| m.provider), Some("GCP".into()));
}

#[tokio::test]
async fn memory_log_unknown_run_has_no_state() {
    let log = MemoryExecutionLog::new();
    let run_id = RunId::new();
    assert!(log.stages(&run_id).is_empty());
    assert!(log.summary(&run_id).is_none());
    assert_eq!(log.run_count(), 0);
}

// ===========================================================================
// MarkdownExecutionLog file layout
// ===========================================================================

#[tokio::test]
async fn markdown_log_writes_header_stages_and_summary() {
    let dir = tempfile::tempdir().unwrap();
    let log = MarkdownExecutionLog::new(dir.path());
    let run_id = RunId::new();

    log.start_run(&run_id, RunMetadata::new("EPIC-7", "AWS"))
        .await
        .unwrap();
    log.record_stage(
        &run_id,
        StageRecord::new("primary_diagram", "draw it", "```mermaid\ngraph TD\n```"),
    )
    .await
    .unwrap();
    log.record_section(&run_id, "Diagrams", r#"{"count": 1}"#)
        .await
        .unwrap();

    let mut summary = ExecutionSummary::completed("EPIC-7", "AWS", 1, 42);
    summary.document_digest = Some(ContentDigest::from_bytes(b"doc"));
    log.finish_run(&run_id, summary).await.unwrap();

    let path = log.path_for(&run_id).unwrap();
    let name = path.file_name().unwrap().to_string_lossy().to_string();
    assert!(name.starts_with("EXECUTION_EPIC-7_"));
    assert!(name.ends_with(".md"));

    let text = std::fs::read_to_string(&path).unwrap();
    assert!(text.starts_with(&format!("# EXECUTION_PLAN_ID: {run_id}")));
    assert!(text.contains("## Requirement: EPIC-7"));
    assert!(text.contains("## primary_diagram"));
    assert!(text.contains("### Prompt\n```\ndraw it\n```"));
    assert!(text.contains("### Raw Response"));
    assert!(text.contains("## Diagrams\n\n```json\n{\n  \"count\": 1\n}\n```"));
    assert!(text.contains("## Execution Summary"));
    assert!(text.contains("\"status\": \"COMPLETED\""));
    assert!(text.contains("\"diagrams_count\": 1"));
}

#[tokio::test]
async fn markdown_log_runs_get_separate_files() {
    let dir = tempfile::tempdir().unwrap();
    let log = MarkdownExecutionLog::new(dir.path());
    let a = RunId::new();
    let b = RunId::new();
    log.start_run(&a, RunMetadata::new("EPIC-1", "AWS"))
        .await
        .unwrap();
    log.start_run(&b, RunMetadata::new("EPIC-1", "AWS"))
        .await
        .unwrap();

    assert_ne!(log.path_for(&a), log.path_for(&b));
}
