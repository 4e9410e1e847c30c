use std::sync::Arc;

use blueprint_core::domain::{DesignError, DesignRequest, DiagramKind};
use blueprint_core::{
    extract_all, DesignPipeline, DesignService, FileRequirementSource, MemoryRequirementSource,
    PipelineConfig, PromptCatalog, RequirementSource, SyntaxValidator,
};
use blueprint_ledger::fakes::MemoryExecutionLog;
use blueprint_ledger::{ContentDigest, MarkdownExecutionLog, RunId, RunStatus};
use blueprint_llm::fakes::ScriptedBackend;
use blueprint_llm::LlmError;
use tempfile::TempDir;

const PRIMARY: &str = "## Event Platform\n```mermaid\narchitecture-beta\n    service run(server)[Cloud Run]\n    service sql(database)[Cloud SQL]\n    run:R --> L:sql\n```\nCloud Run talks to Cloud SQL.";

const SEQUENCE: &str = "```mermaid\nsequenceDiagram\n    participant U as User\n    U->>S: register\n```";

const CLASS: &str = "## Components\n```mermaid\nclassDiagram\n    class Registration {\n        +submit()\n    }\n```";

fn backend() -> ScriptedBackend {
    ScriptedBackend::new()
        .respond_when("Write an architecture overview", "Registrations flow through Cloud Run.")
        .respond_when("GCP architecture diagram", PRIMARY)
        .respond_when("Draw a Mermaid sequence diagram", SEQUENCE)
        .respond_when("Recommend the specialized diagram types", "1. Class diagram: components")
        .respond_when("Draw a Mermaid class diagram", CLASS)
}

fn requirements() -> Arc<MemoryRequirementSource> {
    Arc::new(MemoryRequirementSource::new().with(
        "EPIC-7",
        "Event registration",
        "Attendees register for events.",
    ))
}

struct Fixture {
    _out: TempDir,
    config: PipelineConfig,
    backend: Arc<ScriptedBackend>,
    log: Arc<MemoryExecutionLog>,
    service: DesignService,
}

fn fixture(backend: ScriptedBackend, requirements: Arc<dyn RequirementSource>) -> Fixture {
    let out = TempDir::new().expect("tempdir");
    let config = PipelineConfig {
        output_dir: out.path().join("architectures"),
        ..PipelineConfig::default()
    };
    let backend = Arc::new(backend);
    let log = Arc::new(MemoryExecutionLog::new());
    let pipeline = DesignPipeline::new(
        backend.clone(),
        SyntaxValidator::structural_only(),
        log.clone(),
        PromptCatalog::builtin(),
        config.clone(),
    );
    let service = DesignService::new(pipeline, requirements, log.clone());
    Fixture {
        _out: out,
        config,
        backend,
        log,
        service,
    }
}

// ---------------------------------------------------------------------------
// Success
// ---------------------------------------------------------------------------

#[tokio::test]
async fn generate_writes_document_and_completes_run() {
    let f = fixture(backend(), requirements());

    let response = f
        .service
        .generate(DesignRequest::new("EPIC-7", "gcp").with_context("Peak load is 5k rps"))
        .await
        .expect("generate");

    assert_eq!(response.requirement_key, "EPIC-7");
    assert_eq!(response.provider, "GCP");
    assert_eq!(
        response.diagrams.iter().map(|d| d.kind).collect::<Vec<_>>(),
        vec![DiagramKind::Architecture, DiagramKind::Sequence, DiagramKind::Class]
    );

    // document
    assert!(response.document_path.starts_with(&f.config.output_dir));
    let file_name = response
        .document_path
        .file_name()
        .and_then(|n| n.to_str())
        .expect("file name");
    assert!(file_name.starts_with("ARCHITECTURE_EPIC-7_GCP_"), "{file_name}");
    assert!(file_name.ends_with(".md"));
    let doc = std::fs::read_to_string(&response.document_path).expect("read document");
    assert!(doc.starts_with("# Architecture Design for EPIC-7\n"));
    assert!(doc.contains(&format!("* **Execution ID:** {}", response.execution_id)));
    assert_eq!(extract_all(&doc).len(), 3);

    // execution log
    let run_id = RunId(response.execution_id.clone());
    assert_eq!(f.log.status(&run_id), Some(RunStatus::Completed));
    let summary = f.log.summary(&run_id).expect("summary");
    assert_eq!(summary.diagrams_count, 3);
    assert_eq!(summary.document_path.as_ref(), Some(&response.document_path));
    assert_eq!(
        summary.document_digest,
        Some(ContentDigest::from_bytes(doc.as_bytes()))
    );

    let sections = f.log.sections(&run_id);
    let (title, body) = sections.last().expect("summary section");
    assert_eq!(title, "Architecture Design Summary");
    assert!(body.contains("### 1. Event Platform\nType: architecture"));
    assert!(body.contains("### 2. Sequence Diagram\nType: sequence"));
    assert!(body.contains("### 3. Components\nType: class"));
}

#[tokio::test]
async fn prompts_carry_provider_services_and_context() {
    let f = fixture(backend(), requirements());
    f.service
        .generate(DesignRequest::new("EPIC-7", "GCP").with_context("Peak load is 5k rps"))
        .await
        .expect("generate");

    let overview = &f.backend.calls_matching("Write an architecture overview")[0];
    assert!(overview.prompt.contains("Event registration"));
    assert!(overview.prompt.contains("Attendees register for events."));
    assert!(overview.prompt.contains("Cloud provider: GCP"));
    assert!(overview.prompt.contains("Approved services: Compute Engine, App Engine"));
    assert!(overview.prompt.contains("Peak load is 5k rps"));
}

// ---------------------------------------------------------------------------
// Failures
// ---------------------------------------------------------------------------

#[tokio::test]
async fn unsupported_provider_is_rejected_before_any_call() {
    let f = fixture(backend(), requirements());
    let err = f
        .service
        .generate(DesignRequest::new("EPIC-7", "azure"))
        .await
        .unwrap_err();
    assert!(matches!(err, DesignError::UnsupportedProvider(p) if p == "azure"));
    assert_eq!(f.backend.call_count(), 0);
    assert_eq!(f.log.run_count(), 0);
}

#[tokio::test]
async fn unknown_requirement_is_not_found() {
    let f = fixture(backend(), requirements());
    let err = f
        .service
        .generate(DesignRequest::new("EPIC-404", "aws"))
        .await
        .unwrap_err();
    assert!(matches!(err, DesignError::RequirementNotFound(k) if k == "EPIC-404"));
    assert_eq!(f.backend.call_count(), 0);
}

#[tokio::test]
async fn fatal_stage_failure_finishes_run_as_failed() {
    let backend = ScriptedBackend::new()
        .fail_when("GCP architecture diagram", LlmError::RateLimited("quota".into()))
        .with_default("overview text");
    let f = fixture(backend, requirements());

    let err = f
        .service
        .generate(DesignRequest::new("EPIC-7", "gcp"))
        .await
        .unwrap_err();
    assert!(matches!(err, DesignError::StageFailed { .. }));

    assert_eq!(f.log.run_count(), 1);
    let run_id = f
        .log
        .run_ids()
        .into_iter()
        .next()
        .expect("one run");
    assert_eq!(f.log.status(&run_id), Some(RunStatus::Failed));
    let summary = f.log.summary(&run_id).expect("summary");
    assert!(summary.error.as_deref().unwrap_or_default().contains("primary_diagram"));
    assert!(summary.document_path.is_none());
    assert!(!f.config.output_dir.exists());
}

// ---------------------------------------------------------------------------
// File-backed collaborators
// ---------------------------------------------------------------------------

#[tokio::test]
async fn file_requirements_and_markdown_log_end_to_end() {
    let dir = TempDir::new().expect("tempdir");
    let req_dir = dir.path().join("requirements");
    std::fs::create_dir_all(&req_dir).expect("mkdir");
    std::fs::write(
        req_dir.join("EPIC-9.md"),
        "# Event registration\n\nAttendees register for events.\n",
    )
    .expect("write requirement");

    let config = PipelineConfig {
        output_dir: dir.path().join("architectures"),
        log_dir: dir.path().join("execution_plans"),
        ..PipelineConfig::default()
    };
    let log = Arc::new(MarkdownExecutionLog::new(&config.log_dir));
    let pipeline = DesignPipeline::new(
        Arc::new(backend()),
        SyntaxValidator::structural_only(),
        log.clone(),
        PromptCatalog::builtin(),
        config.clone(),
    );
    let service = DesignService::new(
        pipeline,
        Arc::new(FileRequirementSource::new(&req_dir)),
        log.clone(),
    );

    let response = service
        .generate(DesignRequest::new("EPIC-9", "gcp"))
        .await
        .expect("generate");

    let log_path = log.path_for(&RunId(response.execution_id.clone())).expect("log path");
    let journal = std::fs::read_to_string(log_path).expect("read log");
    assert!(journal.starts_with(&format!("# EXECUTION_PLAN_ID: {}", response.execution_id)));
    assert!(journal.contains("## overview"));
    assert!(journal.contains("## specialized:class"));
    assert!(journal.contains("## Architecture Design Summary"));
    assert!(journal.contains("## Execution Summary"));
    assert!(journal.contains("\"status\": \"COMPLETED\""));
}
