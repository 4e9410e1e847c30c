//! Blueprint Core Library
//!
//! Turns a requirement into a validated architecture design: staged
//! generation calls, mermaid extraction, two-tier syntax validation, a single
//! model-assisted repair per diagram, and the design document.

pub mod config;
pub mod document;
pub mod domain;
pub mod extract;
pub mod obs;
pub mod pipeline;
pub mod prompts;
pub mod providers;
pub mod recommend;
pub mod repair;
pub mod requirement;
pub mod service;
pub mod telemetry;
pub mod validate;

pub use config::{PipelineConfig, StageTemperatures};
pub use document::{render_design_document, write_design_document, DocumentMeta};
pub use domain::{
    DesignError, DesignRequest, DesignResponse, DesignResult, DiagramArtifact, DiagramCandidate,
    DiagramKind, PipelineContext, Requirement, Result, ValidationResult,
};
pub use extract::{extract, extract_all, has_diagram};
pub use obs::{emit_run_finished, emit_run_started, RunSpan};
pub use pipeline::{DesignPipeline, Stage, StageFailure};
pub use prompts::PromptCatalog;
pub use providers::CloudProvider;
pub use recommend::{recommend_diagram_kinds, MAX_SPECIALIZED_DIAGRAMS};
pub use repair::RepairAgent;
pub use requirement::{FileRequirementSource, MemoryRequirementSource, RequirementSource};
pub use service::DesignService;
pub use telemetry::{init_tracing, LogFormat};
pub use validate::{validate_structure, MermaidRenderer, RenderError, SyntaxValidator, Tier};

/// Blueprint version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
