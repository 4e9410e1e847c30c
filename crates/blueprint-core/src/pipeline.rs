//! Staged design pipeline.
//!
//! Stage order: overview, primary diagram, relationship (sequence) diagram,
//! diagram-type recommendation, then one stage per recommended specialized
//! kind. Only the overview and primary-diagram stages are fatal; every other
//! failure drops the affected diagram and the run continues.
//!
//! Diagram stages share one flow: extract the first mermaid block, validate
//! it, repair it at most once when invalid, and emit it either way.

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use blueprint_ledger::{ExecutionLog, RunId, StageRecord};
use blueprint_llm::{GenerationBackend, GenerationOptions, LlmError};
use futures::stream::{self, StreamExt};
use tracing::{info, instrument, warn};

use crate::config::PipelineConfig;
use crate::domain::{
    DesignError, DesignResult, DiagramArtifact, DiagramKind, PipelineContext, Result,
};
use crate::extract::extract;
use crate::obs;
use crate::prompts::PromptCatalog;
use crate::recommend::recommend_diagram_kinds;
use crate::repair::RepairAgent;
use crate::validate::SyntaxValidator;

// ---------------------------------------------------------------------------
// Stages
// ---------------------------------------------------------------------------

/// One generation step of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Overview,
    PrimaryDiagram,
    RelationshipDiagram,
    Recommendation,
    Specialized(DiagramKind),
}

impl Stage {
    /// Stable name used in logs and execution records.
    pub fn name(&self) -> String {
        match self {
            Stage::Overview => "overview".to_string(),
            Stage::PrimaryDiagram => "primary_diagram".to_string(),
            Stage::RelationshipDiagram => "relationship_diagram".to_string(),
            Stage::Recommendation => "recommendation".to_string(),
            Stage::Specialized(kind) => format!("specialized:{}", kind.tag()),
        }
    }

    /// Whether a failed generation call aborts the run.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Stage::Overview | Stage::PrimaryDiagram)
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}

/// Failed stage call, tagged with its consequence for the run.
#[derive(Debug, Clone, PartialEq)]
pub enum StageFailure {
    /// Abort the run
    Fatal { stage: Stage, error: LlmError },
    /// Skip the stage's output and continue
    Recoverable { stage: Stage, error: LlmError },
}

impl StageFailure {
    pub fn classify(stage: Stage, error: LlmError) -> Self {
        if stage.is_fatal() {
            StageFailure::Fatal { stage, error }
        } else {
            StageFailure::Recoverable { stage, error }
        }
    }

    pub fn stage(&self) -> Stage {
        match self {
            StageFailure::Fatal { stage, .. } | StageFailure::Recoverable { stage, .. } => *stage,
        }
    }

    pub fn error(&self) -> &LlmError {
        match self {
            StageFailure::Fatal { error, .. } | StageFailure::Recoverable { error, .. } => error,
        }
    }

    pub fn is_fatal(&self) -> bool {
        matches!(self, StageFailure::Fatal { .. })
    }
}

impl From<StageFailure> for DesignError {
    fn from(failure: StageFailure) -> Self {
        match failure {
            StageFailure::Fatal { stage, error } | StageFailure::Recoverable { stage, error } => {
                DesignError::StageFailed {
                    stage: stage.name(),
                    source: error,
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

/// Drives the stages of one design run against a generation backend.
pub struct DesignPipeline {
    backend: Arc<dyn GenerationBackend>,
    validator: SyntaxValidator,
    repair: RepairAgent,
    log: Arc<dyn ExecutionLog>,
    catalog: Arc<PromptCatalog>,
    config: PipelineConfig,
}

impl DesignPipeline {
    pub fn new(
        backend: Arc<dyn GenerationBackend>,
        validator: SyntaxValidator,
        log: Arc<dyn ExecutionLog>,
        catalog: PromptCatalog,
        config: PipelineConfig,
    ) -> Self {
        let catalog = Arc::new(catalog);
        let repair = RepairAgent::new(backend.clone(), validator.clone(), catalog.clone())
            .with_temperature(config.temperatures.repair)
            .with_timeout(config.generation_timeout());
        Self {
            backend,
            validator,
            repair,
            log,
            catalog,
            config,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn validator(&self) -> &SyntaxValidator {
        &self.validator
    }

    pub fn catalog(&self) -> &PromptCatalog {
        &self.catalog
    }

    /// Execute every stage for `ctx`.
    ///
    /// Returns `Err(DesignError::StageFailed)` only when the overview or the
    /// primary diagram call fails.
    #[instrument(name = "blueprint.pipeline", skip_all, fields(run_id = %run_id, provider = %ctx.provider))]
    pub async fn run(&self, ctx: &PipelineContext, run_id: &RunId) -> Result<DesignResult> {
        let temps = self.config.temperatures;
        let mut diagrams: Vec<DiagramArtifact> = Vec::new();

        info!("Step 1: generating architecture overview");
        let overview = self
            .call(run_id, Stage::Overview, self.catalog.overview_prompt(ctx), temps.overview)
            .await?;

        info!("Step 2: generating primary architecture diagram");
        let primary = self
            .call(run_id, Stage::PrimaryDiagram, self.catalog.primary_prompt(ctx), temps.primary)
            .await?;
        diagrams.extend(
            self.finalize_diagram(run_id, Stage::PrimaryDiagram, &primary, DiagramKind::Architecture)
                .await,
        );

        info!("Step 3: generating relationship diagram");
        let relationship = self
            .call(
                run_id,
                Stage::RelationshipDiagram,
                self.catalog.relationship_prompt(ctx),
                temps.relationship,
            )
            .await;
        match relationship {
            Ok(text) => diagrams.extend(
                self.finalize_diagram(run_id, Stage::RelationshipDiagram, &text, DiagramKind::Sequence)
                    .await,
            ),
            Err(failure) => obs::emit_diagram_omitted(
                &run_id.0,
                &failure.stage().name(),
                &failure.error().to_string(),
            ),
        }

        info!("Step 4: selecting specialized diagram types");
        let kinds = match self
            .call(
                run_id,
                Stage::Recommendation,
                self.catalog.recommendation_prompt(ctx),
                temps.recommendation,
            )
            .await
        {
            Ok(text) => recommend_diagram_kinds(&text),
            Err(_) => Vec::new(),
        };
        let tags: Vec<&str> = kinds.iter().map(|k| k.tag()).collect();
        info!(kinds = ?tags, "Generating {} specialized diagrams", kinds.len());
        self.record_section(run_id, "Diagram Recommendation", &tags.join(", "))
            .await;

        info!("Step 5: generating specialized diagrams");
        let concurrency = self.config.specialized_concurrency.max(1);
        let specialized: Vec<Option<DiagramArtifact>> = stream::iter(
            kinds
                .into_iter()
                .map(|kind| self.specialized_diagram(ctx, run_id, kind)),
        )
        .buffered(concurrency)
        .collect()
        .await;
        diagrams.extend(specialized.into_iter().flatten());

        Ok(DesignResult { overview, diagrams })
    }

    async fn specialized_diagram(
        &self,
        ctx: &PipelineContext,
        run_id: &RunId,
        kind: DiagramKind,
    ) -> Option<DiagramArtifact> {
        let stage = Stage::Specialized(kind);
        let Some(prompt) = self.catalog.specialized_prompt(kind, ctx) else {
            warn!(kind = %kind, "No template found for diagram type");
            obs::emit_diagram_omitted(&run_id.0, &stage.name(), "no template for diagram type");
            return None;
        };

        match self
            .call(run_id, stage, prompt, self.config.temperatures.specialized)
            .await
        {
            Ok(text) => self.finalize_diagram(run_id, stage, &text, kind).await,
            Err(failure) => {
                obs::emit_diagram_omitted(&run_id.0, &stage.name(), &failure.error().to_string());
                None
            }
        }
    }

    /// One backend call under the generation timeout. Prompt and response
    /// (or the failure) go to the execution log.
    async fn call(
        &self,
        run_id: &RunId,
        stage: Stage,
        prompt: String,
        temperature: f32,
    ) -> std::result::Result<String, StageFailure> {
        let start = Instant::now();
        let options = GenerationOptions::with_temperature(temperature);
        let generation = async {
            if self.config.use_grounding {
                self.backend.generate_with_grounding(&prompt, &options).await
            } else {
                self.backend.generate(&prompt, &options).await
            }
        };

        let outcome = match tokio::time::timeout(self.config.generation_timeout(), generation).await
        {
            Ok(result) => result,
            Err(_) => Err(LlmError::Timeout(self.config.generation_timeout_secs)),
        };
        let duration_ms = start.elapsed().as_millis() as u64;

        match outcome {
            Ok(text) => {
                obs::emit_stage_completed(&run_id.0, &stage.name(), duration_ms, text.len());
                self.record_stage(run_id, StageRecord::new(stage.name(), prompt, text.clone()))
                    .await;
                Ok(text)
            }
            Err(error) => {
                let failure = StageFailure::classify(stage, error);
                obs::emit_stage_failed(&run_id.0, &stage.name(), failure.is_fatal(), failure.error());
                self.record_stage(
                    run_id,
                    StageRecord::new(
                        stage.name(),
                        prompt,
                        format!("<generation failed: {}>", failure.error()),
                    ),
                )
                .await;
                Err(failure)
            }
        }
    }

    /// Extract, validate and (once) repair the diagram in `text`.
    ///
    /// A diagram that is still invalid after repair is emitted with its
    /// original code.
    async fn finalize_diagram(
        &self,
        run_id: &RunId,
        stage: Stage,
        text: &str,
        kind: DiagramKind,
    ) -> Option<DiagramArtifact> {
        let Some(candidate) = extract(text, kind) else {
            warn!(kind = %kind, "No mermaid diagram found in the {} response", stage);
            obs::emit_diagram_omitted(&run_id.0, &stage.name(), "no mermaid block in response");
            return None;
        };

        let result = self.validator.validate(&candidate.code).await;
        obs::emit_diagram_validated(&run_id.0, kind.tag(), result.valid, result.error.as_deref());
        if result.valid {
            return Some(DiagramArtifact::from_candidate(&candidate, &candidate.code));
        }

        let (fixed, exchange) = self
            .repair
            .repair_with_response(&candidate.code, result.error_text(), kind)
            .await;
        obs::emit_repair_attempted(&run_id.0, kind.tag(), fixed.is_some());
        self.record_stage(
            run_id,
            StageRecord::new(
                format!("repair:{}", stage.name()),
                exchange.prompt,
                exchange
                    .response
                    .unwrap_or_else(|| "<generation failed>".to_string()),
            ),
        )
        .await;

        let code = match fixed {
            Some(code) => code,
            None => {
                warn!(
                    kind = %kind,
                    error = %result.error_text(),
                    "Repair failed; keeping the original diagram"
                );
                candidate.code.clone()
            }
        };
        Some(DiagramArtifact::from_candidate(&candidate, &code))
    }

    async fn record_stage(&self, run_id: &RunId, record: StageRecord) {
        if let Err(e) = self.log.record_stage(run_id, record).await {
            obs::emit_log_write_failed(&run_id.0, &e);
        }
    }

    async fn record_section(&self, run_id: &RunId, title: &str, body: &str) {
        if let Err(e) = self.log.record_section(run_id, title, body).await {
            obs::emit_log_write_failed(&run_id.0, &e);
        }
    }
}
