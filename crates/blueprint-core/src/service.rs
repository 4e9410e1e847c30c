//! Design service: one request in, one design document out.
//!
//! Wraps a [`DesignPipeline`] with everything around a run: provider
//! parsing, requirement lookup, the execution-log lifecycle, and writing the
//! design document.

use std::sync::Arc;
use std::time::Instant;

use blueprint_ledger::{ContentDigest, ExecutionLog, ExecutionSummary, RunId, RunMetadata};
use tracing::error;

use crate::config::PipelineConfig;
use crate::document::{render_design_document, write_rendered_document, DocumentMeta};
use crate::domain::{
    DesignError, DesignRequest, DesignResponse, DesignResult, PipelineContext, Result,
};
use crate::obs::{self, RunSpan};
use crate::pipeline::DesignPipeline;
use crate::providers::CloudProvider;
use crate::requirement::RequirementSource;

/// Runs design requests end to end.
pub struct DesignService {
    pipeline: DesignPipeline,
    requirements: Arc<dyn RequirementSource>,
    log: Arc<dyn ExecutionLog>,
    config: PipelineConfig,
}

impl DesignService {
    /// `log` should be the same sink the pipeline records stages into.
    pub fn new(
        pipeline: DesignPipeline,
        requirements: Arc<dyn RequirementSource>,
        log: Arc<dyn ExecutionLog>,
    ) -> Self {
        let config = pipeline.config().clone();
        Self {
            pipeline,
            requirements,
            log,
            config,
        }
    }

    pub fn pipeline(&self) -> &DesignPipeline {
        &self.pipeline
    }

    /// Generate and persist a design for `request`.
    ///
    /// Provider and requirement errors are returned before a run is started.
    pub async fn generate(&self, request: DesignRequest) -> Result<DesignResponse> {
        let provider: CloudProvider = request.provider.parse()?;
        let requirement = self.requirements.fetch(&request.requirement_key).await?;

        let ctx = PipelineContext::new(&requirement, provider.as_str())
            .with_approved_services(provider.approved_services().iter().copied())
            .with_additional_context(request.additional_context.clone());

        let run_id = RunId::new();
        let span = RunSpan::new(&run_id.0);
        let started = Instant::now();

        if let Err(e) = self
            .log
            .start_run(&run_id, RunMetadata::new(&requirement.key, provider.as_str()))
            .await
        {
            obs::emit_log_write_failed(&run_id.0, &e);
        }
        obs::emit_run_started(&run_id.0, &requirement.key, provider.as_str());

        let outcome = span
            .instrument(async {
                let result = self.pipeline.run(&ctx, &run_id).await?;
                let meta = DocumentMeta::new(&requirement.key, provider.as_str(), &run_id.0);
                let document = render_design_document(&meta, &result);
                let path =
                    write_rendered_document(&self.config.output_dir, &meta, &document).await?;
                let digest = ContentDigest::from_bytes(document.as_bytes());
                Ok::<_, DesignError>((result, path, digest))
            })
            .await;
        let duration_ms = started.elapsed().as_millis() as u64;

        match outcome {
            Ok((result, document_path, digest)) => {
                self.record_summary(&run_id, &result).await;

                let mut summary = ExecutionSummary::completed(
                    &requirement.key,
                    provider.as_str(),
                    result.diagrams.len(),
                    duration_ms,
                );
                summary.document_path = Some(document_path.clone());
                summary.document_digest = Some(digest);
                if let Err(e) = self.log.finish_run(&run_id, summary).await {
                    obs::emit_log_write_failed(&run_id.0, &e);
                }
                obs::emit_run_finished(&run_id.0, duration_ms, result.diagrams.len(), true);

                Ok(DesignResponse {
                    execution_id: run_id.0,
                    requirement_key: requirement.key,
                    provider: provider.as_str().to_string(),
                    overview: result.overview,
                    diagrams: result.diagrams,
                    document_path,
                })
            }
            Err(err) => {
                error!(run_id = %run_id, error = %err, "Design run failed");
                let summary = ExecutionSummary::failed(
                    &requirement.key,
                    provider.as_str(),
                    duration_ms,
                    err.to_string(),
                );
                if let Err(e) = self.log.finish_run(&run_id, summary).await {
                    obs::emit_log_write_failed(&run_id.0, &e);
                }
                obs::emit_run_finished(&run_id.0, duration_ms, 0, false);
                Err(err)
            }
        }
    }

    async fn record_summary(&self, run_id: &RunId, result: &DesignResult) {
        let body = summary_section(result);
        if let Err(e) = self
            .log
            .record_section(run_id, "Architecture Design Summary", &body)
            .await
        {
            obs::emit_log_write_failed(&run_id.0, &e);
        }
    }
}

/// `### <n>. <title>` and its kind for every diagram.
fn summary_section(result: &DesignResult) -> String {
    let mut body = format!("Generated {} diagrams\n", result.diagrams.len());
    for (i, diagram) in result.diagrams.iter().enumerate() {
        body.push_str(&format!(
            "\n### {}. {}\nType: {}\n",
            i + 1,
            diagram.title,
            diagram.kind
        ));
    }
    body
}
