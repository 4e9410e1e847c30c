//! Two-tier mermaid syntax validation.
//!
//! Tier 1 renders the diagram with an external renderer when one was
//! detected. Tier 2 is the structural checker in [`structural`], used when no
//! renderer is available or a renderer invocation cannot run.

pub mod renderer;
pub mod structural;

use tracing::{debug, warn};

use crate::config::PipelineConfig;
use crate::domain::ValidationResult;

pub use renderer::{MermaidRenderer, RenderError};
pub use structural::validate_structure;

/// Which tier produced a result
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
    Renderer,
    Structural,
}

/// Validator with an optionally injected renderer capability.
#[derive(Debug, Clone, Default)]
pub struct SyntaxValidator {
    renderer: Option<MermaidRenderer>,
}

impl SyntaxValidator {
    pub fn new(renderer: Option<MermaidRenderer>) -> Self {
        Self { renderer }
    }

    /// Validator without tier 1.
    pub fn structural_only() -> Self {
        Self { renderer: None }
    }

    /// Probe the configured renderer once and build a validator around it.
    pub async fn detect(config: &PipelineConfig) -> Self {
        Self::new(MermaidRenderer::detect(&config.renderer_command, config.renderer_timeout()).await)
    }

    pub fn renderer(&self) -> Option<&MermaidRenderer> {
        self.renderer.as_ref()
    }

    pub fn tier(&self) -> Tier {
        if self.renderer.is_some() {
            Tier::Renderer
        } else {
            Tier::Structural
        }
    }

    /// Validate `code`, never failing: renderer trouble degrades to tier 2.
    pub async fn validate(&self, code: &str) -> ValidationResult {
        if code.trim().is_empty() {
            return ValidationResult::invalid("Diagram is empty");
        }

        let Some(renderer) = &self.renderer else {
            return validate_structure(code);
        };

        match renderer.check(code).await {
            Ok(result) => {
                debug!(valid = result.valid, tier = "renderer", "Diagram validated");
                result
            }
            Err(e) => {
                warn!(
                    renderer = %renderer.command(),
                    error = %e,
                    "Renderer unavailable for this diagram; falling back to structural validation"
                );
                validate_structure(code)
            }
        }
    }
}
