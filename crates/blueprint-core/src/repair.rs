//! Single-shot, model-assisted diagram repair.
//!
//! The agent asks the backend for a corrected diagram once, re-validates it,
//! and hands back the new code only if it passes. Every failure along the
//! way (backend error, no fenced block, still invalid) yields `None` so the
//! caller keeps the original diagram.

use std::sync::Arc;
use std::time::Duration;

use blueprint_llm::{GenerationBackend, GenerationOptions};
use tracing::{debug, warn};

use crate::domain::DiagramKind;
use crate::extract::extract;
use crate::prompts::PromptCatalog;
use crate::validate::SyntaxValidator;

/// Repairs invalid diagrams through the generation backend.
pub struct RepairAgent {
    backend: Arc<dyn GenerationBackend>,
    validator: SyntaxValidator,
    catalog: Arc<PromptCatalog>,
    temperature: f32,
    timeout: Duration,
}

impl RepairAgent {
    pub fn new(
        backend: Arc<dyn GenerationBackend>,
        validator: SyntaxValidator,
        catalog: Arc<PromptCatalog>,
    ) -> Self {
        Self {
            backend,
            validator,
            catalog,
            temperature: 0.1,
            timeout: Duration::from_secs(180),
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Prompt that would be sent to repair `code`.
    pub fn prompt(&self, kind: DiagramKind, code: &str, error: &str) -> String {
        self.catalog.repair_prompt(kind, code, error)
    }

    /// Attempt one repair of `code`. Returns the corrected code only when it
    /// validates.
    pub async fn repair(&self, code: &str, error: &str, kind: DiagramKind) -> Option<String> {
        self.repair_with_response(code, error, kind).await.0
    }

    /// Like [`repair`](Self::repair), also returning the prompt and the raw
    /// backend response for the execution log.
    pub async fn repair_with_response(
        &self,
        code: &str,
        error: &str,
        kind: DiagramKind,
    ) -> (Option<String>, RepairExchange) {
        let prompt = self.prompt(kind, code, error);
        let options = GenerationOptions::with_temperature(self.temperature);

        let response =
            match tokio::time::timeout(self.timeout, self.backend.generate(&prompt, &options)).await
            {
                Ok(Ok(text)) => text,
                Ok(Err(e)) => {
                    warn!(kind = %kind, error = %e, "Repair generation failed");
                    return (None, RepairExchange { prompt, response: None });
                }
                Err(_) => {
                    warn!(kind = %kind, timeout_secs = self.timeout.as_secs(), "Repair generation timed out");
                    return (None, RepairExchange { prompt, response: None });
                }
            };

        let exchange = RepairExchange {
            prompt,
            response: Some(response.clone()),
        };

        let Some(candidate) = extract(&response, kind) else {
            warn!(kind = %kind, "Repair response contained no mermaid block");
            return (None, exchange);
        };

        let result = self.validator.validate(&candidate.code).await;
        if result.valid {
            debug!(kind = %kind, "Repaired diagram validated");
            (Some(candidate.code), exchange)
        } else {
            debug!(kind = %kind, error = %result.error_text(), "Repaired diagram still invalid");
            (None, exchange)
        }
    }
}

/// Prompt and raw response of one repair call.
#[derive(Debug, Clone)]
pub struct RepairExchange {
    pub prompt: String,
    /// `None` when the backend call failed
    pub response: Option<String>,
}
