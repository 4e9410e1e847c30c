//! Generation backend trait and per-call options.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::Result;

/// Sampling parameters for a single generation call
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GenerationOptions {
    pub temperature: f32,
    pub top_p: f32,
    pub top_k: u32,
    /// `None` leaves the limit to the model default
    pub max_output_tokens: Option<u32>,
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self {
            temperature: 0.2,
            top_p: 0.8,
            top_k: 40,
            max_output_tokens: None,
        }
    }
}

impl GenerationOptions {
    /// Default sampling with the given temperature.
    pub fn with_temperature(temperature: f32) -> Self {
        Self {
            temperature,
            ..Self::default()
        }
    }
}

/// A text-generation model.
///
/// Implementations must be safe to call concurrently from independent runs.
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    /// Short identifier used in logs (e.g. "gemini").
    fn name(&self) -> &str;

    /// Generate text for `prompt`.
    async fn generate(&self, prompt: &str, options: &GenerationOptions) -> Result<String>;

    /// Generate text with retrieval grounding. Backends without a retrieval
    /// capability answer with plain generation.
    async fn generate_with_grounding(
        &self,
        prompt: &str,
        options: &GenerationOptions,
    ) -> Result<String> {
        self.generate(prompt, options).await
    }
}
