//! Scripted generation backend (testing only)
//!
//! Responses are chosen by prompt-substring rules; the first matching rule
//! wins. Every call is recorded so tests can assert on prompts, temperatures
//! and whether grounding was requested.

use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;

use crate::backend::{GenerationBackend, GenerationOptions};
use crate::error::LlmError;
use crate::Result;

#[derive(Debug, Clone)]
enum Reply {
    Text(String),
    Fail(LlmError),
}

#[derive(Debug, Clone)]
struct Rule {
    needle: String,
    reply: Reply,
}

/// One recorded call
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    pub prompt: String,
    pub temperature: f32,
    pub grounded: bool,
}

/// Backend returning canned responses.
#[derive(Debug, Default)]
pub struct ScriptedBackend {
    rules: Vec<Rule>,
    default: Option<Reply>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl ScriptedBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer prompts containing `needle` with `response`.
    pub fn respond_when(mut self, needle: &str, response: &str) -> Self {
        self.rules.push(Rule {
            needle: needle.to_string(),
            reply: Reply::Text(response.to_string()),
        });
        self
    }

    /// Fail prompts containing `needle` with `error`.
    pub fn fail_when(mut self, needle: &str, error: LlmError) -> Self {
        self.rules.push(Rule {
            needle: needle.to_string(),
            reply: Reply::Fail(error),
        });
        self
    }

    /// Response for prompts no rule matches.
    pub fn with_default(mut self, response: &str) -> Self {
        self.default = Some(Reply::Text(response.to_string()));
        self
    }

    /// Failure for prompts no rule matches.
    pub fn with_default_failure(mut self, error: LlmError) -> Self {
        self.default = Some(Reply::Fail(error));
        self
    }

    fn lock(&self) -> MutexGuard<'_, Vec<RecordedCall>> {
        self.calls.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Calls made so far, in order.
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.lock().clone()
    }

    pub fn call_count(&self) -> usize {
        self.lock().len()
    }

    /// Calls whose prompt contains `needle`.
    pub fn calls_matching(&self, needle: &str) -> Vec<RecordedCall> {
        self.lock()
            .iter()
            .filter(|c| c.prompt.contains(needle))
            .cloned()
            .collect()
    }

    fn answer(&self, prompt: &str, options: &GenerationOptions, grounded: bool) -> Result<String> {
        self.lock().push(RecordedCall {
            prompt: prompt.to_string(),
            temperature: options.temperature,
            grounded,
        });

        let reply = self
            .rules
            .iter()
            .find(|r| prompt.contains(&r.needle))
            .map(|r| &r.reply)
            .or(self.default.as_ref());

        match reply {
            Some(Reply::Text(text)) => Ok(text.clone()),
            Some(Reply::Fail(err)) => Err(err.clone()),
            None => Err(LlmError::EmptyResponse),
        }
    }
}

#[async_trait]
impl GenerationBackend for ScriptedBackend {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn generate(&self, prompt: &str, options: &GenerationOptions) -> Result<String> {
        self.answer(prompt, options, false)
    }

    async fn generate_with_grounding(
        &self,
        prompt: &str,
        options: &GenerationOptions,
    ) -> Result<String> {
        self.answer(prompt, options, true)
    }
}
