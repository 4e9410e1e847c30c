//! Gemini REST client
//!
//! Talks to the `models/<model>:generateContent` endpoint. Grounded calls
//! attach the `google_search` tool so the model can cite live results.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::backend::{GenerationBackend, GenerationOptions};
use crate::error::LlmError;
use crate::Result;

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const DEFAULT_MODEL: &str = "gemini-2.0-flash";

/// Gemini configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeminiConfig {
    /// API key (required for real calls)
    pub api_key: Option<String>,
    /// Model id, e.g. `gemini-2.0-flash`
    pub model: String,
    /// API root without trailing slash
    pub base_url: String,
    /// Per-request HTTP timeout
    pub request_timeout_secs: u64,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        GeminiConfig {
            api_key: std::env::var("GEMINI_API_KEY").ok().filter(|k| !k.is_empty()),
            model: std::env::var("GEMINI_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string()),
            base_url: std::env::var("GEMINI_BASE_URL")
                .unwrap_or_else(|_| DEFAULT_BASE_URL.to_string()),
            request_timeout_secs: std::env::var("GEMINI_REQUEST_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(120),
        }
    }
}

impl GeminiConfig {
    /// Create a new config from environment variables
    pub fn from_env() -> Self {
        Self::default()
    }

    /// Config for an explicit key and model, public endpoint
    pub fn new(api_key: &str, model: &str) -> Self {
        GeminiConfig {
            api_key: Some(api_key.to_string()),
            model: model.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            request_timeout_secs: 120,
        }
    }

    /// Point the client at another endpoint (proxies, local mocks)
    pub fn with_base_url(mut self, url: &str) -> Self {
        self.base_url = url.trim_end_matches('/').to_string();
        self
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.base_url.trim_end_matches('/'),
            self.model
        )
    }
}

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: Vec<RequestContent<'a>>,
    generation_config: GenerationConfig,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<serde_json::Value>,
}

#[derive(Debug, Serialize)]
struct RequestContent<'a> {
    role: &'static str,
    parts: Vec<RequestPart<'a>>,
}

#[derive(Debug, Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    top_p: f32,
    top_k: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<ResponseContent>,
}

#[derive(Debug, Deserialize)]
struct ResponseContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

fn build_request<'a>(
    prompt: &'a str,
    options: &GenerationOptions,
    grounded: bool,
) -> GenerateContentRequest<'a> {
    let tools = if grounded {
        vec![serde_json::json!({ "google_search": {} })]
    } else {
        Vec::new()
    };
    GenerateContentRequest {
        contents: vec![RequestContent {
            role: "user",
            parts: vec![RequestPart { text: prompt }],
        }],
        generation_config: GenerationConfig {
            temperature: options.temperature,
            top_p: options.top_p,
            top_k: options.top_k,
            max_output_tokens: options.max_output_tokens,
        },
        tools,
    }
}

/// Join the text of every part of the first candidate.
fn response_text(body: &str) -> Result<String> {
    let parsed: GenerateContentResponse = serde_json::from_str(body)?;
    let candidate = parsed
        .candidates
        .into_iter()
        .next()
        .ok_or(LlmError::EmptyResponse)?;
    let text = candidate
        .content
        .map(|c| {
            c.parts
                .into_iter()
                .filter_map(|p| p.text)
                .collect::<Vec<_>>()
                .join("\n")
        })
        .unwrap_or_default();
    if text.trim().is_empty() {
        return Err(LlmError::EmptyResponse);
    }
    Ok(text)
}

/// Pull `error.message` out of a Gemini error body, falling back to the raw text.
fn error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| {
            v.get("error")
                .and_then(|e| e.get("message"))
                .and_then(|m| m.as_str())
                .map(str::to_string)
        })
        .unwrap_or_else(|| body.trim().to_string())
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// Gemini client for generation calls
pub struct GeminiClient {
    config: GeminiConfig,
    http_client: reqwest::Client,
}

impl GeminiClient {
    /// Create a new Gemini client
    pub fn new(config: GeminiConfig) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .user_agent(concat!("blueprint-llm/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;

        Ok(GeminiClient {
            config,
            http_client,
        })
    }

    /// Create client from environment variables
    pub fn from_env() -> Result<Self> {
        Self::new(GeminiConfig::from_env())
    }

    pub fn config(&self) -> &GeminiConfig {
        &self.config
    }

    async fn call(&self, prompt: &str, options: &GenerationOptions, grounded: bool) -> Result<String> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .ok_or_else(|| LlmError::NotConfigured("GEMINI_API_KEY is not set".to_string()))?;

        let request = build_request(prompt, options, grounded);
        debug!(
            model = %self.config.model,
            grounded,
            temperature = options.temperature,
            prompt_chars = prompt.len(),
            "gemini request"
        );

        let response = self
            .http_client
            .post(self.config.endpoint())
            .header("x-goog-api-key", api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if status.as_u16() == 429 {
            warn!(model = %self.config.model, "gemini rate limited");
            return Err(LlmError::RateLimited(error_message(&body)));
        }
        if !status.is_success() {
            return Err(LlmError::Api {
                status: status.as_u16(),
                message: error_message(&body),
            });
        }

        let text = response_text(&body)?;
        debug!(model = %self.config.model, response_chars = text.len(), "gemini response");
        Ok(text)
    }
}

#[async_trait]
impl GenerationBackend for GeminiClient {
    fn name(&self) -> &str {
        "gemini"
    }

    async fn generate(&self, prompt: &str, options: &GenerationOptions) -> Result<String> {
        self.call(prompt, options, false).await
    }

    async fn generate_with_grounding(
        &self,
        prompt: &str,
        options: &GenerationOptions,
    ) -> Result<String> {
        self.call(prompt, options, true).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_includes_model() {
        let config = GeminiConfig::new("k", "gemini-test").with_base_url("http://localhost:9/v1/");
        assert_eq!(
            config.endpoint(),
            "http://localhost:9/v1/models/gemini-test:generateContent"
        );
    }

    #[test]
    fn test_request_body_shape() {
        let opts = GenerationOptions::with_temperature(0.3);
        let plain = serde_json::to_value(build_request("hi", &opts, false)).unwrap();
        assert_eq!(plain["contents"][0]["role"], "user");
        assert_eq!(plain["contents"][0]["parts"][0]["text"], "hi");
        assert_eq!(plain["generationConfig"]["topK"], 40);
        assert!(plain["generationConfig"].get("maxOutputTokens").is_none());
        assert!(plain.get("tools").is_none());

        let grounded = serde_json::to_value(build_request("hi", &opts, true)).unwrap();
        assert!(grounded["tools"][0].get("google_search").is_some());
    }

    #[test]
    fn test_response_text_joins_parts_of_first_candidate() {
        let body = r#"{"candidates":[
            {"content":{"parts":[{"text":"first"},{"text":"second"}]}},
            {"content":{"parts":[{"text":"ignored"}]}}
        ]}"#;
        assert_eq!(response_text(body).unwrap(), "first\nsecond");
    }

    #[test]
    fn test_response_text_empty_candidates() {
        assert_eq!(
            response_text(r#"{"candidates":[]}"#).unwrap_err(),
            LlmError::EmptyResponse
        );
        assert_eq!(
            response_text(r#"{"candidates":[{"content":{"parts":[{"text":"  "}]}}]}"#)
                .unwrap_err(),
            LlmError::EmptyResponse
        );
    }

    #[test]
    fn test_error_message_prefers_api_message() {
        let body = r#"{"error":{"code":400,"message":"bad model"}}"#;
        assert_eq!(error_message(body), "bad model");
        assert_eq!(error_message("plain failure\n"), "plain failure");
    }

    #[tokio::test]
    async fn test_missing_key_is_not_configured() {
        let mut config = GeminiConfig::new("k", "m");
        config.api_key = None;
        let client = GeminiClient::new(config).unwrap();
        let err = client
            .generate("prompt", &GenerationOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, LlmError::NotConfigured(_)));
    }
}
