//! Blueprint-LLM: text-generation backends
//!
//! The design pipeline treats generation as a suspension point returning
//! plain text. This crate owns that seam:
//!
//! - `GenerationBackend`: async trait with plain and grounded generation
//! - `GeminiClient`: REST client for the Gemini `generateContent` endpoint
//! - `fakes::ScriptedBackend`: deterministic backend for tests

pub mod backend;
mod error;
pub mod fakes;
pub mod gemini;

pub use backend::{GenerationBackend, GenerationOptions};
pub use error::LlmError;
pub use gemini::{GeminiClient, GeminiConfig};

/// Result type for generation calls
pub type Result<T> = std::result::Result<T, LlmError>;
