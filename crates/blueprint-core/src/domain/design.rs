//! Inputs and outputs of a design run.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::diagram::DiagramArtifact;

/// A requirement to design for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Requirement {
    pub key: String,
    pub title: String,
    pub description: String,
}

/// Everything the prompts of one run are rendered from.
///
/// Built once per run and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineContext {
    pub requirement_title: String,
    pub requirement_description: String,
    /// Provider identifier as given by the caller (e.g. "AWS")
    pub provider: String,
    /// Ordered approved service names
    pub approved_services: Vec<String>,
    pub additional_context: Option<String>,
}

impl PipelineContext {
    pub fn new(requirement: &Requirement, provider: impl Into<String>) -> Self {
        Self {
            requirement_title: requirement.title.clone(),
            requirement_description: requirement.description.clone(),
            provider: provider.into(),
            approved_services: Vec::new(),
            additional_context: None,
        }
    }

    pub fn with_approved_services<I, S>(mut self, services: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.approved_services = services.into_iter().map(Into::into).collect();
        self
    }

    /// Blank context is treated as absent.
    pub fn with_additional_context(mut self, context: Option<String>) -> Self {
        self.additional_context = context.filter(|c| !c.trim().is_empty());
        self
    }

    /// Approved services joined with `", "`.
    pub fn approved_services_csv(&self) -> String {
        self.approved_services.join(", ")
    }
}

/// Terminal output of a pipeline run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DesignResult {
    pub overview: String,
    /// Primary, relationship, then specialized diagrams in recommendation order
    pub diagrams: Vec<DiagramArtifact>,
}

/// Service-level request for one design.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DesignRequest {
    pub requirement_key: String,
    pub provider: String,
    pub additional_context: Option<String>,
}

impl DesignRequest {
    pub fn new(requirement_key: impl Into<String>, provider: impl Into<String>) -> Self {
        Self {
            requirement_key: requirement_key.into(),
            provider: provider.into(),
            additional_context: None,
        }
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.additional_context = Some(context.into());
        self
    }
}

/// Service-level response for one completed design.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DesignResponse {
    pub execution_id: String,
    pub requirement_key: String,
    pub provider: String,
    pub overview: String,
    pub diagrams: Vec<DiagramArtifact>,
    pub document_path: PathBuf,
}
