//! Domain models for blueprint.
//!
//! Canonical definitions for the entities flowing through a design run:
//! - `DiagramKind`: closed set of diagram types the pipeline produces
//! - `DiagramCandidate` / `DiagramArtifact`: extracted and finalized diagrams
//! - `PipelineContext` / `DesignResult`: input and output of one pipeline run
//! - `ValidationResult`: outcome of a syntax check

pub mod design;
pub mod diagram;
pub mod error;
pub mod validation;

pub use design::{DesignRequest, DesignResponse, DesignResult, PipelineContext, Requirement};
pub use diagram::{DiagramArtifact, DiagramCandidate, DiagramKind};
pub use error::{DesignError, Result};
pub use validation::ValidationResult;
