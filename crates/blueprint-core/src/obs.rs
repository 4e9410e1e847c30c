//! Structured observability hooks for the design run lifecycle.
//!
//! This module provides:
//! - Run-scoped tracing spans via `RunSpan` RAII guard
//! - Emission functions for key lifecycle events: start, stage outcome,
//!   validation, repair, omission, finish
//!
//! Every event carries an `event = "<name>"` field for log filtering.

use std::future::Future;

use tracing::instrument::Instrumented;
use tracing::{info, warn, Instrument};

/// Run-scoped tracing span.
///
/// Sync code enters it with [`RunSpan::enter`]; async code wraps the run's
/// future with [`RunSpan::instrument`] so the span follows it across awaits.
///
/// # Example
///
/// ```ignore
/// let span = RunSpan::new("run-12345");
/// span.instrument(async { /* every event carries run_id = "run-12345" */ }).await;
/// ```
#[derive(Debug, Clone)]
pub struct RunSpan {
    span: tracing::Span,
}

impl RunSpan {
    /// Create a span tagged with the run_id.
    pub fn new(run_id: &str) -> Self {
        Self {
            span: tracing::info_span!("blueprint.run", run_id = %run_id),
        }
    }

    /// Enter the span until the guard drops.
    pub fn enter(&self) -> tracing::span::Entered<'_> {
        self.span.enter()
    }

    /// Attach the span to `future`.
    pub fn instrument<F: Future>(&self, future: F) -> Instrumented<F> {
        future.instrument(self.span.clone())
    }
}

/// Emit event: run started for a requirement and provider.
pub fn emit_run_started(run_id: &str, requirement_key: &str, provider: &str) {
    info!(
        event = "run.started",
        run_id = %run_id,
        requirement = %requirement_key,
        provider = %provider,
    );
}

/// Emit event: a generation stage returned text.
pub fn emit_stage_completed(run_id: &str, stage: &str, duration_ms: u64, response_chars: usize) {
    info!(
        event = "stage.completed",
        run_id = %run_id,
        stage = %stage,
        duration_ms = duration_ms,
        response_chars = response_chars,
    );
}

/// Emit event: a generation stage failed. Fatal failures end the run.
pub fn emit_stage_failed(run_id: &str, stage: &str, fatal: bool, error: &dyn std::fmt::Display) {
    warn!(
        event = "stage.failed",
        run_id = %run_id,
        stage = %stage,
        fatal = fatal,
        error = %error,
    );
}

pub fn emit_diagram_validated(run_id: &str, kind: &str, valid: bool, error: Option<&str>) {
    info!(
        event = "diagram.validated",
        run_id = %run_id,
        kind = %kind,
        valid = valid,
        error = error.unwrap_or(""),
    );
}

/// Emit event: one repair attempt finished.
pub fn emit_repair_attempted(run_id: &str, kind: &str, repaired: bool) {
    info!(
        event = "diagram.repair_attempted",
        run_id = %run_id,
        kind = %kind,
        repaired = repaired,
    );
}

/// Emit event: a diagram was left out of the result (warning level).
pub fn emit_diagram_omitted(run_id: &str, stage: &str, reason: &str) {
    warn!(
        event = "diagram.omitted",
        run_id = %run_id,
        stage = %stage,
        reason = %reason,
    );
}

/// Emit event: run finished with duration, diagram count, and success status.
pub fn emit_run_finished(run_id: &str, duration_ms: u64, diagrams: usize, success: bool) {
    info!(
        event = "run.finished",
        run_id = %run_id,
        duration_ms = duration_ms,
        diagrams = diagrams,
        success = success,
    );
}

/// Emit event: execution log write failed (warning level, never fatal).
pub fn emit_log_write_failed(run_id: &str, error: &dyn std::fmt::Display) {
    warn!(event = "log.write_failed", run_id = %run_id, error = %error);
}
