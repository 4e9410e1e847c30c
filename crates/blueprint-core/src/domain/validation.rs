use serde::{Deserialize, Serialize};

/// Outcome of validating one diagram.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub valid: bool,
    pub error: Option<String>,
}

impl ValidationResult {
    pub fn ok() -> Self {
        Self {
            valid: true,
            error: None,
        }
    }

    pub fn invalid(error: impl Into<String>) -> Self {
        Self {
            valid: false,
            error: Some(error.into()),
        }
    }

    /// Error text, or an empty string for valid results.
    pub fn error_text(&self) -> &str {
        self.error.as_deref().unwrap_or("")
    }
}
