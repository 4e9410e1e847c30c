//! Markdown design document rendering.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::domain::{DesignResult, Result};

/// Header fields of a design document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentMeta {
    pub requirement_key: String,
    /// Uppercase provider identifier (e.g. "AWS")
    pub provider: String,
    pub execution_id: String,
    pub generated_at: DateTime<Utc>,
}

impl DocumentMeta {
    pub fn new(
        requirement_key: impl Into<String>,
        provider: impl Into<String>,
        execution_id: impl Into<String>,
    ) -> Self {
        Self {
            requirement_key: requirement_key.into(),
            provider: provider.into(),
            execution_id: execution_id.into(),
            generated_at: Utc::now(),
        }
    }

    /// `ARCHITECTURE_<key>_<PROVIDER>_<YYYYmmdd_HHMMSS>.md`
    pub fn file_name(&self) -> String {
        format!(
            "ARCHITECTURE_{}_{}_{}.md",
            file_safe(&self.requirement_key),
            file_safe(&self.provider),
            self.generated_at.format("%Y%m%d_%H%M%S")
        )
    }
}

/// Render the full design document.
pub fn render_design_document(meta: &DocumentMeta, result: &DesignResult) -> String {
    let mut doc = String::new();
    // Writing into a String never fails.
    let _ = writeln!(doc, "# Architecture Design for {}\n", meta.requirement_key);
    let _ = writeln!(doc, "* **Cloud Provider:** {}", meta.provider);
    let _ = writeln!(doc, "* **Execution ID:** {}", meta.execution_id);
    let _ = writeln!(
        doc,
        "* **Date:** {}\n",
        meta.generated_at.format("%Y-%m-%d %H:%M:%S")
    );

    doc.push_str("## Architecture Overview\n\n");
    doc.push_str(result.overview.trim());
    doc.push_str("\n\n");

    for diagram in &result.diagrams {
        let _ = writeln!(doc, "## {}\n", diagram.title);
        let _ = writeln!(doc, "{}\n", diagram.fenced_code);
        if let Some(description) = diagram.description.as_deref().filter(|d| !d.trim().is_empty()) {
            let _ = writeln!(doc, "{}\n", description.trim());
        }
    }
    doc
}

/// Render and write the document into `dir`, creating it if needed.
pub async fn write_design_document(
    dir: &Path,
    meta: &DocumentMeta,
    result: &DesignResult,
) -> Result<PathBuf> {
    let document = render_design_document(meta, result);
    write_rendered_document(dir, meta, &document).await
}

/// Write already rendered `document` under the name derived from `meta`.
pub async fn write_rendered_document(
    dir: &Path,
    meta: &DocumentMeta,
    document: &str,
) -> Result<PathBuf> {
    tokio::fs::create_dir_all(dir).await?;
    let path = dir.join(meta.file_name());
    tokio::fs::write(&path, document).await?;
    info!(path = %path.display(), "Architecture design saved");
    Ok(path)
}

fn file_safe(value: &str) -> String {
    value
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn meta() -> DocumentMeta {
        DocumentMeta {
            requirement_key: "EPIC-7".into(),
            provider: "GCP".into(),
            execution_id: "run-1".into(),
            generated_at: Utc.with_ymd_and_hms(2025, 3, 4, 5, 6, 7).unwrap(),
        }
    }

    #[test]
    fn test_file_name() {
        assert_eq!(meta().file_name(), "ARCHITECTURE_EPIC-7_GCP_20250304_050607.md");

        let mut odd = meta();
        odd.requirement_key = "a/b c".into();
        assert!(odd.file_name().starts_with("ARCHITECTURE_a_b_c_GCP_"));
    }

    #[test]
    fn test_header_and_overview() {
        let result = DesignResult {
            overview: "  Narrative.  ".into(),
            diagrams: vec![],
        };
        let doc = render_design_document(&meta(), &result);
        assert!(doc.starts_with(
            "# Architecture Design for EPIC-7\n\n\
             * **Cloud Provider:** GCP\n\
             * **Execution ID:** run-1\n\
             * **Date:** 2025-03-04 05:06:07\n\n\
             ## Architecture Overview\n\nNarrative.\n\n"
        ));
    }
}
