//! Requirement sources.
//!
//! A source resolves a requirement key (e.g. `"EPIC-42"`) to its title and
//! description. Unknown keys are a fatal `RequirementNotFound`.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use crate::domain::{DesignError, Requirement, Result};

/// Supplies requirements by key.
#[async_trait]
pub trait RequirementSource: Send + Sync {
    async fn fetch(&self, key: &str) -> Result<Requirement>;
}

// ---------------------------------------------------------------------------
// File-backed source
// ---------------------------------------------------------------------------

/// Reads `<dir>/<key>.json` or, failing that, `<dir>/<key>.md`.
///
/// JSON files hold `{"title": "...", "description": "..."}`. In markdown
/// files the first `#` heading is the title and everything else is the
/// description.
#[derive(Debug, Clone)]
pub struct FileRequirementSource {
    dir: PathBuf,
}

#[derive(Deserialize)]
struct RequirementFile {
    title: String,
    #[serde(default)]
    description: String,
}

impl FileRequirementSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn check_key(key: &str) -> Result<()> {
        let bad = key.trim().is_empty()
            || key.contains(['/', '\\'])
            || key == "."
            || key == "..";
        if bad {
            return Err(DesignError::InvalidRequirement {
                key: key.to_string(),
                reason: "key must be a plain file stem".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl RequirementSource for FileRequirementSource {
    async fn fetch(&self, key: &str) -> Result<Requirement> {
        Self::check_key(key)?;

        let json_path = self.dir.join(format!("{key}.json"));
        if let Some(raw) = read_optional(&json_path).await? {
            debug!(path = %json_path.display(), "Loading requirement");
            let file: RequirementFile = serde_json::from_str(&raw)?;
            return Ok(Requirement {
                key: key.to_string(),
                title: file.title.trim().to_string(),
                description: file.description.trim().to_string(),
            });
        }

        let md_path = self.dir.join(format!("{key}.md"));
        if let Some(raw) = read_optional(&md_path).await? {
            debug!(path = %md_path.display(), "Loading requirement");
            return parse_markdown(key, &raw);
        }

        Err(DesignError::RequirementNotFound(key.to_string()))
    }
}

async fn read_optional(path: &Path) -> Result<Option<String>> {
    match tokio::fs::read_to_string(path).await {
        Ok(raw) => Ok(Some(raw)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Split a markdown requirement into its heading and body.
fn parse_markdown(key: &str, raw: &str) -> Result<Requirement> {
    let mut title = None;
    let mut body = Vec::new();
    for line in raw.lines() {
        if title.is_none() {
            if let Some(heading) = line.trim_start().strip_prefix('#') {
                title = Some(heading.trim_start_matches('#').trim().to_string());
                continue;
            }
        }
        body.push(line);
    }

    let title = title
        .filter(|t| !t.is_empty())
        .ok_or_else(|| DesignError::InvalidRequirement {
            key: key.to_string(),
            reason: "markdown requirement has no '#' heading".to_string(),
        })?;

    Ok(Requirement {
        key: key.to_string(),
        title,
        description: body.join("\n").trim().to_string(),
    })
}

// ---------------------------------------------------------------------------
// In-memory source
// ---------------------------------------------------------------------------

/// In-memory requirement source for tests and embedding.
#[derive(Debug, Default)]
pub struct MemoryRequirementSource {
    requirements: Mutex<HashMap<String, Requirement>>,
}

impl MemoryRequirementSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`insert`](Self::insert).
    pub fn with(
        self,
        key: impl Into<String>,
        title: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        self.insert(key, title, description);
        self
    }

    pub fn insert(
        &self,
        key: impl Into<String>,
        title: impl Into<String>,
        description: impl Into<String>,
    ) {
        let key = key.into();
        let requirement = Requirement {
            key: key.clone(),
            title: title.into(),
            description: description.into(),
        };
        self.lock().insert(key, requirement);
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Requirement>> {
        self.requirements
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl RequirementSource for MemoryRequirementSource {
    async fn fetch(&self, key: &str) -> Result<Requirement> {
        self.lock()
            .get(key)
            .cloned()
            .ok_or_else(|| DesignError::RequirementNotFound(key.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_json_requirement() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("EPIC-1.json"),
            r#"{"title": " Checkout ", "description": "Pay for a basket"}"#,
        )
        .unwrap();

        let req = FileRequirementSource::new(dir.path())
            .fetch("EPIC-1")
            .await
            .unwrap();
        assert_eq!(req.key, "EPIC-1");
        assert_eq!(req.title, "Checkout");
        assert_eq!(req.description, "Pay for a basket");
    }

    #[tokio::test]
    async fn test_markdown_requirement() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("EPIC-2.md"),
            "\n# Order tracking\n\nCustomers follow their orders.\n\n- SMS updates\n",
        )
        .unwrap();

        let req = FileRequirementSource::new(dir.path())
            .fetch("EPIC-2")
            .await
            .unwrap();
        assert_eq!(req.title, "Order tracking");
        assert_eq!(req.description, "Customers follow their orders.\n\n- SMS updates");
    }

    #[tokio::test]
    async fn test_json_takes_precedence_over_markdown() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("K.json"), r#"{"title": "From json"}"#).unwrap();
        std::fs::write(dir.path().join("K.md"), "# From markdown\n").unwrap();

        let req = FileRequirementSource::new(dir.path()).fetch("K").await.unwrap();
        assert_eq!(req.title, "From json");
        assert_eq!(req.description, "");
    }

    #[tokio::test]
    async fn test_missing_requirement_is_not_found() {
        let dir = TempDir::new().unwrap();
        let err = FileRequirementSource::new(dir.path())
            .fetch("NOPE-1")
            .await
            .unwrap_err();
        assert!(matches!(err, DesignError::RequirementNotFound(k) if k == "NOPE-1"));
    }

    #[tokio::test]
    async fn test_path_like_keys_are_rejected() {
        let dir = TempDir::new().unwrap();
        let err = FileRequirementSource::new(dir.path())
            .fetch("../secrets")
            .await
            .unwrap_err();
        assert!(matches!(err, DesignError::InvalidRequirement { .. }));
    }

    #[tokio::test]
    async fn test_markdown_without_heading_is_invalid() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("K.md"), "just prose\n").unwrap();
        let err = FileRequirementSource::new(dir.path()).fetch("K").await.unwrap_err();
        assert!(matches!(err, DesignError::InvalidRequirement { .. }));
    }

    #[tokio::test]
    async fn test_memory_source() {
        let source = MemoryRequirementSource::new().with("EPIC-3", "Title", "Body");
        assert_eq!(source.fetch("EPIC-3").await.unwrap().title, "Title");
        assert!(matches!(
            source.fetch("EPIC-4").await,
            Err(DesignError::RequirementNotFound(_))
        ));
    }
}
