//! Diagram kinds and the two shapes a diagram takes in a run.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Closed set of diagram types the pipeline produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DiagramKind {
    Architecture,
    Sequence,
    Flowchart,
    EntityRelation,
    Class,
    State,
    Timeline,
    Distribution,
}

impl DiagramKind {
    pub const ALL: [DiagramKind; 8] = [
        DiagramKind::Architecture,
        DiagramKind::Sequence,
        DiagramKind::Flowchart,
        DiagramKind::EntityRelation,
        DiagramKind::Class,
        DiagramKind::State,
        DiagramKind::Timeline,
        DiagramKind::Distribution,
    ];

    /// Kinds that can be requested by the recommendation stage.
    pub const SPECIALIZED: [DiagramKind; 6] = [
        DiagramKind::Flowchart,
        DiagramKind::EntityRelation,
        DiagramKind::Class,
        DiagramKind::State,
        DiagramKind::Timeline,
        DiagramKind::Distribution,
    ];

    /// Stable tag used in serialized output and CLI arguments.
    pub fn tag(&self) -> &'static str {
        match self {
            DiagramKind::Architecture => "architecture",
            DiagramKind::Sequence => "sequence",
            DiagramKind::Flowchart => "flowchart",
            DiagramKind::EntityRelation => "entity-relation",
            DiagramKind::Class => "class",
            DiagramKind::State => "state",
            DiagramKind::Timeline => "timeline",
            DiagramKind::Distribution => "distribution",
        }
    }

    /// Human-readable name used for fallback titles.
    pub fn display_name(&self) -> &'static str {
        match self {
            DiagramKind::Architecture => "Architecture",
            DiagramKind::Sequence => "Sequence",
            DiagramKind::Flowchart => "Flowchart",
            DiagramKind::EntityRelation => "Entity Relationship",
            DiagramKind::Class => "Class",
            DiagramKind::State => "State",
            DiagramKind::Timeline => "Timeline",
            DiagramKind::Distribution => "Distribution",
        }
    }

    pub fn is_specialized(&self) -> bool {
        !matches!(self, DiagramKind::Architecture | DiagramKind::Sequence)
    }

    /// `"<DisplayName> Diagram"`
    pub fn fallback_title(&self) -> String {
        format!("{} Diagram", self.display_name())
    }
}

impl fmt::Display for DiagramKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for DiagramKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim().to_ascii_lowercase();
        DiagramKind::ALL
            .into_iter()
            .find(|k| k.tag() == needle)
            .ok_or_else(|| format!("unknown diagram kind: {s}"))
    }
}

/// A diagram freshly extracted from a model response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiagramCandidate {
    pub kind: DiagramKind,
    /// Code inside the fence, trimmed
    pub code: String,
    pub title: String,
    /// Empty when no text follows the closing fence
    pub description: String,
}

/// A diagram accepted into a design result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiagramArtifact {
    pub title: String,
    pub kind: DiagramKind,
    /// "```mermaid\n<code>\n```"
    pub fenced_code: String,
    pub description: Option<String>,
}

impl DiagramArtifact {
    /// Build an artifact from a candidate and its final code.
    pub fn from_candidate(candidate: &DiagramCandidate, code: &str) -> Self {
        let description = if candidate.description.is_empty() {
            None
        } else {
            Some(candidate.description.clone())
        };
        Self {
            title: candidate.title.clone(),
            kind: candidate.kind,
            fenced_code: fence(code),
            description,
        }
    }

    /// Code without the surrounding fence.
    pub fn code(&self) -> &str {
        self.fenced_code
            .strip_prefix("```mermaid\n")
            .and_then(|rest| rest.strip_suffix("\n```"))
            .unwrap_or(&self.fenced_code)
    }
}

/// Wrap diagram code in a mermaid fence.
pub fn fence(code: &str) -> String {
    format!("```mermaid\n{}\n```", code.trim())
}
