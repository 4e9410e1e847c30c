//! Prompt templates for every pipeline stage.
//!
//! Templates use `{placeholder}` markers substituted from a
//! [`PipelineContext`]. The catalog owns the specialized templates so a
//! caller can remove or override one.

use std::collections::BTreeMap;

use crate::domain::{DiagramKind, PipelineContext};
use crate::providers::CloudProvider;

const NO_ADDITIONAL_CONTEXT: &str = "No additional context provided.";

const REQUIREMENT_BLOCK: &str = "\
# Requirement
{requirement_title}

# Details
{requirement_description}

Cloud provider: {provider}
Approved services: {approved_services}

# Additional context
{additional_context}
";

const OVERVIEW_TEMPLATE: &str = "\
You are a senior solutions architect. Write an architecture overview for the requirement below.

{requirement_block}
Explain the main components, how they interact, and how the design meets the requirement.
Prefer the approved services. Keep it architectural rather than implementation-level.
Do not include any Mermaid diagrams in the overview.
";

const PRIMARY_AWS_TEMPLATE: &str = "\
Draw the AWS architecture diagram for the requirement below as a Mermaid architecture-beta diagram.

{requirement_block}
Rules:
- Group resources with `group` blocks (for example a VPC or an account boundary).
- Declare every resource with `service <id>(logos:aws-<name>)[Label]`, using only approved services.
- Connect services with edges such as `api:R --> L:fn`.
- Put a short `## <title>` heading above the diagram and a few sentences of explanation below it.

Return exactly one ```mermaid fenced block.
";

const PRIMARY_GCP_TEMPLATE: &str = "\
Draw the GCP architecture diagram for the requirement below as a Mermaid architecture-beta diagram.

{requirement_block}
Rules:
- Group resources with `group` blocks (for example a project or a VPC network).
- Declare every resource with `service <id>(logos:google-cloud)[Label]`, using only approved services.
- Connect services with edges such as `run:R --> L:sql`.
- Put a short `## <title>` heading above the diagram and a few sentences of explanation below it.

Return exactly one ```mermaid fenced block.
";

const RELATIONSHIP_TEMPLATE: &str = "\
Draw a Mermaid sequence diagram of the most important workflow for the requirement below.

{requirement_block}
Declare every participant up front, show requests with `->>` and replies with `-->>`,
and add `Note` lines where a step needs explaining.
Put a `## <title>` heading above the diagram and explain the workflow below it.

Return exactly one ```mermaid fenced block.
";

const RECOMMENDATION_TEMPLATE: &str = "\
Recommend the specialized diagram types that would best complement the architecture and
sequence diagrams already produced for the requirement below.

{requirement_block}
Choose two or three from:
1. Flowchart - process flows and decisions
2. Entity Relationship Diagram - data model
3. Class Diagram - components and interfaces
4. State Diagram - lifecycle of a key entity
5. Gantt Chart - delivery timeline
6. Pie Chart - resource or cost distribution

Answer with a numbered list, one diagram type per line, each followed by a colon and one
sentence explaining its value.
";

const REPAIR_TEMPLATE: &str = "\
The following Mermaid {diagram_kind} diagram failed validation.

Error:
{error}

Diagram:
```mermaid
{code}
```

Fix the syntax while keeping the diagram's meaning. Return only the corrected diagram as a
single ```mermaid fenced block with no other text.
";

fn specialized_template(kind: DiagramKind) -> Option<&'static str> {
    let template = match kind {
        DiagramKind::Flowchart => "\
Draw a Mermaid flowchart of a key process for the requirement below.

{requirement_block}
Start with `flowchart TD`, give every node a shape when it is first used (`A[Step]`,
`B{Decision?}`), label branches with `-->|Yes|`, and keep node ids alphanumeric.
Put a `## <title>` heading above the diagram and explain it below.

Return exactly one ```mermaid fenced block.
",
        DiagramKind::EntityRelation => "\
Draw a Mermaid entity relationship diagram of the data model for the requirement below.

{requirement_block}
Start with `erDiagram`, use cardinality markers such as `||--o{`, and list key attributes
inside each entity block.
Put a `## <title>` heading above the diagram and explain it below.

Return exactly one ```mermaid fenced block.
",
        DiagramKind::Class => "\
Draw a Mermaid class diagram of the main components and their interfaces for the requirement below.

{requirement_block}
Start with `classDiagram`, show public methods and key fields, and use relationship arrows
(`<|--`, `*--`, `-->`) between classes.
Put a `## <title>` heading above the diagram and explain it below.

Return exactly one ```mermaid fenced block.
",
        DiagramKind::State => "\
Draw a Mermaid state diagram of the lifecycle of the central entity for the requirement below.

{requirement_block}
Start with `stateDiagram-v2`, mark the initial and final states with `[*]`, and label
transitions with their triggering events.
Put a `## <title>` heading above the diagram and explain it below.

Return exactly one ```mermaid fenced block.
",
        DiagramKind::Timeline => "\
Draw a Mermaid Gantt chart of the delivery plan for the requirement below.

{requirement_block}
Start with `gantt`, set `dateFormat YYYY-MM-DD`, group tasks into sections, and express
dependencies with `after`.
Put a `## <title>` heading above the diagram and explain it below.

Return exactly one ```mermaid fenced block.
",
        DiagramKind::Distribution => "\
Draw a Mermaid pie chart of the expected resource or cost distribution for the requirement below.

{requirement_block}
Start with `pie title <title>` and give each slice a quoted label and a numeric value.
Put a `## <title>` heading above the diagram and explain it below.

Return exactly one ```mermaid fenced block.
",
        DiagramKind::Architecture | DiagramKind::Sequence => return None,
    };
    Some(template)
}

/// Substitute context placeholders into `template`.
pub fn render(template: &str, ctx: &PipelineContext) -> String {
    let block = REQUIREMENT_BLOCK
        .replace("{requirement_title}", &ctx.requirement_title)
        .replace("{requirement_description}", &ctx.requirement_description)
        .replace("{provider}", &ctx.provider)
        .replace("{approved_services}", &ctx.approved_services_csv())
        .replace(
            "{additional_context}",
            ctx.additional_context.as_deref().unwrap_or(NO_ADDITIONAL_CONTEXT),
        );
    template
        .replace("{requirement_block}", &block)
        .replace("{requirement_title}", &ctx.requirement_title)
        .replace("{provider}", &ctx.provider)
}

/// Every template a pipeline run needs.
#[derive(Debug, Clone)]
pub struct PromptCatalog {
    overview: String,
    primary_aws: String,
    primary_gcp: String,
    relationship: String,
    recommendation: String,
    repair: String,
    specialized: BTreeMap<DiagramKind, String>,
}

impl Default for PromptCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

impl PromptCatalog {
    /// Catalog with the built-in templates for every stage.
    pub fn builtin() -> Self {
        let specialized = DiagramKind::SPECIALIZED
            .into_iter()
            .filter_map(|kind| specialized_template(kind).map(|t| (kind, t.to_string())))
            .collect();
        Self {
            overview: OVERVIEW_TEMPLATE.to_string(),
            primary_aws: PRIMARY_AWS_TEMPLATE.to_string(),
            primary_gcp: PRIMARY_GCP_TEMPLATE.to_string(),
            relationship: RELATIONSHIP_TEMPLATE.to_string(),
            recommendation: RECOMMENDATION_TEMPLATE.to_string(),
            repair: REPAIR_TEMPLATE.to_string(),
            specialized,
        }
    }

    /// Drop the template for `kind`; later requests for it are skipped.
    pub fn remove(&mut self, kind: DiagramKind) -> Option<String> {
        self.specialized.remove(&kind)
    }

    /// Override or add the template for `kind`.
    pub fn insert(&mut self, kind: DiagramKind, template: impl Into<String>) {
        self.specialized.insert(kind, template.into());
    }

    pub fn has_template(&self, kind: DiagramKind) -> bool {
        self.specialized.contains_key(&kind)
    }

    pub fn overview_prompt(&self, ctx: &PipelineContext) -> String {
        render(&self.overview, ctx)
    }

    /// Provider-specific primary prompt; unrecognized providers get the AWS variant.
    pub fn primary_prompt(&self, ctx: &PipelineContext) -> String {
        let template = match ctx.provider.parse::<CloudProvider>() {
            Ok(CloudProvider::Gcp) => &self.primary_gcp,
            _ => &self.primary_aws,
        };
        render(template, ctx)
    }

    pub fn relationship_prompt(&self, ctx: &PipelineContext) -> String {
        render(&self.relationship, ctx)
    }

    pub fn recommendation_prompt(&self, ctx: &PipelineContext) -> String {
        render(&self.recommendation, ctx)
    }

    /// `None` when no template exists for `kind`.
    pub fn specialized_prompt(&self, kind: DiagramKind, ctx: &PipelineContext) -> Option<String> {
        self.specialized.get(&kind).map(|t| render(t, ctx))
    }

    pub fn repair_prompt(&self, kind: DiagramKind, code: &str, error: &str) -> String {
        self.repair
            .replace("{diagram_kind}", kind.display_name())
            .replace("{error}", error)
            .replace("{code}", code)
    }
}
