//! Diagram extraction from free-form model output.
//!
//! Only the first ```` ```mermaid ```` block of a response is used. The title
//! comes from the nearest heading in the five lines above the fence, the
//! description from the text following the closing fence.

use std::sync::LazyLock;

use regex::Regex;

use crate::domain::{DiagramCandidate, DiagramKind};

static MERMAID_FENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)```mermaid\s*(.*?)```").expect("invalid mermaid fence regex"));

const TITLE_WINDOW: usize = 5;
const DESCRIPTION_WINDOW: usize = 20;

/// Extract the first diagram of `text` as a candidate of `kind`.
///
/// Returns `None` when the text holds no mermaid fence.
pub fn extract(text: &str, kind: DiagramKind) -> Option<DiagramCandidate> {
    let caps = MERMAID_FENCE.captures(text)?;
    let whole = caps.get(0)?;
    let code = caps.get(1).map(|m| m.as_str().trim()).unwrap_or_default();

    let lines: Vec<&str> = text.lines().collect();
    let open_line = line_index(text, whole.start());
    let close_line = line_index(text, whole.end().saturating_sub(1));

    let title = infer_title(&lines, open_line).unwrap_or_else(|| kind.fallback_title());
    let description = infer_description(&lines, close_line);

    Some(DiagramCandidate {
        kind,
        code: code.to_string(),
        title,
        description,
    })
}

/// Every mermaid block of `text`, trimmed, in document order.
pub fn extract_all(text: &str) -> Vec<String> {
    MERMAID_FENCE
        .captures_iter(text)
        .filter_map(|caps| caps.get(1).map(|m| m.as_str().trim().to_string()))
        .collect()
}

/// Whether `text` contains at least one mermaid fence.
pub fn has_diagram(text: &str) -> bool {
    MERMAID_FENCE.is_match(text)
}

fn line_index(text: &str, byte_offset: usize) -> usize {
    text[..byte_offset.min(text.len())].matches('\n').count()
}

fn infer_title(lines: &[&str], open_line: usize) -> Option<String> {
    let start = open_line.saturating_sub(TITLE_WINDOW);
    lines
        .get(start..open_line.min(lines.len()))?
        .iter()
        .rev()
        .map(|line| line.trim())
        .find(|line| line.starts_with('#'))
        .map(|line| line.trim_start_matches('#').trim().to_string())
        .filter(|title| !title.is_empty())
}

fn infer_description(lines: &[&str], close_line: usize) -> String {
    let collected: Vec<&str> = lines
        .iter()
        .skip(close_line + 1)
        .take(DESCRIPTION_WINDOW)
        .take_while(|line| !line.to_ascii_lowercase().contains("```mermaid"))
        .copied()
        .collect();
    collected.join("\n").trim().to_string()
}
