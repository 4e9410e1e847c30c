//! Structural mermaid checks that need no external tooling.
//!
//! This tier approximates the renderer: it can accept diagrams the renderer
//! would reject, never the other way round for the checks it performs.

use std::collections::BTreeSet;
use std::sync::LazyLock;

use regex::Regex;
use tracing::warn;

use crate::domain::ValidationResult;

/// Diagram declarations accepted on the first meaningful line (prefix match,
/// case-insensitive).
pub const KNOWN_DECLARATIONS: &[&str] = &[
    "graph",
    "flowchart",
    "sequenceDiagram",
    "classDiagram",
    "stateDiagram",
    "erDiagram",
    "gantt",
    "pie",
    "architecture",
    "journey",
    "mindmap",
    "timeline",
    "gitGraph",
    "quadrantChart",
    "requirementDiagram",
    "C4Context",
    "C4Container",
    "C4Component",
    "C4Dynamic",
    "C4Deployment",
    "block",
    "sankey",
    "xychart",
];

static ER_CARDINALITY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\|o|\|\||\}o|\}\|)(--|\.\.)(o\||\|\||o\{|\|\{)")
        .expect("invalid ER cardinality regex")
});

static NODE_DEFINITION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"([A-Za-z0-9_]+)\s*[\[\(\{]").expect("invalid node definition regex")
});

static NODE_REFERENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"([A-Za-z0-9_]+)\s*(?:-\.->|-\.-|==>|-->|---|--|~~~)")
        .expect("invalid node reference regex")
});

/// `A -- text --> B`, `A -. text .-> B` and `A == text ==> B` labels.
static EDGE_LABEL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(^|[^-=.])(--|==|-\.)\s+\S.*?\s+(-->|---|==>|===|\.->)")
        .expect("invalid edge label regex")
});

static CLASS_SHORTHAND: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r":::[A-Za-z0-9_-]+").expect("invalid class shorthand regex"));

static SEQUENCE_MESSAGE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^:]*?(?:<<-{1,2}>>|-{1,2}>>|-{1,2}>|-{1,2}x|-{1,2}\))[+-]?[^:]*:")
        .expect("invalid sequence message regex")
});

/// Sequence-diagram keywords whose lines are never messages.
const SEQUENCE_KEYWORDS: &[&str] = &[
    "participant",
    "actor",
    "note",
    "title",
    "autonumber",
    "loop",
    "alt",
    "else",
    "opt",
    "par",
    "and",
    "rect",
    "end",
    "critical",
    "break",
    "option",
    "activate",
    "deactivate",
    "box",
    "create",
    "destroy",
    "link",
    "links",
];

/// Flowchart statements that style nodes rather than define or link them.
const FLOWCHART_DIRECTIVES: &[&str] = &["style", "classdef", "class", "linkstyle", "click"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Family {
    Flow,
    Sequence,
    EntityRelation,
    Other,
}

/// Run every structural check against `code`.
pub fn validate_structure(code: &str) -> ValidationResult {
    if code.trim().is_empty() {
        return ValidationResult::invalid("Diagram is empty");
    }

    let Some(declaration) = code
        .lines()
        .map(str::trim)
        .find(|l| !l.is_empty() && !is_comment(l))
    else {
        return ValidationResult::invalid("Diagram is empty");
    };

    let Some(family) = classify(declaration) else {
        let keyword = declaration.split_whitespace().next().unwrap_or(declaration);
        return ValidationResult::invalid(format!("Unknown diagram type: '{keyword}'"));
    };

    if let Err(e) = check_brackets(code, family == Family::EntityRelation) {
        return ValidationResult::invalid(e);
    }

    let checked = match family {
        Family::Flow => check_flowchart_nodes(code),
        Family::Sequence => check_sequence_messages(code),
        Family::EntityRelation | Family::Other => Ok(()),
    };

    match checked {
        Ok(()) => ValidationResult::ok(),
        Err(e) => ValidationResult::invalid(e),
    }
}

fn is_comment(line: &str) -> bool {
    line.starts_with("%%")
}

fn classify(declaration: &str) -> Option<Family> {
    let lower = declaration.to_ascii_lowercase();
    let known = KNOWN_DECLARATIONS
        .iter()
        .find(|d| lower.starts_with(&d.to_ascii_lowercase()))?;
    let family = match *known {
        "graph" | "flowchart" => Family::Flow,
        "sequenceDiagram" => Family::Sequence,
        "erDiagram" => Family::EntityRelation,
        _ => Family::Other,
    };
    Some(family)
}

fn closer_for(open: char) -> char {
    match open {
        '(' => ')',
        '[' => ']',
        _ => '}',
    }
}

/// Stack-based bracket matching over `()`, `[]` and `{}` with 1-based
/// line/column positions. Closed quoted spans and `%%` lines are skipped.
fn check_brackets(code: &str, mask_er: bool) -> Result<(), String> {
    let mut stack: Vec<(char, usize, usize)> = Vec::new();

    for (idx, raw) in code.lines().enumerate() {
        let line_no = idx + 1;
        if is_comment(raw.trim_start()) {
            continue;
        }
        let masked;
        let line = if mask_er {
            masked = ER_CARDINALITY.replace_all(raw, |caps: &regex::Captures| {
                " ".repeat(caps[0].chars().count())
            });
            masked.as_ref()
        } else {
            raw
        };
        let line = mask_quoted(line);

        for (col_idx, ch) in line.chars().enumerate() {
            let col = col_idx + 1;
            match ch {
                '(' | '[' | '{' => stack.push((ch, line_no, col)),
                ')' | ']' | '}' => match stack.pop() {
                    None => {
                        return Err(format!(
                            "Unexpected closing bracket '{ch}' at line {line_no}, column {col}"
                        ))
                    }
                    Some((open, open_line, open_col)) if closer_for(open) != ch => {
                        return Err(format!(
                            "Mismatched bracket '{ch}' at line {line_no}, column {col}: \
                             '{open}' opened at line {open_line}, column {open_col}"
                        ))
                    }
                    Some(_) => {}
                },
                _ => {}
            }
        }
    }

    match stack.pop() {
        Some((open, line, col)) => Err(format!(
            "Unclosed bracket '{open}' at line {line}, column {col}"
        )),
        None => Ok(()),
    }
}

/// Blank out every `"..."` span that closes on the same line, keeping
/// columns. A quote that never closes is left as plain text.
fn mask_quoted(line: &str) -> String {
    let mut chars: Vec<char> = line.chars().collect();
    let mut open = None;
    for i in 0..chars.len() {
        if chars[i] != '"' {
            continue;
        }
        match open.take() {
            Some(start) => chars[start..=i].fill(' '),
            None => open = Some(i),
        }
    }
    chars.into_iter().collect()
}

/// Every node referenced by an edge must have been defined with a shape.
fn check_flowchart_nodes(code: &str) -> Result<(), String> {
    let mut defined = BTreeSet::new();
    let mut referenced = BTreeSet::new();

    for line in code.lines().skip_while(|l| l.trim().is_empty() || is_comment(l.trim())).skip(1) {
        let trimmed = line.trim();
        if trimmed.is_empty() || is_comment(trimmed) {
            continue;
        }
        let first = trimmed
            .split_whitespace()
            .next()
            .unwrap_or_default()
            .to_ascii_lowercase();
        if FLOWCHART_DIRECTIVES.contains(&first.as_str()) {
            continue;
        }

        let cleaned = mask_quoted(trimmed);
        let cleaned = EDGE_LABEL.replace_all(&cleaned, "${1}${2} ${3}");
        let cleaned = CLASS_SHORTHAND.replace_all(&cleaned, "");

        for caps in NODE_DEFINITION.captures_iter(&cleaned) {
            defined.insert(caps[1].to_string());
        }
        for caps in NODE_REFERENCE.captures_iter(&cleaned) {
            referenced.insert(caps[1].to_string());
        }
    }

    let undefined: Vec<&str> = referenced
        .iter()
        .filter(|id| !defined.contains(*id))
        .map(String::as_str)
        .collect();

    if undefined.is_empty() {
        Ok(())
    } else {
        Err(format!("Undefined node(s) referenced: {}", undefined.join(", ")))
    }
}

/// Lines with a colon must look like `A->>B: text`.
fn check_sequence_messages(code: &str) -> Result<(), String> {
    let mut has_participants = false;

    for (idx, line) in code.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() || is_comment(trimmed) {
            continue;
        }
        let keyword = trimmed
            .split(|c: char| c.is_whitespace() || c == ':')
            .next()
            .unwrap_or_default()
            .to_ascii_lowercase();
        if keyword == "participant" || keyword == "actor" {
            has_participants = true;
            continue;
        }
        if SEQUENCE_KEYWORDS.contains(&keyword.as_str()) {
            continue;
        }
        if trimmed.contains(':') && !SEQUENCE_MESSAGE.is_match(trimmed) {
            return Err(format!(
                "Invalid sequence message at line {}: '{}'",
                idx + 1,
                trimmed
            ));
        }
    }

    if !has_participants {
        warn!("Sequence diagram declares no participants or actors");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_declaration_is_case_insensitive_prefix() {
        assert!(validate_structure("GRAPH LR\nA[x]").valid);
        assert!(validate_structure("stateDiagram-v2\n[*] --> Idle").valid);
        assert!(validate_structure("architecture-beta\ngroup api(cloud)[API]").valid);
    }

    #[test]
    fn test_comment_lines_before_declaration_are_skipped() {
        let code = "%%{init: {'theme': 'dark'}}%%\n%% note\nflowchart TD\nA[x]";
        assert!(validate_structure(code).valid);
    }

    #[test]
    fn test_unknown_declaration() {
        let result = validate_structure("diagram TD\nA-->B");
        assert!(!result.valid);
        assert!(result.error_text().starts_with("Unknown diagram type"));
    }

    #[test]
    fn test_brackets_in_quotes_are_ignored() {
        assert!(validate_structure("graph TD\nA[\"label (with paren\"]").valid);
    }

    #[test]
    fn test_unclosed_quote_does_not_hide_brackets() {
        let result = validate_structure("classDiagram\nA[\"x]");
        assert!(result.valid, "{:?}", result.error);

        let result = validate_structure("classDiagram\nA[\"x");
        assert_eq!(result.error_text(), "Unclosed bracket '[' at line 2, column 2");
    }

    #[test]
    fn test_mask_quoted_keeps_columns() {
        assert_eq!(mask_quoted(r#"A["(x"] B"#), "A[    ] B");
        assert_eq!(mask_quoted(r#"A["x]"#), r#"A["x]"#);
    }

    #[test]
    fn test_er_cardinality_is_masked() {
        let code = "erDiagram\nCUSTOMER ||--o{ ORDER : places\nORDER }|..|{ LINE : contains";
        assert!(validate_structure(code).valid);
    }

    #[test]
    fn test_unexpected_closing_bracket_position() {
        let result = validate_structure("graph TD\nA[x]]");
        assert_eq!(
            result.error_text(),
            "Unexpected closing bracket ']' at line 2, column 5"
        );
    }

    #[test]
    fn test_mismatched_bracket() {
        let result = validate_structure("graph TD\nA[x)");
        assert!(result.error_text().starts_with("Mismatched bracket ')' at line 2, column 4"));
    }

    #[test]
    fn test_undefined_flowchart_reference_sorted() {
        let result = validate_structure("graph TD\nZed --> A[x]\nB --> A");
        assert_eq!(result.error_text(), "Undefined node(s) referenced: B, Zed");
    }

    #[test]
    fn test_edge_label_words_are_not_node_references() {
        let code = "graph TD\nA[Client] -- calls --> B[API]\nB -. async job .-> C[(Queue)]\nC == drains ==> D[Worker]\nD -- ack --- A";
        let result = validate_structure(code);
        assert!(result.valid, "{:?}", result.error);
    }

    #[test]
    fn test_edge_label_does_not_hide_real_references() {
        let result = validate_structure("graph TD\nA[x] -- calls --> B[y]\nGhost -- pings --> B");
        assert_eq!(result.error_text(), "Undefined node(s) referenced: Ghost");

        let result = validate_structure("graph TD\nA[x] --- Ghost --> B[y]");
        assert_eq!(result.error_text(), "Undefined node(s) referenced: Ghost");
    }

    #[test]
    fn test_flowchart_style_lines_ignored() {
        let code = "graph TD\nA[x] --> B[y]\nstyle A fill:#f9f\nclassDef hot fill:#f00\nA:::hot --> B";
        assert!(validate_structure(code).valid);
    }

    #[test]
    fn test_sequence_message_shape() {
        let ok = "sequenceDiagram\nparticipant A\nparticipant B\nA->>B: hello\nB-->>A: done\nNote over A,B: fine";
        assert!(validate_structure(ok).valid);

        let bad = "sequenceDiagram\nparticipant A\nA talks to B: hello";
        let result = validate_structure(bad);
        assert_eq!(
            result.error_text(),
            "Invalid sequence message at line 3: 'A talks to B: hello'"
        );
    }

    #[test]
    fn test_sequence_without_participants_is_still_valid() {
        assert!(validate_structure("sequenceDiagram\nA->>B: hi").valid);
    }
}
