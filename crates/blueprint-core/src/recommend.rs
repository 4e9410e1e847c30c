//! Diagram-type recommendation matching.
//!
//! The recommendation stage answers in free text. Each line is tokenized into
//! lowercase words and matched against a closed keyword vocabulary; the
//! keyword starting earliest on the line decides the line's kind.

use crate::domain::DiagramKind;

/// Upper bound on specialized diagrams per run.
pub const MAX_SPECIALIZED_DIAGRAMS: usize = 3;

/// Keyword vocabulary, as word sequences.
const VOCABULARY: &[(&[&str], DiagramKind)] = &[
    (&["flowchart"], DiagramKind::Flowchart),
    (&["flow", "chart"], DiagramKind::Flowchart),
    (&["entity", "relationship"], DiagramKind::EntityRelation),
    (&["erd"], DiagramKind::EntityRelation),
    (&["er"], DiagramKind::EntityRelation),
    (&["class"], DiagramKind::Class),
    (&["state"], DiagramKind::State),
    (&["gantt"], DiagramKind::Timeline),
    (&["timeline"], DiagramKind::Timeline),
    (&["pie"], DiagramKind::Distribution),
];

fn tokenize(line: &str) -> Vec<String> {
    line.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(|w| w.to_lowercase())
        .collect()
}

/// Kind named by `line`, if any.
pub fn match_line(line: &str) -> Option<DiagramKind> {
    let words = tokenize(line);
    (0..words.len()).find_map(|start| {
        VOCABULARY.iter().find_map(|(keyword, kind)| {
            let end = start + keyword.len();
            (end <= words.len() && words[start..end].iter().zip(keyword.iter()).all(|(w, k)| w == k))
                .then_some(*kind)
        })
    })
}

/// Distinct kinds named in `text`, in first-seen order, at most
/// [`MAX_SPECIALIZED_DIAGRAMS`].
pub fn recommend_diagram_kinds(text: &str) -> Vec<DiagramKind> {
    let mut kinds: Vec<DiagramKind> = Vec::new();
    for kind in text.lines().filter_map(match_line) {
        if !kinds.contains(&kind) {
            kinds.push(kind);
        }
        if kinds.len() == MAX_SPECIALIZED_DIAGRAMS {
            break;
        }
    }
    kinds
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_earliest_keyword_on_line_wins() {
        assert_eq!(
            match_line("1. State diagram: unlike a flowchart, shows lifecycle"),
            Some(DiagramKind::State)
        );
        assert_eq!(
            match_line("- Flow chart of the class hierarchy"),
            Some(DiagramKind::Flowchart)
        );
    }

    #[test]
    fn test_words_not_substrings() {
        assert_eq!(match_line("The ordering service is stateless"), None);
        assert_eq!(match_line("Discuss the user interface"), None);
        assert_eq!(match_line("Pipeline throughput"), None);
    }

    #[test]
    fn test_entity_relationship_spellings() {
        for line in ["ER diagram", "ERD: orders", "Entity-Relationship model", "entity relationship"] {
            assert_eq!(match_line(line), Some(DiagramKind::EntityRelation), "{line}");
        }
    }

    #[test]
    fn test_timeline_and_distribution() {
        assert_eq!(match_line("Gantt: rollout"), Some(DiagramKind::Timeline));
        assert_eq!(match_line("Pie chart of cost"), Some(DiagramKind::Distribution));
    }

    #[test]
    fn test_dedup_and_cap() {
        let text = "Flowchart: a\nflow chart again\nER: b\nClass: c\nState: d\nPie: e";
        assert_eq!(
            recommend_diagram_kinds(text),
            vec![
                DiagramKind::Flowchart,
                DiagramKind::EntityRelation,
                DiagramKind::Class
            ]
        );
    }

    #[test]
    fn test_no_keywords() {
        assert!(recommend_diagram_kinds("Nothing useful here.\nReally.").is_empty());
    }
}
