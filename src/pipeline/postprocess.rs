//! Post-processing: deterministic cleanup of model-generated diagram text.
//!
//! Even when told "no markdown formatting", VLMs regularly wrap their answer
//! in a fenced code block (```` ```plantuml … ``` ````). Rendering services
//! choke on the fence lines, so they are removed here.
//!
//! Only the *outer* fence is peeled: the opener must be the first line and
//! the closer the last line, and a closer is only removed together with an
//! opener. A body line that happens to start with three backticks (a note,
//! a quoted string) is kept as is.
//!
//! ## Rule Order
//!
//! 1. Normalise line endings (CRLF → LF) so fence detection sees clean lines
//! 2. Peel outer fences until none are left (models occasionally double-wrap)
//! 3. Trim surrounding whitespace

use once_cell::sync::Lazy;
use regex::Regex;

/// Apply all post-processing rules to the raw model output.
///
/// Idempotent: `clean_diagram_text(&clean_diagram_text(x)) == clean_diagram_text(x)`.
pub fn clean_diagram_text(input: &str) -> String {
    let s = normalise_line_endings(input);
    let s = strip_outer_fences(&s);
    s.trim().to_string()
}

// ── Rule 1: Normalise line endings ───────────────────────────────────────────

fn normalise_line_endings(input: &str) -> String {
    input.replace("\r\n", "\n").replace('\r', "\n")
}

// ── Rule 2: Strip outer fences ───────────────────────────────────────────────

/// Opening fence: three backticks plus an optional info string
/// (`plantuml`, `mermaid title`, ` zenuml`, …) with no further backticks.
static RE_FENCE_OPENER: Lazy<Regex> = Lazy::new(|| Regex::new(r"^```[^`]*$").unwrap());

fn is_fence_opener(line: &str) -> bool {
    RE_FENCE_OPENER.is_match(line.trim())
}

fn is_fence_closer(line: &str) -> bool {
    line.trim() == "```"
}

/// Peel a leading opener line and its trailing closer line, repeatedly.
///
/// The closer may be missing: a reply truncated by `max_tokens` has an
/// opener but no closer, and should still lose the opener. A closer without
/// an opener is left alone, so the text never ends up half-fenced.
fn strip_outer_fences(input: &str) -> String {
    let mut current = input.trim();
    loop {
        let mut next = current;

        match next.lines().next() {
            Some(first) if is_fence_opener(first) => {
                next = next[first.len()..].trim_start_matches('\n');
            }
            _ => return current.to_string(),
        }

        if let Some(last) = next.lines().next_back() {
            if is_fence_closer(last) {
                next = next[..next.len() - last.len()].trim_end_matches('\n');
            }
        }

        let next = next.trim();
        if next.len() == current.len() {
            return next.to_string();
        }
        current = next;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_plantuml_fence() {
        let input = "```plantuml\n@startuml\nA->B\n@enduml\n```";
        assert_eq!(clean_diagram_text(input), "@startuml\nA->B\n@enduml");
    }

    #[test]
    fn strips_fence_without_language() {
        let input = "```\ngraph TD;A-->B;\n```";
        assert_eq!(clean_diagram_text(input), "graph TD;A-->B;");
    }

    #[test]
    fn no_fences_passthrough() {
        let input = "  sequenceDiagram\n  A->>B: hi\n";
        assert_eq!(clean_diagram_text(input), "sequenceDiagram\n  A->>B: hi");
    }

    #[test]
    fn inner_backtick_lines_survive() {
        let input = "```plantuml\n@startuml\nnote left\n```code```\nend note\n@enduml\n```";
        assert_eq!(
            clean_diagram_text(input),
            "@startuml\nnote left\n```code```\nend note\n@enduml"
        );
    }

    #[test]
    fn inner_bare_fence_line_survives() {
        let input = "@startuml\nnote: ```\n```\nA->B\n@enduml";
        assert_eq!(clean_diagram_text(input), input);
    }

    #[test]
    fn crlf_and_surrounding_prose_whitespace() {
        let input = "\r\n```mermaid\r\ngraph LR\r\n  A --> B\r\n```\r\n\r\n";
        assert_eq!(clean_diagram_text(input), "graph LR\n  A --> B");
    }

    #[test]
    fn opener_with_info_string_is_peeled_with_its_closer() {
        let input = "```plantuml title\n@startuml\nA->B\n@enduml\n```";
        assert_eq!(clean_diagram_text(input), "@startuml\nA->B\n@enduml");

        let input = "``` plantuml\n@startuml\nA->B\n@enduml\n```";
        assert_eq!(clean_diagram_text(input), "@startuml\nA->B\n@enduml");
    }

    #[test]
    fn lone_closer_is_kept() {
        let input = "@startuml\nA->B\n@enduml\n```";
        assert_eq!(clean_diagram_text(input), input);
    }

    #[test]
    fn inline_backticks_on_first_line_are_not_an_opener() {
        let input = "```code``` A->B\n```";
        assert_eq!(clean_diagram_text(input), input);
    }

    #[test]
    fn truncated_reply_loses_opener() {
        let input = "```plantuml\n@startuml\nA->B";
        assert_eq!(clean_diagram_text(input), "@startuml\nA->B");
    }

    #[test]
    fn double_wrapped_is_fully_peeled() {
        let input = "```markdown\n```plantuml\n@startuml\n@enduml\n```\n```";
        assert_eq!(clean_diagram_text(input), "@startuml\n@enduml");
    }

    #[test]
    fn idempotent() {
        let samples = [
            "```plantuml\n@startuml\nA->B\n@enduml\n```",
            "```\n```\nx\n```\n```",
            "graph TD;A-->B;",
            "",
            "```",
            "```mermaid\n```",
        ];
        for s in samples {
            let once = clean_diagram_text(s);
            assert_eq!(clean_diagram_text(&once), once, "input: {s:?}");
        }
    }

    #[test]
    fn only_fences_yields_empty() {
        assert_eq!(clean_diagram_text("```plantuml\n```"), "");
        assert_eq!(clean_diagram_text("```"), "");
    }

    #[test]
    fn opener_regex() {
        assert!(is_fence_opener("```"));
        assert!(is_fence_opener("```plantuml"));
        assert!(is_fence_opener("```c++ "));
        assert!(is_fence_opener("```plantuml title"));
        assert!(is_fence_opener("``` mermaid"));
        assert!(!is_fence_opener("```x```"));
        assert!(!is_fence_opener("``"));
    }
}
