// ABOUTME: Progressive matcher — locates a search block under strict, whitespace, or fuzzy tolerance.
// ABOUTME: Never guesses silently: ambiguity and misses are surfaced, fuzzy hits carry a warning.

use std::ops::Range;

use serde::{Deserialize, Serialize};
use similar::TextDiff;

/// How much textual drift the matcher tolerates when locating a search block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchTolerance {
    /// Byte-exact substring match.
    Strict,
    /// Per-line comparison after trimming leading/trailing whitespace.
    Whitespace,
    /// Similarity-scored sliding windows, accepted at or above the threshold.
    Fuzzy,
}

/// Minimum similarity for a fuzzy window to be accepted.
pub const FUZZY_THRESHOLD: f64 = 0.8;

/// How many near-miss candidates a fuzzy NotFound reports.
const MAX_SUGGESTIONS: usize = 3;

/// The outcome of locating a search block in a haystack.
#[derive(Debug, Clone, PartialEq)]
pub enum MatchResult {
    Found {
        /// Byte range of the matched region, excluding its final line terminator.
        range: Range<usize>,
        /// 1.0 for strict and whitespace hits, the similarity score for fuzzy.
        confidence: f64,
        /// Present on fuzzy hits, stating the achieved similarity percentage.
        warning: Option<String>,
    },
    /// More than one location matched; the caller must disambiguate.
    Ambiguous { ranges: Vec<Range<usize>> },
    /// Nothing matched; fuzzy misses carry ranked "did you mean" candidates.
    NotFound { suggestions: Vec<String> },
}

/// Byte span of one line's content, excluding its terminator.
#[derive(Debug, Clone, Copy)]
struct LineSpan {
    start: usize,
    end: usize,
}

fn line_spans(text: &str) -> Vec<LineSpan> {
    let bytes = text.as_bytes();
    let mut spans = Vec::new();
    let mut start = 0;
    for (i, &b) in bytes.iter().enumerate() {
        if b == b'\n' {
            let mut end = i;
            if end > start && bytes[end - 1] == b'\r' {
                end -= 1;
            }
            spans.push(LineSpan { start, end });
            start = i + 1;
        }
    }
    if start < bytes.len() {
        spans.push(LineSpan {
            start,
            end: bytes.len(),
        });
    }
    spans
}

/// Split a search block into its lines, dropping carriage returns and the
/// empty tail produced by a trailing newline.
fn search_lines(search: &str) -> Vec<&str> {
    let mut lines: Vec<&str> = search
        .split('\n')
        .map(|l| l.strip_suffix('\r').unwrap_or(l))
        .collect();
    if lines.last() == Some(&"") {
        lines.pop();
    }
    lines
}

/// Locate `search` inside `haystack` under the given tolerance.
pub fn find(haystack: &str, search: &str, tolerance: MatchTolerance) -> MatchResult {
    if search.trim().is_empty() {
        return MatchResult::NotFound {
            suggestions: Vec::new(),
        };
    }
    match tolerance {
        MatchTolerance::Strict => find_strict(haystack, search),
        MatchTolerance::Whitespace => find_whitespace(haystack, search),
        MatchTolerance::Fuzzy => find_fuzzy(haystack, search),
    }
}

fn find_strict(haystack: &str, search: &str) -> MatchResult {
    let ranges: Vec<Range<usize>> = haystack
        .match_indices(search)
        .map(|(start, matched)| start..start + matched.len())
        .collect();

    match ranges.len() {
        0 => MatchResult::NotFound {
            suggestions: Vec::new(),
        },
        1 => MatchResult::Found {
            range: ranges.into_iter().next().expect("one range"),
            confidence: 1.0,
            warning: None,
        },
        _ => MatchResult::Ambiguous { ranges },
    }
}

fn find_whitespace(haystack: &str, search: &str) -> MatchResult {
    let needle = search_lines(search);
    let spans = line_spans(haystack);
    if needle.is_empty() || spans.len() < needle.len() {
        return MatchResult::NotFound {
            suggestions: Vec::new(),
        };
    }

    let mut ranges = Vec::new();
    for window_start in 0..=spans.len() - needle.len() {
        let hit = needle.iter().enumerate().all(|(k, search_line)| {
            let span = spans[window_start + k];
            haystack[span.start..span.end].trim() == search_line.trim()
        });
        if hit {
            let first = spans[window_start];
            let last = spans[window_start + needle.len() - 1];
            ranges.push(first.start..last.end);
        }
    }

    match ranges.len() {
        0 => MatchResult::NotFound {
            suggestions: Vec::new(),
        },
        1 => MatchResult::Found {
            range: ranges.into_iter().next().expect("one range"),
            confidence: 1.0,
            warning: None,
        },
        _ => MatchResult::Ambiguous { ranges },
    }
}

/// Similarity between two texts: the character-level diff ratio from
/// `similar`, a normalized measure in 0..=1. Chosen over a line-level ratio
/// so a one-character typo on a long line still scores near 1.
fn similarity(a: &str, b: &str) -> f64 {
    TextDiff::from_chars(a, b).ratio() as f64
}

fn find_fuzzy(haystack: &str, search: &str) -> MatchResult {
    let needle_height = search_lines(search).len();
    let spans = line_spans(haystack);
    if needle_height == 0 || spans.len() < needle_height {
        return MatchResult::NotFound {
            suggestions: Vec::new(),
        };
    }

    let normalized_search: String = {
        let mut s = search.replace('\r', "");
        if s.ends_with('\n') {
            s.pop();
        }
        s
    };

    // Score every same-height window; earliest window wins a tied top score.
    let mut scored: Vec<(usize, Range<usize>, f64)> = Vec::new();
    for window_start in 0..=spans.len() - needle_height {
        let first = spans[window_start];
        let last = spans[window_start + needle_height - 1];
        let window_text = haystack[first.start..last.end].replace('\r', "");
        let score = similarity(&normalized_search, &window_text);
        scored.push((window_start, first.start..last.end, score));
    }

    let best = scored
        .iter()
        .cloned()
        .max_by(|a, b| {
            // Strictly-greater comparison keeps the earliest window on ties.
            a.2.partial_cmp(&b.2)
                .expect("similarity is never NaN")
                .then(b.0.cmp(&a.0))
        })
        .expect("at least one window");

    if best.2 >= FUZZY_THRESHOLD {
        return MatchResult::Found {
            range: best.1,
            confidence: best.2,
            warning: Some(format!(
                "fuzzy match accepted at {:.1}% similarity",
                best.2 * 100.0
            )),
        };
    }

    scored.sort_by(|a, b| {
        b.2.partial_cmp(&a.2)
            .expect("similarity is never NaN")
            .then(a.0.cmp(&b.0))
    });
    let suggestions = scored
        .iter()
        .take(MAX_SUGGESTIONS)
        .filter(|(_, _, score)| *score > 0.0)
        .map(|(window_start, range, score)| {
            let first_line = haystack[range.clone()].lines().next().unwrap_or("");
            let snippet: String = first_line.chars().take(60).collect();
            format!(
                "line {}: {:?} ({:.0}% similar)",
                window_start + 1,
                snippet,
                score * 100.0
            )
        })
        .collect();

    MatchResult::NotFound { suggestions }
}

/// Re-indent a replacement block to the indentation and line-ending style
/// observed at the match site, so whitespace-tolerant and fuzzy edits write
/// back text that fits its surroundings.
pub fn reindent_replacement(
    haystack: &str,
    range: &Range<usize>,
    search: &str,
    replacement: &str,
) -> String {
    let site = &haystack[range.clone()];
    let crlf = site.contains("\r\n") || haystack[range.end..].starts_with("\r\n");
    let ending = if crlf { "\r\n" } else { "\n" };

    let site_indent = leading_whitespace(site.lines().next().unwrap_or(""));
    let search_indent = leading_whitespace(search.lines().next().unwrap_or(""));

    let lines: Vec<String> = replacement
        .split('\n')
        .map(|raw| {
            let line = raw.strip_suffix('\r').unwrap_or(raw);
            if line.trim().is_empty() {
                return String::new();
            }
            match line.strip_prefix(search_indent) {
                Some(rest) => format!("{site_indent}{rest}"),
                // The replacement uses its own indentation scheme; leave it.
                None => line.to_string(),
            }
        })
        .collect();

    lines.join(ending)
}

fn leading_whitespace(line: &str) -> &str {
    &line[..line.len() - line.trim_start().len()]
}

#[cfg(test)]
mod tests {
    use super::*;

    const HAYSTACK: &str = "fn alpha() {\n    one();\n}\n\nfn beta() {\n    two();\n}\n";

    #[test]
    fn strict_unique_match_is_found() {
        let result = find(HAYSTACK, "fn alpha() {", MatchTolerance::Strict);
        match result {
            MatchResult::Found {
                range, confidence, ..
            } => {
                assert_eq!(&HAYSTACK[range], "fn alpha() {");
                assert_eq!(confidence, 1.0);
            }
            other => panic!("expected Found, got {:?}", other),
        }
    }

    #[test]
    fn strict_duplicate_match_is_ambiguous() {
        let result = find(HAYSTACK, "();\n}", MatchTolerance::Strict);
        match result {
            MatchResult::Ambiguous { ranges } => assert_eq!(ranges.len(), 2),
            other => panic!("expected Ambiguous, got {:?}", other),
        }
    }

    #[test]
    fn strict_absent_search_is_not_found_without_suggestions() {
        let result = find(HAYSTACK, "fn gamma()", MatchTolerance::Strict);
        assert_eq!(
            result,
            MatchResult::NotFound {
                suggestions: Vec::new()
            },
        );
    }

    #[test]
    fn empty_search_never_matches() {
        for tolerance in [
            MatchTolerance::Strict,
            MatchTolerance::Whitespace,
            MatchTolerance::Fuzzy,
        ] {
            let result = find(HAYSTACK, "  \n ", tolerance);
            assert!(matches!(result, MatchResult::NotFound { .. }));
        }
    }

    #[test]
    fn whitespace_tolerates_indentation_drift() {
        // Search copied from a differently-indented source.
        let result = find(HAYSTACK, "one();", MatchTolerance::Whitespace);
        match result {
            MatchResult::Found { range, .. } => {
                assert_eq!(&HAYSTACK[range], "    one();");
            }
            other => panic!("expected Found, got {:?}", other),
        }
    }

    #[test]
    fn whitespace_multiline_window_matches() {
        let search = "fn beta() {\ntwo();\n}";
        let result = find(HAYSTACK, search, MatchTolerance::Whitespace);
        match result {
            MatchResult::Found { range, .. } => {
                assert_eq!(&HAYSTACK[range], "fn beta() {\n    two();\n}");
            }
            other => panic!("expected Found, got {:?}", other),
        }
    }

    #[test]
    fn whitespace_duplicate_windows_are_ambiguous() {
        let haystack = "  x = 1\n  x = 1\n";
        let result = find(haystack, "x = 1", MatchTolerance::Whitespace);
        match result {
            MatchResult::Ambiguous { ranges } => assert_eq!(ranges.len(), 2),
            other => panic!("expected Ambiguous, got {:?}", other),
        }
    }

    #[test]
    fn fuzzy_accepts_single_character_typo() {
        let haystack = "let connection_timeout = Duration::from_secs(30);\nlet retries = 3;\n";
        // "timeout" misspelled as "timout".
        let search = "let connection_timout = Duration::from_secs(30);";
        let result = find(haystack, search, MatchTolerance::Fuzzy);
        match result {
            MatchResult::Found {
                range,
                confidence,
                warning,
            } => {
                assert!(confidence >= FUZZY_THRESHOLD);
                assert!(haystack[range].contains("connection_timeout"));
                let warning = warning.expect("fuzzy hits carry a warning");
                assert!(warning.contains("similarity"));
            }
            other => panic!("expected Found, got {:?}", other),
        }
    }

    #[test]
    fn fuzzy_rejects_dissimilar_search_with_suggestions() {
        let haystack = "alpha beta gamma\ndelta epsilon zeta\n";
        let result = find(haystack, "completely unrelated text here", MatchTolerance::Fuzzy);
        match result {
            MatchResult::NotFound { suggestions } => {
                assert!(!suggestions.is_empty());
                assert!(suggestions.len() <= 3);
                assert!(suggestions[0].contains("% similar"));
            }
            other => panic!("expected NotFound, got {:?}", other),
        }
    }

    #[test]
    fn fuzzy_earliest_window_wins_ties() {
        let haystack = "same line\nsame line\n";
        let result = find(haystack, "same line", MatchTolerance::Fuzzy);
        match result {
            MatchResult::Found { range, .. } => assert_eq!(range.start, 0),
            other => panic!("expected Found, got {:?}", other),
        }
    }

    #[test]
    fn fuzzy_search_taller_than_haystack_is_not_found() {
        let result = find("only one line", "a\nb\nc\nd", MatchTolerance::Fuzzy);
        assert!(matches!(result, MatchResult::NotFound { .. }));
    }

    #[test]
    fn reindent_applies_site_indentation() {
        let haystack = "fn f() {\n        deep();\n}\n";
        let range = match find(haystack, "deep();", MatchTolerance::Whitespace) {
            MatchResult::Found { range, .. } => range,
            other => panic!("expected Found, got {:?}", other),
        };
        let replaced = reindent_replacement(haystack, &range, "deep();", "shallow();");
        assert_eq!(replaced, "        shallow();");
    }

    #[test]
    fn reindent_preserves_relative_nesting() {
        let haystack = "    if ready {\n        go();\n    }\n";
        let search = "if ready {\n    go();\n}";
        let range = match find(haystack, search, MatchTolerance::Whitespace) {
            MatchResult::Found { range, .. } => range,
            other => panic!("expected Found, got {:?}", other),
        };
        let replacement = "if ready {\n    go();\n    log();\n}";
        let replaced = reindent_replacement(haystack, &range, search, replacement);
        assert_eq!(replaced, "    if ready {\n        go();\n        log();\n    }");
    }

    #[test]
    fn reindent_converts_line_endings_to_site_style() {
        let haystack = "a\r\n    old();\r\nb\r\n";
        let range = match find(haystack, "old();", MatchTolerance::Whitespace) {
            MatchResult::Found { range, .. } => range,
            other => panic!("expected Found, got {:?}", other),
        };
        let replaced = reindent_replacement(haystack, &range, "old();", "new();\nnewer();");
        assert_eq!(replaced, "    new();\r\n    newer();");
    }

    #[test]
    fn reindent_preserves_indent_character() {
        let haystack = "\tfirst();\n\tsecond();\n";
        let range = match find(haystack, "first();", MatchTolerance::Whitespace) {
            MatchResult::Found { range, .. } => range,
            other => panic!("expected Found, got {:?}", other),
        };
        let replaced = reindent_replacement(haystack, &range, "first();", "zeroth();");
        assert_eq!(replaced, "\tzeroth();");
    }

    #[test]
    fn tolerance_serde_uses_lowercase() {
        let json = serde_json::to_string(&MatchTolerance::Whitespace).unwrap();
        assert_eq!(json, "\"whitespace\"");
        let parsed: MatchTolerance = serde_json::from_str("\"fuzzy\"").unwrap();
        assert_eq!(parsed, MatchTolerance::Fuzzy);
    }

    #[test]
    fn line_spans_exclude_terminators() {
        let spans = line_spans("ab\r\ncd\nef");
        assert_eq!(spans.len(), 3);
        assert_eq!((spans[0].start, spans[0].end), (0, 2));
        assert_eq!((spans[1].start, spans[1].end), (4, 6));
        assert_eq!((spans[2].start, spans[2].end), (7, 9));
    }
}
