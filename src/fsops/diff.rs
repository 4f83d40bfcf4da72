// ABOUTME: Unified diff previews and disjoint changed-region extraction.
// ABOUTME: Used for dry-run output, approval context, and the per-request edit cap.

use similar::{DiffTag, TextDiff};

/// A line-oriented diff of one mutation, derived from old and new content.
#[derive(Debug, Clone)]
pub struct DiffPreview {
    /// Unified diff text with headers, stable for identical inputs.
    pub unified_text: String,
    /// Disjoint changed line ranges in the new text, 1-based inclusive.
    /// Pure deletions are anchored at the line before the removal.
    pub changed_ranges: Vec<(usize, usize)>,
}

impl DiffPreview {
    /// Number of disjoint edited regions.
    pub fn edit_count(&self) -> usize {
        self.changed_ranges.len()
    }
}

/// Produce a unified diff preview between two texts.
pub fn diff_preview(label: &str, old: &str, new: &str) -> DiffPreview {
    let diff = TextDiff::from_lines(old, new);

    let mut unified_text = String::new();
    unified_text.push_str(&format!("--- a/{label}\n"));
    unified_text.push_str(&format!("+++ b/{label}\n"));
    for hunk in diff.unified_diff().context_radius(3).iter_hunks() {
        unified_text.push_str(&format!("{hunk}"));
    }

    DiffPreview {
        unified_text,
        changed_ranges: changed_ranges(&diff),
    }
}

/// Collect disjoint changed regions as line ranges in the new text.
///
/// The diff's grouped ops already fold an adjacent delete+insert into one
/// Replace, so each non-equal op is one disjoint region.
fn changed_ranges(diff: &TextDiff<'_, '_, '_, str>) -> Vec<(usize, usize)> {
    let mut ranges = Vec::new();
    for op in diff.ops() {
        let new_range = op.new_range();
        match op.tag() {
            DiffTag::Equal => {}
            DiffTag::Insert | DiffTag::Replace => {
                ranges.push((new_range.start + 1, new_range.end));
            }
            DiffTag::Delete => {
                // Nothing remains in the new text; anchor at the line
                // preceding the removal.
                let anchor = new_range.start.max(1);
                ranges.push((anchor, anchor));
            }
        }
    }
    ranges
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_inputs_produce_no_ranges() {
        let preview = diff_preview("a.txt", "same\ntext\n", "same\ntext\n");
        assert!(preview.changed_ranges.is_empty());
        assert_eq!(preview.edit_count(), 0);
    }

    #[test]
    fn diff_output_is_stable() {
        let a = diff_preview("a.txt", "one\ntwo\n", "one\nTWO\n");
        let b = diff_preview("a.txt", "one\ntwo\n", "one\nTWO\n");
        assert_eq!(a.unified_text, b.unified_text);
    }

    #[test]
    fn unified_text_carries_headers_and_markers() {
        let preview = diff_preview("src/x.rs", "old line\n", "new line\n");
        assert!(preview.unified_text.contains("--- a/src/x.rs"));
        assert!(preview.unified_text.contains("+++ b/src/x.rs"));
        assert!(preview.unified_text.contains("-old line"));
        assert!(preview.unified_text.contains("+new line"));
    }

    #[test]
    fn single_replacement_is_one_region() {
        let old = "a\nb\nc\nd\n";
        let new = "a\nB\nc\nd\n";
        let preview = diff_preview("f", old, new);
        assert_eq!(preview.changed_ranges, vec![(2, 2)]);
    }

    #[test]
    fn separated_edits_are_distinct_regions() {
        let old = "a\nb\nc\nd\ne\nf\ng\n";
        let new = "a\nB\nc\nd\ne\nF\ng\n";
        let preview = diff_preview("f", old, new);
        assert_eq!(preview.edit_count(), 2);
        assert_eq!(preview.changed_ranges, vec![(2, 2), (6, 6)]);
    }

    #[test]
    fn multiline_insertion_is_one_region() {
        let old = "a\nb\n";
        let new = "a\nx\ny\nz\nb\n";
        let preview = diff_preview("f", old, new);
        assert_eq!(preview.edit_count(), 1);
        assert_eq!(preview.changed_ranges, vec![(2, 4)]);
    }

    #[test]
    fn pure_deletion_is_counted() {
        let old = "a\nb\nc\n";
        let new = "a\nc\n";
        let preview = diff_preview("f", old, new);
        assert_eq!(preview.edit_count(), 1);
    }

    #[test]
    fn full_file_creation_is_one_region() {
        let preview = diff_preview("f", "", "one\ntwo\nthree\n");
        assert_eq!(preview.edit_count(), 1);
        assert_eq!(preview.changed_ranges, vec![(1, 3)]);
    }
}
