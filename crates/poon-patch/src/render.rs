//! Unified-diff rendering.
//!
//! Uses the `similar` crate (Myers diff algorithm) to group changes into
//! hunks with three lines of context, then writes them in the same format
//! the parser reads.

use similar::{ChangeTag, TextDiff};

const CONTEXT_LINES: usize = 3;

/// Render a unified diff turning `old` into `new` for the file at `path`.
///
/// Returns an empty string when the texts are identical.
pub fn render_unified(old: &str, new: &str, path: &str) -> String {
    if old == new {
        return String::new();
    }
    let diff = TextDiff::from_lines(old, new);
    let mut out = format!("--- a/{path}\n+++ b/{path}\n");

    for group in diff.grouped_ops(CONTEXT_LINES) {
        let (Some(first), Some(last)) = (group.first(), group.last()) else {
            continue;
        };
        let old_start = first.old_range().start;
        let old_len = last.old_range().end - old_start;
        let new_start = first.new_range().start;
        let new_len = last.new_range().end - new_start;
        out.push_str(&format!(
            "@@ -{} +{} @@\n",
            format_range(old_start, old_len),
            format_range(new_start, new_len)
        ));

        for op in &group {
            for change in diff.iter_changes(op) {
                let marker = match change.tag() {
                    ChangeTag::Equal => ' ',
                    ChangeTag::Delete => '-',
                    ChangeTag::Insert => '+',
                };
                let value = change.value();
                out.push(marker);
                out.push_str(value);
                if !value.ends_with('\n') {
                    out.push_str("\n\\ No newline at end of file\n");
                }
            }
        }
    }
    out
}

/// GNU range notation: `start` for one line, `start,len` otherwise, with an
/// empty range naming the line before it.
fn format_range(start: usize, len: usize) -> String {
    match len {
        0 => format!("{start},0"),
        1 => format!("{}", start + 1),
        _ => format!("{},{len}", start + 1),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::apply::apply_patch;
    use crate::parse::parse_patch;

    #[test]
    fn identical_is_empty() {
        assert_eq!(render_unified("same\n", "same\n", "f"), "");
    }

    #[test]
    fn single_line_change() {
        let diff = render_unified("hello\n", "world\n", "README.md");
        assert_eq!(
            diff,
            "--- a/README.md\n+++ b/README.md\n@@ -1 +1 @@\n-hello\n+world\n"
        );
    }

    #[test]
    fn new_file_range() {
        let diff = render_unified("", "a\nb\n", "n.txt");
        assert!(diff.contains("@@ -0,0 +1,2 @@"));
    }

    #[test]
    fn far_apart_changes_make_two_hunks() {
        let old: String = (1..=20).map(|i| format!("{i}\n")).collect();
        let new: String = (1..=20)
            .map(|i| match i {
                2 => "two\n".to_string(),
                19 => "nineteen\n".to_string(),
                _ => format!("{i}\n"),
            })
            .collect();
        let diff = render_unified(&old, &new, "n");
        assert_eq!(diff.matches("@@ -").count(), 2);
        let patch = parse_patch(diff.as_bytes()).unwrap();
        assert_eq!(apply_patch(old.as_bytes(), &patch), new.as_bytes());
    }

    #[test]
    fn marks_missing_newline() {
        let diff = render_unified("a\n", "a\nb", "f");
        assert!(diff.contains("+b\n\\ No newline at end of file\n"));
        let patch = parse_patch(diff.as_bytes()).unwrap();
        assert_eq!(apply_patch(b"a\n", &patch), b"a\nb\n");
    }
}
