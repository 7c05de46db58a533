use std::fmt::Write as _;

use diffy::{DiffOptions, Line};
use serde::{Deserialize, Serialize};

pub const CONTEXT_LINES: usize = 3;
pub const NO_CHANGES: &str = "(no changes)";
const NO_NEWLINE_MARKER: &str = "\\ No newline at end of file";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffHunk {
    pub old_start: usize,
    pub old_lines: usize,
    pub new_start: usize,
    pub new_lines: usize,
    /// Body lines with their ` `, `-` or `+` prefix and without terminators.
    pub lines: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnifiedDiff {
    /// Rendered diff, or [`NO_CHANGES`] when both sides are identical.
    pub text: String,
    pub hunks: Vec<DiffHunk>,
    pub additions: usize,
    pub deletions: usize,
}

impl UnifiedDiff {
    pub fn is_empty(&self) -> bool {
        self.hunks.is_empty()
    }
}

/// Unified diff of `old` -> `new` labelled `a/<path>` / `b/<path>`.
pub fn unified_diff(path: &str, old: &str, new: &str) -> UnifiedDiff {
    if old == new {
        return UnifiedDiff {
            text: NO_CHANGES.to_string(),
            hunks: Vec::new(),
            additions: 0,
            deletions: 0,
        };
    }

    let mut options = DiffOptions::new();
    options.set_context_len(CONTEXT_LINES);
    let patch = options.create_patch(old, new);

    let mut text = String::new();
    let _ = write!(text, "--- a/{path}\n+++ b/{path}\n");
    let mut hunks = Vec::with_capacity(patch.hunks().len());
    let mut additions = 0usize;
    let mut deletions = 0usize;

    for hunk in patch.hunks() {
        let old_range = hunk.old_range();
        let new_range = hunk.new_range();
        let _ = writeln!(
            text,
            "@@ -{},{} +{},{} @@",
            old_range.start(),
            old_range.len(),
            new_range.start(),
            new_range.len()
        );

        let mut lines = Vec::with_capacity(hunk.lines().len());
        for line in hunk.lines() {
            let (prefix, body) = match line {
                Line::Context(body) => (' ', *body),
                Line::Delete(body) => {
                    deletions += 1;
                    ('-', *body)
                }
                Line::Insert(body) => {
                    additions += 1;
                    ('+', *body)
                }
            };
            text.push(prefix);
            text.push_str(body);
            match body.strip_suffix('\n') {
                Some(stripped) => lines.push(format!("{prefix}{stripped}")),
                None => {
                    text.push('\n');
                    text.push_str(NO_NEWLINE_MARKER);
                    text.push('\n');
                    lines.push(format!("{prefix}{body}"));
                }
            }
        }

        hunks.push(DiffHunk {
            old_start: old_range.start(),
            old_lines: old_range.len(),
            new_start: new_range.start(),
            new_lines: new_range.len(),
            lines,
        });
    }

    UnifiedDiff {
        text,
        hunks,
        additions,
        deletions,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use diffy::{Patch, apply};

    fn assert_applies(old: &str, new: &str) {
        let diff = unified_diff("f.txt", old, new);
        let patch = Patch::from_str(&diff.text).expect("rendered diff parses");
        assert_eq!(apply(old, &patch).expect("patch applies"), new);
    }

    #[test]
    fn identical_content_yields_sentinel() {
        let diff = unified_diff("notes.md", "a\nb\n", "a\nb\n");
        assert_eq!(diff.text, NO_CHANGES);
        assert!(diff.is_empty());
        assert_eq!((diff.additions, diff.deletions), (0, 0));
    }

    #[test]
    fn single_line_change_renders_headers_and_context() {
        let diff = unified_diff("x.md", "a\nb\nc\n", "a\nB\nc\n");
        assert!(diff.text.starts_with("--- a/x.md\n+++ b/x.md\n"), "{}", diff.text);
        assert!(diff.text.contains("@@ -1,3 +1,3 @@\n"), "{}", diff.text);
        assert!(diff.text.contains("-b\n+B\n"), "{}", diff.text);
        assert_eq!(diff.hunks.len(), 1);
        assert_eq!(diff.hunks[0].lines, vec![" a", "-b", "+B", " c"]);
        assert_eq!((diff.additions, diff.deletions), (1, 1));
    }

    #[test]
    fn distant_changes_produce_separate_hunks() {
        let old: String = (1..=30).map(|n| format!("line {n}\n")).collect();
        let new = old
            .replace("line 2\n", "line two\n")
            .replace("line 28\n", "line twenty-eight\n");
        let diff = unified_diff("long.txt", &old, &new);
        assert_eq!(diff.hunks.len(), 2);
        assert!(diff.hunks[0].old_start < diff.hunks[1].old_start);
        assert_applies(&old, &new);
    }

    #[test]
    fn marks_missing_trailing_newline() {
        let diff = unified_diff("a.txt", "a\nb", "a\nc");
        assert!(diff.text.contains(NO_NEWLINE_MARKER), "{}", diff.text);
        assert_applies("a\nb", "a\nc");
    }

    #[test]
    fn applying_the_diff_reproduces_new_content() {
        let cases = [
            ("", "hello\n"),
            ("hello\n", ""),
            ("a\nb\nc\n", "a\nc\n"),
            ("a\nb\nc\n", "z\na\nb\nc\nd\n"),
            ("one\ntwo\n", "one\ntwo"),
        ];
        for (old, new) in cases {
            assert_applies(old, new);
        }
    }
}
