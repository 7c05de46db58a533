//! Search/replace matcher shared by content search and pattern-targeted edits.
//!
//! A [`Matcher`] is compiled once per request, either from caller text under a [`PatternMode`]
//! or from a [`Preset`]. Matching always runs with `^`/`$` anchored at line boundaries.

mod presets;

use std::ops::Range;

use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

pub use presets::Preset;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternMode {
    /// The pattern text matches verbatim.
    #[default]
    Literal,
    Regex,
    /// Literal text that tolerates differences in whitespace and indentation.
    Fuzzy,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatternOptions {
    #[serde(default)]
    pub mode: PatternMode,
    #[serde(default)]
    pub case_insensitive: bool,
    #[serde(default)]
    pub whole_word: bool,
    /// `.` also matches newlines.
    #[serde(default)]
    pub multiline: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchMatch {
    /// Byte offset of the match in the content.
    pub index: usize,
    pub text: String,
    pub line: usize,
    /// 1-indexed, counted in characters.
    pub column: usize,
}

/// Location of a single match, used to target edits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchSpan {
    pub range: Range<usize>,
    pub line: usize,
    /// Line holding the last character of the match.
    pub end_line: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Replaced {
    pub content: String,
    pub count: usize,
    /// Sorted, distinct starting lines of the replaced matches.
    pub lines: Vec<usize>,
}

#[derive(Debug, Clone)]
pub struct Matcher {
    regex: Regex,
    group: usize,
    label: String,
}

impl Matcher {
    pub fn compile(
        pattern: &str,
        options: PatternOptions,
        max_pattern_bytes: usize,
    ) -> Result<Self> {
        if pattern.len() > max_pattern_bytes {
            return Err(Error::InvalidPattern(format!(
                "pattern is too long ({} bytes; max {max_pattern_bytes} bytes)",
                pattern.len()
            )));
        }
        let source = match options.mode {
            PatternMode::Literal => regex::escape(pattern),
            PatternMode::Regex => pattern.to_string(),
            PatternMode::Fuzzy => fuzzy_source(pattern),
        };
        if source.is_empty() {
            return Err(Error::InvalidPattern("pattern must not be empty".to_string()));
        }
        let source = if options.whole_word {
            format!(r"\b(?:{source})\b")
        } else {
            source
        };

        let regex = build_regex(&source, options.case_insensitive, options.multiline)?;
        Ok(Self {
            regex,
            group: 0,
            label: pattern.to_string(),
        })
    }

    pub fn preset(preset: Preset) -> Result<Self> {
        let regex = build_regex(preset.source(), false, false)?;
        Ok(Self {
            regex,
            group: preset.group(),
            label: format!("preset {preset}"),
        })
    }

    /// Human-readable description for error messages.
    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn spans<'m, 'c>(&'m self, content: &'c str) -> Spans<'m, 'c> {
        Spans {
            matcher: self,
            content,
            cursor: 0,
        }
    }

    /// Up to `cap` matches in content order.
    pub fn find_matches(&self, content: &str, cap: usize) -> Vec<SearchMatch> {
        let index = LineIndex::new(content);
        self.spans(content)
            .take(cap)
            .map(|range| index.search_match(content, range))
            .collect()
    }

    /// The single match in `content`; zero or several matches are errors.
    pub fn find_unique_match(&self, content: &str) -> Result<MatchSpan> {
        let mut spans = self.spans(content);
        let Some(first) = spans.next() else {
            return Err(Error::PatternNotFound(self.label.clone()));
        };
        let rest: Vec<Range<usize>> = spans.collect();
        let index = LineIndex::new(content);
        if rest.is_empty() {
            return Ok(index.span(first));
        }

        let count = rest.len() + 1;
        let mut lines: Vec<usize> = std::iter::once(first)
            .chain(rest)
            .map(|range| index.line_of(range.start))
            .collect();
        lines.dedup();
        Err(Error::MultipleMatches { count, lines })
    }

    /// Substitutes `replacement` literally for every match, last match first.
    pub fn replace_all(&self, content: &str, replacement: &str) -> Replaced {
        let ranges: Vec<Range<usize>> = self.spans(content).collect();
        let index = LineIndex::new(content);
        let mut lines: Vec<usize> = ranges
            .iter()
            .map(|range| index.line_of(range.start))
            .collect();
        lines.dedup();

        let mut out = content.to_string();
        for range in ranges.iter().rev() {
            out.replace_range(range.clone(), replacement);
        }
        Replaced {
            content: out,
            count: ranges.len(),
            lines,
        }
    }
}

fn build_regex(source: &str, case_insensitive: bool, dot_all: bool) -> Result<Regex> {
    RegexBuilder::new(source)
        .multi_line(true)
        .crlf(true)
        .case_insensitive(case_insensitive)
        .dot_matches_new_line(dot_all)
        .build()
        .map_err(|err| Error::InvalidPattern(err.to_string()))
}

/// Escaped pattern whose whitespace runs match any whitespace and whose line breaks tolerate
/// surrounding indentation.
fn fuzzy_source(pattern: &str) -> String {
    let unified = pattern.replace("\r\n", "\n").replace('\r', "\n");
    let lines: Vec<String> = unified
        .split('\n')
        .map(|line| {
            line.split([' ', '\t'])
                .filter(|word| !word.is_empty())
                .map(regex::escape)
                .collect::<Vec<_>>()
                .join(r"\s+")
        })
        .collect();

    let first = lines.iter().position(|line| !line.is_empty());
    let last = lines.iter().rposition(|line| !line.is_empty());
    match (first, last) {
        (Some(first), Some(last)) => lines[first..=last].join(r"\s*\n\s*"),
        _ => String::new(),
    }
}

/// Iterator over the reported span of each match, scanning with an explicit cursor.
pub struct Spans<'m, 'c> {
    matcher: &'m Matcher,
    content: &'c str,
    cursor: usize,
}

impl Iterator for Spans<'_, '_> {
    type Item = Range<usize>;

    fn next(&mut self) -> Option<Range<usize>> {
        loop {
            if self.cursor > self.content.len() {
                return None;
            }
            let (whole, reported) = if self.matcher.group == 0 {
                let found = self.matcher.regex.find_at(self.content, self.cursor)?;
                (found.range(), Some(found.range()))
            } else {
                let caps = self.matcher.regex.captures_at(self.content, self.cursor)?;
                let whole = caps.get(0)?.range();
                (whole, caps.get(self.matcher.group).map(|group| group.range()))
            };

            self.cursor = if whole.is_empty() {
                whole.end + next_char_len(self.content, whole.end)
            } else {
                whole.end
            };
            if let Some(range) = reported {
                return Some(range);
            }
        }
    }
}

fn next_char_len(content: &str, at: usize) -> usize {
    content[at..].chars().next().map_or(1, char::len_utf8)
}

/// Byte offsets of line starts, for offset -> (line, column) lookups.
#[derive(Debug, Clone)]
pub struct LineIndex {
    starts: Vec<usize>,
}

impl LineIndex {
    pub fn new(content: &str) -> Self {
        let mut starts = Vec::with_capacity(content.len() / 32 + 1);
        starts.push(0);
        starts.extend(memchr::memchr_iter(b'\n', content.as_bytes()).map(|idx| idx + 1));
        Self { starts }
    }

    /// 1-indexed line containing byte `offset`.
    pub fn line_of(&self, offset: usize) -> usize {
        match self.starts.binary_search(&offset) {
            Ok(idx) => idx + 1,
            Err(idx) => idx,
        }
    }

    /// 1-indexed character column of byte `offset`.
    pub fn column_of(&self, content: &str, offset: usize) -> usize {
        let line_start = self.starts[self.line_of(offset) - 1];
        content[line_start..offset].chars().count() + 1
    }

    /// Text of `line` without its terminator; empty past the end.
    pub fn line_text<'c>(&self, content: &'c str, line: usize) -> &'c str {
        let Some(&start) = self.starts.get(line.wrapping_sub(1)) else {
            return "";
        };
        let end = self
            .starts
            .get(line)
            .map_or(content.len(), |next| next - 1);
        let text = &content[start..end.max(start)];
        text.strip_suffix('\r').unwrap_or(text)
    }

    fn search_match(&self, content: &str, range: Range<usize>) -> SearchMatch {
        SearchMatch {
            index: range.start,
            line: self.line_of(range.start),
            column: self.column_of(content, range.start),
            text: content[range].to_string(),
        }
    }

    fn span(&self, range: Range<usize>) -> MatchSpan {
        let line = self.line_of(range.start);
        let end_line = if range.is_empty() {
            line
        } else {
            self.line_of(range.end - 1)
        };
        MatchSpan {
            range,
            line,
            end_line,
        }
    }
}
