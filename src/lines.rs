//! Pure line-range transforms. Line numbers are 1-indexed and ranges are inclusive.
//!
//! Edits preserve each untouched line's terminator (`\n` or `\r\n`) and whether the content ends
//! with one. Inserted lines take the first terminator found in the content.
//! Ranges reaching past the end of the content are clamped; rejecting a start line beyond the
//! content is left to the caller.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// An inclusive, 1-indexed line range. `end == None` means "through the last line".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct LineRange {
    start: usize,
    end: Option<usize>,
}

impl LineRange {
    pub fn new(start: usize, end: Option<usize>) -> Result<Self> {
        if start == 0 {
            return Err(Error::InvalidRange("line numbers start at 1".to_string()));
        }
        if let Some(end) = end
            && end < start
        {
            return Err(Error::InvalidRange(format!(
                "end line {end} is before start line {start}"
            )));
        }
        Ok(Self { start, end })
    }

    pub fn single(line: usize) -> Result<Self> {
        Self::new(line, Some(line))
    }

    pub fn start(&self) -> usize {
        self.start
    }

    pub fn end(&self) -> Option<usize> {
        self.end
    }

    /// Last line covered by this range in a document of `total` lines.
    pub fn end_within(&self, total: usize) -> usize {
        self.end.unwrap_or(total).min(total)
    }
}

impl FromStr for LineRange {
    type Err = Error;

    fn from_str(raw: &str) -> Result<Self> {
        let trimmed = raw.trim();
        let parse = |part: &str| {
            part.trim().parse::<usize>().map_err(|_| {
                Error::InvalidRange(format!(
                    "{raw:?} is not a line number or range like \"5\", \"5-10\" or \"5-\""
                ))
            })
        };
        match trimmed.split_once('-') {
            None => Self::single(parse(trimmed)?),
            Some((start, end)) if end.trim().is_empty() => Self::new(parse(start)?, None),
            Some((start, end)) => Self::new(parse(start)?, Some(parse(end)?)),
        }
    }
}

impl TryFrom<String> for LineRange {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<LineRange> for String {
    fn from(range: LineRange) -> Self {
        range.to_string()
    }
}

impl std::fmt::Display for LineRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.end {
            Some(end) if end == self.start => write!(f, "{}", self.start),
            Some(end) => write!(f, "{}-{end}", self.start),
            None => write!(f, "{}-", self.start),
        }
    }
}

/// One line of content and the terminator it ended with (`""` for an unterminated last line).
#[derive(Debug, Clone, Copy)]
struct Line<'a> {
    body: &'a str,
    terminator: &'a str,
}

struct Document<'a> {
    lines: Vec<Line<'a>>,
    trailing_newline: bool,
}

impl<'a> Document<'a> {
    fn parse(content: &'a str) -> Self {
        let lines = content.split_inclusive('\n').map(split_terminator).collect();
        Self {
            lines,
            trailing_newline: content.ends_with('\n'),
        }
    }

    /// Terminator of the first terminated line.
    fn first_terminator(&self) -> Option<&'a str> {
        self.lines
            .iter()
            .map(|line| line.terminator)
            .find(|terminator| !terminator.is_empty())
    }
}

fn split_terminator(line: &str) -> Line<'_> {
    let body = match line.strip_suffix('\n') {
        Some(rest) => rest.strip_suffix('\r').unwrap_or(rest),
        None => line,
    };
    Line {
        body,
        terminator: &line[body.len()..],
    }
}

fn block_lines(block: &str) -> Vec<&str> {
    let body = split_terminator(block).body;
    body.split('\n')
        .map(|line| line.strip_suffix('\r').unwrap_or(line))
        .collect()
}

/// Joins lines with their own terminators. A line that ends up followed by another gets
/// `newline` if it had none; the last line is terminated only when `trailing` is set.
fn render(lines: Vec<Line<'_>>, newline: &str, trailing: bool) -> String {
    let count = lines.len();
    let mut out = String::new();
    for (idx, line) in lines.iter().enumerate() {
        out.push_str(line.body);
        let is_last = idx + 1 == count;
        match (is_last, line.terminator.is_empty()) {
            (false, true) => out.push_str(newline),
            (false, false) => out.push_str(line.terminator),
            (true, _) if !trailing => {}
            (true, true) => out.push_str(newline),
            (true, false) => out.push_str(line.terminator),
        }
    }
    out
}

/// Removes `remove` lines starting at 0-based `at` and inserts `block` in their place.
///
/// Untouched lines keep their own terminators; inserted lines take the file's first terminator.
fn splice(content: &str, at: usize, remove: usize, block: Option<&str>) -> String {
    let doc = Document::parse(content);
    let at = at.min(doc.lines.len());
    let resume = at.saturating_add(remove).min(doc.lines.len());
    let newline = doc
        .first_terminator()
        .or_else(|| block.and_then(|block| Document::parse(block).first_terminator()))
        .unwrap_or("\n");
    let trailing = if doc.lines.is_empty() {
        block.is_some_and(|block| block.ends_with('\n'))
    } else {
        doc.trailing_newline
    };

    let inserted = block.map(block_lines).unwrap_or_default();
    let mut lines = Vec::with_capacity(doc.lines.len() + inserted.len());
    lines.extend_from_slice(&doc.lines[..at]);
    lines.extend(inserted.into_iter().map(|body| Line {
        body,
        terminator: newline,
    }));
    lines.extend_from_slice(&doc.lines[resume..]);
    render(lines, newline, trailing)
}

pub fn line_count(content: &str) -> usize {
    content.split_inclusive('\n').count()
}

/// Returns lines `start..=end` verbatim (terminators included), clamped to the content.
pub fn extract(content: &str, start: usize, end: usize) -> &str {
    let start = start.max(1);
    let mut offset = 0usize;
    let mut from = None;
    let mut to = content.len();
    for (idx, line) in content.split_inclusive('\n').enumerate() {
        let number = idx + 1;
        if number == start {
            from = Some(offset);
        }
        offset += line.len();
        if number == end {
            to = offset;
            break;
        }
    }
    match from {
        Some(from) if from <= to => &content[from..to],
        _ => "",
    }
}

/// Prefixes each line with its right-aligned number, `first_line` being the number of the first.
pub fn number_lines(text: &str, first_line: usize) -> String {
    let doc = Document::parse(text);
    if doc.lines.is_empty() {
        return String::new();
    }
    let last = first_line + doc.lines.len() - 1;
    let width = last.to_string().len();
    let mut out = String::with_capacity(text.len() + doc.lines.len() * (width + 2));
    for (idx, line) in doc.lines.iter().enumerate() {
        out.push_str(&format!("{:>width$}: {}\n", first_line + idx, line.body));
    }
    out
}

pub fn replace_lines(content: &str, start: usize, end: usize, replacement: &str) -> String {
    let start = start.max(1);
    let end = end.max(start);
    splice(content, start - 1, end - start + 1, Some(replacement))
}

pub fn insert_before(content: &str, line: usize, block: &str) -> String {
    splice(content, line.max(1) - 1, 0, Some(block))
}

/// Inserting after the last line (or any line past it) appends.
pub fn insert_after(content: &str, line: usize, block: &str) -> String {
    splice(content, line, 0, Some(block))
}

pub fn delete_lines(content: &str, start: usize, end: usize) -> String {
    let start = start.max(1);
    let end = end.max(start);
    splice(content, start - 1, end - start + 1, None)
}
