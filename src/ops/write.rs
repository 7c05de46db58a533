use std::fs;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::checksum::Checksum;
use crate::diff::{DiffHunk, unified_diff};
use crate::error::{Error, Result};
use crate::lines::{
    LineRange, delete_lines, insert_after, insert_before, line_count, replace_lines,
};
use crate::pattern::{Matcher, PatternMode, PatternOptions};

use super::read::LineSpan;
use super::{Context, ResolvedPath};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WriteOperation {
    Create,
    Update,
    Delete,
}

impl WriteOperation {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
        }
    }
}

impl FromStr for WriteOperation {
    type Err = Error;

    fn from_str(raw: &str) -> Result<Self> {
        match raw.trim() {
            "create" => Ok(Self::Create),
            "update" => Ok(Self::Update),
            "delete" => Ok(Self::Delete),
            other => Err(Error::InvalidOperation(format!(
                "{other:?} (expected create, update or delete)"
            ))),
        }
    }
}

impl std::fmt::Display for WriteOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EditAction {
    Replace,
    #[serde(alias = "insertBefore")]
    InsertBefore,
    #[serde(alias = "insertAfter")]
    InsertAfter,
    #[serde(alias = "deleteLines")]
    DeleteLines,
}

impl EditAction {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Replace => "replace",
            Self::InsertBefore => "insert_before",
            Self::InsertAfter => "insert_after",
            Self::DeleteLines => "delete_lines",
        }
    }

    pub const fn requires_content(self) -> bool {
        !matches!(self, Self::DeleteLines)
    }
}

impl FromStr for EditAction {
    type Err = Error;

    fn from_str(raw: &str) -> Result<Self> {
        match raw.trim() {
            "replace" => Ok(Self::Replace),
            "insert_before" | "insertBefore" => Ok(Self::InsertBefore),
            "insert_after" | "insertAfter" => Ok(Self::InsertAfter),
            "delete_lines" | "deleteLines" => Ok(Self::DeleteLines),
            other => Err(Error::InvalidAction(format!(
                "{other:?} (expected replace, insert_before, insert_after or delete_lines)"
            ))),
        }
    }
}

impl std::fmt::Display for EditAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WriteRequest {
    #[serde(default)]
    pub path: String,
    pub operation: WriteOperation,
    #[serde(default)]
    pub action: Option<EditAction>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub lines: Option<LineRange>,
    #[serde(default)]
    pub pattern: Option<String>,
    #[serde(default, alias = "patternMode")]
    pub pattern_mode: Option<PatternMode>,
    #[serde(default, alias = "caseInsensitive")]
    pub case_insensitive: bool,
    #[serde(default, alias = "wholeWord")]
    pub whole_word: bool,
    #[serde(default)]
    pub multiline: bool,
    /// With `action = replace`, substitute every pattern match instead of requiring exactly one.
    #[serde(default, alias = "replaceAll")]
    pub replace_all: bool,
    /// Checksum observed by the caller's last read; the write is refused if the file moved on.
    #[serde(default)]
    pub checksum: Option<String>,
    #[serde(default, alias = "dryRun")]
    pub dry_run: bool,
}

impl WriteRequest {
    pub fn new(path: impl Into<String>, operation: WriteOperation) -> Self {
        Self {
            path: path.into(),
            operation,
            action: None,
            content: None,
            lines: None,
            pattern: None,
            pattern_mode: None,
            case_insensitive: false,
            whole_word: false,
            multiline: false,
            replace_all: false,
            checksum: None,
            dry_run: false,
        }
    }

    fn pattern_options(&self) -> PatternOptions {
        PatternOptions {
            mode: self.pattern_mode.unwrap_or_default(),
            case_insensitive: self.case_insensitive,
            whole_word: self.whole_word,
            multiline: self.multiline,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WriteResult {
    /// Checksum of the content after the write (or what it would be, for a dry run).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checksum: Option<Checksum>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_checksum: Option<Checksum>,
    pub diff: String,
    pub hunks: Vec<DiffHunk>,
    pub additions: usize,
    pub deletions: usize,
    pub total_lines: usize,
    /// Lines the edit was anchored on, in the original content.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<LineSpan>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replacements: Option<usize>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub match_lines: Vec<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteOutput {
    pub path: String,
    pub operation: WriteOperation,
    /// `false` for dry runs; nothing was persisted.
    pub applied: bool,
    pub result: WriteResult,
}

pub fn write(ctx: &Context, request: WriteRequest) -> Result<WriteOutput> {
    let target = ctx.resolve(&request.path)?;
    let result = match request.operation {
        WriteOperation::Create => create(ctx, &target, &request)?,
        WriteOperation::Update => update(ctx, &target, &request)?,
        WriteOperation::Delete => delete(ctx, &target, &request)?,
    };
    let applied = !request.dry_run;
    tracing::debug!(
        path = %target.virtual_path,
        operation = %request.operation,
        applied,
        additions = result.additions,
        deletions = result.deletions,
        "write complete"
    );
    Ok(WriteOutput {
        path: target.virtual_path,
        operation: request.operation,
        applied,
        result,
    })
}

/// Rejects the call when the caller's checksum is stale.
fn guard(path: &str, current: &Checksum, expected: Option<&str>) -> Result<()> {
    current.ensure_matches(expected).inspect_err(|err| {
        tracing::warn!(path, %err, "rejected write against a stale checksum");
    })
}

/// Stats an existing regular file and returns its size; directories and missing paths are
/// refused.
fn existing_file(target: &ResolvedPath) -> Result<u64> {
    let meta = fs::metadata(&target.real).map_err(|err| {
        if super::io::is_missing(&err) {
            Error::NotFound(target.virtual_path.clone())
        } else {
            Error::io_path("metadata", target.virtual_path.as_str(), err)
        }
    })?;
    if meta.is_dir() {
        return Err(Error::InvalidType(format!(
            "{} is a directory",
            target.virtual_path
        )));
    }
    if !meta.is_file() {
        return Err(Error::InvalidType(format!(
            "{} is not a regular file",
            target.virtual_path
        )));
    }
    Ok(meta.len())
}

fn result_for(
    path: &str,
    old: &str,
    new: &str,
    previous_checksum: Option<Checksum>,
    checksum: Option<Checksum>,
) -> WriteResult {
    let diff = unified_diff(path, old, new);
    WriteResult {
        checksum,
        previous_checksum,
        diff: diff.text,
        hunks: diff.hunks,
        additions: diff.additions,
        deletions: diff.deletions,
        total_lines: line_count(new),
        target: None,
        replacements: None,
        match_lines: Vec::new(),
    }
}

fn create(ctx: &Context, target: &ResolvedPath, request: &WriteRequest) -> Result<WriteResult> {
    if target.is_root() || fs::symlink_metadata(&target.real).is_ok() {
        return Err(Error::AlreadyExists(target.virtual_path.clone()));
    }
    let content = request.content.as_deref().unwrap_or("");
    super::io::ensure_write_size(
        &target.virtual_path,
        content.as_bytes(),
        ctx.limits().max_write_bytes,
    )?;

    if !request.dry_run {
        super::io::create_new(&target.real, &target.virtual_path, content.as_bytes())?;
    }
    Ok(result_for(
        &target.virtual_path,
        "",
        content,
        None,
        Some(Checksum::compute(content)),
    ))
}

fn delete(ctx: &Context, target: &ResolvedPath, request: &WriteRequest) -> Result<WriteResult> {
    if target.is_root() {
        return Err(Error::InvalidPath("the workspace root cannot be deleted".to_string()));
    }
    let size_bytes = existing_file(target)?;

    // Files over the read limit are removed without a preview; they are hashed by streaming
    // only when the caller asked for a guard.
    let (current, old) = if size_bytes <= ctx.limits().max_read_bytes {
        let bytes = super::io::read_bytes_limited(
            &target.real,
            &target.virtual_path,
            ctx.limits().max_read_bytes,
        )?;
        (Some(Checksum::compute(&bytes)), Some(bytes))
    } else if request.checksum.is_some() {
        let checksum = super::io::hash_file(&target.real, &target.virtual_path)?;
        (Some(checksum), None)
    } else {
        (None, None)
    };
    if let Some(current) = &current {
        guard(&target.virtual_path, current, request.checksum.as_deref())?;
    }

    if !request.dry_run {
        if let Some(current) = &current {
            super::io::recheck(&target.real, &target.virtual_path, current)?;
        }
        super::io::remove_file(&target.real, &target.virtual_path)?;
    }

    match old {
        Some(bytes) => {
            let old = String::from_utf8_lossy(&bytes);
            Ok(result_for(&target.virtual_path, &old, "", current, None))
        }
        None => {
            tracing::debug!(path = %target.virtual_path, size_bytes, "delete without preview");
            Ok(WriteResult {
                checksum: None,
                previous_checksum: current,
                diff: format!("(preview omitted: {size_bytes} bytes exceeds the read limit)"),
                hunks: Vec::new(),
                additions: 0,
                deletions: 0,
                total_lines: 0,
                target: None,
                replacements: None,
                match_lines: Vec::new(),
            })
        }
    }
}

struct Edit {
    content: String,
    target: LineSpan,
    replacements: Option<usize>,
    match_lines: Vec<usize>,
}

fn update(ctx: &Context, target: &ResolvedPath, request: &WriteRequest) -> Result<WriteResult> {
    existing_file(target)?;
    let limits = ctx.limits();
    let text = super::io::read_text(&target.real, &target.virtual_path, limits.max_read_bytes)?;
    guard(&target.virtual_path, &text.checksum, request.checksum.as_deref())?;

    let action = request.action.ok_or(Error::MissingAction)?;
    if action.requires_content() && request.content.is_none() {
        return Err(Error::MissingContent(action.as_str()));
    }
    let block = request.content.as_deref().unwrap_or("");

    let edit = match (request.lines, request.pattern.as_deref()) {
        (Some(range), None) => edit_lines(&text.content, action, range, block)?,
        (None, Some(pattern)) => {
            let matcher =
                Matcher::compile(pattern, request.pattern_options(), limits.max_pattern_bytes)?;
            edit_pattern(&text.content, action, &matcher, block, request.replace_all)?
        }
        (Some(_), Some(_)) => {
            return Err(Error::InvalidTarget("pass either lines or pattern, not both".to_string()));
        }
        (None, None) => {
            return Err(Error::InvalidTarget("update needs lines or pattern".to_string()));
        }
    };

    super::io::ensure_write_size(
        &target.virtual_path,
        edit.content.as_bytes(),
        limits.max_write_bytes,
    )?;
    if !request.dry_run && edit.content != text.content {
        super::io::replace_atomic(
            &target.real,
            &target.virtual_path,
            edit.content.as_bytes(),
            Some(&text.checksum),
        )?;
    }

    let checksum = Checksum::compute(&edit.content);
    let mut result = result_for(
        &target.virtual_path,
        &text.content,
        &edit.content,
        Some(text.checksum),
        Some(checksum),
    );
    result.target = Some(edit.target);
    result.replacements = edit.replacements;
    result.match_lines = edit.match_lines;
    Ok(result)
}

fn edit_lines(content: &str, action: EditAction, range: LineRange, block: &str) -> Result<Edit> {
    let total = line_count(content);
    let start = range.start();
    let insert_into_empty = total == 0
        && start == 1
        && matches!(action, EditAction::InsertBefore | EditAction::InsertAfter);
    if start > total && !insert_into_empty {
        return Err(Error::OutOfRange {
            start,
            total_lines: total,
        });
    }
    let end = range.end_within(total).max(start);

    let content = match action {
        EditAction::Replace => replace_lines(content, start, end, block),
        EditAction::InsertBefore => insert_before(content, start, block),
        EditAction::InsertAfter => insert_after(content, end, block),
        EditAction::DeleteLines => delete_lines(content, start, end),
    };
    Ok(Edit {
        content,
        target: LineSpan { start, end },
        replacements: None,
        match_lines: Vec::new(),
    })
}

fn edit_pattern(
    content: &str,
    action: EditAction,
    matcher: &Matcher,
    block: &str,
    replace_all: bool,
) -> Result<Edit> {
    if replace_all && action == EditAction::Replace {
        let replaced = matcher.replace_all(content, block);
        let (Some(&first), Some(&last)) = (replaced.lines.first(), replaced.lines.last()) else {
            return Err(Error::PatternNotFound(matcher.label().to_string()));
        };
        return Ok(Edit {
            content: replaced.content,
            target: LineSpan {
                start: first,
                end: last,
            },
            replacements: Some(replaced.count),
            match_lines: replaced.lines,
        });
    }

    let span = matcher.find_unique_match(content)?;
    let edited = match action {
        EditAction::Replace => {
            let mut out = String::with_capacity(content.len() + block.len());
            out.push_str(&content[..span.range.start]);
            out.push_str(block);
            out.push_str(&content[span.range.end..]);
            out
        }
        EditAction::InsertBefore => insert_before(content, span.line, block),
        EditAction::InsertAfter => insert_after(content, span.end_line, block),
        EditAction::DeleteLines => delete_lines(content, span.line, span.end_line),
    };
    Ok(Edit {
        content: edited,
        target: LineSpan {
            start: span.line,
            end: span.end_line,
        },
        replacements: (action == EditAction::Replace).then_some(1),
        match_lines: vec![span.line],
    })
}
