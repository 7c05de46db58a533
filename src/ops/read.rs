use std::fs;

use serde::{Deserialize, Serialize};

use crate::checksum::Checksum;
use crate::config::MAX_CONTEXT_LINES;
use crate::error::{Error, Result};
use crate::fuzzy::AutoResolve;
use crate::lines::{LineRange, extract, line_count, number_lines};
use crate::pattern::{Matcher, PatternMode, PatternOptions, Preset};

use super::find::FindResult;
use super::search::{SearchResult, SearchSettings};
use super::walk::{DirectoryEntry, SkippedEntry, SkipLog, Visit, WalkOptions, walk};
use super::{Context, ResolvedPath};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReadRequest {
    #[serde(default)]
    pub path: String,
    #[serde(default)]
    pub pattern: Option<String>,
    #[serde(default)]
    pub preset: Option<Preset>,
    #[serde(default, alias = "patternMode")]
    pub pattern_mode: Option<PatternMode>,
    #[serde(default, alias = "caseInsensitive")]
    pub case_insensitive: bool,
    #[serde(default, alias = "wholeWord")]
    pub whole_word: bool,
    #[serde(default)]
    pub multiline: bool,
    /// Fuzzy file-name query, run under `path`.
    #[serde(default)]
    pub find: Option<String>,
    #[serde(default, alias = "includeDirs")]
    pub include_dirs: bool,
    #[serde(default)]
    pub lines: Option<LineRange>,
    #[serde(default)]
    pub depth: Option<usize>,
    /// Context lines around each search match.
    #[serde(default)]
    pub context: Option<usize>,
    #[serde(default, alias = "maxMatches")]
    pub max_matches: Option<usize>,
    #[serde(default)]
    pub exclude: Vec<String>,
}

impl ReadRequest {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }

    pub(super) fn pattern_options(&self) -> PatternOptions {
        PatternOptions {
            mode: self.pattern_mode.unwrap_or_default(),
            case_insensitive: self.case_insensitive,
            whole_word: self.whole_word,
            multiline: self.multiline,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineSpan {
    pub start: usize,
    pub end: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRead {
    /// Shown lines, each prefixed with its number.
    pub content: String,
    pub checksum: Checksum,
    pub total_lines: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub range: Option<LineSpan>,
    pub truncated: bool,
    pub size_bytes: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryListing {
    pub entries: Vec<DirectoryEntry>,
    pub depth: usize,
    pub truncated: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub skipped: Vec<SkippedEntry>,
    #[serde(default)]
    pub skipped_count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ReadOutcome {
    File(FileRead),
    Directory(DirectoryListing),
    Search(SearchResult),
    Find(FindResult),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadOutput {
    /// Virtual path actually read, after any redirect.
    pub path: String,
    pub redirected_from: Option<String>,
    pub outcome: ReadOutcome,
}

pub fn read(ctx: &Context, request: ReadRequest) -> Result<ReadOutput> {
    let requested = ctx.resolve(&request.path)?;
    let (target, meta, redirected_from) = match fs::metadata(&requested.real) {
        Ok(meta) => (requested, meta, None),
        Err(err) if super::io::is_missing(&err) => {
            let target = redirect(ctx, &requested)?;
            let meta = fs::metadata(&target.real)
                .map_err(|err| Error::io_path("metadata", target.virtual_path.as_str(), err))?;
            (target, meta, Some(requested.virtual_path))
        }
        Err(err) => {
            return Err(Error::io_path(
                "metadata",
                requested.virtual_path.as_str(),
                err,
            ));
        }
    };

    if !meta.is_dir() && !meta.is_file() {
        return Err(Error::InvalidType(format!(
            "{} is neither a file nor a directory",
            target.virtual_path
        )));
    }

    let outcome = if let Some(query) = request.find.as_deref() {
        if !meta.is_dir() {
            return Err(Error::InvalidType(format!(
                "find needs a directory, but {} is a file",
                target.virtual_path
            )));
        }
        ReadOutcome::Find(super::find::find(
            ctx,
            &target,
            query,
            request.include_dirs,
            &request.exclude,
        )?)
    } else if let Some(matcher) = build_matcher(ctx, &request)? {
        let limits = ctx.limits();
        let settings = SearchSettings {
            max_matches: request
                .max_matches
                .unwrap_or(limits.max_search_matches)
                .clamp(1, limits.max_search_matches),
            context: request
                .context
                .unwrap_or(limits.context_lines)
                .min(MAX_CONTEXT_LINES),
            depth: request.depth.unwrap_or(limits.max_depth).clamp(1, limits.max_depth),
        };
        if meta.is_dir() {
            ReadOutcome::Search(super::search::search_directory(
                ctx,
                &target,
                &matcher,
                settings,
                &request.exclude,
            )?)
        } else {
            ReadOutcome::Search(super::search::search_file(ctx, &target, &matcher, settings)?)
        }
    } else if meta.is_dir() {
        ReadOutcome::Directory(list_directory(ctx, &target, &request)?)
    } else {
        ReadOutcome::File(read_file(ctx, &target, request.lines)?)
    };

    tracing::debug!(
        path = %target.virtual_path,
        redirected = redirected_from.is_some(),
        "read complete"
    );
    Ok(ReadOutput {
        path: target.virtual_path,
        redirected_from,
        outcome,
    })
}

/// Preset wins over pattern text when both are given.
fn build_matcher(ctx: &Context, request: &ReadRequest) -> Result<Option<Matcher>> {
    if let Some(preset) = request.preset {
        return Matcher::preset(preset).map(Some);
    }
    match request.pattern.as_deref() {
        Some(pattern) => Matcher::compile(
            pattern,
            request.pattern_options(),
            ctx.limits().max_pattern_bytes,
        )
        .map(Some),
        None => Ok(None),
    }
}

fn redirect(ctx: &Context, requested: &ResolvedPath) -> Result<ResolvedPath> {
    if requested.is_root() {
        return Err(Error::NotFound(requested.virtual_path.clone()));
    }
    match super::find::auto_resolve(ctx, &requested.virtual_path)? {
        AutoResolve::Resolved(path) => {
            tracing::debug!(from = %requested.virtual_path, to = %path, "redirecting read");
            ctx.resolve(&path)
        }
        AutoResolve::Ambiguous(candidates) => Err(Error::Ambiguous {
            path: requested.virtual_path.clone(),
            candidates,
        }),
        AutoResolve::NotFound => Err(Error::NotFound(requested.virtual_path.clone())),
    }
}

fn read_file(ctx: &Context, target: &ResolvedPath, lines: Option<LineRange>) -> Result<FileRead> {
    let limits = ctx.limits();
    let text = super::io::read_text(&target.real, &target.virtual_path, limits.max_read_bytes)?;
    let total_lines = line_count(&text.content);

    let (span, truncated) = match lines {
        Some(range) => {
            if range.start() > total_lines {
                return Err(Error::OutOfRange {
                    start: range.start(),
                    total_lines,
                });
            }
            let span = LineSpan {
                start: range.start(),
                end: range.end_within(total_lines),
            };
            (Some(span), false)
        }
        None if total_lines > limits.preview_lines => (
            Some(LineSpan {
                start: 1,
                end: limits.preview_lines,
            }),
            true,
        ),
        None => (None, false),
    };

    let content = match span {
        Some(span) => number_lines(extract(&text.content, span.start, span.end), span.start),
        None => number_lines(&text.content, 1),
    };
    Ok(FileRead {
        content,
        checksum: text.checksum,
        total_lines,
        range: span,
        truncated,
        size_bytes: text.size_bytes,
    })
}

fn list_directory(
    ctx: &Context,
    target: &ResolvedPath,
    request: &ReadRequest,
) -> Result<DirectoryListing> {
    let limits = ctx.limits();
    let depth = request
        .depth
        .unwrap_or(limits.default_depth)
        .clamp(1, limits.max_depth);
    let ignore = ctx.ignore_matcher(&request.exclude)?;
    let mut entries = Vec::new();
    let mut skipped = SkipLog::new(limits.max_skipped_reported);
    let mut truncated = false;

    let options = WalkOptions {
        max_depth: depth,
        ignore: &ignore,
        prune_names: &[],
    };
    for visit in walk(ctx, target, options) {
        match visit? {
            Visit::Entry(entry) => {
                if entries.len() >= limits.max_list_entries {
                    truncated = true;
                    break;
                }
                entries.push(entry.to_directory_entry(&ignore));
            }
            Visit::Skipped(entry) => skipped.push(entry),
        }
    }

    Ok(DirectoryListing {
        entries,
        depth,
        truncated,
        skipped: skipped.entries,
        skipped_count: skipped.total,
    })
}
