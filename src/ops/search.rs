use serde::{Deserialize, Serialize};

use crate::checksum::Checksum;
use crate::error::{Error, Result};
use crate::lines::line_count;
use crate::pattern::{LineIndex, Matcher, SearchMatch};

use super::walk::{EntryKind, SkipLog, SkippedEntry, Visit, WalkOptions, walk};
use super::{Context, ResolvedPath};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextLine {
    pub line: usize,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchContext {
    pub before: Vec<ContextLine>,
    pub line: ContextLine,
    pub after: Vec<ContextLine>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileMatch {
    pub path: String,
    #[serde(flatten)]
    pub found: SearchMatch,
    pub context: MatchContext,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResult {
    pub pattern: String,
    pub matches: Vec<FileMatch>,
    pub files_searched: usize,
    pub truncated: bool,
    /// Present when a single file was searched, for a follow-up guarded write.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checksum: Option<Checksum>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub skipped: Vec<SkippedEntry>,
    #[serde(default)]
    pub skipped_count: usize,
}

#[derive(Debug, Clone, Copy)]
pub(super) struct SearchSettings {
    pub(super) max_matches: usize,
    pub(super) context: usize,
    pub(super) depth: usize,
}

fn context_lines(
    content: &str,
    index: &LineIndex,
    total: usize,
    line: usize,
    window: usize,
) -> MatchContext {
    let at = |line: usize| ContextLine {
        line,
        text: index.line_text(content, line).to_string(),
    };
    let first = line.saturating_sub(window).max(1);
    let last = line.saturating_add(window).min(total.max(line));
    MatchContext {
        before: (first..line).map(at).collect(),
        line: at(line),
        after: (line + 1..=last).map(at).collect(),
    }
}

/// Appends matches from one file, stopping once `budget` matches are held overall.
/// Returns `true` when the file had more matches than fit.
fn collect_matches(
    path: &str,
    content: &str,
    matcher: &Matcher,
    settings: SearchSettings,
    out: &mut Vec<FileMatch>,
) -> bool {
    let remaining = settings.max_matches.saturating_sub(out.len());
    let found = matcher.find_matches(content, remaining.saturating_add(1));
    if found.is_empty() {
        return false;
    }
    let overflow = found.len() > remaining;
    let index = LineIndex::new(content);
    let total = line_count(content);
    out.extend(found.into_iter().take(remaining).map(|found| FileMatch {
        path: path.to_string(),
        context: context_lines(content, &index, total, found.line, settings.context),
        found,
    }));
    overflow
}

pub(super) fn search_file(
    ctx: &Context,
    target: &ResolvedPath,
    matcher: &Matcher,
    settings: SearchSettings,
) -> Result<SearchResult> {
    let text = super::io::read_text(
        &target.real,
        &target.virtual_path,
        ctx.limits().max_read_bytes,
    )?;
    let mut matches = Vec::new();
    let truncated = collect_matches(
        &target.virtual_path,
        &text.content,
        matcher,
        settings,
        &mut matches,
    );
    tracing::debug!(path = %target.virtual_path, matches = matches.len(), "searched file");
    Ok(SearchResult {
        pattern: matcher.label().to_string(),
        matches,
        files_searched: 1,
        truncated,
        checksum: Some(text.checksum),
        skipped: Vec::new(),
        skipped_count: 0,
    })
}

pub(super) fn search_directory(
    ctx: &Context,
    base: &ResolvedPath,
    matcher: &Matcher,
    settings: SearchSettings,
    exclude: &[String],
) -> Result<SearchResult> {
    let ignore = ctx.ignore_matcher(exclude)?;
    let limits = ctx.limits();
    let mut matches = Vec::new();
    let mut skipped = SkipLog::new(limits.max_skipped_reported);
    let mut files_searched = 0usize;
    let mut truncated = false;

    let options = WalkOptions {
        max_depth: settings.depth,
        ignore: &ignore,
        prune_names: &[],
    };
    for visit in walk(ctx, base, options) {
        let entry = match visit? {
            Visit::Entry(entry) if entry.kind == EntryKind::File => entry,
            Visit::Entry(_) => continue,
            Visit::Skipped(entry) => {
                skipped.push(entry);
                continue;
            }
        };
        if matches.len() >= settings.max_matches {
            truncated = true;
            break;
        }

        let read = super::io::read_text(&entry.real, &entry.virtual_path, limits.max_read_bytes);
        let text = match read {
            Ok(text) => text,
            Err(err @ (Error::NotText(_) | Error::TooLarge { .. })) => {
                skipped.push(SkippedEntry {
                    path: entry.virtual_path,
                    reason: err.to_string(),
                });
                continue;
            }
            Err(err) => {
                skipped.push(SkippedEntry {
                    path: entry.virtual_path,
                    reason: format!("unreadable: {err}"),
                });
                continue;
            }
        };
        files_searched += 1;
        if collect_matches(
            &entry.virtual_path,
            &text.content,
            matcher,
            settings,
            &mut matches,
        ) {
            truncated = true;
            break;
        }
    }

    tracing::debug!(
        path = %base.virtual_path,
        files_searched,
        matches = matches.len(),
        truncated,
        "searched directory"
    );
    Ok(SearchResult {
        pattern: matcher.label().to_string(),
        matches,
        files_searched,
        truncated,
        checksum: None,
        skipped: skipped.entries,
        skipped_count: skipped.total,
    })
}
