use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::fuzzy::{ALWAYS_EXCLUDED, AutoResolve, rank};

use super::walk::{EntryKind, SkipLog, SkippedEntry, Visit, WalkEntry, WalkOptions, walk};
use super::{Context, ResolvedPath};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FindHit {
    pub path: String,
    #[serde(rename = "type")]
    pub kind: EntryKind,
    pub score: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FindResult {
    pub query: String,
    pub matches: Vec<FindHit>,
    pub candidates: usize,
    /// More candidates or hits existed than were considered or returned.
    pub truncated: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub skipped: Vec<SkippedEntry>,
}

struct Candidates {
    entries: Vec<WalkEntry>,
    capped: bool,
    skipped: SkipLog,
}

fn candidates(
    ctx: &Context,
    base: &ResolvedPath,
    include_dirs: bool,
    exclude: &[String],
) -> Result<Candidates> {
    let ignore = ctx.ignore_matcher(exclude)?;
    let limits = ctx.limits();
    let mut entries = Vec::new();
    let mut skipped = SkipLog::new(limits.max_skipped_reported);
    let mut capped = false;

    let options = WalkOptions {
        max_depth: limits.fuzzy_max_depth,
        ignore: &ignore,
        prune_names: ALWAYS_EXCLUDED,
    };
    for visit in walk(ctx, base, options) {
        match visit? {
            Visit::Entry(entry) => {
                if entry.kind == EntryKind::Directory && !include_dirs {
                    continue;
                }
                if entries.len() >= limits.max_fuzzy_candidates {
                    capped = true;
                    break;
                }
                entries.push(entry);
            }
            Visit::Skipped(entry) => skipped.push(entry),
        }
    }
    Ok(Candidates {
        entries,
        capped,
        skipped,
    })
}

pub(super) fn find(
    ctx: &Context,
    base: &ResolvedPath,
    query: &str,
    include_dirs: bool,
    exclude: &[String],
) -> Result<FindResult> {
    let Candidates {
        entries,
        capped,
        skipped,
    } = candidates(ctx, base, include_dirs, exclude)?;
    let total = entries.len();
    let limit = ctx.limits().max_fuzzy_results;

    // Rank one past the limit to learn whether anything was cut.
    let mut ranked = rank(
        query,
        entries,
        |entry| entry.virtual_path.as_str(),
        limit.saturating_add(1),
    );
    let overflow = ranked.len() > limit;
    ranked.truncate(limit);

    tracing::debug!(query, candidates = total, hits = ranked.len(), "fuzzy find");
    Ok(FindResult {
        query: query.to_string(),
        matches: ranked
            .into_iter()
            .map(|(entry, score)| FindHit {
                path: entry.virtual_path,
                kind: entry.kind,
                score,
            })
            .collect(),
        candidates: total,
        truncated: capped || overflow,
        skipped: skipped.entries,
    })
}

/// Looks for files named like `requested` anywhere under the root.
pub(super) fn auto_resolve(ctx: &Context, requested: &str) -> Result<AutoResolve> {
    let root = ctx.resolve(".")?;
    let found = candidates(ctx, &root, false, &[])?;
    let resolution = crate::fuzzy::auto_resolve(
        requested,
        found.entries.iter().map(|entry| entry.virtual_path.as_str()),
    );
    tracing::debug!(requested, ?resolution, "auto-resolve");
    Ok(resolution)
}
