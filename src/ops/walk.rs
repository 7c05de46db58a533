use std::fs;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use walkdir::WalkDir;

use crate::error::{Error, Result};
use crate::ignore::IgnoreMatcher;

use super::{Context, ResolvedPath};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    File,
    Directory,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryEntry {
    pub path: String,
    #[serde(rename = "type")]
    pub kind: EntryKind,
    /// File size in bytes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    /// Visible (non-ignored) entries directly inside a directory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedEntry {
    pub path: String,
    pub reason: String,
}

#[derive(Debug, Clone)]
pub(super) struct WalkEntry {
    pub(super) real: PathBuf,
    pub(super) virtual_path: String,
    pub(super) kind: EntryKind,
    pub(super) size: u64,
}

/// Outcome of visiting one entry. Failures on anything but the walk root are not errors.
#[derive(Debug)]
pub(super) enum Visit {
    Entry(WalkEntry),
    Skipped(SkippedEntry),
}

pub(super) struct WalkOptions<'a> {
    pub(super) max_depth: usize,
    pub(super) ignore: &'a IgnoreMatcher,
    /// Directory names pruned regardless of ignore rules.
    pub(super) prune_names: &'a [&'a str],
}

/// Bounded collector for skipped entries: everything is counted, a prefix is kept.
#[derive(Debug, Default)]
pub(super) struct SkipLog {
    pub(super) entries: Vec<SkippedEntry>,
    pub(super) total: usize,
    cap: usize,
}

impl SkipLog {
    pub(super) fn new(cap: usize) -> Self {
        Self {
            entries: Vec::new(),
            total: 0,
            cap,
        }
    }

    pub(super) fn push(&mut self, skipped: SkippedEntry) {
        tracing::debug!(path = %skipped.path, reason = %skipped.reason, "skipped entry");
        self.total = self.total.saturating_add(1);
        if self.entries.len() < self.cap {
            self.entries.push(skipped);
        }
    }
}

/// Depth-first, name-sorted walk below `base`, pruning ignored directories.
///
/// The base itself is not yielded. Symlinks are never followed into directories; a symlinked
/// file is yielded only when its target is inside the workspace.
pub(super) fn walk<'a>(
    ctx: &'a Context,
    base: &'a ResolvedPath,
    options: WalkOptions<'a>,
) -> impl Iterator<Item = Result<Visit>> + 'a {
    let WalkOptions {
        max_depth,
        ignore,
        prune_names,
    } = options;

    WalkDir::new(&base.real)
        .follow_links(false)
        .max_depth(max_depth)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(move |entry| {
            if entry.depth() == 0 {
                return true;
            }
            let Some(virtual_path) = ctx.virtual_of(entry.path()) else {
                return false;
            };
            let is_dir = entry.file_type().is_dir();
            if is_dir
                && let Some(name) = entry.file_name().to_str()
                && prune_names.contains(&name)
            {
                return false;
            }
            !ignore.is_ignored(&virtual_path, is_dir)
        })
        .filter_map(move |entry| match entry {
            Ok(entry) if entry.depth() == 0 => None,
            Ok(entry) => Some(Ok(classify(ctx, entry))),
            Err(err) if err.depth() == 0 => Some(Err(walk_root_error(base, err))),
            Err(err) => {
                let path = err
                    .path()
                    .and_then(|path| ctx.virtual_of(path))
                    .unwrap_or_else(|| base.virtual_path.clone());
                Some(Ok(Visit::Skipped(SkippedEntry {
                    path,
                    reason: err.to_string(),
                })))
            }
        })
}

fn walk_root_error(base: &ResolvedPath, err: walkdir::Error) -> Error {
    match err.io_error() {
        Some(source) if super::io::is_missing(source) => {
            Error::NotFound(base.virtual_path.clone())
        }
        _ => Error::WalkDir(err),
    }
}

fn classify(ctx: &Context, entry: walkdir::DirEntry) -> Visit {
    let Some(virtual_path) = ctx.virtual_of(entry.path()) else {
        return Visit::Skipped(SkippedEntry {
            path: entry.path().display().to_string(),
            reason: "outside workspace".to_string(),
        });
    };
    let skipped = |reason: String| {
        Visit::Skipped(SkippedEntry {
            path: virtual_path.clone(),
            reason,
        })
    };

    let file_type = entry.file_type();
    if file_type.is_dir() {
        return Visit::Entry(WalkEntry {
            real: entry.into_path(),
            virtual_path: virtual_path.clone(),
            kind: EntryKind::Directory,
            size: 0,
        });
    }

    if file_type.is_symlink() {
        return match ctx.resolve(&virtual_path) {
            Ok(_) => match fs::metadata(entry.path()) {
                Ok(meta) if meta.is_file() => Visit::Entry(WalkEntry {
                    real: entry.into_path(),
                    virtual_path: virtual_path.clone(),
                    kind: EntryKind::File,
                    size: meta.len(),
                }),
                Ok(_) => skipped("symlink to a directory is not followed".to_string()),
                Err(err) => skipped(format!("dangling symlink: {err}")),
            },
            Err(_) => skipped("symlink points outside the workspace".to_string()),
        };
    }

    if !file_type.is_file() {
        return skipped("not a regular file".to_string());
    }
    match entry.metadata() {
        Ok(meta) => Visit::Entry(WalkEntry {
            real: entry.into_path(),
            virtual_path: virtual_path.clone(),
            kind: EntryKind::File,
            size: meta.len(),
        }),
        Err(err) => skipped(err.to_string()),
    }
}

/// Visible entries directly inside `dir`; unreadable directories count as empty.
pub(super) fn count_children(dir: &WalkEntry, ignore: &IgnoreMatcher) -> usize {
    let Ok(read_dir) = fs::read_dir(&dir.real) else {
        return 0;
    };
    read_dir
        .filter_map(|entry| entry.ok())
        .filter(|entry| {
            let name = entry.file_name();
            let child = crate::path_utils::join_virtual(&dir.virtual_path, &name.to_string_lossy());
            let is_dir = entry.file_type().is_ok_and(|kind| kind.is_dir());
            !ignore.is_ignored(&child, is_dir)
        })
        .count()
}

impl WalkEntry {
    pub(super) fn to_directory_entry(&self, ignore: &IgnoreMatcher) -> DirectoryEntry {
        match self.kind {
            EntryKind::File => DirectoryEntry {
                path: self.virtual_path.clone(),
                kind: EntryKind::File,
                size: Some(self.size),
                children: None,
            },
            EntryKind::Directory => DirectoryEntry {
                path: self.virtual_path.clone(),
                kind: EntryKind::Directory,
                size: None,
                children: Some(count_children(self, ignore)),
            },
        }
    }
}
