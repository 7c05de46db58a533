//! Lexical helpers for virtual paths.
//!
//! Nothing here touches the filesystem. A virtual path is root-relative, uses `/` separators,
//! never contains `..` and is spelled `.` for the root itself.
use std::path::{Component, Path};

use globset::GlobBuilder;

use crate::error::{Error, Result};

pub const ROOT: &str = ".";

fn has_drive_prefix(raw: &str) -> bool {
    let bytes = raw.as_bytes();
    bytes.len() >= 2 && bytes[1] == b':' && bytes[0].is_ascii_alphabetic()
}

/// Validates caller input and returns its normalized virtual spelling.
pub fn normalize_virtual(raw: &str) -> Result<String> {
    if raw.contains('\0') {
        return Err(Error::InvalidPath(format!(
            "{:?} contains a NUL byte",
            raw.replace('\0', "\\0")
        )));
    }
    let trimmed = raw.trim();
    if matches!(trimmed, "" | "." | "/") {
        return Ok(ROOT.to_string());
    }

    let unified = trimmed.replace('\\', "/");
    if unified.starts_with('/') {
        return Err(Error::InvalidPath(format!(
            "{raw:?} is absolute; use a path relative to the workspace root"
        )));
    }
    if has_drive_prefix(&unified) {
        return Err(Error::InvalidPath(format!(
            "{raw:?} has a drive prefix; use a path relative to the workspace root"
        )));
    }

    let mut segments = Vec::new();
    for segment in unified.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                return Err(Error::InvalidPath(format!(
                    "{raw:?} must not contain '..' segments"
                )));
            }
            other => segments.push(other),
        }
    }

    if segments.is_empty() {
        Ok(ROOT.to_string())
    } else {
        Ok(segments.join("/"))
    }
}

/// Renders a root-relative filesystem path as a virtual path.
pub fn to_virtual(relative: &Path) -> String {
    let mut out = String::new();
    for component in relative.components() {
        if let Component::Normal(part) = component {
            if !out.is_empty() {
                out.push('/');
            }
            out.push_str(&part.to_string_lossy());
        }
    }
    if out.is_empty() {
        ROOT.to_string()
    } else {
        out
    }
}

pub fn join_virtual(base: &str, name: &str) -> String {
    if base == ROOT {
        name.to_string()
    } else {
        format!("{base}/{name}")
    }
}

/// Number of `/`-separated segments; the root has depth 0.
pub fn virtual_depth(path: &str) -> usize {
    if path == ROOT {
        0
    } else {
        path.split('/').count()
    }
}

pub fn file_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

pub(crate) fn build_glob(pattern: &str) -> std::result::Result<globset::Glob, globset::Error> {
    let mut builder = GlobBuilder::new(pattern);
    builder.literal_separator(true);
    #[cfg(windows)]
    builder.case_insensitive(true);
    builder.build()
}
