//! Gitignore-style rules compiled into a single [`GlobSet`].
//!
//! Rules are evaluated in order and the last one that applies decides. Only traversals consult
//! the matcher; a path named explicitly by the caller is never filtered.

use std::path::Path;

use globset::{GlobSet, GlobSetBuilder};

use crate::config::IgnoreSettings;
use crate::error::{Error, Result};

pub const DEFAULT_RULES: &[&str] = &[
    ".*",
    "node_modules/",
    ".DS_Store",
    "Thumbs.db",
    "desktop.ini",
    "*.swp",
    "*.swo",
    "*~",
];

pub const IGNORE_FILES: &[&str] = &[".gitignore", ".ignore"];

#[derive(Debug, Clone)]
struct Rule {
    negated: bool,
    dir_only: bool,
}

#[derive(Debug, Clone)]
pub struct IgnoreMatcher {
    set: GlobSet,
    rules: Vec<Rule>,
}

impl IgnoreMatcher {
    /// Builds the effective rule list for one traversal under `root`.
    ///
    /// Order: built-in defaults, `.gitignore`, `.ignore`, configured extras, then `exclude`.
    pub fn load(root: &Path, settings: &IgnoreSettings, exclude: &[String]) -> Result<Self> {
        let mut builder = IgnoreBuilder::new();
        if settings.use_defaults {
            for rule in DEFAULT_RULES {
                builder.add(rule)?;
            }
        }
        if settings.read_ignore_files {
            for name in IGNORE_FILES {
                builder.add_file(&root.join(name));
            }
        }
        for rule in &settings.extra_patterns {
            builder.add(rule)?;
        }
        for rule in exclude {
            builder.add(rule)?;
        }
        builder.build()
    }

    /// `relative` is a virtual path; the root itself is never ignored.
    pub fn is_ignored(&self, relative: &str, is_dir: bool) -> bool {
        if relative.is_empty() || relative == "." || self.rules.is_empty() {
            return false;
        }
        let winner = self
            .set
            .matches(relative)
            .into_iter()
            .filter(|idx| is_dir || !self.rules[*idx].dir_only)
            .max();
        winner.is_some_and(|idx| !self.rules[idx].negated)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

#[derive(Debug)]
pub struct IgnoreBuilder {
    globs: GlobSetBuilder,
    rules: Vec<Rule>,
}

impl Default for IgnoreBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl IgnoreBuilder {
    pub fn new() -> Self {
        Self {
            globs: GlobSetBuilder::new(),
            rules: Vec::new(),
        }
    }

    /// Adds one rule line. Blank lines and `#` comments are accepted and ignored.
    pub fn add(&mut self, line: &str) -> Result<&mut Self> {
        let Some((rule, pattern)) = parse_rule(line) else {
            return Ok(self);
        };
        let glob = crate::path_utils::build_glob(&pattern)
            .map_err(|err| Error::InvalidPattern(format!("invalid ignore rule {line:?}: {err}")))?;
        self.globs.add(glob);
        self.rules.push(rule);
        Ok(self)
    }

    /// Adds every rule in an ignore file. A missing file adds nothing; unreadable files and
    /// malformed lines are logged and skipped.
    pub fn add_file(&mut self, path: &Path) -> &mut Self {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return self,
            Err(err) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %err,
                    "skipping unreadable ignore file"
                );
                return self;
            }
        };
        for (idx, line) in content.lines().enumerate() {
            if let Err(err) = self.add(line) {
                tracing::warn!(
                    path = %path.display(),
                    line = idx + 1,
                    error = %err,
                    "skipping malformed ignore rule"
                );
            }
        }
        self
    }

    pub fn build(self) -> Result<IgnoreMatcher> {
        let set = self
            .globs
            .build()
            .map_err(|err| Error::InvalidPattern(format!("invalid ignore rules: {err}")))?;
        Ok(IgnoreMatcher {
            set,
            rules: self.rules,
        })
    }
}

fn parse_rule(line: &str) -> Option<(Rule, String)> {
    let line = line.trim_end_matches(['\r', '\n']).trim_end();
    if line.trim().is_empty() || line.starts_with('#') {
        return None;
    }

    let (negated, rest) = match line.strip_prefix('!') {
        Some(rest) => (true, rest),
        None => (false, line),
    };
    let dir_only = rest.ends_with('/');
    let rest = rest.strip_suffix('/').unwrap_or(rest);
    let (anchored, body) = match rest.strip_prefix('/') {
        Some(stripped) => (true, stripped),
        None => (false, rest),
    };
    if body.is_empty() {
        return None;
    }

    let pattern = if anchored || body.contains('/') || body.starts_with("**") {
        body.to_string()
    } else {
        format!("**/{body}")
    };
    Some((Rule { negated, dir_only }, pattern))
}
