use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Limits {
    /// Maximum entries returned by a directory listing before it is marked truncated.
    #[serde(default = "default_max_list_entries")]
    pub max_list_entries: usize,
    /// Default cap on matches collected by a content search.
    #[serde(default = "default_max_search_matches")]
    pub max_search_matches: usize,
    /// Default number of context lines shown before and after each search match.
    #[serde(default = "default_context_lines")]
    pub context_lines: usize,
    /// Listing depth used when a request does not specify one.
    #[serde(default = "default_depth")]
    pub default_depth: usize,
    /// Upper bound for any requested listing or search depth.
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,
    /// Lines shown when a file is read without an explicit range.
    #[serde(default = "default_preview_lines")]
    pub preview_lines: usize,
    #[serde(default = "default_max_read_bytes")]
    pub max_read_bytes: u64,
    #[serde(default = "default_max_write_bytes")]
    pub max_write_bytes: u64,
    #[serde(default = "default_fuzzy_max_depth")]
    pub fuzzy_max_depth: usize,
    #[serde(default = "default_max_fuzzy_results")]
    pub max_fuzzy_results: usize,
    /// Stops candidate enumeration for fuzzy lookups on very large trees.
    #[serde(default = "default_max_fuzzy_candidates")]
    pub max_fuzzy_candidates: usize,
    #[serde(default = "default_max_pattern_bytes")]
    pub max_pattern_bytes: usize,
    /// How many skipped traversal entries are echoed back in a response.
    #[serde(default = "default_max_skipped_reported")]
    pub max_skipped_reported: usize,
}

const fn default_max_list_entries() -> usize {
    500
}

const fn default_max_search_matches() -> usize {
    100
}

const fn default_context_lines() -> usize {
    3
}

const fn default_depth() -> usize {
    1
}

const fn default_max_depth() -> usize {
    10
}

const fn default_preview_lines() -> usize {
    100
}

const fn default_max_read_bytes() -> u64 {
    10 * 1024 * 1024
}

const fn default_max_write_bytes() -> u64 {
    10 * 1024 * 1024
}

const fn default_fuzzy_max_depth() -> usize {
    10
}

const fn default_max_fuzzy_results() -> usize {
    50
}

const fn default_max_fuzzy_candidates() -> usize {
    50_000
}

const fn default_max_pattern_bytes() -> usize {
    8 * 1024
}

const fn default_max_skipped_reported() -> usize {
    50
}

// Hard caps guard against misconfiguration turning one call into unbounded work.
const MAX_LIST_ENTRIES_HARD_CAP: usize = 100_000;
const MAX_SEARCH_MATCHES_HARD_CAP: usize = 100_000;
pub const MAX_CONTEXT_LINES: usize = 100;
const MAX_DEPTH_HARD_CAP: usize = 64;
const MAX_PREVIEW_LINES_HARD_CAP: usize = 100_000;
const MAX_READ_BYTES_HARD_CAP: u64 = 256 * 1024 * 1024;
const MAX_WRITE_BYTES_HARD_CAP: u64 = 256 * 1024 * 1024;
const MAX_FUZZY_CANDIDATES_HARD_CAP: usize = 5_000_000;
const MAX_PATTERN_BYTES_HARD_CAP: usize = 1024 * 1024;

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_list_entries: default_max_list_entries(),
            max_search_matches: default_max_search_matches(),
            context_lines: default_context_lines(),
            default_depth: default_depth(),
            max_depth: default_max_depth(),
            preview_lines: default_preview_lines(),
            max_read_bytes: default_max_read_bytes(),
            max_write_bytes: default_max_write_bytes(),
            fuzzy_max_depth: default_fuzzy_max_depth(),
            max_fuzzy_results: default_max_fuzzy_results(),
            max_fuzzy_candidates: default_max_fuzzy_candidates(),
            max_pattern_bytes: default_max_pattern_bytes(),
            max_skipped_reported: default_max_skipped_reported(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IgnoreSettings {
    /// Include the built-in rules (dotfiles, `node_modules`, OS and editor cruft).
    #[serde(default = "default_true")]
    pub use_defaults: bool,
    /// Read `.gitignore` and `.ignore` from the workspace root on every traversal.
    #[serde(default = "default_true")]
    pub read_ignore_files: bool,
    /// Extra gitignore-style rules appended after the file rules.
    #[serde(default)]
    pub extra_patterns: Vec<String>,
}

const fn default_true() -> bool {
    true
}

impl Default for IgnoreSettings {
    fn default() -> Self {
        Self {
            use_defaults: true,
            read_ignore_files: true,
            extra_patterns: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EngineConfig {
    pub root: PathBuf,
    #[serde(default)]
    pub limits: Limits,
    #[serde(default)]
    pub ignore: IgnoreSettings,
}

fn validate_usize_limit(value: usize, field: &str, hard_cap: usize) -> Result<()> {
    if value == 0 {
        return Err(Error::InvalidConfig(format!("{field} must be > 0")));
    }
    if value > hard_cap {
        return Err(Error::InvalidConfig(format!(
            "{field} must be <= {hard_cap}"
        )));
    }
    Ok(())
}

fn validate_u64_limit(value: u64, field: &str, hard_cap: u64) -> Result<()> {
    if value == 0 {
        return Err(Error::InvalidConfig(format!("{field} must be > 0")));
    }
    if value > hard_cap {
        return Err(Error::InvalidConfig(format!(
            "{field} must be <= {hard_cap}"
        )));
    }
    Ok(())
}

impl EngineConfig {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            limits: Limits::default(),
            ignore: IgnoreSettings::default(),
        }
    }

    /// Structural validation only; no filesystem access.
    ///
    /// Root existence is checked by `ops::Context::new`, which also canonicalizes it.
    pub fn validate(&self) -> Result<()> {
        if self.root.as_os_str().is_empty() {
            return Err(Error::InvalidConfig("root is empty".to_string()));
        }
        if !self.root.is_absolute() {
            return Err(Error::InvalidConfig(format!(
                "root must be absolute: {}",
                self.root.display()
            )));
        }

        let limits = &self.limits;
        validate_usize_limit(
            limits.max_list_entries,
            "limits.max_list_entries",
            MAX_LIST_ENTRIES_HARD_CAP,
        )?;
        validate_usize_limit(
            limits.max_search_matches,
            "limits.max_search_matches",
            MAX_SEARCH_MATCHES_HARD_CAP,
        )?;
        if limits.context_lines > MAX_CONTEXT_LINES {
            return Err(Error::InvalidConfig(format!(
                "limits.context_lines must be <= {MAX_CONTEXT_LINES}"
            )));
        }
        validate_usize_limit(limits.max_depth, "limits.max_depth", MAX_DEPTH_HARD_CAP)?;
        validate_usize_limit(limits.default_depth, "limits.default_depth", limits.max_depth)?;
        validate_usize_limit(
            limits.fuzzy_max_depth,
            "limits.fuzzy_max_depth",
            MAX_DEPTH_HARD_CAP,
        )?;
        validate_usize_limit(
            limits.preview_lines,
            "limits.preview_lines",
            MAX_PREVIEW_LINES_HARD_CAP,
        )?;
        validate_u64_limit(
            limits.max_read_bytes,
            "limits.max_read_bytes",
            MAX_READ_BYTES_HARD_CAP,
        )?;
        validate_u64_limit(
            limits.max_write_bytes,
            "limits.max_write_bytes",
            MAX_WRITE_BYTES_HARD_CAP,
        )?;
        validate_usize_limit(
            limits.max_fuzzy_results,
            "limits.max_fuzzy_results",
            limits.max_fuzzy_candidates,
        )?;
        validate_usize_limit(
            limits.max_fuzzy_candidates,
            "limits.max_fuzzy_candidates",
            MAX_FUZZY_CANDIDATES_HARD_CAP,
        )?;
        validate_usize_limit(
            limits.max_pattern_bytes,
            "limits.max_pattern_bytes",
            MAX_PATTERN_BYTES_HARD_CAP,
        )?;

        for (idx, pattern) in self.ignore.extra_patterns.iter().enumerate() {
            if pattern.trim().is_empty() {
                return Err(Error::InvalidConfig(format!(
                    "ignore.extra_patterns[{idx}] must not be empty"
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn absolute_root() -> PathBuf {
        std::env::temp_dir()
    }

    #[test]
    fn defaults_validate() {
        EngineConfig::new(absolute_root())
            .validate()
            .expect("defaults are valid");
        let limits = Limits::default();
        assert_eq!(limits.max_list_entries, 500);
        assert_eq!(limits.max_search_matches, 100);
        assert_eq!(limits.context_lines, 3);
        assert_eq!(limits.preview_lines, 100);
    }

    #[test]
    fn relative_root_is_rejected() {
        let err = EngineConfig::new("relative/root")
            .validate()
            .expect_err("should reject");
        assert!(matches!(err, Error::InvalidConfig(_)), "{err:?}");
    }

    #[test]
    fn zero_limits_are_rejected() {
        let mut config = EngineConfig::new(absolute_root());
        config.limits.max_search_matches = 0;
        let err = config.validate().expect_err("should reject");
        assert!(err.to_string().contains("limits.max_search_matches"));
    }

    #[test]
    fn default_depth_cannot_exceed_max_depth() {
        let mut config = EngineConfig::new(absolute_root());
        config.limits.max_depth = 2;
        config.limits.default_depth = 3;
        let err = config.validate().expect_err("should reject");
        assert!(err.to_string().contains("limits.default_depth"));
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let raw = r#"{"root": "/tmp", "limits": {"max_list_entries": 10, "bogus": 1}}"#;
        let err = serde_json::from_str::<EngineConfig>(raw).expect_err("should reject");
        assert!(err.to_string().contains("bogus"));
    }
}
