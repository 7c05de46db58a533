use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Stable, caller-visible error classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    InvalidPath,
    NotFound,
    Ambiguous,
    NotText,
    IoError,
    InvalidRange,
    OutOfRange,
    PatternNotFound,
    MultipleMatches,
    AlreadyExists,
    MissingAction,
    MissingContent,
    ChecksumMismatch,
    InvalidAction,
    InvalidOperation,
    InvalidType,
    InvalidPattern,
    InvalidTarget,
    TooLarge,
    InvalidConfig,
}

impl ErrorCode {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::InvalidPath => "INVALID_PATH",
            Self::NotFound => "NOT_FOUND",
            Self::Ambiguous => "AMBIGUOUS",
            Self::NotText => "NOT_TEXT",
            Self::IoError => "IO_ERROR",
            Self::InvalidRange => "INVALID_RANGE",
            Self::OutOfRange => "OUT_OF_RANGE",
            Self::PatternNotFound => "PATTERN_NOT_FOUND",
            Self::MultipleMatches => "MULTIPLE_MATCHES",
            Self::AlreadyExists => "ALREADY_EXISTS",
            Self::MissingAction => "MISSING_ACTION",
            Self::MissingContent => "MISSING_CONTENT",
            Self::ChecksumMismatch => "CHECKSUM_MISMATCH",
            Self::InvalidAction => "INVALID_ACTION",
            Self::InvalidOperation => "INVALID_OPERATION",
            Self::InvalidType => "INVALID_TYPE",
            Self::InvalidPattern => "INVALID_PATTERN",
            Self::InvalidTarget => "INVALID_TARGET",
            Self::TooLarge => "TOO_LARGE",
            Self::InvalidConfig => "INVALID_CONFIG",
        }
    }

    /// Short recovery advice shown next to a failed envelope.
    pub const fn hint(self) -> &'static str {
        match self {
            Self::InvalidPath => "Use a path relative to the workspace root without '..' segments.",
            Self::NotFound => "Read the parent directory to see which files exist.",
            Self::Ambiguous => "Several files share that name; retry with one of the candidates.",
            Self::NotText => "Only UTF-8 text files can be read or edited.",
            Self::IoError => "The filesystem rejected the operation; retry or check permissions.",
            Self::InvalidRange => "Use lines=\"N\", \"N-M\" or \"N-\" with 1-indexed line numbers.",
            Self::OutOfRange => "Read the file first to check how many lines it has.",
            Self::PatternNotFound => "Read or search the file to confirm the exact text.",
            Self::MultipleMatches => {
                "Make the pattern more specific, target lines instead, or set replace_all."
            }
            Self::AlreadyExists => "Use operation=update to change an existing file.",
            Self::MissingAction => {
                "Set action to replace, insert_before, insert_after or delete_lines."
            }
            Self::MissingContent => "This action needs content.",
            Self::ChecksumMismatch => {
                "The file changed since it was read; read it again to get the current checksum."
            }
            Self::InvalidAction => {
                "Valid actions are replace, insert_before, insert_after and delete_lines."
            }
            Self::InvalidOperation => "Valid operations are create, update and delete.",
            Self::InvalidType => "Check the request fields and the kind of path being targeted.",
            Self::InvalidPattern => "Check the pattern syntax or switch pattern_mode to literal.",
            Self::InvalidTarget => "Pass exactly one of lines or pattern.",
            Self::TooLarge => "The file exceeds the configured size limit.",
            Self::InvalidConfig => "Fix the engine configuration and restart.",
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error("io error during {op} on {}: {source}", path.display())]
    IoPath {
        op: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("walkdir error: {0}")]
    WalkDir(#[from] walkdir::Error),

    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error("invalid path: {0}")]
    InvalidPath(String),

    #[error("path is outside the workspace: {0}")]
    OutsideRoot(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("{path} is ambiguous ({} candidates)", candidates.len())]
    Ambiguous {
        path: String,
        candidates: Vec<String>,
    },

    #[error("not a text file: {0}")]
    NotText(String),

    #[error("file is too large ({size_bytes} bytes; max {max_bytes} bytes): {path}")]
    TooLarge {
        path: String,
        size_bytes: u64,
        max_bytes: u64,
    },

    #[error("invalid line range: {0}")]
    InvalidRange(String),

    #[error("line {start} is out of range (file has {total_lines} lines)")]
    OutOfRange { start: usize, total_lines: usize },

    #[error("invalid pattern: {0}")]
    InvalidPattern(String),

    #[error("pattern not found: {0}")]
    PatternNotFound(String),

    #[error("pattern matched {count} times")]
    MultipleMatches { count: usize, lines: Vec<usize> },

    #[error("already exists: {0}")]
    AlreadyExists(String),

    #[error("update requires an action")]
    MissingAction,

    #[error("action {0} requires content")]
    MissingContent(&'static str),

    #[error("invalid target: {0}")]
    InvalidTarget(String),

    #[error("checksum mismatch: expected {expected}, file is now {actual}")]
    ChecksumMismatch { expected: String, actual: String },

    #[error("invalid action: {0}")]
    InvalidAction(String),

    #[error("invalid operation: {0}")]
    InvalidOperation(String),

    #[error("invalid type: {0}")]
    InvalidType(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn io_path(op: &'static str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::IoPath {
            op,
            path: path.into(),
            source,
        }
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            Self::IoPath { .. } | Self::WalkDir(_) => ErrorCode::IoError,
            Self::InvalidConfig(_) => ErrorCode::InvalidConfig,
            Self::InvalidPath(_) | Self::OutsideRoot(_) => ErrorCode::InvalidPath,
            Self::NotFound(_) => ErrorCode::NotFound,
            Self::Ambiguous { .. } => ErrorCode::Ambiguous,
            Self::NotText(_) => ErrorCode::NotText,
            Self::TooLarge { .. } => ErrorCode::TooLarge,
            Self::InvalidRange(_) => ErrorCode::InvalidRange,
            Self::OutOfRange { .. } => ErrorCode::OutOfRange,
            Self::InvalidPattern(_) => ErrorCode::InvalidPattern,
            Self::PatternNotFound(_) => ErrorCode::PatternNotFound,
            Self::MultipleMatches { .. } => ErrorCode::MultipleMatches,
            Self::AlreadyExists(_) => ErrorCode::AlreadyExists,
            Self::MissingAction => ErrorCode::MissingAction,
            Self::MissingContent(_) => ErrorCode::MissingContent,
            Self::InvalidTarget(_) => ErrorCode::InvalidTarget,
            Self::ChecksumMismatch { .. } => ErrorCode::ChecksumMismatch,
            Self::InvalidAction(_) => ErrorCode::InvalidAction,
            Self::InvalidOperation(_) => ErrorCode::InvalidOperation,
            Self::InvalidType(_) => ErrorCode::InvalidType,
        }
    }
}
