//! `guarded-vfs` is a sandboxed, checksum-guarded virtual filesystem for automated text editing.
//!
//! Callers address files by root-relative virtual paths and go through two operations: a read
//! (file, directory listing, content search or fuzzy name lookup) and a write (create, update,
//! delete). Reads hand out content checksums; writes can require them, so an edit based on a
//! stale read is rejected instead of clobbering a newer version.

pub mod checksum;
pub mod config;
#[cfg(feature = "config-io")]
pub mod config_io;
pub mod diff;
pub mod envelope;
mod error;
pub mod fuzzy;
pub mod ignore;
pub mod lines;
pub mod ops;
pub mod path_utils;
pub mod pattern;

pub use checksum::Checksum;
pub use config::{EngineConfig, IgnoreSettings, Limits};
pub use envelope::{ErrorBody, ReadResponse, WriteResponse};
pub use error::{Error, ErrorCode, Result};
pub use lines::LineRange;
pub use ops::{
    Context, EditAction, ReadOutcome, ReadOutput, ReadRequest, WriteOperation, WriteOutput,
    WriteRequest, WriteResult, read, write,
};
pub use pattern::{PatternMode, PatternOptions, Preset};
