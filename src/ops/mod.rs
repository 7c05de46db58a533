use std::path::PathBuf;

use crate::config::EngineConfig;

mod context;
mod find;
mod io;
mod read;
mod resolve;
mod search;
mod walk;
mod write;

pub use find::{FindHit, FindResult};
pub use read::{DirectoryListing, FileRead, LineSpan, ReadOutcome, ReadOutput, ReadRequest, read};
pub use resolve::ResolvedPath;
pub use search::{ContextLine, FileMatch, MatchContext, SearchResult};
pub use walk::{DirectoryEntry, EntryKind, SkippedEntry};
pub use write::{EditAction, WriteOperation, WriteOutput, WriteRequest, WriteResult, write};


/// Engine state shared by every call: the validated configuration and the canonical root.
///
/// Holds no mutable state, so one `Context` can serve concurrent calls.
pub struct Context {
    config: EngineConfig,
    root: PathBuf,
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("root", &self.root)
            .field("limits", &self.config.limits)
            .finish_non_exhaustive()
    }
}
