use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::path_utils::{ROOT, normalize_virtual, to_virtual};

use super::Context;

/// A caller path that has been verified to stay inside the workspace root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPath {
    pub real: PathBuf,
    pub virtual_path: String,
}

impl ResolvedPath {
    pub fn is_root(&self) -> bool {
        self.virtual_path == ROOT
    }
}

// Containment is checked twice: lexically on the joined path, then on the canonical form of the
// deepest ancestor that exists, so a symlink inside the root cannot lead outside it. This is a
// path-based check; it does not hold directory handles across the call.
impl Context {
    pub fn resolve(&self, raw: &str) -> Result<ResolvedPath> {
        let virtual_path = normalize_virtual(raw)?;
        if virtual_path == ROOT {
            return Ok(ResolvedPath {
                real: self.root.clone(),
                virtual_path,
            });
        }

        let real = virtual_path
            .split('/')
            .fold(self.root.clone(), |acc, segment| acc.join(segment));
        if !real.starts_with(&self.root) {
            return Err(Error::OutsideRoot(virtual_path));
        }

        let anchor = self.canonical_anchor(&real, &virtual_path)?;
        if !anchor.starts_with(&self.root) {
            return Err(Error::OutsideRoot(virtual_path));
        }

        Ok(ResolvedPath { real, virtual_path })
    }

    /// Virtual spelling of a real path under the root, if it is under the root.
    pub(super) fn virtual_of(&self, real: &Path) -> Option<String> {
        real.strip_prefix(&self.root).ok().map(to_virtual)
    }

    fn canonical_anchor(&self, real: &Path, virtual_path: &str) -> Result<PathBuf> {
        let mut current = real.to_path_buf();
        loop {
            match fs::symlink_metadata(&current) {
                Ok(meta) => {
                    return match current.canonicalize() {
                        Ok(canonical) => Ok(canonical),
                        Err(err)
                            if err.kind() == std::io::ErrorKind::NotFound
                                && meta.file_type().is_symlink() =>
                        {
                            self.dangling_link_anchor(&current, virtual_path)
                        }
                        Err(err) => Err(Error::io_path("canonicalize", virtual_path, err)),
                    };
                }
                Err(err) if super::io::is_missing(&err) => {
                    if current == self.root || !current.pop() {
                        return Ok(self.root.clone());
                    }
                }
                Err(err) => return Err(Error::io_path("symlink_metadata", virtual_path, err)),
            }
        }
    }

    /// A dangling symlink counts as inside only if its target would be.
    fn dangling_link_anchor(&self, link: &Path, virtual_path: &str) -> Result<PathBuf> {
        let target =
            fs::read_link(link).map_err(|err| Error::io_path("read_link", virtual_path, err))?;
        let parent = link
            .parent()
            .and_then(|parent| parent.canonicalize().ok())
            .unwrap_or_else(|| self.root.clone());
        let joined = if target.is_absolute() {
            target
        } else {
            parent.join(target)
        };

        let mut normalized = PathBuf::new();
        for component in joined.components() {
            match component {
                std::path::Component::ParentDir => {
                    normalized.pop();
                }
                std::path::Component::CurDir => {}
                other => normalized.push(other.as_os_str()),
            }
        }
        Ok(normalized)
    }
}
