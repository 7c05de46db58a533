use std::fs;
use std::path::Path;

use crate::config::{EngineConfig, Limits};
use crate::error::{Error, Result};
use crate::ignore::IgnoreMatcher;

use super::{Context, ReadOutput, ReadRequest, WriteOutput, WriteRequest};

impl Context {
    pub fn new(config: EngineConfig) -> Result<Self> {
        config.validate()?;

        let root = config.root.canonicalize().map_err(|err| {
            Error::InvalidConfig(format!(
                "failed to canonicalize root {}: {err}",
                config.root.display()
            ))
        })?;
        let meta = fs::metadata(&root).map_err(|err| {
            Error::InvalidConfig(format!("failed to stat root {}: {err}", root.display()))
        })?;
        if !meta.is_dir() {
            return Err(Error::InvalidConfig(format!(
                "root {} is not a directory",
                root.display()
            )));
        }

        // Configured extras are compiled again on every traversal; reject bad ones up front.
        let mut validator = crate::ignore::IgnoreBuilder::new();
        for rule in &config.ignore.extra_patterns {
            validator.add(rule).map_err(|err| {
                Error::InvalidConfig(format!("invalid ignore.extra_patterns entry: {err}"))
            })?;
        }

        tracing::debug!(root = %root.display(), "engine context ready");
        Ok(Self { config, root })
    }

    /// Builds a context rooted at `root` with default limits and ignore settings.
    pub fn with_root(root: impl AsRef<Path>) -> Result<Self> {
        Self::new(EngineConfig::new(root.as_ref()))
    }

    #[cfg(feature = "config-io")]
    pub fn from_config_path(path: impl AsRef<Path>) -> Result<Self> {
        let config = crate::config_io::load_config(path)?;
        Self::new(config)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn limits(&self) -> &Limits {
        &self.config.limits
    }

    pub fn read(&self, request: ReadRequest) -> Result<ReadOutput> {
        super::read(self, request)
    }

    pub fn write(&self, request: WriteRequest) -> Result<WriteOutput> {
        super::write(self, request)
    }

    /// Ignore rules for one traversal, re-reading the root's ignore files.
    pub(super) fn ignore_matcher(&self, exclude: &[String]) -> Result<IgnoreMatcher> {
        IgnoreMatcher::load(&self.root, &self.config.ignore, exclude)
    }
}
