//! Shared file locations for the config commands.
//!
//! `ConfigPaths` is resolved once per process and hands out stores for the
//! two documents every command edits.

use std::path::{Path, PathBuf};

use crate::config::paths::{DEFAULT_CONFIG_FILE, default_runtime_file};
use crate::config::{ConfigStore, ExecutionContext, ProjectConfig};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigPaths {
    /// Project contract (`.mcpd.toml`)
    config_file: PathBuf,
    /// Execution context (`secrets.dev.toml`)
    runtime_file: PathBuf,
}

impl ConfigPaths {
    /// Create paths with explicit file locations.
    pub fn new(config_file: impl Into<PathBuf>, runtime_file: impl Into<PathBuf>) -> Self {
        Self {
            config_file: config_file.into(),
            runtime_file: runtime_file.into(),
        }
    }

    /// `.mcpd.toml` in the working directory and the user's runtime file.
    pub fn with_defaults() -> anyhow::Result<Self> {
        Ok(Self::new(DEFAULT_CONFIG_FILE, default_runtime_file()?))
    }

    pub fn config_file(&self) -> &Path {
        &self.config_file
    }

    pub fn runtime_file(&self) -> &Path {
        &self.runtime_file
    }

    pub fn contract_store(&self) -> ConfigStore<ProjectConfig> {
        ConfigStore::new(&self.config_file)
    }

    pub fn context_store(&self) -> ConfigStore<ExecutionContext> {
        ConfigStore::new(&self.runtime_file)
    }
}
