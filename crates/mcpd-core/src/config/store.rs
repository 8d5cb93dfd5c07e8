//! Config store for loading and saving TOML documents.

use std::fs;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use super::context::ExecutionContext;
use super::parser;
use super::schema::ProjectConfig;
use crate::error::ConfigError;

/// A TOML document managed by a [`ConfigStore`].
pub trait ConfigDocument: Serialize + DeserializeOwned + Default + Clone + PartialEq {
    /// Human-readable name used in messages.
    const LABEL: &'static str;

    /// Drop empty sections before saving.
    fn prune(&mut self) {}

    fn validate(&self) -> Result<(), ConfigError>;
}

impl ConfigDocument for ProjectConfig {
    const LABEL: &'static str = "config";

    fn prune(&mut self) {
        ProjectConfig::prune(self)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        ProjectConfig::validate(self)
    }
}

impl ConfigDocument for ExecutionContext {
    const LABEL: &'static str = "execution context";

    fn validate(&self) -> Result<(), ConfigError> {
        ExecutionContext::validate(self)
    }
}

#[derive(Debug, Clone)]
pub struct ConfigStore<T> {
    path: PathBuf,
    _document: PhantomData<T>,
}

impl<T: ConfigDocument> ConfigStore<T> {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            _document: PhantomData,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Load the document, or an empty one when the file does not exist.
    ///
    /// A missing file is never created here; it appears on the first save.
    pub fn load(&self) -> anyhow::Result<T> {
        if !self.path.exists() {
            debug!(path = %self.path.display(), "{} file missing, using empty document", T::LABEL);
            return Ok(T::default());
        }
        debug!(path = %self.path.display(), "loading {}", T::LABEL);
        parser::parse_toml_file(&self.path)
    }

    /// Serialize and write atomically (tmp + rename).
    pub fn save(&self, document: &T) -> anyhow::Result<()> {
        let mut document = document.clone();
        document.prune();
        let content = parser::to_toml(&document)
            .with_context(|| format!("Failed to serialize {} to TOML", T::LABEL))?;

        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        write_atomic(&self.path, content.as_bytes())?;
        debug!(path = %self.path.display(), "saved {}", T::LABEL);
        Ok(())
    }

    /// Load, apply `f`, and save only when the document changed.
    ///
    /// Nothing is written if `f` fails. Returns `f`'s value.
    pub fn modify<R, F>(&self, f: F) -> anyhow::Result<R>
    where
        F: FnOnce(&mut T) -> anyhow::Result<R>,
    {
        let original = self.load()?;
        let mut document = original.clone();
        let value = f(&mut document)?;
        document.prune();

        let mut pruned_original = original;
        pruned_original.prune();
        if document != pruned_original {
            self.save(&document)
                .with_context(|| format!("Failed to save {}", T::LABEL))?;
        } else {
            debug!(path = %self.path.display(), "{} unchanged, skipping save", T::LABEL);
        }
        Ok(value)
    }
}

/// Write `bytes` to a sibling temp file, then rename it over `path`.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> anyhow::Result<()> {
    let file_name = path
        .file_name()
        .ok_or_else(|| anyhow::anyhow!("Invalid file path: {}", path.display()))?
        .to_string_lossy();
    let tmp_path = path.with_file_name(format!(".{}.{}.tmp", file_name, std::process::id()));

    fs::write(&tmp_path, bytes)
        .with_context(|| format!("Failed to write temp file: {}", tmp_path.display()))?;

    if let Err(err) = fs::rename(&tmp_path, path) {
        let _ = fs::remove_file(&tmp_path);
        return Err(err).with_context(|| format!("Failed to replace file: {}", path.display()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::ServerEntry;
    use tempfile::TempDir;

    #[test]
    fn test_load_missing_does_not_touch_disk() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nested").join(".mcpd.toml");
        let store = ConfigStore::<ProjectConfig>::new(&path);

        let config = store.load().unwrap();
        assert!(config.servers.is_empty());
        assert!(!path.exists());
        assert!(!path.parent().unwrap().exists());
    }

    #[test]
    fn test_save_creates_parent_and_leaves_no_temp_files() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nested").join(".mcpd.toml");
        let store = ConfigStore::<ProjectConfig>::new(&path);

        let mut config = ProjectConfig::new();
        config
            .upsert_server(ServerEntry::new("time", "uvx::time@latest"))
            .unwrap();
        store.save(&config).unwrap();

        assert_eq!(store.load().unwrap(), config);
        let entries: Vec<_> = fs::read_dir(path.parent().unwrap()).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn test_modify_skips_save_when_unchanged() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("secrets.dev.toml");
        let store = ConfigStore::<ExecutionContext>::new(&path);

        store.modify(|_| Ok(())).unwrap();
        assert!(!path.exists());
    }

    #[test]
    fn test_modify_failure_leaves_file_untouched() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join(".mcpd.toml");
        fs::write(&path, "# hand-written\n").unwrap();
        let store = ConfigStore::<ProjectConfig>::new(&path);

        let result: anyhow::Result<()> = store.modify(|config| {
            config.upsert_server(ServerEntry::new("time", "uvx::time@latest"))?;
            anyhow::bail!("validation failed")
        });

        assert!(result.is_err());
        assert_eq!(fs::read_to_string(&path).unwrap(), "# hand-written\n");
    }
}
