//! Load the project contract with opt-in validation.

use std::path::Path;

use tracing::debug;

use super::plugins::Category;
use super::schema::ProjectConfig;
use super::store::ConfigStore;
use crate::error::ConfigError;

/// Source of a loaded [`ProjectConfig`].
pub trait Loader {
    fn load(&self, path: &Path) -> anyhow::Result<ProjectConfig>;
}

/// Plain file loader; a missing file yields an empty contract.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileLoader;

impl Loader for FileLoader {
    fn load(&self, path: &Path) -> anyhow::Result<ProjectConfig> {
        ConfigStore::<ProjectConfig>::new(path).load()
    }
}

/// Narrows a loaded contract to its plugin section, optionally one category.
#[derive(Debug, Clone)]
pub struct PluginScope<L> {
    inner: L,
    category: Option<Category>,
}

impl<L: Loader> PluginScope<L> {
    pub fn new(inner: L, category: Option<Category>) -> Self {
        Self { inner, category }
    }
}

impl<L: Loader> Loader for PluginScope<L> {
    fn load(&self, path: &Path) -> anyhow::Result<ProjectConfig> {
        let config = self.inner.load(path)?;
        let mut scoped = ProjectConfig::new();
        scoped.plugins = config.plugins.map(|plugins| match self.category {
            Some(category) => plugins.only(category),
            None => plugins,
        });
        Ok(scoped)
    }
}

/// Checks a [`ValidatingLoader`] runs after loading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationCheck {
    /// Servers, daemon settings and plugin entries.
    Schema,
    /// The `[daemon]` section only.
    Daemon,
    /// `plugins.dir` exists and holds a file per configured plugin.
    PluginBinaries,
}

/// Wraps a loader and fails the load when any check fails.
///
/// Every check runs; failures are reported together.
#[derive(Debug, Clone)]
pub struct ValidatingLoader<L> {
    inner: L,
    checks: Vec<ValidationCheck>,
}

impl<L: Loader> ValidatingLoader<L> {
    pub fn new(inner: L) -> Self {
        Self {
            inner,
            checks: Vec::new(),
        }
    }

    pub fn with_check(mut self, check: ValidationCheck) -> Self {
        if !self.checks.contains(&check) {
            self.checks.push(check);
        }
        self
    }
}

impl<L: Loader> Loader for ValidatingLoader<L> {
    fn load(&self, path: &Path) -> anyhow::Result<ProjectConfig> {
        let config = self.inner.load(path)?;

        let mut errors = Vec::new();
        for check in &self.checks {
            debug!(?check, path = %path.display(), "running load check");
            let result = match check {
                ValidationCheck::Schema => check_schema(&config),
                ValidationCheck::Daemon => check_daemon(&config),
                ValidationCheck::PluginBinaries => check_plugin_binaries(&config),
            };
            if let Err(err) = result {
                errors.extend(err.into_leaves());
            }
        }
        ConfigError::collect(errors)?;

        Ok(config)
    }
}

pub fn check_schema(config: &ProjectConfig) -> Result<(), ConfigError> {
    config.validate()
}

pub fn check_daemon(config: &ProjectConfig) -> Result<(), ConfigError> {
    config.daemon.as_ref().map_or(Ok(()), |daemon| daemon.validate())
}

/// Every configured plugin must have a binary named after it in `plugins.dir`.
///
/// A contract without plugins passes without needing a directory.
pub fn check_plugin_binaries(config: &ProjectConfig) -> Result<(), ConfigError> {
    let Some(plugins) = config.plugins.as_ref() else {
        return Ok(());
    };
    if plugins.distinct_count() == 0 {
        return Ok(());
    }

    let Some(dir) = plugins.dir.as_deref().filter(|d| !d.trim().is_empty()) else {
        return Err(ConfigError::MissingArgument(
            "plugins.dir (required to locate plugin binaries)".to_string(),
        ));
    };
    let dir = Path::new(dir);
    if !dir.is_dir() {
        return Err(ConfigError::invalid(
            "plugins.dir",
            format!("'{}' is not an existing directory", dir.display()),
        ));
    }

    let mut errors = Vec::new();
    for (category, entries) in plugins.all_categories() {
        for entry in entries {
            if !dir.join(&entry.name).is_file() {
                errors.push(ConfigError::not_found(format!(
                    "binary for plugin '{}' ({}) in {}",
                    entry.name,
                    category,
                    dir.display()
                )));
            }
        }
    }
    ConfigError::collect(errors)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::plugins::{Category, Flow, PluginEntry};
    use tempfile::TempDir;

    #[test]
    fn no_plugins_needs_no_dir() {
        assert!(check_plugin_binaries(&ProjectConfig::new()).is_ok());
    }

    #[test]
    fn plugins_without_dir_fail() {
        let mut config = ProjectConfig::new();
        config
            .upsert_plugin(Category::Audit, PluginEntry::new("logger", [Flow::Request]))
            .unwrap();
        assert!(matches!(
            check_plugin_binaries(&config),
            Err(ConfigError::MissingArgument(_))
        ));
    }

    #[test]
    fn reports_each_missing_binary() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("present"), b"").unwrap();

        let mut config = ProjectConfig::new();
        config.plugins_mut().dir = Some(temp.path().display().to_string());
        for name in ["present", "gone-a", "gone-b"] {
            config
                .upsert_plugin(Category::Content, PluginEntry::new(name, [Flow::Response]))
                .unwrap();
        }

        let leaves = check_plugin_binaries(&config).unwrap_err().into_leaves();
        assert_eq!(leaves.len(), 2);
    }

    #[test]
    fn daemon_check_ignores_plugins() {
        let mut config = ProjectConfig::new();
        config
            .upsert_plugin(Category::Audit, PluginEntry::new("logger", [Flow::Request]))
            .unwrap();
        config.daemon_mut().set("api.addr", "localhost:8090").unwrap();
        assert!(check_daemon(&config).is_ok());

        config.daemon_mut().set("api.addr", "no-port").unwrap();
        assert!(check_daemon(&config).is_err());
    }
}
