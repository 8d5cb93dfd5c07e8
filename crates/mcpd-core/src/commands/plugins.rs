//! `config plugins`: the categorised plugin pipeline in the contract.

use anyhow::Context;
use serde::Serialize;
use tracing::info;

use super::context::ConfigPaths;
use crate::config::loader::{FileLoader, Loader, PluginScope, ValidatingLoader, ValidationCheck};
use crate::config::plugins::{Category, Flow, MoveOptions, PluginCatalogue, PluginEntry};
use crate::config::schema::ProjectConfig;
use crate::error::ConfigError;
use crate::types::OperationResult;

/// Options for adding a new plugin
#[derive(Debug, Clone)]
pub struct AddOptions {
    pub name: String,
    pub category: Category,
    pub flows: Vec<Flow>,
    pub required: bool,
    pub commit_hash: Option<String>,
}

impl AddOptions {
    pub fn new(name: impl Into<String>, category: Category) -> Self {
        Self {
            name: name.into(),
            category,
            flows: Vec::new(),
            required: false,
            commit_hash: None,
        }
    }

    pub fn with_flows(mut self, flows: impl IntoIterator<Item = Flow>) -> Self {
        self.flows.extend(flows);
        self
    }

    pub fn with_required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    pub fn with_commit_hash(mut self, hash: impl Into<String>) -> Self {
        self.commit_hash = Some(hash.into());
        self
    }
}

/// Options for `set`: the plugin directory, one plugin's fields, or both.
///
/// Fields left as `None` (or an empty `flows`) keep their current value.
#[derive(Debug, Clone, Default)]
pub struct SetOptions {
    /// New plugin directory; an empty string clears it
    pub dir: Option<String>,
    pub category: Option<Category>,
    pub name: Option<String>,
    pub flows: Vec<Flow>,
    pub required: Option<bool>,
    pub commit_hash: Option<String>,
}

impl SetOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_dir(mut self, dir: impl Into<String>) -> Self {
        self.dir = Some(dir.into());
        self
    }

    pub fn with_plugin(mut self, category: Category, name: impl Into<String>) -> Self {
        self.category = Some(category);
        self.name = Some(name.into());
        self
    }

    pub fn with_flows(mut self, flows: impl IntoIterator<Item = Flow>) -> Self {
        self.flows.extend(flows);
        self
    }

    pub fn with_required(mut self, required: bool) -> Self {
        self.required = Some(required);
        self
    }

    pub fn with_commit_hash(mut self, hash: impl Into<String>) -> Self {
        self.commit_hash = Some(hash.into());
        self
    }

    fn touches_plugin(&self) -> bool {
        self.category.is_some()
            || self.name.is_some()
            || !self.flows.is_empty()
            || self.required.is_some()
            || self.commit_hash.is_some()
    }
}

/// Options for validating plugins
#[derive(Debug, Clone, Default)]
pub struct ValidateOptions {
    /// Restrict checks to one category
    pub category: Option<Category>,
    /// Also require each plugin binary to exist in `plugins.dir`
    pub check_binaries: bool,
}

impl ValidateOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_category(mut self, category: Category) -> Self {
        self.category = Some(category);
        self
    }

    pub fn with_check_binaries(mut self, check: bool) -> Self {
        self.check_binaries = check;
        self
    }
}

/// Result of a single-plugin mutation
#[derive(Debug, Clone, Serialize)]
pub struct PluginReport {
    /// Plugin name, or `None` for directory-only changes
    pub name: Option<String>,
    pub category: Option<Category>,
    pub entry: Option<PluginEntry>,
    pub result: OperationResult,
}

/// Result of a move, with the destination category's new order
#[derive(Debug, Clone, Serialize)]
pub struct MoveReport {
    pub name: String,
    pub from: Category,
    pub category: Category,
    pub order: Vec<String>,
    pub result: OperationResult,
}

/// One category in a listing
#[derive(Debug, Clone, Serialize)]
pub struct ListedCategory {
    pub category: Category,
    pub plugins: Vec<PluginEntry>,
}

/// Plugins that passed validation
#[derive(Debug, Clone, Serialize)]
pub struct ValidationReport {
    pub checked: Vec<ListedCategory>,
    pub binaries_checked: bool,
}

impl ValidationReport {
    pub fn plugin_count(&self) -> usize {
        self.checked.iter().map(|c| c.plugins.len()).sum()
    }
}

/// Plugin command orchestrator
#[derive(Debug, Clone)]
pub struct PluginsCommand {
    paths: ConfigPaths,
}

impl PluginsCommand {
    pub fn new(paths: ConfigPaths) -> Self {
        Self { paths }
    }

    /// Add a plugin; fails if the category already has one with that name.
    pub fn add(&self, options: &AddOptions) -> anyhow::Result<PluginReport> {
        if options.flows.is_empty() {
            return Err(ConfigError::MissingArgument("flow".to_string()).into());
        }

        let mut entry = PluginEntry::new(&options.name, options.flows.iter().copied());
        if options.required {
            entry = entry.with_required(true);
        }
        if let Some(hash) = &options.commit_hash {
            entry = entry.with_commit_hash(hash);
        }

        let category = options.category;
        let result = self
            .paths
            .contract_store()
            .modify(|config| {
                if config.plugin(category, &entry.name).is_some() {
                    return Err(ConfigError::already_exists(format!(
                        "plugin '{}' in category '{}'",
                        entry.name, category
                    ))
                    .into());
                }
                Ok(config.upsert_plugin(category, entry.clone())?)
            })
            .with_context(|| format!("Failed to add plugin '{}'", options.name))?;

        info!(plugin = %options.name, %category, "plugin added");
        Ok(PluginReport {
            name: Some(options.name.clone()),
            category: Some(category),
            entry: Some(entry),
            result,
        })
    }

    /// Update the plugin directory and/or one plugin's fields.
    ///
    /// A plugin that does not exist yet is created, which requires flows.
    pub fn set(&self, options: &SetOptions) -> anyhow::Result<PluginReport> {
        let plugin = if options.touches_plugin() {
            let category = options
                .category
                .ok_or_else(|| ConfigError::MissingArgument("category".to_string()))?;
            let name = options
                .name
                .as_deref()
                .map(str::trim)
                .filter(|n| !n.is_empty())
                .ok_or_else(|| ConfigError::MissingArgument("name".to_string()))?;
            Some((category, name))
        } else {
            None
        };
        if plugin.is_none() && options.dir.is_none() {
            return Err(ConfigError::MissingArgument(
                "dir, or category and name".to_string(),
            )
            .into());
        }

        let report = self
            .paths
            .contract_store()
            .modify(|config| {
                let mut result = OperationResult::Noop;
                if let Some(dir) = &options.dir {
                    result = result.combine(config.plugins_mut().set_dir(Some(dir.clone())));
                }

                let Some((category, name)) = plugin else {
                    return Ok(PluginReport {
                        name: None,
                        category: None,
                        entry: None,
                        result,
                    });
                };

                let entry = match config.plugin(category, name) {
                    Some(existing) => merge_entry(existing.clone(), options),
                    None if options.flows.is_empty() => {
                        return Err(ConfigError::MissingArgument(format!(
                            "flow (plugin '{}' does not exist in category '{}')",
                            name, category
                        ))
                        .into());
                    }
                    None => merge_entry(PluginEntry::new(name, []), options),
                };
                result = result.combine(config.upsert_plugin(category, entry.clone())?);
                Ok(PluginReport {
                    name: Some(name.to_string()),
                    category: Some(category),
                    entry: Some(entry),
                    result,
                })
            })
            .context("Failed to set plugin configuration")?;

        info!(result = %report.result, "plugin configuration set");
        Ok(report)
    }

    pub fn get(&self, category: Category, name: &str) -> anyhow::Result<PluginEntry> {
        let config = self.paths.contract_store().load()?;
        config.plugin(category, name).cloned().ok_or_else(|| {
            ConfigError::not_found(format!("plugin '{}' in category '{}'", name, category)).into()
        })
    }

    /// The whole `[plugins]` section.
    pub fn catalogue(&self) -> anyhow::Result<PluginCatalogue> {
        let config = self.paths.contract_store().load()?;
        Ok(config.plugins.unwrap_or_default())
    }

    /// Plugins grouped by category in execution order.
    ///
    /// With a category filter that category is returned even when empty.
    pub fn list(&self, category: Option<Category>) -> anyhow::Result<Vec<ListedCategory>> {
        let config = self.paths.contract_store().load()?;
        Ok(listing(&config, category))
    }

    pub fn move_plugin(
        &self,
        category: Category,
        name: &str,
        options: &MoveOptions,
    ) -> anyhow::Result<MoveReport> {
        let destination = options.to_category.unwrap_or(category);
        let report = self
            .paths
            .contract_store()
            .modify(|config| {
                let result = config.plugins_mut().move_plugin(category, name, options)?;
                let order = config
                    .plugins_in(destination)
                    .iter()
                    .map(|p| p.name.clone())
                    .collect();
                Ok(MoveReport {
                    name: name.to_string(),
                    from: category,
                    category: destination,
                    order,
                    result,
                })
            })
            .with_context(|| format!("Failed to move plugin '{}'", name))?;

        info!(
            plugin = name,
            from = %category,
            to = %destination,
            result = %report.result,
            "plugin moved"
        );
        Ok(report)
    }

    pub fn remove(&self, category: Category, name: &str) -> anyhow::Result<PluginReport> {
        let result = self
            .paths
            .contract_store()
            .modify(|config| Ok(config.delete_plugin(category, name)?))
            .with_context(|| format!("Failed to remove plugin '{}'", name))?;

        info!(plugin = name, %category, "plugin removed");
        Ok(PluginReport {
            name: Some(name.to_string()),
            category: Some(category),
            entry: None,
            result,
        })
    }

    /// Validate plugin entries, and optionally their binaries.
    pub fn validate(&self, options: &ValidateOptions) -> anyhow::Result<ValidationReport> {
        let mut loader = ValidatingLoader::new(PluginScope::new(FileLoader, options.category))
            .with_check(ValidationCheck::Schema);
        if options.check_binaries {
            loader = loader.with_check(ValidationCheck::PluginBinaries);
        }
        let scoped = loader.load(self.paths.config_file())?;

        Ok(ValidationReport {
            checked: listing(&scoped, options.category),
            binaries_checked: options.check_binaries,
        })
    }
}

fn merge_entry(mut entry: PluginEntry, options: &SetOptions) -> PluginEntry {
    if !options.flows.is_empty() {
        entry.flows = options.flows.iter().copied().collect();
    }
    if let Some(required) = options.required {
        entry.required = Some(required);
    }
    if let Some(hash) = &options.commit_hash {
        entry.commit_hash = Some(hash.trim().to_string()).filter(|h| !h.is_empty());
    }
    entry
}

fn listing(config: &ProjectConfig, category: Option<Category>) -> Vec<ListedCategory> {
    let categories: Vec<Category> = match category {
        Some(category) => vec![category],
        None => Category::ALL
            .into_iter()
            .filter(|c| !config.plugins_in(*c).is_empty())
            .collect(),
    };
    categories
        .into_iter()
        .map(|category| ListedCategory {
            category,
            plugins: config.plugins_in(category).to_vec(),
        })
        .collect()
}
