//! Configuration schema for `.mcpd.toml`, the project contract.
//!
//! The contract declares:
//! - `[[servers]]`: MCP servers and the tools, env vars and args they require
//! - `[daemon]`: daemon settings addressed by dotted keys
//! - `[plugins]`: the categorised plugin pipeline

use std::collections::{BTreeMap, BTreeSet, HashSet};

use serde::{Deserialize, Serialize};

use super::daemon::DaemonConfig;
use super::plugins::{Category, PluginCatalogue, PluginEntry};
use crate::error::ConfigError;
use crate::types::OperationResult;

/// Root structure of `.mcpd.toml`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ProjectConfig {
    /// Declared MCP servers, in insertion order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub servers: Vec<ServerEntry>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub daemon: Option<DaemonConfig>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plugins: Option<PluginCatalogue>,
}

/// An MCP server declared in the contract
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ServerEntry {
    pub name: String,

    /// Package source, e.g. `uvx::mcp-server-time@latest`
    pub package: String,

    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub tools: BTreeSet<String>,

    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub required_env: BTreeSet<String>,

    /// Flag names in bare form, e.g. `--local-timezone`
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub required_args: BTreeSet<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<String>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub env: BTreeMap<String, String>,
}

impl ServerEntry {
    pub fn new(name: impl Into<String>, package: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            package: package.into(),
            ..Default::default()
        }
    }

    pub fn with_tools<I, S>(mut self, tools: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tools.extend(tools.into_iter().map(Into::into));
        self
    }

    pub fn with_required_env<I, S>(mut self, vars: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.required_env.extend(vars.into_iter().map(Into::into));
        self
    }

    pub fn with_required_args<I, S>(mut self, flags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.required_args.extend(flags.into_iter().map(Into::into));
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors = Vec::new();
        if let Err(err) = validate_server_name(&self.name) {
            errors.push(err);
        }
        if self.package.trim().is_empty() {
            errors.push(ConfigError::invalid(
                format!("server '{}'", self.name),
                "package must not be empty",
            ));
        }
        for flag in &self.required_args {
            if !flag.starts_with("--") || flag.contains('=') {
                errors.push(ConfigError::invalid(
                    format!("server '{}'", self.name),
                    format!("required arg '{}' must be a bare --flag", flag),
                ));
            }
        }
        ConfigError::collect(errors)
    }
}

/// Server names are `[A-Za-z0-9._-]+`.
pub fn validate_server_name(name: &str) -> Result<(), ConfigError> {
    if name.is_empty() {
        return Err(ConfigError::EmptyInput("server name".to_string()));
    }
    if !name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
    {
        return Err(ConfigError::invalid(
            "server name",
            format!("invalid server name '{}' (allowed: [A-Za-z0-9._-]+)", name),
        ));
    }
    Ok(())
}

impl ProjectConfig {
    /// Create a new empty configuration
    pub fn new() -> Self {
        Self::default()
    }

    pub fn server(&self, name: &str) -> Option<&ServerEntry> {
        self.servers.iter().find(|s| s.name == name)
    }

    pub fn server_names(&self) -> Vec<&str> {
        self.servers.iter().map(|s| s.name.as_str()).collect()
    }

    /// Insert a server at the end, or replace a same-named one in place.
    pub fn upsert_server(&mut self, entry: ServerEntry) -> Result<OperationResult, ConfigError> {
        entry.validate()?;
        match self.servers.iter_mut().find(|s| s.name == entry.name) {
            Some(existing) if *existing == entry => Ok(OperationResult::Noop),
            Some(existing) => {
                *existing = entry;
                Ok(OperationResult::Updated)
            }
            None => {
                self.servers.push(entry);
                Ok(OperationResult::Created)
            }
        }
    }

    pub fn delete_server(&mut self, name: &str) -> Result<OperationResult, ConfigError> {
        let index = self
            .servers
            .iter()
            .position(|s| s.name == name)
            .ok_or_else(|| ConfigError::not_found(format!("server '{}'", name)))?;
        self.servers.remove(index);
        Ok(OperationResult::Deleted)
    }

    pub fn daemon_mut(&mut self) -> &mut DaemonConfig {
        self.daemon.get_or_insert_with(Default::default)
    }

    pub fn plugins_mut(&mut self) -> &mut PluginCatalogue {
        self.plugins.get_or_insert_with(Default::default)
    }

    pub fn plugin(&self, category: Category, name: &str) -> Option<&PluginEntry> {
        self.plugins.as_ref()?.plugin(category, name)
    }

    pub fn plugins_in(&self, category: Category) -> &[PluginEntry] {
        self.plugins
            .as_ref()
            .map(|p| p.plugins(category))
            .unwrap_or_default()
    }

    pub fn upsert_plugin(
        &mut self,
        category: Category,
        entry: PluginEntry,
    ) -> Result<OperationResult, ConfigError> {
        self.plugins_mut().upsert(category, entry)
    }

    pub fn delete_plugin(
        &mut self,
        category: Category,
        name: &str,
    ) -> Result<OperationResult, ConfigError> {
        self.plugins_mut().delete(category, name)
    }

    /// Drop `[daemon]` and `[plugins]` when they hold nothing.
    pub fn prune(&mut self) {
        if let Some(daemon) = self.daemon.as_mut() {
            daemon.prune();
            if daemon.is_empty() {
                self.daemon = None;
            }
        }
        if self.plugins.as_ref().is_some_and(PluginCatalogue::is_empty) {
            self.plugins = None;
        }
    }

    /// Validate the whole contract, accumulating every failure.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors = Vec::new();

        let mut seen = HashSet::new();
        for server in &self.servers {
            if !seen.insert(server.name.as_str()) {
                errors.push(ConfigError::invalid(
                    "servers",
                    format!("duplicate server '{}'", server.name),
                ));
            }
            if let Err(err) = server.validate() {
                errors.extend(err.into_leaves());
            }
        }

        if let Some(daemon) = &self.daemon
            && let Err(err) = daemon.validate()
        {
            errors.extend(err.into_leaves());
        }

        if let Some(plugins) = &self.plugins
            && let Err(err) = plugins.validate()
        {
            errors.extend(err.into_leaves());
        }

        ConfigError::collect(errors)
    }
}
