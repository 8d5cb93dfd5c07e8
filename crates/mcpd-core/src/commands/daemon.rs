//! `config daemon`: dotted-key access to the `[daemon]` section.

use anyhow::Context;
use serde::Serialize;
use tracing::info;

use super::context::ConfigPaths;
use crate::config::keys::{self, KeySpec};
use crate::config::loader::{FileLoader, Loader, ValidatingLoader, ValidationCheck};
use crate::config::value::ConfigValue;
use crate::error::ConfigError;
use crate::types::OperationResult;

/// Outcome for one key of a multi-key set or remove
#[derive(Debug, Clone, Serialize)]
pub struct KeyChange {
    pub key: String,
    pub result: OperationResult,
}

#[derive(Debug, Clone, Serialize)]
pub struct DaemonReport {
    pub changes: Vec<KeyChange>,
    /// Combined result across all keys
    pub result: OperationResult,
}

impl DaemonReport {
    fn from_changes(changes: Vec<KeyChange>) -> Self {
        let result = changes
            .iter()
            .map(|c| c.result)
            .fold(OperationResult::Noop, OperationResult::combine);
        Self { changes, result }
    }
}

/// Split `key=value`; the value may contain `=` but must not be blank.
///
/// Clearing a key goes through [`DaemonCommand::remove`].
fn parse_assignment(raw: &str) -> Result<(&str, &str), ConfigError> {
    let (key, value) = raw.split_once('=').ok_or_else(|| {
        ConfigError::invalid("daemon", format!("expected key=value, got '{}'", raw))
    })?;
    let key = key.trim();
    if key.is_empty() {
        return Err(ConfigError::invalid(
            "daemon",
            format!("missing key in '{}'", raw),
        ));
    }
    if value.trim().is_empty() {
        return Err(ConfigError::EmptyInput(format!(
            "value for '{}' (use `config daemon remove` to clear it)",
            key
        )));
    }
    Ok((key, value))
}

#[derive(Debug, Clone)]
pub struct DaemonCommand {
    paths: ConfigPaths,
}

impl DaemonCommand {
    pub fn new(paths: ConfigPaths) -> Self {
        Self { paths }
    }

    /// Apply `key=value` assignments as one change.
    ///
    /// The section must validate afterwards or nothing is written.
    pub fn set<S: AsRef<str>>(&self, assignments: &[S]) -> anyhow::Result<DaemonReport> {
        if assignments.is_empty() {
            return Err(ConfigError::EmptyInput("key=value assignments".to_string()).into());
        }
        let parsed = assignments
            .iter()
            .map(|a| parse_assignment(a.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;

        let report = self
            .paths
            .contract_store()
            .modify(|config| {
                let daemon = config.daemon_mut();
                let mut changes = Vec::with_capacity(parsed.len());
                for (key, value) in &parsed {
                    let result = daemon.set(key, value)?;
                    changes.push(KeyChange {
                        key: (*key).to_string(),
                        result,
                    });
                }
                daemon.validate()?;
                Ok(DaemonReport::from_changes(changes))
            })
            .context("Failed to set daemon configuration")?;

        info!(keys = report.changes.len(), result = %report.result, "daemon config set");
        Ok(report)
    }

    /// Value at `key`; an empty key or a section prefix returns a table.
    pub fn get(&self, key: &str) -> anyhow::Result<Option<ConfigValue>> {
        let config = self.paths.contract_store().load()?;
        let daemon = config.daemon.unwrap_or_default();
        Ok(daemon.get(key)?)
    }

    /// Every configured key with its value, in path order.
    pub fn list(&self) -> anyhow::Result<Vec<(String, ConfigValue)>> {
        Ok(self
            .get("")?
            .map(|tree| tree.flatten(""))
            .unwrap_or_default())
    }

    /// Every key the daemon accepts.
    pub fn available(&self) -> Vec<&'static KeySpec> {
        keys::available_keys()
    }

    /// Clear keys. Keys that are already unset report `Noop`.
    pub fn remove<S: AsRef<str>>(&self, keys: &[S]) -> anyhow::Result<DaemonReport> {
        if keys.is_empty() {
            return Err(ConfigError::EmptyInput("keys".to_string()).into());
        }

        let report = self
            .paths
            .contract_store()
            .modify(|config| {
                let daemon = config.daemon_mut();
                let mut changes = Vec::with_capacity(keys.len());
                for key in keys {
                    let key = key.as_ref().trim();
                    let result = daemon.remove(key)?;
                    changes.push(KeyChange {
                        key: key.to_string(),
                        result,
                    });
                }
                Ok(DaemonReport::from_changes(changes))
            })
            .context("Failed to remove daemon configuration")?;

        info!(keys = report.changes.len(), result = %report.result, "daemon config removed");
        Ok(report)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        ValidatingLoader::new(FileLoader)
            .with_check(ValidationCheck::Daemon)
            .load(self.paths.config_file())?;
        Ok(())
    }
}
