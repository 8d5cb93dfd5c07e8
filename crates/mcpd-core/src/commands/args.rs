//! `config args`: runtime arguments of a server in the execution context.

use anyhow::Context;
use serde::Serialize;
use tracing::info;

use super::context::ConfigPaths;
use crate::config::args::{Normalizer, remove_matching_flags, upsert_flags};
use crate::error::ConfigError;
use crate::types::OperationResult;

/// Result of an args mutation
#[derive(Debug, Clone, Serialize)]
pub struct ArgsReport {
    pub server: String,
    /// Arguments after the operation
    pub args: Vec<String>,
    pub result: OperationResult,
}

#[derive(Debug, Clone)]
pub struct ArgsCommand {
    paths: ConfigPaths,
    normalizer: Normalizer,
}

impl ArgsCommand {
    pub fn new(paths: ConfigPaths) -> Self {
        Self {
            paths,
            normalizer: Normalizer::new(),
        }
    }

    /// Flags that never take a value when normalising input.
    pub fn with_bool_flags<I, S>(mut self, flags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.normalizer = self.normalizer.with_bool_flags(flags);
        self
    }

    /// Set arguments, replacing existing values of the same flags.
    pub fn set<S: AsRef<str>>(&self, server: &str, tokens: &[S]) -> anyhow::Result<ArgsReport> {
        let incoming = self.normalizer.normalize(tokens);
        if incoming.is_empty() {
            return Err(ConfigError::EmptyInput("arguments".to_string()).into());
        }

        let store = self.paths.context_store();
        let report = store
            .modify(|context| {
                let mut entry = context.server(server).cloned().unwrap_or_default();
                entry.args = upsert_flags(&entry.args, &incoming);
                let args = entry.args.clone();
                let result = context.upsert(server, entry)?;
                Ok(ArgsReport {
                    server: server.to_string(),
                    args,
                    result,
                })
            })
            .with_context(|| format!("Failed to set args for server '{}'", server))?;

        info!(server, result = %report.result, "args set");
        Ok(report)
    }

    /// Remove every argument matching one of `names` (flag names or exact tokens).
    pub fn remove<S: AsRef<str>>(&self, server: &str, names: &[S]) -> anyhow::Result<ArgsReport> {
        if names.iter().all(|n| n.as_ref().trim().is_empty()) {
            return Err(ConfigError::EmptyInput("argument names".to_string()).into());
        }

        let store = self.paths.context_store();
        let report = store
            .modify(|context| {
                let mut entry = context.server(server).cloned().ok_or_else(|| {
                    ConfigError::not_found(format!("server '{}' in execution context", server))
                })?;
                entry.args = remove_matching_flags(&entry.args, names);
                let args = entry.args.clone();
                let result = context.upsert(server, entry)?;
                Ok(ArgsReport {
                    server: server.to_string(),
                    args,
                    result,
                })
            })
            .with_context(|| format!("Failed to remove args for server '{}'", server))?;

        info!(server, result = %report.result, "args removed");
        Ok(report)
    }

    pub fn list(&self, server: &str) -> anyhow::Result<Vec<String>> {
        let context = self.paths.context_store().load()?;
        context
            .server(server)
            .map(|entry| entry.args.clone())
            .ok_or_else(|| {
                ConfigError::not_found(format!("server '{}' in execution context", server)).into()
            })
    }

    /// Remove every argument; refuses without `force`.
    pub fn clear(&self, server: &str, force: bool) -> anyhow::Result<ArgsReport> {
        if !force {
            return Err(ConfigError::Conflict(format!(
                "refusing to clear all args for server '{}' without --force",
                server
            ))
            .into());
        }

        let store = self.paths.context_store();
        let report = store
            .modify(|context| {
                let mut entry = context.server(server).cloned().ok_or_else(|| {
                    ConfigError::not_found(format!("server '{}' in execution context", server))
                })?;
                let result = if entry.args.is_empty() {
                    OperationResult::Noop
                } else {
                    entry.args.clear();
                    context.upsert(server, entry)?;
                    OperationResult::Deleted
                };
                Ok(ArgsReport {
                    server: server.to_string(),
                    args: Vec::new(),
                    result,
                })
            })
            .with_context(|| format!("Failed to clear args for server '{}'", server))?;

        info!(server, result = %report.result, "args cleared");
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn command(temp: &TempDir) -> ArgsCommand {
        ArgsCommand::new(ConfigPaths::new(
            temp.path().join(".mcpd.toml"),
            temp.path().join("secrets.dev.toml"),
        ))
    }

    #[test]
    fn set_collapses_split_flags() {
        let temp = TempDir::new().unwrap();
        let report = command(&temp)
            .set("time", &["--local-timezone", "Europe/London"])
            .unwrap();
        assert_eq!(report.args, vec!["--local-timezone=Europe/London"]);
        assert_eq!(report.result, OperationResult::Created);
    }

    #[test]
    fn set_overrides_same_flag() {
        let temp = TempDir::new().unwrap();
        let cmd = command(&temp);
        cmd.set("time", &["--tz=UTC", "--verbose"]).unwrap();
        let report = cmd.set("time", &["--tz=GMT"]).unwrap();
        assert_eq!(report.args, vec!["--tz=GMT", "--verbose"]);
        assert_eq!(report.result, OperationResult::Updated);
    }

    #[test]
    fn bool_flag_keeps_positional_apart() {
        let temp = TempDir::new().unwrap();
        let report = command(&temp)
            .with_bool_flags(["--verbose"])
            .set("time", &["--verbose", "extra"])
            .unwrap();
        assert_eq!(report.args, vec!["--verbose", "extra"]);
    }

    #[test]
    fn set_rejects_empty_input() {
        let temp = TempDir::new().unwrap();
        let err = command(&temp).set::<&str>("time", &[]).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ConfigError>(),
            Some(ConfigError::EmptyInput(_))
        ));
    }

    #[test]
    fn clear_requires_force() {
        let temp = TempDir::new().unwrap();
        let cmd = command(&temp);
        cmd.set("time", &["--tz=UTC"]).unwrap();

        assert!(cmd.clear("time", false).is_err());
        assert_eq!(cmd.list("time").unwrap(), vec!["--tz=UTC"]);

        let report = cmd.clear("time", true).unwrap();
        assert_eq!(report.result, OperationResult::Deleted);
        assert!(cmd.list("time").is_err());
    }
}
