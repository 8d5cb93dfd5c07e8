//! `config env`: runtime environment variables of a server.

use std::collections::BTreeMap;

use anyhow::Context;
use serde::Serialize;
use tracing::info;

use super::context::ConfigPaths;
use crate::error::ConfigError;
use crate::types::OperationResult;

#[derive(Debug, Clone, Serialize)]
pub struct EnvReport {
    pub server: String,
    pub env: BTreeMap<String, String>,
    pub result: OperationResult,
}

/// Parse `KEY=VALUE`; the value may be empty or contain `=`.
fn parse_pair(raw: &str) -> Result<(String, String), ConfigError> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| ConfigError::invalid("env", format!("expected KEY=VALUE, got '{}'", raw)))?;
    let key = key.trim();
    if key.is_empty() || key.chars().any(char::is_whitespace) {
        return Err(ConfigError::invalid(
            "env",
            format!("invalid variable name in '{}'", raw),
        ));
    }
    Ok((key.to_string(), value.to_string()))
}

#[derive(Debug, Clone)]
pub struct EnvCommand {
    paths: ConfigPaths,
}

impl EnvCommand {
    pub fn new(paths: ConfigPaths) -> Self {
        Self { paths }
    }

    /// Set variables from `KEY=VALUE` pairs; existing keys are overwritten.
    pub fn set<S: AsRef<str>>(&self, server: &str, pairs: &[S]) -> anyhow::Result<EnvReport> {
        if pairs.is_empty() {
            return Err(ConfigError::EmptyInput("environment variables".to_string()).into());
        }
        let parsed = pairs
            .iter()
            .map(|p| parse_pair(p.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;

        let report = self
            .paths
            .context_store()
            .modify(|context| {
                let mut entry = context.server(server).cloned().unwrap_or_default();
                entry.env.extend(parsed);
                let env = entry.env.clone();
                let result = context.upsert(server, entry)?;
                Ok(EnvReport {
                    server: server.to_string(),
                    env,
                    result,
                })
            })
            .with_context(|| format!("Failed to set env for server '{}'", server))?;

        info!(server, result = %report.result, "env set");
        Ok(report)
    }

    pub fn remove<S: AsRef<str>>(&self, server: &str, keys: &[S]) -> anyhow::Result<EnvReport> {
        if keys.is_empty() {
            return Err(ConfigError::EmptyInput("variable names".to_string()).into());
        }

        let report = self
            .paths
            .context_store()
            .modify(|context| {
                let mut entry = context.server(server).cloned().ok_or_else(|| {
                    ConfigError::not_found(format!("server '{}' in execution context", server))
                })?;
                for key in keys {
                    entry.env.remove(key.as_ref().trim());
                }
                let env = entry.env.clone();
                let result = context.upsert(server, entry)?;
                Ok(EnvReport {
                    server: server.to_string(),
                    env,
                    result,
                })
            })
            .with_context(|| format!("Failed to remove env for server '{}'", server))?;

        info!(server, result = %report.result, "env removed");
        Ok(report)
    }

    pub fn list(&self, server: &str) -> anyhow::Result<BTreeMap<String, String>> {
        let context = self.paths.context_store().load()?;
        context
            .server(server)
            .map(|entry| entry.env.clone())
            .ok_or_else(|| {
                ConfigError::not_found(format!("server '{}' in execution context", server)).into()
            })
    }

    pub fn clear(&self, server: &str, force: bool) -> anyhow::Result<EnvReport> {
        if !force {
            return Err(ConfigError::Conflict(format!(
                "refusing to clear all env vars for server '{}' without --force",
                server
            ))
            .into());
        }

        let report = self
            .paths
            .context_store()
            .modify(|context| {
                let mut entry = context.server(server).cloned().ok_or_else(|| {
                    ConfigError::not_found(format!("server '{}' in execution context", server))
                })?;
                let result = if entry.env.is_empty() {
                    OperationResult::Noop
                } else {
                    entry.env.clear();
                    context.upsert(server, entry)?;
                    OperationResult::Deleted
                };
                Ok(EnvReport {
                    server: server.to_string(),
                    env: BTreeMap::new(),
                    result,
                })
            })
            .with_context(|| format!("Failed to clear env for server '{}'", server))?;

        info!(server, result = %report.result, "env cleared");
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn command(temp: &TempDir) -> EnvCommand {
        EnvCommand::new(ConfigPaths::new(
            temp.path().join(".mcpd.toml"),
            temp.path().join("secrets.dev.toml"),
        ))
    }

    #[test]
    fn parse_pair_keeps_equals_in_value() {
        assert_eq!(
            parse_pair("URL=a=b").unwrap(),
            ("URL".to_string(), "a=b".to_string())
        );
        assert!(parse_pair("NOVALUE").is_err());
        assert!(parse_pair("=x").is_err());
    }

    #[test]
    fn set_then_remove_last_var_deletes_server() {
        let temp = TempDir::new().unwrap();
        let cmd = command(&temp);

        let report = cmd.set("time", &["TZ=Europe/London"]).unwrap();
        assert_eq!(report.result, OperationResult::Created);
        let report = cmd.set("time", &["TZ=Europe/London"]).unwrap();
        assert_eq!(report.result, OperationResult::Noop);

        let report = cmd.remove("time", &["TZ"]).unwrap();
        assert_eq!(report.result, OperationResult::Deleted);
        assert!(cmd.list("time").is_err());
    }

    #[test]
    fn remove_from_unknown_server_is_not_found() {
        let temp = TempDir::new().unwrap();
        let err = command(&temp).remove("ghost", &["TZ"]).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ConfigError>(),
            Some(ConfigError::NotFound { .. })
        ));
    }
}
