//! `config tools`: the tools a contract server exposes.

use std::collections::BTreeSet;

use anyhow::Context;
use serde::Serialize;
use tracing::info;

use super::context::ConfigPaths;
use crate::error::ConfigError;
use crate::types::OperationResult;

#[derive(Debug, Clone, Serialize)]
pub struct ToolsReport {
    pub server: String,
    pub tools: BTreeSet<String>,
    pub result: OperationResult,
}

#[derive(Debug, Clone)]
pub struct ToolsCommand {
    paths: ConfigPaths,
}

impl ToolsCommand {
    pub fn new(paths: ConfigPaths) -> Self {
        Self { paths }
    }

    /// Add tools to a server declared in the contract.
    pub fn set<S: AsRef<str>>(&self, server: &str, tools: &[S]) -> anyhow::Result<ToolsReport> {
        self.update(server, tools, |set, tool| {
            set.insert(tool);
        })
        .with_context(|| format!("Failed to set tools for server '{}'", server))
    }

    pub fn remove<S: AsRef<str>>(&self, server: &str, tools: &[S]) -> anyhow::Result<ToolsReport> {
        self.update(server, tools, |set, tool| {
            set.remove(&tool);
        })
        .with_context(|| format!("Failed to remove tools for server '{}'", server))
    }

    pub fn list(&self, server: &str) -> anyhow::Result<BTreeSet<String>> {
        let config = self.paths.contract_store().load()?;
        config
            .server(server)
            .map(|entry| entry.tools.clone())
            .ok_or_else(|| ConfigError::not_found(format!("server '{}'", server)).into())
    }

    fn update<S, F>(&self, server: &str, tools: &[S], apply: F) -> anyhow::Result<ToolsReport>
    where
        S: AsRef<str>,
        F: Fn(&mut BTreeSet<String>, String),
    {
        let tools: Vec<String> = tools
            .iter()
            .map(|t| t.as_ref().trim().to_string())
            .filter(|t| !t.is_empty())
            .collect();
        if tools.is_empty() {
            return Err(ConfigError::EmptyInput("tool names".to_string()).into());
        }

        let report = self.paths.contract_store().modify(|config| {
            let mut entry = config
                .server(server)
                .cloned()
                .ok_or_else(|| ConfigError::not_found(format!("server '{}'", server)))?;
            for tool in tools {
                apply(&mut entry.tools, tool);
            }
            let tools = entry.tools.clone();
            let result = config.upsert_server(entry)?;
            Ok(ToolsReport {
                server: server.to_string(),
                tools,
                result,
            })
        })?;

        info!(server, result = %report.result, "tools updated");
        Ok(report)
    }
}
