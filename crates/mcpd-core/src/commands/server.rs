//! Server-level operations on the contract.

use anyhow::Context;
use serde::Serialize;
use tracing::info;

use super::context::ConfigPaths;
use crate::types::OperationResult;

#[derive(Debug, Clone, Serialize)]
pub struct ServerReport {
    pub server: String,
    pub result: OperationResult,
}

#[derive(Debug, Clone)]
pub struct ServerCommand {
    paths: ConfigPaths,
}

impl ServerCommand {
    pub fn new(paths: ConfigPaths) -> Self {
        Self { paths }
    }

    /// Remove a server from the contract. The execution context is left alone.
    pub fn remove(&self, name: &str) -> anyhow::Result<ServerReport> {
        let result = self
            .paths
            .contract_store()
            .modify(|config| Ok(config.delete_server(name)?))
            .with_context(|| format!("Failed to remove server '{}'", name))?;

        info!(server = name, "removed server from contract");
        Ok(ServerReport {
            server: name.to_string(),
            result,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ProjectConfig, ServerEntry};
    use crate::error::ConfigError;
    use tempfile::TempDir;

    #[test]
    fn remove_server() {
        let temp = TempDir::new().unwrap();
        let paths = ConfigPaths::new(temp.path().join(".mcpd.toml"), temp.path().join("rt.toml"));
        let mut config = ProjectConfig::new();
        config
            .upsert_server(ServerEntry::new("time", "uvx::time@latest"))
            .unwrap();
        paths.contract_store().save(&config).unwrap();

        let cmd = ServerCommand::new(paths.clone());
        assert_eq!(cmd.remove("time").unwrap().result, OperationResult::Deleted);
        assert!(paths.contract_store().load().unwrap().servers.is_empty());

        let err = cmd.remove("time").unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ConfigError>(),
            Some(ConfigError::NotFound { .. })
        ));
    }
}
