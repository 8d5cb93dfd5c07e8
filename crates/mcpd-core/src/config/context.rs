//! The execution context: host-local runtime values per server.
//!
//! Lives outside the project (by default `~/.config/mcpd/secrets.dev.toml`)
//! because it carries resolved, often secret, arguments and environment.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::schema::validate_server_name;
use crate::error::ConfigError;
use crate::types::OperationResult;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ExecutionContext {
    #[serde(default)]
    pub servers: BTreeMap<String, ServerContext>,
}

/// Runtime values for one server
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ServerContext {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<String>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub env: BTreeMap<String, String>,
}

impl ServerContext {
    pub fn is_empty(&self) -> bool {
        self.args.is_empty() && self.env.is_empty()
    }
}

impl ExecutionContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn server(&self, name: &str) -> Option<&ServerContext> {
        self.servers.get(name)
    }

    /// Store `context` for `name`.
    ///
    /// An empty context removes the server entry, so clearing both args and
    /// env leaves no residue in the file.
    pub fn upsert(
        &mut self,
        name: &str,
        context: ServerContext,
    ) -> Result<OperationResult, ConfigError> {
        validate_server_name(name)?;

        if context.is_empty() {
            return Ok(match self.servers.remove(name) {
                Some(_) => OperationResult::Deleted,
                None => OperationResult::Noop,
            });
        }

        let result = OperationResult::from_change(self.servers.get(name), Some(&context));
        if result.is_change() {
            self.servers.insert(name.to_string(), context);
        }
        Ok(result)
    }

    pub fn delete(&mut self, name: &str) -> Result<OperationResult, ConfigError> {
        self.servers
            .remove(name)
            .map(|_| OperationResult::Deleted)
            .ok_or_else(|| {
                ConfigError::not_found(format!("server '{}' in execution context", name))
            })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let errors: Vec<ConfigError> = self
            .servers
            .keys()
            .filter_map(|name| validate_server_name(name).err())
            .collect();
        ConfigError::collect(errors)
    }
}
