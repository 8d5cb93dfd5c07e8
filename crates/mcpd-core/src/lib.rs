//! mcpd Core Library
//!
//! Domain logic for managing the mcpd project contract (`.mcpd.toml`), the
//! host-local execution context and the artefacts exported from them.

pub mod commands;
pub mod config;
pub mod error;
pub mod export;
pub mod types;

/// Re-exports of commonly used types
pub mod prelude {
    // Configuration
    pub use crate::config::{
        Category, ConfigStore, ConfigValue, DaemonConfig, ExecutionContext, Flow, MoveOptions,
        PluginCatalogue, PluginEntry, ProjectConfig, ServerContext, ServerEntry,
    };

    // Commands
    pub use crate::commands::{ConfigPaths, ServerCommand};

    // Export
    pub use crate::export::{ExportArtifacts, ExportFormat};

    pub use crate::error::ConfigError;
    pub use crate::types::OperationResult;
}
