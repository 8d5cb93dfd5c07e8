//! High-level commands for mcpd configuration.
//!
//! Each command loads a document, applies one component operation and saves
//! the result. These are the operations the CLI front-end calls.

pub mod args;
pub mod context;
pub mod daemon;
pub mod env;
pub mod export;
pub mod plugins;
pub mod server;
pub mod tools;

pub use args::{ArgsCommand, ArgsReport};
pub use context::ConfigPaths;
pub use daemon::{DaemonCommand, DaemonReport, KeyChange};
pub use env::{EnvCommand, EnvReport};
pub use export::{ExportCommand, ExportOptions, ExportReport};
pub use plugins::{
    AddOptions as PluginAddOptions, ListedCategory, MoveReport, PluginReport, PluginsCommand,
    SetOptions as PluginSetOptions, ValidateOptions as PluginValidateOptions, ValidationReport,
};
pub use server::{ServerCommand, ServerReport};
pub use tools::{ToolsCommand, ToolsReport};
