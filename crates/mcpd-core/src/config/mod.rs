//! Configuration documents and the components that edit them.
//!
//! Two TOML documents are managed:
//! - the project contract (`.mcpd.toml`): [`ProjectConfig`]
//! - the execution context (`secrets.dev.toml`): [`ExecutionContext`]

pub mod args;
pub mod context;
pub mod daemon;
pub mod keys;
pub mod loader;
pub mod parser;
pub mod paths;
pub mod plugins;
pub mod schema;
pub mod store;
pub mod value;

pub use context::{ExecutionContext, ServerContext};
pub use daemon::DaemonConfig;
pub use keys::{DAEMON_KEYS, KeySpec};
pub use loader::{FileLoader, Loader, PluginScope, ValidatingLoader, ValidationCheck};
pub use parser::{parse_toml_file, parse_toml_str, to_toml};
pub use plugins::{Category, Flow, MoveOptions, Placement, PluginCatalogue, PluginEntry};
pub use schema::{ProjectConfig, ServerEntry};
pub use store::{ConfigDocument, ConfigStore};
pub use value::{ConfigValue, Duration, ValueKind};
