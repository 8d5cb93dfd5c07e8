//! `config export`: write the portable context and environment contract.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::Serialize;
use tracing::{info, warn};

use super::context::ConfigPaths;
use crate::config::ExecutionContext;
use crate::config::loader::{FileLoader, Loader};
use crate::config::paths::same_file;
use crate::config::store::{ConfigStore, write_atomic};
use crate::error::ConfigError;
use crate::export::{ExportFormat, export};

pub const DEFAULT_CONTEXT_OUTPUT: &str = "portable-execution-context.toml";
pub const DEFAULT_CONTRACT_OUTPUT: &str = ".env";

#[derive(Debug, Clone)]
pub struct ExportOptions {
    /// Where the portable execution context is written
    pub context_output: PathBuf,
    /// Where the environment contract is written
    pub contract_output: PathBuf,
    pub format: ExportFormat,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            context_output: PathBuf::from(DEFAULT_CONTEXT_OUTPUT),
            contract_output: PathBuf::from(DEFAULT_CONTRACT_OUTPUT),
            format: ExportFormat::Dotenv,
        }
    }
}

impl ExportOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_context_output(mut self, path: impl Into<PathBuf>) -> Self {
        self.context_output = path.into();
        self
    }

    pub fn with_contract_output(mut self, path: impl Into<PathBuf>) -> Self {
        self.contract_output = path.into();
        self
    }

    pub fn with_format(mut self, format: ExportFormat) -> Self {
        self.format = format;
        self
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ExportReport {
    pub context_output: PathBuf,
    pub contract_output: PathBuf,
    pub servers: usize,
    pub placeholders: usize,
}

#[derive(Debug, Clone)]
pub struct ExportCommand {
    paths: ConfigPaths,
}

impl ExportCommand {
    pub fn new(paths: ConfigPaths) -> Self {
        Self { paths }
    }

    /// Export both artefacts. Nothing is written unless every check passes.
    pub fn run(&self, options: &ExportOptions) -> anyhow::Result<ExportReport> {
        for output in [&options.context_output, &options.contract_output] {
            if same_file(output, self.paths.runtime_file()) {
                return Err(ConfigError::Conflict(format!(
                    "export output '{}' would overwrite the execution context it reads from",
                    output.display()
                ))
                .into());
            }
        }
        if same_file(&options.context_output, &options.contract_output) {
            return Err(ConfigError::Conflict(
                "context and contract outputs must be different files".to_string(),
            )
            .into());
        }

        let contract = FileLoader.load(self.paths.config_file())?;
        let context = self.paths.context_store().load()?;
        let artifacts = export(&contract, &context)?;
        let rendered = artifacts.render_contract(options.format)?;

        let previous_context = fs::read(&options.context_output).ok();
        ConfigStore::<ExecutionContext>::new(&options.context_output)
            .save(&artifacts.context)
            .with_context(|| {
                format!(
                    "Failed to write portable context: {}",
                    options.context_output.display()
                )
            })?;

        if let Err(err) = write_contract(&options.contract_output, &rendered) {
            restore(&options.context_output, previous_context.as_deref());
            return Err(err);
        }

        info!(
            servers = contract.servers.len(),
            placeholders = artifacts.contract.len(),
            "exported configuration"
        );
        Ok(ExportReport {
            context_output: options.context_output.clone(),
            contract_output: options.contract_output.clone(),
            servers: contract.servers.len(),
            placeholders: artifacts.contract.len(),
        })
    }
}

fn write_contract(path: &Path, rendered: &str) -> anyhow::Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }
    write_atomic(path, rendered.as_bytes())
        .with_context(|| format!("Failed to write environment contract: {}", path.display()))
}

/// Put the portable context back as it was before this export.
fn restore(path: &Path, previous: Option<&[u8]>) {
    let outcome = match previous {
        Some(bytes) => write_atomic(path, bytes),
        None => fs::remove_file(path).map_err(anyhow::Error::from),
    };
    if let Err(err) = outcome {
        warn!(path = %path.display(), error = %err, "failed to roll back portable context");
    }
}
