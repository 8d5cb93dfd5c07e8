//! Export engine.
//!
//! Joins the contract and an execution context into two artefacts that are
//! safe to share:
//! - a portable execution context whose values are `${PLACEHOLDER}`s
//! - an environment contract listing every placeholder with an empty value
//!
//! Placeholders have the form `MCPD__{SERVER}__{VAR}`.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use tracing::{debug, warn};

use crate::config::args::flag_name;
use crate::config::{ExecutionContext, ProjectConfig, ServerContext};
use crate::error::ConfigError;

const PLACEHOLDER_PREFIX: &str = "MCPD";

/// Output format of the environment contract.
///
/// Only `dotenv` renders today; the other formats are reserved names that
/// parse but fail with [`ConfigError::Unimplemented`] before anything is written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExportFormat {
    /// `KEY=` lines, one per placeholder
    #[default]
    Dotenv,
    /// Reserved: GitHub Actions secrets
    GitHubActions,
    /// Reserved: Kubernetes secret manifest
    Kubernetes,
}

impl ExportFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExportFormat::Dotenv => "dotenv",
            ExportFormat::GitHubActions => "github",
            ExportFormat::Kubernetes => "k8s",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExportFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "dotenv" => Ok(ExportFormat::Dotenv),
            "github" => Ok(ExportFormat::GitHubActions),
            "k8s" | "kubernetes" => Ok(ExportFormat::Kubernetes),
            other => Err(ConfigError::invalid(
                "format",
                format!("unknown export format '{}' (expected: dotenv, github, k8s)", other),
            )),
        }
    }
}

/// Normalise one placeholder segment: uppercase, `-` and `.` become `_`,
/// a leading `--` is dropped.
fn placeholder_segment(raw: &str) -> String {
    raw.trim_start_matches("--")
        .chars()
        .map(|c| match c {
            '-' | '.' => '_',
            c => c.to_ascii_uppercase(),
        })
        .collect()
}

/// `MCPD__{SERVER}__{VAR}` for a server and an env var or flag name.
pub fn placeholder(server: &str, var: &str) -> String {
    format!(
        "{}__{}__{}",
        PLACEHOLDER_PREFIX,
        placeholder_segment(server),
        placeholder_segment(var)
    )
}

/// The two exported artefacts.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ExportArtifacts {
    /// Execution context with every value replaced by a placeholder reference
    pub context: ExecutionContext,
    /// Placeholder → value (always empty)
    pub contract: BTreeMap<String, String>,
}

impl ExportArtifacts {
    /// Render the environment contract in `format`.
    pub fn render_contract(&self, format: ExportFormat) -> Result<String, ConfigError> {
        match format {
            ExportFormat::Dotenv => Ok(render_dotenv(&self.contract)),
            other => Err(ConfigError::Unimplemented(format!(
                "export format '{}'",
                other
            ))),
        }
    }
}

/// Build the portable context and environment contract.
///
/// Servers are processed in contract order. Only values the contract
/// declares (`required_env`, `required_args`) are exported; anything else in
/// the local context is dropped.
pub fn export(
    contract: &ProjectConfig,
    context: &ExecutionContext,
) -> Result<ExportArtifacts, ConfigError> {
    if contract.servers.is_empty() {
        return Err(ConfigError::EmptyContract);
    }

    let mut artifacts = ExportArtifacts::default();

    for server in &contract.servers {
        let mut portable = ServerContext::default();

        for var in &server.required_env {
            let key = placeholder(&server.name, var);
            portable.env.insert(var.clone(), format!("${{{}}}", key));
            artifacts.contract.insert(key, String::new());
        }

        for flag in &server.required_args {
            let key = placeholder(&server.name, flag);
            portable.args.push(format!("{}=${{{}}}", flag, key));
            artifacts.contract.insert(key, String::new());
        }

        if let Some(local) = context.server(&server.name) {
            log_dropped(&server.name, local, &server.required_env, &server.required_args);
        }

        debug!(
            server = %server.name,
            env = portable.env.len(),
            args = portable.args.len(),
            "exported server"
        );
        if !portable.is_empty() {
            artifacts.context.servers.insert(server.name.clone(), portable);
        }
    }

    Ok(artifacts)
}

fn log_dropped(
    server: &str,
    local: &ServerContext,
    required_env: &BTreeSet<String>,
    required_args: &BTreeSet<String>,
) {
    for var in local.env.keys().filter(|v| !required_env.contains(*v)) {
        warn!(server, var = %var, "dropping undeclared env var from export");
    }
    for arg in &local.args {
        let declared = flag_name(arg).is_some_and(|name| required_args.contains(name));
        if !declared {
            warn!(server, arg = %arg, "dropping undeclared argument from export");
        }
    }
}

/// `KEY=VALUE` lines in key order, with newlines in values escaped.
pub fn render_dotenv(values: &BTreeMap<String, String>) -> String {
    let mut out = String::new();
    for (key, value) in values {
        out.push_str(key);
        out.push('=');
        out.push_str(&value.replace('\r', "").replace('\n', "\\n"));
        out.push('\n');
    }
    out
}
