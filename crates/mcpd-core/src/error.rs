//! Domain errors raised by configuration operations.
//!
//! Component layers return [`ConfigError`] so callers can inspect the failure
//! kind; the store and command layers wrap these in `anyhow` with context.

use std::path::PathBuf;

use thiserror::Error;

/// Errors arising from configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The primary target of an operation does not exist.
    #[error("{what} not found")]
    NotFound {
        /// Human-readable description of the missing target.
        what: String,
    },

    /// An entry with the same identity already exists.
    #[error("{what} already exists")]
    AlreadyExists { what: String },

    /// The operation would clobber existing state without `force`.
    #[error("{0}")]
    Conflict(String),

    /// The dotted path is not a recognised configuration key.
    #[error("unknown configuration key: '{0}'")]
    UnknownKey(String),

    /// A value failed to parse or failed validation.
    #[error("{key}: {reason}")]
    InvalidValue {
        /// Path or field the value was destined for.
        key: String,
        /// Why the value was rejected.
        reason: String,
    },

    /// A required argument was not supplied.
    #[error("missing required argument: {0}")]
    MissingArgument(String),

    /// An input list that must contain something was empty.
    #[error("{0} must not be empty")]
    EmptyInput(String),

    /// Underlying filesystem failure.
    #[error("I/O error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Several validation failures gathered from one pass.
    #[error("{}", format_composite(.0))]
    Composite(Vec<ConfigError>),

    /// The contract declares no servers, so there is nothing to export.
    #[error("no servers declared in the project configuration, nothing to export")]
    EmptyContract,

    /// The requested behaviour is recognised but not available.
    #[error("{0} is not implemented")]
    Unimplemented(String),
}

impl ConfigError {
    pub fn not_found(what: impl Into<String>) -> Self {
        ConfigError::NotFound { what: what.into() }
    }

    pub fn already_exists(what: impl Into<String>) -> Self {
        ConfigError::AlreadyExists { what: what.into() }
    }

    pub fn invalid(key: impl Into<String>, reason: impl Into<String>) -> Self {
        ConfigError::InvalidValue {
            key: key.into(),
            reason: reason.into(),
        }
    }

    /// Collapse accumulated errors: none → `Ok`, otherwise one composite.
    pub fn collect(errors: Vec<ConfigError>) -> Result<(), ConfigError> {
        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Composite(errors))
        }
    }

    /// Flatten nested composites into their leaf errors.
    pub fn into_leaves(self) -> Vec<ConfigError> {
        match self {
            ConfigError::Composite(errors) => {
                errors.into_iter().flat_map(ConfigError::into_leaves).collect()
            }
            other => vec![other],
        }
    }
}

fn format_composite(errors: &[ConfigError]) -> String {
    let mut out = format!("{} validation error(s):", errors.len());
    for error in errors {
        out.push_str("\n  - ");
        out.push_str(&error.to_string());
    }
    out
}
