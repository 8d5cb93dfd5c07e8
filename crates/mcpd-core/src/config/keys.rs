//! Registry of the dotted keys accepted under `[daemon]`.
//!
//! Each key is declared exactly once in [`DAEMON_KEYS`] with its type, a
//! description and the accessor pair that reads and writes it. `set`, `get`,
//! `remove`, `list --available` and validation all go through this table.

use std::collections::BTreeMap;

use serde::Serialize;

use super::daemon::DaemonConfig;
use super::value::{ConfigValue, Duration, ValueKind};
use crate::error::ConfigError;

/// Declaration of a single daemon configuration key.
#[derive(Serialize)]
pub struct KeySpec {
    /// Dotted path relative to `[daemon]`, e.g. `api.cors.enable`.
    pub path: &'static str,
    /// Type the raw string is parsed into.
    pub kind: ValueKind,
    /// One-line description shown by `config daemon list --available`.
    pub description: &'static str,
    #[serde(skip)]
    pub get: fn(&DaemonConfig) -> Option<ConfigValue>,
    #[serde(skip)]
    pub set: fn(&mut DaemonConfig, Option<ConfigValue>),
}

impl std::fmt::Debug for KeySpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeySpec")
            .field("path", &self.path)
            .field("kind", &self.kind)
            .finish()
    }
}

fn string(value: Option<&String>) -> Option<ConfigValue> {
    value.cloned().map(ConfigValue::String)
}

fn boolean(value: Option<bool>) -> Option<ConfigValue> {
    value.map(ConfigValue::Bool)
}

fn duration(value: Option<Duration>) -> Option<ConfigValue> {
    value.map(ConfigValue::Duration)
}

fn list(items: Option<&Vec<String>>) -> Option<ConfigValue> {
    items
        .filter(|items| !items.is_empty())
        .cloned()
        .map(ConfigValue::List)
}

pub static DAEMON_KEYS: &[KeySpec] = &[
    KeySpec {
        path: "api.addr",
        kind: ValueKind::String,
        description: "Address the daemon API listens on (host:port)",
        get: |d| string(d.api.as_ref()?.addr.as_ref()),
        set: |d, v| d.api_mut().addr = v.and_then(ConfigValue::into_string),
    },
    KeySpec {
        path: "api.timeout.shutdown",
        kind: ValueKind::Duration,
        description: "Maximum time to wait for the API server to shut down",
        get: |d| duration(d.api.as_ref()?.timeout.as_ref()?.shutdown),
        set: |d, v| d.api_mut().timeout_mut().shutdown = v.and_then(ConfigValue::into_duration),
    },
    KeySpec {
        path: "api.cors.enable",
        kind: ValueKind::Bool,
        description: "Enable CORS handling on the API",
        get: |d| boolean(d.api.as_ref()?.cors.as_ref()?.enable),
        set: |d, v| d.api_mut().cors_mut().enable = v.and_then(ConfigValue::into_bool),
    },
    KeySpec {
        path: "api.cors.allow_origins",
        kind: ValueKind::StringList,
        description: "Origins allowed to make cross-origin requests",
        get: |d| list(d.api.as_ref()?.cors.as_ref().map(|c| &c.allow_origins)),
        set: |d, v| {
            d.api_mut().cors_mut().allow_origins = v.map(ConfigValue::into_list).unwrap_or_default()
        },
    },
    KeySpec {
        path: "api.cors.methods",
        kind: ValueKind::StringList,
        description: "HTTP methods allowed for cross-origin requests",
        get: |d| list(d.api.as_ref()?.cors.as_ref().map(|c| &c.methods)),
        set: |d, v| {
            d.api_mut().cors_mut().methods = v.map(ConfigValue::into_list).unwrap_or_default()
        },
    },
    KeySpec {
        path: "api.cors.allow_headers",
        kind: ValueKind::StringList,
        description: "Request headers allowed for cross-origin requests",
        get: |d| list(d.api.as_ref()?.cors.as_ref().map(|c| &c.allow_headers)),
        set: |d, v| {
            d.api_mut().cors_mut().allow_headers = v.map(ConfigValue::into_list).unwrap_or_default()
        },
    },
    KeySpec {
        path: "api.cors.expose_headers",
        kind: ValueKind::StringList,
        description: "Response headers exposed to cross-origin callers",
        get: |d| list(d.api.as_ref()?.cors.as_ref().map(|c| &c.expose_headers)),
        set: |d, v| {
            d.api_mut().cors_mut().expose_headers =
                v.map(ConfigValue::into_list).unwrap_or_default()
        },
    },
    KeySpec {
        path: "api.cors.allow_credentials",
        kind: ValueKind::Bool,
        description: "Allow credentials on cross-origin requests",
        get: |d| boolean(d.api.as_ref()?.cors.as_ref()?.allow_credentials),
        set: |d, v| d.api_mut().cors_mut().allow_credentials = v.and_then(ConfigValue::into_bool),
    },
    KeySpec {
        path: "api.cors.max_age",
        kind: ValueKind::Duration,
        description: "How long browsers may cache preflight responses",
        get: |d| duration(d.api.as_ref()?.cors.as_ref()?.max_age),
        set: |d, v| d.api_mut().cors_mut().max_age = v.and_then(ConfigValue::into_duration),
    },
    KeySpec {
        path: "mcp.timeout.shutdown",
        kind: ValueKind::Duration,
        description: "Maximum time to wait for MCP servers to shut down",
        get: |d| duration(d.mcp.as_ref()?.timeout.as_ref()?.shutdown),
        set: |d, v| d.mcp_mut().timeout_mut().shutdown = v.and_then(ConfigValue::into_duration),
    },
    KeySpec {
        path: "mcp.timeout.init",
        kind: ValueKind::Duration,
        description: "Maximum time to wait for an MCP server to initialize",
        get: |d| duration(d.mcp.as_ref()?.timeout.as_ref()?.init),
        set: |d, v| d.mcp_mut().timeout_mut().init = v.and_then(ConfigValue::into_duration),
    },
    KeySpec {
        path: "mcp.timeout.health",
        kind: ValueKind::Duration,
        description: "Timeout for a single MCP server health check",
        get: |d| duration(d.mcp.as_ref()?.timeout.as_ref()?.health),
        set: |d, v| d.mcp_mut().timeout_mut().health = v.and_then(ConfigValue::into_duration),
    },
    KeySpec {
        path: "mcp.interval.health",
        kind: ValueKind::Duration,
        description: "Interval between MCP server health checks",
        get: |d| duration(d.mcp.as_ref()?.interval.as_ref()?.health),
        set: |d, v| d.mcp_mut().interval_mut().health = v.and_then(ConfigValue::into_duration),
    },
];

/// All registered keys, sorted by path.
pub fn available_keys() -> Vec<&'static KeySpec> {
    let mut keys: Vec<&'static KeySpec> = DAEMON_KEYS.iter().collect();
    keys.sort_by(|a, b| a.path.cmp(b.path));
    keys
}

pub fn find(path: &str) -> Option<&'static KeySpec> {
    DAEMON_KEYS.iter().find(|spec| spec.path == path)
}

/// Look up a leaf key, failing with `UnknownKey`.
pub fn lookup(path: &str) -> Result<&'static KeySpec, ConfigError> {
    let path = path.trim();
    find(path).ok_or_else(|| ConfigError::UnknownKey(path.to_string()))
}

/// Build the table of values set beneath `prefix` (everything when empty).
///
/// Returns `Ok(None)` when the prefix is known but nothing beneath it is
/// configured, and `UnknownKey` when no registered key lives under it.
pub fn subtree(daemon: &DaemonConfig, prefix: &str) -> Result<Option<ConfigValue>, ConfigError> {
    let matching: Vec<(&str, &KeySpec)> = DAEMON_KEYS
        .iter()
        .filter_map(|spec| {
            if prefix.is_empty() {
                Some((spec.path, spec))
            } else {
                spec.path
                    .strip_prefix(prefix)
                    .and_then(|rest| rest.strip_prefix('.'))
                    .map(|rest| (rest, spec))
            }
        })
        .collect();

    if matching.is_empty() {
        return Err(ConfigError::UnknownKey(prefix.to_string()));
    }

    let mut root = BTreeMap::new();
    for (relative, spec) in matching {
        if let Some(value) = (spec.get)(daemon) {
            let segments: Vec<&str> = relative.split('.').collect();
            insert_nested(&mut root, &segments, value);
        }
    }

    if root.is_empty() {
        Ok(None)
    } else {
        Ok(Some(ConfigValue::Table(root)))
    }
}

fn insert_nested(table: &mut BTreeMap<String, ConfigValue>, segments: &[&str], value: ConfigValue) {
    match segments {
        [] => {}
        [leaf] => {
            table.insert((*leaf).to_string(), value);
        }
        [head, rest @ ..] => {
            let entry = table
                .entry((*head).to_string())
                .or_insert_with(|| ConfigValue::Table(BTreeMap::new()));
            if let ConfigValue::Table(inner) = entry {
                insert_nested(inner, rest, value);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn available_keys_are_sorted_and_unique() {
        let keys = available_keys();
        let paths: Vec<&str> = keys.iter().map(|k| k.path).collect();
        let mut sorted = paths.clone();
        sorted.sort();
        sorted.dedup();
        assert_eq!(paths, sorted);
        assert_eq!(paths.len(), DAEMON_KEYS.len());
    }

    #[test]
    fn every_key_round_trips_through_its_accessors() {
        let samples = |kind: ValueKind| match kind {
            ValueKind::String => "localhost:8090",
            ValueKind::Bool => "true",
            ValueKind::Duration => "45s",
            ValueKind::StringList => "a, b",
        };

        for spec in DAEMON_KEYS {
            let mut daemon = DaemonConfig::new();
            let value = spec.kind.parse(spec.path, samples(spec.kind)).unwrap();
            (spec.set)(&mut daemon, value.clone());
            assert_eq!((spec.get)(&daemon), value, "key {}", spec.path);

            (spec.set)(&mut daemon, None);
            daemon.prune();
            assert_eq!((spec.get)(&daemon), None, "key {}", spec.path);
            assert!(daemon.is_empty(), "key {} left residue", spec.path);
        }
    }

    #[test]
    fn lookup_unknown_key() {
        assert!(lookup("api.addr").is_ok());
        assert!(matches!(lookup("api.nope"), Err(ConfigError::UnknownKey(_))));
    }

    #[test]
    fn subtree_rejects_partial_segment() {
        let daemon = DaemonConfig::new();
        assert!(subtree(&daemon, "api.co").is_err());
        assert_eq!(subtree(&daemon, "api.cors").unwrap(), None);
    }
}
