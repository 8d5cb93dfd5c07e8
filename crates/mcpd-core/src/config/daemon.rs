//! The `[daemon]` section of `.mcpd.toml`.
//!
//! Every leaf is optional; sub-tables that end up empty are pruned so a
//! cleared value round-trips as absent. Reads and writes by dotted path go
//! through the key registry in [`super::keys`].

use std::net::IpAddr;

use serde::{Deserialize, Serialize};

use super::keys::{self, KeySpec};
use super::value::{ConfigValue, Duration};
use crate::error::ConfigError;
use crate::types::OperationResult;

/// HTTP methods accepted in `api.cors.methods`.
pub const ALLOWED_CORS_METHODS: &[&str] = &[
    "GET", "HEAD", "POST", "PUT", "PATCH", "DELETE", "OPTIONS", "CONNECT", "TRACE",
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct DaemonConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api: Option<ApiConfig>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mcp: Option<McpConfig>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ApiConfig {
    /// Listen address, `host:port`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub addr: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<ApiTimeoutConfig>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cors: Option<CorsConfig>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ApiTimeoutConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shutdown: Option<Duration>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct CorsConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enable: Option<bool>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub allow_origins: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub methods: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub allow_headers: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub expose_headers: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allow_credentials: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_age: Option<Duration>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct McpConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<McpTimeoutConfig>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interval: Option<McpIntervalConfig>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct McpTimeoutConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shutdown: Option<Duration>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub init: Option<Duration>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub health: Option<Duration>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct McpIntervalConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub health: Option<Duration>,
}

impl ApiTimeoutConfig {
    fn is_empty(&self) -> bool {
        self.shutdown.is_none()
    }
}

impl CorsConfig {
    fn is_empty(&self) -> bool {
        self.enable.is_none()
            && self.allow_origins.is_empty()
            && self.methods.is_empty()
            && self.allow_headers.is_empty()
            && self.expose_headers.is_empty()
            && self.allow_credentials.is_none()
            && self.max_age.is_none()
    }
}

impl McpTimeoutConfig {
    fn is_empty(&self) -> bool {
        self.shutdown.is_none() && self.init.is_none() && self.health.is_none()
    }
}

impl McpIntervalConfig {
    fn is_empty(&self) -> bool {
        self.health.is_none()
    }
}

impl ApiConfig {
    pub fn timeout_mut(&mut self) -> &mut ApiTimeoutConfig {
        self.timeout.get_or_insert_with(Default::default)
    }

    pub fn cors_mut(&mut self) -> &mut CorsConfig {
        self.cors.get_or_insert_with(Default::default)
    }

    fn prune(&mut self) {
        if self.timeout.as_ref().is_some_and(ApiTimeoutConfig::is_empty) {
            self.timeout = None;
        }
        if self.cors.as_ref().is_some_and(CorsConfig::is_empty) {
            self.cors = None;
        }
    }

    fn is_empty(&self) -> bool {
        self.addr.is_none() && self.timeout.is_none() && self.cors.is_none()
    }
}

impl McpConfig {
    pub fn timeout_mut(&mut self) -> &mut McpTimeoutConfig {
        self.timeout.get_or_insert_with(Default::default)
    }

    pub fn interval_mut(&mut self) -> &mut McpIntervalConfig {
        self.interval.get_or_insert_with(Default::default)
    }

    fn prune(&mut self) {
        if self.timeout.as_ref().is_some_and(McpTimeoutConfig::is_empty) {
            self.timeout = None;
        }
        if self.interval.as_ref().is_some_and(McpIntervalConfig::is_empty) {
            self.interval = None;
        }
    }

    fn is_empty(&self) -> bool {
        self.timeout.is_none() && self.interval.is_none()
    }
}

impl DaemonConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn api_mut(&mut self) -> &mut ApiConfig {
        self.api.get_or_insert_with(Default::default)
    }

    pub fn mcp_mut(&mut self) -> &mut McpConfig {
        self.mcp.get_or_insert_with(Default::default)
    }

    /// Whether no key is configured at all.
    pub fn is_empty(&self) -> bool {
        self.api.is_none() && self.mcp.is_none()
    }

    /// Drop sub-tables that no longer hold any value.
    pub fn prune(&mut self) {
        if let Some(api) = self.api.as_mut() {
            api.prune();
            if api.is_empty() {
                self.api = None;
            }
        }
        if let Some(mcp) = self.mcp.as_mut() {
            mcp.prune();
            if mcp.is_empty() {
                self.mcp = None;
            }
        }
    }

    /// Parse `raw` for the key at `path` and store it.
    ///
    /// An empty `raw` clears the key. Reports `Created` when the key held no
    /// value, `Updated` when the value changed and `Noop` otherwise.
    pub fn set(&mut self, path: &str, raw: &str) -> Result<OperationResult, ConfigError> {
        let spec = keys::lookup(path)?;
        let value = spec.kind.parse(spec.path, raw)?;
        Ok(self.apply(spec, value))
    }

    /// Clear the key at `path`.
    ///
    /// Returns `Deleted` when a value was removed and `Noop` when the key was
    /// already absent.
    pub fn remove(&mut self, path: &str) -> Result<OperationResult, ConfigError> {
        self.set(path, "")
    }

    /// Read the value at `path`.
    ///
    /// A leaf key yields its value (or `None` when unset); an empty path or a
    /// section prefix such as `api.cors` yields a table of everything set
    /// beneath it.
    pub fn get(&self, path: &str) -> Result<Option<ConfigValue>, ConfigError> {
        let path = path.trim().trim_matches('.');
        if let Some(spec) = keys::find(path) {
            return Ok((spec.get)(self));
        }
        keys::subtree(self, path)
    }

    fn apply(&mut self, spec: &KeySpec, value: Option<ConfigValue>) -> OperationResult {
        let before = (spec.get)(self);
        let result = OperationResult::from_change(before.as_ref(), value.as_ref());
        if result.is_change() {
            (spec.set)(self, value);
            self.prune();
        }
        result
    }

    /// Check every configured value, accumulating all failures.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors = Vec::new();

        if let Some(api) = &self.api {
            if let Some(addr) = &api.addr
                && let Err(reason) = validate_addr(addr)
            {
                errors.push(ConfigError::invalid(
                    "api.addr",
                    format!("invalid API address '{}': {}", addr, reason),
                ));
            }

            if let Some(cors) = &api.cors {
                for method in &cors.methods {
                    if !ALLOWED_CORS_METHODS.contains(&method.to_ascii_uppercase().as_str()) {
                        errors.push(ConfigError::invalid(
                            "api.cors.methods",
                            format!(
                                "invalid HTTP method '{}' (allowed: {})",
                                method,
                                ALLOWED_CORS_METHODS.join(", ")
                            ),
                        ));
                    }
                }
                for origin in &cors.allow_origins {
                    if let Err(reason) = validate_origin(origin) {
                        errors.push(ConfigError::invalid(
                            "api.cors.allow_origins",
                            format!("invalid origin '{}': {}", origin, reason),
                        ));
                    }
                }
            }
        }

        for spec in keys::available_keys() {
            if let Some(ConfigValue::Duration(duration)) = (spec.get)(self)
                && duration.is_zero()
            {
                errors.push(ConfigError::invalid(
                    spec.path,
                    "duration must be greater than zero",
                ));
            }
        }

        ConfigError::collect(errors)
    }
}

/// Validate a `host:port` listen address.
///
/// The host may be empty (all interfaces), an IP (IPv6 in brackets) or a
/// hostname; the port must be in 1..=65535.
pub fn validate_addr(addr: &str) -> Result<(), String> {
    let (host, port) = addr
        .rsplit_once(':')
        .ok_or_else(|| "expected host:port".to_string())?;

    validate_port(port)?;

    if let Some(inner) = host.strip_prefix('[') {
        let inner = inner
            .strip_suffix(']')
            .ok_or_else(|| "unterminated IPv6 literal".to_string())?;
        return inner
            .parse::<std::net::Ipv6Addr>()
            .map(|_| ())
            .map_err(|_| format!("invalid IPv6 address '{}'", inner));
    }

    if host.is_empty() || host.parse::<IpAddr>().is_ok() {
        return Ok(());
    }
    validate_hostname(host)
}

fn validate_port(port: &str) -> Result<(), String> {
    match port.parse::<u32>() {
        Ok(n) if (1..=65535).contains(&n) => Ok(()),
        Ok(n) => Err(format!("port {} out of range 1-65535", n)),
        Err(_) => Err(format!("invalid port '{}'", port)),
    }
}

fn validate_hostname(host: &str) -> Result<(), String> {
    let valid = host.split('.').all(|label| {
        !label.is_empty()
            && !label.starts_with('-')
            && !label.ends_with('-')
            && label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
    });
    if valid {
        Ok(())
    } else {
        Err(format!("invalid host '{}'", host))
    }
}

/// Validate a CORS origin: `*`, `scheme://host[:port]` or `host[:port]`.
pub fn validate_origin(origin: &str) -> Result<(), String> {
    if origin == "*" {
        return Ok(());
    }

    if origin.contains("://") {
        let url = url::Url::parse(origin).map_err(|e| e.to_string())?;
        if url.host_str().is_none() {
            return Err("missing host".to_string());
        }
        if !matches!(url.path(), "" | "/") || url.query().is_some() || url.fragment().is_some() {
            return Err("origin must not contain a path, query or fragment".to_string());
        }
        return Ok(());
    }

    match origin.rsplit_once(':') {
        Some((host, port)) => {
            validate_port(port)?;
            validate_hostname(host)
        }
        None => validate_hostname(origin),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_then_get_returns_typed_value() {
        let mut daemon = DaemonConfig::new();
        let result = daemon.set("api.addr", "localhost:8090").unwrap();
        assert_eq!(result, OperationResult::Created);
        assert_eq!(
            daemon.get("api.addr").unwrap(),
            Some(ConfigValue::String("localhost:8090".to_string()))
        );

        daemon.set("api.timeout.shutdown", "30s").unwrap();
        assert_eq!(
            daemon.get("api.timeout.shutdown").unwrap(),
            Some(ConfigValue::Duration(Duration::from_secs(30)))
        );
    }

    #[test]
    fn set_same_value_is_noop_and_change_is_update() {
        let mut daemon = DaemonConfig::new();
        daemon.set("api.cors.enable", "true").unwrap();
        assert_eq!(
            daemon.set("api.cors.enable", "TRUE").unwrap(),
            OperationResult::Noop
        );
        assert_eq!(
            daemon.set("api.cors.enable", "false").unwrap(),
            OperationResult::Updated
        );
        assert_eq!(daemon.api.unwrap().cors.unwrap().enable, Some(false));
    }

    #[test]
    fn remove_prunes_empty_sections() {
        let mut daemon = DaemonConfig::new();
        daemon.set("mcp.interval.health", "10s").unwrap();
        assert_eq!(
            daemon.remove("mcp.interval.health").unwrap(),
            OperationResult::Deleted
        );
        assert!(daemon.is_empty());
        assert_eq!(daemon.get("mcp.interval.health").unwrap(), None);
    }

    #[test]
    fn remove_absent_key_is_noop() {
        let mut daemon = DaemonConfig::new();
        assert_eq!(daemon.remove("api.addr").unwrap(), OperationResult::Noop);
    }

    #[test]
    fn unknown_key_is_rejected() {
        let mut daemon = DaemonConfig::new();
        let err = daemon.set("api.port", "8080").unwrap_err();
        assert!(matches!(err, ConfigError::UnknownKey(ref k) if k == "api.port"));
    }

    #[test]
    fn invalid_value_carries_path() {
        let mut daemon = DaemonConfig::new();
        let err = daemon.set("api.cors.max_age", "forever").unwrap_err();
        assert!(
            matches!(err, ConfigError::InvalidValue { ref key, .. } if key == "api.cors.max_age")
        );
    }

    #[test]
    fn get_prefix_returns_subtree() {
        let mut daemon = DaemonConfig::new();
        daemon.set("api.cors.enable", "true").unwrap();
        daemon.set("api.cors.methods", "GET, POST").unwrap();
        daemon.set("api.addr", ":8090").unwrap();

        let cors = daemon.get("api.cors").unwrap().unwrap();
        let flat = cors.flatten("");
        assert_eq!(flat.len(), 2);

        let all = daemon.get("").unwrap().unwrap();
        let paths: Vec<String> = all.flatten("").into_iter().map(|(p, _)| p).collect();
        assert_eq!(paths, vec!["api.addr", "api.cors.enable", "api.cors.methods"]);
    }

    #[test]
    fn get_unknown_prefix_is_error() {
        let daemon = DaemonConfig::new();
        assert!(daemon.get("nope").is_err());
        assert_eq!(daemon.get("api").unwrap(), None);
    }

    #[test]
    fn validate_accumulates_errors() {
        let daemon = DaemonConfig {
            api: Some(ApiConfig {
                addr: Some("invalid-address".to_string()),
                timeout: Some(ApiTimeoutConfig {
                    shutdown: Some(Duration::default()),
                }),
                cors: Some(CorsConfig {
                    methods: vec!["INVALID_METHOD".to_string()],
                    ..Default::default()
                }),
            }),
            mcp: None,
        };

        let err = daemon.validate().unwrap_err();
        let message = err.to_string();
        assert!(message.contains("API address"));
        assert!(message.contains("timeout"));
        assert!(message.contains("method"));
        assert_eq!(err.into_leaves().len(), 3);
    }

    #[test]
    fn addr_forms() {
        assert!(validate_addr("localhost:8090").is_ok());
        assert!(validate_addr(":8090").is_ok());
        assert!(validate_addr("0.0.0.0:1").is_ok());
        assert!(validate_addr("[::1]:65535").is_ok());
        assert!(validate_addr("localhost").is_err());
        assert!(validate_addr("localhost:0").is_err());
        assert!(validate_addr("localhost:70000").is_err());
        assert!(validate_addr("bad host:80").is_err());
    }

    #[test]
    fn origin_forms() {
        assert!(validate_origin("*").is_ok());
        assert!(validate_origin("https://example.com").is_ok());
        assert!(validate_origin("http://localhost:3000").is_ok());
        assert!(validate_origin("example.com").is_ok());
        assert!(validate_origin("example.com:8080").is_ok());
        assert!(validate_origin("https://example.com/path").is_err());
        assert!(validate_origin("example.com:port").is_err());
    }
}
