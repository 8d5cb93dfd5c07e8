//! Typed values stored in the daemon configuration.
//!
//! Leaves are bounded strings, booleans, durations or string lists. Raw CLI
//! input is parsed by [`ValueKind::parse`]; an empty raw string means "clear".

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::ConfigError;

const NANOS_PER_MICRO: u64 = 1_000;
const NANOS_PER_MILLI: u64 = 1_000_000;
const NANOS_PER_SEC: u64 = 1_000_000_000;
const NANOS_PER_MIN: u64 = 60 * NANOS_PER_SEC;
const NANOS_PER_HOUR: u64 = 60 * NANOS_PER_MIN;

/// Largest unit first; formatting picks the first that divides evenly.
const UNITS: &[(&str, u64)] = &[
    ("h", NANOS_PER_HOUR),
    ("m", NANOS_PER_MIN),
    ("s", NANOS_PER_SEC),
    ("ms", NANOS_PER_MILLI),
    ("us", NANOS_PER_MICRO),
    ("ns", 1),
];

/// A configuration duration, stored as an absolute nanosecond count.
///
/// Written to TOML in its shortest exact single-unit form (`30s`, `1h`,
/// `1500ms`) and read back from any of the accepted human forms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Duration(std::time::Duration);

impl Duration {
    pub fn from_nanos(nanos: u64) -> Self {
        Self(std::time::Duration::from_nanos(nanos))
    }

    pub fn from_secs(secs: u64) -> Self {
        Self(std::time::Duration::from_secs(secs))
    }

    pub fn as_nanos(&self) -> u128 {
        self.0.as_nanos()
    }

    pub fn as_std(&self) -> std::time::Duration {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }
}

impl From<std::time::Duration> for Duration {
    fn from(value: std::time::Duration) -> Self {
        Self(value)
    }
}

impl fmt::Display for Duration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let nanos = self.0.as_nanos();
        if nanos == 0 {
            return f.write_str("0s");
        }
        for (suffix, unit) in UNITS {
            let unit = u128::from(*unit);
            if nanos % unit == 0 {
                return write!(f, "{}{}", nanos / unit, suffix);
            }
        }
        write!(f, "{}ns", nanos)
    }
}

/// Error returned when a duration string cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseDurationError(String);

impl fmt::Display for ParseDurationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for ParseDurationError {}

impl FromStr for Duration {
    type Err = ParseDurationError;

    /// Parse `30s`, `500ms`, `1h30m` or `1.5s`; a bare `0` is also accepted.
    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let s = input.trim();
        if s.is_empty() {
            return Err(ParseDurationError("empty duration".to_string()));
        }
        if s == "0" {
            return Ok(Self::default());
        }

        let bytes = s.as_bytes();
        let mut pos = 0;
        let mut total: u128 = 0;

        while pos < bytes.len() {
            let int_start = pos;
            while pos < bytes.len() && bytes[pos].is_ascii_digit() {
                pos += 1;
            }
            let int_part = &s[int_start..pos];

            let mut frac_part = "";
            if pos < bytes.len() && bytes[pos] == b'.' {
                pos += 1;
                let frac_start = pos;
                while pos < bytes.len() && bytes[pos].is_ascii_digit() {
                    pos += 1;
                }
                frac_part = &s[frac_start..pos];
            }

            if int_part.is_empty() && frac_part.is_empty() {
                return Err(ParseDurationError(format!("invalid duration '{}'", input)));
            }

            let unit_start = pos;
            while pos < bytes.len() && !bytes[pos].is_ascii_digit() && bytes[pos] != b'.' {
                pos += 1;
            }
            let unit = match &s[unit_start..pos] {
                "ns" => 1,
                "us" | "µs" | "μs" => NANOS_PER_MICRO,
                "ms" => NANOS_PER_MILLI,
                "s" => NANOS_PER_SEC,
                "m" => NANOS_PER_MIN,
                "h" => NANOS_PER_HOUR,
                "" => {
                    return Err(ParseDurationError(format!(
                        "missing unit in duration '{}'",
                        input
                    )));
                }
                other => {
                    return Err(ParseDurationError(format!(
                        "unknown unit '{}' in duration '{}'",
                        other, input
                    )));
                }
            };

            let whole: u128 = if int_part.is_empty() {
                0
            } else {
                int_part
                    .parse::<u128>()
                    .map_err(|_| ParseDurationError(format!("invalid duration '{}'", input)))?
            };
            total = total.saturating_add(whole.saturating_mul(u128::from(unit)));

            if !frac_part.is_empty() {
                // Digits beyond nanosecond precision cannot contribute.
                let digits = &frac_part[..frac_part.len().min(18)];
                let numerator: u128 = digits
                    .parse()
                    .map_err(|_| ParseDurationError(format!("invalid duration '{}'", input)))?;
                let scale = 10u128.pow(digits.len() as u32);
                total = total.saturating_add(numerator * u128::from(unit) / scale);
            }
        }

        let nanos = u64::try_from(total)
            .map_err(|_| ParseDurationError(format!("duration '{}' is out of range", input)))?;
        Ok(Self::from_nanos(nanos))
    }
}

impl Serialize for Duration {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Duration {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Kind of a daemon configuration leaf.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueKind {
    String,
    Bool,
    Duration,
    StringList,
}

impl ValueKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ValueKind::String => "string",
            ValueKind::Bool => "bool",
            ValueKind::Duration => "duration",
            ValueKind::StringList => "list",
        }
    }

    /// Parse raw input destined for `key`.
    ///
    /// Returns `Ok(None)` for empty input, meaning the value should be cleared.
    pub fn parse(&self, key: &str, raw: &str) -> Result<Option<ConfigValue>, ConfigError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Ok(None);
        }

        let value = match self {
            ValueKind::String => ConfigValue::String(trimmed.to_string()),
            ValueKind::Bool => ConfigValue::Bool(parse_bool(key, trimmed)?),
            ValueKind::Duration => {
                let duration: Duration = trimmed
                    .parse()
                    .map_err(|e: ParseDurationError| ConfigError::invalid(key, e.to_string()))?;
                if duration.is_zero() {
                    return Err(ConfigError::invalid(
                        key,
                        format!("duration '{}' must be greater than zero", trimmed),
                    ));
                }
                ConfigValue::Duration(duration)
            }
            ValueKind::StringList => {
                let items = parse_list(trimmed);
                if items.is_empty() {
                    return Ok(None);
                }
                ConfigValue::List(items)
            }
        };

        Ok(Some(value))
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn parse_bool(key: &str, raw: &str) -> Result<bool, ConfigError> {
    match raw.to_ascii_lowercase().as_str() {
        "true" => Ok(true),
        "false" => Ok(false),
        _ => Err(ConfigError::invalid(
            key,
            format!("expected 'true' or 'false', got '{}'", raw),
        )),
    }
}

/// Split a comma-separated list, trimming items and dropping empty ones.
pub fn parse_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

/// A typed configuration value or a sub-tree of them.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ConfigValue {
    String(String),
    Bool(bool),
    Duration(Duration),
    List(Vec<String>),
    Table(BTreeMap<String, ConfigValue>),
}

impl ConfigValue {
    pub fn into_string(self) -> Option<String> {
        match self {
            ConfigValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn into_bool(self) -> Option<bool> {
        match self {
            ConfigValue::Bool(b) => Some(b),
            _ => None,
        }
    }

    pub fn into_duration(self) -> Option<Duration> {
        match self {
            ConfigValue::Duration(d) => Some(d),
            _ => None,
        }
    }

    pub fn into_list(self) -> Vec<String> {
        match self {
            ConfigValue::List(items) => items,
            _ => Vec::new(),
        }
    }

    /// Flatten a table into `(dotted.path, leaf)` pairs; a leaf yields itself
    /// under `prefix`.
    pub fn flatten(&self, prefix: &str) -> Vec<(String, ConfigValue)> {
        match self {
            ConfigValue::Table(entries) => entries
                .iter()
                .flat_map(|(key, value)| {
                    let path = if prefix.is_empty() {
                        key.clone()
                    } else {
                        format!("{}.{}", prefix, key)
                    };
                    value.flatten(&path)
                })
                .collect(),
            leaf => vec![(prefix.to_string(), leaf.clone())],
        }
    }
}

impl fmt::Display for ConfigValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigValue::String(s) => f.write_str(s),
            ConfigValue::Bool(b) => write!(f, "{}", b),
            ConfigValue::Duration(d) => write!(f, "{}", d),
            ConfigValue::List(items) => write!(f, "[{}]", items.join(", ")),
            ConfigValue::Table(_) => {
                let lines: Vec<String> = self
                    .flatten("")
                    .into_iter()
                    .map(|(path, value)| format!("{} = {}", path, value))
                    .collect();
                f.write_str(&lines.join("\n"))
            }
        }
    }
}
