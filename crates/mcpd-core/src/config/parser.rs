//! TOML parser with helpful error messages

use anyhow::{Context, Result};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::path::Path;

/// Parse a TOML document from disk with detailed error messages
pub fn parse_toml_file<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    parse_toml_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Parse a TOML document from a string
pub fn parse_toml_str<T: DeserializeOwned>(content: &str) -> Result<T> {
    let content = content.strip_prefix('\u{feff}').unwrap_or(content);
    toml::from_str(content).map_err(|e| enhance_toml_error(e, content))
}

/// Enhance TOML parsing errors with helpful context
fn enhance_toml_error(error: toml::de::Error, content: &str) -> anyhow::Error {
    let error_msg = error.to_string();

    // Prefer the span; fall back to the "line N" hint in the message.
    let line_hint = error
        .span()
        .and_then(|span| content.get(..span.start))
        .map(|before| before.matches('\n').count() + 1)
        .or_else(|| {
            error_msg
                .lines()
                .find(|line| line.contains("line "))
                .and_then(|line| {
                    line.split("line ")
                        .nth(1)
                        .and_then(|s| s.split(|c: char| !c.is_ascii_digit()).next())
                        .and_then(|s| s.parse::<usize>().ok())
                })
        });

    if let Some(line_num) = line_hint {
        let context = get_line_context(content, line_num);
        anyhow::anyhow!(
            "TOML parsing error at line {}:\n{}\n\nError: {}",
            line_num,
            context,
            error_msg
        )
    } else {
        anyhow::anyhow!("TOML parsing error: {}", error_msg)
    }
}

/// Get context lines around an error
fn get_line_context(content: &str, line_num: usize) -> String {
    let lines: Vec<&str> = content.lines().collect();
    let start = line_num.saturating_sub(2).min(lines.len());
    let end = (line_num + 2).min(lines.len());

    lines[start..end]
        .iter()
        .enumerate()
        .map(|(i, line)| {
            let num = start + i + 1;
            let marker = if num == line_num { ">>>" } else { "   " };
            format!("{} {:4} | {}", marker, num, line)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Serialize a document to a TOML string
pub fn to_toml<T: Serialize>(document: &T) -> Result<String> {
    toml::to_string_pretty(document).with_context(|| "Failed to serialize configuration to TOML")
}
