//! Rendering of command results for the terminal.

use std::collections::{BTreeMap, BTreeSet};

use anyhow::Result;
use clap::ValueEnum;
use serde::Serialize;

use mcpd_core::commands::{
    ArgsReport, DaemonReport, EnvReport, ExportReport, ListedCategory, MoveReport, PluginReport,
    ServerReport, ToolsReport, ValidationReport,
};
use mcpd_core::config::{ConfigValue, KeySpec, PluginCatalogue, PluginEntry};
use mcpd_core::types::OperationResult;

#[derive(Debug, Clone, Copy, ValueEnum, Default)]
pub enum OutputFormat {
    /// Human-readable text
    #[default]
    Text,
    /// Machine-readable JSON
    Json,
    /// YAML
    Yaml,
}

/// Print `value` as JSON or YAML. Returns `false` for text so the caller
/// renders its own layout.
pub fn print_structured<T: Serialize + ?Sized>(format: OutputFormat, value: &T) -> Result<bool> {
    match format {
        OutputFormat::Text => return Ok(false),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(value)?),
        OutputFormat::Yaml => print!("{}", serde_yaml::to_string(value)?),
    }
    Ok(true)
}

fn operation(result: OperationResult) -> String {
    format!("(operation: {})", result)
}

fn print_numbered<S: AsRef<str>>(names: &[S]) {
    for (i, name) in names.iter().enumerate() {
        println!("  {}. {}", i + 1, name.as_ref());
    }
}

pub fn print_args_report(action: &str, report: &ArgsReport) {
    println!(
        "{} arguments for server '{}' {}",
        action,
        report.server,
        operation(report.result)
    );
    print_args(&report.args);
}

pub fn print_args(args: &[String]) {
    if args.is_empty() {
        println!("  (no arguments)");
    }
    for arg in args {
        println!("  {}", arg);
    }
}

pub fn print_env_report(action: &str, report: &EnvReport) {
    println!(
        "{} environment for server '{}' {}",
        action,
        report.server,
        operation(report.result)
    );
    print_env(&report.env);
}

pub fn print_env(env: &BTreeMap<String, String>) {
    if env.is_empty() {
        println!("  (no environment variables)");
    }
    for (key, value) in env {
        println!("  {}={}", key, value);
    }
}

pub fn print_tools_report(report: &ToolsReport) {
    println!(
        "Updated tools for server '{}' {}",
        report.server,
        operation(report.result)
    );
    print_tools(&report.tools);
}

pub fn print_tools(tools: &BTreeSet<String>) {
    if tools.is_empty() {
        println!("  (no tools)");
    }
    for tool in tools {
        println!("  {}", tool);
    }
}

pub fn print_daemon_report(action: &str, report: &DaemonReport) {
    for change in &report.changes {
        println!("{} {} {}", action, change.key, operation(change.result));
    }
}

pub fn print_daemon_values(values: &[(String, ConfigValue)]) {
    if values.is_empty() {
        println!("No daemon configuration set.");
        return;
    }
    for (key, value) in values {
        println!("{} = {}", key, value);
    }
}

pub fn print_available_keys(keys: &[&KeySpec]) {
    println!("{:<28} {:<10} Description", "Key", "Type");
    println!("{}", "-".repeat(70));
    for spec in keys {
        println!(
            "{:<28} {:<10} {}",
            spec.path,
            spec.kind.as_str(),
            spec.description
        );
    }
}

pub fn print_plugin_report(action: &str, report: &PluginReport) {
    match (&report.name, report.category) {
        (Some(name), Some(category)) => println!(
            "{} plugin '{}' in category '{}' {}",
            action,
            name,
            category,
            operation(report.result)
        ),
        _ => println!("{} plugin configuration {}", action, operation(report.result)),
    }
}

pub fn print_plugin(entry: &PluginEntry) {
    let flows: Vec<&str> = entry.flows.iter().map(|f| f.as_str()).collect();
    println!("  {}", entry.name);
    println!("    flows: {}", flows.join(", "));
    if let Some(required) = entry.required {
        println!("    required: {}", required);
    }
    if let Some(hash) = &entry.commit_hash {
        println!("    commit hash: {}", hash);
    }
}

pub fn print_catalogue(catalogue: &PluginCatalogue) {
    println!("Plugin directory: {}", catalogue.dir.as_deref().unwrap_or("(not set)"));
    let categories = catalogue.all_categories();
    if categories.is_empty() {
        println!("No plugins configured.");
        return;
    }
    for (category, plugins) in categories {
        println!("{}:", category);
        for entry in plugins {
            print_plugin(entry);
        }
    }
    println!("Total distinct plugins: {}", catalogue.distinct_count());
}

pub fn print_listing(listed: &[ListedCategory]) {
    if listed.iter().all(|c| c.plugins.is_empty()) {
        println!("No plugins configured.");
        return;
    }
    for category in listed {
        println!("{} ({}):", category.category, category.plugins.len());
        let names: Vec<&str> = category.plugins.iter().map(|p| p.name.as_str()).collect();
        print_numbered(&names);
    }
}

pub fn print_move_report(report: &MoveReport) {
    if report.from == report.category {
        println!(
            "Moved plugin '{}' in category '{}' {}",
            report.name,
            report.category,
            operation(report.result)
        );
    } else {
        println!(
            "Moved plugin '{}' from '{}' to '{}' {}",
            report.name,
            report.from,
            report.category,
            operation(report.result)
        );
    }
    println!("Order in '{}':", report.category);
    print_numbered(&report.order);
}

pub fn print_validation(report: &ValidationReport, verbose: bool) {
    if verbose {
        for category in &report.checked {
            for entry in &category.plugins {
                println!("  ok  {}/{}", category.category, entry.name);
            }
        }
    }
    let binaries = if report.binaries_checked {
        " (binaries checked)"
    } else {
        ""
    };
    println!(
        "Plugin configuration is valid: {} plugin(s){}",
        report.plugin_count(),
        binaries
    );
}

pub fn print_export_report(report: &ExportReport) {
    println!(
        "Exported {} server(s) with {} placeholder(s)",
        report.servers, report.placeholders
    );
    println!("  portable context: {}", report.context_output.display());
    println!("  environment contract: {}", report.contract_output.display());
}

pub fn print_server_report(report: &ServerReport) {
    println!(
        "Removed server '{}' {}",
        report.server,
        operation(report.result)
    );
}
