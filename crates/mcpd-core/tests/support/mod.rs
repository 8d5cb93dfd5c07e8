#![allow(dead_code)]

use std::fs;

use tempfile::TempDir;

use mcpd_core::commands::ConfigPaths;

/// Scratch contract and context paths inside `temp`.
pub fn paths(temp: &TempDir) -> ConfigPaths {
    ConfigPaths::new(
        temp.path().join(".mcpd.toml"),
        temp.path().join("config").join("secrets.dev.toml"),
    )
}

pub fn write_contract(paths: &ConfigPaths, content: &str) {
    fs::write(paths.config_file(), content).unwrap();
}

pub fn write_context(paths: &ConfigPaths, content: &str) {
    let path = paths.runtime_file();
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}
