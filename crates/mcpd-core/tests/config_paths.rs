use std::path::PathBuf;

use mcpd_core::commands::ConfigPaths;
use mcpd_core::config::paths::{DEFAULT_CONFIG_FILE, DEFAULT_RUNTIME_FILE_NAME, same_file};

#[test]
fn default_config_file_is_project_local() {
    assert_eq!(DEFAULT_CONFIG_FILE, ".mcpd.toml");
}

#[test]
fn default_runtime_file_lives_under_mcpd_dir() {
    let paths = ConfigPaths::with_defaults().unwrap();
    assert_eq!(paths.config_file(), PathBuf::from(".mcpd.toml"));
    assert!(paths.runtime_file().ends_with(PathBuf::from("mcpd").join(DEFAULT_RUNTIME_FILE_NAME)));
}

#[test]
fn explicit_paths_are_used_by_stores() {
    let paths = ConfigPaths::new("/tmp/project/.mcpd.toml", "/tmp/rt/secrets.toml");
    assert_eq!(
        paths.contract_store().path(),
        PathBuf::from("/tmp/project/.mcpd.toml")
    );
    assert_eq!(
        paths.context_store().path(),
        PathBuf::from("/tmp/rt/secrets.toml")
    );
}

#[test]
fn same_file_compares_missing_paths_literally() {
    assert!(same_file(
        &PathBuf::from("/nope/a.toml"),
        &PathBuf::from("/nope/a.toml")
    ));
    assert!(!same_file(
        &PathBuf::from("/nope/a.toml"),
        &PathBuf::from("/nope/b.toml")
    ));
}
