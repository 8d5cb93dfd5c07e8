mod support;

use tempfile::TempDir;

use mcpd_core::commands::{
    PluginAddOptions, PluginSetOptions, PluginValidateOptions, PluginsCommand,
};
use mcpd_core::config::plugins::{Category, Flow, MoveOptions};
use mcpd_core::error::ConfigError;
use mcpd_core::types::OperationResult;

fn command_with(temp: &TempDir, contract: &str) -> PluginsCommand {
    let paths = support::paths(temp);
    support::write_contract(&paths, contract);
    PluginsCommand::new(paths)
}

#[test]
fn move_before_reorders_within_category() {
    let temp = TempDir::new().unwrap();
    let cmd = command_with(
        &temp,
        r#"
[[plugins.authentication]]
name = "plugin-a"
flows = ["request"]

[[plugins.authentication]]
name = "plugin-b"
flows = ["request"]
"#,
    );

    let report = cmd
        .move_plugin(
            Category::Authentication,
            "plugin-b",
            &MoveOptions::new().before("plugin-a"),
        )
        .unwrap();

    assert_eq!(report.result, OperationResult::Updated);
    assert_eq!(report.order, vec!["plugin-b", "plugin-a"]);
    let listed = cmd.list(Some(Category::Authentication)).unwrap();
    let names: Vec<&str> = listed[0].plugins.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, vec!["plugin-b", "plugin-a"]);
}

const SHARED: &str = r#"
[[plugins.authentication]]
name = "shared-name"
flows = ["request", "response"]

[[plugins.audit]]
name = "shared-name"
flows = ["response"]
"#;

#[test]
fn cross_category_conflict_requires_force() {
    let temp = TempDir::new().unwrap();
    let cmd = command_with(&temp, SHARED);

    let err = cmd
        .move_plugin(
            Category::Authentication,
            "shared-name",
            &MoveOptions::new().to_category(Category::Audit),
        )
        .unwrap_err();
    assert!(matches!(
        err.downcast_ref::<ConfigError>(),
        Some(ConfigError::Conflict(_))
    ));
    assert_eq!(cmd.list(None).unwrap().len(), 2);

    let report = cmd
        .move_plugin(
            Category::Authentication,
            "shared-name",
            &MoveOptions::new()
                .to_category(Category::Audit)
                .with_force(true),
        )
        .unwrap();
    assert_eq!(report.result, OperationResult::Updated);

    let listed = cmd.list(None).unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].category, Category::Audit);
    assert_eq!(listed[0].plugins.len(), 1);
    assert_eq!(
        listed[0].plugins[0].flows.iter().copied().collect::<Vec<_>>(),
        vec![Flow::Request, Flow::Response]
    );
}

#[test]
fn add_rejects_duplicates_and_requires_flows() {
    let temp = TempDir::new().unwrap();
    let cmd = PluginsCommand::new(support::paths(&temp));

    let options = PluginAddOptions::new("jwt-auth", Category::Authentication)
        .with_flows([Flow::Request])
        .with_required(true);
    assert_eq!(cmd.add(&options).unwrap().result, OperationResult::Created);

    let err = cmd.add(&options).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<ConfigError>(),
        Some(ConfigError::AlreadyExists { .. })
    ));

    let err = cmd
        .add(&PluginAddOptions::new("rate", Category::RateLimiting))
        .unwrap_err();
    assert!(matches!(
        err.downcast_ref::<ConfigError>(),
        Some(ConfigError::MissingArgument(_))
    ));
}

#[test]
fn set_merges_into_existing_entry() {
    let temp = TempDir::new().unwrap();
    let cmd = PluginsCommand::new(support::paths(&temp));
    cmd.add(
        &PluginAddOptions::new("jwt-auth", Category::Authentication)
            .with_flows([Flow::Request])
            .with_commit_hash("abc123"),
    )
    .unwrap();

    let report = cmd
        .set(
            &PluginSetOptions::new()
                .with_plugin(Category::Authentication, "jwt-auth")
                .with_required(false),
        )
        .unwrap();
    assert_eq!(report.result, OperationResult::Updated);

    let entry = cmd.get(Category::Authentication, "jwt-auth").unwrap();
    assert_eq!(entry.required, Some(false));
    assert_eq!(entry.commit_hash.as_deref(), Some("abc123"));

    let report = cmd
        .set(
            &PluginSetOptions::new()
                .with_plugin(Category::Authentication, "jwt-auth")
                .with_required(false),
        )
        .unwrap();
    assert_eq!(report.result, OperationResult::Noop);
}

#[test]
fn set_new_plugin_needs_flows() {
    let temp = TempDir::new().unwrap();
    let cmd = PluginsCommand::new(support::paths(&temp));

    assert!(cmd
        .set(&PluginSetOptions::new().with_plugin(Category::Content, "filter"))
        .is_err());

    let report = cmd
        .set(
            &PluginSetOptions::new()
                .with_plugin(Category::Content, "filter")
                .with_flows([Flow::Response]),
        )
        .unwrap();
    assert_eq!(report.result, OperationResult::Created);
}

#[test]
fn set_dir_only() {
    let temp = TempDir::new().unwrap();
    let cmd = PluginsCommand::new(support::paths(&temp));

    let report = cmd
        .set(&PluginSetOptions::new().with_dir("/opt/mcpd/plugins"))
        .unwrap();
    assert_eq!(report.result, OperationResult::Created);
    assert_eq!(
        cmd.catalogue().unwrap().dir.as_deref(),
        Some("/opt/mcpd/plugins")
    );
}

#[test]
fn remove_missing_plugin_is_not_found() {
    let temp = TempDir::new().unwrap();
    let cmd = PluginsCommand::new(support::paths(&temp));
    let err = cmd.remove(Category::Audit, "ghost").unwrap_err();
    assert!(matches!(
        err.downcast_ref::<ConfigError>(),
        Some(ConfigError::NotFound { .. })
    ));
}

#[test]
fn validate_checks_binaries_when_asked() {
    let temp = TempDir::new().unwrap();
    let bin_dir = temp.path().join("plugins");
    std::fs::create_dir_all(&bin_dir).unwrap();
    std::fs::write(bin_dir.join("jwt-auth"), b"#!/bin/sh\n").unwrap();

    let cmd = command_with(
        &temp,
        &format!(
            r#"
[plugins]
dir = "{}"

[[plugins.authentication]]
name = "jwt-auth"
flows = ["request"]

[[plugins.audit]]
name = "audit-log"
flows = ["response"]
"#,
            bin_dir.display()
        ),
    );

    let report = cmd.validate(&PluginValidateOptions::new()).unwrap();
    assert_eq!(report.plugin_count(), 2);

    let report = cmd
        .validate(
            &PluginValidateOptions::new()
                .with_category(Category::Authentication)
                .with_check_binaries(true),
        )
        .unwrap();
    assert_eq!(report.plugin_count(), 1);

    assert!(
        cmd.validate(&PluginValidateOptions::new().with_check_binaries(true))
            .is_err()
    );
}

#[test]
fn validate_covers_only_the_plugin_section() {
    let temp = TempDir::new().unwrap();
    let cmd = command_with(
        &temp,
        r#"
[daemon.api]
addr = "no-port"

[[plugins.authentication]]
name = "jwt-auth"
flows = ["request"]

[[plugins.audit]]
name = "audit-log"
flows = ["response"]
"#,
    );

    let report = cmd
        .validate(&PluginValidateOptions::new().with_category(Category::Audit))
        .unwrap();
    assert_eq!(report.plugin_count(), 1);
    assert_eq!(report.checked[0].category, Category::Audit);

    let err = cmd
        .validate(&PluginValidateOptions::new().with_check_binaries(true))
        .unwrap_err();
    let leaves = err.downcast::<ConfigError>().unwrap().into_leaves();
    assert_eq!(leaves.len(), 1);
    assert!(matches!(leaves[0], ConfigError::MissingArgument(_)));
}
