mod support;

use tempfile::TempDir;

use mcpd_core::commands::ArgsCommand;
use mcpd_core::error::ConfigError;
use mcpd_core::types::OperationResult;

#[test]
fn set_on_empty_context_creates_server() {
    let temp = TempDir::new().unwrap();
    let paths = support::paths(&temp);
    let cmd = ArgsCommand::new(paths.clone());

    let report = cmd
        .set("time", &["--local-timezone=Europe/London"])
        .unwrap();

    assert_eq!(report.result, OperationResult::Created);
    let context = paths.context_store().load().unwrap();
    let server = context.server("time").unwrap();
    assert_eq!(server.args, vec!["--local-timezone=Europe/London"]);
    assert!(server.env.is_empty());
}

#[test]
fn remove_by_flag_name_removes_all_variants() {
    let temp = TempDir::new().unwrap();
    let paths = support::paths(&temp);
    support::write_context(
        &paths,
        r#"
[servers.time]
args = ["--verbose", "--verbose=true", "--port=8080"]
"#,
    );

    let report = ArgsCommand::new(paths.clone())
        .remove("time", &["--verbose"])
        .unwrap();

    assert_eq!(report.result, OperationResult::Updated);
    assert_eq!(report.args, vec!["--port=8080"]);
    let context = paths.context_store().load().unwrap();
    assert_eq!(context.server("time").unwrap().args, vec!["--port=8080"]);
}

#[test]
fn remove_is_idempotent() {
    let temp = TempDir::new().unwrap();
    let paths = support::paths(&temp);
    support::write_context(
        &paths,
        r#"
[servers.time]
args = ["--port=8080", "positional"]
"#,
    );
    let cmd = ArgsCommand::new(paths);

    cmd.remove("time", &["--port"]).unwrap();
    let report = cmd.remove("time", &["--port"]).unwrap();

    assert_eq!(report.result, OperationResult::Noop);
    assert_eq!(report.args, vec!["positional"]);
}

#[test]
fn env_survives_args_clear() {
    let temp = TempDir::new().unwrap();
    let paths = support::paths(&temp);
    support::write_context(
        &paths,
        r#"
[servers.time]
args = ["--port=8080"]
[servers.time.env]
TZ = "UTC"
"#,
    );

    ArgsCommand::new(paths.clone()).clear("time", true).unwrap();

    let context = paths.context_store().load().unwrap();
    let server = context.server("time").unwrap();
    assert!(server.args.is_empty());
    assert_eq!(server.env["TZ"], "UTC");
}

#[test]
fn list_unknown_server_is_not_found() {
    let temp = TempDir::new().unwrap();
    let err = ArgsCommand::new(support::paths(&temp))
        .list("ghost")
        .unwrap_err();
    assert!(matches!(
        err.downcast_ref::<ConfigError>(),
        Some(ConfigError::NotFound { .. })
    ));
}
