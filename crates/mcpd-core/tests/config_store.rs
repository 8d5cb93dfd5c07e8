use std::fs;

use tempfile::TempDir;

use mcpd_core::config::plugins::{Category, Flow, PluginEntry};
use mcpd_core::config::store::ConfigStore;
use mcpd_core::config::{ExecutionContext, ProjectConfig, ServerContext, ServerEntry};

#[test]
fn load_missing_returns_empty_config() {
    let temp = TempDir::new().unwrap();
    let store = ConfigStore::<ProjectConfig>::new(temp.path().join(".mcpd.toml"));

    let config = store.load().unwrap();

    assert!(config.servers.is_empty());
    assert!(config.daemon.is_none());
    assert!(!store.exists());
}

#[test]
fn save_then_load_roundtrip() {
    let temp = TempDir::new().unwrap();
    let store = ConfigStore::<ProjectConfig>::new(temp.path().join(".mcpd.toml"));

    let mut config = ProjectConfig::new();
    config
        .upsert_server(
            ServerEntry::new("time", "uvx::mcp-server-time@latest")
                .with_tools(["get_current_time"])
                .with_required_env(["TZ"])
                .with_required_args(["--local-timezone"]),
        )
        .unwrap();
    config.daemon_mut().set("api.addr", "localhost:8090").unwrap();
    config.daemon_mut().set("api.cors.enable", "false").unwrap();
    config.daemon_mut().set("mcp.timeout.health", "90s").unwrap();
    config
        .upsert_plugin(
            Category::Authentication,
            PluginEntry::new("jwt-auth", [Flow::Request]).with_required(true),
        )
        .unwrap();

    store.save(&config).unwrap();
    let loaded = store.load().unwrap();

    assert_eq!(loaded, config);
    let raw = fs::read_to_string(store.path()).unwrap();
    assert!(raw.contains("enable = false"));
    assert!(raw.contains("health = \"90s\""));
}

#[test]
fn removed_daemon_key_stays_absent_after_roundtrip() {
    let temp = TempDir::new().unwrap();
    let store = ConfigStore::<ProjectConfig>::new(temp.path().join(".mcpd.toml"));

    let mut config = ProjectConfig::new();
    config.daemon_mut().set("api.timeout.shutdown", "30s").unwrap();
    config.daemon_mut().remove("api.timeout.shutdown").unwrap();
    store.save(&config).unwrap();

    let loaded = store.load().unwrap();
    assert!(loaded.daemon.is_none());
    assert!(!fs::read_to_string(store.path()).unwrap().contains("[daemon"));
}

#[test]
fn servers_keep_insertion_order_on_disk() {
    let temp = TempDir::new().unwrap();
    let store = ConfigStore::<ProjectConfig>::new(temp.path().join(".mcpd.toml"));

    let mut config = ProjectConfig::new();
    for name in ["zulu", "alpha"] {
        config
            .upsert_server(ServerEntry::new(name, "uvx::pkg@latest"))
            .unwrap();
    }
    store.save(&config).unwrap();

    let raw = fs::read_to_string(store.path()).unwrap();
    let zulu = raw.find("zulu").unwrap();
    let alpha = raw.find("alpha").unwrap();
    assert!(zulu < alpha);
}

#[test]
fn context_roundtrip() {
    let temp = TempDir::new().unwrap();
    let store = ConfigStore::<ExecutionContext>::new(temp.path().join("secrets.dev.toml"));

    let mut context = ExecutionContext::new();
    let mut server = ServerContext::default();
    server.args.push("--local-timezone=Europe/London".to_string());
    server.env.insert("TZ".to_string(), "Europe/London".to_string());
    context.upsert("time", server).unwrap();

    store.save(&context).unwrap();
    assert_eq!(store.load().unwrap(), context);
}

#[test]
fn malformed_file_reports_line() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join(".mcpd.toml");
    fs::write(&path, "[[servers]]\nname = \"time\"\npackage = \n").unwrap();

    let err = ConfigStore::<ProjectConfig>::new(&path).load().unwrap_err();
    let message = format!("{:#}", err);
    assert!(message.contains("Failed to parse config file"));
    assert!(message.contains("line 3"));
}
