//! mcpd - MCP server configuration manager
//!
//! Usage:
//!   mcpd config args set <server> -- --flag=value
//!   mcpd config daemon set api.addr=localhost:8090
//!   mcpd config plugins list
//!   mcpd config export
//!   mcpd remove <server>

mod output;

use std::path::PathBuf;

use anyhow::Result;
use clap::{ArgGroup, Args, Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use mcpd_core::commands::{
    ArgsCommand, ConfigPaths, DaemonCommand, EnvCommand, ExportCommand, ExportOptions,
    PluginAddOptions, PluginSetOptions, PluginValidateOptions, PluginsCommand, ServerCommand,
    ToolsCommand,
};
use mcpd_core::config::paths::{
    CONFIG_FILE_ENV, DEFAULT_CONFIG_FILE, RUNTIME_FILE_ENV, default_runtime_file,
};
use mcpd_core::config::{Category, Flow, MoveOptions};
use mcpd_core::export::ExportFormat;

use crate::output::{OutputFormat, print_structured};

#[derive(Parser)]
#[command(name = "mcpd")]
#[command(about = "Manage MCP server configuration", long_about = None)]
struct Cli {
    /// Project configuration file
    #[arg(long, global = true, env = CONFIG_FILE_ENV, default_value = DEFAULT_CONFIG_FILE)]
    config_file: PathBuf,

    /// Execution context file [default: ~/.config/mcpd/secrets.dev.toml]
    #[arg(long, global = true, env = RUNTIME_FILE_ENV)]
    runtime_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Edit configuration
    Config(ConfigArgs),

    /// Remove a server from the project configuration
    Remove {
        /// Server name
        server: String,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },
}

#[derive(Args)]
struct ConfigArgs {
    #[command(subcommand)]
    command: ConfigSubcommand,
}

#[derive(Subcommand)]
enum ConfigSubcommand {
    /// Runtime arguments in the execution context
    Args(ArgsArgs),
    /// Runtime environment variables in the execution context
    Env(EnvArgs),
    /// Tools exposed by a server
    Tools(ToolsArgs),
    /// Daemon settings
    Daemon(DaemonArgs),
    /// Plugin pipeline
    Plugins(PluginsArgs),
    /// Export a portable execution context and environment contract
    Export {
        /// Portable execution context output
        #[arg(long, default_value = "portable-execution-context.toml")]
        context_output: PathBuf,

        /// Environment contract output
        #[arg(long, default_value = ".env")]
        contract_output: PathBuf,

        /// Environment contract format
        #[arg(long, default_value = "dotenv")]
        format: ExportFormat,
    },
}

#[derive(Args)]
struct ArgsArgs {
    #[command(subcommand)]
    command: ArgsSubcommand,
}

#[derive(Subcommand)]
enum ArgsSubcommand {
    /// Set arguments (after --); existing values of the same flags are replaced
    Set {
        server: String,
        #[arg(last = true, required = true)]
        args: Vec<String>,
        /// Flags that never take a value
        #[arg(long = "bool-flag", value_name = "FLAG")]
        bool_flags: Vec<String>,
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },
    /// Remove arguments by flag name or exact value (after --)
    Remove {
        server: String,
        #[arg(last = true, required = true)]
        names: Vec<String>,
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },
    /// List arguments
    List {
        server: String,
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },
    /// Remove all arguments
    Clear {
        server: String,
        /// Required confirmation
        #[arg(long)]
        force: bool,
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },
}

#[derive(Args)]
struct EnvArgs {
    #[command(subcommand)]
    command: EnvSubcommand,
}

#[derive(Subcommand)]
enum EnvSubcommand {
    /// Set variables
    Set {
        server: String,
        #[arg(value_name = "KEY=VALUE", required = true)]
        vars: Vec<String>,
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },
    /// Remove variables
    Remove {
        server: String,
        #[arg(value_name = "KEY", required = true)]
        keys: Vec<String>,
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },
    /// List variables
    List {
        server: String,
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },
    /// Remove all variables
    Clear {
        server: String,
        #[arg(long)]
        force: bool,
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },
}

#[derive(Args)]
struct ToolsArgs {
    #[command(subcommand)]
    command: ToolsSubcommand,
}

#[derive(Subcommand)]
enum ToolsSubcommand {
    /// Add tools
    Set {
        server: String,
        #[arg(required = true)]
        tools: Vec<String>,
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },
    /// Remove tools
    Remove {
        server: String,
        #[arg(required = true)]
        tools: Vec<String>,
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },
    /// List tools
    List {
        server: String,
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },
}

#[derive(Args)]
struct DaemonArgs {
    #[command(subcommand)]
    command: DaemonSubcommand,
}

#[derive(Subcommand)]
enum DaemonSubcommand {
    /// Set one or more keys
    Set {
        #[arg(value_name = "KEY=VALUE", required = true)]
        assignments: Vec<String>,
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },
    /// Show a key or section (everything when omitted)
    Get {
        key: Option<String>,
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },
    /// List configured keys
    List {
        /// List every key the daemon accepts instead
        #[arg(long)]
        available: bool,
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },
    /// Clear one or more keys
    Remove {
        #[arg(value_name = "KEY", required = true)]
        keys: Vec<String>,
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },
    /// Validate daemon settings
    Validate,
}

#[derive(Args)]
struct PluginsArgs {
    #[command(subcommand)]
    command: PluginsSubcommand,
}

#[derive(Subcommand)]
enum PluginsSubcommand {
    /// Add a plugin to a category
    Add {
        name: String,
        #[arg(long)]
        category: Category,
        #[arg(long = "flow", required = true)]
        flows: Vec<Flow>,
        /// Fail requests when the plugin fails
        #[arg(long)]
        required: bool,
        #[arg(long)]
        commit_hash: Option<String>,
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },
    /// Set the plugin directory or update a plugin
    Set {
        #[arg(long)]
        dir: Option<String>,
        #[arg(long, requires = "name")]
        category: Option<Category>,
        #[arg(long, requires = "category")]
        name: Option<String>,
        #[arg(long = "flow", requires = "name")]
        flows: Vec<Flow>,
        #[arg(long, requires = "name")]
        required: Option<bool>,
        #[arg(long, requires = "name")]
        commit_hash: Option<String>,
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },
    /// Show a plugin, or the whole plugin section
    Get {
        #[arg(long, requires = "name")]
        category: Option<Category>,
        #[arg(long, requires = "category")]
        name: Option<String>,
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },
    /// List plugins by category
    List {
        #[arg(long)]
        category: Option<Category>,
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },
    /// Reorder a plugin or move it to another category
    #[command(group(
        ArgGroup::new("target")
            .required(true)
            .multiple(true)
            .args(["to_category", "before", "after", "position"])
    ))]
    Move {
        #[arg(long)]
        category: Category,
        #[arg(long)]
        name: String,
        #[arg(long)]
        to_category: Option<Category>,
        #[arg(long, conflicts_with_all = ["after", "position", "to_category"])]
        before: Option<String>,
        #[arg(long, conflicts_with_all = ["before", "position", "to_category"])]
        after: Option<String>,
        /// 1-indexed slot, -1 for the end
        #[arg(long, allow_negative_numbers = true)]
        position: Option<i64>,
        /// Replace a same-named plugin in the target category
        #[arg(long)]
        force: bool,
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },
    /// Remove a plugin
    Remove {
        #[arg(long)]
        category: Category,
        #[arg(long)]
        name: String,
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },
    /// Validate plugin entries
    Validate {
        #[arg(long)]
        category: Option<Category>,
        /// Require each plugin binary in the plugin directory
        #[arg(long)]
        check_binaries: bool,
        #[arg(short, long)]
        verbose: bool,
    },
}

fn main() -> Result<()> {
    // Logs go to stderr so stdout stays parseable
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let runtime_file = match cli.runtime_file {
        Some(path) => path,
        None => default_runtime_file()?,
    };
    tracing::debug!(
        config_file = %cli.config_file.display(),
        runtime_file = %runtime_file.display(),
        "resolved configuration files"
    );
    let paths = ConfigPaths::new(cli.config_file, runtime_file);

    match cli.command {
        Commands::Config(args) => run_config(args.command, paths),
        Commands::Remove { server, format } => {
            let report = ServerCommand::new(paths).remove(&server)?;
            if !print_structured(format, &report)? {
                output::print_server_report(&report);
            }
            Ok(())
        }
    }
}

fn run_config(command: ConfigSubcommand, paths: ConfigPaths) -> Result<()> {
    match command {
        ConfigSubcommand::Args(args) => run_args(args.command, paths),
        ConfigSubcommand::Env(args) => run_env(args.command, paths),
        ConfigSubcommand::Tools(args) => run_tools(args.command, paths),
        ConfigSubcommand::Daemon(args) => run_daemon(args.command, paths),
        ConfigSubcommand::Plugins(args) => run_plugins(args.command, paths),
        ConfigSubcommand::Export {
            context_output,
            contract_output,
            format,
        } => {
            let options = ExportOptions::new()
                .with_context_output(context_output)
                .with_contract_output(contract_output)
                .with_format(format);
            let report = ExportCommand::new(paths).run(&options)?;
            output::print_export_report(&report);
            Ok(())
        }
    }
}

fn run_args(command: ArgsSubcommand, paths: ConfigPaths) -> Result<()> {
    let cmd = ArgsCommand::new(paths);

    match command {
        ArgsSubcommand::Set {
            server,
            args,
            bool_flags,
            format,
        } => {
            let report = cmd.with_bool_flags(bool_flags).set(&server, &args)?;
            if !print_structured(format, &report)? {
                output::print_args_report("Set", &report);
            }
        }
        ArgsSubcommand::Remove {
            server,
            names,
            format,
        } => {
            let report = cmd.remove(&server, &names)?;
            if !print_structured(format, &report)? {
                output::print_args_report("Removed", &report);
            }
        }
        ArgsSubcommand::List { server, format } => {
            let args = cmd.list(&server)?;
            if !print_structured(format, &args)? {
                println!("Arguments for server '{}':", server);
                output::print_args(&args);
            }
        }
        ArgsSubcommand::Clear {
            server,
            force,
            format,
        } => {
            let report = cmd.clear(&server, force)?;
            if !print_structured(format, &report)? {
                output::print_args_report("Cleared", &report);
            }
        }
    }

    Ok(())
}

fn run_env(command: EnvSubcommand, paths: ConfigPaths) -> Result<()> {
    let cmd = EnvCommand::new(paths);

    match command {
        EnvSubcommand::Set {
            server,
            vars,
            format,
        } => {
            let report = cmd.set(&server, &vars)?;
            if !print_structured(format, &report)? {
                output::print_env_report("Set", &report);
            }
        }
        EnvSubcommand::Remove {
            server,
            keys,
            format,
        } => {
            let report = cmd.remove(&server, &keys)?;
            if !print_structured(format, &report)? {
                output::print_env_report("Removed", &report);
            }
        }
        EnvSubcommand::List { server, format } => {
            let env = cmd.list(&server)?;
            if !print_structured(format, &env)? {
                println!("Environment for server '{}':", server);
                output::print_env(&env);
            }
        }
        EnvSubcommand::Clear {
            server,
            force,
            format,
        } => {
            let report = cmd.clear(&server, force)?;
            if !print_structured(format, &report)? {
                output::print_env_report("Cleared", &report);
            }
        }
    }

    Ok(())
}

fn run_tools(command: ToolsSubcommand, paths: ConfigPaths) -> Result<()> {
    let cmd = ToolsCommand::new(paths);

    match command {
        ToolsSubcommand::Set {
            server,
            tools,
            format,
        } => {
            let report = cmd.set(&server, &tools)?;
            if !print_structured(format, &report)? {
                output::print_tools_report(&report);
            }
        }
        ToolsSubcommand::Remove {
            server,
            tools,
            format,
        } => {
            let report = cmd.remove(&server, &tools)?;
            if !print_structured(format, &report)? {
                output::print_tools_report(&report);
            }
        }
        ToolsSubcommand::List { server, format } => {
            let tools = cmd.list(&server)?;
            if !print_structured(format, &tools)? {
                println!("Tools for server '{}':", server);
                output::print_tools(&tools);
            }
        }
    }

    Ok(())
}

fn run_daemon(command: DaemonSubcommand, paths: ConfigPaths) -> Result<()> {
    let cmd = DaemonCommand::new(paths);

    match command {
        DaemonSubcommand::Set {
            assignments,
            format,
        } => {
            let report = cmd.set(&assignments)?;
            if !print_structured(format, &report)? {
                output::print_daemon_report("Set", &report);
            }
        }
        DaemonSubcommand::Get { key, format } => {
            let key = key.unwrap_or_default();
            let value = cmd.get(&key)?;
            if !print_structured(format, &value)? {
                match value {
                    Some(value) => println!("{}", value),
                    None if key.is_empty() => println!("No daemon configuration set."),
                    None => println!("{} is not set", key),
                }
            }
        }
        DaemonSubcommand::List { available, format } => {
            if available {
                let keys = cmd.available();
                if !print_structured(format, &keys)? {
                    output::print_available_keys(&keys);
                }
            } else {
                let values = cmd.list()?;
                let table: Vec<_> = values
                    .iter()
                    .map(|(key, value)| serde_json::json!({ "key": key, "value": value }))
                    .collect();
                if !print_structured(format, &table)? {
                    output::print_daemon_values(&values);
                }
            }
        }
        DaemonSubcommand::Remove { keys, format } => {
            let report = cmd.remove(&keys)?;
            if !print_structured(format, &report)? {
                output::print_daemon_report("Removed", &report);
            }
        }
        DaemonSubcommand::Validate => {
            cmd.validate()?;
            println!("Daemon configuration is valid");
        }
    }

    Ok(())
}

fn run_plugins(command: PluginsSubcommand, paths: ConfigPaths) -> Result<()> {
    let cmd = PluginsCommand::new(paths);

    match command {
        PluginsSubcommand::Add {
            name,
            category,
            flows,
            required,
            commit_hash,
            format,
        } => {
            let mut options = PluginAddOptions::new(&name, category)
                .with_flows(flows)
                .with_required(required);
            if let Some(hash) = commit_hash {
                options = options.with_commit_hash(hash);
            }
            let report = cmd.add(&options)?;
            if !print_structured(format, &report)? {
                output::print_plugin_report("Added", &report);
            }
        }
        PluginsSubcommand::Set {
            dir,
            category,
            name,
            flows,
            required,
            commit_hash,
            format,
        } => {
            let options = PluginSetOptions {
                dir,
                category,
                name,
                flows,
                required,
                commit_hash,
            };
            let report = cmd.set(&options)?;
            if !print_structured(format, &report)? {
                output::print_plugin_report("Set", &report);
            }
        }
        PluginsSubcommand::Get {
            category,
            name,
            format,
        } => match (category, name) {
            (Some(category), Some(name)) => {
                let entry = cmd.get(category, &name)?;
                if !print_structured(format, &entry)? {
                    println!("{}:", category);
                    output::print_plugin(&entry);
                }
            }
            _ => {
                let catalogue = cmd.catalogue()?;
                if !print_structured(format, &catalogue)? {
                    output::print_catalogue(&catalogue);
                }
            }
        },
        PluginsSubcommand::List { category, format } => {
            let listed = cmd.list(category)?;
            if !print_structured(format, &listed)? {
                output::print_listing(&listed);
            }
        }
        PluginsSubcommand::Move {
            category,
            name,
            to_category,
            before,
            after,
            position,
            force,
            format,
        } => {
            let mut options = MoveOptions::new().with_force(force);
            if let Some(target) = to_category {
                options = options.to_category(target);
            }
            if let Some(other) = before {
                options = options.before(other);
            }
            if let Some(other) = after {
                options = options.after(other);
            }
            if let Some(position) = position {
                options = options.position(position);
            }
            let report = cmd.move_plugin(category, &name, &options)?;
            if !print_structured(format, &report)? {
                output::print_move_report(&report);
            }
        }
        PluginsSubcommand::Remove {
            category,
            name,
            format,
        } => {
            let report = cmd.remove(category, &name)?;
            if !print_structured(format, &report)? {
                output::print_plugin_report("Removed", &report);
            }
        }
        PluginsSubcommand::Validate {
            category,
            check_binaries,
            verbose,
        } => {
            let mut options = PluginValidateOptions::new().with_check_binaries(check_binaries);
            if let Some(category) = category {
                options = options.with_category(category);
            }
            let report = cmd.validate(&options)?;
            output::print_validation(&report, verbose);
        }
    }

    Ok(())
}
