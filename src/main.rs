//! Taskgate CLI - a per-user to-do list behind a mock login.

use clap::Parser;
use std::path::PathBuf;
use std::process;
use taskgate::cli::{Cli, Commands, ConfigCommands, StoreCommands, TaskCommands};
use taskgate::commands::{self, CommandResult, Context};
use taskgate::config::{self, ConfigOverrides, OutputFormat, ResolvedConfig};
use tracing_subscriber::EnvFilter;

/// Environment variable holding the log filter.
const LOG_ENV: &str = "TG_LOG";

fn main() {
    let cli = Cli::parse();

    let config_path = config::config_path();
    let file_config = match commands::load_file_config(config_path.as_deref()) {
        Ok(config) => config,
        Err(e) => exit_with_error(&e, cli.human_readable),
    };

    let mut overrides = ConfigOverrides::new();
    if let Some(dir) = cli.data_dir {
        overrides = overrides.with_data_dir(dir);
    }
    if cli.human_readable {
        overrides = overrides.with_output_format(OutputFormat::Human);
    }
    let resolved = config::resolve_config(&file_config, &overrides);
    let human = resolved.output_format.value == OutputFormat::Human;

    init_tracing(&resolved.log_level.value, cli.log_json);
    tracing::debug!(
        data_dir = %resolved.data_dir.value.display(),
        source = %resolved.data_dir.source,
        "Resolved configuration"
    );

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => exit_with_error(&e.into(), human),
    };

    if let Err(e) = runtime.block_on(run_command(cli.command, resolved, config_path, human)) {
        exit_with_error(&e, human);
    }
}

/// Install the stderr subscriber: `TG_LOG` if set, else the configured level.
fn init_tracing(default_level: &str, json: bool) {
    let filter =
        EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(default_level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn exit_with_error(e: &taskgate::Error, human: bool) -> ! {
    if human {
        eprintln!("Error: {}", e.user_message());
    } else {
        eprintln!("{}", serde_json::json!({ "error": e.to_string() }));
    }
    process::exit(1);
}

async fn run_command(
    command: Commands,
    resolved: ResolvedConfig,
    config_path: Option<PathBuf>,
    human: bool,
) -> Result<(), taskgate::Error> {
    // Nothing to open for config or build inspection
    match command {
        Commands::Config {
            command: ConfigCommands::Show,
        } => {
            output(&commands::config_show(&resolved, config_path)?, human);
            return Ok(());
        }
        Commands::BuildInfo => {
            output(&commands::build_info(), human);
            return Ok(());
        }
        _ => {}
    }

    let ctx = Context::open(resolved);

    match command {
        Commands::Login {
            identifier,
            password,
        } => output(&commands::login(&ctx, &identifier, &password).await?, human),
        Commands::Logout => output(&commands::logout(&ctx)?, human),
        Commands::Whoami => output(&commands::whoami(&ctx)?, human),
        Commands::Task { command } => match command {
            TaskCommands::Add { text } => output(&commands::task_add(&ctx, &text)?, human),
            TaskCommands::List { filter } => output(&commands::task_list(&ctx, &filter)?, human),
            TaskCommands::Toggle { id } => output(&commands::task_toggle(&ctx, id)?, human),
            TaskCommands::Rm { id } => output(&commands::task_remove(&ctx, id)?, human),
            TaskCommands::ClearCompleted => {
                output(&commands::task_clear_completed(&ctx)?, human)
            }
            TaskCommands::Counts => output(&commands::task_counts(&ctx)?, human),
        },
        Commands::Mail { to, print } => {
            output(&commands::mail(&ctx, to.as_deref(), print)?, human)
        }
        Commands::Store { command } => match command {
            StoreCommands::Keys { prefix } => {
                output(&commands::store_keys(&ctx, prefix.as_deref())?, human)
            }
            StoreCommands::Info => output(&commands::store_info(&ctx)?, human),
        },
        Commands::Config { .. } | Commands::BuildInfo => {}
    }

    Ok(())
}

/// Print output in JSON or human-readable format.
fn output<T: CommandResult>(result: &T, human: bool) {
    if human {
        println!("{}", result.to_human());
    } else {
        println!("{}", result.to_json());
    }
}
