//! CLI argument definitions for Taskgate.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Taskgate - a per-user to-do list behind a mock login.
///
/// Start with `tg login demo`, then `tg task add "Buy milk"`.
#[derive(Parser, Debug)]
#[command(name = "tg")]
#[command(author, version, about = "A per-user to-do list behind a mock login", long_about = None)]
pub struct Cli {
    /// Output in human-readable format instead of JSON
    #[arg(short = 'H', long = "human", global = true)]
    pub human_readable: bool,

    /// Directory holding the store file (also TG_DATA_DIR)
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    /// Emit logs as JSON lines on stderr
    #[arg(long, global = true)]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Log in as one of the built-in identities
    ///
    /// Identities: admin/password123, user/user123, demo/demo123.
    /// The alias (e.g. demo@example.com) works too.
    Login {
        /// Identifier or email alias
        identifier: String,

        /// Password
        #[arg(short, long, env = "TG_PASSWORD", hide_env_values = true)]
        password: String,
    },

    /// End the current session
    Logout,

    /// Show the current session
    Whoami,

    /// Task management commands
    Task {
        #[command(subcommand)]
        command: TaskCommands,
    },

    /// Open an email draft listing completed tasks
    Mail {
        /// Recipient address
        #[arg(long)]
        to: Option<String>,

        /// Print the mailto URL instead of opening it
        #[arg(long)]
        print: bool,
    },

    /// Inspect the key-value store
    Store {
        #[command(subcommand)]
        command: StoreCommands,
    },

    /// Configuration commands
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },

    /// Show version, git commit and build time
    BuildInfo,
}

/// Task subcommands
#[derive(Subcommand, Debug)]
pub enum TaskCommands {
    /// Add a task
    Add {
        /// Task text
        text: String,
    },

    /// List tasks
    List {
        /// Which tasks to show (all, active, completed)
        #[arg(short, long, default_value = "all")]
        filter: String,
    },

    /// Mark a task done, or not done again
    Toggle {
        /// Task ID
        id: i64,
    },

    /// Delete a task
    Rm {
        /// Task ID
        id: i64,
    },

    /// Delete all completed tasks
    ClearCompleted,

    /// Show total/active/completed counts
    Counts,
}

/// Store subcommands
#[derive(Subcommand, Debug)]
pub enum StoreCommands {
    /// List stored keys
    Keys {
        /// Only keys starting with this prefix
        #[arg(long)]
        prefix: Option<String>,
    },

    /// Show backend, location and availability
    Info,
}

/// Config subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show resolved configuration and where each value came from
    Show,
}
