//! Configuration for Taskgate.
//!
//! User preferences live in `config.kdl`, located at
//! `~/.config/taskgate/config.kdl` or wherever `TG_CONFIG` points.
//!
//! ## Precedence
//!
//! CLI flag > environment variable > config.kdl > defaults
//!
//! Use the [`resolver`] module for precedence resolution.

pub mod resolver;
pub mod schema;

pub use resolver::{
    ConfigOverrides, DATA_DIR_ENV, LOGIN_DELAY_ENV, Resolved, ResolvedConfig, ValueSource,
    resolve_config, resolve_config_with_env,
};
pub use schema::{CONFIG_PATH_ENV, OutputFormat, TaskgateConfig, config_path};
