//! Precedence resolution for configuration.
//!
//! ## Precedence (highest to lowest)
//!
//! 1. CLI flags (passed at runtime)
//! 2. Environment variables (`TG_DATA_DIR`, `TG_LOGIN_DELAY_MS`)
//! 3. config.kdl
//! 4. Built-in defaults

use crate::auth::DEFAULT_LOGIN_DELAY;
use crate::auth::token::{DEFAULT_SESSION_LIFETIME_HOURS, MAX_SESSION_LIFETIME_HOURS};
use crate::config::{OutputFormat, TaskgateConfig};
use crate::tasks::DEFAULT_MAX_TASK_LENGTH;
use std::path::PathBuf;

/// Environment variable overriding the data directory.
pub const DATA_DIR_ENV: &str = "TG_DATA_DIR";

/// Environment variable overriding the login delay.
pub const LOGIN_DELAY_ENV: &str = "TG_LOGIN_DELAY_MS";

/// Default log filter.
pub const DEFAULT_LOG_LEVEL: &str = "warn";

/// Tracks where a resolved value came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValueSource {
    /// Value from CLI flag
    CliFlag,
    /// Value from environment variable
    EnvVar(String),
    /// Value from config.kdl
    ConfigFile,
    /// Built-in default value
    Default,
}

impl std::fmt::Display for ValueSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValueSource::CliFlag => write!(f, "cli"),
            ValueSource::EnvVar(name) => write!(f, "env:{}", name),
            ValueSource::ConfigFile => write!(f, "config"),
            ValueSource::Default => write!(f, "default"),
        }
    }
}

/// A resolved value with its source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved<T> {
    /// The resolved value
    pub value: T,
    /// Where the value came from
    pub source: ValueSource,
}

impl<T> Resolved<T> {
    pub fn new(value: T, source: ValueSource) -> Self {
        Self { value, source }
    }
}

/// Fully resolved configuration with source tracking.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub data_dir: Resolved<PathBuf>,
    pub session_lifetime_hours: Resolved<i64>,
    pub login_delay_ms: Resolved<u64>,
    pub max_task_length: Resolved<usize>,
    pub log_level: Resolved<String>,
    pub output_format: Resolved<OutputFormat>,
}

impl ResolvedConfig {
    pub fn session_lifetime(&self) -> chrono::Duration {
        chrono::Duration::hours(
            self.session_lifetime_hours
                .value
                .clamp(1, MAX_SESSION_LIFETIME_HOURS),
        )
    }

    pub fn login_delay(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.login_delay_ms.value)
    }
}

/// CLI overrides for configuration resolution.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    /// Data directory from `--data-dir`
    pub data_dir: Option<PathBuf>,
    /// Output format from `-H/--human`
    pub output_format: Option<OutputFormat>,
}

impl ConfigOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.data_dir = Some(dir.into());
        self
    }

    pub fn with_output_format(mut self, format: OutputFormat) -> Self {
        self.output_format = Some(format);
        self
    }
}

/// Resolve configuration against the process environment.
pub fn resolve_config(file: &TaskgateConfig, overrides: &ConfigOverrides) -> ResolvedConfig {
    resolve_config_with_env(file, overrides, |name| std::env::var(name).ok())
}

/// Resolve configuration, reading environment variables through `env`.
pub fn resolve_config_with_env(
    file: &TaskgateConfig,
    overrides: &ConfigOverrides,
    env: impl Fn(&str) -> Option<String>,
) -> ResolvedConfig {
    let env_var = |name: &str| env(name).filter(|v| !v.is_empty());

    let data_dir = if let Some(ref dir) = overrides.data_dir {
        Resolved::new(dir.clone(), ValueSource::CliFlag)
    } else if let Some(dir) = env_var(DATA_DIR_ENV) {
        Resolved::new(
            PathBuf::from(dir),
            ValueSource::EnvVar(DATA_DIR_ENV.to_string()),
        )
    } else if let Some(ref dir) = file.data_dir {
        Resolved::new(dir.clone(), ValueSource::ConfigFile)
    } else {
        Resolved::new(crate::storage::default_data_dir(), ValueSource::Default)
    };

    let env_delay = env_var(LOGIN_DELAY_ENV).and_then(|v| match v.parse::<u64>() {
        Ok(ms) => Some(ms),
        Err(_) => {
            tracing::warn!(value = %v, "Ignoring non-numeric {}", LOGIN_DELAY_ENV);
            None
        }
    });
    let login_delay_ms = if let Some(ms) = env_delay {
        Resolved::new(ms, ValueSource::EnvVar(LOGIN_DELAY_ENV.to_string()))
    } else if let Some(ms) = file.login_delay_ms {
        Resolved::new(ms, ValueSource::ConfigFile)
    } else {
        Resolved::new(DEFAULT_LOGIN_DELAY.as_millis() as u64, ValueSource::Default)
    };

    let session_lifetime_hours = match file.session_lifetime_hours {
        Some(hours) => Resolved::new(hours, ValueSource::ConfigFile),
        None => Resolved::new(DEFAULT_SESSION_LIFETIME_HOURS, ValueSource::Default),
    };

    let max_task_length = match file.max_task_length {
        Some(max) => Resolved::new(max, ValueSource::ConfigFile),
        None => Resolved::new(DEFAULT_MAX_TASK_LENGTH, ValueSource::Default),
    };

    let log_level = match file.log_level {
        Some(ref level) => Resolved::new(level.to_lowercase(), ValueSource::ConfigFile),
        None => Resolved::new(DEFAULT_LOG_LEVEL.to_string(), ValueSource::Default),
    };

    let output_format = if let Some(format) = overrides.output_format {
        Resolved::new(format, ValueSource::CliFlag)
    } else if let Some(format) = file.output_format {
        Resolved::new(format, ValueSource::ConfigFile)
    } else {
        Resolved::new(OutputFormat::default(), ValueSource::Default)
    };

    ResolvedConfig {
        data_dir,
        session_lifetime_hours,
        login_delay_ms,
        max_task_length,
        log_level,
        output_format,
    }
}
