//! KDL schema for config.kdl.
//!
//! ```kdl
//! data-dir "/home/me/.local/share/taskgate"
//! session-lifetime-hours 24
//! login-delay-ms 500
//! max-task-length 500
//! log-level "warn"
//! output-format "human"  // or "json"
//! ```
//!
//! Every key is optional; unknown keys are ignored.

use crate::auth::token::MAX_SESSION_LIFETIME_HOURS;
use kdl::{KdlDocument, KdlValue};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable pointing at an alternate config file.
pub const CONFIG_PATH_ENV: &str = "TG_CONFIG";

/// Accepted `log-level` values.
pub const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error", "off"];

/// Output format preference for CLI commands.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// JSON output (default, machine-readable)
    #[default]
    Json,
    /// Human-readable output
    Human,
}

impl OutputFormat {
    /// Parse from string, case-insensitive.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "json" => Some(OutputFormat::Json),
            "human" => Some(OutputFormat::Human),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OutputFormat::Json => "json",
            OutputFormat::Human => "human",
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Settings read from config.kdl.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskgateConfig {
    /// Directory holding `store.json`
    pub data_dir: Option<PathBuf>,

    /// Session token lifetime
    pub session_lifetime_hours: Option<i64>,

    /// Artificial pause before a login attempt is answered
    pub login_delay_ms: Option<u64>,

    /// Upper bound on task text length, in characters
    pub max_task_length: Option<usize>,

    /// Default log filter when `TG_LOG` is unset
    pub log_level: Option<String>,

    /// Default output format for CLI commands
    pub output_format: Option<OutputFormat>,
}

fn first_entry<'a>(doc: &'a KdlDocument, name: &str) -> Option<&'a KdlValue> {
    doc.get(name)
        .and_then(|node| node.entries().first())
        .map(|entry| entry.value())
}

impl TaskgateConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate the config values.
    ///
    /// Returns an error message naming the first invalid key.
    pub fn validate(&self) -> Result<(), String> {
        if let Some(hours) = self.session_lifetime_hours {
            if hours <= 0 {
                return Err(format!(
                    "session-lifetime-hours must be positive, got {}",
                    hours
                ));
            }
            if hours > MAX_SESSION_LIFETIME_HOURS {
                return Err(format!(
                    "session-lifetime-hours must be at most {}, got {}",
                    MAX_SESSION_LIFETIME_HOURS, hours
                ));
            }
        }
        if let Some(max) = self.max_task_length {
            if max == 0 {
                return Err("max-task-length must be at least 1".to_string());
            }
        }
        if let Some(ref level) = self.log_level {
            if !LOG_LEVELS.contains(&level.to_lowercase().as_str()) {
                return Err(format!(
                    "log-level must be one of {}, got {:?}",
                    LOG_LEVELS.join(", "),
                    level
                ));
            }
        }
        Ok(())
    }

    /// Parse config from a KDL document.
    ///
    /// Values of the wrong type are skipped, the same as absent keys.
    /// Out-of-range numbers are kept so that [`TaskgateConfig::validate`]
    /// can report them.
    pub fn from_kdl(doc: &KdlDocument) -> Self {
        let mut config = Self::new();

        if let Some(s) = first_entry(doc, "data-dir").and_then(KdlValue::as_string) {
            config.data_dir = Some(PathBuf::from(s));
        }

        if let Some(i) = first_entry(doc, "session-lifetime-hours").and_then(KdlValue::as_integer)
        {
            config.session_lifetime_hours = i64::try_from(i).ok();
        }

        if let Some(i) = first_entry(doc, "login-delay-ms").and_then(KdlValue::as_integer) {
            config.login_delay_ms = u64::try_from(i).ok();
        }

        if let Some(i) = first_entry(doc, "max-task-length").and_then(KdlValue::as_integer) {
            config.max_task_length = usize::try_from(i).ok();
        }

        if let Some(s) = first_entry(doc, "log-level").and_then(KdlValue::as_string) {
            config.log_level = Some(s.to_string());
        }

        if let Some(s) = first_entry(doc, "output-format").and_then(KdlValue::as_string) {
            config.output_format = OutputFormat::parse(s);
        }

        config
    }

    /// Read and validate the config file at `path`.
    ///
    /// A missing file is an empty config.
    pub fn load_from(path: &Path) -> crate::Result<Self> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::new()),
            Err(e) => return Err(e.into()),
        };
        let doc: KdlDocument = content.parse()?;
        let config = Self::from_kdl(&doc);
        config
            .validate()
            .map_err(|msg| crate::Error::Config(format!("{}: {}", path.display(), msg)))?;
        tracing::debug!(path = %path.display(), "Loaded config");
        Ok(config)
    }
}

/// Location of config.kdl: `TG_CONFIG` if set, else the platform config dir.
pub fn config_path() -> Option<PathBuf> {
    if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
        if !path.is_empty() {
            return Some(PathBuf::from(path));
        }
    }
    dirs::config_dir().map(|dir| dir.join("taskgate").join("config.kdl"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const FULL: &str = r#"
data-dir "/tmp/tg-data"
session-lifetime-hours 8
login-delay-ms 0
max-task-length 140
log-level "debug"
output-format "human"
"#;

    fn parse(text: &str) -> TaskgateConfig {
        TaskgateConfig::from_kdl(&text.parse::<KdlDocument>().unwrap())
    }

    #[test]
    fn test_output_format_parse() {
        assert_eq!(OutputFormat::parse("json"), Some(OutputFormat::Json));
        assert_eq!(OutputFormat::parse("HUMAN"), Some(OutputFormat::Human));
        assert_eq!(OutputFormat::parse("yaml"), None);
    }

    #[test]
    fn test_from_kdl_all_keys() {
        let config = parse(FULL);
        assert_eq!(config.data_dir, Some(PathBuf::from("/tmp/tg-data")));
        assert_eq!(config.session_lifetime_hours, Some(8));
        assert_eq!(config.login_delay_ms, Some(0));
        assert_eq!(config.max_task_length, Some(140));
        assert_eq!(config.log_level.as_deref(), Some("debug"));
        assert_eq!(config.output_format, Some(OutputFormat::Human));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_kdl_empty_and_wrong_types() {
        assert_eq!(parse(""), TaskgateConfig::default());

        let config = parse("login-delay-ms \"soon\"\noutput-format \"yaml\"\nmax-task-length -5");
        assert_eq!(config.login_delay_ms, None);
        assert_eq!(config.output_format, None);
        assert_eq!(config.max_task_length, None);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let bad_lifetime = TaskgateConfig {
            session_lifetime_hours: Some(0),
            ..Default::default()
        };
        assert!(bad_lifetime.validate().unwrap_err().contains("session-lifetime-hours"));

        let huge_lifetime = TaskgateConfig {
            session_lifetime_hours: Some(3_000_000_000),
            ..Default::default()
        };
        assert!(huge_lifetime.validate().unwrap_err().contains("at most"));

        let longest = TaskgateConfig {
            session_lifetime_hours: Some(MAX_SESSION_LIFETIME_HOURS),
            ..Default::default()
        };
        assert!(longest.validate().is_ok());

        let bad_length = TaskgateConfig {
            max_task_length: Some(0),
            ..Default::default()
        };
        assert!(bad_length.validate().is_err());

        let bad_level = TaskgateConfig {
            log_level: Some("loud".to_string()),
            ..Default::default()
        };
        assert!(bad_level.validate().unwrap_err().contains("log-level"));
    }

    #[test]
    fn test_load_from_missing_file_is_empty() {
        let dir = TempDir::new().unwrap();
        let config = TaskgateConfig::load_from(&dir.path().join("config.kdl")).unwrap();
        assert_eq!(config, TaskgateConfig::default());
    }

    #[test]
    fn test_load_from_reports_invalid_values() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.kdl");
        std::fs::write(&path, "session-lifetime-hours -1\n").unwrap();

        let err = TaskgateConfig::load_from(&path).unwrap_err();
        assert!(matches!(err, crate::Error::Config(_)));
    }

    #[test]
    fn test_load_from_reports_syntax_errors() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.kdl");
        std::fs::write(&path, "data-dir \"unterminated\n").unwrap();

        let err = TaskgateConfig::load_from(&path).unwrap_err();
        assert!(matches!(err, crate::Error::Kdl(_)));
    }
}
