//! Command implementations for the Taskgate CLI.
//!
//! Each command opens what it needs from a [`Context`], does its work through
//! the library, and returns a result struct that renders as JSON or as text
//! for humans through [`CommandResult`].

use crate::auth::{SessionManager, SessionState};
use crate::clock::{Clock, SystemClock};
use crate::config::{ResolvedConfig, TaskgateConfig};
use crate::mail;
use crate::models::{FilterMode, Session, Task, TaskCounts, TaskId};
use crate::storage::KvStore;
use crate::tasks::TaskStore;
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;

/// Command results that can be serialized to JSON or formatted for humans.
pub trait CommandResult {
    /// Serialize to JSON string.
    fn to_json(&self) -> String;

    /// Format for human-readable output.
    fn to_human(&self) -> String;
}

fn json<T: Serialize>(value: &T) -> String {
    serde_json::to_string(value).unwrap_or_else(|e| format!(r#"{{"error":"{}"}}"#, e))
}

/// Everything a command needs: resolved settings, the store and a clock.
pub struct Context {
    pub config: ResolvedConfig,
    pub store: Arc<KvStore>,
    pub clock: Arc<dyn Clock>,
}

impl Context {
    /// Open the store in the configured data directory.
    pub fn open(config: ResolvedConfig) -> Self {
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let store = Arc::new(KvStore::open(&config.data_dir.value));
        Self {
            config,
            store,
            clock,
        }
    }

    /// Build a context around an existing store.
    pub fn with_store(config: ResolvedConfig, store: Arc<KvStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            config,
            store,
            clock,
        }
    }

    fn session_manager(&self) -> SessionManager {
        SessionManager::builder(self.store.clone())
            .clock(self.clock.clone())
            .lifetime(self.config.session_lifetime())
            .login_delay(self.config.login_delay())
            .build()
    }

    /// Restore the persisted session, failing unless it is authenticated.
    fn authenticated(&self) -> Result<SessionManager> {
        let mut session = self.session_manager();
        session.restore()?;
        Ok(session)
    }

    /// The authenticated session's task list.
    fn task_store(&self, session: &SessionManager) -> Result<TaskStore> {
        let mut tasks = TaskStore::new(self.store.clone(), self.clock.clone())
            .with_max_length(self.config.max_task_length.value);
        tasks.load_active(session)?;
        Ok(tasks)
    }
}

fn subject(session: &SessionManager) -> Result<String> {
    session
        .active_subject()
        .map(String::from)
        .ok_or(Error::NotAuthenticated)
}

// === Session ===

#[derive(Serialize)]
pub struct LoginResult {
    pub session: Session,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub expires_at: DateTime<Utc>,
}

impl CommandResult for LoginResult {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        format!(
            "Logged in as {} ({}, {})\nSession expires {}",
            self.session.display_name,
            self.session.alias,
            self.session.role,
            self.expires_at.format("%Y-%m-%d %H:%M:%S UTC")
        )
    }
}

/// Log in as `identifier`, replacing any current session.
pub async fn login(ctx: &Context, identifier: &str, password: &str) -> Result<LoginResult> {
    let mut manager = ctx.session_manager();
    let session = manager.login(identifier, password).await?;
    let remaining = manager
        .time_remaining()
        .unwrap_or_else(chrono::Duration::zero);
    let expires_at = ctx.clock.now() + remaining;
    Ok(LoginResult {
        session,
        expires_at,
    })
}

#[derive(Serialize)]
pub struct LogoutResult {
    pub logged_out: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject_id: Option<String>,
}

impl CommandResult for LogoutResult {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        if self.logged_out {
            "Logged out".to_string()
        } else {
            "No active session".to_string()
        }
    }
}

/// End the current session, if there is one.
pub fn logout(ctx: &Context) -> Result<LogoutResult> {
    let mut manager = ctx.session_manager();
    manager.initialize();
    let subject_id = manager.current_session().map(|s| s.subject_id.clone());
    manager.logout();
    Ok(LogoutResult {
        logged_out: subject_id.is_some(),
        subject_id,
    })
}

#[derive(Serialize)]
pub struct WhoamiResult {
    pub authenticated: bool,
    pub state: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session: Option<Session>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub login_time: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_in_secs: Option<i64>,
    /// Why there is no session, when there isn't one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl CommandResult for WhoamiResult {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        let Some(ref session) = self.session else {
            return match self.reason {
                Some(ref reason) => format!("Not logged in ({})", reason),
                None => "Not logged in".to_string(),
            };
        };

        let mut lines = vec![format!(
            "{} <{}> [{}]",
            session.display_name, session.alias, session.role
        )];
        if let Some(login_time) = self.login_time {
            lines.push(format!(
                "Logged in at {}",
                login_time.format("%Y-%m-%d %H:%M:%S UTC")
            ));
        }
        if let Some(secs) = self.expires_in_secs {
            lines.push(format!(
                "Session expires in {}h {:02}m",
                secs / 3600,
                (secs % 3600) / 60
            ));
        }
        lines.join("\n")
    }
}

fn state_name(state: SessionState) -> &'static str {
    match state {
        SessionState::NoSession => "no_session",
        SessionState::Active => "active",
        SessionState::Expired => "expired",
    }
}

/// Describe the current session.
pub fn whoami(ctx: &Context) -> Result<WhoamiResult> {
    let mut manager = ctx.session_manager();
    let reason = match manager.restore() {
        Ok(()) | Err(Error::NotAuthenticated) => None,
        Err(e) => Some(e.user_message()),
    };

    Ok(WhoamiResult {
        authenticated: manager.is_authenticated(),
        state: state_name(manager.state()),
        session: manager.current_session().cloned(),
        login_time: manager.login_time(),
        expires_in_secs: manager.time_remaining().map(|d| d.num_seconds()),
        reason,
    })
}

// === Tasks ===

pub struct TaskResult {
    pub task: Task,
}

impl CommandResult for TaskResult {
    fn to_json(&self) -> String {
        json(&self.task)
    }

    fn to_human(&self) -> String {
        format_task_line(&self.task)
    }
}

fn format_task_line(task: &Task) -> String {
    let mark = if task.completed { "x" } else { " " };
    format!("[{}] {} {}", mark, task.id, task.text)
}

/// Add a task for the logged-in identity.
pub fn task_add(ctx: &Context, text: &str) -> Result<TaskResult> {
    let session = ctx.authenticated()?;
    let mut tasks = ctx.task_store(&session)?;
    let task = tasks.add(&subject(&session)?, text)?;
    Ok(TaskResult { task })
}

#[derive(Serialize)]
pub struct TaskListResult {
    pub filter: FilterMode,
    pub tasks: Vec<Task>,
    pub counts: TaskCounts,
}

impl CommandResult for TaskListResult {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        let mut lines: Vec<String> = self.tasks.iter().map(format_task_line).collect();
        if lines.is_empty() {
            lines.push(match self.filter {
                FilterMode::All => "No tasks yet".to_string(),
                mode => format!("No {} tasks", mode),
            });
        }
        lines.push(String::new());
        lines.push(format_counts(&self.counts));
        lines.join("\n")
    }
}

fn format_counts(counts: &TaskCounts) -> String {
    format!(
        "{} total, {} active, {} completed",
        counts.total, counts.active, counts.completed
    )
}

/// List the logged-in identity's tasks under `filter`.
pub fn task_list(ctx: &Context, filter: &str) -> Result<TaskListResult> {
    let mode = FilterMode::parse(filter).ok_or_else(|| {
        Error::InvalidInput(format!(
            "Unknown filter '{}': use all, active or completed",
            filter
        ))
    })?;
    let session = ctx.authenticated()?;
    let tasks = ctx.task_store(&session)?;
    Ok(TaskListResult {
        filter: mode,
        tasks: tasks.filter(mode),
        counts: tasks.counts(),
    })
}

/// Flip a task between active and completed.
pub fn task_toggle(ctx: &Context, id: TaskId) -> Result<TaskResult> {
    let session = ctx.authenticated()?;
    let mut tasks = ctx.task_store(&session)?;
    let task = tasks.toggle(id)?;
    Ok(TaskResult { task })
}

#[derive(Serialize)]
pub struct TaskRemoved {
    pub id: TaskId,
    pub removed: bool,
}

impl CommandResult for TaskRemoved {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        format!("Removed task {}", self.id)
    }
}

/// Delete a task.
pub fn task_remove(ctx: &Context, id: TaskId) -> Result<TaskRemoved> {
    let session = ctx.authenticated()?;
    let mut tasks = ctx.task_store(&session)?;
    tasks.remove(id)?;
    Ok(TaskRemoved { id, removed: true })
}

#[derive(Serialize)]
pub struct ClearCompletedResult {
    pub removed: usize,
}

impl CommandResult for ClearCompletedResult {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        match self.removed {
            0 => "No completed tasks to clear".to_string(),
            1 => "Cleared 1 completed task".to_string(),
            n => format!("Cleared {} completed tasks", n),
        }
    }
}

/// Delete every completed task.
pub fn task_clear_completed(ctx: &Context) -> Result<ClearCompletedResult> {
    let session = ctx.authenticated()?;
    let mut tasks = ctx.task_store(&session)?;
    Ok(ClearCompletedResult {
        removed: tasks.clear_completed(),
    })
}

pub struct CountsResult {
    pub counts: TaskCounts,
}

impl CommandResult for CountsResult {
    fn to_json(&self) -> String {
        json(&self.counts)
    }

    fn to_human(&self) -> String {
        format_counts(&self.counts)
    }
}

/// Totals for the logged-in identity.
pub fn task_counts(ctx: &Context) -> Result<CountsResult> {
    let session = ctx.authenticated()?;
    let tasks = ctx.task_store(&session)?;
    Ok(CountsResult {
        counts: tasks.counts(),
    })
}

// === Mail ===

#[derive(Serialize)]
pub struct MailResult {
    pub subject: String,
    pub url: String,
    pub opened: bool,
}

impl CommandResult for MailResult {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        if self.opened {
            format!("Opened draft \"{}\" in your mail client", self.subject)
        } else {
            self.url.clone()
        }
    }
}

/// Draft an email of completed tasks; open it unless `print_only`.
pub fn mail(ctx: &Context, to: Option<&str>, print_only: bool) -> Result<MailResult> {
    let session = ctx.authenticated()?;
    let current = session.current_session().ok_or(Error::NotAuthenticated)?;
    let tasks = ctx.task_store(&session)?;
    let draft = mail::compose_completed_summary(
        current,
        &tasks.filter(FilterMode::Completed),
        to,
    )?;
    if !print_only {
        mail::open_draft(&draft)?;
    }
    Ok(MailResult {
        url: draft.mailto_url(),
        subject: draft.subject,
        opened: !print_only,
    })
}

// === Store ===

#[derive(Serialize)]
pub struct StoreKeysResult {
    pub keys: Vec<String>,
    pub count: usize,
}

impl CommandResult for StoreKeysResult {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        if self.keys.is_empty() {
            "No keys stored".to_string()
        } else {
            self.keys.join("\n")
        }
    }
}

/// List stored keys, optionally under `prefix`.
pub fn store_keys(ctx: &Context, prefix: Option<&str>) -> Result<StoreKeysResult> {
    let keys = ctx.store.list_keys(prefix);
    Ok(StoreKeysResult {
        count: keys.len(),
        keys,
    })
}

#[derive(Serialize)]
pub struct StoreInfoResult {
    pub backend: String,
    pub location: String,
    pub available: bool,
    pub keys: usize,
}

impl CommandResult for StoreInfoResult {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        let mut out = format!(
            "Backend:  {}\nLocation: {}\nKeys:     {}",
            self.backend, self.location, self.keys
        );
        if !self.available {
            out.push_str("\nWarning: storage unavailable, changes will not persist");
        }
        out
    }
}

/// Describe the store in use.
pub fn store_info(ctx: &Context) -> Result<StoreInfoResult> {
    Ok(StoreInfoResult {
        backend: ctx.store.backend_type().to_string(),
        location: ctx.store.location(),
        available: ctx.store.is_available(),
        keys: ctx.store.list_keys(None).len(),
    })
}

// === Config ===

#[derive(Serialize)]
pub struct ConfigEntry {
    pub key: &'static str,
    pub value: String,
    pub source: String,
}

#[derive(Serialize)]
pub struct ConfigShowResult {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config_path: Option<PathBuf>,
    pub settings: Vec<ConfigEntry>,
}

impl CommandResult for ConfigShowResult {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        let mut lines = Vec::new();
        if let Some(ref path) = self.config_path {
            lines.push(format!("Config file: {}", path.display()));
        }
        for entry in &self.settings {
            lines.push(format!(
                "{:<24} {}  ({})",
                entry.key, entry.value, entry.source
            ));
        }
        lines.join("\n")
    }
}

/// Show the resolved configuration and the source of each value.
pub fn config_show(config: &ResolvedConfig, config_path: Option<PathBuf>) -> Result<ConfigShowResult> {
    fn entry(
        key: &'static str,
        value: impl ToString,
        source: &crate::config::ValueSource,
    ) -> ConfigEntry {
        ConfigEntry {
            key,
            value: value.to_string(),
            source: source.to_string(),
        }
    }

    let settings = vec![
        entry(
            "data-dir",
            config.data_dir.value.display(),
            &config.data_dir.source,
        ),
        entry(
            "session-lifetime-hours",
            config.session_lifetime_hours.value,
            &config.session_lifetime_hours.source,
        ),
        entry(
            "login-delay-ms",
            config.login_delay_ms.value,
            &config.login_delay_ms.source,
        ),
        entry(
            "max-task-length",
            config.max_task_length.value,
            &config.max_task_length.source,
        ),
        entry(
            "log-level",
            &config.log_level.value,
            &config.log_level.source,
        ),
        entry(
            "output-format",
            config.output_format.value,
            &config.output_format.source,
        ),
    ];

    Ok(ConfigShowResult {
        config_path,
        settings,
    })
}

#[derive(Serialize)]
pub struct BuildInfoResult {
    pub version: &'static str,
    pub commit: &'static str,
    pub built: &'static str,
}

impl CommandResult for BuildInfoResult {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        format!(
            "Version: {}\nCommit:  {}\nBuilt:   {}",
            self.version, self.commit, self.built
        )
    }
}

/// Version and provenance of this binary.
pub fn build_info() -> BuildInfoResult {
    BuildInfoResult {
        version: env!("CARGO_PKG_VERSION"),
        commit: crate::BUILD_COMMIT,
        built: crate::BUILD_TIMESTAMP,
    }
}

/// Read config.kdl from `path`, or the empty config when there is none.
pub fn load_file_config(path: Option<&std::path::Path>) -> Result<TaskgateConfig> {
    match path {
        Some(path) => TaskgateConfig::load_from(path),
        None => Ok(TaskgateConfig::default()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::config::{ConfigOverrides, resolve_config_with_env};
    use crate::storage::MemoryBackend;
    use chrono::{Duration, TimeZone};

    fn context() -> (Context, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap(),
        ));
        let env = |name: &str| (name == crate::config::LOGIN_DELAY_ENV).then(|| "0".to_string());
        let config = resolve_config_with_env(
            &TaskgateConfig::default(),
            &ConfigOverrides::new().with_data_dir("/unused"),
            env,
        );
        let store = Arc::new(KvStore::new(Box::new(MemoryBackend::new())));
        (Context::with_store(config, store, clock.clone()), clock)
    }

    #[tokio::test]
    async fn test_task_commands_require_login() {
        let (ctx, _) = context();
        assert!(matches!(task_add(&ctx, "x"), Err(Error::NotAuthenticated)));
        assert!(matches!(task_list(&ctx, "all"), Err(Error::NotAuthenticated)));
        assert!(matches!(task_counts(&ctx), Err(Error::NotAuthenticated)));
    }

    #[tokio::test]
    async fn test_login_then_task_flow() {
        let (ctx, _) = context();
        let result = login(&ctx, "demo", "demo123").await.unwrap();
        assert_eq!(result.session.subject_id, "3");
        assert!(result.to_human().starts_with("Logged in as Demo"));

        let a = task_add(&ctx, "Buy milk").unwrap().task;
        task_add(&ctx, "Walk dog").unwrap();
        task_toggle(&ctx, a.id).unwrap();

        let active = task_list(&ctx, "active").unwrap();
        assert_eq!(active.tasks.len(), 1);
        assert_eq!(active.tasks[0].text, "Walk dog");
        assert_eq!(active.counts.completed, 1);

        assert_eq!(task_clear_completed(&ctx).unwrap().removed, 1);
        assert_eq!(task_counts(&ctx).unwrap().counts.total, 1);
    }

    #[tokio::test]
    async fn test_unknown_filter_rejected() {
        let (ctx, _) = context();
        login(&ctx, "demo", "demo123").await.unwrap();
        assert!(matches!(
            task_list(&ctx, "someday"),
            Err(Error::InvalidInput(_))
        ));
    }

    #[tokio::test]
    async fn test_whoami_reports_expiry() {
        let (ctx, clock) = context();
        assert!(!whoami(&ctx).unwrap().authenticated);

        login(&ctx, "admin", "password123").await.unwrap();
        let me = whoami(&ctx).unwrap();
        assert!(me.authenticated);
        assert_eq!(me.state, "active");
        assert_eq!(me.expires_in_secs, Some(24 * 3600));
        assert_eq!(me.login_time, Some(clock.now()));

        clock.advance(Duration::hours(25));
        let me = whoami(&ctx).unwrap();
        assert!(!me.authenticated);
        assert_eq!(me.state, "no_session");
        assert!(me.reason.is_some());
        assert!(matches!(task_counts(&ctx), Err(Error::NotAuthenticated)));
    }

    #[tokio::test]
    async fn test_logout() {
        let (ctx, _) = context();
        assert!(!logout(&ctx).unwrap().logged_out);

        login(&ctx, "user", "user123").await.unwrap();
        let result = logout(&ctx).unwrap();
        assert!(result.logged_out);
        assert_eq!(result.subject_id.as_deref(), Some("2"));
        assert!(!whoami(&ctx).unwrap().authenticated);
    }

    #[tokio::test]
    async fn test_mail_print_only() {
        let (ctx, _) = context();
        login(&ctx, "demo", "demo123").await.unwrap();
        assert!(matches!(mail(&ctx, None, true), Err(Error::InvalidInput(_))));

        let task = task_add(&ctx, "Ship it").unwrap().task;
        task_toggle(&ctx, task.id).unwrap();
        let result = mail(&ctx, Some("team@example.com"), true).unwrap();
        assert!(!result.opened);
        assert!(result.url.starts_with("mailto:team%40example.com?subject="));
        assert_eq!(result.to_human(), result.url);
    }

    #[tokio::test]
    async fn test_store_keys_and_info() {
        let (ctx, _) = context();
        login(&ctx, "demo", "demo123").await.unwrap();
        task_add(&ctx, "Buy milk").unwrap();

        let keys = store_keys(&ctx, None).unwrap();
        assert_eq!(
            keys.keys,
            vec!["auth_token", "current_user", "login_time", "tasks_3"]
        );
        assert_eq!(store_keys(&ctx, Some("tasks_")).unwrap().count, 1);

        let info = store_info(&ctx).unwrap();
        assert_eq!(info.backend, "memory");
        assert!(info.available);
        assert_eq!(info.keys, 4);
    }

    #[test]
    fn test_config_show_lists_sources() {
        let (ctx, _) = context();
        let result = config_show(&ctx.config, None).unwrap();
        let data_dir = &result.settings[0];
        assert_eq!(data_dir.key, "data-dir");
        assert_eq!(data_dir.value, "/unused");
        assert_eq!(data_dir.source, "cli");
        assert!(result.to_human().contains("login-delay-ms"));
    }

    #[test]
    fn test_build_info_reports_package_version() {
        let info = build_info();
        assert_eq!(info.version, env!("CARGO_PKG_VERSION"));
        assert!(!info.commit.is_empty());
        assert!(info.to_human().starts_with("Version: "));
    }
}
