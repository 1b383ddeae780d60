//! Data models for Taskgate entities.
//!
//! This module defines the core data structures:
//! - `Identity` - A known user in the credential directory
//! - `Session` - The currently authenticated identity
//! - `Task` - A to-do item owned by one identity
//! - `FilterMode` / `TaskCounts` - Views over an owner's task list
//! - `Page` - Where the UI currently is, for redirect decisions

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Task identifier: creation time in milliseconds, bumped to stay unique.
pub type TaskId = i64;

/// Role carried by an identity and its session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    #[default]
    User,
}

impl Role {
    /// Convert to string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::User => "user",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A directory entry representing a possible logged-in user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    /// Stable subject id
    pub id: &'static str,
    /// Login name
    pub identifier: &'static str,
    /// Email-style alias, also accepted at login
    pub alias: &'static str,
    /// Plain-text secret (mock directory)
    pub secret: &'static str,
    pub role: Role,
}

impl Identity {
    /// Display name derived from the identifier ("admin" -> "Admin").
    pub fn display_name(&self) -> String {
        let mut chars = self.identifier.chars();
        match chars.next() {
            Some(first) => first.to_uppercase().chain(chars).collect(),
            None => String::new(),
        }
    }
}

/// The record of the currently authenticated identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub subject_id: String,
    pub display_name: String,
    /// Email-style alias of the identity
    #[serde(alias = "email")]
    pub alias: String,
    pub role: Role,
    pub authenticated: bool,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub issued_at: DateTime<Utc>,
}

impl Session {
    /// Build an authenticated session for `identity`, issued at `now`.
    pub fn for_identity(identity: &Identity, now: DateTime<Utc>) -> Self {
        Self {
            subject_id: identity.id.to_string(),
            display_name: identity.display_name(),
            alias: identity.alias.to_string(),
            role: identity.role,
            authenticated: true,
            issued_at: now,
        }
    }
}

/// A to-do item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    /// Unique identifier (creation time in ms, bumped on collision)
    pub id: TaskId,

    /// Task text, trimmed, never empty
    pub text: String,

    /// Whether the task is done
    #[serde(default)]
    pub completed: bool,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Subject id of the owning identity
    pub owner_id: String,
}

/// Which tasks a list view shows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterMode {
    #[default]
    All,
    Active,
    Completed,
}

impl FilterMode {
    /// Parse from string, case-insensitive.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "all" => Some(FilterMode::All),
            "active" | "open" | "pending" => Some(FilterMode::Active),
            "completed" | "done" => Some(FilterMode::Completed),
            _ => None,
        }
    }

    /// Whether `task` is shown under this mode.
    pub fn matches(&self, task: &Task) -> bool {
        match self {
            FilterMode::All => true,
            FilterMode::Active => !task.completed,
            FilterMode::Completed => task.completed,
        }
    }

    /// Convert to string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            FilterMode::All => "all",
            FilterMode::Active => "active",
            FilterMode::Completed => "completed",
        }
    }
}

impl fmt::Display for FilterMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Derived counts over an owner's task list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskCounts {
    pub total: usize,
    pub active: usize,
    pub completed: usize,
}

/// A page of the application, for redirect decisions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Page {
    /// The login form
    Login,
    /// The task list
    App,
    /// Anything else (help, about, ...)
    Other(String),
}

impl Page {
    /// Classify a location path such as `/login.html` or `/index.html`.
    pub fn from_path(path: &str) -> Self {
        let file = path.rsplit('/').next().unwrap_or(path);
        match file {
            "login.html" | "login" => Page::Login,
            "" | "index.html" | "app" => Page::App,
            other => Page::Other(other.to_string()),
        }
    }

    /// Path the navigator should load for this page.
    pub fn path(&self) -> String {
        match self {
            Page::Login => "login.html".to_string(),
            Page::App => "index.html".to_string(),
            Page::Other(p) => p.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn admin() -> Identity {
        Identity {
            id: "1",
            identifier: "admin",
            alias: "admin@example.com",
            secret: "password123",
            role: Role::Admin,
        }
    }

    #[test]
    fn test_display_name_capitalizes_identifier() {
        assert_eq!(admin().display_name(), "Admin");
    }

    #[test]
    fn test_session_serializes_camel_case() {
        let at = Utc.timestamp_millis_opt(1_767_225_600_000).unwrap();
        let session = Session::for_identity(&admin(), at);
        let json = serde_json::to_value(&session).unwrap();

        assert_eq!(json["subjectId"], "1");
        assert_eq!(json["displayName"], "Admin");
        assert_eq!(json["role"], "admin");
        assert_eq!(json["authenticated"], true);
        assert_eq!(json["issuedAt"], 1_767_225_600_000_i64);
    }

    #[test]
    fn test_filter_mode_matches() {
        let mut task = Task {
            id: 1,
            text: "Buy milk".to_string(),
            completed: false,
            created_at: Utc::now(),
            owner_id: "1".to_string(),
        };
        assert!(FilterMode::All.matches(&task));
        assert!(FilterMode::Active.matches(&task));
        assert!(!FilterMode::Completed.matches(&task));

        task.completed = true;
        assert!(!FilterMode::Active.matches(&task));
        assert!(FilterMode::Completed.matches(&task));
    }

    #[test]
    fn test_filter_mode_parse() {
        assert_eq!(FilterMode::parse("ALL"), Some(FilterMode::All));
        assert_eq!(FilterMode::parse("done"), Some(FilterMode::Completed));
        assert_eq!(FilterMode::parse("open"), Some(FilterMode::Active));
        assert_eq!(FilterMode::parse("someday"), None);
    }

    #[test]
    fn test_page_from_path() {
        assert_eq!(Page::from_path("/app/login.html"), Page::Login);
        assert_eq!(Page::from_path("/index.html"), Page::App);
        assert_eq!(Page::from_path("/"), Page::App);
        assert_eq!(
            Page::from_path("/help.html"),
            Page::Other("help.html".to_string())
        );
    }
}
