//! Taskgate - a per-user to-do list core behind a mock session gate.
//!
//! This library provides the session/task persistence and scoping model used
//! by the `tg` CLI and by the browser bindings: a key-value store adapter with
//! in-memory fallback, a static credential directory, a structural session
//! token codec, the session manager, and the owner-scoped task collection.

pub mod auth;
#[cfg(not(target_arch = "wasm32"))]
pub mod cli;
pub mod clock;
#[cfg(not(target_arch = "wasm32"))]
pub mod commands;
pub mod config;
pub mod mail;
pub mod models;
pub mod storage;
pub mod sys;
pub mod tasks;
#[cfg(all(target_arch = "wasm32", feature = "wasm"))]
pub mod wasm;

/// Short git commit the crate was built from (or "unknown").
pub const BUILD_COMMIT: &str = env!("TG_GIT_COMMIT");

/// ISO 8601 timestamp of the build.
pub const BUILD_TIMESTAMP: &str = env!("TG_BUILD_TIMESTAMP");


/// Library-level error type for Taskgate operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Config parse error: {0}")]
    Kdl(#[from] kdl::KdlError),

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Task text must not be empty")]
    EmptyText,

    #[error("Task not found: {0}")]
    NotFound(String),

    #[error("Invalid token format: {0}")]
    InvalidTokenFormat(String),

    #[error("Session expired")]
    SessionExpired,

    #[error("Not logged in: run `tg login` first")]
    NotAuthenticated,

    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),

    #[error("Storage write failed: {0}")]
    StorageWriteFailure(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Message suitable for showing to the person at the keyboard.
    ///
    /// Internal detail (token structure, IO errors) is folded into generic
    /// wording; validation errors keep their specifics.
    pub fn user_message(&self) -> String {
        match self {
            Error::InvalidCredentials => {
                "Invalid username or password. Please try again.".to_string()
            }
            Error::EmptyText => "Please enter a task.".to_string(),
            Error::NotFound(_) => "That task no longer exists.".to_string(),
            Error::InvalidTokenFormat(_) | Error::SessionExpired => {
                "Your session has expired. Please log in again.".to_string()
            }
            Error::NotAuthenticated => "Please log in to continue.".to_string(),
            Error::StorageUnavailable(_) | Error::StorageWriteFailure(_) => {
                "Your changes could not be saved.".to_string()
            }
            Error::InvalidInput(msg) | Error::Config(msg) => msg.clone(),
            other => format!("Something went wrong: {}", other),
        }
    }
}

/// Result type alias for Taskgate operations.
pub type Result<T> = std::result::Result<T, Error>;
