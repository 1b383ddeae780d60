//! Common test utilities for taskgate integration tests.
//!
//! Provides `TestEnv` for isolated test environments that don't pollute
//! the user's `~/.local/share/taskgate/` directory.

#![allow(dead_code)]

use assert_cmd::Command;
pub use tempfile::TempDir;

/// A test environment with isolated data storage.
///
/// The `tg()` method returns a `Command` that sets `TG_DATA_DIR` per
/// invocation, points `TG_CONFIG` at a file inside the environment and turns
/// off the login delay, making tests parallel-safe and fast.
pub struct TestEnv {
    pub data_dir: TempDir,
    pub config_dir: TempDir,
}

impl TestEnv {
    /// Create a new test environment with isolated directories.
    pub fn new() -> Self {
        Self {
            data_dir: TempDir::new().unwrap(),
            config_dir: TempDir::new().unwrap(),
        }
    }

    /// Create a new test environment logged in as `identifier`.
    pub fn logged_in(identifier: &str, password: &str) -> Self {
        let env = Self::new();
        env.login(identifier, password);
        env
    }

    /// Get a Command for the tg binary with isolated data directory.
    pub fn tg(&self) -> Command {
        let mut cmd = Command::new(env!("CARGO_BIN_EXE_tg"));
        cmd.env("TG_DATA_DIR", self.data_dir.path());
        cmd.env("TG_CONFIG", self.config_path());
        cmd.env("TG_LOGIN_DELAY_MS", "0");
        cmd.env_remove("TG_PASSWORD");
        cmd.env_remove("TG_LOG");
        cmd
    }

    /// Log in, asserting success.
    pub fn login(&self, identifier: &str, password: &str) {
        self.tg()
            .args(["login", identifier, "--password", password])
            .assert()
            .success();
    }

    /// Add a task and return its id.
    pub fn add_task(&self, text: &str) -> i64 {
        let output = self.tg().args(["task", "add", text]).output().unwrap();
        assert!(output.status.success(), "task add failed: {:?}", output);
        let task: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
        task["id"].as_i64().unwrap()
    }

    /// Path of the config file `tg` reads (may not exist).
    pub fn config_path(&self) -> std::path::PathBuf {
        self.config_dir.path().join("config.kdl")
    }

    /// Write config.kdl.
    pub fn write_config(&self, content: &str) {
        std::fs::write(self.config_path(), content).unwrap();
    }

    /// Get the path to the data directory.
    pub fn data_path(&self) -> &std::path::Path {
        self.data_dir.path()
    }
}

impl Default for TestEnv {
    fn default() -> Self {
        Self::new()
    }
}
