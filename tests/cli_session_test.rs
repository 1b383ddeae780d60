//! Integration tests for login, logout and whoami via CLI.

mod common;

use common::TestEnv;
use predicates::prelude::*;

#[test]
fn test_login_json() {
    let env = TestEnv::new();

    env.tg()
        .args(["login", "admin", "--password", "password123"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"subjectId\":\"1\""))
        .stdout(predicate::str::contains("\"role\":\"admin\""))
        .stdout(predicate::str::contains("\"displayName\":\"Admin\""));
}

#[test]
fn test_login_human() {
    let env = TestEnv::new();

    env.tg()
        .args(["login", "user@example.com", "--password", "user123", "-H"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Logged in as User (user@example.com, user)"));
}

#[test]
fn test_login_password_from_env() {
    let env = TestEnv::new();

    env.tg()
        .args(["login", "demo"])
        .env("TG_PASSWORD", "demo123")
        .assert()
        .success()
        .stdout(predicate::str::contains("\"subjectId\":\"3\""));
}

#[test]
fn test_login_wrong_password() {
    let env = TestEnv::new();

    env.tg()
        .args(["login", "admin", "--password", "nope"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid credentials"));

    env.tg()
        .arg("whoami")
        .assert()
        .success()
        .stdout(predicate::str::contains("\"authenticated\":false"));
}

#[test]
fn test_whoami_after_login() {
    let env = TestEnv::logged_in("demo", "demo123");

    env.tg()
        .arg("whoami")
        .assert()
        .success()
        .stdout(predicate::str::contains("\"authenticated\":true"))
        .stdout(predicate::str::contains("\"state\":\"active\""))
        .stdout(predicate::str::contains("\"alias\":\"demo@example.com\""))
        .stdout(predicate::str::contains("\"expires_in_secs\":"));

    env.tg()
        .args(["whoami", "-H"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Demo <demo@example.com> [user]"))
        .stdout(predicate::str::contains("Session expires in "));
}

#[test]
fn test_whoami_without_session() {
    let env = TestEnv::new();

    env.tg()
        .args(["whoami", "-H"])
        .assert()
        .success()
        .stdout(predicate::str::diff("Not logged in\n"));
}

#[test]
fn test_logout() {
    let env = TestEnv::logged_in("admin", "password123");

    env.tg()
        .arg("logout")
        .assert()
        .success()
        .stdout(predicate::str::contains("\"logged_out\":true"));

    env.tg()
        .args(["task", "list"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Not logged in"));

    env.tg()
        .args(["logout", "-H"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No active session"));
}

#[test]
fn test_session_lifetime_from_config() {
    let env = TestEnv::new();
    env.write_config("session-lifetime-hours 1\n");
    env.login("demo", "demo123");

    env.tg()
        .arg("whoami")
        .assert()
        .success()
        .stdout(predicate::str::contains("\"expires_in_secs\":3"));
}

#[test]
fn test_corrupt_token_ends_session() {
    let env = TestEnv::logged_in("demo", "demo123");

    // Overwrite the persisted token with something that is not a token
    let path = env.data_path().join("store.json");
    let text = std::fs::read_to_string(&path).unwrap();
    let mut store: serde_json::Value = serde_json::from_str(&text).unwrap();
    store["auth_token"] = serde_json::Value::String("not-a-token".to_string());
    std::fs::write(&path, store.to_string()).unwrap();

    env.tg()
        .arg("whoami")
        .assert()
        .success()
        .stdout(predicate::str::contains("\"authenticated\":false"))
        .stdout(predicate::str::contains("\"reason\":\"Your session has expired"));

    // The broken session was cleared, not just ignored
    env.tg()
        .args(["store", "keys"])
        .assert()
        .success()
        .stdout(predicate::str::contains("auth_token").not());
}

#[test]
fn test_session_lifetime_out_of_range_rejected() {
    let env = TestEnv::new();
    env.write_config("session-lifetime-hours 3000000000\n");

    env.tg()
        .args(["login", "demo", "--password", "demo123"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("session-lifetime-hours must be at most"));
}
