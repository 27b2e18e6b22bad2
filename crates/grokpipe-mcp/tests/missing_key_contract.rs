use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::process::Command;

fn grokpipe() -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("grokpipe"));
    // Hermetic: no `.env` autoload and no inherited keys.
    cmd.env("GROKPIPE_DOTENV", "0")
        .env_remove("GROKPIPE_ENV_FILE")
        .env_remove("GROKPIPE_XAI_API_KEY")
        .env_remove("XAI_API_KEY");
    cmd
}

#[test]
fn cli_operation_without_key_fails_before_any_request() {
    grokpipe()
        .args(["ask", "what is rust?"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("XAI_API_KEY"));
}

#[test]
fn shorthand_flag_without_key_fails() {
    grokpipe()
        .args(["--search", "rust"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("XAI_API_KEY"));
}

#[test]
fn mcp_stdio_without_key_fails_at_startup() {
    grokpipe()
        .args(["mcp-stdio"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("XAI_API_KEY"));
}

#[test]
fn blank_key_counts_as_missing() {
    grokpipe()
        .env("XAI_API_KEY", "   ")
        .args(["chat", "hi"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("XAI_API_KEY"));
}

#[test]
fn no_command_exits_with_usage_hint() {
    grokpipe()
        .assert()
        .code(1)
        .stderr(predicate::str::contains("--help"));
}

#[test]
fn doctor_reports_missing_key_without_failing() {
    let out = grokpipe()
        .args(["doctor", "--output", "json"])
        .output()
        .expect("run grokpipe doctor");
    assert!(out.status.success(), "grokpipe doctor failed");
    let v: serde_json::Value =
        serde_json::from_str(&String::from_utf8_lossy(&out.stdout)).expect("parse doctor json");
    assert_eq!(v["schema_version"].as_u64(), Some(1));
    assert_eq!(v["kind"].as_str(), Some("doctor"));
    assert_eq!(v["ok"].as_bool(), Some(false));
    assert_eq!(v["configured"]["xai_api_key"].as_bool(), Some(false));
    assert!(v["error"].as_str().unwrap_or("").contains("XAI_API_KEY"));
    assert!(v.get("elapsed_ms").is_some());
}

#[test]
fn env_file_supplies_the_key() {
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("grok.env");
    std::fs::write(&path, "export XAI_API_KEY=\"from-file-secret\"\n").unwrap();

    let out = grokpipe()
        .env("GROKPIPE_ENV_FILE", &path)
        .args(["doctor", "--output", "json"])
        .output()
        .expect("run grokpipe doctor");
    assert!(out.status.success());
    let s = String::from_utf8_lossy(&out.stdout);
    let v: serde_json::Value = serde_json::from_str(&s).expect("parse doctor json");
    assert_eq!(v["ok"].as_bool(), Some(true));
    assert_eq!(v["configured"]["xai_api_key"].as_bool(), Some(true));
    assert_eq!(v["endpoint_is_default"].as_bool(), Some(true));
    assert!(v["models"]["standard"].is_string());
    // Secrets never reach the output.
    assert!(!s.contains("from-file-secret"));
}
