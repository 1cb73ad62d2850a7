use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;

mod common {
    pub mod test_utils;
}
use common::test_utils::{closed_port_url, StubResponse, StubServer};

fn blockly_check() -> Command {
    let mut cmd = Command::cargo_bin("blockly-check").unwrap();
    for var in [
        "BLOCKLY_CHECK_CONFIG",
        "BLOCKLY_CHECK_URL",
        "BLOCKLY_CHECK_FALLBACK",
        "BLOCKLY_CHECK_QUICK",
        "RUST_LOG",
    ] {
        cmd.env_remove(var);
    }
    cmd
}

const FAILING_RESULT: &str = r#"{"result": {
    "success": false,
    "errors": [{"level": "error", "message": "cannot find value `x`", "code": "E0425", "file": "src/main.rs", "line": 3, "column": 5}],
    "warnings": [{"level": "warning", "message": "unused variable", "file": "src/main.rs", "line": 5, "column": 1}]
}}"#;

#[test]
fn no_backend_exits_with_two() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let file = dir.path().join("main.rs");
    fs::write(&file, "fn main() {}")?;

    blockly_check()
        .arg(&file)
        .args(["--url", &closed_port_url(), "--no-fallback"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("no backend available"));
    Ok(())
}

#[test]
fn clean_check_prints_success_line() {
    let server = StubServer::start(|_| StubResponse::json(r#"{"result": {"success": true}}"#));
    blockly_check()
        .args(["--url", &server.url(), "--no-fallback"])
        .write_stdin("fn main() {}")
        .assert()
        .success()
        .stdout(predicate::str::contains(blockly_check::e_fmt::SUCCESS_LINE));
}

#[test]
fn errors_exit_with_one_and_list_diagnostics() {
    let server = StubServer::start(|_| StubResponse::json(FAILING_RESULT));
    blockly_check()
        .args(["--url", &server.url(), "--no-fallback", "-"])
        .write_stdin("fn main() { x; }")
        .assert()
        .code(1)
        .stdout(predicate::str::contains("1 error:"))
        .stdout(predicate::str::contains("src/main.rs:3:5: [E0425] cannot find value `x`"))
        .stdout(predicate::str::contains("1 warning:"));
}

#[test]
fn json_line_filter() {
    let server = StubServer::start(|_| StubResponse::json(FAILING_RESULT));
    let output = blockly_check()
        .args(["--url", &server.url(), "--no-fallback", "--json", "--line", "5"])
        .write_stdin("fn main() { x; }")
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(1));
    let diags: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let diags = diags.as_array().unwrap();
    assert_eq!(diags.len(), 1);
    assert_eq!(diags[0]["level"], "warning");
    assert_eq!(diags[0]["line"], 5);
}

#[test]
fn quick_flag_and_deps_reach_the_service() {
    let server = StubServer::start(|_| StubResponse::json(r#"{"result": {"success": true}}"#));
    blockly_check()
        .args(["--url", &server.url(), "--no-fallback", "--quick", "--dep", "rand=0.8", "--json"])
        .write_stdin("fn main() {}")
        .assert()
        .success()
        .stdout(predicate::str::contains("\"success\": true"));
    let body: serde_json::Value = serde_json::from_str(&server.hits()[0].body).unwrap();
    assert_eq!(body["quick_check"], true);
    assert_eq!(body["dependencies"][0]["version"], "0.8");
}

#[test]
fn config_file_supplies_the_url() -> Result<(), Box<dyn std::error::Error>> {
    let server = StubServer::start(|_| StubResponse::json(r#"{"result": {"success": true}}"#));
    let dir = tempfile::tempdir()?;
    let config = dir.path().join("check.toml");
    fs::write(
        &config,
        format!("primary_url = \"{}\"\nfallback_enabled = false\n", server.url()),
    )?;
    blockly_check()
        .arg("--config")
        .arg(&config)
        .write_stdin("fn main() {}")
        .assert()
        .success();
    assert_eq!(server.count("/check"), 1);
    Ok(())
}

#[test]
fn probe_reports_availability() {
    let server = StubServer::start(|_| StubResponse::json(r#"{"status": "ok", "rust_available": true}"#));
    blockly_check()
        .args(["--url", &server.url(), "--probe"])
        .assert()
        .success()
        .stdout(predicate::str::contains("available"));

    blockly_check()
        .args(["--url", &closed_port_url(), "--probe"])
        .assert()
        .code(2)
        .stdout(predicate::str::contains("unavailable"));
}

#[test]
fn wgsl_mode_checks_shader_attributes() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let shader = dir.path().join("shader.wgsl");
    fs::write(&shader, "@compute @workgroup_size(64)\nfn main() {}\n")?;
    blockly_check()
        .arg("--wgsl")
        .arg(&shader)
        .args(["--url", &closed_port_url(), "--no-fallback"])
        .assert()
        .success()
        .stdout(predicate::str::contains(blockly_check::e_fmt::SUCCESS_LINE));

    fs::write(&shader, "@compute\nfn main() {}\n")?;
    blockly_check()
        .arg("-w")
        .arg(&shader)
        .assert()
        .code(1)
        .stdout(predicate::str::contains("missing @workgroup_size attribute"))
        .stdout(predicate::str::contains(":1:1"));
    Ok(())
}

#[test]
fn wgsl_mode_reads_stdin_as_json() {
    let output = blockly_check()
        .args(["--wgsl", "--json"])
        .write_stdin("fn main() {}")
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(1));
    let result: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(result["success"], false);
    assert_eq!(result["errors"][0]["message"], "missing @compute attribute");
}
