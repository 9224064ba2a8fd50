// crates/ntropy-mcp-cli/tests/cli_commands.rs
// ============================================================================
// Module: CLI Command Tests
// Description: Integration tests driving the ntropy-mcp binary.
// Purpose: Ensure credentials fail closed and one-shot calls print results.
// Dependencies: ntropy-mcp-cli binary, tempfile, tiny_http
// ============================================================================
//! ## Overview
//! Runs the compiled binary in an isolated working directory with the
//! credential and config environment variables cleared.

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    clippy::missing_docs_in_private_items,
    reason = "Test-only output and panic-based assertions are permitted."
)]

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs;
use std::path::Path;
use std::path::PathBuf;
use std::process::Command;
use std::process::Output;
use std::sync::Arc;
use std::thread;

use serde_json::Value;
use serde_json::json;
use tempfile::TempDir;
use tiny_http::Response;
use tiny_http::Server;

// ============================================================================
// SECTION: Helpers
// ============================================================================

fn ntropy_bin() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_ntropy-mcp"))
}

fn run_in(dir: &Path, args: &[&str]) -> Output {
    Command::new(ntropy_bin())
        .args(args)
        .current_dir(dir)
        .env_remove("NTROPY_API_KEY")
        .env_remove("NTROPY_MCP_CONFIG")
        .output()
        .expect("run ntropy-mcp")
}

fn stdout_json(output: &Output) -> Value {
    serde_json::from_slice(&output.stdout).expect("stdout json")
}

fn write_config(dir: &TempDir, body: &str) -> PathBuf {
    let path = dir.path().join("ntropy-mcp.toml");
    fs::write(&path, body.trim()).expect("write config");
    path
}

/// Serves one fixed reply and reports each request's path and API key.
fn mock_remote(status: u16, body: Value) -> (String, Arc<Server>, thread::JoinHandle<Vec<String>>) {
    let server = Arc::new(Server::http("127.0.0.1:0").unwrap());
    let addr = server.server_addr().to_ip().unwrap();
    let worker = Arc::clone(&server);
    let handle = thread::spawn(move || {
        let mut seen = Vec::new();
        for mut request in worker.incoming_requests() {
            let mut sink = String::new();
            let _ = request.as_reader().read_to_string(&mut sink);
            let key = request
                .headers()
                .iter()
                .find(|header| header.field.equiv("X-API-Key"))
                .map(|header| header.value.as_str().to_string())
                .unwrap_or_default();
            seen.push(format!("{} {}", request.url(), key));
            let response = Response::from_string(body.to_string()).with_status_code(status);
            let _ = request.respond(response);
        }
        seen
    });
    (format!("http://{addr}"), server, handle)
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[test]
fn tools_list_prints_catalogue_as_json() {
    let dir = TempDir::new().unwrap();
    let output = run_in(dir.path(), &["tools", "list", "--format", "json"]);
    assert!(output.status.success());
    let tools = stdout_json(&output);
    let names: Vec<&str> =
        tools.as_array().unwrap().iter().map(|tool| tool["name"].as_str().unwrap()).collect();
    assert_eq!(names.len(), 8);
    assert!(names.contains(&"bulk_enrich_transactions"));
    assert!(tools[0]["inputSchema"].is_object());
}

#[test]
fn serve_without_credential_fails_closed() {
    let dir = TempDir::new().unwrap();
    let output = run_in(dir.path(), &["serve"]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("missing api key"), "stderr: {stderr}");
}

#[test]
fn config_validate_reports_invalid_files() {
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, "[remote]\nmax_attempts = 0\n");
    let output = run_in(dir.path(), &["config", "validate", "--config", path.to_str().unwrap()]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("max_attempts"));

    let path = write_config(&dir, "[server]\ntransport = \"http\"\nbind = \"127.0.0.1:8080\"\n");
    let output = run_in(dir.path(), &["config", "validate", "--config", path.to_str().unwrap()]);
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("transport=http"));
}

#[test]
fn tools_call_rejects_invalid_arguments_before_remote() {
    let dir = TempDir::new().unwrap();
    let output = run_in(dir.path(), &[
        "tools",
        "call",
        "get_transaction",
        "--input",
        r#"{"transaction_id": true}"#,
        "--api-key",
        "cli-key",
    ]);
    assert!(!output.status.success());
    let body = stdout_json(&output);
    assert_eq!(body["error"]["kind"], json!("type_mismatch"));
    assert_eq!(body["error"]["field"], json!("transaction_id"));
}

#[test]
fn tools_call_prints_remote_result() {
    let holder = json!({ "id": "acc_7", "type": "consumer", "name": "Kai" });
    let (base_url, server, handle) = mock_remote(200, holder.clone());
    let dir = TempDir::new().unwrap();
    write_config(
        &dir,
        &format!(
            "[server.audit]\nenabled = false\n\n[remote]\nbase_url = \"{base_url}\"\napi_key = \
             \"file-key\"\n"
        ),
    );

    let output = run_in(dir.path(), &[
        "tools",
        "call",
        "get_account_holder",
        "--input",
        r#"{"account_holder_id": "acc_7"}"#,
    ]);
    server.unblock();
    let seen = handle.join().unwrap();

    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    assert_eq!(stdout_json(&output), holder);
    assert_eq!(seen, vec!["/v3/account_holders/acc_7 file-key".to_string()]);
}
