// crates/ntropy-mcp/tests/end_to_end.rs
// ============================================================================
// Module: End-to-End Tests
// Description: Server built from configuration against a local mock API.
// Purpose: Validate config wiring, credentials, retries, and audit output.
// Dependencies: ntropy-mcp, ntropy-mcp-config, tempfile, tiny_http
// ============================================================================

//! Configuration-to-remote integration tests.

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::missing_docs_in_private_items,
    reason = "Test-only assertions and helpers."
)]

mod common;

use std::io::Cursor;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::thread;
use std::time::Duration;

use ntropy_mcp::McpServer;
use ntropy_mcp::client_config_from;
use ntropy_mcp_config::ServiceConfig;
use serde_json::Value;
use serde_json::json;
use tiny_http::Response;
use tiny_http::Server;

use crate::common::call_request;

const API_KEY: &str = "e2e-key-456";

// ============================================================================
// SECTION: Mock Remote
// ============================================================================

/// Request line and credential seen by the mock.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Seen {
    method: String,
    url: String,
    api_key: Option<String>,
}

struct Remote {
    server: Arc<Server>,
    base_url: String,
    seen: Arc<Mutex<Vec<Seen>>>,
}

impl Remote {
    /// Serves `(status, body)` replies in order, repeating the last one.
    fn scripted(replies: Vec<(u16, Value)>) -> Self {
        let server = Arc::new(Server::http("127.0.0.1:0").unwrap());
        let addr = server.server_addr().to_ip().unwrap();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let worker = Arc::clone(&server);
        let worker_seen = Arc::clone(&seen);
        let next = AtomicUsize::new(0);
        thread::spawn(move || {
            for mut request in worker.incoming_requests() {
                let mut body = String::new();
                let _ = request.as_reader().read_to_string(&mut body);
                let api_key = request
                    .headers()
                    .iter()
                    .find(|header| header.field.equiv("X-API-Key"))
                    .map(|header| header.value.as_str().to_string());
                worker_seen.lock().unwrap().push(Seen {
                    method: request.method().as_str().to_uppercase(),
                    url: request.url().to_string(),
                    api_key,
                });
                let index = next.fetch_add(1, Ordering::SeqCst).min(replies.len() - 1);
                let (status, body) = &replies[index];
                let response = Response::from_string(body.to_string()).with_status_code(*status);
                let _ = request.respond(response);
            }
        });
        Self { server, base_url: format!("http://{addr}"), seen }
    }

    fn seen(&self) -> Vec<Seen> {
        self.seen.lock().unwrap().clone()
    }
}

impl Drop for Remote {
    fn drop(&mut self) {
        self.server.unblock();
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

fn config_for(base_url: &str, audit: &str) -> ServiceConfig {
    ServiceConfig::from_toml_str(&format!(
        r#"
[server]
transport = "stdio"
max_body_bytes = 65536

[server.audit]
{audit}

[remote]
base_url = "{base_url}"
timeout_ms = 5000
max_attempts = 3
initial_backoff_ms = 1
max_backoff_ms = 5
"#
    ))
    .unwrap()
}

fn run(server: &McpServer, requests: &[Value]) -> Vec<Value> {
    let input: String = requests.iter().map(|request| format!("{request}\n")).collect();
    let mut output = Vec::new();
    server.serve_stream(Cursor::new(input.into_bytes()), &mut output).unwrap();
    String::from_utf8(output)
        .unwrap()
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect()
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[test]
fn tool_call_reaches_remote_with_credentials() {
    let holder = json!({ "id": "acc_1", "type": "business", "name": "Acme" });
    let remote = Remote::scripted(vec![(200, holder.clone())]);
    let config = config_for(&remote.base_url, "enabled = false");
    let server = McpServer::from_config(config, API_KEY.to_string()).unwrap();

    let args = json!({ "account_holder_id": "acc_1" });
    let replies = run(&server, &[call_request(1, "get_account_holder", &args)]);
    assert_eq!(replies[0]["result"]["structuredContent"], holder);

    let seen = remote.seen();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].method, "GET");
    assert_eq!(seen[0].url, "/v3/account_holders/acc_1");
    assert_eq!(seen[0].api_key.as_deref(), Some(API_KEY));
}

#[test]
fn remote_not_found_is_reported_with_entity() {
    let remote = Remote::scripted(vec![(404, json!({ "detail": "Not found" }))]);
    let config = config_for(&remote.base_url, "enabled = false");
    let server = McpServer::from_config(config, API_KEY.to_string()).unwrap();

    let replies = run(&server, &[
        call_request(1, "get_transaction", &json!({ "transaction_id": "tx_1" })),
        call_request(2, "delete_transaction", &json!({ "transaction_id": "tx_1" })),
    ]);
    assert_eq!(replies[0]["result"]["isError"], json!(true));
    let error = &replies[0]["result"]["structuredContent"]["error"];
    assert_eq!(error["code"], json!(-32004));
    assert_eq!(error["entity"], json!("transaction"));
    assert_eq!(error["id"], json!("tx_1"));
    assert_eq!(error["source_status"], json!(404));

    assert_eq!(replies[1]["result"]["structuredContent"]["existed"], json!(false));
    assert_eq!(replies[1]["result"]["isError"], json!(false));
}

#[test]
fn retries_and_requests_are_audited_to_file() {
    let dir = tempfile::tempdir().unwrap();
    let audit_path = dir.path().join("audit.jsonl");
    let holder = json!({ "id": "acc_1", "type": "consumer", "name": "Ada" });
    let remote = Remote::scripted(vec![(503, json!({ "detail": "busy" })), (200, holder)]);
    let audit = format!("enabled = true\npath = {:?}", audit_path.display().to_string());
    let config = config_for(&remote.base_url, &audit);
    let server = McpServer::from_config(config, API_KEY.to_string()).unwrap();

    let args = json!({ "account_holder_id": "acc_1" });
    let replies = run(&server, &[call_request(1, "get_account_holder", &args)]);
    assert_eq!(replies[0]["result"]["structuredContent"]["name"], json!("Ada"));
    assert_eq!(remote.seen().len(), 2);

    let log = std::fs::read_to_string(&audit_path).unwrap();
    let events: Vec<Value> = log.lines().map(|line| serde_json::from_str(line).unwrap()).collect();
    assert_eq!(events.len(), 2);
    assert_eq!(events[0]["event"], json!("remote_retry"));
    assert_eq!(events[0]["tool"], json!("get_account_holder"));
    assert_eq!(events[0]["attempt"], json!(1));
    assert_eq!(events[0]["status"], json!(503));
    assert_eq!(events[1]["event"], json!("mcp_request"));
    assert_eq!(events[1]["outcome"], json!("ok"));
    assert_eq!(events[1]["request_id"], json!("1"));
}

#[test]
fn invalid_configuration_is_rejected_before_serving() {
    let mut config = ServiceConfig::default();
    config.remote.max_attempts = 0;
    assert!(McpServer::from_config(config, API_KEY.to_string()).is_err());
}

#[test]
fn client_config_mirrors_remote_settings() {
    let config = config_for("http://127.0.0.1:9/api", "enabled = false");
    let client = client_config_from(&config.remote, API_KEY.to_string()).unwrap();
    assert_eq!(client.base_url.as_str(), "http://127.0.0.1:9/api");
    assert_eq!(client.api_key(), API_KEY);
    assert_eq!(client.timeout, Duration::from_millis(5000));
    assert_eq!(client.retry.max_attempts, 3);
    assert_eq!(client.retry.initial_backoff, Duration::from_millis(1));
    assert_eq!(client.retry.max_backoff, Duration::from_millis(5));
    assert_eq!(client.max_batch_size, config.remote.max_batch_size);
    assert_eq!(client.user_agent, config.remote.user_agent);
}
