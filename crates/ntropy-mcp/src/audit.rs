// crates/ntropy-mcp/src/audit.rs
// ============================================================================
// Module: MCP Audit Logging
// Description: Structured audit events for request handling and remote retries.
// Purpose: Emit JSON-line audit records without argument payloads or secrets.
// Dependencies: ntropy-mcp-client, ntropy-mcp-core, serde
// ============================================================================

//! ## Overview
//! One [`McpAuditEvent`] is recorded per JSON-RPC request and one
//! [`RetryAuditEvent`] per scheduled remote retry. Events carry sizes, labels,
//! and error classifications only; tool arguments and the API credential are
//! never written. Sinks write JSON lines to stderr, to an append-only file, or
//! nowhere.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs::OpenOptions;
use std::io;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use std::sync::Mutex;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use ntropy_mcp_client::RetryEvent;
use ntropy_mcp_client::RetryObserver;
use ntropy_mcp_config::ServerTransport;
use ntropy_mcp_core::ApiErrorKind;
use ntropy_mcp_core::ToolName;
use serde::Serialize;

use crate::context::RequestContext;
use crate::telemetry::McpMethod;
use crate::telemetry::McpOutcome;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Request audit event payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct McpAuditEvent {
    /// Event identifier.
    pub event: &'static str,
    /// Event timestamp (milliseconds since epoch).
    pub timestamp_ms: u128,
    /// Request identifier when provided.
    pub request_id: Option<String>,
    /// Transport used for the request.
    pub transport: ServerTransport,
    /// Peer IP address when available.
    pub peer_ip: Option<String>,
    /// JSON-RPC method classification.
    pub method: McpMethod,
    /// Tool name for `tools/call`.
    pub tool: Option<ToolName>,
    /// Request outcome.
    pub outcome: McpOutcome,
    /// JSON-RPC error code when present.
    pub error_code: Option<i64>,
    /// Normalized error kind label.
    pub error_kind: Option<&'static str>,
    /// Request body size in bytes.
    pub request_bytes: usize,
    /// Response body size in bytes.
    pub response_bytes: usize,
}

/// Inputs required to construct a request audit event.
pub struct McpAuditEventParams<'a> {
    /// Transport metadata for the request.
    pub context: &'a RequestContext,
    /// JSON-RPC method classification.
    pub method: McpMethod,
    /// Tool name for `tools/call`.
    pub tool: Option<ToolName>,
    /// Request outcome.
    pub outcome: McpOutcome,
    /// JSON-RPC error code when present.
    pub error_code: Option<i64>,
    /// Normalized error kind label.
    pub error_kind: Option<&'static str>,
    /// Request body size in bytes.
    pub request_bytes: usize,
    /// Response body size in bytes.
    pub response_bytes: usize,
}

impl McpAuditEvent {
    /// Creates a request audit event stamped with the current time.
    #[must_use]
    pub fn new(params: McpAuditEventParams<'_>) -> Self {
        Self {
            event: "mcp_request",
            timestamp_ms: now_ms(),
            request_id: params.context.request_id.clone(),
            transport: params.context.transport,
            peer_ip: params.context.peer_ip.map(|ip| ip.to_string()),
            method: params.method,
            tool: params.tool,
            outcome: params.outcome,
            error_code: params.error_code,
            error_kind: params.error_kind,
            request_bytes: params.request_bytes,
            response_bytes: params.response_bytes,
        }
    }
}

/// Remote retry audit event payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RetryAuditEvent {
    /// Event identifier.
    pub event: &'static str,
    /// Event timestamp (milliseconds since epoch).
    pub timestamp_ms: u128,
    /// Operation being retried.
    pub tool: ToolName,
    /// Attempt that just failed (1-based).
    pub attempt: u32,
    /// Maximum attempts allowed.
    pub max_attempts: u32,
    /// Delay before the next attempt in milliseconds.
    pub delay_ms: u128,
    /// Failure classification.
    pub error_kind: ApiErrorKind,
    /// Remote status when a response was received.
    pub status: Option<u16>,
}

impl From<&RetryEvent> for RetryAuditEvent {
    fn from(event: &RetryEvent) -> Self {
        Self {
            event: "remote_retry",
            timestamp_ms: now_ms(),
            tool: event.tool,
            attempt: event.attempt,
            max_attempts: event.max_attempts,
            delay_ms: event.delay.as_millis(),
            error_kind: event.error_kind,
            status: event.status,
        }
    }
}

/// Milliseconds since the Unix epoch.
fn now_ms() -> u128 {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_millis()
}

// ============================================================================
// SECTION: Trait
// ============================================================================

/// Audit sink for request and retry events.
pub trait McpAuditSink: Send + Sync {
    /// Records a request audit event.
    fn record(&self, event: &McpAuditEvent);

    /// Records a remote retry event.
    fn record_retry(&self, _event: &RetryAuditEvent) {}
}

/// Audit sink that logs JSON lines to stderr.
#[derive(Debug, Clone, Copy, Default)]
pub struct McpStderrAuditSink;

impl McpStderrAuditSink {
    /// Writes one serialized event line to stderr.
    fn emit(event: &impl Serialize) {
        if let Ok(payload) = serde_json::to_string(event) {
            let _ = writeln!(std::io::stderr(), "{payload}");
        }
    }
}

impl McpAuditSink for McpStderrAuditSink {
    fn record(&self, event: &McpAuditEvent) {
        Self::emit(event);
    }

    fn record_retry(&self, event: &RetryAuditEvent) {
        Self::emit(event);
    }
}

/// Audit sink that appends JSON lines to a file.
#[derive(Debug)]
pub struct McpFileAuditSink {
    /// File handle used for append-only logging.
    file: Mutex<std::fs::File>,
}

impl McpFileAuditSink {
    /// Opens the audit log file in append mode.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened.
    pub fn new(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self { file: Mutex::new(file) })
    }

    /// Appends one serialized event line.
    fn emit(&self, event: &impl Serialize) {
        if let Ok(payload) = serde_json::to_string(event)
            && let Ok(mut file) = self.file.lock()
        {
            let _ = writeln!(file, "{payload}");
            let _ = file.flush();
        }
    }
}

impl McpAuditSink for McpFileAuditSink {
    fn record(&self, event: &McpAuditEvent) {
        self.emit(event);
    }

    fn record_retry(&self, event: &RetryAuditEvent) {
        self.emit(event);
    }
}

/// No-op audit sink.
#[derive(Debug, Clone, Copy, Default)]
pub struct McpNoopAuditSink;

impl McpAuditSink for McpNoopAuditSink {
    fn record(&self, _event: &McpAuditEvent) {}
}

// ============================================================================
// SECTION: Retry Bridge
// ============================================================================

/// Forwards client retry notifications to an audit sink.
#[derive(Clone)]
pub struct AuditRetryObserver {
    /// Destination sink.
    sink: Arc<dyn McpAuditSink>,
}

impl AuditRetryObserver {
    /// Wraps an audit sink.
    #[must_use]
    pub fn new(sink: Arc<dyn McpAuditSink>) -> Self {
        Self { sink }
    }
}

impl RetryObserver for AuditRetryObserver {
    fn on_retry(&self, event: &RetryEvent) {
        self.sink.record_retry(&RetryAuditEvent::from(event));
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(
        clippy::panic,
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::missing_docs_in_private_items,
        reason = "Test-only assertions."
    )]

    use std::net::IpAddr;
    use std::net::Ipv4Addr;
    use std::sync::Arc;
    use std::time::Duration;

    use ntropy_mcp_client::RetryEvent;
    use ntropy_mcp_client::RetryObserver;
    use ntropy_mcp_config::ServerTransport;
    use ntropy_mcp_core::ApiErrorKind;
    use ntropy_mcp_core::ToolName;
    use serde_json::Value;
    use serde_json::json;

    use super::AuditRetryObserver;
    use super::McpAuditEvent;
    use super::McpAuditEventParams;
    use super::McpAuditSink;
    use super::McpFileAuditSink;
    use crate::context::RequestContext;
    use crate::telemetry::McpMethod;
    use crate::telemetry::McpOutcome;

    fn lines(path: &std::path::Path) -> Vec<Value> {
        std::fs::read_to_string(path)
            .unwrap()
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect()
    }

    #[test]
    fn file_sink_appends_request_and_retry_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audit.jsonl");
        let sink = Arc::new(McpFileAuditSink::new(&path).unwrap());
        let context =
            RequestContext::http(ServerTransport::Http, Some(IpAddr::V4(Ipv4Addr::LOCALHOST)))
                .with_request_id("7");
        sink.record(&McpAuditEvent::new(McpAuditEventParams {
            context: &context,
            method: McpMethod::ToolsCall,
            tool: Some(ToolName::GetTransaction),
            outcome: McpOutcome::Error,
            error_code: Some(-32004),
            error_kind: Some("not_found_error"),
            request_bytes: 80,
            response_bytes: 120,
        }));
        let observer = AuditRetryObserver::new(sink);
        observer.on_retry(&RetryEvent {
            tool: ToolName::ListTransactions,
            attempt: 1,
            max_attempts: 3,
            delay: Duration::from_millis(250),
            error_kind: ApiErrorKind::RateLimit,
            status: Some(429),
        });

        let events = lines(&path);
        assert_eq!(events.len(), 2);
        assert_eq!(events[0]["event"], json!("mcp_request"));
        assert_eq!(events[0]["transport"], json!("http"));
        assert_eq!(events[0]["peer_ip"], json!("127.0.0.1"));
        assert_eq!(events[0]["method"], json!("tools_call"));
        assert_eq!(events[0]["tool"], json!("get_transaction"));
        assert_eq!(events[0]["outcome"], json!("error"));
        assert_eq!(events[1]["event"], json!("remote_retry"));
        assert_eq!(events[1]["error_kind"], json!("rate_limit_error"));
        assert_eq!(events[1]["delay_ms"], json!(250));
    }
}
