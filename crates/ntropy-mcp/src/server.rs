// crates/ntropy-mcp/src/server.rs
// ============================================================================
// Module: MCP Server
// Description: MCP server implementations for stdio, HTTP, and SSE transports.
// Purpose: Expose the enrichment tools via JSON-RPC 2.0.
// Dependencies: ntropy-mcp-client, ntropy-mcp-config, axum, tokio
// ============================================================================

//! ## Overview
//! The MCP server speaks JSON-RPC 2.0 and routes every tool call through
//! [`crate::tools::ToolRouter`]. The stdio transport accepts both
//! `Content-Length` framed messages and newline-delimited JSON, answering each
//! request in the framing it arrived in. HTTP and SSE serve `POST /rpc`.
//! Caller-input failures are JSON-RPC errors; remote and internal failures
//! come back as `isError` tool results carrying the structured error.
//! Every request produces one audit event and one metric observation.
//! Notifications are processed silently and never answered.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::convert::Infallible;
use std::io;
use std::io::BufRead;
use std::io::Read;
use std::io::Write;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use axum::Router;
use axum::body::Body;
use axum::extract::ConnectInfo;
use axum::extract::State;
use axum::http::StatusCode;
use axum::http::header::CONTENT_TYPE;
use axum::response::IntoResponse;
use axum::response::Response;
use axum::response::Sse;
use axum::response::sse::Event;
use axum::routing::post;
use ntropy_mcp_client::ClientConfig;
use ntropy_mcp_client::NtropyClient;
use ntropy_mcp_client::RetryPolicy;
use ntropy_mcp_config::RemoteConfig;
use ntropy_mcp_config::ServerAuditConfig;
use ntropy_mcp_config::ServerConfig;
use ntropy_mcp_config::ServerTransport;
use ntropy_mcp_config::ServiceConfig;
use ntropy_mcp_contract::ToolDefinition;
use ntropy_mcp_core::ToolName;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;
use serde_json::json;
use tokio::net::TcpListener;
use tokio_stream::wrappers::ReceiverStream;

use crate::audit::AuditRetryObserver;
use crate::audit::McpAuditEvent;
use crate::audit::McpAuditEventParams;
use crate::audit::McpAuditSink;
use crate::audit::McpFileAuditSink;
use crate::audit::McpNoopAuditSink;
use crate::audit::McpStderrAuditSink;
use crate::context::RequestContext;
use crate::telemetry::McpMethod;
use crate::telemetry::McpMetricEvent;
use crate::telemetry::McpMetrics;
use crate::telemetry::McpOutcome;
use crate::telemetry::NoopMetrics;
use crate::tools::CODE_INVALID_PARAMS;
use crate::tools::ToolError;
use crate::tools::ToolRouter;
use crate::translate::ToolOutput;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Server name reported during `initialize`.
pub const SERVER_NAME: &str = "ntropy-mcp";
/// Protocol version offered when the client requests an unknown one.
pub const LATEST_PROTOCOL_VERSION: &str = "2025-06-18";
/// Protocol versions this server can speak.
pub const SUPPORTED_PROTOCOL_VERSIONS: &[&str] = &["2025-06-18", "2025-03-26", "2024-11-05"];

/// JSON-RPC protocol version.
const JSONRPC_VERSION: &str = "2.0";
/// Invalid JSON.
const CODE_PARSE_ERROR: i64 = -32700;
/// Valid JSON that is not a JSON-RPC request.
const CODE_INVALID_REQUEST: i64 = -32600;
/// Unsupported method.
const CODE_METHOD_NOT_FOUND: i64 = -32601;
/// Response serialization failed.
const CODE_SERIALIZATION: i64 = -32060;
/// Request body above the configured limit.
const CODE_BODY_TOO_LARGE: i64 = -32070;
/// Maximum length of one stdio header line.
const MAX_HEADER_LINE_BYTES: usize = 1024;
/// Fallback response when serialization fails.
const SERIALIZATION_FAILED: &str =
    r#"{"jsonrpc":"2.0","id":null,"error":{"code":-32060,"message":"serialization failed"}}"#;
/// Usage hint returned during `initialize`.
const INSTRUCTIONS: &str = "Tools for the Ntropy transaction enrichment API. Create an account \
                            holder before enriching its transactions. Identifiers may be strings \
                            or integers.";

// ============================================================================
// SECTION: MCP Server
// ============================================================================

/// MCP server instance.
pub struct McpServer {
    /// Server transport configuration.
    config: ServerConfig,
    /// Request handling state shared with transport handlers.
    state: ServerState,
}

impl McpServer {
    /// Builds a server over an existing router with no-op audit and metrics.
    #[must_use]
    pub fn new(config: ServerConfig, router: ToolRouter) -> Self {
        let state = ServerState {
            router,
            max_body_bytes: config.max_body_bytes,
            audit: Arc::new(McpNoopAuditSink),
            metrics: Arc::new(NoopMetrics),
        };
        Self { config, state }
    }

    /// Builds the server, remote client, and audit sink from configuration.
    ///
    /// # Errors
    ///
    /// Returns [`McpServerError`] when the configuration is invalid or the
    /// client or audit sink cannot be created.
    pub fn from_config(mut config: ServiceConfig, api_key: String) -> Result<Self, McpServerError> {
        config.validate().map_err(|err| McpServerError::Config(err.to_string()))?;
        let audit = build_audit_sink(&config.server.audit)?;
        let mut client = NtropyClient::new(client_config_from(&config.remote, api_key)?)
            .map_err(|err| McpServerError::Init(err.to_string()))?;
        if config.server.audit.enabled {
            client = client.with_observer(Arc::new(AuditRetryObserver::new(Arc::clone(&audit))));
        }
        let router = ToolRouter::new(Arc::new(client));
        Ok(Self::new(config.server, router).with_audit(audit))
    }

    /// Replaces the audit sink.
    #[must_use]
    pub fn with_audit(mut self, audit: Arc<dyn McpAuditSink>) -> Self {
        self.state.audit = audit;
        self
    }

    /// Replaces the metrics sink.
    #[must_use]
    pub fn with_metrics(mut self, metrics: Arc<dyn McpMetrics>) -> Self {
        self.state.metrics = metrics;
        self
    }

    /// Returns the transport configuration.
    #[must_use]
    pub const fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Returns the tool router.
    #[must_use]
    pub const fn router(&self) -> &ToolRouter {
        &self.state.router
    }

    /// Serves requests using the configured transport.
    ///
    /// # Errors
    ///
    /// Returns [`McpServerError`] when the server fails.
    pub async fn serve(self) -> Result<(), McpServerError> {
        match self.config.transport {
            ServerTransport::Stdio => self.serve_stdio(),
            ServerTransport::Http | ServerTransport::Sse => {
                let addr = self
                    .config
                    .bind_addr()
                    .map_err(|err| McpServerError::Config(err.to_string()))?;
                let listener = TcpListener::bind(addr).await.map_err(|err| {
                    McpServerError::Transport(format!("bind {addr} failed: {err}"))
                })?;
                self.serve_listener(listener).await
            }
        }
    }

    /// Serves JSON-RPC over stdin/stdout until stdin closes.
    ///
    /// # Errors
    ///
    /// Returns [`McpServerError::Transport`] on I/O or framing failures.
    pub fn serve_stdio(&self) -> Result<(), McpServerError> {
        let stdin = io::stdin();
        let stdout = io::stdout();
        self.serve_stream(stdin.lock(), stdout.lock())
    }

    /// Serves JSON-RPC messages read from `reader` until end of input.
    ///
    /// # Errors
    ///
    /// Returns [`McpServerError::Transport`] on I/O or framing failures.
    pub fn serve_stream(
        &self,
        mut reader: impl BufRead,
        mut writer: impl Write,
    ) -> Result<(), McpServerError> {
        let context = RequestContext::stdio();
        while let Some(inbound) = read_message(&mut reader, self.state.max_body_bytes)? {
            let (framing, reply) = match inbound {
                Inbound::Message { framing, body } => {
                    (framing, self.state.respond(&context, &body))
                }
                Inbound::Oversized { framing, size } => {
                    (framing, self.state.reject_oversized(&context, size))
                }
            };
            if let Some(payload) = reply.1 {
                write_message(&mut writer, framing, &payload)?;
            }
        }
        Ok(())
    }

    /// Serves HTTP or SSE on an already bound listener.
    ///
    /// # Errors
    ///
    /// Returns [`McpServerError::Transport`] when the server fails.
    pub async fn serve_listener(self, listener: TcpListener) -> Result<(), McpServerError> {
        let transport = self.config.transport;
        let state = Arc::new(self.state);
        let app = match transport {
            ServerTransport::Sse => Router::new().route("/rpc", post(handle_sse)),
            ServerTransport::Http | ServerTransport::Stdio => {
                Router::new().route("/rpc", post(handle_http))
            }
        }
        .with_state(state);
        axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
            .await
            .map_err(|err| {
                McpServerError::Transport(format!("{} server failed: {err}", transport.as_str()))
            })
    }
}

/// Converts validated remote settings into the client configuration.
///
/// # Errors
///
/// Returns [`McpServerError::Config`] when the client rejects the settings.
pub fn client_config_from(
    remote: &RemoteConfig,
    api_key: String,
) -> Result<ClientConfig, McpServerError> {
    let retry = RetryPolicy {
        max_attempts: remote.max_attempts,
        initial_backoff: remote.initial_backoff(),
        max_backoff: remote.max_backoff(),
    };
    Ok(ClientConfig::new(&remote.base_url, api_key)
        .map_err(|err| McpServerError::Config(err.to_string()))?
        .with_timeout(remote.timeout())
        .with_retry(retry)
        .with_bulk_limits(remote.max_batch_size, remote.bulk_concurrency)
        .with_user_agent(remote.user_agent.clone()))
}

/// Builds the audit sink selected by configuration.
fn build_audit_sink(config: &ServerAuditConfig) -> Result<Arc<dyn McpAuditSink>, McpServerError> {
    if !config.enabled {
        return Ok(Arc::new(McpNoopAuditSink));
    }
    match &config.path {
        Some(path) => {
            let sink = McpFileAuditSink::new(Path::new(path))
                .map_err(|err| McpServerError::Init(format!("audit log {path}: {err}")))?;
            Ok(Arc::new(sink))
        }
        None => Ok(Arc::new(McpStderrAuditSink)),
    }
}

// ============================================================================
// SECTION: HTTP Transport
// ============================================================================

/// Handles HTTP JSON-RPC requests.
async fn handle_http(
    State(state): State<Arc<ServerState>>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    body: Body,
) -> Response {
    let context = RequestContext::http(ServerTransport::Http, Some(peer.ip()));
    match read_and_respond(&state, &context, body).await {
        (status, Some(payload)) => {
            (status, [(CONTENT_TYPE, "application/json")], payload).into_response()
        }
        (_, None) => StatusCode::ACCEPTED.into_response(),
    }
}

/// Handles SSE JSON-RPC requests; the reply is streamed as one event.
async fn handle_sse(
    State(state): State<Arc<ServerState>>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    body: Body,
) -> Response {
    let context = RequestContext::http(ServerTransport::Sse, Some(peer.ip()));
    let (_, payload) = read_and_respond(&state, &context, body).await;
    let Some(payload) = payload else {
        return StatusCode::ACCEPTED.into_response();
    };
    let data = String::from_utf8(payload).unwrap_or_else(|_| SERIALIZATION_FAILED.to_string());
    let (tx, rx) = tokio::sync::mpsc::channel::<Result<Event, Infallible>>(1);
    let _ = tx.send(Ok(Event::default().data(data))).await;
    Sse::new(ReceiverStream::new(rx)).into_response()
}

/// Reads a bounded request body and produces the reply.
async fn read_and_respond(
    state: &ServerState,
    context: &RequestContext,
    body: Body,
) -> (StatusCode, Option<Vec<u8>>) {
    match axum::body::to_bytes(body, state.max_body_bytes).await {
        Ok(bytes) => state.respond(context, &bytes),
        Err(_) => state.reject_oversized(context, state.max_body_bytes.saturating_add(1)),
    }
}

// ============================================================================
// SECTION: JSON-RPC Handling
// ============================================================================

/// Incoming JSON-RPC request payload.
#[derive(Debug, Deserialize)]
struct JsonRpcRequest {
    /// JSON-RPC protocol version.
    jsonrpc: String,
    /// Request identifier; `null` when absent.
    #[serde(default)]
    id: Value,
    /// Method name.
    method: String,
    /// Optional parameters payload.
    #[serde(default)]
    params: Option<Value>,
}

/// JSON-RPC response envelope.
#[derive(Debug, Serialize)]
struct JsonRpcResponse {
    /// JSON-RPC protocol version.
    jsonrpc: &'static str,
    /// Request identifier.
    id: Value,
    /// Successful result payload.
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<Value>,
    /// Error payload when the request fails.
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<JsonRpcError>,
}

/// JSON-RPC error payload.
#[derive(Debug, Serialize)]
struct JsonRpcError {
    /// Error code.
    code: i64,
    /// Human-readable error message.
    message: String,
    /// Structured error detail.
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<Value>,
}

/// Tool call parameters.
#[derive(Debug, Deserialize)]
struct ToolCallParams {
    /// Tool name.
    name: String,
    /// Raw JSON arguments; absent means no arguments.
    #[serde(default)]
    arguments: Value,
}

/// Tool list response payload.
#[derive(Debug, Serialize)]
struct ToolListResult {
    /// Registered tool definitions.
    tools: Vec<ToolDefinition>,
}

/// Tool call response payload.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ToolCallResult {
    /// Human-readable rendering of the result.
    content: Vec<ToolContent>,
    /// Structured result.
    structured_content: Value,
    /// True when the tool reported an in-band failure.
    is_error: bool,
}

/// Tool output content block.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ToolContent {
    /// Text block carrying the JSON result.
    Text {
        /// JSON text.
        text: String,
    },
}

/// Outcome of handling one message, with its audit labels.
struct Handled {
    /// HTTP status for network transports.
    status: StatusCode,
    /// Response envelope; `None` for notifications.
    response: Option<JsonRpcResponse>,
    /// Request identifier rendered as JSON text.
    request_id: Option<String>,
    /// Method classification.
    method: McpMethod,
    /// Tool name for `tools/call`.
    tool: Option<ToolName>,
    /// Outcome classification.
    outcome: McpOutcome,
    /// JSON-RPC error code.
    error_code: Option<i64>,
    /// Error kind label.
    error_kind: Option<&'static str>,
}

impl Handled {
    /// Successful reply.
    fn success(id: Value, method: McpMethod, result: Value) -> Self {
        Self {
            status: StatusCode::OK,
            response: Some(JsonRpcResponse {
                jsonrpc: JSONRPC_VERSION,
                id,
                result: Some(result),
                error: None,
            }),
            request_id: None,
            method,
            tool: None,
            outcome: McpOutcome::Ok,
            error_code: None,
            error_kind: None,
        }
    }

    /// Error reply.
    fn failure(id: Value, method: McpMethod, status: StatusCode, failure: Failure) -> Self {
        Self {
            status,
            response: Some(JsonRpcResponse {
                jsonrpc: JSONRPC_VERSION,
                id,
                result: None,
                error: Some(JsonRpcError {
                    code: failure.code,
                    message: failure.message,
                    data: failure.data,
                }),
            }),
            request_id: None,
            method,
            tool: None,
            outcome: McpOutcome::Error,
            error_code: Some(failure.code),
            error_kind: Some(failure.kind),
        }
    }

    /// Notification; nothing is sent back.
    const fn silent(method: McpMethod) -> Self {
        Self {
            status: StatusCode::ACCEPTED,
            response: None,
            request_id: None,
            method,
            tool: None,
            outcome: McpOutcome::Ok,
            error_code: None,
            error_kind: None,
        }
    }
}

/// Error reply contents.
struct Failure {
    /// JSON-RPC error code.
    code: i64,
    /// Error message.
    message: String,
    /// Structured detail.
    data: Option<Value>,
    /// Error kind label for audit.
    kind: &'static str,
}

impl Failure {
    /// Failure without structured detail.
    fn plain(code: i64, message: &str, kind: &'static str) -> Self {
        Self { code, message: message.to_string(), data: None, kind }
    }
}

/// Shared server state for all transports.
#[derive(Clone)]
struct ServerState {
    /// Tool router for request dispatch.
    router: ToolRouter,
    /// Maximum allowed request body size.
    max_body_bytes: usize,
    /// Audit sink.
    audit: Arc<dyn McpAuditSink>,
    /// Metrics sink.
    metrics: Arc<dyn McpMetrics>,
}

impl ServerState {
    /// Handles one request body and returns the serialized reply.
    fn respond(&self, context: &RequestContext, bytes: &[u8]) -> (StatusCode, Option<Vec<u8>>) {
        let started = Instant::now();
        if bytes.len() > self.max_body_bytes {
            return self.finish(context, bytes.len(), too_large(), started);
        }
        let handled = self.handle_bytes(bytes);
        self.finish(context, bytes.len(), handled, started)
    }

    /// Replies to a body that exceeded the size limit without reading it.
    fn reject_oversized(
        &self,
        context: &RequestContext,
        size: usize,
    ) -> (StatusCode, Option<Vec<u8>>) {
        self.finish(context, size, too_large(), Instant::now())
    }

    /// Serializes the reply and records audit and metrics.
    fn finish(
        &self,
        context: &RequestContext,
        request_bytes: usize,
        handled: Handled,
        started: Instant,
    ) -> (StatusCode, Option<Vec<u8>>) {
        let payload = handled.response.as_ref().map(|response| {
            serde_json::to_vec(response)
                .unwrap_or_else(|_| SERIALIZATION_FAILED.as_bytes().to_vec())
        });
        let response_bytes = payload.as_ref().map_or(0, Vec::len);
        let context = match &handled.request_id {
            Some(id) => context.clone().with_request_id(id.clone()),
            None => context.clone(),
        };
        self.audit.record(&McpAuditEvent::new(McpAuditEventParams {
            context: &context,
            method: handled.method,
            tool: handled.tool,
            outcome: handled.outcome,
            error_code: handled.error_code,
            error_kind: handled.error_kind,
            request_bytes,
            response_bytes,
        }));
        let event = McpMetricEvent {
            transport: context.transport,
            method: handled.method,
            tool: handled.tool,
            outcome: handled.outcome,
            error_code: handled.error_code,
            error_kind: handled.error_kind,
            request_bytes,
            response_bytes,
        };
        self.metrics.record_request(event.clone());
        self.metrics.record_latency(event, started.elapsed());
        (handled.status, payload)
    }

    /// Parses a body and dispatches the request.
    fn handle_bytes(&self, bytes: &[u8]) -> Handled {
        let Ok(value) = serde_json::from_slice::<Value>(bytes) else {
            return Handled::failure(
                Value::Null,
                McpMethod::Invalid,
                StatusCode::BAD_REQUEST,
                Failure::plain(CODE_PARSE_ERROR, "parse error", "parse_error"),
            );
        };
        let has_id = value.get("id").is_some();
        match serde_json::from_value::<JsonRpcRequest>(value) {
            Ok(request) => self.handle_request(request, has_id),
            Err(_) => Handled::failure(
                Value::Null,
                McpMethod::Invalid,
                StatusCode::BAD_REQUEST,
                Failure::plain(CODE_INVALID_REQUEST, "invalid json-rpc request", "invalid_request"),
            ),
        }
    }

    /// Dispatches a parsed JSON-RPC request.
    fn handle_request(&self, request: JsonRpcRequest, has_id: bool) -> Handled {
        let method = McpMethod::classify(&request.method);
        if !has_id || method == McpMethod::Notification {
            return Handled::silent(method);
        }
        let request_id = request.id.to_string();
        let id = request.id;
        let mut handled = if request.jsonrpc == JSONRPC_VERSION {
            match method {
                McpMethod::Initialize => {
                    Handled::success(id, method, initialize_result(request.params.as_ref()))
                }
                McpMethod::Ping => Handled::success(id, method, json!({})),
                McpMethod::ToolsList => self.list_tools(id),
                McpMethod::ToolsCall => self.call_tool(id, request.params),
                McpMethod::Notification | McpMethod::Invalid | McpMethod::Other => {
                    method_not_found(id, method)
                }
            }
        } else {
            Handled::failure(
                id,
                McpMethod::Invalid,
                StatusCode::BAD_REQUEST,
                Failure::plain(CODE_INVALID_REQUEST, "invalid json-rpc version", "invalid_request"),
            )
        };
        handled.request_id = Some(request_id);
        handled
    }

    /// Handles `tools/list`.
    fn list_tools(&self, id: Value) -> Handled {
        let tools = self.router.list_tools();
        match serde_json::to_value(ToolListResult { tools }) {
            Ok(value) => Handled::success(id, McpMethod::ToolsList, value),
            Err(_) => serialization_failure(id, McpMethod::ToolsList),
        }
    }

    /// Handles `tools/call`.
    fn call_tool(&self, id: Value, params: Option<Value>) -> Handled {
        let call = serde_json::from_value::<ToolCallParams>(params.unwrap_or(Value::Null));
        let Ok(call) = call else {
            return Handled::failure(
                id,
                McpMethod::ToolsCall,
                StatusCode::BAD_REQUEST,
                Failure::plain(CODE_INVALID_PARAMS, "invalid tool params", "invalid_params"),
            );
        };
        let tool = ToolName::parse(&call.name);
        let mut handled = match call_tool_with_blocking(&self.router, &call.name, &call.arguments)
        {
            Ok(output) => match tool_call_result(&output) {
                Ok(value) => {
                    let mut handled = Handled::success(id, McpMethod::ToolsCall, value);
                    if output.is_error {
                        handled.outcome = McpOutcome::ToolError;
                    }
                    handled
                }
                Err(_) => serialization_failure(id, McpMethod::ToolsCall),
            },
            Err(error @ ToolError::Api(_)) => match tool_error_result(&error) {
                Ok(value) => {
                    let mut handled = Handled::success(id, McpMethod::ToolsCall, value);
                    handled.outcome = McpOutcome::ToolError;
                    handled.error_code = Some(error.jsonrpc_code());
                    handled.error_kind = Some(error.kind_label());
                    handled
                }
                Err(_) => serialization_failure(id, McpMethod::ToolsCall),
            },
            Err(error) => Handled::failure(
                id,
                McpMethod::ToolsCall,
                StatusCode::BAD_REQUEST,
                Failure {
                    code: error.jsonrpc_code(),
                    message: error.to_string(),
                    data: Some(error.payload()),
                    kind: error.kind_label(),
                },
            ),
        };
        handled.tool = tool;
        handled
    }
}

/// Builds the `initialize` result, echoing a supported protocol version.
fn initialize_result(params: Option<&Value>) -> Value {
    let requested = params.and_then(|params| params.get("protocolVersion")).and_then(Value::as_str);
    let version = requested
        .filter(|version| SUPPORTED_PROTOCOL_VERSIONS.contains(version))
        .unwrap_or(LATEST_PROTOCOL_VERSION);
    json!({
        "protocolVersion": version,
        "capabilities": { "tools": { "listChanged": false } },
        "serverInfo": { "name": SERVER_NAME, "version": env!("CARGO_PKG_VERSION") },
        "instructions": INSTRUCTIONS,
    })
}

/// Renders a tool output as an MCP tool result.
fn tool_call_result(output: &ToolOutput) -> Result<Value, serde_json::Error> {
    render_tool_result(output.value.clone(), output.is_error)
}

/// Renders a remote or internal failure as an `isError` tool result.
///
/// The structured content is `{"error": payload}` with the JSON-RPC code
/// the failure maps to, so agents can branch on `kind` and `retryable`.
fn tool_error_result(error: &ToolError) -> Result<Value, serde_json::Error> {
    let mut payload = error.payload();
    if let Value::Object(map) = &mut payload {
        map.insert("code".to_string(), Value::from(error.jsonrpc_code()));
    }
    render_tool_result(json!({ "error": payload }), true)
}

/// Wraps a structured value as MCP tool result content.
fn render_tool_result(value: Value, is_error: bool) -> Result<Value, serde_json::Error> {
    let text = serde_json::to_string(&value)?;
    serde_json::to_value(ToolCallResult {
        content: vec![ToolContent::Text { text }],
        structured_content: value,
        is_error,
    })
}

/// Reply for an unsupported method.
fn method_not_found(id: Value, method: McpMethod) -> Handled {
    Handled::failure(
        id,
        method,
        StatusCode::BAD_REQUEST,
        Failure::plain(CODE_METHOD_NOT_FOUND, "method not found", "method_not_found"),
    )
}

/// Reply for a body above the configured limit.
fn too_large() -> Handled {
    Handled::failure(
        Value::Null,
        McpMethod::Invalid,
        StatusCode::PAYLOAD_TOO_LARGE,
        Failure::plain(CODE_BODY_TOO_LARGE, "request body too large", "body_too_large"),
    )
}

/// Reply when a result cannot be serialized.
fn serialization_failure(id: Value, method: McpMethod) -> Handled {
    Handled::failure(
        id,
        method,
        StatusCode::INTERNAL_SERVER_ERROR,
        Failure::plain(CODE_SERIALIZATION, "serialization failed", "serialization"),
    )
}

/// Executes a tool call, shifting to a blocking context when available.
fn call_tool_with_blocking(
    router: &ToolRouter,
    name: &str,
    arguments: &Value,
) -> Result<ToolOutput, ToolError> {
    match tokio::runtime::Handle::try_current() {
        Ok(handle) if handle.runtime_flavor() == tokio::runtime::RuntimeFlavor::MultiThread => {
            tokio::task::block_in_place(|| router.dispatch(name, arguments))
        }
        _ => router.dispatch(name, arguments),
    }
}

// ============================================================================
// SECTION: Stdio Framing
// ============================================================================

/// Framing used by one stdio message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Framing {
    /// `Content-Length` header block followed by the body.
    ContentLength,
    /// One JSON document per line.
    Line,
}

/// One inbound stdio message.
#[derive(Debug, PartialEq, Eq)]
enum Inbound {
    /// Message body within limits.
    Message {
        /// Framing the message arrived in.
        framing: Framing,
        /// Raw body.
        body: Vec<u8>,
    },
    /// Message whose body exceeded the limit and was discarded.
    Oversized {
        /// Framing the message arrived in.
        framing: Framing,
        /// Declared or observed size.
        size: usize,
    },
}

/// One bounded line read.
enum Line {
    /// Full line including its terminator.
    Complete(Vec<u8>),
    /// Line longer than the limit; the remainder was discarded.
    Overflow(usize),
}

/// Reads the next message in either framing; `None` at end of input.
fn read_message(
    reader: &mut impl BufRead,
    max_body_bytes: usize,
) -> Result<Option<Inbound>, McpServerError> {
    loop {
        let line = match read_line_limited(reader, max_body_bytes)? {
            None => return Ok(None),
            Some(Line::Overflow(size)) => {
                return Ok(Some(Inbound::Oversized { framing: Framing::Line, size }));
            }
            Some(Line::Complete(line)) => line,
        };
        let text = line.trim_ascii();
        if text.is_empty() {
            continue;
        }
        if is_header_line(text) {
            return read_framed_body(reader, text, max_body_bytes).map(Some);
        }
        if text.len() > max_body_bytes {
            return Ok(Some(Inbound::Oversized { framing: Framing::Line, size: text.len() }));
        }
        return Ok(Some(Inbound::Message { framing: Framing::Line, body: text.to_vec() }));
    }
}

/// Returns true when the line starts a header block rather than a JSON body.
fn is_header_line(text: &[u8]) -> bool {
    !matches!(text.first(), Some(b'{' | b'[')) && text.contains(&b':')
}

/// Reads the remaining headers and the body of a framed message.
fn read_framed_body(
    reader: &mut impl BufRead,
    first_header: &[u8],
    max_body_bytes: usize,
) -> Result<Inbound, McpServerError> {
    let mut content_length = parse_content_length(first_header)?;
    loop {
        let line = match read_line_limited(reader, MAX_HEADER_LINE_BYTES)? {
            Some(Line::Complete(line)) => line,
            Some(Line::Overflow(_)) => {
                return Err(McpServerError::Transport("stdio header too long".to_string()));
            }
            None => return Err(McpServerError::Transport("stdio closed".to_string())),
        };
        let text = line.trim_ascii();
        if text.is_empty() {
            break;
        }
        if let Some(length) = parse_content_length(text)? {
            content_length = Some(length);
        }
    }
    let len = content_length
        .ok_or_else(|| McpServerError::Transport("missing content length".to_string()))?;
    if len > max_body_bytes {
        let skip = u64::try_from(len).unwrap_or(u64::MAX);
        io::copy(&mut reader.by_ref().take(skip), &mut io::sink()).map_err(read_failed)?;
        return Ok(Inbound::Oversized { framing: Framing::ContentLength, size: len });
    }
    let mut body = vec![0_u8; len];
    reader.read_exact(&mut body).map_err(read_failed)?;
    Ok(Inbound::Message { framing: Framing::ContentLength, body })
}

/// Parses a `Content-Length` header; other headers yield `None`.
fn parse_content_length(line: &[u8]) -> Result<Option<usize>, McpServerError> {
    let text = std::str::from_utf8(line)
        .map_err(|_| McpServerError::Transport("invalid header encoding".to_string()))?;
    let Some((name, value)) = text.split_once(':') else {
        return Err(McpServerError::Transport("invalid header line".to_string()));
    };
    if !name.trim().eq_ignore_ascii_case("content-length") {
        return Ok(None);
    }
    value
        .trim()
        .parse::<usize>()
        .map(Some)
        .map_err(|_| McpServerError::Transport("invalid content length".to_string()))
}

/// Reads one line of at most `limit` content bytes.
fn read_line_limited(
    reader: &mut impl BufRead,
    limit: usize,
) -> Result<Option<Line>, McpServerError> {
    let cap = u64::try_from(limit).unwrap_or(u64::MAX).saturating_add(2);
    let mut line = Vec::new();
    let read = reader.by_ref().take(cap).read_until(b'\n', &mut line).map_err(read_failed)?;
    if read == 0 {
        return Ok(None);
    }
    let terminated = line.last() == Some(&b'\n');
    if terminated || u64::try_from(read).unwrap_or(u64::MAX) < cap {
        return Ok(Some(Line::Complete(line)));
    }
    let mut size = read;
    loop {
        let buffer = reader.fill_buf().map_err(read_failed)?;
        if buffer.is_empty() {
            break;
        }
        if let Some(position) = buffer.iter().position(|byte| *byte == b'\n') {
            reader.consume(position + 1);
            size += position;
            break;
        }
        let consumed = buffer.len();
        reader.consume(consumed);
        size += consumed;
    }
    Ok(Some(Line::Overflow(size)))
}

/// Writes one reply in the given framing.
fn write_message(
    writer: &mut impl Write,
    framing: Framing,
    payload: &[u8],
) -> Result<(), McpServerError> {
    match framing {
        Framing::ContentLength => {
            let header = format!("Content-Length: {}\r\n\r\n", payload.len());
            writer.write_all(header.as_bytes()).map_err(write_failed)?;
            writer.write_all(payload).map_err(write_failed)?;
        }
        Framing::Line => {
            writer.write_all(payload).map_err(write_failed)?;
            writer.write_all(b"\n").map_err(write_failed)?;
        }
    }
    writer.flush().map_err(write_failed)
}

/// Maps a stdio read failure.
fn read_failed(err: io::Error) -> McpServerError {
    McpServerError::Transport(format!("stdio read failed: {err}"))
}

/// Maps a stdio write failure.
fn write_failed(err: io::Error) -> McpServerError {
    McpServerError::Transport(format!("stdio write failed: {err}"))
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// MCP server errors.
#[derive(Debug, thiserror::Error)]
pub enum McpServerError {
    /// Configuration errors.
    #[error("config error: {0}")]
    Config(String),
    /// Initialization errors.
    #[error("init error: {0}")]
    Init(String),
    /// Transport errors.
    #[error("transport error: {0}")]
    Transport(String),
}

// ============================================================================
// SECTION: Tests
// ============================================================================
