// crates/ntropy-mcp/src/lib.rs
// ============================================================================
// Module: Ntropy MCP
// Description: MCP server and tool dispatch for the Ntropy enrichment API.
// Purpose: Validate, execute, and translate tool calls over JSON-RPC 2.0.
// Dependencies: ntropy-mcp-client, ntropy-mcp-contract, axum, tokio
// ============================================================================

//! ## Overview
//! Ntropy MCP exposes eight enrichment tools to MCP clients. Every call runs
//! through [`ToolRouter`]: arguments are validated against the tool contract,
//! the matching remote operation runs on an injected
//! [`ntropy_mcp_core::EnrichmentService`], and the raw response is translated
//! into a stable result shape. Failures at any stage come back as structured
//! errors; a single failing call never terminates the server.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod audit;
pub mod context;
pub mod server;
pub mod telemetry;
pub mod tools;
pub mod translate;
pub mod validation;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use audit::AuditRetryObserver;
pub use audit::McpAuditEvent;
pub use audit::McpAuditSink;
pub use audit::McpFileAuditSink;
pub use audit::McpNoopAuditSink;
pub use audit::McpStderrAuditSink;
pub use audit::RetryAuditEvent;
pub use context::RequestContext;
pub use server::McpServer;
pub use server::McpServerError;
pub use server::client_config_from;
pub use telemetry::McpMethod;
pub use telemetry::McpMetricEvent;
pub use telemetry::McpMetrics;
pub use telemetry::McpOutcome;
pub use telemetry::NoopMetrics;
pub use tools::ToolError;
pub use tools::ToolRouter;
pub use translate::ResponseTranslator;
pub use translate::ToolOutput;
pub use validation::RequestValidator;
pub use validation::ToolRequest;
pub use validation::ValidationError;
