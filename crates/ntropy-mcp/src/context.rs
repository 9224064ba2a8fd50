// crates/ntropy-mcp/src/context.rs
// ============================================================================
// Module: Request Context
// Description: Per-request transport metadata.
// Purpose: Carry caller metadata from the transports into audit and metrics.
// Dependencies: ntropy-mcp-config
// ============================================================================

//! ## Overview
//! [`RequestContext`] records which transport delivered a JSON-RPC request,
//! the peer address when one exists, and the request identifier. It never
//! carries argument payloads or credentials.

use std::net::IpAddr;

use ntropy_mcp_config::ServerTransport;

/// Per-request metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    /// Transport used by the caller.
    pub transport: ServerTransport,
    /// Peer IP address when available.
    pub peer_ip: Option<IpAddr>,
    /// JSON-RPC request identifier, rendered as JSON text.
    pub request_id: Option<String>,
}

impl RequestContext {
    /// Builds a stdio request context.
    #[must_use]
    pub const fn stdio() -> Self {
        Self { transport: ServerTransport::Stdio, peer_ip: None, request_id: None }
    }

    /// Builds an HTTP/SSE request context.
    #[must_use]
    pub const fn http(transport: ServerTransport, peer_ip: Option<IpAddr>) -> Self {
        Self { transport, peer_ip, request_id: None }
    }

    /// Returns a copy with the request identifier set.
    #[must_use]
    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = Some(request_id.into());
        self
    }
}
