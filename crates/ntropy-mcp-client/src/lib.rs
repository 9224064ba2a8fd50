// crates/ntropy-mcp-client/src/lib.rs
// ============================================================================
// Module: Ntropy MCP Client
// Description: Blocking HTTP client for the Ntropy v3 enrichment API.
// Purpose: Implement the enrichment service seam over authenticated HTTP.
// Dependencies: ntropy-mcp-core, rand, reqwest, serde_json, thiserror
// ============================================================================

//! ## Overview
//! [`NtropyClient`] issues one HTTP request per remote endpoint, attaches the
//! injected credential, retries transient failures with jittered exponential
//! backoff, and normalizes every failure into an
//! [`ntropy_mcp_core::ApiError`]. Bulk enrichment is split into ordered
//! sub-batches issued with bounded concurrency and reassembled in input order.
//!
//! The client holds no per-call mutable state and may be shared across
//! threads.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod bulk;
pub mod client;
pub mod config;
pub mod response;
pub mod retry;
mod wire;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use client::NtropyClient;
pub use config::ClientConfig;
pub use config::ClientError;
pub use retry::NoopRetryObserver;
pub use retry::RetryEvent;
pub use retry::RetryObserver;
pub use retry::RetryPolicy;
