// crates/ntropy-mcp-config/src/lib.rs
// ============================================================================
// Module: Ntropy MCP Config Library
// Description: Canonical config model and validation.
// Purpose: Single source of truth for ntropy-mcp.toml semantics.
// Dependencies: serde, toml, url
// ============================================================================

//! ## Overview
//! `ntropy-mcp-config` defines the configuration model for the MCP server and
//! its remote client. It provides strict, fail-closed validation and resolves
//! the API credential from an explicit flag, the environment, or the file.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod config;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use config::*;
