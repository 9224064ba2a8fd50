// crates/ntropy-mcp-contract/src/lib.rs
// ============================================================================
// Module: Ntropy MCP Contract
// Description: Static tool catalogue with typed parameters and JSON schemas.
// Purpose: Drive argument validation and MCP tool listings from one source.
// Dependencies: ntropy-mcp-core, serde, serde_json, thiserror
// ============================================================================

//! ## Overview
//! The contract crate owns the canonical definition of every exposed tool:
//! its ordered parameter list with semantic types and defaults, the shape of
//! its result, the derived JSON schemas, worked examples, and usage notes.
//! [`ToolRegistry`] is the read-only lookup surface used by validation and by
//! `tools/list`.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod registry;
pub mod tooling;
pub mod types;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use ntropy_mcp_core::ToolName;
pub use registry::RegistryError;
pub use registry::ToolRegistry;
pub use tooling::tool_contracts;
pub use types::ParamSpec;
pub use types::ParamType;
pub use types::ResultShape;
pub use types::ToolContract;
pub use types::ToolDefinition;
pub use types::ToolExample;
