// crates/ntropy-mcp-core/src/lib.rs
// ============================================================================
// Module: Ntropy MCP Core
// Description: Domain model shared by the contract, client, and MCP layers.
// Purpose: Single source of truth for identifiers, entities, and error kinds.
// Dependencies: serde, serde_json, thiserror
// ============================================================================

//! ## Overview
//! `ntropy-mcp-core` defines the canonical domain types that flow between the
//! MCP tool router and the remote enrichment service: caller identifiers,
//! account holder and transaction inputs, the normalized [`ApiError`]
//! taxonomy, and the [`EnrichmentService`] seam implemented by the HTTP client.
//! Enriched payloads returned by the remote service stay opaque JSON here.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod error;
pub mod identifiers;
pub mod model;
pub mod service;
pub mod tooling;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use error::ApiError;
pub use error::ApiErrorKind;
pub use error::EntityKind;
pub use error::EntityRef;
pub use identifiers::Identifier;
pub use model::AccountHolderType;
pub use model::DEFAULT_LIST_LIMIT;
pub use model::DEFAULT_LIST_OFFSET;
pub use model::EntryType;
pub use model::ListQuery;
pub use model::NewAccountHolder;
pub use model::TransactionInput;
pub use service::BulkItemResult;
pub use service::DeleteOutcome;
pub use service::EnrichmentService;
pub use tooling::ToolName;
