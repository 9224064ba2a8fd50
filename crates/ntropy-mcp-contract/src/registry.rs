// crates/ntropy-mcp-contract/src/registry.rs
// ============================================================================
// Module: Tool Registry
// Description: Read-only lookup over the tool contract catalogue.
// Purpose: Resolve tool names to contracts for validation and listing.
// Dependencies: ntropy-mcp-core, thiserror
// ============================================================================

//! ## Overview
//! [`ToolRegistry`] is built once at startup and never mutated. Lookup by
//! wire name fails closed with [`RegistryError::UnknownTool`].

use std::sync::Arc;

use ntropy_mcp_core::ToolName;
use thiserror::Error;

use crate::tooling::tool_contracts;
use crate::types::ToolContract;
use crate::types::ToolDefinition;

/// Registry lookup failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// No tool is registered under the requested name.
    #[error("unknown tool: {0}")]
    UnknownTool(String),
}

/// Immutable tool catalogue.
#[derive(Debug, Clone)]
pub struct ToolRegistry {
    /// Contracts in catalogue order.
    contracts: Arc<[ToolContract]>,
}

impl ToolRegistry {
    /// Builds the registry from the canonical contracts.
    #[must_use]
    pub fn new() -> Self {
        Self { contracts: tool_contracts().into() }
    }

    /// Resolves a wire name to its contract.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::UnknownTool`] when the name is not registered.
    pub fn lookup(&self, name: &str) -> Result<&ToolContract, RegistryError> {
        ToolName::parse(name)
            .and_then(|tool| self.get(tool))
            .ok_or_else(|| RegistryError::UnknownTool(name.to_string()))
    }

    /// Returns the contract for a known tool name.
    #[must_use]
    pub fn get(&self, tool: ToolName) -> Option<&ToolContract> {
        self.contracts.iter().find(|contract| contract.name == tool)
    }

    /// Returns all contracts in catalogue order.
    #[must_use]
    pub fn contracts(&self) -> &[ToolContract] {
        &self.contracts
    }

    /// Returns the listing view of every tool.
    #[must_use]
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.contracts.iter().map(ToolContract::definition).collect()
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}
