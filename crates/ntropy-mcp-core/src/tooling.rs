// crates/ntropy-mcp-core/src/tooling.rs
// ============================================================================
// Module: Tool Names
// Description: Canonical names of the exposed MCP tools.
// Purpose: Share one closed set of tool identifiers across crates.
// Dependencies: serde
// ============================================================================

//! Canonical names of the MCP tools exposed to calling agents.

use std::fmt;

use serde::Deserialize;
use serde::Serialize;

/// Tools exposed to calling agents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolName {
    /// Create an account holder.
    CreateAccountHolder,
    /// Enrich a single transaction.
    EnrichTransaction,
    /// Fetch an account holder.
    GetAccountHolder,
    /// List transactions for an account holder.
    ListTransactions,
    /// Fetch a transaction.
    GetTransaction,
    /// Enrich a batch of transactions.
    BulkEnrichTransactions,
    /// Delete an account holder and its transactions.
    DeleteAccountHolder,
    /// Delete a transaction.
    DeleteTransaction,
}

impl ToolName {
    /// Returns the wire name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::CreateAccountHolder => "create_account_holder",
            Self::EnrichTransaction => "enrich_transaction",
            Self::GetAccountHolder => "get_account_holder",
            Self::ListTransactions => "list_transactions",
            Self::GetTransaction => "get_transaction",
            Self::BulkEnrichTransactions => "bulk_enrich_transactions",
            Self::DeleteAccountHolder => "delete_account_holder",
            Self::DeleteTransaction => "delete_transaction",
        }
    }

    /// Returns every tool in catalogue order.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[
            Self::CreateAccountHolder,
            Self::EnrichTransaction,
            Self::GetAccountHolder,
            Self::ListTransactions,
            Self::GetTransaction,
            Self::BulkEnrichTransactions,
            Self::DeleteAccountHolder,
            Self::DeleteTransaction,
        ]
    }

    /// Parses a wire name.
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        Self::all().iter().copied().find(|tool| tool.as_str() == name)
    }

    /// Returns whether the tool mutates remote state.
    #[must_use]
    pub const fn is_mutating(self) -> bool {
        !matches!(self, Self::GetAccountHolder | Self::ListTransactions | Self::GetTransaction)
    }
}

impl fmt::Display for ToolName {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}
