// crates/ntropy-mcp-core/src/service.rs
// ============================================================================
// Module: Enrichment Service Interface
// Description: Operation-per-endpoint seam between dispatch and transport.
// Purpose: Let the dispatcher drive any remote client or test double.
// Dependencies: serde_json
// ============================================================================

//! ## Overview
//! [`EnrichmentService`] exposes one blocking method per remote endpoint. The
//! HTTP client implements it against the live API; tests substitute in-memory
//! doubles. Implementations must be safe to share across concurrent dispatches
//! and must normalize every failure into an [`ApiError`] before returning.

use serde_json::Value;

use crate::error::ApiError;
use crate::identifiers::Identifier;
use crate::model::ListQuery;
use crate::model::NewAccountHolder;
use crate::model::TransactionInput;

/// Result of an idempotent delete.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    /// The entity existed and was removed.
    Deleted,
    /// The entity was already absent.
    AlreadyAbsent,
}

impl DeleteOutcome {
    /// Returns whether the entity existed before the call.
    #[must_use]
    pub const fn existed(self) -> bool {
        matches!(self, Self::Deleted)
    }
}

/// Per-item outcome of a bulk enrichment, positionally aligned with its input.
#[derive(Debug, Clone, PartialEq)]
pub enum BulkItemResult {
    /// Enriched transaction as returned by the remote service.
    Enriched(Value),
    /// Item-level failure.
    Failed(ApiError),
}

impl BulkItemResult {
    /// Returns whether the item succeeded.
    #[must_use]
    pub const fn is_enriched(&self) -> bool {
        matches!(self, Self::Enriched(_))
    }
}

/// Blocking operations against the remote enrichment service.
pub trait EnrichmentService: Send + Sync {
    /// Creates an account holder.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError`] when the remote call fails.
    fn create_account_holder(&self, holder: &NewAccountHolder) -> Result<Value, ApiError>;

    /// Fetches an account holder.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError`] when the holder is absent or the remote call fails.
    fn get_account_holder(&self, id: &Identifier) -> Result<Value, ApiError>;

    /// Deletes an account holder and its transactions.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError`] when the remote call fails. Absence is not an error.
    fn delete_account_holder(&self, id: &Identifier) -> Result<DeleteOutcome, ApiError>;

    /// Enriches one transaction.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError`] when the owning holder is absent or the call fails.
    fn enrich_transaction(&self, transaction: &TransactionInput) -> Result<Value, ApiError>;

    /// Enriches a batch, returning one result per input in input order.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError`] only when the batch as a whole could not be
    /// processed. Item failures are reported inside the returned vector.
    fn bulk_enrich_transactions(
        &self,
        transactions: &[TransactionInput],
    ) -> Result<Vec<BulkItemResult>, ApiError>;

    /// Lists one page of transactions for an account holder.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError`] when the remote call fails.
    fn list_transactions(&self, query: &ListQuery) -> Result<Value, ApiError>;

    /// Fetches a transaction.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError`] when the transaction is absent or the call fails.
    fn get_transaction(&self, id: &Identifier) -> Result<Value, ApiError>;

    /// Deletes a transaction.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError`] when the remote call fails. Absence is not an error.
    fn delete_transaction(&self, id: &Identifier) -> Result<DeleteOutcome, ApiError>;
}
