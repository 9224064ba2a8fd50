// crates/ntropy-mcp-core/src/model.rs
// ============================================================================
// Module: Domain Model
// Description: Validated inputs for account holder and transaction operations.
// Purpose: Typed values produced by argument validation and consumed by clients.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! These types are only constructed after argument validation, so every field
//! already satisfies its semantic constraints: currencies are upper-cased
//! three-letter codes, dates are real calendar dates, and identifiers are
//! canonical. Enriched output from the remote service is never modeled here.

use std::fmt;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Number;

use crate::identifiers::Identifier;

/// Default page size for `list_transactions`.
pub const DEFAULT_LIST_LIMIT: u64 = 10;
/// Default page offset for `list_transactions`.
pub const DEFAULT_LIST_OFFSET: u64 = 0;

// ============================================================================
// SECTION: Enumerations
// ============================================================================

/// Account holder classification accepted by the remote service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountHolderType {
    /// Individual consumer.
    Consumer,
    /// Business entity.
    Business,
    /// Self-employed individual.
    Freelancer,
    /// Unclassified holder.
    Unknown,
}

impl AccountHolderType {
    /// Accepted wire labels in declaration order.
    pub const LABELS: &'static [&'static str] = &["consumer", "business", "freelancer", "unknown"];

    /// Labels accepted from callers: the wire labels plus `individual`, an alias of `consumer`.
    pub const ACCEPTED_LABELS: &'static [&'static str] =
        &["consumer", "business", "freelancer", "unknown", "individual"];

    /// Returns the stable wire label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Consumer => "consumer",
            Self::Business => "business",
            Self::Freelancer => "freelancer",
            Self::Unknown => "unknown",
        }
    }

    /// Parses a wire label or the `individual` alias (case-insensitive).
    #[must_use]
    pub fn parse(label: &str) -> Option<Self> {
        match label.to_ascii_lowercase().as_str() {
            "consumer" | "individual" => Some(Self::Consumer),
            "business" => Some(Self::Business),
            "freelancer" => Some(Self::Freelancer),
            "unknown" => Some(Self::Unknown),
            _ => None,
        }
    }
}

impl fmt::Display for AccountHolderType {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// Direction of a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryType {
    /// Money leaving the account.
    Debit,
    /// Money entering the account.
    Credit,
}

impl EntryType {
    /// Accepted wire labels in declaration order.
    pub const LABELS: &'static [&'static str] = &["debit", "credit"];

    /// Returns the stable wire label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Debit => "debit",
            Self::Credit => "credit",
        }
    }

    /// Parses a wire label (case-insensitive).
    #[must_use]
    pub fn parse(label: &str) -> Option<Self> {
        match label.to_ascii_lowercase().as_str() {
            "debit" => Some(Self::Debit),
            "credit" => Some(Self::Credit),
            _ => None,
        }
    }
}

impl fmt::Display for EntryType {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

// ============================================================================
// SECTION: Inputs
// ============================================================================

/// Account holder to create.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAccountHolder {
    /// Caller-supplied identifier.
    pub id: Identifier,
    /// Holder classification.
    pub holder_type: AccountHolderType,
    /// Display name.
    pub name: String,
}

/// Transaction submitted for enrichment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionInput {
    /// Caller-supplied identifier, unique within the account holder.
    pub id: Identifier,
    /// Free-form bank description.
    pub description: String,
    /// Booking date in `YYYY-MM-DD` form.
    pub date: String,
    /// Signed decimal amount, forwarded without float round-tripping.
    pub amount: Number,
    /// Debit or credit.
    pub entry_type: EntryType,
    /// Upper-cased ISO 4217 currency code.
    pub currency: String,
    /// Owning account holder.
    pub account_holder_id: Identifier,
    /// Upper-cased ISO 3166-1 alpha-2 country code.
    pub country: Option<String>,
}

/// One page of transactions for an account holder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListQuery {
    /// Owning account holder.
    pub account_holder_id: Identifier,
    /// Page size (at least one).
    pub limit: u64,
    /// Number of records to skip.
    pub offset: u64,
}

impl ListQuery {
    /// Builds a query with default paging.
    #[must_use]
    pub const fn first_page(account_holder_id: Identifier) -> Self {
        Self { account_holder_id, limit: DEFAULT_LIST_LIMIT, offset: DEFAULT_LIST_OFFSET }
    }
}
