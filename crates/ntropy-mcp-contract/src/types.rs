// crates/ntropy-mcp-contract/src/types.rs
// ============================================================================
// Module: Contract Types
// Description: Typed shapes for tool parameters, results, and listings.
// Purpose: Provide the closed vocabulary validation and schemas are built from.
// Dependencies: ntropy-mcp-core, serde, serde_json
// ============================================================================

//! ## Overview
//! A [`ToolContract`] pairs a tool name with an ordered list of [`ParamSpec`]
//! entries and a [`ResultShape`]. Parameter semantic types are a closed enum
//! so the validator can check them exhaustively; JSON schemas are derived
//! from the same data and never maintained by hand.

// ============================================================================
// SECTION: Imports
// ============================================================================

use ntropy_mcp_core::ToolName;
use serde::Serialize;
use serde_json::Value;

// ============================================================================
// SECTION: Parameters
// ============================================================================

/// Semantic type of a tool parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ParamType {
    /// Opaque identifier supplied as a string or an integer.
    Identifier,
    /// Non-empty free text.
    Text,
    /// Calendar date in `YYYY-MM-DD` form.
    Date,
    /// Signed decimal supplied as a number or numeric string.
    Amount,
    /// Three-letter ISO 4217 currency code.
    Currency,
    /// Two-letter ISO 3166-1 country code.
    Country,
    /// One of a fixed set of lowercase labels.
    Choice {
        /// Accepted labels.
        options: &'static [&'static str],
    },
    /// Non-negative integer with a lower bound.
    Count {
        /// Smallest accepted value.
        minimum: u64,
    },
    /// Non-empty array of transaction objects.
    TransactionBatch,
}

impl ParamType {
    /// Returns a short label used in type-mismatch messages.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Identifier => "string or integer identifier",
            Self::Text => "non-empty string",
            Self::Date => "date in YYYY-MM-DD form",
            Self::Amount => "number or numeric string",
            Self::Currency => "three-letter currency code",
            Self::Country => "two-letter country code",
            Self::Choice { .. } => "one of the listed values",
            Self::Count { .. } => "non-negative integer",
            Self::TransactionBatch => "non-empty array of transactions",
        }
    }
}

/// One declared parameter of a tool.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParamSpec {
    /// Argument name.
    pub name: &'static str,
    /// Semantic type.
    #[serde(rename = "type")]
    pub param_type: ParamType,
    /// Whether the caller must supply the argument.
    pub required: bool,
    /// Value used when an optional argument is absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    /// Description surfaced in the input schema.
    pub description: &'static str,
}

impl ParamSpec {
    /// Declares a required parameter.
    #[must_use]
    pub fn required(
        name: &'static str,
        param_type: ParamType,
        description: &'static str,
    ) -> Self {
        Self { name, param_type, required: true, default: None, description }
    }

    /// Declares an optional parameter with a default.
    #[must_use]
    pub fn optional(
        name: &'static str,
        param_type: ParamType,
        default: Value,
        description: &'static str,
    ) -> Self {
        Self { name, param_type, required: false, default: Some(default), description }
    }
}

// ============================================================================
// SECTION: Results
// ============================================================================

/// Shape of a tool's successful result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultShape {
    /// Account holder record.
    AccountHolder,
    /// Enriched transaction record.
    Transaction,
    /// One page of enriched transactions.
    TransactionPage,
    /// Ordered per-item bulk outcome.
    BulkEnrichment,
    /// Idempotent delete acknowledgement.
    Deletion,
}

impl ResultShape {
    /// Fields always present in the translated result.
    #[must_use]
    pub const fn fields(self) -> &'static [&'static str] {
        match self {
            Self::AccountHolder => &["id", "type", "name"],
            Self::Transaction => &["id"],
            Self::TransactionPage => {
                &["account_holder_id", "limit", "offset", "count", "transactions"]
            }
            Self::BulkEnrichment => &["status", "total", "succeeded", "failed", "results"],
            Self::Deletion => &["deleted", "existed", "entity", "id"],
        }
    }
}

// ============================================================================
// SECTION: Tooling Contracts
// ============================================================================

/// Tool definition used by MCP tool listing.
///
/// # Invariants
/// - `name` is a stable MCP tool identifier.
/// - `input_schema` is a JSON Schema payload for the tool input shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ToolDefinition {
    /// MCP tool name.
    pub name: ToolName,
    /// Tool description for clients.
    pub description: String,
    /// JSON schema for tool input.
    #[serde(rename = "inputSchema")]
    pub input_schema: Value,
}

/// Tool contract with typed parameters and derived schemas.
///
/// # Invariants
/// - `params` are ordered as documented and names are unique.
/// - `input_schema` is derived from `params`.
/// - `examples` validate against the schemas.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolContract {
    /// Tool name.
    pub name: ToolName,
    /// Tool description.
    pub description: String,
    /// Ordered parameter declarations.
    pub params: Vec<ParamSpec>,
    /// Result shape descriptor.
    pub result_shape: ResultShape,
    /// JSON schema for tool input payload.
    pub input_schema: Value,
    /// JSON schema for tool response payload.
    pub output_schema: Value,
    /// Example payloads for documentation.
    pub examples: Vec<ToolExample>,
    /// Notes describing tool usage.
    pub notes: Vec<String>,
}

impl ToolContract {
    /// Returns the declared parameter with the given name.
    #[must_use]
    pub fn param(&self, name: &str) -> Option<&ParamSpec> {
        self.params.iter().find(|param| param.name == name)
    }

    /// Returns the listing view of this contract.
    #[must_use]
    pub fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name,
            description: self.description.clone(),
            input_schema: self.input_schema.clone(),
        }
    }
}

/// Tool example with input/output payloads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ToolExample {
    /// Short example description.
    pub description: String,
    /// Example input payload.
    pub input: Value,
    /// Example output payload.
    pub output: Value,
}
