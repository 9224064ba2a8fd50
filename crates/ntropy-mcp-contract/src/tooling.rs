// crates/ntropy-mcp-contract/src/tooling.rs
// ============================================================================
// Module: MCP Tool Contracts
// Description: Canonical tool definitions for the Ntropy enrichment surface.
// Purpose: Provide typed parameter lists, schemas, and examples per tool.
// Dependencies: ntropy-mcp-core, serde_json
// ============================================================================

//! ## Overview
//! This module defines the canonical MCP tool surface. Parameter lists are
//! declared once as [`ParamSpec`] values; input schemas are derived from them
//! so the validator and the advertised schema cannot drift apart.

// ============================================================================
// SECTION: Imports
// ============================================================================

use ntropy_mcp_core::AccountHolderType;
use ntropy_mcp_core::DEFAULT_LIST_LIMIT;
use ntropy_mcp_core::DEFAULT_LIST_OFFSET;
use ntropy_mcp_core::EntryType;
use ntropy_mcp_core::ToolName;
use serde_json::Map;
use serde_json::Value;
use serde_json::json;

use crate::types::ParamSpec;
use crate::types::ParamType;
use crate::types::ResultShape;
use crate::types::ToolContract;
use crate::types::ToolExample;

// ============================================================================
// SECTION: Tool Contracts
// ============================================================================

/// Returns the canonical MCP tool contracts in catalogue order.
#[must_use]
pub fn tool_contracts() -> Vec<ToolContract> {
    ToolName::all().iter().map(|tool| tool_contract(*tool)).collect()
}

/// Builds the contract for one tool.
#[must_use]
pub fn tool_contract(name: ToolName) -> ToolContract {
    match name {
        ToolName::CreateAccountHolder => build_tool_contract(
            name,
            "Create an account holder in the Ntropy API. An account holder is the person or \
             business that owns transactions and must exist before they are enriched.",
            vec![
                identifier_param("id", "Unique account holder identifier (string or integer)."),
                ParamSpec::required(
                    "type",
                    ParamType::Choice { options: AccountHolderType::ACCEPTED_LABELS },
                    "Account holder type; \"individual\" is accepted as \"consumer\".",
                ),
                ParamSpec::required("name", ParamType::Text, "Display name."),
            ],
            ResultShape::AccountHolder,
            vec![
                "Identifiers are forwarded as strings; 42 and \"42\" are the same holder."
                    .to_string(),
                "Not retried after the request is sent; duplicate ids are reported by the remote."
                    .to_string(),
            ],
        ),
        ToolName::EnrichTransaction => build_tool_contract(
            name,
            "Enrich a single bank transaction: the remote service attaches merchant, category, \
             and other derived attributes.",
            transaction_params(),
            ResultShape::Transaction,
            vec![
                "The referenced account holder must already exist.".to_string(),
                "Enriched fields are returned as produced by the remote service.".to_string(),
            ],
        ),
        ToolName::GetAccountHolder => build_tool_contract(
            name,
            "Fetch an existing account holder by id.",
            vec![identifier_param("account_holder_id", "Account holder identifier.")],
            ResultShape::AccountHolder,
            vec!["Returns not_found_error when the holder does not exist.".to_string()],
        ),
        ToolName::ListTransactions => build_tool_contract(
            name,
            "List one page of transactions for an account holder.",
            vec![
                identifier_param("account_holder_id", "Account holder identifier."),
                ParamSpec::optional(
                    "limit",
                    ParamType::Count { minimum: 1 },
                    json!(DEFAULT_LIST_LIMIT),
                    "Maximum number of transactions to return.",
                ),
                ParamSpec::optional(
                    "offset",
                    ParamType::Count { minimum: 0 },
                    json!(DEFAULT_LIST_OFFSET),
                    "Number of transactions to skip.",
                ),
            ],
            ResultShape::TransactionPage,
            vec![
                "Returns a single page; issue further calls with a larger offset for more."
                    .to_string(),
            ],
        ),
        ToolName::GetTransaction => build_tool_contract(
            name,
            "Fetch an enriched transaction by id.",
            vec![identifier_param("transaction_id", "Transaction identifier.")],
            ResultShape::Transaction,
            vec!["Returns not_found_error when the transaction does not exist.".to_string()],
        ),
        ToolName::BulkEnrichTransactions => build_tool_contract(
            name,
            "Enrich a batch of transactions in order. Each item carries its own outcome so a \
             partially failed batch still returns every successful enrichment.",
            vec![ParamSpec::required(
                "transactions",
                ParamType::TransactionBatch,
                "Transactions to enrich, each shaped like enrich_transaction input.",
            )],
            ResultShape::BulkEnrichment,
            vec![
                "results[i] always corresponds to transactions[i].".to_string(),
                "Large batches are split into ordered sub-batches.".to_string(),
                "Item failures are never retried automatically.".to_string(),
            ],
        ),
        ToolName::DeleteAccountHolder => build_tool_contract(
            name,
            "Delete an account holder and all of its transactions.",
            vec![identifier_param("account_holder_id", "Account holder identifier.")],
            ResultShape::Deletion,
            vec!["Deleting an absent holder succeeds with existed=false.".to_string()],
        ),
        ToolName::DeleteTransaction => build_tool_contract(
            name,
            "Delete a transaction.",
            vec![identifier_param("transaction_id", "Transaction identifier.")],
            ResultShape::Deletion,
            vec!["Deleting an absent transaction succeeds with existed=false.".to_string()],
        ),
    }
}

/// Assembles a contract and derives its schemas.
fn build_tool_contract(
    name: ToolName,
    description: &str,
    params: Vec<ParamSpec>,
    result_shape: ResultShape,
    notes: Vec<String>,
) -> ToolContract {
    let input_schema = with_schema(params_schema(&params));
    let output_schema = with_schema(result_schema(result_shape));
    ToolContract {
        name,
        description: description.to_string(),
        params,
        result_shape,
        input_schema,
        output_schema,
        examples: tool_examples(name),
        notes,
    }
}

/// Declares a required identifier parameter.
fn identifier_param(name: &'static str, description: &'static str) -> ParamSpec {
    ParamSpec::required(name, ParamType::Identifier, description)
}

/// Parameters shared by single transaction enrichment and bulk items.
#[must_use]
pub fn transaction_params() -> Vec<ParamSpec> {
    vec![
        identifier_param("id", "Unique transaction identifier (string or integer)."),
        ParamSpec::required("description", ParamType::Text, "Bank statement description."),
        ParamSpec::required("date", ParamType::Date, "Transaction date (YYYY-MM-DD)."),
        ParamSpec::required("amount", ParamType::Amount, "Signed transaction amount."),
        ParamSpec::required(
            "entry_type",
            ParamType::Choice { options: EntryType::LABELS },
            "Transaction direction.",
        ),
        ParamSpec::required("currency", ParamType::Currency, "ISO 4217 currency code."),
        identifier_param("account_holder_id", "Owning account holder identifier."),
        ParamSpec::optional(
            "country",
            ParamType::Country,
            Value::Null,
            "Optional ISO 3166-1 alpha-2 country code.",
        ),
    ]
}

// ============================================================================
// SECTION: Input Schemas
// ============================================================================

/// Derives an object schema from ordered parameter declarations.
fn params_schema(params: &[ParamSpec]) -> Value {
    let mut properties = Map::new();
    let mut required = Vec::new();
    for param in params {
        properties.insert(param.name.to_string(), param_schema(param));
        if param.required {
            required.push(Value::String(param.name.to_string()));
        }
    }
    json!({
        "type": "object",
        "required": required,
        "properties": properties,
        "additionalProperties": false
    })
}

/// Returns the schema fragment for one parameter.
fn param_schema(param: &ParamSpec) -> Value {
    let mut schema = type_schema(param.param_type);
    if let Value::Object(map) = &mut schema {
        map.insert("description".to_string(), Value::String(param.description.to_string()));
        if let Some(default) = &param.default {
            map.insert("default".to_string(), default.clone());
        }
    }
    schema
}

/// Returns the schema fragment for a semantic type.
fn type_schema(param_type: ParamType) -> Value {
    match param_type {
        ParamType::Identifier => json!({ "type": ["string", "integer"], "minLength": 1 }),
        ParamType::Text => json!({ "type": "string", "minLength": 1 }),
        ParamType::Date => json!({ "type": "string", "pattern": "^[0-9]{4}-[0-9]{2}-[0-9]{2}$" }),
        ParamType::Amount => json!({ "type": ["number", "string"] }),
        ParamType::Currency => json!({ "type": "string", "pattern": "^[A-Za-z]{3}$" }),
        ParamType::Country => json!({ "type": ["string", "null"], "pattern": "^[A-Za-z]{2}$" }),
        ParamType::Choice { options } => json!({ "type": "string", "enum": options }),
        ParamType::Count { minimum } => json!({ "type": "integer", "minimum": minimum }),
        ParamType::TransactionBatch => json!({
            "type": "array",
            "minItems": 1,
            "items": bulk_item_input_schema()
        }),
    }
}

/// Schema for one bulk item; accepts `country` or `location.country`.
fn bulk_item_input_schema() -> Value {
    let mut schema = params_schema(&transaction_params());
    if let Some(properties) = schema.get_mut("properties").and_then(Value::as_object_mut) {
        properties.insert(
            "location".to_string(),
            json!({
                "type": ["object", "null"],
                "properties": { "country": type_schema(ParamType::Country) },
                "additionalProperties": false
            }),
        );
    }
    schema
}

// ============================================================================
// SECTION: Output Schemas
// ============================================================================

/// Returns the output schema for a result shape.
fn result_schema(shape: ResultShape) -> Value {
    match shape {
        ResultShape::AccountHolder => account_holder_schema(),
        ResultShape::Transaction => transaction_schema(),
        ResultShape::TransactionPage => json!({
            "type": "object",
            "required": shape.fields(),
            "properties": {
                "account_holder_id": { "type": "string" },
                "limit": { "type": "integer", "minimum": 1 },
                "offset": { "type": "integer", "minimum": 0 },
                "count": { "type": "integer", "minimum": 0 },
                "transactions": { "type": "array", "items": transaction_schema() },
                "remote": { "type": "object" }
            },
            "additionalProperties": false
        }),
        ResultShape::BulkEnrichment => json!({
            "type": "object",
            "required": shape.fields(),
            "properties": {
                "status": { "type": "string", "enum": ["succeeded", "partial_failure", "failed"] },
                "total": { "type": "integer", "minimum": 0 },
                "succeeded": { "type": "integer", "minimum": 0 },
                "failed": { "type": "integer", "minimum": 0 },
                "results": { "type": "array", "items": bulk_item_result_schema() }
            },
            "additionalProperties": false
        }),
        ResultShape::Deletion => json!({
            "type": "object",
            "required": shape.fields(),
            "properties": {
                "deleted": { "const": true },
                "existed": { "type": "boolean" },
                "entity": { "type": "string", "enum": ["account_holder", "transaction"] },
                "id": { "type": "string" }
            },
            "additionalProperties": false
        }),
    }
}

/// Account holder record; remote-defined extra fields pass through.
fn account_holder_schema() -> Value {
    json!({
        "type": "object",
        "required": ResultShape::AccountHolder.fields(),
        "properties": {
            "id": { "type": "string" },
            "type": { "type": "string" },
            "name": { "type": "string" }
        }
    })
}

/// Enriched transaction record; enrichment fields are opaque.
fn transaction_schema() -> Value {
    json!({
        "type": "object",
        "required": ResultShape::Transaction.fields(),
        "properties": {
            "id": { "type": "string" },
            "country": { "type": ["string", "null"] }
        }
    })
}

/// Per-item bulk outcome.
fn bulk_item_result_schema() -> Value {
    json!({
        "type": "object",
        "required": ["index", "id", "status"],
        "properties": {
            "index": { "type": "integer", "minimum": 0 },
            "id": { "type": "string" },
            "status": { "type": "string", "enum": ["ok", "error"] },
            "transaction": transaction_schema(),
            "error": error_schema()
        },
        "additionalProperties": false
    })
}

/// Structured error payload.
#[must_use]
pub fn error_schema() -> Value {
    json!({
        "type": "object",
        "required": ["kind", "message", "retryable"],
        "properties": {
            "kind": { "type": "string" },
            "message": { "type": "string" },
            "retryable": { "type": "boolean" },
            "source_status": { "type": "integer" },
            "field": { "type": "string" },
            "entity": { "type": "string" },
            "id": { "type": "string" },
            "retry_after_secs": { "type": "integer" },
            "details": {}
        }
    })
}

/// Adds a `$schema` header to a top-level JSON schema.
fn with_schema(schema: Value) -> Value {
    let Value::Object(mut map) = schema else {
        return schema;
    };
    map.insert(
        String::from("$schema"),
        Value::String(String::from("https://json-schema.org/draft/2020-12/schema")),
    );
    Value::Object(map)
}

// ============================================================================
// SECTION: Examples
// ============================================================================

/// Returns worked examples for a tool.
#[must_use]
pub fn tool_examples(name: ToolName) -> Vec<ToolExample> {
    match name {
        ToolName::CreateAccountHolder => vec![example(
            "Create a consumer account holder.",
            json!({ "id": "acc_1", "type": "consumer", "name": "Jane Doe" }),
            json!({ "id": "acc_1", "type": "consumer", "name": "Jane Doe" }),
        )],
        ToolName::EnrichTransaction => vec![example(
            "Enrich a card payment.",
            json!({
                "id": "tx_1",
                "description": "UBER TRIP",
                "date": "2024-01-01",
                "amount": 12.5,
                "entry_type": "debit",
                "currency": "USD",
                "account_holder_id": "acc_1",
                "country": "US"
            }),
            json!({
                "id": "tx_1",
                "entry_type": "outgoing",
                "merchant": { "name": "Uber" },
                "categories": { "general": "rideshare" },
                "country": "US"
            }),
        )],
        ToolName::GetAccountHolder => vec![example(
            "Fetch an account holder using a numeric id.",
            json!({ "account_holder_id": 42 }),
            json!({ "id": "42", "type": "business", "name": "Acme Ltd" }),
        )],
        ToolName::ListTransactions => vec![example(
            "List the first two transactions.",
            json!({ "account_holder_id": "acc_1", "limit": 2, "offset": 0 }),
            json!({
                "account_holder_id": "acc_1",
                "limit": 2,
                "offset": 0,
                "count": 2,
                "transactions": [{ "id": "tx_1" }, { "id": "tx_2" }]
            }),
        )],
        ToolName::GetTransaction => vec![example(
            "Fetch an enriched transaction.",
            json!({ "transaction_id": "tx_1" }),
            json!({ "id": "tx_1", "merchant": { "name": "Uber" } }),
        )],
        ToolName::BulkEnrichTransactions => vec![example(
            "Enrich two transactions where the second names an unknown holder.",
            json!({
                "transactions": [
                    {
                        "id": "tx_1",
                        "description": "UBER TRIP",
                        "date": "2024-01-01",
                        "amount": "12.50",
                        "entry_type": "debit",
                        "currency": "usd",
                        "account_holder_id": "acc_1"
                    },
                    {
                        "id": 2,
                        "description": "SALARY",
                        "date": "2024-01-02",
                        "amount": 1000,
                        "entry_type": "credit",
                        "currency": "EUR",
                        "account_holder_id": "missing",
                        "location": { "country": "DE" }
                    }
                ]
            }),
            json!({
                "status": "partial_failure",
                "total": 2,
                "succeeded": 1,
                "failed": 1,
                "results": [
                    { "index": 0, "id": "tx_1", "status": "ok", "transaction": { "id": "tx_1" } },
                    {
                        "index": 1,
                        "id": "2",
                        "status": "error",
                        "error": {
                            "kind": "not_found_error",
                            "message": "account_holder missing not found",
                            "retryable": false,
                            "entity": "account_holder",
                            "id": "missing"
                        }
                    }
                ]
            }),
        )],
        ToolName::DeleteAccountHolder => vec![example(
            "Delete an account holder that no longer exists.",
            json!({ "account_holder_id": "acc_9" }),
            json!({ "deleted": true, "existed": false, "entity": "account_holder", "id": "acc_9" }),
        )],
        ToolName::DeleteTransaction => vec![example(
            "Delete a transaction.",
            json!({ "transaction_id": 7 }),
            json!({ "deleted": true, "existed": true, "entity": "transaction", "id": "7" }),
        )],
    }
}

/// Builds a tool example.
fn example(description: &str, input: Value, output: Value) -> ToolExample {
    ToolExample { description: description.to_string(), input, output }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests;
