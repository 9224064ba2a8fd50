// crates/ntropy-mcp-contract/src/tooling/tests.rs
// ============================================================================
// Module: Tooling Schema Unit Tests
// Description: Validates tool examples against their derived JSON schemas.
// Purpose: Keep examples, parameter lists, and schemas in sync.
// Dependencies: ntropy-mcp-contract, jsonschema, serde_json
// ============================================================================

//! ## Overview
//! Verifies that tool input/output examples satisfy their JSON schemas and
//! that schema `required` lists mirror the declared parameters.

// ============================================================================
// SECTION: Lint Configuration
// ============================================================================

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    clippy::missing_docs_in_private_items,
    reason = "Test-only validation helpers use panic-based assertions for clarity."
)]

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;

use jsonschema::Draft;
use jsonschema::Validator;
use ntropy_mcp_core::ToolName;
use serde_json::Value;
use serde_json::json;

use super::tool_contract;
use super::tool_contracts;

// ============================================================================
// SECTION: Fixtures
// ============================================================================

fn compile_schema(schema: &Value) -> Validator {
    jsonschema::options()
        .with_draft(Draft::Draft202012)
        .build(schema)
        .expect("schema compilation failed")
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[test]
fn tool_examples_match_tool_schemas() {
    for contract in tool_contracts() {
        let input_schema = compile_schema(&contract.input_schema);
        let output_schema = compile_schema(&contract.output_schema);
        assert!(!contract.examples.is_empty(), "tool examples missing for {}", contract.name);
        for example in &contract.examples {
            assert!(
                input_schema.is_valid(&example.input),
                "input example failed for {}",
                contract.name
            );
            assert!(
                output_schema.is_valid(&example.output),
                "output example failed for {}",
                contract.name
            );
        }
    }
}

#[test]
fn schema_required_lists_mirror_declared_params() {
    for contract in tool_contracts() {
        let required: BTreeSet<&str> = contract
            .input_schema
            .get("required")
            .and_then(Value::as_array)
            .expect("required missing")
            .iter()
            .filter_map(Value::as_str)
            .collect();
        let declared: BTreeSet<&str> =
            contract.params.iter().filter(|param| param.required).map(|param| param.name).collect();
        assert_eq!(required, declared, "required list drifted for {}", contract.name);
    }
}

#[test]
fn list_transactions_declares_paging_defaults() {
    let contract = tool_contract(ToolName::ListTransactions);
    let properties = contract.input_schema.get("properties").expect("properties");
    assert_eq!(properties["limit"]["default"], json!(10));
    assert_eq!(properties["offset"]["default"], json!(0));
    assert_eq!(contract.param("limit").and_then(|param| param.default.clone()), Some(json!(10)));
}

#[test]
fn identifier_params_accept_strings_and_integers() {
    let contract = tool_contract(ToolName::GetAccountHolder);
    let schema = compile_schema(&contract.input_schema);
    assert!(schema.is_valid(&json!({ "account_holder_id": 7 })));
    assert!(schema.is_valid(&json!({ "account_holder_id": "7" })));
    assert!(!schema.is_valid(&json!({ "account_holder_id": 7.5 })));
    assert!(!schema.is_valid(&json!({ "account_holder_id": "7", "extra": true })));
}

#[test]
fn bulk_schema_rejects_empty_batches() {
    let contract = tool_contract(ToolName::BulkEnrichTransactions);
    let schema = compile_schema(&contract.input_schema);
    assert!(!schema.is_valid(&json!({ "transactions": [] })));
}
