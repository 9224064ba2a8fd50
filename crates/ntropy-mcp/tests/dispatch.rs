// crates/ntropy-mcp/tests/dispatch.rs
// ============================================================================
// Module: Tool Dispatch Tests
// Description: Router behavior over an in-memory enrichment service.
// Purpose: Validate catalogue, validation gating, and error mapping.
// Dependencies: ntropy-mcp, ntropy-mcp-core, serde_json
// ============================================================================

//! Tool router integration tests.

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::missing_docs_in_private_items,
    reason = "Test-only assertions and helpers."
)]

mod common;

use ntropy_mcp::ToolError;
use ntropy_mcp::ValidationError;
use ntropy_mcp_core::ApiError;
use ntropy_mcp_core::ApiErrorKind;
use ntropy_mcp_core::ToolName;
use serde_json::json;

use crate::common::FakeService;
use crate::common::router_with;
use crate::common::tx_args;

#[test]
fn lists_all_tools_in_catalogue_order() {
    let (router, _) = router_with(FakeService::new());
    let names: Vec<ToolName> = router.list_tools().iter().map(|def| def.name).collect();
    assert_eq!(names, ToolName::all().to_vec());
    for definition in router.list_tools() {
        assert!(!definition.description.is_empty());
        assert_eq!(definition.input_schema["type"], json!("object"));
    }
}

#[test]
fn missing_parameter_never_reaches_remote() {
    let (router, service) = router_with(FakeService::new().with_holder("acc_1"));
    let mut args = tx_args("tx_1", "acc_1");
    args.as_object_mut().unwrap().remove("currency");

    let error = router.dispatch("enrich_transaction", &args).unwrap_err();
    assert_eq!(
        error,
        ToolError::Validation(ValidationError::MissingParameter { field: "currency".into() })
    );
    assert_eq!(error.jsonrpc_code(), -32602);
    assert_eq!(error.payload()["field"], json!("currency"));
    assert_eq!(error.payload()["retryable"], json!(false));
    assert!(service.calls().is_empty());
}

#[test]
fn unknown_tool_is_reported_without_remote_call() {
    let (router, service) = router_with(FakeService::new());
    let error = router.dispatch("check_connection", &json!({})).unwrap_err();
    assert_eq!(error.jsonrpc_code(), -32601);
    assert_eq!(error.kind_label(), "unknown_tool");
    assert_eq!(error.payload()["tool"], json!("check_connection"));
    assert!(service.calls().is_empty());
}

#[test]
fn numeric_and_string_ids_reach_remote_identically() {
    let (router, service) = router_with(FakeService::new().with_holder("42"));
    let numeric = router.dispatch("get_account_holder", &json!({ "account_holder_id": 42 }));
    let text = router.dispatch("get_account_holder", &json!({ "account_holder_id": "42" }));

    let numeric = numeric.unwrap();
    assert_eq!(numeric.value, text.unwrap().value);
    assert_eq!(numeric.value["id"], json!("42"));
    assert_eq!(service.call_ids(), vec![vec!["42".to_string()], vec!["42".to_string()]]);
}

#[test]
fn panic_inside_remote_call_becomes_internal_error() {
    let service = FakeService::new().panicking_on(ToolName::GetTransaction);
    let (router, _) = router_with(service);
    let args = json!({ "transaction_id": "tx_1" });
    let error = router.dispatch("get_transaction", &args).unwrap_err();
    assert_eq!(error.kind_label(), "internal");
    assert_eq!(error.jsonrpc_code(), -32050);
    let ToolError::Api(api) = &error else { panic!("expected api error, got {error:?}") };
    assert!(api.message.contains("get_transaction failed unexpectedly"));

    // The router stays usable after a caught panic.
    let listed = router.dispatch("list_transactions", &json!({ "account_holder_id": "acc_1" }));
    assert_eq!(listed.unwrap().value["count"], json!(0));
}

#[test]
fn deleting_absent_entity_is_idempotent() {
    let (router, _) = router_with(FakeService::new().with_holder("acc_1"));
    let args = json!({ "account_holder_id": "acc_1" });

    let first = router.dispatch("delete_account_holder", &args).unwrap();
    assert_eq!(first.value["existed"], json!(true));
    assert_eq!(first.value["deleted"], json!(true));

    let second = router.dispatch("delete_account_holder", &args).unwrap();
    assert_eq!(second.value["existed"], json!(false));
    assert_eq!(second.value["deleted"], json!(true));
    assert_eq!(second.value["entity"], json!("account_holder"));
    assert!(!second.is_error);

    let missing = router.dispatch("delete_transaction", &json!({ "transaction_id": 7 })).unwrap();
    assert_eq!(missing.value, json!({
        "deleted": true,
        "existed": false,
        "entity": "transaction",
        "id": "7"
    }));
}

#[test]
fn bulk_enrichment_reports_partial_failure() {
    let (router, _) = router_with(FakeService::new().with_holder("acc_1"));
    let args = json!({ "transactions": [tx_args("tx_1", "acc_1"), tx_args("tx_2", "acc_9")] });

    let output = router.dispatch("bulk_enrich_transactions", &args).unwrap();
    assert!(!output.is_error);
    assert_eq!(output.value["status"], json!("partial_failure"));
    assert_eq!(output.value["total"], json!(2));
    assert_eq!(output.value["succeeded"], json!(1));
    assert_eq!(output.value["failed"], json!(1));

    let results = output.value["results"].as_array().unwrap();
    assert_eq!(results[0]["status"], json!("ok"));
    assert_eq!(results[0]["transaction"]["merchant"]["name"], json!("Uber"));
    assert_eq!(results[1]["status"], json!("error"));
    assert_eq!(results[1]["id"], json!("tx_2"));
    assert_eq!(results[1]["error"]["kind"], json!("not_found_error"));
    assert_eq!(results[1]["error"]["id"], json!("acc_9"));
}

#[test]
fn empty_bulk_batch_is_rejected_before_remote() {
    let (router, service) = router_with(FakeService::new());
    let error = router
        .dispatch("bulk_enrich_transactions", &json!({ "transactions": [] }))
        .unwrap_err();
    assert_eq!(error.jsonrpc_code(), -32602);
    assert!(service.calls().is_empty());
}

#[test]
fn enrichment_for_unknown_holder_names_the_entity() {
    let (router, _) = router_with(FakeService::new());
    let error = router.dispatch("enrich_transaction", &tx_args("tx_1", "acc_1")).unwrap_err();
    assert_eq!(error.kind_label(), "not_found_error");
    assert_eq!(error.jsonrpc_code(), -32004);
    let payload = error.payload();
    assert_eq!(payload["entity"], json!("account_holder"));
    assert_eq!(payload["id"], json!("acc_1"));
    assert_eq!(payload["source_status"], json!(404));
    assert_eq!(payload["retryable"], json!(false));
}

#[test]
fn list_returns_requested_page() {
    let (router, _) = router_with(FakeService::new().with_holder("acc_1"));
    for index in 0 .. 5 {
        router.dispatch("enrich_transaction", &tx_args(&format!("tx_{index}"), "acc_1")).unwrap();
    }

    let args = json!({ "account_holder_id": "acc_1", "limit": 2, "offset": 1 });
    let page = router.dispatch("list_transactions", &args).unwrap().value;
    assert_eq!(page["count"], json!(2));
    assert_eq!(page["limit"], json!(2));
    assert_eq!(page["offset"], json!(1));
    let ids: Vec<&str> = page["transactions"]
        .as_array()
        .unwrap()
        .iter()
        .map(|tx| tx["id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec!["tx_1", "tx_2"]);
}

#[test]
fn remote_failures_keep_their_kind_and_retry_hint() {
    let failure = ApiError::new(ApiErrorKind::RateLimit, "slow down")
        .with_status(429)
        .with_retry_after(3);
    let (router, service) = router_with(FakeService::new().failing_with(failure));

    let args = json!({ "id": "acc_1", "type": "business", "name": "Acme" });
    let error = router.dispatch("create_account_holder", &args).unwrap_err();
    assert_eq!(error.jsonrpc_code(), -32029);
    assert!(error.retryable());
    assert_eq!(error.payload()["retry_after_secs"], json!(3));
    assert_eq!(service.calls(), vec![ToolName::CreateAccountHolder]);
}

#[test]
fn create_then_get_round_trips_holder() {
    let (router, _) = router_with(FakeService::new());
    let args = json!({ "id": 9001, "type": "freelancer", "name": "Dana" });
    let created = router.dispatch("create_account_holder", &args).unwrap().value;
    assert_eq!(created, json!({ "id": "9001", "type": "freelancer", "name": "Dana" }));

    let fetched = router.dispatch("get_account_holder", &json!({ "account_holder_id": "9001" }));
    assert_eq!(fetched.unwrap().value, created);

    let duplicate = router.dispatch("create_account_holder", &args).unwrap_err();
    assert_eq!(duplicate.kind_label(), "rejected");
}
