// crates/ntropy-mcp-client/src/wire.rs
// ============================================================================
// Module: Wire Bodies
// Description: Request bodies for the Ntropy v3 API.
// Purpose: Map validated domain inputs onto remote field names.
// Dependencies: ntropy-mcp-core, serde_json
// ============================================================================

use ntropy_mcp_core::NewAccountHolder;
use ntropy_mcp_core::TransactionInput;
use serde_json::Map;
use serde_json::Value;
use serde_json::json;

/// Body for `POST /v3/account_holders`.
pub(crate) fn account_holder_body(holder: &NewAccountHolder) -> Value {
    json!({
        "id": holder.id.as_str(),
        "type": holder.holder_type.as_str(),
        "name": holder.name,
    })
}

/// Body for one transaction; `country` travels as `location.country`.
pub(crate) fn transaction_body(transaction: &TransactionInput) -> Value {
    let mut body = Map::new();
    body.insert("id".to_string(), Value::String(transaction.id.to_string()));
    body.insert("description".to_string(), Value::String(transaction.description.clone()));
    body.insert("date".to_string(), Value::String(transaction.date.clone()));
    body.insert("amount".to_string(), Value::Number(transaction.amount.clone()));
    body.insert(
        "entry_type".to_string(),
        Value::String(transaction.entry_type.as_str().to_string()),
    );
    body.insert("currency".to_string(), Value::String(transaction.currency.clone()));
    body.insert(
        "account_holder_id".to_string(),
        Value::String(transaction.account_holder_id.to_string()),
    );
    if let Some(country) = &transaction.country {
        body.insert("location".to_string(), json!({ "country": country }));
    }
    Value::Object(body)
}

/// Body for `POST /v3/transactions/bulk`.
pub(crate) fn bulk_body(transactions: &[TransactionInput]) -> Value {
    json!({ "transactions": transactions.iter().map(transaction_body).collect::<Vec<_>>() })
}
