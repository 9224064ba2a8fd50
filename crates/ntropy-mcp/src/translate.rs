// crates/ntropy-mcp/src/translate.rs
// ============================================================================
// Module: Response Translation
// Description: Maps remote responses onto tool result shapes.
// Purpose: Give callers stable result fields regardless of remote layout.
// Dependencies: ntropy-mcp-core, serde_json
// ============================================================================

//! ## Overview
//! Translation is pure. Enriched attributes are passed through untouched; the
//! translator only canonicalizes identifiers to strings, lifts
//! `location.country` to `country`, wraps list responses in a page envelope,
//! and turns per-item bulk outcomes into an ordered result list with a batch
//! summary. A bulk call where every item failed is flagged as an error result
//! without losing the per-item detail.

use ntropy_mcp_core::ApiError;
use ntropy_mcp_core::ApiErrorKind;
use ntropy_mcp_core::BulkItemResult;
use ntropy_mcp_core::DeleteOutcome;
use ntropy_mcp_core::EntityKind;
use ntropy_mcp_core::Identifier;
use ntropy_mcp_core::ListQuery;
use ntropy_mcp_core::NewAccountHolder;
use ntropy_mcp_core::TransactionInput;
use serde_json::Map;
use serde_json::Value;
use serde_json::json;

use crate::validation::ToolRequest;

/// Keys under which the remote may return a transaction list.
const LIST_KEYS: &[&str] = &["transactions", "data", "results"];

/// Raw outcome of a successful remote operation.
#[derive(Debug, Clone, PartialEq)]
pub enum RemoteOutcome {
    /// Decoded JSON body.
    Record(Value),
    /// Ordered per-item bulk outcomes.
    Items(Vec<BulkItemResult>),
    /// Delete outcome.
    Deleted(DeleteOutcome),
}

/// Tool result handed back to the protocol layer.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolOutput {
    /// Structured result payload.
    pub value: Value,
    /// True when the result reports a failure in-band (a fully failed batch).
    pub is_error: bool,
}

impl ToolOutput {
    /// Successful result.
    #[must_use]
    pub const fn ok(value: Value) -> Self {
        Self { value, is_error: false }
    }
}

/// Stateless response translator.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResponseTranslator;

impl ResponseTranslator {
    /// Creates a translator.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Translates a remote outcome for the request that produced it.
    ///
    /// # Errors
    ///
    /// Returns a non-retryable [`ApiError`] when the remote response has a
    /// shape the tool cannot represent, or an internal error when the outcome
    /// does not belong to the request.
    pub fn translate(
        &self,
        request: &ToolRequest,
        outcome: RemoteOutcome,
    ) -> Result<ToolOutput, ApiError> {
        match (request, outcome) {
            (ToolRequest::CreateAccountHolder(holder), RemoteOutcome::Record(value)) => {
                account_holder(value, &holder.id, Some(holder)).map(ToolOutput::ok)
            }
            (ToolRequest::GetAccountHolder(id), RemoteOutcome::Record(value)) => {
                account_holder(value, id, None).map(ToolOutput::ok)
            }
            (ToolRequest::EnrichTransaction(tx), RemoteOutcome::Record(value)) => {
                transaction(single_record(value), Some(&tx.id)).map(ToolOutput::ok)
            }
            (ToolRequest::GetTransaction(id), RemoteOutcome::Record(value)) => {
                transaction(value, Some(id)).map(ToolOutput::ok)
            }
            (ToolRequest::ListTransactions(query), RemoteOutcome::Record(value)) => {
                page(query, value).map(ToolOutput::ok)
            }
            (ToolRequest::BulkEnrichTransactions(inputs), RemoteOutcome::Items(items)) => {
                bulk(inputs, items)
            }
            (ToolRequest::DeleteAccountHolder(id), RemoteOutcome::Deleted(outcome)) => {
                Ok(ToolOutput::ok(deletion(EntityKind::AccountHolder, id, outcome)))
            }
            (ToolRequest::DeleteTransaction(id), RemoteOutcome::Deleted(outcome)) => {
                Ok(ToolOutput::ok(deletion(EntityKind::Transaction, id, outcome)))
            }
            (request, _) => Err(ApiError::internal(format!(
                "remote outcome does not match tool {}",
                request.tool()
            ))),
        }
    }
}

// ============================================================================
// SECTION: Records
// ============================================================================

/// Account holder record with a string id; creation echoes sent fields.
fn account_holder(
    value: Value,
    id: &Identifier,
    sent: Option<&NewAccountHolder>,
) -> Result<Value, ApiError> {
    let mut record = object_or_empty(value, "account holder")?;
    canonical_id(&mut record, Some(id));
    if let Some(holder) = sent {
        record
            .entry("type")
            .or_insert_with(|| Value::String(holder.holder_type.as_str().to_string()));
        record.entry("name").or_insert_with(|| Value::String(holder.name.clone()));
    }
    Ok(Value::Object(record))
}

/// Transaction record with a string id and a top-level `country`.
fn transaction(value: Value, id: Option<&Identifier>) -> Result<Value, ApiError> {
    let mut record = object_or_empty(value, "transaction")?;
    canonical_id(&mut record, id);
    lift_country(&mut record);
    Ok(Value::Object(record))
}

/// Unwraps a single-element array returned for a single-item request.
fn single_record(value: Value) -> Value {
    match value {
        Value::Array(mut items) if items.len() == 1 => items.pop().unwrap_or(Value::Null),
        other => other,
    }
}

/// Returns the object, an empty object for `null`, or a shape error.
fn object_or_empty(value: Value, what: &str) -> Result<Map<String, Value>, ApiError> {
    match value {
        Value::Object(map) => Ok(map),
        Value::Null => Ok(Map::new()),
        _ => Err(unexpected_shape(what)),
    }
}

/// Rewrites `id` as a canonical string, falling back to the requested id.
fn canonical_id(record: &mut Map<String, Value>, fallback: Option<&Identifier>) {
    let id = record.get("id").and_then(Identifier::from_json).or_else(|| fallback.cloned());
    if let Some(id) = id {
        record.insert("id".to_string(), Value::String(id.to_string()));
    }
}

/// Moves `location.country` to `country` unless `country` is already set.
fn lift_country(record: &mut Map<String, Value>) {
    let nested = record
        .get_mut("location")
        .and_then(Value::as_object_mut)
        .and_then(|location| location.remove("country"));
    if let Some(country) = nested
        && record.get("country").is_none_or(Value::is_null)
    {
        record.insert("country".to_string(), country);
    }
    if record.get("location").and_then(Value::as_object).is_some_and(Map::is_empty) {
        record.remove("location");
    }
}

/// Error for a remote response the tool cannot represent.
fn unexpected_shape(what: &str) -> ApiError {
    let message = format!("remote returned an unexpected {what} shape");
    ApiError::new(ApiErrorKind::RemoteService, message).with_retryable(false)
}

// ============================================================================
// SECTION: Pages
// ============================================================================

/// Wraps one page of transactions; other top-level fields go under `remote`.
fn page(query: &ListQuery, value: Value) -> Result<Value, ApiError> {
    let (items, remote) = match value {
        Value::Array(items) => (items, Map::new()),
        Value::Null => (Vec::new(), Map::new()),
        Value::Object(mut map) => {
            let key = LIST_KEYS.iter().find(|key| map.get(**key).is_some_and(Value::is_array));
            let Some(key) = key else {
                return Err(unexpected_shape("transaction list"));
            };
            let items = match map.remove(*key) {
                Some(Value::Array(items)) => items,
                _ => Vec::new(),
            };
            (items, map)
        }
        _ => return Err(unexpected_shape("transaction list")),
    };
    let limit = usize::try_from(query.limit).unwrap_or(usize::MAX);
    let transactions = items
        .into_iter()
        .take(limit)
        .map(|item| transaction(item, None))
        .collect::<Result<Vec<_>, _>>()?;
    let mut page = json!({
        "account_holder_id": query.account_holder_id.as_str(),
        "limit": query.limit,
        "offset": query.offset,
        "count": transactions.len(),
        "transactions": transactions,
    });
    if !remote.is_empty()
        && let Some(map) = page.as_object_mut()
    {
        map.insert("remote".to_string(), Value::Object(remote));
    }
    Ok(page)
}

// ============================================================================
// SECTION: Bulk
// ============================================================================

/// Ordered per-item results with a batch summary.
fn bulk(inputs: &[TransactionInput], items: Vec<BulkItemResult>) -> Result<ToolOutput, ApiError> {
    if items.len() != inputs.len() {
        return Err(ApiError::internal(format!(
            "bulk result length {} does not match input length {}",
            items.len(),
            inputs.len()
        )));
    }
    let mut succeeded = 0_usize;
    let mut results = Vec::with_capacity(inputs.len());
    for (index, (input, item)) in inputs.iter().zip(items).enumerate() {
        let outcome = match item {
            BulkItemResult::Enriched(value) => transaction(value, Some(&input.id)),
            BulkItemResult::Failed(error) => Err(error),
        };
        let entry = match outcome {
            Ok(record) => {
                succeeded += 1;
                json!({
                    "index": index,
                    "id": input.id.as_str(),
                    "status": "ok",
                    "transaction": record,
                })
            }
            Err(error) => json!({
                "index": index,
                "id": input.id.as_str(),
                "status": "error",
                "error": error_value(&error)?,
            }),
        };
        results.push(entry);
    }
    let total = inputs.len();
    let failed = total - succeeded;
    let status = match (succeeded, failed) {
        (_, 0) => "succeeded",
        (0, _) => "failed",
        _ => "partial_failure",
    };
    Ok(ToolOutput {
        value: json!({
            "status": status,
            "total": total,
            "succeeded": succeeded,
            "failed": failed,
            "results": results,
        }),
        is_error: status == "failed",
    })
}

/// Serializes an item error.
fn error_value(error: &ApiError) -> Result<Value, ApiError> {
    serde_json::to_value(error)
        .map_err(|err| ApiError::internal(format!("failed to encode item error: {err}")))
}

// ============================================================================
// SECTION: Deletion
// ============================================================================

/// Deletion acknowledgement.
fn deletion(entity: EntityKind, id: &Identifier, outcome: DeleteOutcome) -> Value {
    json!({
        "deleted": true,
        "existed": outcome.existed(),
        "entity": entity.as_str(),
        "id": id.as_str(),
    })
}

// ============================================================================
// SECTION: Tests
// ============================================================================
