// crates/ntropy-mcp/tests/common/mod.rs
// ============================================================================
// Module: Dispatch Test Support
// Description: In-memory enrichment service and JSON-RPC helpers.
// Purpose: Drive the router and server without a live remote service.
// Dependencies: ntropy-mcp, ntropy-mcp-core, serde_json
// ============================================================================

#![allow(
    dead_code,
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::missing_docs_in_private_items,
    reason = "Shared test support; not every test binary uses every helper."
)]

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;
use std::sync::PoisonError;

use ntropy_mcp::ToolRouter;
use ntropy_mcp_core::ApiError;
use ntropy_mcp_core::ApiErrorKind;
use ntropy_mcp_core::BulkItemResult;
use ntropy_mcp_core::DeleteOutcome;
use ntropy_mcp_core::EnrichmentService;
use ntropy_mcp_core::EntityKind;
use ntropy_mcp_core::Identifier;
use ntropy_mcp_core::ListQuery;
use ntropy_mcp_core::NewAccountHolder;
use ntropy_mcp_core::ToolName;
use ntropy_mcp_core::TransactionInput;
use serde_json::Value;
use serde_json::json;

// ============================================================================
// SECTION: Fake Service
// ============================================================================

#[derive(Default)]
struct FakeState {
    calls: Vec<(ToolName, Vec<String>)>,
    holders: BTreeMap<String, Value>,
    transactions: Vec<Value>,
}

/// Stateful in-memory stand-in for the remote enrichment service.
#[derive(Default)]
pub struct FakeService {
    state: Mutex<FakeState>,
    panic_on: Option<ToolName>,
    fail_with: Option<ApiError>,
}

impl FakeService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an existing consumer account holder.
    pub fn with_holder(self, id: &str) -> Self {
        self.lock().holders.insert(
            id.to_string(),
            json!({ "id": id, "type": "consumer", "name": format!("Holder {id}") }),
        );
        self
    }

    /// Panics inside the given operation.
    pub fn panicking_on(mut self, tool: ToolName) -> Self {
        self.panic_on = Some(tool);
        self
    }

    /// Fails every operation with the given error.
    pub fn failing_with(mut self, error: ApiError) -> Self {
        self.fail_with = Some(error);
        self
    }

    /// Operations invoked so far, in order.
    pub fn calls(&self) -> Vec<ToolName> {
        self.lock().calls.iter().map(|(tool, _)| *tool).collect()
    }

    /// Identifiers passed to each operation, in order.
    pub fn call_ids(&self) -> Vec<Vec<String>> {
        self.lock().calls.iter().map(|(_, ids)| ids.clone()).collect()
    }

    fn lock(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn begin(&self, tool: ToolName, ids: &[&Identifier]) -> Result<(), ApiError> {
        let ids = ids.iter().map(|id| id.as_str().to_string()).collect();
        self.lock().calls.push((tool, ids));
        if self.panic_on == Some(tool) {
            panic!("fake {tool} exploded");
        }
        self.fail_with.clone().map_or(Ok(()), Err)
    }

    fn enrich_one(state: &mut FakeState, tx: &TransactionInput) -> Result<Value, ApiError> {
        if !state.holders.contains_key(tx.account_holder_id.as_str()) {
            return Err(ApiError::not_found(EntityKind::AccountHolder, &tx.account_holder_id)
                .with_status(404));
        }
        let mut record = json!({
            "id": tx.id.as_str(),
            "description": tx.description,
            "date": tx.date,
            "amount": tx.amount,
            "entry_type": tx.entry_type.as_str(),
            "currency": tx.currency,
            "account_holder_id": tx.account_holder_id.as_str(),
            "merchant": { "name": "Uber" },
            "categories": { "general": "transportation" },
        });
        if let Some(country) = &tx.country {
            record["location"] = json!({ "country": country });
        }
        state.transactions.retain(|existing| existing["id"] != record["id"]);
        state.transactions.push(record.clone());
        Ok(record)
    }
}

impl EnrichmentService for FakeService {
    fn create_account_holder(&self, holder: &NewAccountHolder) -> Result<Value, ApiError> {
        self.begin(ToolName::CreateAccountHolder, &[&holder.id])?;
        let mut state = self.lock();
        if state.holders.contains_key(holder.id.as_str()) {
            return Err(ApiError::new(ApiErrorKind::Rejected, "account holder already exists")
                .with_status(409));
        }
        let record = json!({
            "id": holder.id.as_str(),
            "type": holder.holder_type.as_str(),
            "name": holder.name,
        });
        state.holders.insert(holder.id.as_str().to_string(), record.clone());
        Ok(record)
    }

    fn get_account_holder(&self, id: &Identifier) -> Result<Value, ApiError> {
        self.begin(ToolName::GetAccountHolder, &[id])?;
        self.lock()
            .holders
            .get(id.as_str())
            .cloned()
            .ok_or_else(|| ApiError::not_found(EntityKind::AccountHolder, id).with_status(404))
    }

    fn delete_account_holder(&self, id: &Identifier) -> Result<DeleteOutcome, ApiError> {
        self.begin(ToolName::DeleteAccountHolder, &[id])?;
        let mut state = self.lock();
        if state.holders.remove(id.as_str()).is_none() {
            return Ok(DeleteOutcome::AlreadyAbsent);
        }
        state.transactions.retain(|tx| tx["account_holder_id"] != json!(id.as_str()));
        Ok(DeleteOutcome::Deleted)
    }

    fn enrich_transaction(&self, transaction: &TransactionInput) -> Result<Value, ApiError> {
        self.begin(
            ToolName::EnrichTransaction,
            &[&transaction.id, &transaction.account_holder_id],
        )?;
        Self::enrich_one(&mut self.lock(), transaction)
    }

    fn bulk_enrich_transactions(
        &self,
        transactions: &[TransactionInput],
    ) -> Result<Vec<BulkItemResult>, ApiError> {
        let ids: Vec<&Identifier> = transactions.iter().map(|tx| &tx.id).collect();
        self.begin(ToolName::BulkEnrichTransactions, &ids)?;
        let mut state = self.lock();
        Ok(transactions
            .iter()
            .map(|tx| match Self::enrich_one(&mut state, tx) {
                Ok(record) => BulkItemResult::Enriched(record),
                Err(error) => BulkItemResult::Failed(error),
            })
            .collect())
    }

    fn list_transactions(&self, query: &ListQuery) -> Result<Value, ApiError> {
        self.begin(ToolName::ListTransactions, &[&query.account_holder_id])?;
        let state = self.lock();
        let holder = json!(query.account_holder_id.as_str());
        let offset = usize::try_from(query.offset).unwrap();
        let limit = usize::try_from(query.limit).unwrap();
        let page: Vec<Value> = state
            .transactions
            .iter()
            .filter(|tx| tx["account_holder_id"] == holder)
            .skip(offset)
            .take(limit)
            .cloned()
            .collect();
        Ok(json!({ "data": page, "request_id": "fake-request" }))
    }

    fn get_transaction(&self, id: &Identifier) -> Result<Value, ApiError> {
        self.begin(ToolName::GetTransaction, &[id])?;
        self.lock()
            .transactions
            .iter()
            .find(|tx| tx["id"] == json!(id.as_str()))
            .cloned()
            .ok_or_else(|| ApiError::not_found(EntityKind::Transaction, id).with_status(404))
    }

    fn delete_transaction(&self, id: &Identifier) -> Result<DeleteOutcome, ApiError> {
        self.begin(ToolName::DeleteTransaction, &[id])?;
        let mut state = self.lock();
        let before = state.transactions.len();
        state.transactions.retain(|tx| tx["id"] != json!(id.as_str()));
        if state.transactions.len() == before {
            Ok(DeleteOutcome::AlreadyAbsent)
        } else {
            Ok(DeleteOutcome::Deleted)
        }
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Router over a shared fake service.
pub fn router_with(service: FakeService) -> (ToolRouter, Arc<FakeService>) {
    let service = Arc::new(service);
    let dyn_service: Arc<dyn EnrichmentService> = Arc::<FakeService>::clone(&service);
    (ToolRouter::new(dyn_service), service)
}

/// Valid single-enrichment arguments.
pub fn tx_args(id: &str, holder: &str) -> Value {
    json!({
        "id": id,
        "description": "UBER TRIP",
        "date": "2024-01-01",
        "amount": 12.5,
        "entry_type": "debit",
        "currency": "USD",
        "account_holder_id": holder
    })
}

/// JSON-RPC `tools/call` request.
pub fn call_request(id: u64, name: &str, arguments: &Value) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "method": "tools/call",
        "params": { "name": name, "arguments": arguments }
    })
}
