// crates/ntropy-mcp/src/tools.rs
// ============================================================================
// Module: Tool Router
// Description: Dispatches tool calls through validation, remote, translation.
// Purpose: Give every tool call a well-formed result or a structured error.
// Dependencies: ntropy-mcp-contract, ntropy-mcp-core, serde_json, thiserror
// ============================================================================

//! ## Overview
//! [`ToolRouter`] is the single entry point for tool execution. A call is
//! resolved against the [`ToolRegistry`], validated into a typed
//! [`ToolRequest`], executed against the injected [`EnrichmentService`], and
//! translated into a [`ToolOutput`]. Validation failures return before any
//! remote call. Panics raised past validation are caught and reported as
//! internal errors so one failing call never takes the server down.
//!
//! The router holds no per-call mutable state; clones share the registry and
//! the service.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::any::Any;
use std::panic;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use ntropy_mcp_contract::ToolDefinition;
use ntropy_mcp_contract::ToolRegistry;
use ntropy_mcp_core::ApiError;
use ntropy_mcp_core::ApiErrorKind;
use ntropy_mcp_core::EnrichmentService;
use ntropy_mcp_core::ToolName;
use serde_json::Map;
use serde_json::Value;
use thiserror::Error;

use crate::translate::RemoteOutcome;
use crate::translate::ResponseTranslator;
use crate::translate::ToolOutput;
use crate::validation::RequestValidator;
use crate::validation::ToolRequest;
use crate::validation::ValidationError;

// ============================================================================
// SECTION: Tool Router
// ============================================================================

/// Tool router for MCP requests.
#[derive(Clone)]
pub struct ToolRouter {
    /// Tool catalogue.
    registry: ToolRegistry,
    /// Argument validator.
    validator: RequestValidator,
    /// Remote enrichment service.
    service: Arc<dyn EnrichmentService>,
    /// Result translator.
    translator: ResponseTranslator,
}

impl ToolRouter {
    /// Builds a router over the given service.
    #[must_use]
    pub fn new(service: Arc<dyn EnrichmentService>) -> Self {
        Self {
            registry: ToolRegistry::new(),
            validator: RequestValidator::new(),
            service,
            translator: ResponseTranslator::new(),
        }
    }

    /// Returns the tool catalogue.
    #[must_use]
    pub const fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// Lists tool definitions in catalogue order.
    #[must_use]
    pub fn list_tools(&self) -> Vec<ToolDefinition> {
        self.registry.definitions()
    }

    /// Dispatches a tool call by wire name.
    ///
    /// # Errors
    ///
    /// Returns [`ToolError::Validation`] for unknown tools and malformed
    /// arguments, and [`ToolError::Api`] for remote or internal failures.
    pub fn dispatch(&self, name: &str, arguments: &Value) -> Result<ToolOutput, ToolError> {
        let contract = self
            .registry
            .lookup(name)
            .map_err(|_| ValidationError::UnknownTool { tool: name.to_string() })?;
        let request = self.validator.validate(contract, arguments)?;
        let tool = request.tool();
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| self.run(&request)))
            .unwrap_or_else(|payload| Err(panicked(tool, payload.as_ref())));
        outcome.map_err(ToolError::Api)
    }

    /// Executes a validated request and translates the remote outcome.
    fn run(&self, request: &ToolRequest) -> Result<ToolOutput, ApiError> {
        let outcome = self.execute(request)?;
        self.translator.translate(request, outcome)
    }

    /// Invokes the remote operation matching the request.
    fn execute(&self, request: &ToolRequest) -> Result<RemoteOutcome, ApiError> {
        let service = self.service.as_ref();
        match request {
            ToolRequest::CreateAccountHolder(holder) => {
                service.create_account_holder(holder).map(RemoteOutcome::Record)
            }
            ToolRequest::EnrichTransaction(transaction) => {
                service.enrich_transaction(transaction).map(RemoteOutcome::Record)
            }
            ToolRequest::GetAccountHolder(id) => {
                service.get_account_holder(id).map(RemoteOutcome::Record)
            }
            ToolRequest::ListTransactions(query) => {
                service.list_transactions(query).map(RemoteOutcome::Record)
            }
            ToolRequest::GetTransaction(id) => {
                service.get_transaction(id).map(RemoteOutcome::Record)
            }
            ToolRequest::BulkEnrichTransactions(batch) => {
                service.bulk_enrich_transactions(batch).map(RemoteOutcome::Items)
            }
            ToolRequest::DeleteAccountHolder(id) => {
                service.delete_account_holder(id).map(RemoteOutcome::Deleted)
            }
            ToolRequest::DeleteTransaction(id) => {
                service.delete_transaction(id).map(RemoteOutcome::Deleted)
            }
        }
    }
}

/// Converts a caught panic into an internal error.
fn panicked(tool: ToolName, payload: &(dyn Any + Send)) -> ApiError {
    let detail = payload
        .downcast_ref::<&str>()
        .map(|message| (*message).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string());
    ApiError::internal(format!("{tool} failed unexpectedly: {detail}"))
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// JSON-RPC code for unknown tools.
pub const CODE_UNKNOWN_TOOL: i64 = -32601;
/// JSON-RPC code for invalid tool arguments.
pub const CODE_INVALID_PARAMS: i64 = -32602;

/// Tool routing errors.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ToolError {
    /// Caller-input failure; no remote call was made.
    #[error(transparent)]
    Validation(#[from] ValidationError),
    /// Remote or internal failure.
    #[error(transparent)]
    Api(#[from] ApiError),
}

impl ToolError {
    /// Returns the stable kind label.
    #[must_use]
    pub const fn kind_label(&self) -> &'static str {
        match self {
            Self::Validation(error) => error.kind(),
            Self::Api(error) => error.kind.as_str(),
        }
    }

    /// Returns the JSON-RPC error code.
    #[must_use]
    pub const fn jsonrpc_code(&self) -> i64 {
        match self {
            Self::Validation(ValidationError::UnknownTool { .. }) => CODE_UNKNOWN_TOOL,
            Self::Validation(_) => CODE_INVALID_PARAMS,
            Self::Api(error) => match error.kind {
                ApiErrorKind::Auth => -32001,
                ApiErrorKind::NotFound => -32004,
                ApiErrorKind::RateLimit => -32029,
                ApiErrorKind::RemoteService => -32020,
                ApiErrorKind::Timeout => -32021,
                ApiErrorKind::Rejected => -32022,
                ApiErrorKind::Internal => -32050,
            },
        }
    }

    /// Returns whether retrying the same call later may succeed.
    #[must_use]
    pub const fn retryable(&self) -> bool {
        match self {
            Self::Validation(_) => false,
            Self::Api(error) => error.retryable,
        }
    }

    /// Returns the structured error payload.
    ///
    /// Fields: `kind`, `message`, `retryable`, and when known `source_status`,
    /// `field`, `tool`, `entity`, `id`, `retry_after_secs`, and `details`.
    #[must_use]
    pub fn payload(&self) -> Value {
        match self {
            Self::Validation(error) => {
                let mut map = Map::new();
                map.insert("kind".to_string(), Value::from(error.kind()));
                map.insert("message".to_string(), Value::from(error.to_string()));
                map.insert("retryable".to_string(), Value::Bool(false));
                if let Some(field) = error.field() {
                    map.insert("field".to_string(), Value::from(field));
                }
                if let ValidationError::UnknownTool { tool } = error {
                    map.insert("tool".to_string(), Value::from(tool.as_str()));
                }
                Value::Object(map)
            }
            Self::Api(error) => serde_json::to_value(error).unwrap_or_else(|_| {
                let mut map = Map::new();
                map.insert("kind".to_string(), Value::from(error.kind.as_str()));
                map.insert("message".to_string(), Value::from(error.message.as_str()));
                map.insert("retryable".to_string(), Value::Bool(error.retryable));
                Value::Object(map)
            }),
        }
    }
}
