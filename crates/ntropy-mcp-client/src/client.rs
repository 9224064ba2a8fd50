// crates/ntropy-mcp-client/src/client.rs
// ============================================================================
// Module: Ntropy HTTP Client
// Description: Authenticated, retrying transport to the Ntropy v3 API.
// Purpose: Implement every enrichment service operation over HTTP.
// Dependencies: ntropy-mcp-core, reqwest, serde_json
// ============================================================================

//! ## Overview
//! Every operation builds a request, runs it through the shared attempt loop,
//! and either decodes the JSON body or returns a classified
//! [`ApiError`]. Deletes treat 404 as success. The credential is attached as
//! `X-API-Key` on every request and never logged.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io::Read;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::thread;
use std::time::Duration;

use ntropy_mcp_core::ApiError;
use ntropy_mcp_core::ApiErrorKind;
use ntropy_mcp_core::BulkItemResult;
use ntropy_mcp_core::DeleteOutcome;
use ntropy_mcp_core::EnrichmentService;
use ntropy_mcp_core::EntityKind;
use ntropy_mcp_core::EntityRef;
use ntropy_mcp_core::Identifier;
use ntropy_mcp_core::ListQuery;
use ntropy_mcp_core::NewAccountHolder;
use ntropy_mcp_core::ToolName;
use ntropy_mcp_core::TransactionInput;
use reqwest::Method;
use reqwest::Url;
use reqwest::blocking::Client;
use reqwest::blocking::Response;
use reqwest::header::ACCEPT;
use reqwest::header::CONTENT_TYPE;
use reqwest::header::RETRY_AFTER;
use reqwest::redirect::Policy;
use serde_json::Value;

use crate::bulk;
use crate::config::ClientConfig;
use crate::config::ClientError;
use crate::response::decode_body;
use crate::response::error_for_body_read;
use crate::response::error_for_status;
use crate::response::error_for_transport;
use crate::response::parse_retry_after;
use crate::retry::NoopRetryObserver;
use crate::retry::RetryClass;
use crate::retry::RetryEvent;
use crate::retry::RetryObserver;
use crate::wire;

/// Header carrying the API credential.
const API_KEY_HEADER: &str = "X-API-Key";
/// JSON media type.
const APPLICATION_JSON: &str = "application/json";

// ============================================================================
// SECTION: Client
// ============================================================================

/// Blocking client for the Ntropy v3 API.
pub struct NtropyClient {
    /// Pooled HTTP client.
    http: Client,
    /// Immutable connection settings.
    config: ClientConfig,
    /// Retry notification sink.
    observer: Arc<dyn RetryObserver>,
}

/// One outbound call.
struct RemoteRequest<'a> {
    /// Operation label for retry classification and observation.
    tool: ToolName,
    /// HTTP method.
    method: Method,
    /// Fully built endpoint URL.
    url: Url,
    /// Serialized JSON body.
    body: Option<Vec<u8>>,
    /// Entity a 404 refers to.
    entity: Option<&'a EntityRef>,
}

/// Failed attempt.
struct AttemptFailure {
    /// Classified failure.
    error: ApiError,
    /// Remote `Retry-After` hint.
    retry_after: Option<Duration>,
    /// True when no connection was established, so nothing was delivered.
    undelivered: bool,
}

/// Successful remote response.
struct RemoteResponse {
    /// HTTP status.
    status: u16,
    /// Raw body bytes.
    body: Vec<u8>,
}

impl NtropyClient {
    /// Builds a client from an immutable configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] when limits are invalid or the HTTP client
    /// cannot be constructed.
    pub fn new(config: ClientConfig) -> Result<Self, ClientError> {
        config.validate()?;
        let http = Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent.clone())
            .redirect(Policy::none())
            .build()
            .map_err(|err| ClientError::Build(err.to_string()))?;
        Ok(Self { http, config, observer: Arc::new(NoopRetryObserver) })
    }

    /// Replaces the retry observer.
    #[must_use]
    pub fn with_observer(mut self, observer: Arc<dyn RetryObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Returns the client configuration.
    #[must_use]
    pub const fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Builds an endpoint URL from path segments, each percent-encoded.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, ApiError> {
        let mut url = self.config.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| ApiError::internal("base url cannot carry path segments"))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Serializes a JSON body.
    fn json_body(value: &Value) -> Result<Vec<u8>, ApiError> {
        serde_json::to_vec(value)
            .map_err(|err| ApiError::internal(format!("failed to encode request body: {err}")))
    }

    /// Runs the attempt loop for one request.
    fn execute(&self, request: &RemoteRequest<'_>) -> Result<RemoteResponse, ApiError> {
        let class = RetryClass::for_tool(request.tool);
        let policy = self.config.retry;
        let mut attempt = 1;
        loop {
            let AttemptFailure { error, retry_after, undelivered } =
                match self.send_once(request) {
                    Ok(response) => return Ok(response),
                    Err(failure) => failure,
                };
            let eligible = match class {
                RetryClass::Idempotent => error.retryable,
                RetryClass::ConnectOnly => undelivered,
            };
            if !eligible || attempt >= policy.max_attempts {
                return Err(error);
            }
            let delay = policy.delay_for_attempt(attempt, retry_after);
            self.observer.on_retry(&RetryEvent {
                tool: request.tool,
                attempt,
                max_attempts: policy.max_attempts,
                delay,
                error_kind: error.kind,
                status: error.source_status,
            });
            thread::sleep(delay);
            attempt += 1;
        }
    }

    /// Sends one attempt and classifies its outcome.
    fn send_once(
        &self,
        request: &RemoteRequest<'_>,
    ) -> Result<RemoteResponse, AttemptFailure> {
        let mut builder = self
            .http
            .request(request.method.clone(), request.url.clone())
            .header(API_KEY_HEADER, self.config.api_key())
            .header(ACCEPT, APPLICATION_JSON);
        if let Some(body) = &request.body {
            builder = builder.header(CONTENT_TYPE, APPLICATION_JSON).body(body.clone());
        }
        let mut response = builder.send().map_err(|err| AttemptFailure {
            error: error_for_transport(&err),
            retry_after: None,
            undelivered: err.is_connect(),
        })?;
        let status = response.status().as_u16();
        let retry_after = response
            .headers()
            .get(RETRY_AFTER)
            .and_then(|value| value.to_str().ok())
            .and_then(parse_retry_after);
        let body = read_response_limited(&mut response, self.config.max_response_bytes)
            .map_err(|err| AttemptFailure {
                error: err.with_status(status),
                retry_after: None,
                undelivered: false,
            })?;
        if response.status().is_success() {
            return Ok(RemoteResponse { status, body });
        }
        Err(AttemptFailure {
            error: error_for_status(status, &body, retry_after, request.entity),
            retry_after: retry_after.map(Duration::from_secs),
            undelivered: false,
        })
    }

    /// Runs a request and decodes its JSON body.
    fn call_json(&self, request: &RemoteRequest<'_>) -> Result<Value, ApiError> {
        let response = self.execute(request)?;
        decode_body(response.status, &response.body)
    }

    /// Runs a delete, treating an absent entity as success.
    fn call_delete(&self, request: &RemoteRequest<'_>) -> Result<DeleteOutcome, ApiError> {
        match self.execute(request) {
            Ok(_) => Ok(DeleteOutcome::Deleted),
            Err(error) if error.kind == ApiErrorKind::NotFound => Ok(DeleteOutcome::AlreadyAbsent),
            Err(error) => Err(error),
        }
    }

    /// Enriches one sub-batch.
    fn bulk_chunk(&self, chunk: &[TransactionInput]) -> bulk::ChunkOutcome {
        let request = RemoteRequest {
            tool: ToolName::BulkEnrichTransactions,
            method: Method::POST,
            url: self.endpoint(&["v3", "transactions", "bulk"])?,
            body: Some(Self::json_body(&wire::bulk_body(chunk))?),
            entity: None,
        };
        let response = self.call_json(&request)?;
        Ok(bulk::align_chunk(chunk, &response))
    }
}

impl EnrichmentService for NtropyClient {
    fn create_account_holder(&self, holder: &NewAccountHolder) -> Result<Value, ApiError> {
        let request = RemoteRequest {
            tool: ToolName::CreateAccountHolder,
            method: Method::POST,
            url: self.endpoint(&["v3", "account_holders"])?,
            body: Some(Self::json_body(&wire::account_holder_body(holder))?),
            entity: None,
        };
        self.call_json(&request)
    }

    fn get_account_holder(&self, id: &Identifier) -> Result<Value, ApiError> {
        let entity = EntityRef { entity: EntityKind::AccountHolder, id: id.clone() };
        let request = RemoteRequest {
            tool: ToolName::GetAccountHolder,
            method: Method::GET,
            url: self.endpoint(&["v3", "account_holders", id.as_str()])?,
            body: None,
            entity: Some(&entity),
        };
        self.call_json(&request)
    }

    fn delete_account_holder(&self, id: &Identifier) -> Result<DeleteOutcome, ApiError> {
        let entity = EntityRef { entity: EntityKind::AccountHolder, id: id.clone() };
        let request = RemoteRequest {
            tool: ToolName::DeleteAccountHolder,
            method: Method::DELETE,
            url: self.endpoint(&["v3", "account_holders", id.as_str()])?,
            body: None,
            entity: Some(&entity),
        };
        self.call_delete(&request)
    }

    fn enrich_transaction(&self, transaction: &TransactionInput) -> Result<Value, ApiError> {
        let entity = EntityRef {
            entity: EntityKind::AccountHolder,
            id: transaction.account_holder_id.clone(),
        };
        let request = RemoteRequest {
            tool: ToolName::EnrichTransaction,
            method: Method::POST,
            url: self.endpoint(&["v3", "transactions"])?,
            body: Some(Self::json_body(&wire::transaction_body(transaction))?),
            entity: Some(&entity),
        };
        self.call_json(&request)
    }

    fn bulk_enrich_transactions(
        &self,
        transactions: &[TransactionInput],
    ) -> Result<Vec<BulkItemResult>, ApiError> {
        if transactions.is_empty() {
            return Ok(Vec::new());
        }
        let ranges = bulk::chunk_ranges(transactions.len(), self.config.max_batch_size);
        let aborted = AtomicBool::new(false);
        let outcomes = bulk::run_bounded(ranges.len(), self.config.bulk_concurrency, |index| {
            if aborted.load(Ordering::Relaxed) {
                return Err(ApiError::new(
                    ApiErrorKind::Auth,
                    "bulk call aborted after an authentication failure",
                ));
            }
            let chunk = ranges
                .get(index)
                .and_then(|range| transactions.get(range.clone()))
                .unwrap_or_default();
            let outcome = self.bulk_chunk(chunk);
            if matches!(&outcome, Err(error) if error.kind == ApiErrorKind::Auth) {
                aborted.store(true, Ordering::Relaxed);
            }
            outcome
        });
        bulk::assemble(&ranges, outcomes)
    }

    fn list_transactions(&self, query: &ListQuery) -> Result<Value, ApiError> {
        let entity =
            EntityRef { entity: EntityKind::AccountHolder, id: query.account_holder_id.clone() };
        let mut url = self.endpoint(&["v3", "transactions"])?;
        url.query_pairs_mut()
            .append_pair("account_holder_id", query.account_holder_id.as_str())
            .append_pair("limit", &query.limit.to_string())
            .append_pair("offset", &query.offset.to_string());
        let request = RemoteRequest {
            tool: ToolName::ListTransactions,
            method: Method::GET,
            url,
            body: None,
            entity: Some(&entity),
        };
        self.call_json(&request)
    }

    fn get_transaction(&self, id: &Identifier) -> Result<Value, ApiError> {
        let entity = EntityRef { entity: EntityKind::Transaction, id: id.clone() };
        let request = RemoteRequest {
            tool: ToolName::GetTransaction,
            method: Method::GET,
            url: self.endpoint(&["v3", "transactions", id.as_str()])?,
            body: None,
            entity: Some(&entity),
        };
        self.call_json(&request)
    }

    fn delete_transaction(&self, id: &Identifier) -> Result<DeleteOutcome, ApiError> {
        let entity = EntityRef { entity: EntityKind::Transaction, id: id.clone() };
        let request = RemoteRequest {
            tool: ToolName::DeleteTransaction,
            method: Method::DELETE,
            url: self.endpoint(&["v3", "transactions", id.as_str()])?,
            body: None,
            entity: Some(&entity),
        };
        self.call_delete(&request)
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Reads the response body while enforcing a byte limit.
fn read_response_limited(response: &mut Response, max_bytes: usize) -> Result<Vec<u8>, ApiError> {
    let max_bytes_u64 = u64::try_from(max_bytes)
        .map_err(|_| ApiError::internal("response size limit exceeds u64"))?;
    if let Some(expected) = response.content_length()
        && expected > max_bytes_u64
    {
        return Err(oversized_response());
    }
    let mut buf = Vec::new();
    let limit = max_bytes_u64.saturating_add(1);
    response.take(limit).read_to_end(&mut buf).map_err(|err| error_for_body_read(&err))?;
    if buf.len() > max_bytes {
        return Err(oversized_response());
    }
    Ok(buf)
}

/// Error for a response body above the size ceiling.
fn oversized_response() -> ApiError {
    ApiError::new(ApiErrorKind::RemoteService, "remote response exceeds size limit")
        .with_retryable(false)
}
