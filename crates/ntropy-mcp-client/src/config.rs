// crates/ntropy-mcp-client/src/config.rs
// ============================================================================
// Module: Client Configuration
// Description: Immutable connection settings for the remote client.
// Purpose: Carry credential, endpoint, and limits into the client constructor.
// Dependencies: reqwest, thiserror
// ============================================================================

//! ## Overview
//! [`ClientConfig`] is built once and moved into [`crate::NtropyClient`].
//! Nothing is read from ambient process state, so several clients with
//! different credentials can coexist in one process.

use std::fmt;
use std::time::Duration;

use reqwest::Url;
use thiserror::Error;

use crate::retry::RetryPolicy;

/// Default per-attempt timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
/// Default transactions per bulk request.
pub const DEFAULT_MAX_BATCH_SIZE: usize = 1_000;
/// Default concurrent bulk requests.
pub const DEFAULT_BULK_CONCURRENCY: usize = 2;
/// Default response body ceiling.
pub const DEFAULT_MAX_RESPONSE_BYTES: usize = 32 * 1024 * 1024;

/// Client construction failures.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Base URL could not be parsed or cannot carry path segments.
    #[error("invalid base url: {0}")]
    InvalidBaseUrl(String),
    /// Configuration value out of range.
    #[error("invalid client config: {0}")]
    Invalid(String),
    /// HTTP client construction failed.
    #[error("http client build failed: {0}")]
    Build(String),
}

/// Immutable remote client configuration.
#[derive(Clone)]
pub struct ClientConfig {
    /// API base URL; endpoint paths are appended to it.
    pub base_url: Url,
    /// API credential sent as `X-API-Key`.
    api_key: String,
    /// Per-attempt timeout.
    pub timeout: Duration,
    /// Retry policy for transient failures.
    pub retry: RetryPolicy,
    /// Maximum transactions per bulk request.
    pub max_batch_size: usize,
    /// Maximum bulk requests in flight.
    pub bulk_concurrency: usize,
    /// User-Agent header value.
    pub user_agent: String,
    /// Maximum accepted response body size.
    pub max_response_bytes: usize,
}

impl ClientConfig {
    /// Creates a configuration with default limits.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] when the base URL is not an absolute http(s)
    /// URL or the API key is empty.
    pub fn new(base_url: &str, api_key: impl Into<String>) -> Result<Self, ClientError> {
        let base_url =
            Url::parse(base_url).map_err(|err| ClientError::InvalidBaseUrl(err.to_string()))?;
        if !matches!(base_url.scheme(), "http" | "https") || base_url.cannot_be_a_base() {
            return Err(ClientError::InvalidBaseUrl("expected an http(s) base url".to_string()));
        }
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(ClientError::Invalid("api key must not be empty".to_string()));
        }
        Ok(Self {
            base_url,
            api_key,
            timeout: DEFAULT_TIMEOUT,
            retry: RetryPolicy::default(),
            max_batch_size: DEFAULT_MAX_BATCH_SIZE,
            bulk_concurrency: DEFAULT_BULK_CONCURRENCY,
            user_agent: format!("ntropy-mcp/{}", env!("CARGO_PKG_VERSION")),
            max_response_bytes: DEFAULT_MAX_RESPONSE_BYTES,
        })
    }

    /// Sets the per-attempt timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the retry policy.
    #[must_use]
    pub const fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Sets bulk sub-batch size and concurrency.
    #[must_use]
    pub const fn with_bulk_limits(mut self, max_batch_size: usize, concurrency: usize) -> Self {
        self.max_batch_size = max_batch_size;
        self.bulk_concurrency = concurrency;
        self
    }

    /// Sets the User-Agent header value.
    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Returns the API credential.
    #[must_use]
    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    /// Checks limits that would make the client unusable.
    pub(crate) fn validate(&self) -> Result<(), ClientError> {
        if self.retry.max_attempts == 0 {
            return Err(ClientError::Invalid("max_attempts must be at least 1".to_string()));
        }
        if self.max_batch_size == 0 {
            return Err(ClientError::Invalid("max_batch_size must be at least 1".to_string()));
        }
        if self.bulk_concurrency == 0 {
            return Err(ClientError::Invalid("bulk_concurrency must be at least 1".to_string()));
        }
        if self.timeout.is_zero() {
            return Err(ClientError::Invalid("timeout must be non-zero".to_string()));
        }
        Ok(())
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("ClientConfig")
            .field("base_url", &self.base_url.as_str())
            .field("api_key", &"<redacted>")
            .field("timeout", &self.timeout)
            .field("retry", &self.retry)
            .field("max_batch_size", &self.max_batch_size)
            .field("bulk_concurrency", &self.bulk_concurrency)
            .field("user_agent", &self.user_agent)
            .finish_non_exhaustive()
    }
}
