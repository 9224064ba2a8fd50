// crates/ntropy-mcp-core/src/error.rs
// ============================================================================
// Module: Remote Error Taxonomy
// Description: Normalized errors produced by the enrichment service seam.
// Purpose: Give every remote failure a stable kind, retry hint, and context.
// Dependencies: serde, serde_json, thiserror
// ============================================================================

//! ## Overview
//! Remote failures are classified into a closed set of [`ApiErrorKind`]
//! values. Every [`ApiError`] carries a human-readable message, a retryable
//! hint for the caller, the remote HTTP status when one was observed, the
//! entity being addressed, and any structured detail the remote returned.

use std::fmt;

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::identifiers::Identifier;

// ============================================================================
// SECTION: Kinds
// ============================================================================

/// Stable classification of remote failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ApiErrorKind {
    /// Credential missing, invalid, or not authorized.
    #[serde(rename = "auth_error")]
    Auth,
    /// Referenced entity does not exist remotely.
    #[serde(rename = "not_found_error")]
    NotFound,
    /// Remote throttled the request.
    #[serde(rename = "rate_limit_error")]
    RateLimit,
    /// Remote failed, was unreachable, or answered with an undecodable body.
    #[serde(rename = "remote_service_error")]
    RemoteService,
    /// Remote did not answer within the configured deadline.
    Timeout,
    /// Remote refused the request as malformed or conflicting.
    Rejected,
    /// Local failure unrelated to the remote service.
    Internal,
}

impl ApiErrorKind {
    /// Returns the stable wire label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Auth => "auth_error",
            Self::NotFound => "not_found_error",
            Self::RateLimit => "rate_limit_error",
            Self::RemoteService => "remote_service_error",
            Self::Timeout => "timeout",
            Self::Rejected => "rejected",
            Self::Internal => "internal",
        }
    }

    /// Returns whether errors of this kind are transient by default.
    #[must_use]
    pub const fn default_retryable(self) -> bool {
        matches!(self, Self::RateLimit | Self::RemoteService | Self::Timeout)
    }
}

impl fmt::Display for ApiErrorKind {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

// ============================================================================
// SECTION: Entities
// ============================================================================

/// Entity families addressed by tool calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    /// Account holder records.
    AccountHolder,
    /// Transaction records.
    Transaction,
}

impl EntityKind {
    /// Returns the stable wire label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::AccountHolder => "account_holder",
            Self::Transaction => "transaction",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// Reference to the entity an error concerns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntityRef {
    /// Entity family.
    pub entity: EntityKind,
    /// Entity identifier.
    pub id: Identifier,
}

// ============================================================================
// SECTION: Error
// ============================================================================

/// Normalized remote failure.
#[derive(Debug, Clone, PartialEq, Error, Serialize)]
#[error("{kind}: {message}")]
pub struct ApiError {
    /// Failure classification.
    pub kind: ApiErrorKind,
    /// Human-readable message.
    pub message: String,
    /// Whether retrying the same call later may succeed.
    pub retryable: bool,
    /// Remote HTTP status when a response was received.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_status: Option<u16>,
    /// Entity the failure concerns, when known.
    #[serde(flatten)]
    pub entity: Option<EntityRef>,
    /// Retry-After hint in seconds for rate-limit responses.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_after_secs: Option<u64>,
    /// Structured remote error body, when the remote supplied one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

impl ApiError {
    /// Creates an error with the kind's default retry hint.
    #[must_use]
    pub fn new(kind: ApiErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            retryable: kind.default_retryable(),
            source_status: None,
            entity: None,
            retry_after_secs: None,
            details: None,
        }
    }

    /// Creates a not-found error naming the missing entity.
    #[must_use]
    pub fn not_found(entity: EntityKind, id: &Identifier) -> Self {
        Self::new(ApiErrorKind::NotFound, format!("{entity} {id} not found"))
            .with_entity(entity, id.clone())
    }

    /// Creates an internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ApiErrorKind::Internal, message)
    }

    /// Attaches the remote HTTP status.
    #[must_use]
    pub const fn with_status(mut self, status: u16) -> Self {
        self.source_status = Some(status);
        self
    }

    /// Attaches the entity the failure concerns.
    #[must_use]
    pub fn with_entity(mut self, entity: EntityKind, id: Identifier) -> Self {
        self.entity = Some(EntityRef { entity, id });
        self
    }

    /// Attaches the remote error body.
    #[must_use]
    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }

    /// Attaches a Retry-After hint.
    #[must_use]
    pub const fn with_retry_after(mut self, seconds: u64) -> Self {
        self.retry_after_secs = Some(seconds);
        self
    }

    /// Overrides the retry hint.
    #[must_use]
    pub const fn with_retryable(mut self, retryable: bool) -> Self {
        self.retryable = retryable;
        self
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(
        clippy::panic,
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::missing_docs_in_private_items,
        reason = "Test-only assertions."
    )]

    use serde_json::json;

    use super::ApiError;
    use super::ApiErrorKind;
    use super::EntityKind;
    use crate::identifiers::Identifier;

    #[test]
    fn default_retry_hints_follow_kind() {
        assert!(ApiError::new(ApiErrorKind::Timeout, "slow").retryable);
        assert!(ApiError::new(ApiErrorKind::RateLimit, "busy").retryable);
        assert!(!ApiError::new(ApiErrorKind::Auth, "denied").retryable);
        assert!(!ApiError::new(ApiErrorKind::NotFound, "gone").retryable);
        assert!(!ApiError::new(ApiErrorKind::Rejected, "bad").retryable);
    }

    #[test]
    fn not_found_serializes_entity_inline() {
        let id = Identifier::new("ah-1").unwrap();
        let error = ApiError::not_found(EntityKind::AccountHolder, &id).with_status(404);
        let value = serde_json::to_value(&error).unwrap();
        assert_eq!(value["kind"], json!("not_found_error"));
        assert_eq!(value["entity"], json!("account_holder"));
        assert_eq!(value["id"], json!("ah-1"));
        assert_eq!(value["source_status"], json!(404));
        assert!(value.get("details").is_none());
    }

    #[test]
    fn display_includes_kind_and_message() {
        let error = ApiError::new(ApiErrorKind::RemoteService, "upstream exploded");
        assert_eq!(error.to_string(), "remote_service_error: upstream exploded");
    }
}
