// crates/ntropy-mcp-client/src/response.rs
// ============================================================================
// Module: Response Classification
// Description: Maps HTTP statuses and transport failures to API errors.
// Purpose: Ensure no raw transport failure escapes the client.
// Dependencies: ntropy-mcp-core, reqwest, serde_json
// ============================================================================

//! ## Overview
//! Status mapping: 401/403 are authentication failures, 404 names the entity
//! the operation addressed, 429 is a rate limit carrying any `Retry-After`
//! hint, 5xx is a remote service failure, and remaining 4xx statuses mean the
//! remote rejected the payload. The remote error body is attached as
//! `details` so callers can see the remote's own explanation.

use std::error::Error as StdError;
use std::io;

use ntropy_mcp_core::ApiError;
use ntropy_mcp_core::ApiErrorKind;
use ntropy_mcp_core::EntityRef;
use serde_json::Value;

/// Longest non-JSON error body carried in `details`.
const MAX_TEXT_DETAIL_BYTES: usize = 2_048;

/// Classifies a non-success HTTP response.
#[must_use]
pub fn error_for_status(
    status: u16,
    body: &[u8],
    retry_after_secs: Option<u64>,
    entity: Option<&EntityRef>,
) -> ApiError {
    let details = error_details(body);
    let remote_message = details.as_ref().and_then(remote_message);
    let error = match status {
        401 | 403 => ApiError::new(
            ApiErrorKind::Auth,
            remote_message.unwrap_or_else(|| "remote rejected the API credential".to_string()),
        ),
        404 => match entity {
            Some(entity) => ApiError::not_found(entity.entity, &entity.id),
            None => ApiError::new(ApiErrorKind::NotFound, "remote resource not found"),
        },
        429 => {
            let error = ApiError::new(
                ApiErrorKind::RateLimit,
                remote_message.unwrap_or_else(|| "remote rate limit exceeded".to_string()),
            );
            match retry_after_secs {
                Some(seconds) => error.with_retry_after(seconds),
                None => error,
            }
        }
        500..=599 => ApiError::new(
            ApiErrorKind::RemoteService,
            remote_message.unwrap_or_else(|| format!("remote service returned status {status}")),
        ),
        400..=499 => ApiError::new(
            ApiErrorKind::Rejected,
            remote_message.unwrap_or_else(|| format!("remote rejected the request ({status})")),
        ),
        _ => ApiError::new(
            ApiErrorKind::RemoteService,
            format!("unexpected remote status {status}"),
        )
        .with_retryable(false),
    };
    let error = error.with_status(status);
    match details {
        Some(details) => error.with_details(details),
        None => error,
    }
}

/// Classifies a transport failure that produced no response.
#[must_use]
pub fn error_for_transport(err: &reqwest::Error) -> ApiError {
    if err.is_timeout() {
        ApiError::new(ApiErrorKind::Timeout, "remote call timed out")
    } else if err.is_connect() {
        ApiError::new(ApiErrorKind::RemoteService, "failed to connect to remote service")
    } else {
        ApiError::new(ApiErrorKind::RemoteService, "remote request failed before a response")
    }
}

/// Classifies a failure while reading a response body.
#[must_use]
pub fn error_for_body_read(err: &io::Error) -> ApiError {
    if read_timed_out(err) {
        ApiError::new(ApiErrorKind::Timeout, "remote response body timed out")
    } else {
        ApiError::new(ApiErrorKind::RemoteService, "failed to read remote response")
    }
}

/// Returns whether a body read failed on a timeout, checking the source chain.
fn read_timed_out(err: &io::Error) -> bool {
    if err.kind() == io::ErrorKind::TimedOut {
        return true;
    }
    let mut source: Option<&(dyn StdError + 'static)> =
        err.get_ref().map(|inner| inner as &(dyn StdError + 'static));
    while let Some(current) = source {
        if let Some(remote) = current.downcast_ref::<reqwest::Error>()
            && remote.is_timeout()
        {
            return true;
        }
        if let Some(inner) = current.downcast_ref::<io::Error>()
            && inner.kind() == io::ErrorKind::TimedOut
        {
            return true;
        }
        source = current.source();
    }
    false
}

/// Decodes a success body; an empty body decodes to `null`.
///
/// # Errors
///
/// Returns a non-retryable remote service error when the body is not JSON.
pub fn decode_body(status: u16, body: &[u8]) -> Result<Value, ApiError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Null);
    }
    serde_json::from_slice(body).map_err(|_| {
        ApiError::new(ApiErrorKind::RemoteService, "remote returned an undecodable response body")
            .with_status(status)
            .with_retryable(false)
    })
}

/// Parses a `Retry-After` header value expressed in seconds.
#[must_use]
pub fn parse_retry_after(value: &str) -> Option<u64> {
    value.trim().parse::<u64>().ok()
}

/// Returns the remote error body as JSON, or truncated text.
fn error_details(body: &[u8]) -> Option<Value> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return None;
    }
    if let Ok(value) = serde_json::from_slice::<Value>(body) {
        return Some(value);
    }
    let text = String::from_utf8_lossy(body);
    let mut end = text.len().min(MAX_TEXT_DETAIL_BYTES);
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    Some(Value::String(text[..end].to_string()))
}

/// Extracts a human-readable message from a remote error body.
fn remote_message(details: &Value) -> Option<String> {
    let object = details.as_object()?;
    ["detail", "message", "error"]
        .iter()
        .find_map(|key| object.get(*key).and_then(Value::as_str))
        .map(str::to_string)
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

    use ntropy_mcp_core::ApiErrorKind;
    use ntropy_mcp_core::EntityKind;
    use ntropy_mcp_core::EntityRef;
    use ntropy_mcp_core::Identifier;
    use std::io;

    use serde_json::json;

    use super::decode_body;
    use super::error_for_body_read;
    use super::error_for_status;
    use super::parse_retry_after;

    #[test]
    fn maps_statuses_to_kinds() {
        let cases = [
            (401, ApiErrorKind::Auth, false),
            (403, ApiErrorKind::Auth, false),
            (404, ApiErrorKind::NotFound, false),
            (409, ApiErrorKind::Rejected, false),
            (422, ApiErrorKind::Rejected, false),
            (429, ApiErrorKind::RateLimit, true),
            (500, ApiErrorKind::RemoteService, true),
            (503, ApiErrorKind::RemoteService, true),
            (302, ApiErrorKind::RemoteService, false),
        ];
        for (status, kind, retryable) in cases {
            let error = error_for_status(status, b"", None, None);
            assert_eq!(error.kind, kind, "status {status}");
            assert_eq!(error.retryable, retryable, "status {status}");
            assert_eq!(error.source_status, Some(status));
        }
    }

    #[test]
    fn not_found_names_the_addressed_entity() {
        let entity = EntityRef {
            entity: EntityKind::AccountHolder,
            id: Identifier::new("acc_1").unwrap(),
        };
        let error = error_for_status(404, br#"{"detail":"nope"}"#, None, Some(&entity));
        assert_eq!(error.entity, Some(entity));
        assert_eq!(error.details, Some(json!({ "detail": "nope" })));
    }

    #[test]
    fn remote_message_and_retry_after_are_carried() {
        let error = error_for_status(429, br#"{"detail":"slow down"}"#, Some(3), None);
        assert_eq!(error.message, "slow down");
        assert_eq!(error.retry_after_secs, Some(3));
    }

    #[test]
    fn text_bodies_are_truncated_into_details() {
        let body = "x".repeat(5_000);
        let error = error_for_status(500, body.as_bytes(), None, None);
        let details = error.details.unwrap();
        assert_eq!(details.as_str().unwrap().len(), 2_048);
    }

    #[test]
    fn decode_rejects_non_json_without_retry() {
        let error = decode_body(200, b"<html>").unwrap_err();
        assert_eq!(error.kind, ApiErrorKind::RemoteService);
        assert!(!error.retryable);
        assert_eq!(decode_body(204, b"").unwrap(), serde_json::Value::Null);
    }

    #[test]
    fn retry_after_accepts_only_seconds() {
        assert_eq!(parse_retry_after(" 7 "), Some(7));
        assert_eq!(parse_retry_after("Wed, 21 Oct 2015 07:28:00 GMT"), None);
    }

    #[test]
    fn body_read_timeouts_are_found_by_kind_and_source() {
        let direct = io::Error::new(io::ErrorKind::TimedOut, "deadline");
        assert_eq!(error_for_body_read(&direct).kind, ApiErrorKind::Timeout);

        let wrapped = io::Error::other(io::Error::new(io::ErrorKind::TimedOut, "deadline"));
        assert_eq!(error_for_body_read(&wrapped).kind, ApiErrorKind::Timeout);

        let reset = io::Error::new(io::ErrorKind::ConnectionReset, "request timed out");
        assert_eq!(error_for_body_read(&reset).kind, ApiErrorKind::RemoteService);
    }
}
