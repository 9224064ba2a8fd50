// crates/ntropy-mcp-client/src/bulk.rs
// ============================================================================
// Module: Bulk Fan-Out
// Description: Sub-batching, bounded concurrency, and ordered reassembly.
// Purpose: Keep bulk output aligned with input regardless of chunking.
// Dependencies: ntropy-mcp-core, serde_json
// ============================================================================

//! ## Overview
//! A bulk call is split into contiguous chunks of at most `max_batch_size`
//! items. Chunks run on at most `bulk_concurrency` scoped worker threads and
//! each result is stored under its chunk index, so completion order never
//! affects output order. Within a chunk, remote results are matched to inputs
//! by transaction id when every result carries one, and by position
//! otherwise. Output length always equals input length.

use std::collections::HashMap;
use std::collections::VecDeque;
use std::ops::Range;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::thread;

use ntropy_mcp_core::ApiError;
use ntropy_mcp_core::ApiErrorKind;
use ntropy_mcp_core::BulkItemResult;
use ntropy_mcp_core::EntityKind;
use ntropy_mcp_core::Identifier;
use ntropy_mcp_core::TransactionInput;
use serde_json::Value;

use crate::response::error_for_status;

/// Outcome of one chunk: per-item results or a chunk-level failure.
pub type ChunkOutcome = Result<Vec<BulkItemResult>, ApiError>;

// ============================================================================
// SECTION: Chunking
// ============================================================================

/// Splits `len` items into contiguous ranges of at most `size` items.
#[must_use]
pub fn chunk_ranges(len: usize, size: usize) -> Vec<Range<usize>> {
    let size = size.max(1);
    (0..len).step_by(size).map(|start| start..(start + size).min(len)).collect()
}

/// Runs `job(0..jobs)` on at most `concurrency` threads.
///
/// Results are returned by job index. A slot is `None` only when the worker
/// running that job panicked.
pub fn run_bounded<T, F>(jobs: usize, concurrency: usize, job: F) -> Vec<Option<T>>
where
    T: Send,
    F: Fn(usize) -> T + Sync,
{
    let workers = concurrency.clamp(1, jobs.max(1));
    if workers == 1 {
        return (0..jobs).map(|index| Some(job(index))).collect();
    }
    let counter = AtomicUsize::new(0);
    let next = &counter;
    let job = &job;
    let mut slots: Vec<Option<T>> = (0..jobs).map(|_| None).collect();
    thread::scope(|scope| {
        let handles: Vec<_> = (0..workers)
            .map(move |_| {
                scope.spawn(move || {
                    let mut done = Vec::new();
                    loop {
                        let index = next.fetch_add(1, Ordering::Relaxed);
                        if index >= jobs {
                            break;
                        }
                        done.push((index, job(index)));
                    }
                    done
                })
            })
            .collect();
        for handle in handles {
            let Ok(done) = handle.join() else {
                continue;
            };
            for (index, value) in done {
                if let Some(slot) = slots.get_mut(index) {
                    *slot = Some(value);
                }
            }
        }
    });
    slots
}

/// Merges chunk outcomes into one ordered result.
///
/// # Errors
///
/// Returns the first authentication failure if any chunk hit one, or the
/// first chunk's error when every chunk failed.
pub fn assemble(ranges: &[Range<usize>], outcomes: Vec<Option<ChunkOutcome>>) -> ChunkOutcome {
    let outcomes: Vec<ChunkOutcome> = outcomes
        .into_iter()
        .map(|outcome| {
            outcome.unwrap_or_else(|| Err(ApiError::internal("bulk worker stopped unexpectedly")))
        })
        .collect();
    if let Some(auth) = outcomes
        .iter()
        .find_map(|outcome| outcome.as_ref().err().filter(|err| err.kind == ApiErrorKind::Auth))
    {
        return Err(auth.clone());
    }
    if let Some(Err(first)) = outcomes.first()
        && outcomes.iter().all(Result::is_err)
    {
        return Err(first.clone());
    }
    let total = ranges.last().map_or(0, |range| range.end);
    let mut results = Vec::with_capacity(total);
    for (range, outcome) in ranges.iter().zip(outcomes) {
        match outcome {
            Ok(items) => results.extend(items),
            Err(error) => {
                results.extend(range.clone().map(|_| BulkItemResult::Failed(error.clone())));
            }
        }
    }
    Ok(results)
}

// ============================================================================
// SECTION: Alignment
// ============================================================================

/// Aligns one chunk's remote response with its inputs.
#[must_use]
pub fn align_chunk(inputs: &[TransactionInput], response: &Value) -> Vec<BulkItemResult> {
    let Some(items) = result_items(response) else {
        let error =
            ApiError::new(ApiErrorKind::RemoteService, "remote bulk response has no result list")
                .with_retryable(false);
        return inputs.iter().map(|_| BulkItemResult::Failed(error.clone())).collect();
    };
    if items.iter().all(|item| item_id(item).is_some()) {
        let mut by_id: HashMap<Identifier, VecDeque<&Value>> = HashMap::new();
        for item in items {
            if let Some(id) = item_id(item) {
                by_id.entry(id).or_default().push_back(item);
            }
        }
        inputs
            .iter()
            .map(|input| match by_id.get_mut(&input.id).and_then(VecDeque::pop_front) {
                Some(item) => item_result(input, item),
                None => missing_item(input),
            })
            .collect()
    } else {
        inputs
            .iter()
            .enumerate()
            .map(|(index, input)| {
                items
                    .get(index)
                    .map_or_else(|| missing_item(input), |item| item_result(input, item))
            })
            .collect()
    }
}

/// Locates the per-item result list in a bulk response.
fn result_items(response: &Value) -> Option<&Vec<Value>> {
    match response {
        Value::Array(items) => Some(items),
        Value::Object(map) => ["transactions", "data", "results"]
            .iter()
            .find_map(|key| map.get(*key).and_then(Value::as_array)),
        _ => None,
    }
}

/// Returns the canonical id of a result item.
fn item_id(item: &Value) -> Option<Identifier> {
    item.get("id").and_then(Identifier::from_json)
}

/// Converts one remote result item into an item outcome.
fn item_result(input: &TransactionInput, item: &Value) -> BulkItemResult {
    if let Some(error) = item.get("error").filter(|error| !error.is_null()) {
        return BulkItemResult::Failed(item_error(input, error));
    }
    let failed_status = item
        .get("status")
        .and_then(Value::as_str)
        .is_some_and(|status| matches!(status, "error" | "failed"));
    if failed_status {
        return BulkItemResult::Failed(item_error(input, item));
    }
    BulkItemResult::Enriched(item.clone())
}

/// Classifies an item-level error object or message.
fn item_error(input: &TransactionInput, error: &Value) -> ApiError {
    let code = ["status_code", "status", "code"].iter().find_map(|key| {
        error.get(*key).and_then(Value::as_u64).and_then(|code| u16::try_from(code).ok())
    });
    let text = error
        .as_str()
        .map(str::to_string)
        .or_else(|| {
            ["detail", "message", "code", "error"]
                .iter()
                .find_map(|key| error.get(*key).and_then(Value::as_str).map(str::to_string))
        })
        .unwrap_or_default();
    let haystack = error.to_string().to_ascii_lowercase();
    let not_found =
        code == Some(404) || haystack.contains("not_found") || haystack.contains("not found");
    if not_found {
        return ApiError::not_found(EntityKind::AccountHolder, &input.account_holder_id)
            .with_details(error.clone());
    }
    if let Some(code) = code {
        let body = serde_json::to_vec(error).unwrap_or_default();
        return error_for_status(code, &body, None, None);
    }
    let message =
        if text.is_empty() { "remote rejected the transaction".to_string() } else { text };
    ApiError::new(ApiErrorKind::Rejected, message).with_details(error.clone())
}

/// Error for an input the remote response did not mention.
fn missing_item(input: &TransactionInput) -> BulkItemResult {
    BulkItemResult::Failed(
        ApiError::new(
            ApiErrorKind::RemoteService,
            format!("transaction {} missing from bulk response", input.id),
        )
        .with_entity(EntityKind::Transaction, input.id.clone()),
    )
}

// ============================================================================
// SECTION: Tests
// ============================================================================
