// crates/ntropy-mcp-client/src/retry.rs
// ============================================================================
// Module: Retry Policy
// Description: Bounded exponential backoff with jitter for remote calls.
// Purpose: Decide whether and how long to wait before another attempt.
// Dependencies: ntropy-mcp-core, rand
// ============================================================================

//! ## Overview
//! Each remote operation declares a [`RetryClass`]. Idempotent operations
//! retry any transient failure; non-idempotent creation retries only when the
//! connection failed before the request could be delivered. Delays double
//! from the initial backoff up to the ceiling, with jitter drawn from the
//! upper half of the window. A `Retry-After` hint replaces the computed delay,
//! capped at the ceiling.

use std::time::Duration;

use ntropy_mcp_core::ApiErrorKind;
use ntropy_mcp_core::ToolName;
use rand::Rng;

/// Default maximum attempts, including the first.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
/// Default delay before the second attempt.
pub const DEFAULT_INITIAL_BACKOFF: Duration = Duration::from_millis(250);
/// Default delay ceiling.
pub const DEFAULT_MAX_BACKOFF: Duration = Duration::from_secs(5);

/// Bounded retry policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Maximum attempts per call, including the first.
    pub max_attempts: u32,
    /// Delay before the second attempt.
    pub initial_backoff: Duration,
    /// Upper bound on any single delay.
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            initial_backoff: DEFAULT_INITIAL_BACKOFF,
            max_backoff: DEFAULT_MAX_BACKOFF,
        }
    }
}

impl RetryPolicy {
    /// Policy that never retries.
    #[must_use]
    pub const fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            initial_backoff: Duration::ZERO,
            max_backoff: Duration::ZERO,
        }
    }

    /// Returns the un-jittered backoff window after `attempt` failures.
    #[must_use]
    pub fn backoff_ceiling(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        self.initial_backoff.saturating_mul(1_u32 << exponent).min(self.max_backoff)
    }

    /// Returns the delay before the next attempt.
    #[must_use]
    pub fn delay_for_attempt(&self, attempt: u32, retry_after: Option<Duration>) -> Duration {
        if let Some(hint) = retry_after {
            return hint.min(self.max_backoff);
        }
        let ceiling = self.backoff_ceiling(attempt);
        let floor = ceiling / 2;
        if ceiling <= floor {
            return ceiling;
        }
        rand::thread_rng().gen_range(floor..=ceiling)
    }
}

/// Retry eligibility of a remote operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryClass {
    /// Safe to repeat: retry timeouts, connection failures, 429, and 5xx.
    Idempotent,
    /// Not safe to repeat once delivered: retry connection failures only.
    ConnectOnly,
}

impl RetryClass {
    /// Returns the class for a tool's remote call.
    #[must_use]
    pub const fn for_tool(tool: ToolName) -> Self {
        match tool {
            ToolName::CreateAccountHolder => Self::ConnectOnly,
            _ => Self::Idempotent,
        }
    }
}

// ============================================================================
// SECTION: Observation
// ============================================================================

/// Retry notification emitted before sleeping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryEvent {
    /// Operation being retried.
    pub tool: ToolName,
    /// Attempt that just failed (1-based).
    pub attempt: u32,
    /// Maximum attempts allowed.
    pub max_attempts: u32,
    /// Delay before the next attempt.
    pub delay: Duration,
    /// Kind of the failure that triggered the retry.
    pub error_kind: ApiErrorKind,
    /// Remote status when a response was received.
    pub status: Option<u16>,
}

/// Receives retry notifications.
pub trait RetryObserver: Send + Sync {
    /// Called once per scheduled retry.
    fn on_retry(&self, event: &RetryEvent);
}

/// Observer that discards retry notifications.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopRetryObserver;

impl RetryObserver for NoopRetryObserver {
    fn on_retry(&self, _event: &RetryEvent) {}
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

    use std::time::Duration;

    use ntropy_mcp_core::ToolName;

    use super::RetryClass;
    use super::RetryPolicy;

    fn policy() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 5,
            initial_backoff: Duration::from_millis(100),
            max_backoff: Duration::from_millis(1_000),
        }
    }

    #[test]
    fn backoff_doubles_until_ceiling() {
        let policy = policy();
        assert_eq!(policy.backoff_ceiling(1), Duration::from_millis(100));
        assert_eq!(policy.backoff_ceiling(2), Duration::from_millis(200));
        assert_eq!(policy.backoff_ceiling(3), Duration::from_millis(400));
        assert_eq!(policy.backoff_ceiling(5), Duration::from_millis(1_000));
        assert_eq!(policy.backoff_ceiling(40), Duration::from_millis(1_000));
    }

    #[test]
    fn jittered_delay_stays_in_upper_half_of_window() {
        let policy = policy();
        for attempt in 1..=6 {
            let ceiling = policy.backoff_ceiling(attempt);
            for _ in 0..50 {
                let delay = policy.delay_for_attempt(attempt, None);
                assert!(delay <= ceiling);
                assert!(delay >= ceiling / 2);
            }
        }
    }

    #[test]
    fn retry_after_hint_is_capped() {
        let policy = policy();
        assert_eq!(
            policy.delay_for_attempt(1, Some(Duration::from_millis(300))),
            Duration::from_millis(300)
        );
        assert_eq!(
            policy.delay_for_attempt(1, Some(Duration::from_secs(60))),
            Duration::from_millis(1_000)
        );
    }

    #[test]
    fn zero_backoff_policy_never_sleeps() {
        let policy = RetryPolicy::no_retry();
        assert_eq!(policy.delay_for_attempt(3, None), Duration::ZERO);
    }

    #[test]
    fn only_creation_is_connect_only() {
        for tool in ToolName::all() {
            let expected = if *tool == ToolName::CreateAccountHolder {
                RetryClass::ConnectOnly
            } else {
                RetryClass::Idempotent
            };
            assert_eq!(RetryClass::for_tool(*tool), expected);
        }
    }
}
