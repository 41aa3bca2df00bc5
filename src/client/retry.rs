//! Conflict retry policy and per-call retry state.
//!
//! A conditional update or delete that is answered with `412 Precondition Failed`
//! is retried by refetching the resource, adopting its current version tag as the
//! new `If-Match`, waiting out a backoff delay and sending the mutation again.
//!
//! ```text
//! Idle -> Sending -> Success
//!            |  \--> Failed            (non-412, or 412 without an etag)
//!            v
//!         Conflict -> Failed           (retries or time budget exhausted)
//!            |
//!            v
//!        Refetching -> Failed          (refetch error, or no version tag)
//!            |
//!            +--(backoff)--> Sending
//! ```
//!
//! The delay before retry `n` (n >= 1) is `base_delay * multiplier^(n-1)`, capped
//! at `max_delay`. With the defaults the worst case sleeps
//! 100 + 200 + 400 + 800 + 1600 ms before giving up.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::Instant;

use crate::protocol::DEFAULT_ETAG_FIELD;

/// Bounds on the refetch-and-retry cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConflictPolicy {
    /// Maximum number of refetch-and-retry cycles after the first attempt.
    pub max_retries: u32,
    /// Delay before the first retry.
    pub base_delay: Duration,
    /// Growth factor between consecutive delays.
    pub multiplier: f64,
    /// Upper bound of a single delay.
    pub max_delay: Duration,
    /// Total time budget for one call, measured from its first send.
    ///
    /// A retry whose backoff would overrun the budget is not attempted, except
    /// the first one after a conflict.
    pub max_elapsed: Option<Duration>,
    /// Body field holding the resource's version tag.
    pub etag_field: String,
}

impl Default for ConflictPolicy {
    fn default() -> Self {
        Self {
            max_retries: 5,
            base_delay: Duration::from_millis(100),
            multiplier: 2.0,
            max_delay: Duration::from_secs(2),
            max_elapsed: Some(Duration::from_secs(10)),
            etag_field: DEFAULT_ETAG_FIELD.to_string(),
        }
    }
}

impl ConflictPolicy {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A policy that surfaces every 412 immediately.
    #[must_use]
    pub fn no_retry() -> Self {
        Self {
            max_retries: 0,
            ..Default::default()
        }
    }

    #[must_use]
    pub fn with_max_retries(mut self, max: u32) -> Self {
        self.max_retries = max;
        self
    }

    #[must_use]
    pub fn with_base_delay(mut self, delay: Duration) -> Self {
        self.base_delay = delay;
        self
    }

    #[must_use]
    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    #[must_use]
    pub fn with_max_elapsed(mut self, budget: Option<Duration>) -> Self {
        self.max_elapsed = budget;
        self
    }

    #[must_use]
    pub fn with_etag_field(mut self, field: impl Into<String>) -> Self {
        self.etag_field = field.into();
        self
    }

    /// Backoff delay before retry `attempt` (1-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(i32::MAX as u32) as i32;
        let scaled = self.base_delay.as_nanos() as f64 * self.multiplier.powi(exponent);
        let capped = scaled.min(self.max_delay.as_nanos() as f64).max(0.0);
        Duration::from_nanos(capped.round() as u64)
    }
}

/// Outcome of a conflict.
#[derive(Debug, Clone, PartialEq)]
pub enum RetryDecision {
    /// Refetch, then retry after this delay.
    Retry(Duration),
    /// Surface the conflict to the caller.
    GiveUp,
}

/// Where a conditional mutation currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Sending,
    Conflict,
    Refetching,
    Success,
    Failed,
}

impl Phase {
    #[inline]
    pub fn is_terminal(self) -> bool {
        matches!(self, Phase::Success | Phase::Failed)
    }
}

/// Retry bookkeeping owned by a single update or delete call.
#[derive(Debug)]
pub struct RetryState<'p> {
    attempt: u32,
    bound_version: Option<String>,
    phase: Phase,
    started: Instant,
    policy: &'p ConflictPolicy,
}

impl<'p> RetryState<'p> {
    pub fn new(policy: &'p ConflictPolicy, initial_version: Option<String>) -> Self {
        Self {
            attempt: 0,
            bound_version: initial_version,
            phase: Phase::Idle,
            started: Instant::now(),
            policy,
        }
    }

    /// Number of retries decided so far.
    #[inline]
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    /// Version tag the next attempt will send as `If-Match`.
    pub fn bound_version(&self) -> Option<&str> {
        self.bound_version.as_deref()
    }

    #[inline]
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Move to `next`, tracing the transition.
    pub fn enter(&mut self, next: Phase) {
        tracing::debug!(
            from = ?self.phase,
            to = ?next,
            attempt = self.attempt,
            "conditional mutation phase"
        );
        self.phase = next;
    }

    /// Adopt the version tag obtained by the refetch.
    pub fn bind_version(&mut self, version: impl Into<String>) {
        self.bound_version = Some(version.into());
    }

    /// Decide what to do about a 412 on the current attempt.
    pub fn on_conflict(&mut self) -> RetryDecision {
        if self.attempt >= self.policy.max_retries {
            return RetryDecision::GiveUp;
        }
        let delay = self.policy.delay_for(self.attempt + 1);
        // The first retry is always granted, however long the first send took.
        if let Some(budget) = self.policy.max_elapsed.filter(|_| self.attempt > 0) {
            if self.started.elapsed() + delay > budget {
                return RetryDecision::GiveUp;
            }
        }
        self.attempt += 1;
        RetryDecision::Retry(delay)
    }
}
