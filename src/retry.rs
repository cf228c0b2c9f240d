//! Retry classification and backoff for provider lookups
//!
//! Retrying is data-driven: the worker asks [`RetryPolicy::decide`] what to do
//! with a failed attempt and records the answer as an item transition. Nothing
//! here sleeps or loops; waiting happens in a detached task that re-enqueues
//! the item, so a pending retry holds neither a worker nor a fetch permit.
//!
//! # Example
//!
//! ```
//! use provider_batch::retry::{RetryDecision, RetryPolicy};
//! use provider_batch::types::FetchErrorKind;
//! use std::time::Duration;
//!
//! let policy = RetryPolicy::new(3, Duration::from_millis(100));
//!
//! assert_eq!(
//!     policy.decide(1, FetchErrorKind::Timeout),
//!     RetryDecision::Retry { delay: Duration::from_millis(100) }
//! );
//! assert_eq!(policy.decide(3, FetchErrorKind::Timeout), RetryDecision::GiveUp);
//! assert_eq!(policy.decide(1, FetchErrorKind::NotFound), RetryDecision::GiveUp);
//! ```

use crate::config::BatchConfig;
use crate::types::FetchErrorKind;
use std::time::Duration;

/// Trait for failures that can be classified as retryable or not
///
/// Transient failures (timeouts, server errors, throttling) return `true`.
/// Permanent failures (unknown identifier, malformed data) return `false`.
pub trait IsRetryable {
    /// Returns true if the failure is transient and the lookup should be retried
    fn is_retryable(&self) -> bool;
}

impl IsRetryable for FetchErrorKind {
    fn is_retryable(&self) -> bool {
        match self {
            FetchErrorKind::Timeout => true,
            FetchErrorKind::ServerError => true,
            FetchErrorKind::RateLimited => true,
            FetchErrorKind::NotFound => false,
            FetchErrorKind::Malformed => false,
        }
    }
}

/// What to do with an item after a failed attempt
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RetryDecision {
    /// Return the item to PENDING and re-enqueue it after `delay`
    Retry {
        /// Backoff before the item becomes claimable again
        delay: Duration,
    },
    /// Mark the item FAILED with the last error kind
    GiveUp,
}

/// Attempt cap and incremental backoff
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    base_delay: Duration,
}

impl RetryPolicy {
    /// Create a policy allowing `max_attempts` attempts in total
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts,
            base_delay,
        }
    }

    /// Build the policy from batch configuration
    pub fn from_config(config: &BatchConfig) -> Self {
        Self::new(config.max_attempts, config.retry_base_delay)
    }

    /// Maximum attempts per item, first try included
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Backoff before the attempt following attempt number `attempts`
    ///
    /// Grows linearly: `attempts * base_delay`.
    pub fn backoff(&self, attempts: u32) -> Duration {
        self.base_delay.saturating_mul(attempts.max(1))
    }

    /// Transition for an item whose attempt number `attempts` failed with `kind`
    ///
    /// `attempts` is the count after the failed attempt was claimed, so the
    /// first failure is decided with `attempts == 1`.
    pub fn decide(&self, attempts: u32, kind: FetchErrorKind) -> RetryDecision {
        if !kind.is_retryable() {
            return RetryDecision::GiveUp;
        }
        if attempts >= self.max_attempts {
            return RetryDecision::GiveUp;
        }
        RetryDecision::Retry {
            delay: self.backoff(attempts),
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&BatchConfig::default())
    }
}
