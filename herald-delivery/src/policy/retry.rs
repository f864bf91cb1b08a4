//! Retry policy for delivery attempts.
//!
//! Retries are immediate: a failed entry goes back to the end of the pending
//! order and is attempted again once everything older has been processed. The
//! policy only bounds how many failed attempts an entry gets.

use serde::{Deserialize, Serialize};

/// Retry policy configuration for delivery operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Maximum number of failed attempts before an entry is marked `Error`.
    ///
    /// Default: 3 attempts
    #[serde(default = "defaults::max_attempts")]
    pub max_attempts: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: defaults::max_attempts(),
        }
    }
}

impl RetryPolicy {
    #[must_use]
    pub const fn new(max_attempts: u32) -> Self {
        Self { max_attempts }
    }

    /// Check if another retry should be attempted based on attempt count.
    ///
    /// Returns `true` if the number of attempts is less than `max_attempts`.
    #[must_use]
    pub const fn should_retry(&self, attempt_count: u32) -> bool {
        attempt_count < self.max_attempts
    }
}

mod defaults {
    pub const fn max_attempts() -> u32 {
        herald_queue::MAX_ATTEMPTS
    }
}
