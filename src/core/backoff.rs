//! Exponential backoff between optimistic-write retries

use std::time::Duration;

/// Default delay before the first retry
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_millis(10);

/// Default cap on any single retry delay
pub const DEFAULT_MAX_DELAY: Duration = Duration::from_millis(1000);

/// Capped exponential backoff: `min(base * 2^attempt, max)`
///
/// The sequence is non-decreasing and never exceeds `max_delay`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffPolicy {
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            base_delay: DEFAULT_BASE_DELAY,
            max_delay: DEFAULT_MAX_DELAY,
        }
    }
}

impl BackoffPolicy {
    pub fn new(base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            base_delay,
            max_delay: max_delay.max(base_delay),
        }
    }

    /// Delay to sleep after the given failed attempt (0-indexed)
    pub fn delay(&self, attempt: u32) -> Duration {
        let factor = 1u32.checked_shl(attempt).unwrap_or(u32::MAX);
        self.base_delay
            .checked_mul(factor)
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }

    /// Total time spent sleeping if every one of `attempts` attempts conflicts
    ///
    /// No sleep follows the final attempt.
    pub fn worst_case_total(&self, attempts: u32) -> Duration {
        (0..attempts.saturating_sub(1)).map(|attempt| self.delay(attempt)).sum()
    }
}
