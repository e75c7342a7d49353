//! Retry policy for transient collaborator failures.

use std::time::Duration;

/// Bounded retry with multiplicative backoff.
///
/// Behaviours consult the policy after each failed collaborator call;
/// while attempts remain the behaviour suspends on [`Effect::Sleep`]
/// and retries, otherwise it cedes control.
///
/// [`Effect::Sleep`]: crate::Effect::Sleep
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Attempts before giving up, including the first.
    pub max_attempts: u32,

    /// Backoff before the second attempt.
    pub initial_backoff: Duration,

    /// Backoff multiplier applied per subsequent attempt.
    pub multiplier: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(500),
            multiplier: 2,
        }
    }
}

impl RetryPolicy {
    /// Create a policy that never retries.
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            ..Default::default()
        }
    }

    /// Get the backoff before retrying after `failed_attempts` failures.
    ///
    /// Returns `None` once the attempt budget is exhausted.
    pub fn backoff_for(&self, failed_attempts: u32) -> Option<Duration> {
        if failed_attempts >= self.max_attempts {
            return None;
        }
        let factor = self.multiplier.saturating_pow(failed_attempts.saturating_sub(1));
        Some(self.initial_backoff.saturating_mul(factor))
    }
}
