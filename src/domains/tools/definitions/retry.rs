//! Retry policy and per-call retry bookkeeping.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Configuration for retry behavior.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Maximum number of attempts, including the first one.
    pub max_attempts: u32,
    /// Delay before the first retry.
    pub base_delay: Duration,
    /// Growth factor applied per attempt.
    pub multiplier: u32,
    /// Upper bound for a single delay.
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
            multiplier: 2,
            max_delay: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    /// Delay to wait after the failed attempt with index `attempt` (0-based).
    ///
    /// `base_delay * multiplier^attempt`, capped at `max_delay`.
    pub fn backoff_for_attempt(&self, attempt: u32) -> Duration {
        let factor = self.multiplier.max(1).saturating_pow(attempt);
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }
}

/// Retry bookkeeping for a single outbound call.
///
/// Created when the call starts and dropped once it resolves.
#[derive(Debug, Clone)]
pub struct RetryState {
    policy: RetryPolicy,
    attempts: u32,
    delays: Vec<Duration>,
}

impl RetryState {
    pub fn new(policy: RetryPolicy) -> Self {
        Self {
            policy,
            attempts: 0,
            delays: Vec::new(),
        }
    }

    /// Record the start of an attempt and return its 1-based number.
    pub fn begin_attempt(&mut self) -> u32 {
        self.attempts += 1;
        self.attempts
    }

    /// Attempts started so far.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Attempts beyond the first.
    pub fn retries(&self) -> u32 {
        self.attempts.saturating_sub(1)
    }

    pub fn max_attempts(&self) -> u32 {
        self.policy.max_attempts.max(1)
    }

    /// Delays waited so far, in order.
    pub fn delays(&self) -> &[Duration] {
        &self.delays
    }

    /// Schedule the next retry.
    ///
    /// Returns the delay to wait, or `None` when the attempt budget is spent.
    pub fn next_delay(&mut self) -> Option<Duration> {
        if self.attempts >= self.max_attempts() {
            return None;
        }
        let delay = self.policy.backoff_for_attempt(self.attempts.saturating_sub(1));
        self.delays.push(delay);
        Some(delay)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_calculation() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.backoff_for_attempt(0), Duration::from_secs(1));
        assert_eq!(policy.backoff_for_attempt(1), Duration::from_secs(2));
        assert_eq!(policy.backoff_for_attempt(2), Duration::from_secs(4));
    }

    #[test]
    fn test_backoff_capped_at_max() {
        let policy = RetryPolicy {
            max_delay: Duration::from_secs(5),
            ..Default::default()
        };
        assert_eq!(policy.backoff_for_attempt(10), Duration::from_secs(5));
        assert_eq!(policy.backoff_for_attempt(40), Duration::from_secs(5));
    }

    #[test]
    fn test_state_respects_attempt_budget() {
        let mut state = RetryState::new(RetryPolicy::default());

        state.begin_attempt();
        assert_eq!(state.next_delay(), Some(Duration::from_secs(1)));
        state.begin_attempt();
        assert_eq!(state.next_delay(), Some(Duration::from_secs(2)));
        state.begin_attempt();
        assert_eq!(state.next_delay(), None);

        assert_eq!(state.attempts(), 3);
        assert_eq!(state.retries(), 2);
        assert_eq!(state.delays().len(), 2);
    }

    #[test]
    fn test_single_attempt_policy() {
        let mut state = RetryState::new(RetryPolicy {
            max_attempts: 1,
            ..Default::default()
        });
        state.begin_attempt();
        assert_eq!(state.next_delay(), None);
        assert_eq!(state.retries(), 0);
    }

    #[test]
    fn test_zero_max_attempts_still_allows_one() {
        let state = RetryState::new(RetryPolicy {
            max_attempts: 0,
            ..Default::default()
        });
        assert_eq!(state.max_attempts(), 1);
    }
}
