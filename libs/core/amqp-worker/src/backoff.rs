//! Reconnect backoff.
//!
//! The consumer sleeps between connect/consume cycles. The delay doubles after
//! every failed cycle up to a ceiling, and a cycle that ends cleanly restarts
//! the sequence from the initial delay: 1, 2, 4, 8, 16, 30, 30, ...

use std::time::Duration;

/// Initial delay and ceiling of the reconnect sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffPolicy {
    pub initial: Duration,
    pub max: Duration,
}

/// Result of one backoff transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffStep {
    /// How long to sleep before the next connect attempt
    pub sleep: Duration,
    /// Delay carried into the following transition
    pub next: Duration,
}

impl BackoffPolicy {
    pub fn new(initial: Duration, max: Duration) -> Self {
        Self { initial, max }
    }

    pub fn from_secs(initial: u64, max: u64) -> Self {
        Self::new(Duration::from_secs(initial), Duration::from_secs(max))
    }

    /// Pure transition from the current delay.
    ///
    /// `clean` is true when the previous cycle ended without an error.
    pub fn advance(&self, current: Duration, clean: bool) -> BackoffStep {
        let sleep = if clean { self.initial } else { current };
        let next = sleep.saturating_mul(2).min(self.max);
        BackoffStep { sleep, next }
    }
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self::from_secs(1, 30)
    }
}

/// Stateful wrapper over [`BackoffPolicy::advance`].
#[derive(Debug, Clone)]
pub struct Backoff {
    policy: BackoffPolicy,
    current: Duration,
}

impl Backoff {
    pub fn new(policy: BackoffPolicy) -> Self {
        Self {
            policy,
            current: policy.initial,
        }
    }

    /// Delay that the next failed cycle would sleep for
    pub fn current(&self) -> Duration {
        self.current
    }

    /// Record the end of a cycle and return how long to sleep.
    pub fn next_delay(&mut self, clean: bool) -> Duration {
        let step = self.policy.advance(self.current, clean);
        self.current = step.next;
        step.sleep
    }
}
