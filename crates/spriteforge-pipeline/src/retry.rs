//! Retry with exponential backoff
//!
//! One policy per stage call. Only errors the taxonomy marks retryable
//! are retried; validation and missing-credential failures surface
//! immediately.

use spriteforge_core::{ForgeError, Result};
use std::time::Duration;

use crate::clock::Clock;

/// How many times to attempt a stage call and how long to back off
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first
    pub max_attempts: u32,
    /// Delay before the second attempt; doubles for each attempt after
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(500),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration) -> Result<Self> {
        if max_attempts == 0 {
            return Err(ForgeError::Validation(
                "Retry policy needs at least one attempt".to_string(),
            ));
        }
        Ok(Self {
            max_attempts,
            base_delay,
        })
    }

    /// Backoff before attempt `attempt` (1-based; the first retry waits
    /// `base_delay`, then doubles).
    pub fn delay_before(&self, attempt: u32) -> Duration {
        self.base_delay
            .saturating_mul(2u32.saturating_pow(attempt.saturating_sub(1)))
    }

    /// Run `op` until it succeeds, fails non-retryably, or attempts run out.
    pub fn run<T>(
        &self,
        clock: &dyn Clock,
        mut op: impl FnMut() -> Result<T>,
    ) -> Result<T> {
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            match op() {
                Ok(value) => return Ok(value),
                Err(e) if e.is_retryable() && attempt < self.max_attempts => {
                    let delay = self.delay_before(attempt);
                    eprintln!(
                        "  Attempt {}/{} failed ({}), retrying in {:?}",
                        attempt, self.max_attempts, e, delay
                    );
                    clock.sleep(delay);
                }
                Err(e) => return Err(e),
            }
        }
    }
}

/// What the coordinator does when a stage exhausts its retries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Abort the run
    HardFail,
    /// Record the failure and continue with a locally synthesized stand-in
    /// (or nothing, for stages whose output is optional)
    SoftFail,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FakeClock;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn retryable() -> ForgeError {
        ForgeError::Provider {
            provider: "test".to_string(),
            status: Some(503),
            message: "overloaded".to_string(),
        }
    }

    #[test]
    fn test_succeeds_first_try_without_sleeping() {
        let clock = FakeClock::new();
        let policy = RetryPolicy::default();
        let result: Result<i32> = policy.run(&clock, || Ok(42));
        assert_eq!(result.unwrap(), 42);
        assert!(clock.slept().is_empty());
    }

    #[test]
    fn test_retries_with_doubling_backoff() {
        let clock = FakeClock::new();
        let policy = RetryPolicy::default();
        let calls = AtomicU32::new(0);

        let result = policy.run(&clock, || {
            if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                Err(retryable())
            } else {
                Ok("done")
            }
        });

        assert_eq!(result.unwrap(), "done");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(
            clock.slept(),
            vec![Duration::from_millis(500), Duration::from_millis(1000)]
        );
    }

    #[test]
    fn test_exhausts_attempts_then_fails() {
        let clock = FakeClock::new();
        let policy = RetryPolicy::default();
        let calls = AtomicU32::new(0);

        let result: Result<()> = policy.run(&clock, || {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(retryable())
        });

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(clock.slept().len(), 2);
    }

    #[test]
    fn test_non_retryable_fails_immediately() {
        let clock = FakeClock::new();
        let policy = RetryPolicy::default();
        let calls = AtomicU32::new(0);

        let result: Result<()> = policy.run(&clock, || {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(ForgeError::Validation("bad input".to_string()))
        });

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(clock.slept().is_empty());
    }

    #[test]
    fn test_credential_missing_not_retried() {
        let clock = FakeClock::new();
        let policy = RetryPolicy::default();
        let calls = AtomicU32::new(0);

        let result: Result<()> = policy.run(&clock, || {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(ForgeError::CredentialMissing("openai".to_string()))
        });

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_zero_attempts_rejected() {
        assert!(RetryPolicy::new(0, Duration::from_millis(100)).is_err());
    }

    #[test]
    fn test_delay_schedule() {
        let policy = RetryPolicy::new(5, Duration::from_millis(250)).unwrap();
        assert_eq!(policy.delay_before(1), Duration::from_millis(250));
        assert_eq!(policy.delay_before(2), Duration::from_millis(500));
        assert_eq!(policy.delay_before(3), Duration::from_millis(1000));
        assert_eq!(policy.delay_before(4), Duration::from_millis(2000));
    }
}
