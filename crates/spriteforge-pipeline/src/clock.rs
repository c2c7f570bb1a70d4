//! Injected clock for everything that waits
//!
//! Retry backoff, rate-limiter admission, and provider poll loops all
//! sleep through this trait so tests can simulate multi-minute waits
//! without real delays.

use std::time::{Duration, Instant};

pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
    fn sleep(&self, dur: Duration);
}

/// The real clock: `Instant::now` and `std::thread::sleep`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn sleep(&self, dur: Duration) {
        std::thread::sleep(dur);
    }
}

/// Test clock: `sleep` advances a virtual instant and records the
/// requested duration instead of blocking.
#[cfg(test)]
pub(crate) struct FakeClock {
    now: std::sync::Mutex<Instant>,
    sleeps: std::sync::Mutex<Vec<Duration>>,
}

#[cfg(test)]
impl FakeClock {
    pub fn new() -> Self {
        Self {
            now: std::sync::Mutex::new(Instant::now()),
            sleeps: std::sync::Mutex::new(Vec::new()),
        }
    }

    pub fn slept(&self) -> Vec<Duration> {
        self.sleeps.lock().unwrap().clone()
    }

    pub fn total_slept(&self) -> Duration {
        self.slept().iter().sum()
    }
}

#[cfg(test)]
impl Clock for FakeClock {
    fn now(&self) -> Instant {
        *self.now.lock().unwrap()
    }

    fn sleep(&self, dur: Duration) {
        self.sleeps.lock().unwrap().push(dur);
        *self.now.lock().unwrap() += dur;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fake_clock_advances_without_blocking() {
        let clock = FakeClock::new();
        let before = clock.now();
        clock.sleep(Duration::from_secs(300));
        assert_eq!(clock.now() - before, Duration::from_secs(300));
        assert_eq!(clock.total_slept(), Duration::from_secs(300));
    }
}
