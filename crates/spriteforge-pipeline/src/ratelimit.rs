//! Per-provider sliding-window rate limiter
//!
//! Tracks call timestamps per provider inside a rolling window and
//! blocks a caller until the oldest tracked call leaves the window.
//! Shared across batch worker threads, so admission is serialized
//! through one mutex.

use spriteforge_core::{ForgeError, Result};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use crate::clock::Clock;

/// Maximum calls per window for one provider
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimit {
    pub max_calls: u32,
    pub window: Duration,
}

impl RateLimit {
    pub fn per_minute(max_calls: u32) -> Self {
        Self {
            max_calls,
            window: Duration::from_secs(60),
        }
    }
}

/// Snapshot of one provider's window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateStatus {
    pub used: u32,
    pub limit: u32,
    /// Time until the oldest tracked call leaves the window
    pub resets_in: Duration,
}

pub struct RateLimiter {
    limits: HashMap<String, RateLimit>,
    windows: Mutex<HashMap<String, VecDeque<Instant>>>,
    clock: Arc<dyn Clock>,
}

impl RateLimiter {
    pub fn new(limits: HashMap<String, RateLimit>, clock: Arc<dyn Clock>) -> Result<Self> {
        for (provider, limit) in &limits {
            if limit.max_calls == 0 {
                return Err(ForgeError::Validation(format!(
                    "Rate limit for '{}' must allow at least one call per window",
                    provider
                )));
            }
        }
        Ok(Self {
            limits,
            windows: Mutex::new(HashMap::new()),
            clock,
        })
    }

    /// Default per-provider limits, conservative against published quotas.
    pub fn default_limits() -> HashMap<String, RateLimit> {
        let mut limits = HashMap::new();
        limits.insert("openai".to_string(), RateLimit::per_minute(5));
        limits.insert("stability".to_string(), RateLimit::per_minute(10));
        limits.insert("kling".to_string(), RateLimit::per_minute(4));
        limits.insert("meshy".to_string(), RateLimit::per_minute(6));
        limits
    }

    pub fn with_defaults(clock: Arc<dyn Clock>) -> Self {
        // Built-in limits are all non-zero.
        Self::new(Self::default_limits(), clock)
            .unwrap_or_else(|_| unreachable!("default limits are valid"))
    }

    /// Block until `provider` may make one more call, then record it.
    /// Providers without a configured limit are admitted immediately.
    pub fn acquire(&self, provider: &str) {
        let Some(limit) = self.limits.get(provider) else {
            return;
        };

        loop {
            let wait = {
                let mut windows = self.windows.lock().unwrap_or_else(|e| e.into_inner());
                let window = windows.entry(provider.to_string()).or_default();
                let now = self.clock.now();
                Self::purge(window, now, limit.window);

                if (window.len() as u32) < limit.max_calls {
                    window.push_back(now);
                    return;
                }

                // Window is full; wait exactly until the oldest call ages out.
                let oldest = window[0];
                limit.window.saturating_sub(now.duration_since(oldest))
            };

            self.clock.sleep(wait.max(Duration::from_millis(1)));
        }
    }

    /// Read-only view of a provider's window, without admitting anything.
    pub fn status(&self, provider: &str) -> Option<RateStatus> {
        let limit = self.limits.get(provider)?;
        let mut windows = self.windows.lock().unwrap_or_else(|e| e.into_inner());
        let window = windows.entry(provider.to_string()).or_default();
        let now = self.clock.now();
        Self::purge(window, now, limit.window);

        let resets_in = window
            .front()
            .map(|oldest| limit.window.saturating_sub(now.duration_since(*oldest)))
            .unwrap_or(Duration::ZERO);

        Some(RateStatus {
            used: window.len() as u32,
            limit: limit.max_calls,
            resets_in,
        })
    }

    fn purge(window: &mut VecDeque<Instant>, now: Instant, span: Duration) {
        while let Some(oldest) = window.front() {
            if now.duration_since(*oldest) >= span {
                window.pop_front();
            } else {
                break;
            }
        }
    }
}
