//! Sliding-window rate limiting for metadata retrievers
//!
//! External metadata APIs impose calls-per-period quotas. Each retriever
//! gets its own limiter, so a throttled source never delays citekeys
//! routed elsewhere. Retrieval is blocking and single-threaded, so the
//! limiter simply sleeps until the oldest call ages out of the window.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use tracing::debug;

#[derive(Debug)]
pub struct RateLimiter {
    max_calls: usize,
    period: Duration,
    calls: Mutex<VecDeque<Instant>>,
}

impl RateLimiter {
    /// Allow at most `max_calls` within any window of `period`.
    pub fn new(max_calls: usize, period: Duration) -> Self {
        Self {
            max_calls: max_calls.max(1),
            period,
            calls: Mutex::new(VecDeque::new()),
        }
    }

    /// Convenience constructor for per-second API quotas.
    pub fn per_second(max_calls: usize) -> Self {
        Self::new(max_calls, Duration::from_secs(1))
    }

    /// Block until a call is allowed, then record it.
    pub fn acquire(&self) {
        let mut calls = match self.calls.lock() {
            Ok(calls) => calls,
            Err(poisoned) => poisoned.into_inner(),
        };
        let now = Instant::now();
        while let Some(oldest) = calls.front() {
            if now.duration_since(*oldest) >= self.period {
                calls.pop_front();
            } else {
                break;
            }
        }
        if calls.len() >= self.max_calls {
            if let Some(oldest) = calls.front() {
                let wait = self.period.saturating_sub(now.duration_since(*oldest));
                debug!(?wait, "rate limit reached, sleeping");
                std::thread::sleep(wait);
            }
            calls.pop_front();
        }
        calls.push_back(Instant::now());
    }
}
