//! Local admission control for outbound generation calls.
//!
//! A sliding log of admitted-call timestamps: at most `max_calls` calls fall
//! inside any `window`. Rejections are immediate and report how long until
//! the oldest logged call leaves the window. State is per process; several
//! instances each enforce their own limit.

use std::{
    collections::VecDeque,
    sync::Mutex,
    time::{Duration, Instant},
};

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("rate limit reached, retry in {retry_after_secs}s")]
pub struct RateLimitExceeded {
    /// Whole seconds, rounded up, never zero.
    pub retry_after_secs: u64,
}

pub trait RateLimiter: Send + Sync {
    fn try_acquire(&self) -> Result<(), RateLimitExceeded>;
}

#[derive(Debug)]
pub struct SlidingWindowLimiter {
    max_calls: usize,
    window: Duration,
    log: Mutex<VecDeque<Instant>>,
}

impl SlidingWindowLimiter {
    pub fn new(max_calls: usize, window: Duration) -> Self {
        Self {
            max_calls,
            window,
            log: Mutex::new(VecDeque::with_capacity(max_calls)),
        }
    }

    pub fn try_acquire_at(&self, now: Instant) -> Result<(), RateLimitExceeded> {
        let mut log = self.log.lock().unwrap_or_else(|poisoned| poisoned.into_inner());

        while let Some(&oldest) = log.front() {
            if now.saturating_duration_since(oldest) >= self.window {
                log.pop_front();
            } else {
                break;
            }
        }

        if log.len() < self.max_calls {
            log.push_back(now);
            return Ok(());
        }

        let remaining = match log.front() {
            Some(&oldest) => self.window - now.saturating_duration_since(oldest),
            None => self.window,
        };
        Err(RateLimitExceeded {
            retry_after_secs: ceil_secs(remaining).max(1),
        })
    }
}

impl RateLimiter for SlidingWindowLimiter {
    fn try_acquire(&self) -> Result<(), RateLimitExceeded> {
        self.try_acquire_at(Instant::now())
    }
}

fn ceil_secs(d: Duration) -> u64 {
    d.as_secs() + u64::from(d.subsec_nanos() > 0)
}
