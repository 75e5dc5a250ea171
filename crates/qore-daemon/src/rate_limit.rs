//! Fixed-window per-key (or per-IP) rate limiting (spec.md §4.5 "Rate limiting").

use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration;

use chrono::Utc;
use dashmap::DashMap;

/// A fixed window's remaining budget and reset time.
#[derive(Debug, Clone, Copy)]
pub struct RateLimitDecision {
    pub allowed: bool,
    pub limit: u32,
    pub remaining: u32,
    pub reset_at: i64,
    pub retry_after: i64,
}

struct Window {
    count: AtomicI64,
    reset_at: AtomicI64,
}

/// Per-key fixed window limiter. Expired windows are garbage-collected
/// opportunistically on the next request for that key — there is no
/// background sweep.
pub struct RateLimiter {
    limit: u32,
    window: Duration,
    windows: DashMap<String, Window>,
}

impl RateLimiter {
    pub fn new(limit: u32, window: Duration) -> Self {
        Self { limit, window, windows: DashMap::new() }
    }

    /// Default: 100 requests per 60s (spec.md §4.5).
    pub fn default_window() -> Self {
        Self::new(100, Duration::from_secs(60))
    }

    pub fn check(&self, key: &str) -> RateLimitDecision {
        let now = Utc::now().timestamp();
        let window_secs = self.window.as_secs() as i64;

        let entry = self.windows.entry(key.to_string()).or_insert_with(|| Window {
            count: AtomicI64::new(0),
            reset_at: AtomicI64::new(now + window_secs),
        });

        if now >= entry.reset_at.load(Ordering::SeqCst) {
            entry.count.store(0, Ordering::SeqCst);
            entry.reset_at.store(now + window_secs, Ordering::SeqCst);
        }

        let reset_at = entry.reset_at.load(Ordering::SeqCst);
        let count = entry.count.fetch_add(1, Ordering::SeqCst) + 1;

        if count > self.limit as i64 {
            RateLimitDecision {
                allowed: false,
                limit: self.limit,
                remaining: 0,
                reset_at,
                retry_after: (reset_at - now).max(0),
            }
        } else {
            RateLimitDecision {
                allowed: true,
                limit: self.limit,
                remaining: (self.limit as i64 - count).max(0) as u32,
                reset_at,
                retry_after: 0,
            }
        }
    }
}
