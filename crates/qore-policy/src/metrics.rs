//! Periodic router metrics emission (spec.md §4.1 "Metrics emission").
//!
//! Best-effort: a failure here must never affect routing, so every method
//! only ever mutates in-memory counters and logs — it cannot return an error.

use std::sync::atomic::{AtomicU64, Ordering};

use qore_cache::CacheStats;
use qore_types::Novelty;
use tracing::info;

#[derive(Debug, Default)]
struct NoveltyBuckets {
    low: AtomicU64,
    medium: AtomicU64,
    high: AtomicU64,
}

impl NoveltyBuckets {
    fn record(&self, novelty: Novelty) {
        match novelty {
            Novelty::Low => self.low.fetch_add(1, Ordering::Relaxed),
            Novelty::Medium => self.medium.fetch_add(1, Ordering::Relaxed),
            Novelty::High => self.high.fetch_add(1, Ordering::Relaxed),
        };
    }

    fn snapshot(&self) -> (u64, u64, u64) {
        (
            self.low.load(Ordering::Relaxed),
            self.medium.load(Ordering::Relaxed),
            self.high.load(Ordering::Relaxed),
        )
    }
}

/// Accumulates router-internal counters and emits a summary every 25 routed
/// events. Cache hit/miss counters live on the caches themselves
/// ([`qore_cache::TtlLru::stats`]); this struct only tracks routing counts
/// and the novelty-accuracy aggregate.
#[derive(Debug, Default)]
pub struct RouterMetrics {
    routed: AtomicU64,
    novelty_buckets: NoveltyBuckets,
    confidence_sum: AtomicU64, // fixed-point: score * 1000, summed
    confidence_count: AtomicU64,
}

const EMIT_EVERY: u64 = 25;
const FIXED_POINT_SCALE: f64 = 1000.0;

impl RouterMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one routed event's triage outcome. Returns `true` if this call
    /// crossed an emission boundary (caller already logged the snapshot).
    pub fn record(&self, novelty: Novelty, confidence_score: f64, fingerprint_stats: CacheStats, novelty_stats: CacheStats) -> bool {
        self.novelty_buckets.record(novelty);
        self.confidence_sum
            .fetch_add((confidence_score * FIXED_POINT_SCALE) as u64, Ordering::Relaxed);
        self.confidence_count.fetch_add(1, Ordering::Relaxed);

        let routed = self.routed.fetch_add(1, Ordering::Relaxed) + 1;
        if routed % EMIT_EVERY == 0 {
            self.emit(fingerprint_stats, novelty_stats);
            true
        } else {
            false
        }
    }

    fn emit(&self, fingerprint_stats: CacheStats, novelty_stats: CacheStats) {
        let (low, medium, high) = self.novelty_buckets.snapshot();
        let count = self.confidence_count.load(Ordering::Relaxed).max(1);
        let mean = self.confidence_sum.load(Ordering::Relaxed) as f64 / FIXED_POINT_SCALE / count as f64;

        info!(
            routed = self.routed.load(Ordering::Relaxed),
            novelty_low = low,
            novelty_medium = medium,
            novelty_high = high,
            confidence_mean = mean,
            fingerprint_cache_hits = fingerprint_stats.hits,
            fingerprint_cache_misses = fingerprint_stats.misses,
            fingerprint_cache_len = fingerprint_stats.len,
            novelty_cache_hits = novelty_stats.hits,
            novelty_cache_misses = novelty_stats.misses,
            novelty_cache_len = novelty_stats.len,
            "router metrics"
        );
    }
}
