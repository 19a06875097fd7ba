//! Flush path counters.
//!
//! One instance is shared by every grid of a manager. Counters are relaxed
//! atomics; `snapshot` gives tests and the replay binary a plain copy.

use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Default)]
pub struct HighlightMetrics {
    /// Grid flushes that rendered and applied overlays.
    pub flushes_applied: AtomicU64,
    /// Flushes skipped because the grid was clean.
    pub flushes_clean: AtomicU64,
    /// Dirty flushes postponed for lack of an editor or viewport.
    pub flushes_deferred: AtomicU64,
    /// Flushes where at least one `apply_overlay` call failed.
    pub flushes_failed: AtomicU64,
    pub lines_rendered: AtomicU64,
    pub cache_hits: AtomicU64,
    pub cache_misses: AtomicU64,
    /// Overlays handed to editors across all styles.
    pub overlays_applied: AtomicU64,
    /// Styles cleared with an empty overlay list (diff or teardown).
    pub styles_cleared: AtomicU64,
    pub apply_failures: AtomicU64,
    pub grids_disposed: AtomicU64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HighlightMetricsSnapshot {
    pub flushes_applied: u64,
    pub flushes_clean: u64,
    pub flushes_deferred: u64,
    pub flushes_failed: u64,
    pub lines_rendered: u64,
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub overlays_applied: u64,
    pub styles_cleared: u64,
    pub apply_failures: u64,
    pub grids_disposed: u64,
}

impl HighlightMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn bump(counter: &AtomicU64, n: u64) {
        counter.fetch_add(n, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> HighlightMetricsSnapshot {
        HighlightMetricsSnapshot {
            flushes_applied: self.flushes_applied.load(Ordering::Relaxed),
            flushes_clean: self.flushes_clean.load(Ordering::Relaxed),
            flushes_deferred: self.flushes_deferred.load(Ordering::Relaxed),
            flushes_failed: self.flushes_failed.load(Ordering::Relaxed),
            lines_rendered: self.lines_rendered.load(Ordering::Relaxed),
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            cache_misses: self.cache_misses.load(Ordering::Relaxed),
            overlays_applied: self.overlays_applied.load(Ordering::Relaxed),
            styles_cleared: self.styles_cleared.load(Ordering::Relaxed),
            apply_failures: self.apply_failures.load(Ordering::Relaxed),
            grids_disposed: self.grids_disposed.load(Ordering::Relaxed),
        }
    }
}

impl HighlightMetricsSnapshot {
    /// Fraction of row lookups served from cache, `0.0` before any lookup.
    pub fn cache_hit_ratio(&self) -> f64 {
        let total = self.cache_hits + self.cache_misses;
        if total == 0 {
            0.0
        } else {
            self.cache_hits as f64 / total as f64
        }
    }
}
