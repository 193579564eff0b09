//! Engine counters: provider traffic, degraded translations and asset cache
//! effectiveness.
//!
//! Each `LocalizationService` owns its own `EngineMetrics`, so test
//! instances never observe each other's counts.

use serde::Serialize;
use std::sync::atomic::{AtomicUsize, Ordering};

#[derive(Debug, Default)]
pub struct EngineMetrics {
    /// Calls made to a translation provider (translate or detect)
    provider_calls: AtomicUsize,

    /// Provider calls that returned an error
    provider_failures: AtomicUsize,

    /// Translations where no provider produced a changed result
    degraded_translations: AtomicUsize,

    /// Asset URL lookups answered from the cache
    cache_hits: AtomicUsize,

    /// Asset URL lookups that had to run the fallback chain
    cache_misses: AtomicUsize,

    /// Resolved asset URLs that failed the reachability check
    unreachable_assets: AtomicUsize,
}

impl EngineMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_provider_call(&self) {
        self.provider_calls.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_provider_failure(&self) {
        self.provider_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_degraded_translation(&self) {
        self.degraded_translations.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_cache_hit(&self) {
        self.cache_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_cache_miss(&self) {
        self.cache_misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_unreachable_asset(&self) {
        self.unreachable_assets.fetch_add(1, Ordering::Relaxed);
    }

    pub fn provider_calls(&self) -> usize {
        self.provider_calls.load(Ordering::Relaxed)
    }

    pub fn provider_failures(&self) -> usize {
        self.provider_failures.load(Ordering::Relaxed)
    }

    pub fn degraded_translations(&self) -> usize {
        self.degraded_translations.load(Ordering::Relaxed)
    }

    pub fn cache_hits(&self) -> usize {
        self.cache_hits.load(Ordering::Relaxed)
    }

    pub fn cache_misses(&self) -> usize {
        self.cache_misses.load(Ordering::Relaxed)
    }

    pub fn unreachable_assets(&self) -> usize {
        self.unreachable_assets.load(Ordering::Relaxed)
    }

    /// Generate a metrics report.
    pub fn report(&self) -> MetricsReport {
        let hits = self.cache_hits();
        let misses = self.cache_misses();
        let lookups = hits + misses;
        let cache_hit_rate = if lookups > 0 {
            (hits as f64 / lookups as f64) * 100.0
        } else {
            0.0
        };

        let calls = self.provider_calls();
        let failures = self.provider_failures();
        let provider_success_rate = if calls > 0 {
            (calls.saturating_sub(failures) as f64 / calls as f64) * 100.0
        } else {
            0.0
        };

        MetricsReport {
            provider_calls: calls,
            provider_failures: failures,
            provider_success_rate,
            degraded_translations: self.degraded_translations(),
            cache_hits: hits,
            cache_misses: misses,
            cache_hit_rate,
            unreachable_assets: self.unreachable_assets(),
        }
    }
}

/// Point-in-time copy of the engine counters.
#[derive(Debug, Clone, Serialize)]
pub struct MetricsReport {
    pub provider_calls: usize,
    pub provider_failures: usize,
    /// Percentage (0-100)
    pub provider_success_rate: f64,
    pub degraded_translations: usize,
    pub cache_hits: usize,
    pub cache_misses: usize,
    /// Percentage (0-100)
    pub cache_hit_rate: f64,
    pub unreachable_assets: usize,
}
