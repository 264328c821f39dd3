//! Metrics collection for the catalog client
//!
//! This module provides thread-safe metrics collection using atomic operations.
//! It tracks page fetches, detail requests, and image cache activity.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Metrics collector shared by the page fetcher and the resource cache
///
/// All operations are thread-safe using atomic operations.
#[derive(Debug, Default)]
pub struct ClientMetrics {
    // Page statistics
    page_fetches: AtomicU64,
    failed_pages: AtomicU64,

    // Detail statistics
    detail_requests: AtomicU64,
    failed_details: AtomicU64,

    // Cache statistics
    cache_hits: AtomicU64,
    cache_misses: AtomicU64,
    coalesced_fetches: AtomicU64,
    cancelled_fetches: AtomicU64,
    evictions: AtomicU64,
    failed_resource_loads: AtomicU64,

    // Latency statistics (stored as microseconds)
    total_page_duration_us: AtomicU64,
}

/// Snapshot of metrics at a point in time
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub page_fetches: u64,
    pub failed_pages: u64,

    pub detail_requests: u64,
    pub failed_details: u64,

    pub cache_hits: u64,
    pub cache_misses: u64,
    pub coalesced_fetches: u64,
    pub cancelled_fetches: u64,
    pub evictions: u64,
    pub failed_resource_loads: u64,

    pub total_page_duration_us: u64,
}

impl ClientMetrics {
    /// Create a new metrics collector
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a finished page fetch and how long it took
    pub fn record_page(&self, success: bool, duration: Duration) {
        self.page_fetches.fetch_add(1, Ordering::Relaxed);
        if !success {
            self.failed_pages.fetch_add(1, Ordering::Relaxed);
        }
        self.total_page_duration_us
            .fetch_add(duration.as_micros() as u64, Ordering::Relaxed);
    }

    /// Record a settled detail request
    pub fn record_detail(&self, success: bool) {
        self.detail_requests.fetch_add(1, Ordering::Relaxed);
        if !success {
            self.failed_details.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn record_cache_hit(&self) {
        self.cache_hits.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a miss that started a new network fetch
    pub fn record_cache_miss(&self) {
        self.cache_misses.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a caller that joined an already running fetch
    pub fn record_coalesced(&self) {
        self.coalesced_fetches.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_cancelled(&self) {
        self.cancelled_fetches.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_evictions(&self, count: u64) {
        self.evictions.fetch_add(count, Ordering::Relaxed);
    }

    pub fn record_failed_resource_load(&self) {
        self.failed_resource_loads.fetch_add(1, Ordering::Relaxed);
    }

    /// Get a snapshot of current metrics
    ///
    /// Due to the concurrent nature of the system, the snapshot may not be
    /// perfectly consistent across all fields.
    pub fn get_stats(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            page_fetches: self.page_fetches.load(Ordering::Relaxed),
            failed_pages: self.failed_pages.load(Ordering::Relaxed),
            detail_requests: self.detail_requests.load(Ordering::Relaxed),
            failed_details: self.failed_details.load(Ordering::Relaxed),
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            cache_misses: self.cache_misses.load(Ordering::Relaxed),
            coalesced_fetches: self.coalesced_fetches.load(Ordering::Relaxed),
            cancelled_fetches: self.cancelled_fetches.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            failed_resource_loads: self.failed_resource_loads.load(Ordering::Relaxed),
            total_page_duration_us: self.total_page_duration_us.load(Ordering::Relaxed),
        }
    }

    /// Reset all metrics to zero
    ///
    /// This is primarily useful for testing.
    pub fn reset(&self) {
        self.page_fetches.store(0, Ordering::Relaxed);
        self.failed_pages.store(0, Ordering::Relaxed);
        self.detail_requests.store(0, Ordering::Relaxed);
        self.failed_details.store(0, Ordering::Relaxed);
        self.cache_hits.store(0, Ordering::Relaxed);
        self.cache_misses.store(0, Ordering::Relaxed);
        self.coalesced_fetches.store(0, Ordering::Relaxed);
        self.cancelled_fetches.store(0, Ordering::Relaxed);
        self.evictions.store(0, Ordering::Relaxed);
        self.failed_resource_loads.store(0, Ordering::Relaxed);
        self.total_page_duration_us.store(0, Ordering::Relaxed);
    }
}

impl MetricsSnapshot {
    /// Cache hit rate as a percentage (0.0 to 100.0)
    ///
    /// Coalesced callers count as misses: they still waited on the network.
    pub fn cache_hit_rate(&self) -> f64 {
        let total = self.cache_hits + self.cache_misses + self.coalesced_fetches;
        if total == 0 {
            0.0
        } else {
            (self.cache_hits as f64 / total as f64) * 100.0
        }
    }

    /// Average page fetch duration in milliseconds
    pub fn avg_page_duration_ms(&self) -> f64 {
        if self.page_fetches == 0 {
            0.0
        } else {
            (self.total_page_duration_us as f64 / self.page_fetches as f64) / 1000.0
        }
    }

    /// Detail request failure rate as a percentage (0.0 to 100.0)
    pub fn detail_failure_rate(&self) -> f64 {
        if self.detail_requests == 0 {
            0.0
        } else {
            (self.failed_details as f64 / self.detail_requests as f64) * 100.0
        }
    }
}
