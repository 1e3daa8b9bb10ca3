//! Request and render metrics.
//!
//! Counts are kept both in atomics (served by `/ready`) and in the global
//! `metrics` recorder, which the Prometheus exporter renders at `/metrics`.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use metrics::{counter, histogram};
use serde::Serialize;

#[derive(Debug)]
pub struct MetricsCollector {
    wms_requests: AtomicU64,
    tile_requests: AtomicU64,
    cache_hits: AtomicU64,
    cache_misses: AtomicU64,
    render_errors: AtomicU64,
    start_time: Instant,
}

/// Point-in-time copy of the counters.
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub wms_requests: u64,
    pub tile_requests: u64,
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub render_errors: u64,
    pub uptime_secs: u64,
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self {
            wms_requests: AtomicU64::new(0),
            tile_requests: AtomicU64::new(0),
            cache_hits: AtomicU64::new(0),
            cache_misses: AtomicU64::new(0),
            render_errors: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    pub fn record_wms_request(&self, operation: &str) {
        self.wms_requests.fetch_add(1, Ordering::Relaxed);
        counter!("wms_requests_total", "operation" => operation.to_string()).increment(1);
    }

    pub fn record_tile_request(&self) {
        self.tile_requests.fetch_add(1, Ordering::Relaxed);
        counter!("tile_requests_total").increment(1);
    }

    pub fn record_cache_hit(&self) {
        self.cache_hits.fetch_add(1, Ordering::Relaxed);
        counter!("tile_cache_hits_total").increment(1);
    }

    pub fn record_cache_miss(&self) {
        self.cache_misses.fetch_add(1, Ordering::Relaxed);
        counter!("tile_cache_misses_total").increment(1);
    }

    pub fn record_render(&self, kind: &'static str, elapsed: Duration) {
        histogram!("render_duration_seconds", "kind" => kind).record(elapsed.as_secs_f64());
    }

    pub fn record_render_error(&self) {
        self.render_errors.fetch_add(1, Ordering::Relaxed);
        counter!("render_errors_total").increment(1);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            wms_requests: self.wms_requests.load(Ordering::Relaxed),
            tile_requests: self.tile_requests.load(Ordering::Relaxed),
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            cache_misses: self.cache_misses.load(Ordering::Relaxed),
            render_errors: self.render_errors.load(Ordering::Relaxed),
            uptime_secs: self.start_time.elapsed().as_secs(),
        }
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}
