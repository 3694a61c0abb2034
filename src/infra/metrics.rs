//! Lock-free metrics collection and periodic reporting
//!
//! Uses atomics for hot-path operations to avoid mutex contention.
//! Monotonic counters are never reset; `report()` only resets the
//! per-interval rate counters used for the log summary.
//!
//! NOTE: All atomics use Relaxed ordering intentionally. These are
//! statistical counters only and must not drive any decision logic.

use crate::services::alerts::AlertKind;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tracing::info;

/// Prometheus-style exponential bucket boundaries (microseconds)
/// Buckets: ≤100, ≤200, ≤400, ≤800, ≤1600, ≤3200, ≤6400, ≤12800, ≤25600, ≤51200, >51200
const BUCKET_BOUNDS: [u64; 10] = [100, 200, 400, 800, 1600, 3200, 6400, 12800, 25600, 51200];
const NUM_BUCKETS: usize = 11;

pub const METRICS_NUM_BUCKETS: usize = NUM_BUCKETS;
pub const METRICS_BUCKET_BOUNDS: [u64; 10] = BUCKET_BOUNDS;

/// Compute bucket index for a latency value using binary search
#[inline]
fn bucket_index(latency_us: u64) -> usize {
    BUCKET_BOUNDS.partition_point(|&bound| bound < latency_us)
}

/// Update an atomic max value using compare-and-swap loop
#[inline]
fn update_atomic_max(atomic_max: &AtomicU64, new_value: u64) {
    let mut current_max = atomic_max.load(Ordering::Relaxed);
    while new_value > current_max {
        match atomic_max.compare_exchange_weak(
            current_max,
            new_value,
            Ordering::Relaxed,
            Ordering::Relaxed,
        ) {
            Ok(_) => break,
            Err(actual) => current_max = actual,
        }
    }
}

/// Load all bucket values without resetting
#[inline]
fn load_buckets(buckets: &[AtomicU64; NUM_BUCKETS]) -> [u64; NUM_BUCKETS] {
    let mut result = [0u64; NUM_BUCKETS];
    for (i, bucket) in buckets.iter().enumerate() {
        result[i] = bucket.load(Ordering::Relaxed);
    }
    result
}

/// Compute percentile from histogram buckets
/// Returns the upper bound of the bucket containing the percentile
fn percentile_from_buckets(buckets: &[u64; NUM_BUCKETS], percentile: f64) -> u64 {
    let total: u64 = buckets.iter().sum();
    if total == 0 {
        return 0;
    }

    let target = (total as f64 * percentile) as u64;
    let mut cumulative = 0u64;

    // Upper bounds for each bucket (last bucket uses 2x the previous bound)
    const BUCKET_UPPER_BOUNDS: [u64; NUM_BUCKETS] =
        [100, 200, 400, 800, 1600, 3200, 6400, 12800, 25600, 51200, 102400];

    for (i, &count) in buckets.iter().enumerate() {
        cumulative += count;
        if cumulative >= target {
            return BUCKET_UPPER_BOUNDS[i];
        }
    }
    BUCKET_UPPER_BOUNDS[NUM_BUCKETS - 1]
}

#[inline]
fn alert_index(kind: AlertKind) -> usize {
    match kind {
        AlertKind::Critical => 0,
        AlertKind::High => 1,
        AlertKind::Bottleneck => 2,
        AlertKind::Imbalance => 3,
    }
}

pub const ALERT_KINDS: [AlertKind; 4] =
    [AlertKind::Critical, AlertKind::High, AlertKind::Bottleneck, AlertKind::Imbalance];

/// Lock-free metrics collector
pub struct Metrics {
    /// Detection frames processed (monotonic)
    frames_total: AtomicU64,
    /// Person detections seen across all frames (monotonic)
    detections_total: AtomicU64,
    /// Detections outside every zone (monotonic)
    detections_uncounted_total: AtomicU64,
    /// Occupancy updates applied to the store, frames and direct counts (monotonic)
    ingests_total: AtomicU64,
    /// Pressure analyses run (monotonic)
    analyses_total: AtomicU64,
    /// Alerts emitted, indexed by `alert_index` (monotonic)
    alerts_total: [AtomicU64; 4],
    /// Emergency releases executed (monotonic)
    releases_total: AtomicU64,
    /// Occupants removed by releases and optimizations (monotonic)
    occupants_released_total: AtomicU64,
    /// Flow optimizations applied (monotonic)
    optimizations_total: AtomicU64,
    /// Facilities currently known to the store
    facilities: AtomicU64,
    /// API requests handled (monotonic)
    requests_total: AtomicU64,
    /// Requests since last report (reset on report)
    requests_since_report: AtomicU64,
    /// Request latency histogram (cumulative)
    request_latency_buckets: [AtomicU64; NUM_BUCKETS],
    /// Sum of request latencies in microseconds (cumulative)
    request_latency_sum_us: AtomicU64,
    /// Max request latency (reset on report)
    request_latency_max_us: AtomicU64,
    /// Last report time (only accessed from reporter)
    last_report_time: parking_lot::Mutex<Instant>,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            frames_total: AtomicU64::new(0),
            detections_total: AtomicU64::new(0),
            detections_uncounted_total: AtomicU64::new(0),
            ingests_total: AtomicU64::new(0),
            analyses_total: AtomicU64::new(0),
            alerts_total: std::array::from_fn(|_| AtomicU64::new(0)),
            releases_total: AtomicU64::new(0),
            occupants_released_total: AtomicU64::new(0),
            optimizations_total: AtomicU64::new(0),
            facilities: AtomicU64::new(0),
            requests_total: AtomicU64::new(0),
            requests_since_report: AtomicU64::new(0),
            request_latency_buckets: std::array::from_fn(|_| AtomicU64::new(0)),
            request_latency_sum_us: AtomicU64::new(0),
            request_latency_max_us: AtomicU64::new(0),
            last_report_time: parking_lot::Mutex::new(Instant::now()),
        }
    }

    /// Record one detection frame and how many of its detections were counted
    #[inline]
    pub fn record_frame(&self, detections: u64, uncounted: u64) {
        self.frames_total.fetch_add(1, Ordering::Relaxed);
        self.detections_total.fetch_add(detections, Ordering::Relaxed);
        self.detections_uncounted_total.fetch_add(uncounted, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_ingest(&self) {
        self.ingests_total.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_analysis(&self) {
        self.analyses_total.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_alert(&self, kind: AlertKind) {
        self.alerts_total[alert_index(kind)].fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_release(&self, released: u64) {
        self.releases_total.fetch_add(1, Ordering::Relaxed);
        self.occupants_released_total.fetch_add(released, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_optimization(&self, removed: u64) {
        self.optimizations_total.fetch_add(1, Ordering::Relaxed);
        self.occupants_released_total.fetch_add(removed, Ordering::Relaxed);
    }

    #[inline]
    pub fn set_facilities(&self, count: usize) {
        self.facilities.store(count as u64, Ordering::Relaxed);
    }

    /// Record an API request with given latency (lock-free)
    #[inline]
    pub fn record_request(&self, latency_us: u64) {
        self.requests_total.fetch_add(1, Ordering::Relaxed);
        self.requests_since_report.fetch_add(1, Ordering::Relaxed);
        self.request_latency_sum_us.fetch_add(latency_us, Ordering::Relaxed);
        self.request_latency_buckets[bucket_index(latency_us)].fetch_add(1, Ordering::Relaxed);
        update_atomic_max(&self.request_latency_max_us, latency_us);
    }

    #[inline]
    pub fn frames_total(&self) -> u64 {
        self.frames_total.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn alerts_total(&self, kind: AlertKind) -> u64 {
        self.alerts_total[alert_index(kind)].load(Ordering::Relaxed)
    }

    /// Calculate and return metrics summary, then reset periodic counters
    pub fn report(&self) -> MetricsSummary {
        let requests_count = self.requests_since_report.swap(0, Ordering::Relaxed);
        let request_latency_max_us = self.request_latency_max_us.swap(0, Ordering::Relaxed);

        let request_latency_buckets = load_buckets(&self.request_latency_buckets);
        let requests_total = self.requests_total.load(Ordering::Relaxed);
        let latency_sum = self.request_latency_sum_us.load(Ordering::Relaxed);

        let elapsed = {
            let mut last = self.last_report_time.lock();
            let elapsed = last.elapsed();
            *last = Instant::now();
            elapsed
        };

        let requests_per_sec = if elapsed.as_secs_f64() > 0.0 {
            requests_count as f64 / elapsed.as_secs_f64()
        } else {
            0.0
        };

        let request_latency_avg_us =
            if requests_total > 0 { latency_sum / requests_total } else { 0 };

        MetricsSummary {
            frames_total: self.frames_total.load(Ordering::Relaxed),
            detections_total: self.detections_total.load(Ordering::Relaxed),
            detections_uncounted_total: self.detections_uncounted_total.load(Ordering::Relaxed),
            ingests_total: self.ingests_total.load(Ordering::Relaxed),
            analyses_total: self.analyses_total.load(Ordering::Relaxed),
            alerts_total: std::array::from_fn(|i| self.alerts_total[i].load(Ordering::Relaxed)),
            releases_total: self.releases_total.load(Ordering::Relaxed),
            occupants_released_total: self.occupants_released_total.load(Ordering::Relaxed),
            optimizations_total: self.optimizations_total.load(Ordering::Relaxed),
            facilities: self.facilities.load(Ordering::Relaxed),
            requests_total,
            requests_per_sec,
            request_latency_buckets,
            request_latency_avg_us,
            request_latency_max_us,
            request_latency_p50_us: percentile_from_buckets(&request_latency_buckets, 0.50),
            request_latency_p99_us: percentile_from_buckets(&request_latency_buckets, 0.99),
        }
    }
}

/// Point-in-time metrics snapshot
#[derive(Debug, Clone)]
pub struct MetricsSummary {
    pub frames_total: u64,
    pub detections_total: u64,
    pub detections_uncounted_total: u64,
    pub ingests_total: u64,
    pub analyses_total: u64,
    /// Indexed in `ALERT_KINDS` order
    pub alerts_total: [u64; 4],
    pub releases_total: u64,
    pub occupants_released_total: u64,
    pub optimizations_total: u64,
    pub facilities: u64,
    pub requests_total: u64,
    pub requests_per_sec: f64,
    pub request_latency_buckets: [u64; NUM_BUCKETS],
    pub request_latency_avg_us: u64,
    pub request_latency_max_us: u64,
    pub request_latency_p50_us: u64,
    pub request_latency_p99_us: u64,
}

impl MetricsSummary {
    /// Log the summary as a single structured line
    pub fn log(&self) {
        info!(
            facilities = %self.facilities,
            frames_total = %self.frames_total,
            detections_total = %self.detections_total,
            uncounted_total = %self.detections_uncounted_total,
            analyses_total = %self.analyses_total,
            critical_alerts = %self.alerts_total[0],
            requests_per_sec = format!("{:.1}", self.requests_per_sec),
            p50_us = %self.request_latency_p50_us,
            p99_us = %self.request_latency_p99_us,
            max_us = %self.request_latency_max_us,
            "metrics"
        );
    }
}
