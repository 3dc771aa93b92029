//! Lock-free metrics collection and periodic reporting
//!
//! Uses atomics for hot-path operations to avoid mutex contention.
//! Counters are monotonic; only the latency histogram window is reset by
//! `report()`.
//!
//! NOTE: All atomics use Relaxed ordering intentionally. These are statistical
//! counters only and must not drive any logic.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tracing::info;

/// Subscribe latency bucket boundaries (milliseconds)
/// Buckets: ≤25, ≤50, ≤100, ≤200, ≤400, ≤800, ≤1600, ≤3200, ≤6400, ≤12800, >12800
pub const METRICS_BUCKET_BOUNDS: [u64; 10] = [25, 50, 100, 200, 400, 800, 1600, 3200, 6400, 12800];
pub const METRICS_NUM_BUCKETS: usize = 11;

#[inline]
fn bucket_index(latency_ms: u64) -> usize {
    METRICS_BUCKET_BOUNDS.partition_point(|&bound| bound < latency_ms)
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

#[inline]
fn swap_buckets(buckets: &[AtomicU64; METRICS_NUM_BUCKETS]) -> [u64; METRICS_NUM_BUCKETS] {
    let mut result = [0u64; METRICS_NUM_BUCKETS];
    for (i, bucket) in buckets.iter().enumerate() {
        result[i] = bucket.swap(0, Ordering::Relaxed);
    }
    result
}

/// Compute percentile from histogram buckets
/// Returns the upper bound of the bucket containing the percentile
fn percentile_from_buckets(buckets: &[u64; METRICS_NUM_BUCKETS], percentile: f64) -> u64 {
    let total: u64 = buckets.iter().sum();
    if total == 0 {
        return 0;
    }

    let target = ((total as f64 * percentile).ceil() as u64).max(1);
    let mut cumulative = 0u64;

    const BUCKET_UPPER_BOUNDS: [u64; METRICS_NUM_BUCKETS] =
        [25, 50, 100, 200, 400, 800, 1600, 3200, 6400, 12800, 25600];

    for (i, &count) in buckets.iter().enumerate() {
        cumulative += count;
        if cumulative >= target {
            return BUCKET_UPPER_BOUNDS[i];
        }
    }
    BUCKET_UPPER_BOUNDS[METRICS_NUM_BUCKETS - 1]
}

/// How a subscribe attempt ended, for counting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscribeOutcome {
    Inserted,
    Duplicate,
    Rejected,
    NetworkError,
}

/// Lock-free metrics collector
pub struct Metrics {
    subscribe_attempts: AtomicU64,
    subscribe_inserted: AtomicU64,
    subscribe_duplicate: AtomicU64,
    subscribe_rejected: AtomicU64,
    subscribe_network_errors: AtomicU64,
    /// Subscribe latency histogram (reset on report)
    subscribe_latency_buckets: [AtomicU64; METRICS_NUM_BUCKETS],
    subscribe_latency_sum_ms: AtomicU64,
    subscribe_latency_max_ms: AtomicU64,
    sessions_created: AtomicU64,
    sessions_expired: AtomicU64,
    sessions_rejected: AtomicU64,
    sessions_active: AtomicU64,
    demo_actions: AtomicU64,
    demo_actions_ignored: AtomicU64,
    timers_cancelled: AtomicU64,
    started_at: Instant,
    last_report: parking_lot::Mutex<Instant>,
}

impl Metrics {
    pub fn new() -> Self {
        let now = Instant::now();
        Self {
            subscribe_attempts: AtomicU64::new(0),
            subscribe_inserted: AtomicU64::new(0),
            subscribe_duplicate: AtomicU64::new(0),
            subscribe_rejected: AtomicU64::new(0),
            subscribe_network_errors: AtomicU64::new(0),
            subscribe_latency_buckets: Default::default(),
            subscribe_latency_sum_ms: AtomicU64::new(0),
            subscribe_latency_max_ms: AtomicU64::new(0),
            sessions_created: AtomicU64::new(0),
            sessions_expired: AtomicU64::new(0),
            sessions_rejected: AtomicU64::new(0),
            sessions_active: AtomicU64::new(0),
            demo_actions: AtomicU64::new(0),
            demo_actions_ignored: AtomicU64::new(0),
            timers_cancelled: AtomicU64::new(0),
            started_at: now,
            last_report: parking_lot::Mutex::new(now),
        }
    }

    /// Record one subscribe call and its round-trip latency
    pub fn record_subscribe(&self, outcome: SubscribeOutcome, latency_ms: u64) {
        self.subscribe_attempts.fetch_add(1, Ordering::Relaxed);
        let counter = match outcome {
            SubscribeOutcome::Inserted => &self.subscribe_inserted,
            SubscribeOutcome::Duplicate => &self.subscribe_duplicate,
            SubscribeOutcome::Rejected => &self.subscribe_rejected,
            SubscribeOutcome::NetworkError => &self.subscribe_network_errors,
        };
        counter.fetch_add(1, Ordering::Relaxed);

        self.subscribe_latency_buckets[bucket_index(latency_ms)].fetch_add(1, Ordering::Relaxed);
        self.subscribe_latency_sum_ms.fetch_add(latency_ms, Ordering::Relaxed);
        update_atomic_max(&self.subscribe_latency_max_ms, latency_ms);
    }

    pub fn record_session_created(&self) {
        self.sessions_created.fetch_add(1, Ordering::Relaxed);
        self.sessions_active.fetch_add(1, Ordering::Relaxed);
    }

    /// A session was torn down (expired or closed by the visitor)
    pub fn record_session_closed(&self, expired: bool, timers_cancelled: usize) {
        if expired {
            self.sessions_expired.fetch_add(1, Ordering::Relaxed);
        }
        // Saturate instead of wrapping if a close is ever double-counted
        let _ = self
            .sessions_active
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |v| Some(v.saturating_sub(1)));
        self.timers_cancelled.fetch_add(timers_cancelled as u64, Ordering::Relaxed);
    }

    pub fn record_session_rejected(&self) {
        self.sessions_rejected.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a widget action; `accepted` is false when a guard ignored it
    pub fn record_demo_action(&self, accepted: bool) {
        self.demo_actions.fetch_add(1, Ordering::Relaxed);
        if !accepted {
            self.demo_actions_ignored.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn subscribe_attempts(&self) -> u64 {
        self.subscribe_attempts.load(Ordering::Relaxed)
    }

    pub fn sessions_active(&self) -> u64 {
        self.sessions_active.load(Ordering::Relaxed)
    }

    pub fn demo_actions_ignored(&self) -> u64 {
        self.demo_actions_ignored.load(Ordering::Relaxed)
    }

    /// Snapshot all counters and reset the latency window
    pub fn report(&self) -> MetricsSummary {
        let now = Instant::now();
        let window_secs = {
            let mut last = self.last_report.lock();
            let elapsed = now.duration_since(*last).as_secs_f64();
            *last = now;
            elapsed
        };

        let buckets = swap_buckets(&self.subscribe_latency_buckets);
        let window_count: u64 = buckets.iter().sum();
        let sum_ms = self.subscribe_latency_sum_ms.swap(0, Ordering::Relaxed);
        let max_ms = self.subscribe_latency_max_ms.swap(0, Ordering::Relaxed);

        MetricsSummary {
            uptime_secs: now.duration_since(self.started_at).as_secs(),
            window_secs,
            subscribe_attempts: self.subscribe_attempts.load(Ordering::Relaxed),
            subscribe_inserted: self.subscribe_inserted.load(Ordering::Relaxed),
            subscribe_duplicate: self.subscribe_duplicate.load(Ordering::Relaxed),
            subscribe_rejected: self.subscribe_rejected.load(Ordering::Relaxed),
            subscribe_network_errors: self.subscribe_network_errors.load(Ordering::Relaxed),
            subscribe_lat_buckets: buckets,
            subscribe_lat_avg_ms: if window_count > 0 { sum_ms / window_count } else { 0 },
            subscribe_lat_p50_ms: percentile_from_buckets(&buckets, 0.50),
            subscribe_lat_p99_ms: percentile_from_buckets(&buckets, 0.99),
            subscribe_lat_max_ms: max_ms,
            sessions_created: self.sessions_created.load(Ordering::Relaxed),
            sessions_expired: self.sessions_expired.load(Ordering::Relaxed),
            sessions_rejected: self.sessions_rejected.load(Ordering::Relaxed),
            sessions_active: self.sessions_active.load(Ordering::Relaxed),
            demo_actions: self.demo_actions.load(Ordering::Relaxed),
            demo_actions_ignored: self.demo_actions_ignored.load(Ordering::Relaxed),
            timers_cancelled: self.timers_cancelled.load(Ordering::Relaxed),
        }
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Point-in-time metrics snapshot
#[derive(Debug, Clone)]
pub struct MetricsSummary {
    pub uptime_secs: u64,
    pub window_secs: f64,
    pub subscribe_attempts: u64,
    pub subscribe_inserted: u64,
    pub subscribe_duplicate: u64,
    pub subscribe_rejected: u64,
    pub subscribe_network_errors: u64,
    pub subscribe_lat_buckets: [u64; METRICS_NUM_BUCKETS],
    pub subscribe_lat_avg_ms: u64,
    pub subscribe_lat_p50_ms: u64,
    pub subscribe_lat_p99_ms: u64,
    pub subscribe_lat_max_ms: u64,
    pub sessions_created: u64,
    pub sessions_expired: u64,
    pub sessions_rejected: u64,
    pub sessions_active: u64,
    pub demo_actions: u64,
    pub demo_actions_ignored: u64,
    pub timers_cancelled: u64,
}

impl MetricsSummary {
    pub fn log(&self) {
        info!(
            uptime_secs = %self.uptime_secs,
            sessions_active = %self.sessions_active,
            sessions_created = %self.sessions_created,
            sessions_expired = %self.sessions_expired,
            demo_actions = %self.demo_actions,
            demo_actions_ignored = %self.demo_actions_ignored,
            subscribe_attempts = %self.subscribe_attempts,
            subscribe_inserted = %self.subscribe_inserted,
            subscribe_duplicate = %self.subscribe_duplicate,
            subscribe_failed = %(self.subscribe_rejected + self.subscribe_network_errors),
            subscribe_lat_p99_ms = %self.subscribe_lat_p99_ms,
            "metrics"
        );
    }
}
