//! Counters and latency histogram for security operations
//!
//! Every field is an atomic updated with Relaxed ordering. The values are
//! statistics only and never coordinate other state.

use crate::domain::types::AlarmStatus;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tracing::info;

/// Upper bounds (microseconds) of the latency buckets; the last bucket is open
const LATENCY_BOUNDS_US: [u64; 10] = [10, 25, 50, 100, 250, 500, 1_000, 2_500, 5_000, 10_000];
const NUM_BUCKETS: usize = LATENCY_BOUNDS_US.len() + 1;

#[inline]
fn bucket_index(latency_us: u64) -> usize {
    LATENCY_BOUNDS_US.partition_point(|&bound| bound < latency_us)
}

/// Upper bound reported for a bucket (open bucket reports twice the last bound)
fn bucket_ceiling(index: usize) -> u64 {
    LATENCY_BOUNDS_US.get(index).copied().unwrap_or(LATENCY_BOUNDS_US[NUM_BUCKETS - 2] * 2)
}

/// Percentile estimate: ceiling of the bucket where the cumulative count reaches it
fn percentile_from_buckets(buckets: &[u64; NUM_BUCKETS], percentile: f64) -> u64 {
    let total: u64 = buckets.iter().sum();
    if total == 0 {
        return 0;
    }

    let target = (total as f64 * percentile).ceil() as u64;
    let mut seen = 0u64;
    for (index, &count) in buckets.iter().enumerate() {
        seen += count;
        if seen >= target {
            return bucket_ceiling(index);
        }
    }
    bucket_ceiling(NUM_BUCKETS - 1)
}

/// Security operation metrics
///
/// `report()` swaps the periodic counters to zero; `_total` counters are never reset.
pub struct Metrics {
    /// Sensor activation changes processed (monotonic)
    sensor_events_total: AtomicU64,
    /// Arming status changes processed (monotonic)
    arming_changes_total: AtomicU64,
    /// Images submitted to the detector (monotonic)
    images_total: AtomicU64,
    /// Images in which a cat was detected (monotonic)
    cats_detected_total: AtomicU64,
    /// Transitions into PENDING_ALARM (monotonic)
    pending_alarms_total: AtomicU64,
    /// Transitions into ALARM (monotonic)
    alarms_total: AtomicU64,
    /// Transitions back to NO_ALARM (monotonic)
    alarm_clears_total: AtomicU64,
    /// Operations that returned an error (monotonic)
    operations_failed_total: AtomicU64,
    /// Operations since last report (reset on report)
    operations_since_report: AtomicU64,
    /// Sum of operation latencies in microseconds (reset on report)
    latency_sum_us: AtomicU64,
    /// Max operation latency in microseconds (reset on report)
    latency_max_us: AtomicU64,
    /// Operation latency histogram buckets (reset on report)
    latency_buckets: [AtomicU64; NUM_BUCKETS],
    /// Last report time (only accessed from reporter)
    last_report_time: parking_lot::Mutex<Instant>,
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            sensor_events_total: AtomicU64::new(0),
            arming_changes_total: AtomicU64::new(0),
            images_total: AtomicU64::new(0),
            cats_detected_total: AtomicU64::new(0),
            pending_alarms_total: AtomicU64::new(0),
            alarms_total: AtomicU64::new(0),
            alarm_clears_total: AtomicU64::new(0),
            operations_failed_total: AtomicU64::new(0),
            operations_since_report: AtomicU64::new(0),
            latency_sum_us: AtomicU64::new(0),
            latency_max_us: AtomicU64::new(0),
            latency_buckets: std::array::from_fn(|_| AtomicU64::new(0)),
            last_report_time: parking_lot::Mutex::new(Instant::now()),
        }
    }

    #[inline]
    pub fn record_sensor_event(&self) {
        self.sensor_events_total.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_arming_change(&self) {
        self.arming_changes_total.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_image(&self, contains_cat: bool) {
        self.images_total.fetch_add(1, Ordering::Relaxed);
        if contains_cat {
            self.cats_detected_total.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Record a write of a new alarm status
    #[inline]
    pub fn record_alarm_transition(&self, status: AlarmStatus) {
        let counter = match status {
            AlarmStatus::NoAlarm => &self.alarm_clears_total,
            AlarmStatus::PendingAlarm => &self.pending_alarms_total,
            AlarmStatus::Alarm => &self.alarms_total,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_operation_failed(&self) {
        self.operations_failed_total.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a completed operation and its latency
    #[inline]
    pub fn record_operation(&self, latency_us: u64) {
        self.operations_since_report.fetch_add(1, Ordering::Relaxed);
        self.latency_sum_us.fetch_add(latency_us, Ordering::Relaxed);
        self.latency_max_us.fetch_max(latency_us, Ordering::Relaxed);
        self.latency_buckets[bucket_index(latency_us)].fetch_add(1, Ordering::Relaxed);
    }

    pub fn sensor_events_total(&self) -> u64 {
        self.sensor_events_total.load(Ordering::Relaxed)
    }

    pub fn alarms_total(&self) -> u64 {
        self.alarms_total.load(Ordering::Relaxed)
    }

    /// Build a summary and reset the periodic counters
    pub fn report(&self) -> MetricsSummary {
        let now = Instant::now();
        let elapsed_secs = {
            let mut last = self.last_report_time.lock();
            let elapsed = now.duration_since(*last).as_secs_f64();
            *last = now;
            elapsed
        };

        let operations = self.operations_since_report.swap(0, Ordering::Relaxed);
        let latency_sum = self.latency_sum_us.swap(0, Ordering::Relaxed);
        let latency_max = self.latency_max_us.swap(0, Ordering::Relaxed);
        let buckets: [u64; NUM_BUCKETS] =
            std::array::from_fn(|i| self.latency_buckets[i].swap(0, Ordering::Relaxed));

        let avg_latency_us = if operations > 0 { latency_sum / operations } else { 0 };
        let operations_per_sec =
            if elapsed_secs > 0.0 { operations as f64 / elapsed_secs } else { 0.0 };

        MetricsSummary {
            sensor_events_total: self.sensor_events_total.load(Ordering::Relaxed),
            arming_changes_total: self.arming_changes_total.load(Ordering::Relaxed),
            images_total: self.images_total.load(Ordering::Relaxed),
            cats_detected_total: self.cats_detected_total.load(Ordering::Relaxed),
            pending_alarms_total: self.pending_alarms_total.load(Ordering::Relaxed),
            alarms_total: self.alarms_total.load(Ordering::Relaxed),
            alarm_clears_total: self.alarm_clears_total.load(Ordering::Relaxed),
            operations_failed_total: self.operations_failed_total.load(Ordering::Relaxed),
            operations,
            operations_per_sec,
            avg_latency_us,
            max_latency_us: latency_max,
            lat_p50_us: percentile_from_buckets(&buckets, 0.50),
            lat_p99_us: percentile_from_buckets(&buckets, 0.99),
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
    pub sensor_events_total: u64,
    pub arming_changes_total: u64,
    pub images_total: u64,
    pub cats_detected_total: u64,
    pub pending_alarms_total: u64,
    pub alarms_total: u64,
    pub alarm_clears_total: u64,
    pub operations_failed_total: u64,
    pub operations: u64,
    pub operations_per_sec: f64,
    pub avg_latency_us: u64,
    pub max_latency_us: u64,
    pub lat_p50_us: u64,
    pub lat_p99_us: u64,
}

impl MetricsSummary {
    pub fn log(&self) {
        info!(
            sensor_events = %self.sensor_events_total,
            arming_changes = %self.arming_changes_total,
            images = %self.images_total,
            cats_detected = %self.cats_detected_total,
            pending_alarms = %self.pending_alarms_total,
            alarms = %self.alarms_total,
            alarm_clears = %self.alarm_clears_total,
            failed = %self.operations_failed_total,
            ops_per_sec = format!("{:.1}", self.operations_per_sec),
            avg_latency_us = %self.avg_latency_us,
            max_latency_us = %self.max_latency_us,
            p50_us = %self.lat_p50_us,
            p99_us = %self.lat_p99_us,
            "metrics"
        );
    }
}
