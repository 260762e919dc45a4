//! Thread-safe metrics collection
//!
//! Atomic counters for the hot path and mutex-protected collections for
//! per-kind breakdowns and processing-time samples. A single process-wide
//! collector is exposed through [`metrics()`] and served at `/metrics`.

use once_cell::sync::Lazy;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Global metrics collector instance
pub static METRICS: Lazy<MetricsCollector> = Lazy::new(MetricsCollector::new);

/// Get reference to global metrics collector
pub fn metrics() -> &'static MetricsCollector {
    &METRICS
}

/// Processing-time samples kept for percentiles
const MAX_TIMING_SAMPLES: usize = 1000;

pub struct MetricsCollector {
    // Submissions
    submissions_received: AtomicU64,
    submissions_in_flight: AtomicU64,
    submissions_completed: AtomicU64,
    submissions_failed: AtomicU64,
    max_in_flight_reached: AtomicU64,
    failures_by_kind: Mutex<BTreeMap<String, u64>>,
    decisions_by_region: Mutex<BTreeMap<String, u64>>,
    processing_times: Mutex<Vec<u64>>, // milliseconds

    // Store
    store_appends: AtomicU64,
    store_append_failures: AtomicU64,
    store_corrupt_lines: AtomicU64,

    // Lifecycle
    uptime_start: AtomicU64,
    healthy: AtomicBool,
    last_health_check: AtomicU64,
}

impl MetricsCollector {
    pub fn new() -> Self {
        let now = current_timestamp();
        Self {
            submissions_received: AtomicU64::new(0),
            submissions_in_flight: AtomicU64::new(0),
            submissions_completed: AtomicU64::new(0),
            submissions_failed: AtomicU64::new(0),
            max_in_flight_reached: AtomicU64::new(0),
            failures_by_kind: Mutex::new(BTreeMap::new()),
            decisions_by_region: Mutex::new(BTreeMap::new()),
            processing_times: Mutex::new(Vec::new()),
            store_appends: AtomicU64::new(0),
            store_append_failures: AtomicU64::new(0),
            store_corrupt_lines: AtomicU64::new(0),
            uptime_start: AtomicU64::new(now),
            healthy: AtomicBool::new(true),
            last_health_check: AtomicU64::new(now),
        }
    }

    pub fn submission_received(&self) {
        self.submissions_received.fetch_add(1, Ordering::Relaxed);
        let in_flight = self.submissions_in_flight.fetch_add(1, Ordering::Relaxed) + 1;
        self.max_in_flight_reached
            .fetch_max(in_flight, Ordering::Relaxed);
    }

    pub fn submission_completed(&self, region: &str, duration: Duration) {
        self.submissions_completed.fetch_add(1, Ordering::Relaxed);
        self.submissions_in_flight.fetch_sub(1, Ordering::Relaxed);
        increment(&self.decisions_by_region, region);
        self.record_processing_time(duration);
    }

    pub fn submission_failed(&self, kind: &str, duration: Duration) {
        self.submissions_failed.fetch_add(1, Ordering::Relaxed);
        self.submissions_in_flight.fetch_sub(1, Ordering::Relaxed);
        increment(&self.failures_by_kind, kind);
        self.record_processing_time(duration);
    }

    fn record_processing_time(&self, duration: Duration) {
        if let Ok(mut times) = self.processing_times.lock() {
            times.push(duration.as_millis() as u64);
            if times.len() > MAX_TIMING_SAMPLES {
                times.remove(0);
            }
        }
    }

    pub fn store_append(&self) {
        self.store_appends.fetch_add(1, Ordering::Relaxed);
    }

    pub fn store_append_failed(&self) {
        self.store_append_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn store_corrupt_line(&self) {
        self.store_corrupt_lines.fetch_add(1, Ordering::Relaxed);
    }

    pub fn update_health_status(&self, healthy: bool) {
        self.healthy.store(healthy, Ordering::Relaxed);
        self.last_health_check
            .store(current_timestamp(), Ordering::Relaxed);
    }

    /// Reset every counter (tests)
    pub fn reset(&self) {
        for counter in [
            &self.submissions_received,
            &self.submissions_in_flight,
            &self.submissions_completed,
            &self.submissions_failed,
            &self.max_in_flight_reached,
            &self.store_appends,
            &self.store_append_failures,
            &self.store_corrupt_lines,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
        for map in [&self.failures_by_kind, &self.decisions_by_region] {
            if let Ok(mut map) = map.lock() {
                map.clear();
            }
        }
        if let Ok(mut times) = self.processing_times.lock() {
            times.clear();
        }

        let now = current_timestamp();
        self.uptime_start.store(now, Ordering::Relaxed);
        self.healthy.store(true, Ordering::Relaxed);
        self.last_health_check.store(now, Ordering::Relaxed);
    }

    fn processing_time_statistics(&self) -> (f64, f64, f64, f64) {
        let Ok(times) = self.processing_times.lock() else {
            return (0.0, 0.0, 0.0, 0.0);
        };
        if times.is_empty() {
            return (0.0, 0.0, 0.0, 0.0);
        }

        let mut sorted = times.clone();
        sorted.sort_unstable();
        let avg = sorted.iter().sum::<u64>() as f64 / sorted.len() as f64;

        (
            avg,
            percentile(&sorted, 50.0),
            percentile(&sorted, 95.0),
            percentile(&sorted, 99.0),
        )
    }

    /// Complete metrics snapshot
    pub fn get_metrics(&self) -> MetricsSnapshot {
        let now = current_timestamp();
        let (avg, p50, p95, p99) = self.processing_time_statistics();

        MetricsSnapshot {
            submissions: SubmissionMetrics {
                received: self.submissions_received.load(Ordering::Relaxed),
                in_flight: self.submissions_in_flight.load(Ordering::Relaxed),
                completed: self.submissions_completed.load(Ordering::Relaxed),
                failed: self.submissions_failed.load(Ordering::Relaxed),
                max_in_flight_reached: self.max_in_flight_reached.load(Ordering::Relaxed),
                failures_by_kind: snapshot_map(&self.failures_by_kind),
                decisions_by_region: snapshot_map(&self.decisions_by_region),
                avg_processing_time_ms: avg,
                processing_time_p50_ms: p50,
                processing_time_p95_ms: p95,
                processing_time_p99_ms: p99,
            },
            store: StoreMetrics {
                appends: self.store_appends.load(Ordering::Relaxed),
                append_failures: self.store_append_failures.load(Ordering::Relaxed),
                corrupt_lines_skipped: self.store_corrupt_lines.load(Ordering::Relaxed),
            },
            lifecycle: LifecycleMetrics {
                uptime_seconds: now.saturating_sub(self.uptime_start.load(Ordering::Relaxed)),
                healthy: self.healthy.load(Ordering::Relaxed),
                last_health_check: self.last_health_check.load(Ordering::Relaxed),
            },
            timestamp: now,
        }
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Serialize)]
pub struct MetricsSnapshot {
    pub submissions: SubmissionMetrics,
    pub store: StoreMetrics,
    pub lifecycle: LifecycleMetrics,
    pub timestamp: u64,
}

#[derive(Debug, Serialize)]
pub struct SubmissionMetrics {
    pub received: u64,
    pub in_flight: u64,
    pub completed: u64,
    pub failed: u64,
    pub max_in_flight_reached: u64,
    pub failures_by_kind: BTreeMap<String, u64>,
    pub decisions_by_region: BTreeMap<String, u64>,
    pub avg_processing_time_ms: f64,
    pub processing_time_p50_ms: f64,
    pub processing_time_p95_ms: f64,
    pub processing_time_p99_ms: f64,
}

#[derive(Debug, Serialize)]
pub struct StoreMetrics {
    pub appends: u64,
    pub append_failures: u64,
    pub corrupt_lines_skipped: u64,
}

#[derive(Debug, Serialize)]
pub struct LifecycleMetrics {
    pub uptime_seconds: u64,
    pub healthy: bool,
    pub last_health_check: u64,
}

fn increment(map: &Mutex<BTreeMap<String, u64>>, key: &str) {
    if let Ok(mut map) = map.lock() {
        *map.entry(key.to_string()).or_insert(0) += 1;
    }
}

fn snapshot_map(map: &Mutex<BTreeMap<String, u64>>) -> BTreeMap<String, u64> {
    map.lock().map(|m| m.clone()).unwrap_or_default()
}

fn current_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

fn percentile(sorted_data: &[u64], percentile: f64) -> f64 {
    if sorted_data.is_empty() {
        return 0.0;
    }

    let index = (percentile / 100.0) * (sorted_data.len() - 1) as f64;
    let lower = sorted_data[index.floor() as usize] as f64;
    let upper = sorted_data[index.ceil() as usize] as f64;

    lower + (upper - lower) * index.fract()
}
