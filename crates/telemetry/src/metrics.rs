//! Internal metrics collection.
//!
//! Collects counters in-memory; the poll loop logs a snapshot after each
//! cycle.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// A counter metric.
#[derive(Debug, Default)]
pub struct Counter(AtomicU64);

impl Counter {
    pub fn inc(&self) {
        self.0.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_by(&self, n: u64) {
        self.0.fetch_add(n, Ordering::Relaxed);
    }

    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }
}

/// A gauge metric (can go up or down).
#[derive(Debug, Default)]
pub struct Gauge(AtomicU64);

impl Gauge {
    pub fn set(&self, val: u64) {
        self.0.store(val, Ordering::Relaxed);
    }

    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }
}

/// Latency accumulator in milliseconds; snapshots report the mean.
#[derive(Debug, Default)]
pub struct Histogram {
    sum: AtomicU64,
    count: AtomicU64,
}

impl Histogram {
    /// Records a value in milliseconds.
    pub fn observe(&self, ms: u64) {
        self.sum.fetch_add(ms, Ordering::Relaxed);
        self.count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn count(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }

    pub fn sum(&self) -> u64 {
        self.sum.load(Ordering::Relaxed)
    }

    pub fn mean(&self) -> f64 {
        let count = self.count();
        if count == 0 {
            0.0
        } else {
            self.sum() as f64 / count as f64
        }
    }
}

/// Collected metrics for the collector.
#[derive(Debug, Default)]
pub struct Metrics {
    // Polling metrics
    pub cycles_completed: Counter,
    pub host_fetch_errors: Counter,
    pub sessions_started: Counter,
    pub sessions_ended: Counter,

    // Library metrics
    pub library_runs: Counter,
    pub library_section_errors: Counter,

    // Sink metrics
    pub points_written: Counter,
    pub batches_written: Counter,
    pub sink_write_errors: Counter,
    pub batches_dropped: Counter,
    pub databases_created: Counter,

    // Latency histograms
    pub cycle_latency_ms: Histogram,
    pub sink_latency_ms: Histogram,

    // Gauges
    pub active_streams: Gauge,
    pub tracked_sessions: Gauge,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }
}

/// A snapshot of metrics at a point in time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub timestamp: DateTime<Utc>,
    pub cycles_completed: u64,
    pub host_fetch_errors: u64,
    pub sessions_started: u64,
    pub sessions_ended: u64,
    pub library_runs: u64,
    pub library_section_errors: u64,
    pub points_written: u64,
    pub batches_written: u64,
    pub sink_write_errors: u64,
    pub batches_dropped: u64,
    pub databases_created: u64,
    pub cycle_latency_mean_ms: f64,
    pub sink_latency_mean_ms: f64,
    pub active_streams: u64,
    pub tracked_sessions: u64,
}

impl Metrics {
    /// Takes a snapshot of current metrics.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            timestamp: Utc::now(),
            cycles_completed: self.cycles_completed.get(),
            host_fetch_errors: self.host_fetch_errors.get(),
            sessions_started: self.sessions_started.get(),
            sessions_ended: self.sessions_ended.get(),
            library_runs: self.library_runs.get(),
            library_section_errors: self.library_section_errors.get(),
            points_written: self.points_written.get(),
            batches_written: self.batches_written.get(),
            sink_write_errors: self.sink_write_errors.get(),
            batches_dropped: self.batches_dropped.get(),
            databases_created: self.databases_created.get(),
            cycle_latency_mean_ms: self.cycle_latency_ms.mean(),
            sink_latency_mean_ms: self.sink_latency_ms.mean(),
            active_streams: self.active_streams.get(),
            tracked_sessions: self.tracked_sessions.get(),
        }
    }
}

/// Global metrics registry.
pub static METRICS: std::sync::LazyLock<Metrics> = std::sync::LazyLock::new(Metrics::new);

/// Get the global metrics instance.
pub fn metrics() -> &'static Metrics {
    &METRICS
}
