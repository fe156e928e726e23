use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

/// Counters shared by the refresh loop and the sample streamer
#[derive(Debug, Default)]
pub struct DashboardMetrics {
    fetches: AtomicU64,
    fetch_errors: AtomicU64,
    samples_inserted: AtomicU64,
    batches_started: AtomicU64,
    batches_queued: AtomicU64,
    batches_dropped: AtomicU64,
    total_fetch_latency_us: AtomicU64,
    fetch_latency_samples: AtomicU64,
}

impl DashboardMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fetches(&self) -> u64 {
        self.fetches.load(Ordering::Relaxed)
    }

    pub fn fetch_errors(&self) -> u64 {
        self.fetch_errors.load(Ordering::Relaxed)
    }

    pub fn samples_inserted(&self) -> u64 {
        self.samples_inserted.load(Ordering::Relaxed)
    }

    pub fn batches_started(&self) -> u64 {
        self.batches_started.load(Ordering::Relaxed)
    }

    pub fn batches_queued(&self) -> u64 {
        self.batches_queued.load(Ordering::Relaxed)
    }

    pub fn batches_dropped(&self) -> u64 {
        self.batches_dropped.load(Ordering::Relaxed)
    }

    pub fn record_fetch_error(&self) {
        self.fetch_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_sample_inserted(&self) {
        self.samples_inserted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_batch_started(&self) {
        self.batches_started.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_batch_queued(&self) {
        self.batches_queued.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_batch_dropped(&self) {
        self.batches_dropped.fetch_add(1, Ordering::Relaxed);
    }

    /// Counts the fetch and starts its latency measurement
    pub fn start_fetch(&self) -> Instant {
        self.fetches.fetch_add(1, Ordering::Relaxed);
        Instant::now()
    }

    pub fn finish_fetch(&self, start: Instant) {
        let latency_us = start.elapsed().as_micros() as u64;
        self.total_fetch_latency_us.fetch_add(latency_us, Ordering::Relaxed);
        self.fetch_latency_samples.fetch_add(1, Ordering::Relaxed);
    }

    pub fn avg_fetch_latency_us(&self) -> u64 {
        let samples = self.fetch_latency_samples.load(Ordering::Relaxed);
        if samples == 0 {
            return 0;
        }
        self.total_fetch_latency_us.load(Ordering::Relaxed) / samples
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            fetches: self.fetches(),
            fetch_errors: self.fetch_errors(),
            samples_inserted: self.samples_inserted(),
            batches_started: self.batches_started(),
            batches_queued: self.batches_queued(),
            batches_dropped: self.batches_dropped(),
            avg_fetch_latency_us: self.avg_fetch_latency_us(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub fetches: u64,
    pub fetch_errors: u64,
    pub samples_inserted: u64,
    pub batches_started: u64,
    pub batches_queued: u64,
    pub batches_dropped: u64,
    pub avg_fetch_latency_us: u64,
}
