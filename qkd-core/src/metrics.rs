// SPDX-License-Identifier: MIT
//
// QKD Entropy Engine
// Quantum key material as a random-byte source

//! Metrics collection and reporting

use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Counters shared between a provider and whoever observes it
#[derive(Clone)]
pub struct Metrics {
    inner: Arc<MetricsInner>,
}

struct MetricsInner {
    start_time: Instant,

    sessions_opened: AtomicU64,

    // Byte request metrics
    requests_total: AtomicU64,
    requests_failed: AtomicU64,
    bytes_served: AtomicU64,

    // Key fetch metrics
    fetches_total: AtomicU64,
    fetches_failed: AtomicU64,
    bytes_fetched: AtomicU64,

    // Request latency tracking (microseconds)
    request_latencies: RwLock<Vec<u64>>,
}

/// Point-in-time view of the counters
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub uptime_seconds: u64,
    pub sessions_opened: u64,
    pub requests_total: u64,
    pub requests_failed: u64,
    pub bytes_served: u64,
    pub fetches_total: u64,
    pub fetches_failed: u64,
    pub bytes_fetched: u64,
    pub avg_request_latency_micros: u64,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(MetricsInner {
                start_time: Instant::now(),
                sessions_opened: AtomicU64::new(0),
                requests_total: AtomicU64::new(0),
                requests_failed: AtomicU64::new(0),
                bytes_served: AtomicU64::new(0),
                fetches_total: AtomicU64::new(0),
                fetches_failed: AtomicU64::new(0),
                bytes_fetched: AtomicU64::new(0),
                request_latencies: RwLock::new(Vec::with_capacity(1024)),
            }),
        }
    }

    pub fn record_session_open(&self) {
        self.inner.sessions_opened.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_request(&self, bytes: usize, latency_micros: u64) {
        self.inner.requests_total.fetch_add(1, Ordering::Relaxed);
        self.inner
            .bytes_served
            .fetch_add(bytes as u64, Ordering::Relaxed);

        let mut latencies = self.inner.request_latencies.write();
        latencies.push(latency_micros);
        if latencies.len() > 10_000 {
            latencies.drain(0..5_000);
        }
    }

    pub fn record_request_failure(&self) {
        self.inner.requests_total.fetch_add(1, Ordering::Relaxed);
        self.inner.requests_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_fetch(&self, bytes: usize) {
        self.inner.fetches_total.fetch_add(1, Ordering::Relaxed);
        self.inner
            .bytes_fetched
            .fetch_add(bytes as u64, Ordering::Relaxed);
    }

    pub fn record_fetch_failure(&self) {
        self.inner.fetches_total.fetch_add(1, Ordering::Relaxed);
        self.inner.fetches_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let latencies = self.inner.request_latencies.read();
        let avg = if latencies.is_empty() {
            0
        } else {
            latencies.iter().sum::<u64>() / latencies.len() as u64
        };

        MetricsSnapshot {
            uptime_seconds: self.inner.start_time.elapsed().as_secs(),
            sessions_opened: self.inner.sessions_opened.load(Ordering::Relaxed),
            requests_total: self.inner.requests_total.load(Ordering::Relaxed),
            requests_failed: self.inner.requests_failed.load(Ordering::Relaxed),
            bytes_served: self.inner.bytes_served.load(Ordering::Relaxed),
            fetches_total: self.inner.fetches_total.load(Ordering::Relaxed),
            fetches_failed: self.inner.fetches_failed.load(Ordering::Relaxed),
            bytes_fetched: self.inner.bytes_fetched.load(Ordering::Relaxed),
            avg_request_latency_micros: avg,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters() {
        let metrics = Metrics::new();
        metrics.record_session_open();
        metrics.record_fetch(256);
        metrics.record_fetch(256);
        metrics.record_fetch_failure();
        metrics.record_request(48, 1_200);
        metrics.record_request_failure();

        let snap = metrics.snapshot();
        assert_eq!(snap.sessions_opened, 1);
        assert_eq!(snap.fetches_total, 3);
        assert_eq!(snap.fetches_failed, 1);
        assert_eq!(snap.bytes_fetched, 512);
        assert_eq!(snap.requests_total, 2);
        assert_eq!(snap.requests_failed, 1);
        assert_eq!(snap.bytes_served, 48);
        assert_eq!(snap.avg_request_latency_micros, 1_200);
    }

    #[test]
    fn test_snapshot_of_fresh_metrics() {
        let snap = Metrics::new().snapshot();
        assert_eq!(snap.requests_total, 0);
        assert_eq!(snap.avg_request_latency_micros, 0);
    }
}
