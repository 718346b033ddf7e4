//! Per-sink write counters

use std::sync::atomic::{AtomicU64, Ordering};

/// Counters for a single sink
#[derive(Debug, Default)]
pub struct SinkMetrics {
    /// Rows written
    write_count: AtomicU64,
    /// Writes that surfaced an error
    failure_count: AtomicU64,
    /// Accumulated write latency (microseconds)
    write_micros: AtomicU64,
}

impl SinkMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn write_count(&self) -> u64 {
        self.write_count.load(Ordering::Relaxed)
    }

    pub fn inc_write_count(&self) {
        self.write_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn failure_count(&self) -> u64 {
        self.failure_count.load(Ordering::Relaxed)
    }

    pub fn inc_failure_count(&self) {
        self.failure_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_write_micros(&self, micros: u64) {
        self.write_micros.fetch_add(micros, Ordering::Relaxed);
    }

    /// Get snapshot of all counters
    pub fn snapshot(&self) -> MetricsSnapshot {
        let writes = self.write_count();
        let failures = self.failure_count();
        let attempts = writes + failures;
        let micros = self.write_micros.load(Ordering::Relaxed);
        MetricsSnapshot {
            write_count: writes,
            failure_count: failures,
            mean_write_ms: if attempts > 0 {
                micros as f64 / attempts as f64 / 1000.0
            } else {
                0.0
            },
        }
    }
}

/// Snapshot of sink counters (for reporting)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MetricsSnapshot {
    pub write_count: u64,
    pub failure_count: u64,
    pub mean_write_ms: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_mean_latency() {
        let metrics = SinkMetrics::new();
        assert_eq!(metrics.snapshot().mean_write_ms, 0.0);

        metrics.inc_write_count();
        metrics.inc_failure_count();
        metrics.add_write_micros(4_000);

        let snap = metrics.snapshot();
        assert_eq!(snap.write_count, 1);
        assert_eq!(snap.failure_count, 1);
        assert_eq!(snap.mean_write_ms, 2.0);
    }
}
