//! In-memory latency histogram for match-pipeline instrumentation.
//! Records time from offer receipt to scored response in the match handler.

use std::sync::Mutex;
use std::time::Duration;

use serde::Serialize;

/// Shared latency stats. The match handler records, /stats/latency reads.
/// Samples are stored in microseconds.
pub struct LatencyStats {
    inner: Mutex<hdrhistogram::Histogram<u64>>,
}

/// Point-in-time percentile readout in milliseconds.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct LatencySnapshot {
    pub samples: u64,
    pub p50_ms: Option<f64>,
    pub p95_ms: Option<f64>,
    pub p99_ms: Option<f64>,
}

impl LatencyStats {
    /// Create a new histogram. Tracks 1us to 100s, 3 significant figures.
    pub fn new() -> Self {
        let histogram = hdrhistogram::Histogram::new_with_bounds(1, 100_000_000, 3)
            .expect("valid histogram bounds");
        Self {
            inner: Mutex::new(histogram),
        }
    }

    /// Record one pipeline duration. Scoring a small candidate set can run
    /// under a microsecond; those clamp up to the 1us floor instead of being
    /// dropped.
    pub fn record(&self, d: Duration) {
        let us = d.as_micros().clamp(1, u128::from(u64::MAX)) as u64;
        if let Ok(mut h) = self.inner.lock() {
            let _ = h.record(us);
        }
    }

    pub fn snapshot(&self) -> LatencySnapshot {
        let Ok(h) = self.inner.lock() else {
            return LatencySnapshot {
                samples: 0,
                p50_ms: None,
                p95_ms: None,
                p99_ms: None,
            };
        };
        if h.len() == 0 {
            return LatencySnapshot {
                samples: 0,
                p50_ms: None,
                p95_ms: None,
                p99_ms: None,
            };
        }
        LatencySnapshot {
            samples: h.len(),
            p50_ms: Some(h.value_at_quantile(0.5) as f64 / 1000.0),
            p95_ms: Some(h.value_at_quantile(0.95) as f64 / 1000.0),
            p99_ms: Some(h.value_at_quantile(0.99) as f64 / 1000.0),
        }
    }
}

impl Default for LatencyStats {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_histogram_reports_no_percentiles() {
        let stats = LatencyStats::new();
        let snap = stats.snapshot();
        assert_eq!(snap.samples, 0);
        assert!(snap.p50_ms.is_none());
    }

    #[test]
    fn percentiles_track_recorded_durations() {
        let stats = LatencyStats::new();
        for ms in [1u64, 2, 3, 4, 100] {
            stats.record(Duration::from_millis(ms));
        }
        let snap = stats.snapshot();
        assert_eq!(snap.samples, 5);
        let p50 = snap.p50_ms.unwrap();
        let p99 = snap.p99_ms.unwrap();
        assert!(p50 >= 2.0 && p50 <= 4.0, "p50 was {p50}");
        assert!(p99 >= 90.0, "p99 was {p99}");
        assert!(snap.p95_ms.unwrap() <= p99);
    }

    #[test]
    fn sub_microsecond_samples_clamp_to_floor() {
        let stats = LatencyStats::new();
        stats.record(Duration::from_nanos(10));
        assert_eq!(stats.snapshot().samples, 1);
    }
}
