//! Shared health state for the /health endpoint.
//! Updated by the match handler, read by API.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// Match-serving counters. Handlers update, /health reads.
#[derive(Default)]
pub struct HealthState {
    /// Total match requests answered since startup.
    pub matches_served: AtomicU64,
    /// Nanosecond timestamp of the last served match (0 = none yet).
    pub last_match_at_ns: AtomicU64,
}

impl HealthState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_match(&self) {
        self.matches_served.fetch_add(1, Ordering::Relaxed);
        self.last_match_at_ns.store(now_ns(), Ordering::Relaxed);
    }

    pub fn matches_served(&self) -> u64 {
        self.matches_served.load(Ordering::Relaxed)
    }

    pub fn last_match_at_ns(&self) -> u64 {
        self.last_match_at_ns.load(Ordering::Relaxed)
    }
}

fn now_ns() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos() as u64
}
