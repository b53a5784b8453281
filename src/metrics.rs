//! Lightweight, lock-free counters for one `PositionMonitor`.
//!
//! No HTTP/Prometheus surface is exposed here (that plumbing is out of
//! scope for this core); an embedding application can read these atomics
//! directly or fold them into its own metrics registry.

use std::sync::atomic::{AtomicU64, Ordering};

/// Per-monitor counters, cache-aligned to avoid false sharing with
/// neighboring monitors' metrics in a registry's backing storage.
#[repr(C, align(64))]
#[derive(Default)]
pub struct MonitorMetrics {
    pub ticks_processed: AtomicU64,
    pub exits_all: AtomicU64,
    pub exits_leg: AtomicU64,
    pub legs_replaced: AtomicU64,
    pub replacement_failures: AtomicU64,
    pub callback_errors: AtomicU64,
}

impl MonitorMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn record_tick(&self) {
        self.ticks_processed.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_exit_all(&self) {
        self.exits_all.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_exit_leg(&self) {
        self.exits_leg.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_leg_replaced(&self) {
        self.legs_replaced.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_replacement_failure(&self) {
        self.replacement_failures.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_callback_error(&self) {
        self.callback_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MonitorMetricsSnapshot {
        MonitorMetricsSnapshot {
            ticks_processed: self.ticks_processed.load(Ordering::Relaxed),
            exits_all: self.exits_all.load(Ordering::Relaxed),
            exits_leg: self.exits_leg.load(Ordering::Relaxed),
            legs_replaced: self.legs_replaced.load(Ordering::Relaxed),
            replacement_failures: self.replacement_failures.load(Ordering::Relaxed),
            callback_errors: self.callback_errors.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time read of [`MonitorMetrics`], for status endpoints/logging.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MonitorMetricsSnapshot {
    pub ticks_processed: u64,
    pub exits_all: u64,
    pub exits_leg: u64,
    pub legs_replaced: u64,
    pub replacement_failures: u64,
    pub callback_errors: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_start_at_zero_and_accumulate() {
        let metrics = MonitorMetrics::new();
        metrics.record_tick();
        metrics.record_tick();
        metrics.record_exit_all();

        let snap = metrics.snapshot();
        assert_eq!(snap.ticks_processed, 2);
        assert_eq!(snap.exits_all, 1);
        assert_eq!(snap.exits_leg, 0);
    }
}
