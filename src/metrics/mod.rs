use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Counters for the outcomes of the two live-update loops.
///
/// Cheap to clone; all clones share the same counters.
#[derive(Clone, Default)]
pub struct ReconcileMetrics {
    inner: Arc<Counters>,
}

#[derive(Default)]
struct Counters {
    telemetry_applied: AtomicU64,
    telemetry_stale: AtomicU64,
    telemetry_not_found: AtomicU64,
    telemetry_discarded: AtomicU64,
    polls_succeeded: AtomicU64,
    polls_failed: AtomicU64,
    trails_updated: AtomicU64,
    trail_records_skipped: AtomicU64,
}

impl ReconcileMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_telemetry_applied(&self) {
        self.inner.telemetry_applied.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_telemetry_stale(&self) {
        self.inner.telemetry_stale.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_telemetry_not_found(&self) {
        self.inner.telemetry_not_found.fetch_add(1, Ordering::Relaxed);
    }

    /// Undecodable payload or missing timestamp
    pub fn record_telemetry_discarded(&self) {
        self.inner.telemetry_discarded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_poll_succeeded(&self) {
        self.inner.polls_succeeded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_poll_failed(&self) {
        self.inner.polls_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_trail_updated(&self) {
        self.inner.trails_updated.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_trail_record_skipped(&self) {
        self.inner.trail_records_skipped.fetch_add(1, Ordering::Relaxed);
    }

    /// Get snapshot of all counters
    pub fn snapshot(&self) -> MetricsSnapshot {
        let c = &self.inner;
        MetricsSnapshot {
            telemetry_applied: c.telemetry_applied.load(Ordering::Relaxed),
            telemetry_stale: c.telemetry_stale.load(Ordering::Relaxed),
            telemetry_not_found: c.telemetry_not_found.load(Ordering::Relaxed),
            telemetry_discarded: c.telemetry_discarded.load(Ordering::Relaxed),
            polls_succeeded: c.polls_succeeded.load(Ordering::Relaxed),
            polls_failed: c.polls_failed.load(Ordering::Relaxed),
            trails_updated: c.trails_updated.load(Ordering::Relaxed),
            trail_records_skipped: c.trail_records_skipped.load(Ordering::Relaxed),
        }
    }
}

/// Snapshot of counters at a point in time
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsSnapshot {
    pub telemetry_applied: u64,
    pub telemetry_stale: u64,
    pub telemetry_not_found: u64,
    pub telemetry_discarded: u64,
    pub polls_succeeded: u64,
    pub polls_failed: u64,
    pub trails_updated: u64,
    pub trail_records_skipped: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_metrics_are_zero() {
        assert_eq!(ReconcileMetrics::new().snapshot(), MetricsSnapshot::default());
    }

    #[test]
    fn test_clones_share_counters() {
        let metrics = ReconcileMetrics::new();
        let clone = metrics.clone();

        clone.record_telemetry_applied();
        clone.record_telemetry_stale();
        metrics.record_telemetry_stale();
        metrics.record_poll_failed();

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.telemetry_applied, 1);
        assert_eq!(snapshot.telemetry_stale, 2);
        assert_eq!(snapshot.polls_failed, 1);
        assert_eq!(snapshot.polls_succeeded, 0);
    }
}
