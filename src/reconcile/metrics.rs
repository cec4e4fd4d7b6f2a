//! Reconciliation-wide conflict counters. Shared via `Arc`
//! between the live ingester and the backfill worker, since both run
//! reconciliation through the same engine.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use chrono::{DateTime, Utc};

use super::Preferred;

#[derive(Default)]
pub struct ReconciliationMetrics {
    total_reconciliations: AtomicU64,
    conflicts: AtomicU64,
    primary_preferred: AtomicU64,
    fast_preferred: AtomicU64,
    last_reconciliation: Mutex<Option<DateTime<Utc>>>,
}

impl ReconciliationMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, preferred: Preferred, conflict: bool) {
        self.total_reconciliations.fetch_add(1, Ordering::Relaxed);
        if conflict {
            self.conflicts.fetch_add(1, Ordering::Relaxed);
        }
        match preferred {
            Preferred::Primary => self.primary_preferred.fetch_add(1, Ordering::Relaxed),
            Preferred::Fast => self.fast_preferred.fetch_add(1, Ordering::Relaxed),
        };
        *self.last_reconciliation.lock().unwrap() = Some(Utc::now());
    }

    pub fn snapshot(&self) -> ReconciliationSnapshot {
        ReconciliationSnapshot {
            total_reconciliations: self.total_reconciliations.load(Ordering::Relaxed),
            conflicts: self.conflicts.load(Ordering::Relaxed),
            primary_preferred: self.primary_preferred.load(Ordering::Relaxed),
            fast_preferred: self.fast_preferred.load(Ordering::Relaxed),
            last_reconciliation: *self.last_reconciliation.lock().unwrap(),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ReconciliationSnapshot {
    pub total_reconciliations: u64,
    pub conflicts: u64,
    pub primary_preferred: u64,
    pub fast_preferred: u64,
    pub last_reconciliation: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_counters_and_last_timestamp() {
        let metrics = ReconciliationMetrics::new();
        metrics.record(Preferred::Fast, false);
        metrics.record(Preferred::Primary, true);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.total_reconciliations, 2);
        assert_eq!(snapshot.conflicts, 1);
        assert_eq!(snapshot.primary_preferred, 1);
        assert_eq!(snapshot.fast_preferred, 1);
        assert!(snapshot.last_reconciliation.is_some());
    }
}
