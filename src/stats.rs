//! Pipeline counters shared between capture channels and the multiplexer.

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe counters updated on the capture hot path.
#[derive(Debug, Default)]
pub struct PipelineStats {
    pub records_captured: AtomicU64,
    pub empty_discarded: AtomicU64,
    pub batches_delivered: AtomicU64,
    pub records_delivered: AtomicU64,
    pub largest_batch: AtomicU64,
    pub failed_sources: AtomicU64,
}

/// Plain copy of [`PipelineStats`] for display.
#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub records_captured: u64,
    pub empty_discarded: u64,
    pub batches_delivered: u64,
    pub records_delivered: u64,
    pub largest_batch: u64,
    pub failed_sources: u64,
}

impl PipelineStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_batch(&self, size: usize) {
        let size = size as u64;
        self.batches_delivered.fetch_add(1, Ordering::Relaxed);
        self.records_delivered.fetch_add(size, Ordering::Relaxed);
        self.largest_batch.fetch_max(size, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            records_captured: self.records_captured.load(Ordering::Relaxed),
            empty_discarded: self.empty_discarded.load(Ordering::Relaxed),
            batches_delivered: self.batches_delivered.load(Ordering::Relaxed),
            records_delivered: self.records_delivered.load(Ordering::Relaxed),
            largest_batch: self.largest_batch.load(Ordering::Relaxed),
            failed_sources: self.failed_sources.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_batch_tracks_largest() {
        let stats = PipelineStats::new();
        stats.record_batch(3);
        stats.record_batch(10);
        stats.record_batch(1);
        let snap = stats.snapshot();
        assert_eq!(snap.batches_delivered, 3);
        assert_eq!(snap.records_delivered, 14);
        assert_eq!(snap.largest_batch, 10);
    }
}
