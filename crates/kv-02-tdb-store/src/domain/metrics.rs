//! # Compaction Metrics
//!
//! Counters for garbage collection. Shared through an `Arc` so a runtime
//! can read them while the store is in use.

use std::sync::atomic::{AtomicU64, Ordering::Relaxed};

/// Garbage-collection counters of one store.
#[derive(Debug, Default)]
pub struct CompactionMetrics {
    committed: AtomicU64,
    /// Compactions cut short by a device error or a defect in a live record.
    abandoned: AtomicU64,
    bytes_reclaimed: AtomicU64,
    records_copied: AtomicU64,
}

/// Point-in-time copy of `CompactionMetrics`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CompactionSnapshot {
    pub committed: u64,
    pub abandoned: u64,
    pub bytes_reclaimed: u64,
    pub records_copied: u64,
}

impl CompactionMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// A compaction whose new Area header was written.
    pub fn record_committed(&self, bytes_reclaimed: u64, records_copied: u64) {
        self.committed.fetch_add(1, Relaxed);
        self.bytes_reclaimed.fetch_add(bytes_reclaimed, Relaxed);
        self.records_copied.fetch_add(records_copied, Relaxed);
    }

    pub fn record_abandoned(&self) {
        self.abandoned.fetch_add(1, Relaxed);
    }

    pub fn compaction_count(&self) -> u64 {
        self.committed.load(Relaxed)
    }

    pub fn bytes_total(&self) -> u64 {
        self.bytes_reclaimed.load(Relaxed)
    }

    pub fn snapshot(&self) -> CompactionSnapshot {
        CompactionSnapshot {
            committed: self.committed.load(Relaxed),
            abandoned: self.abandoned.load(Relaxed),
            bytes_reclaimed: self.bytes_reclaimed.load(Relaxed),
            records_copied: self.records_copied.load(Relaxed),
        }
    }
}

impl CompactionSnapshot {
    /// Live records carried per committed compaction.
    pub fn records_per_compaction(&self) -> u64 {
        self.records_copied.checked_div(self.committed).unwrap_or(0)
    }
}
