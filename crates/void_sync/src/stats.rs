//! Sync Statistics
//!
//! Counters bumped from worker threads during Sync and from the designated
//! thread during commit, snapshotted into a plain `SyncStats`.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// Snapshot of sync counters
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncStats {
    /// Sync calls that ran to `Clean`
    pub prims_synced: u64,
    /// Sync calls that ended `Hidden`
    pub prims_hidden: u64,
    /// Commit records queued; filled in from the commit queue
    pub commits_enqueued: u64,
    /// Commit records executed by drains
    pub commits_executed: u64,
    /// Authoring-data problems resolved with fallback data
    pub warnings: u64,
    /// Draw items created
    pub draw_items_created: u64,
}

/// Thread-safe counters behind `SyncStats`
#[derive(Debug, Default)]
pub struct SyncCounters {
    prims_synced: AtomicU64,
    prims_hidden: AtomicU64,
    commits_executed: AtomicU64,
    warnings: AtomicU64,
    draw_items_created: AtomicU64,
}

impl SyncCounters {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn prim_synced(&self) {
        self.prims_synced.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn prim_hidden(&self) {
        self.prims_hidden.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn commits_executed(&self, count: u64) {
        self.commits_executed.fetch_add(count, Ordering::Relaxed);
    }

    #[inline]
    pub fn add_warnings(&self, count: u64) {
        if count > 0 {
            self.warnings.fetch_add(count, Ordering::Relaxed);
        }
    }

    #[inline]
    pub fn draw_item_created(&self) {
        self.draw_items_created.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> SyncStats {
        SyncStats {
            prims_synced: self.prims_synced.load(Ordering::Relaxed),
            prims_hidden: self.prims_hidden.load(Ordering::Relaxed),
            commits_enqueued: 0,
            commits_executed: self.commits_executed.load(Ordering::Relaxed),
            warnings: self.warnings.load(Ordering::Relaxed),
            draw_items_created: self.draw_items_created.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot() {
        let counters = SyncCounters::new();
        counters.prim_synced();
        counters.commits_executed(2);
        counters.add_warnings(3);

        let stats = counters.snapshot();
        assert_eq!(stats.prims_synced, 1);
        assert_eq!(stats.commits_enqueued, 0);
        assert_eq!(stats.commits_executed, 2);
        assert_eq!(stats.warnings, 3);
        assert_eq!(stats.prims_hidden, 0);
    }
}
