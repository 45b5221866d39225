//! Index statistics.
//!
//! Every index variant owns an [`IndexStats`] and records its operations
//! there. Counters are atomic so read paths taking `&self` can record too.
//!
//! # Usage
//!
//! ```rust
//! use motordb_core::{BPlusTreeIndex, Index};
//!
//! let mut index = BPlusTreeIndex::new(4).unwrap();
//! index.insert(1, "one");
//! index.search(&1);
//! index.search(&2);
//!
//! let stats = index.stats().snapshot();
//! assert_eq!(stats.inserts, 1);
//! assert_eq!(stats.searches, 2);
//! assert_eq!(stats.search_misses, 1);
//! ```

use std::sync::atomic::{AtomicU64, Ordering};

/// Operation counters for one index instance.
///
/// Values only grow, except through [`IndexStats::reset`].
#[derive(Debug, Default)]
pub struct IndexStats {
    /// New keys inserted.
    inserts: AtomicU64,
    /// Inserts that replaced an existing value.
    updates: AtomicU64,
    /// Successful deletes.
    deletes: AtomicU64,
    /// Point lookups.
    searches: AtomicU64,
    /// Point lookups that found nothing.
    search_misses: AtomicU64,
    /// Full or range scans.
    scans: AtomicU64,
    /// Node splits (tree variants only).
    splits: AtomicU64,
    /// Node merges (B-tree rebalancing only).
    merges: AtomicU64,
}

impl IndexStats {
    /// Creates a new stats instance.
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_insert(&self) {
        self.inserts.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_update(&self) {
        self.updates.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_delete(&self) {
        self.deletes.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_search(&self, hit: bool) {
        self.searches.fetch_add(1, Ordering::Relaxed);
        if !hit {
            self.search_misses.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub(crate) fn record_scan(&self) {
        self.scans.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_split(&self) {
        self.splits.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_merge(&self) {
        self.merges.fetch_add(1, Ordering::Relaxed);
    }

    /// Returns a point-in-time copy of all counters.
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            inserts: self.inserts.load(Ordering::Relaxed),
            updates: self.updates.load(Ordering::Relaxed),
            deletes: self.deletes.load(Ordering::Relaxed),
            searches: self.searches.load(Ordering::Relaxed),
            search_misses: self.search_misses.load(Ordering::Relaxed),
            scans: self.scans.load(Ordering::Relaxed),
            splits: self.splits.load(Ordering::Relaxed),
            merges: self.merges.load(Ordering::Relaxed),
        }
    }

    /// Resets all counters to zero.
    pub fn reset(&self) {
        self.inserts.store(0, Ordering::Relaxed);
        self.updates.store(0, Ordering::Relaxed);
        self.deletes.store(0, Ordering::Relaxed);
        self.searches.store(0, Ordering::Relaxed);
        self.search_misses.store(0, Ordering::Relaxed);
        self.scans.store(0, Ordering::Relaxed);
        self.splits.store(0, Ordering::Relaxed);
        self.merges.store(0, Ordering::Relaxed);
    }
}

/// A point-in-time copy of [`IndexStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    /// New keys inserted.
    pub inserts: u64,
    /// Inserts that replaced an existing value.
    pub updates: u64,
    /// Successful deletes.
    pub deletes: u64,
    /// Point lookups.
    pub searches: u64,
    /// Point lookups that found nothing.
    pub search_misses: u64,
    /// Full or range scans.
    pub scans: u64,
    /// Node splits.
    pub splits: u64,
    /// Node merges.
    pub merges: u64,
}

impl StatsSnapshot {
    /// Fraction of searches that found their key, or `None` before any search.
    pub fn hit_ratio(&self) -> Option<f64> {
        if self.searches == 0 {
            return None;
        }
        Some((self.searches - self.search_misses) as f64 / self.searches as f64)
    }
}
