//! Free-running statistics for the LRU substrate.
//!
//! Counters are observational only. They are never reset by
//! [`LruBase::clear`](crate::lru_base::LruBase::clear); use
//! [`LruBase::clear_stats`](crate::lru_base::LruBase::clear_stats) for that.
//!
//! ## Recording vs. reading
//!
//! ```text
//!   LruBase ──record_*──► LruStats ──snapshot──► LruStatsSnapshot ──► StatsSink
//!                          (live)                  (Copy, gauges)      (embedder)
//! ```
//!
//! Lookups that only take `&self` (`get_no_freshen`) still count hits and
//! misses, so those two counters sit in a [`MetricsCell`].

use std::cell::Cell;

/// A counter that can be bumped through a shared reference.
///
/// Not `Sync`: callers sharing a substrate across threads already serialise
/// every operation behind a lock.
#[repr(transparent)]
#[derive(Debug, Default, Clone)]
pub struct MetricsCell(Cell<u64>);

impl MetricsCell {
    #[inline]
    pub fn new() -> Self {
        Self(Cell::new(0))
    }

    #[inline]
    pub fn get(&self) -> u64 {
        self.0.get()
    }

    #[inline]
    pub fn incr(&self) {
        self.0.set(self.0.get() + 1);
    }

    #[inline]
    fn add(&self, n: u64) {
        self.0.set(self.0.get() + n);
    }

    #[inline]
    fn reset(&self) {
        self.0.set(0);
    }
}

/// Live counters owned by a substrate.
#[derive(Debug, Default, Clone)]
pub struct LruStats {
    hits: MetricsCell,
    misses: MetricsCell,
    inserts: u64,
    evictions: u64,
    deletes: u64,
    identical_reinserts: u64,
}

impl LruStats {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub(crate) fn record_hit(&self) {
        self.hits.incr();
    }

    #[inline]
    pub(crate) fn record_miss(&self) {
        self.misses.incr();
    }

    #[inline]
    pub(crate) fn record_insert(&mut self) {
        self.inserts += 1;
    }

    #[inline]
    pub(crate) fn record_eviction(&mut self) {
        self.evictions += 1;
    }

    #[inline]
    pub(crate) fn record_delete(&mut self) {
        self.deletes += 1;
    }

    #[inline]
    pub(crate) fn record_identical_reinsert(&mut self) {
        self.identical_reinserts += 1;
    }

    pub fn hits(&self) -> u64 {
        self.hits.get()
    }

    pub fn misses(&self) -> u64 {
        self.misses.get()
    }

    pub fn inserts(&self) -> u64 {
        self.inserts
    }

    pub fn evictions(&self) -> u64 {
        self.evictions
    }

    pub fn deletes(&self) -> u64 {
        self.deletes
    }

    pub fn identical_reinserts(&self) -> u64 {
        self.identical_reinserts
    }

    /// Adds every counter of `other` into `self`.
    pub fn merge(&mut self, other: &LruStats) {
        self.hits.add(other.hits());
        self.misses.add(other.misses());
        self.inserts += other.inserts;
        self.evictions += other.evictions;
        self.deletes += other.deletes;
        self.identical_reinserts += other.identical_reinserts;
    }

    pub fn reset(&mut self) {
        self.hits.reset();
        self.misses.reset();
        self.inserts = 0;
        self.evictions = 0;
        self.deletes = 0;
        self.identical_reinserts = 0;
    }
}

/// Point-in-time copy of a substrate's counters and gauges.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct LruStatsSnapshot {
    pub hits: u64,
    pub misses: u64,
    pub inserts: u64,
    pub evictions: u64,
    pub deletes: u64,
    pub identical_reinserts: u64,

    // gauges captured at snapshot time
    pub num_elements: usize,
    pub size_bytes: usize,
    pub max_bytes: usize,
}

impl LruStatsSnapshot {
    pub(crate) fn capture(
        stats: &LruStats,
        num_elements: usize,
        size_bytes: usize,
        max_bytes: usize,
    ) -> Self {
        Self {
            hits: stats.hits(),
            misses: stats.misses(),
            inserts: stats.inserts(),
            evictions: stats.evictions(),
            deletes: stats.deletes(),
            identical_reinserts: stats.identical_reinserts(),
            num_elements,
            size_bytes,
            max_bytes,
        }
    }

    /// Fraction of lookups that hit, or `0.0` before any lookup.
    pub fn hit_ratio(&self) -> f64 {
        let lookups = self.hits + self.misses;
        if lookups == 0 {
            0.0
        } else {
            self.hits as f64 / lookups as f64
        }
    }
}

/// External statistics sink an embedder can publish snapshots into.
pub trait StatsSink {
    fn record(&mut self, snapshot: &LruStatsSnapshot);
}

impl StatsSink for Vec<LruStatsSnapshot> {
    fn record(&mut self, snapshot: &LruStatsSnapshot) {
        self.push(*snapshot);
    }
}
