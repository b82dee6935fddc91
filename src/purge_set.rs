//! # Purge set
//!
//! A [`PurgeSet`] records cache-purge directives as `(key, timestamp)` pairs
//! inside a byte-bounded [`LruBase`], plus a *global invalidation timestamp*
//! below which every cached item is stale regardless of key.
//!
//! ```text
//!   is_valid(key, t)
//!     t ≤ global ─────────────────────────────► false
//!     key has purge record t_rec ─► t > t_rec
//!     no record ──────────────────────────────► true
//! ```
//!
//! Memory is bounded: when a purge record is evicted to make room, its
//! timestamp is folded into the global timestamp (through
//! [`PurgeHelper::evict_notify`]), so a purged key can never be resurrected by
//! eviction. The price is that eviction may invalidate more than was asked
//! for.
//!
//! ## Clock skew
//!
//! Timestamps are expected to be non-decreasing. A timestamp up to
//! [`PurgeSet::CLOCK_SKEW_ALLOWANCE_MS`] behind the newest one seen is pinned
//! forward to that newest timestamp; anything further behind is rejected with
//! [`ClockSkewError`] and leaves the set untouched.

use std::cmp::Ordering;
use std::fmt;

use rustc_hash::FxHashMap;
use tracing::{debug, trace, warn};

use crate::error::ClockSkewError;
use crate::helper::ValueHelper;
use crate::lru_base::LruBase;
use crate::stats::LruStatsSnapshot;

/// Helper binding the substrate's value hooks to purge semantics.
///
/// It also owns the global invalidation timestamp, which is the state
/// eviction needs to update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PurgeHelper {
    global_invalidation_timestamp_ms: i64,
}

impl PurgeHelper {
    fn new() -> Self {
        Self {
            global_invalidation_timestamp_ms: PurgeSet::INITIAL_TIMESTAMP_MS,
        }
    }

    pub fn global_invalidation_timestamp_ms(&self) -> i64 {
        self.global_invalidation_timestamp_ms
    }

    fn raise_global(&mut self, timestamp_ms: i64) {
        self.global_invalidation_timestamp_ms =
            self.global_invalidation_timestamp_ms.max(timestamp_ms);
    }
}

impl ValueHelper<i64> for PurgeHelper {
    fn size(&self, _value: &i64) -> usize {
        std::mem::size_of::<i64>()
    }

    fn equal(&self, a: &i64, b: &i64) -> bool {
        a == b
    }

    fn should_replace(&self, old: &i64, new: &i64) -> bool {
        new > old
    }

    fn evict_notify(&mut self, value: &i64) {
        self.raise_global(*value);
    }
}

/// Byte-bounded set of purge records with a global invalidation cutoff.
#[derive(Clone)]
pub struct PurgeSet {
    lru: LruBase<i64, PurgeHelper>,
    last_seen_timestamp_ms: i64,
    clock_skew_allowance_ms: i64,
}

/// Statistics and timestamps of a [`PurgeSet`] at one point in time.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PurgeSetSnapshot {
    pub lru: LruStatsSnapshot,
    pub global_invalidation_timestamp_ms: i64,
    pub last_seen_timestamp_ms: i64,
}

impl PurgeSet {
    /// Sentinel meaning "no timestamp set".
    pub const INITIAL_TIMESTAMP_MS: i64 = -1;

    /// Ten minutes.
    pub const CLOCK_SKEW_ALLOWANCE_MS: i64 = 10 * 60 * 1000;

    /// Budget used by [`PurgeSet::default`].
    pub const DEFAULT_MAX_BYTES: usize = 1 << 20;

    pub fn new(max_bytes: usize) -> Self {
        Self::with_clock_skew_allowance(max_bytes, Self::CLOCK_SKEW_ALLOWANCE_MS)
    }

    pub(crate) fn with_clock_skew_allowance(max_bytes: usize, clock_skew_allowance_ms: i64) -> Self {
        Self {
            lru: LruBase::new(max_bytes, PurgeHelper::new()),
            last_seen_timestamp_ms: Self::INITIAL_TIMESTAMP_MS,
            clock_skew_allowance_ms,
        }
    }

    /// Raises the global invalidation timestamp to at least `timestamp_ms`.
    ///
    /// Purge records the new cutoff dominates are dropped. They form a run at
    /// the least recently used end, so the cost is proportional to the
    /// number dropped.
    pub fn update_global_invalidation_timestamp(
        &mut self,
        timestamp_ms: i64,
    ) -> Result<(), ClockSkewError> {
        let timestamp_ms = self.sanitize(timestamp_ms)?;
        if timestamp_ms <= self.global_invalidation_timestamp_ms() {
            return Ok(());
        }
        self.lru.helper_mut().raise_global(timestamp_ms);
        let dropped = self.drop_dominated();
        debug!(
            global_invalidation_timestamp_ms = timestamp_ms,
            dropped, "global invalidation timestamp raised"
        );
        Ok(())
    }

    /// Records that `key` was purged at `timestamp_ms`.
    ///
    /// Succeeds whether or not the record is kept: a timestamp at or below
    /// the global cutoff is already covered, and admission may evict older
    /// records into the global timestamp.
    pub fn put(&mut self, key: impl AsRef<[u8]>, timestamp_ms: i64) -> Result<(), ClockSkewError> {
        let timestamp_ms = self.sanitize(timestamp_ms)?;
        self.install(key.as_ref(), timestamp_ms, true);
        Ok(())
    }

    /// Returns `true` if a cache entry for `key` written at `timestamp_ms`
    /// survives every purge recorded here.
    pub fn is_valid(&self, key: impl AsRef<[u8]>, timestamp_ms: i64) -> bool {
        if timestamp_ms <= self.global_invalidation_timestamp_ms() {
            return false;
        }
        match self.lru.get_no_freshen(key) {
            Some(&record_ms) => timestamp_ms > record_ms,
            None => true,
        }
    }

    /// Folds `src` into `self`.
    ///
    /// Every key of either side is kept at its newer timestamp, and the
    /// global timestamp becomes the larger of the two. Records are reinstalled
    /// oldest first so that, if `self`'s budget is too small, the oldest
    /// records across both sides are the ones absorbed into the global
    /// timestamp. Only records taken from `src` count as inserts.
    pub fn merge(&mut self, src: &PurgeSet) {
        // key -> (timestamp, came from src)
        let mut newest: FxHashMap<Vec<u8>, (i64, bool)> =
            FxHashMap::with_capacity_and_hasher(self.len() + src.len(), Default::default());
        for (key, &record_ms) in self.lru.iter() {
            newest.insert(key.to_vec(), (record_ms, false));
        }
        for (key, &record_ms) in src.lru.iter() {
            newest
                .entry(key.to_vec())
                .and_modify(|existing| {
                    if record_ms > existing.0 {
                        *existing = (record_ms, true);
                    }
                })
                .or_insert((record_ms, true));
        }
        let mut records: Vec<(Vec<u8>, i64, bool)> = newest
            .into_iter()
            .map(|(key, (record_ms, from_src))| (key, record_ms, from_src))
            .collect();
        records.sort_by(|a, b| match a.1.cmp(&b.1) {
            Ordering::Equal => a.0.cmp(&b.0),
            other => other,
        });

        let global = self
            .global_invalidation_timestamp_ms()
            .max(src.global_invalidation_timestamp_ms());
        self.last_seen_timestamp_ms = self.last_seen_timestamp_ms.max(src.last_seen_timestamp_ms);
        self.lru.clear();
        self.lru.helper_mut().raise_global(global);

        for (key, record_ms, from_src) in &records {
            self.install(key, *record_ms, *from_src);
        }
        debug!(
            records = self.len(),
            candidates = records.len(),
            global_invalidation_timestamp_ms = self.global_invalidation_timestamp_ms(),
            "merged purge sets"
        );
    }

    /// Drops every record and resets both timestamps to the sentinel.
    pub fn clear(&mut self) {
        self.lru.clear();
        self.lru.helper_mut().global_invalidation_timestamp_ms = Self::INITIAL_TIMESTAMP_MS;
        self.last_seen_timestamp_ms = Self::INITIAL_TIMESTAMP_MS;
    }

    /// Exchanges the entire state of two purge sets.
    pub fn swap(&mut self, other: &mut PurgeSet) {
        std::mem::swap(self, other);
    }

    /// `true` if there are no records and no global timestamp.
    pub fn is_empty(&self) -> bool {
        self.lru.is_empty() && !self.has_global_invalidation_timestamp()
    }

    /// Number of purge records held.
    pub fn len(&self) -> usize {
        self.lru.len()
    }

    pub fn global_invalidation_timestamp_ms(&self) -> i64 {
        self.lru.helper().global_invalidation_timestamp_ms()
    }

    pub fn has_global_invalidation_timestamp(&self) -> bool {
        self.global_invalidation_timestamp_ms() != Self::INITIAL_TIMESTAMP_MS
    }

    pub fn last_seen_timestamp_ms(&self) -> i64 {
        self.last_seen_timestamp_ms
    }

    pub fn clock_skew_allowance_ms(&self) -> i64 {
        self.clock_skew_allowance_ms
    }

    /// Purge timestamp recorded for `key`, without counting a lookup.
    pub fn record(&self, key: impl AsRef<[u8]>) -> Option<i64> {
        self.lru.peek(key).copied()
    }

    /// Changes the byte budget; takes effect on the next `put`.
    pub fn set_max_bytes(&mut self, max_bytes: usize) {
        self.lru.set_max_bytes(max_bytes);
    }

    pub fn max_bytes(&self) -> usize {
        self.lru.max_bytes()
    }

    /// Records from oldest to most recently touched.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = (&[u8], i64)> + '_ {
        self.lru.iter().map(|(key, &record_ms)| (key, record_ms))
    }

    pub fn snapshot(&self) -> PurgeSetSnapshot {
        PurgeSetSnapshot {
            lru: self.lru.stats(),
            global_invalidation_timestamp_ms: self.global_invalidation_timestamp_ms(),
            last_seen_timestamp_ms: self.last_seen_timestamp_ms,
        }
    }

    /// Panics if the underlying substrate is inconsistent, a record is
    /// already covered by the global timestamp, or record timestamps
    /// decrease from oldest to newest.
    pub fn sanity_check(&self) {
        self.lru.sanity_check();
        let mut floor = self.global_invalidation_timestamp_ms();
        let mut first = true;
        for (key, record_ms) in self.iter() {
            let ok = if first { record_ms > floor } else { record_ms >= floor };
            assert!(
                ok,
                "purge record {}@{record_ms} out of order (floor {floor})",
                String::from_utf8_lossy(key)
            );
            floor = record_ms;
            first = false;
        }
    }

    fn install(&mut self, key: &[u8], timestamp_ms: i64, counted: bool) {
        let global = self.global_invalidation_timestamp_ms();
        if timestamp_ms <= global {
            return;
        }
        if counted {
            self.lru.put(key, timestamp_ms);
        } else {
            self.lru.reinstall(key, timestamp_ms);
        }

        // An eviction raised the cutoff; drop records that tie with it.
        if self.global_invalidation_timestamp_ms() > global {
            self.drop_dominated();
        }
    }

    // Record timestamps never decrease from oldest to newest, so everything
    // at or below the cutoff sits at the tail.
    fn drop_dominated(&mut self) -> usize {
        let global = self.global_invalidation_timestamp_ms();
        let mut dropped = 0;
        loop {
            let Some(record_ms) = self.lru.peek_lru().map(|(_, &record_ms)| record_ms) else {
                break;
            };
            if record_ms > global {
                break;
            }
            self.lru.pop_lru_silently();
            dropped += 1;
        }
        dropped
    }

    // Pins small backwards steps to the newest timestamp seen; rejects large ones.
    fn sanitize(&mut self, timestamp_ms: i64) -> Result<i64, ClockSkewError> {
        let last_seen = self.last_seen_timestamp_ms;
        if timestamp_ms >= last_seen {
            self.last_seen_timestamp_ms = timestamp_ms;
            return Ok(timestamp_ms);
        }
        let behind = last_seen.saturating_sub(timestamp_ms);
        if behind <= self.clock_skew_allowance_ms {
            trace!(timestamp_ms, last_seen, behind, "pinning timestamp forward");
            return Ok(last_seen);
        }
        warn!(
            timestamp_ms,
            last_seen,
            allowance_ms = self.clock_skew_allowance_ms,
            "rejecting timestamp beyond clock skew allowance"
        );
        Err(ClockSkewError {
            timestamp_ms,
            last_seen_ms: last_seen,
            allowance_ms: self.clock_skew_allowance_ms,
        })
    }
}

impl Default for PurgeSet {
    fn default() -> Self {
        Self::new(Self::DEFAULT_MAX_BYTES)
    }
}

/// Same global timestamp and the same `(key, timestamp)` records, regardless
/// of recency order.
impl PartialEq for PurgeSet {
    fn eq(&self, other: &Self) -> bool {
        self.global_invalidation_timestamp_ms() == other.global_invalidation_timestamp_ms()
            && self.len() == other.len()
            && self
                .iter()
                .all(|(key, record_ms)| other.record(key) == Some(record_ms))
    }
}

impl Eq for PurgeSet {}

impl fmt::Display for PurgeSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Global@{}", self.global_invalidation_timestamp_ms())?;
        for (key, record_ms) in self.iter() {
            writeln!(f, "{}@{}", String::from_utf8_lossy(key), record_ms)?;
        }
        Ok(())
    }
}

impl fmt::Debug for PurgeSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PurgeSet")
            .field("records", &self.len())
            .field(
                "global_invalidation_timestamp_ms",
                &self.global_invalidation_timestamp_ms(),
            )
            .field("last_seen_timestamp_ms", &self.last_seen_timestamp_ms)
            .field("max_bytes", &self.max_bytes())
            .finish()
    }
}
