//! # Byte-bounded LRU substrate
//!
//! [`LruBase<V, H>`] is an in-memory associative container keyed by byte
//! strings. It keeps entries in strict least-recently-used order and holds
//! the total charge of its entries (`|key| + helper.size(value)`) at or below
//! a byte budget, evicting from the cold end when a new entry needs room.
//!
//! ## Architecture
//!
//! ```text
//!   ┌──────────────────────────────────────────────────────────────────┐
//!   │                         LruBase<V, H>                            │
//!   │                                                                  │
//!   │   index: FxHashMap<Box<[u8]>, NodeId>                            │
//!   │   ┌──────────┬────────┐                                          │
//!   │   │  "aa"    │  id_0 ─┼──────────────────────────────┐           │
//!   │   │  "bb"    │  id_1 ─┼────────────────────┐         │           │
//!   │   │  "cc"    │  id_2 ─┼──────────┐         │         │           │
//!   │   └──────────┴────────┘          ▼         ▼         ▼           │
//!   │   list: RecencyList<Entry<V>>                                    │
//!   │     head (MRU) ─► [cc] ◄──► [bb] ◄──► [aa] ◄── tail (LRU)        │
//!   │                                                                  │
//!   │   current_bytes ≤ max_bytes          helper: H (ValueHelper<V>)  │
//!   └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Put
//!
//! ```text
//!   put(key, value)
//!     needed = |key| + helper.size(value)
//!     key present?
//!       ├─ !should_replace(old, new) ──► freshen, Retained
//!       ├─ equal(new, old)          ──► freshen, Identical
//!       └─ otherwise                ──► unlink old entry (deletes += 1)
//!     needed > max_bytes?           ──► Rejected (key absent afterwards)
//!     while current + needed > max  ──► evict tail, evict_notify(value)
//!     push_front, index, charge     ──► Inserted / Replaced
//! ```
//!
//! Admission is decided before anything is evicted, so a value that can
//! never fit does not flush the cache on its way out.
//!
//! ## Thread Safety
//!
//! `LruBase` is single-threaded. Even `get_no_freshen` bumps statistics, so
//! shared use needs an external lock around every call; see
//! [`ConcurrentLruBase`](crate::concurrent::ConcurrentLruBase).

use std::fmt;

use rustc_hash::FxHashMap;
use tracing::{debug, trace};

use crate::ds::recency_list::{self, NodeId, RecencyList};
use crate::error::InvariantError;
use crate::helper::ValueHelper;
use crate::stats::{LruStats, LruStatsSnapshot, StatsSink};

#[derive(Debug, Clone)]
struct Entry<V> {
    key: Box<[u8]>,
    value: V,
    charge: usize,
}

/// What a [`LruBase::put`] call did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PutOutcome {
    /// The key was absent and is now present.
    Inserted,
    /// The key was present with a different value, which was replaced.
    Replaced,
    /// The key was present with an equal value; the entry was freshened.
    Identical,
    /// The helper declined the replacement; the old entry was freshened.
    Retained,
    /// The entry alone exceeds the byte budget; the key is absent afterwards.
    Rejected,
}

impl PutOutcome {
    /// Returns `true` if the key holds a value after the call.
    pub fn is_present(self) -> bool {
        !matches!(self, PutOutcome::Rejected)
    }
}

/// Strict-LRU container with a byte budget and a pluggable [`ValueHelper`].
#[derive(Clone)]
pub struct LruBase<V, H> {
    index: FxHashMap<Box<[u8]>, NodeId>,
    list: RecencyList<Entry<V>>,
    current_bytes: usize,
    max_bytes: usize,
    stats: LruStats,
    helper: H,
}

impl<V, H> LruBase<V, H>
where
    H: ValueHelper<V>,
{
    /// Creates an empty substrate holding at most `max_bytes` of charge.
    pub fn new(max_bytes: usize, helper: H) -> Self {
        Self::with_capacity(max_bytes, helper, 0)
    }

    /// Like [`new`](Self::new), pre-sizing the index and list for
    /// `capacity` entries.
    pub fn with_capacity(max_bytes: usize, helper: H, capacity: usize) -> Self {
        Self {
            index: FxHashMap::with_capacity_and_hasher(capacity, Default::default()),
            list: RecencyList::with_capacity(capacity),
            current_bytes: 0,
            max_bytes,
            stats: LruStats::new(),
            helper,
        }
    }

    /// Looks up `key`, moving it to the most recently used position on a hit.
    ///
    /// The reference is valid until the next mutating call.
    pub fn get_and_freshen(&mut self, key: impl AsRef<[u8]>) -> Option<&V> {
        let Some(&id) = self.index.get(key.as_ref()) else {
            self.stats.record_miss();
            return None;
        };
        self.list.move_to_front(id);
        self.stats.record_hit();
        self.list.get(id).map(|entry| &entry.value)
    }

    /// Looks up `key` without touching recency order. Still counts the
    /// hit or miss.
    pub fn get_no_freshen(&self, key: impl AsRef<[u8]>) -> Option<&V> {
        match self
            .index
            .get(key.as_ref())
            .and_then(|&id| self.list.get(id))
        {
            Some(entry) => {
                self.stats.record_hit();
                Some(&entry.value)
            },
            None => {
                self.stats.record_miss();
                None
            },
        }
    }

    /// Returns `true` if `key` is present. Does not count as a lookup.
    pub fn contains(&self, key: impl AsRef<[u8]>) -> bool {
        self.index.contains_key(key.as_ref())
    }

    /// Reads `key` without touching recency order or statistics.
    pub fn peek(&self, key: impl AsRef<[u8]>) -> Option<&V> {
        self.index
            .get(key.as_ref())
            .and_then(|&id| self.list.get(id))
            .map(|entry| &entry.value)
    }

    /// Inserts or re-puts `key`, evicting least recently used entries as
    /// needed to stay within the byte budget.
    pub fn put(&mut self, key: impl AsRef<[u8]>, value: V) -> PutOutcome {
        self.put_counted(key.as_ref(), value, true)
    }

    /// Like `put`, but leaves the insert, delete and identical-reinsert
    /// counters alone. Evictions are still counted and notified.
    pub(crate) fn reinstall(&mut self, key: &[u8], value: V) -> PutOutcome {
        self.put_counted(key, value, false)
    }

    /// The least recently used entry, without touching order or statistics.
    pub(crate) fn peek_lru(&self) -> Option<(&[u8], &V)> {
        let id = self.list.back_id()?;
        self.list
            .get(id)
            .map(|entry| (entry.key.as_ref(), &entry.value))
    }

    /// Removes the least recently used entry without firing `evict_notify`
    /// or counting a delete.
    pub(crate) fn pop_lru_silently(&mut self) -> Option<V> {
        let entry = self.list.pop_back()?;
        self.index.remove(&entry.key);
        self.current_bytes -= entry.charge;
        Some(entry.value)
    }

    fn put_counted(&mut self, key: &[u8], value: V, counted: bool) -> PutOutcome {
        let needed = key.len().saturating_add(self.helper.size(&value));

        let mut replaced = false;
        if let Some(&id) = self.index.get(key) {
            if let Some(old) = self.list.get(id).map(|entry| &entry.value) {
                if !self.helper.should_replace(old, &value) {
                    self.list.move_to_front(id);
                    return PutOutcome::Retained;
                }
                if self.helper.equal(&value, old) {
                    self.list.move_to_front(id);
                    if counted {
                        self.stats.record_identical_reinsert();
                    }
                    return PutOutcome::Identical;
                }
            }
            self.unlink(key, id);
            if counted {
                self.stats.record_delete();
            }
            replaced = true;
        }

        if needed > self.max_bytes {
            debug!(
                key_len = key.len(),
                needed,
                max_bytes = self.max_bytes,
                "entry exceeds byte budget; not admitted"
            );
            return PutOutcome::Rejected;
        }

        while self.current_bytes + needed > self.max_bytes {
            if !self.evict_lru() {
                break;
            }
        }

        let id = self.list.push_front(Entry {
            key: key.into(),
            value,
            charge: needed,
        });
        self.index.insert(key.into(), id);
        self.current_bytes += needed;
        if counted {
            self.stats.record_insert();
        }

        if replaced {
            PutOutcome::Replaced
        } else {
            PutOutcome::Inserted
        }
    }

    /// Removes `key` if present. Returns whether anything was removed.
    pub fn delete(&mut self, key: impl AsRef<[u8]>) -> bool {
        let key = key.as_ref();
        let Some(&id) = self.index.get(key) else {
            return false;
        };
        self.unlink(key, id);
        self.stats.record_delete();
        true
    }

    /// Removes every entry whose key starts with `prefix`. O(n); meant for
    /// tests. Returns the number of entries removed.
    pub fn delete_with_prefix(&mut self, prefix: impl AsRef<[u8]>) -> usize {
        let prefix = prefix.as_ref();
        let doomed: Vec<(Box<[u8]>, NodeId)> = self
            .index
            .iter()
            .filter(|(key, _)| key.starts_with(prefix))
            .map(|(key, &id)| (key.clone(), id))
            .collect();
        for (key, id) in &doomed {
            self.unlink(key, *id);
            self.stats.record_delete();
        }
        doomed.len()
    }

    /// Drops every entry without firing `evict_notify`. Statistics are kept.
    pub fn clear(&mut self) {
        self.list.clear();
        self.index.clear();
        self.current_bytes = 0;
    }

    /// Changes the byte budget. Nothing is evicted until the next `put`.
    pub fn set_max_bytes(&mut self, max_bytes: usize) {
        if self.current_bytes > max_bytes {
            debug!(
                current_bytes = self.current_bytes,
                max_bytes, "byte budget lowered below usage; eviction deferred to next put"
            );
        }
        self.max_bytes = max_bytes;
    }

    /// Iterates entries from least to most recently used.
    pub fn iter(&self) -> Iter<'_, V> {
        Iter {
            inner: self.list.iter_oldest_first(),
        }
    }

    /// Total charge of all present entries.
    pub fn size_bytes(&self) -> usize {
        self.current_bytes
    }

    pub fn max_bytes(&self) -> usize {
        self.max_bytes
    }

    /// Number of entries stored.
    pub fn num_elements(&self) -> usize {
        self.index.len()
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn helper(&self) -> &H {
        &self.helper
    }

    /// Mutable access to the helper. Changing how the helper sizes values
    /// while entries are present breaks byte accounting.
    pub fn helper_mut(&mut self) -> &mut H {
        &mut self.helper
    }

    /// Live counters.
    pub fn counters(&self) -> &LruStats {
        &self.stats
    }

    /// Snapshot of counters plus current gauges.
    pub fn stats(&self) -> LruStatsSnapshot {
        LruStatsSnapshot::capture(
            &self.stats,
            self.num_elements(),
            self.current_bytes,
            self.max_bytes,
        )
    }

    /// Resets counters. Content is untouched.
    pub fn clear_stats(&mut self) {
        self.stats.reset();
    }

    /// Adds `other`'s counters into this substrate's counters.
    pub fn merge_stats<W, G>(&mut self, other: &LruBase<W, G>) {
        self.stats.merge(&other.stats);
    }

    /// Hands a snapshot to an external sink.
    pub fn publish_stats(&self, sink: &mut dyn StatsSink) {
        sink.record(&self.stats());
    }

    /// Verifies that the index and recency list agree, that byte accounting
    /// matches a fresh recomputation, and that usage is within budget.
    pub fn check_invariants(&self) -> Result<(), InvariantError> {
        if self.index.len() != self.list.len() {
            return Err(InvariantError::new(format!(
                "index holds {} keys but recency list holds {} entries",
                self.index.len(),
                self.list.len()
            )));
        }
        self.list.check_links()?;

        for (key, &id) in &self.index {
            let entry = self.list.get(id).ok_or_else(|| {
                InvariantError::new(format!("index slot for key of len {} is dangling", key.len()))
            })?;
            if entry.key != *key {
                return Err(InvariantError::new(
                    "index maps a key to an entry holding a different key",
                ));
            }
        }

        let mut bytes_used = 0usize;
        for entry in self.list.iter_oldest_first() {
            let charge = entry.key.len() + self.helper.size(&entry.value);
            if charge != entry.charge {
                return Err(InvariantError::new(format!(
                    "entry charge {} differs from recomputed {}",
                    entry.charge, charge
                )));
            }
            bytes_used += charge;
        }
        if bytes_used != self.current_bytes {
            return Err(InvariantError::new(format!(
                "current_bytes is {} but entries sum to {}",
                self.current_bytes, bytes_used
            )));
        }
        if self.current_bytes > self.max_bytes {
            return Err(InvariantError::new(format!(
                "current_bytes {} exceeds max_bytes {}",
                self.current_bytes, self.max_bytes
            )));
        }
        Ok(())
    }

    /// Panics if [`check_invariants`](Self::check_invariants) fails.
    pub fn sanity_check(&self) {
        if let Err(err) = self.check_invariants() {
            panic!("LruBase sanity check failed: {err}");
        }
    }

    // Sequence first, then index, then bytes.
    fn unlink(&mut self, key: &[u8], id: NodeId) {
        if let Some(entry) = self.list.remove(id) {
            self.current_bytes -= entry.charge;
        }
        self.index.remove(key);
    }

    fn evict_lru(&mut self) -> bool {
        let Some(id) = self.list.back_id() else {
            return false;
        };
        if let Some(entry) = self.list.get(id) {
            self.helper.evict_notify(&entry.value);
        }
        let Some(entry) = self.list.remove(id) else {
            return false;
        };
        self.index.remove(&entry.key);
        self.current_bytes -= entry.charge;
        self.stats.record_eviction();
        trace!(
            key_len = entry.key.len(),
            freed = entry.charge,
            current_bytes = self.current_bytes,
            "evicted least recently used entry"
        );
        true
    }
}

impl<V: fmt::Debug, H> fmt::Debug for LruBase<V, H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LruBase")
            .field("num_elements", &self.index.len())
            .field("current_bytes", &self.current_bytes)
            .field("max_bytes", &self.max_bytes)
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}

/// Oldest-to-newest iterator over `(key, value)` pairs of an [`LruBase`].
pub struct Iter<'a, V> {
    inner: recency_list::Iter<'a, Entry<V>>,
}

impl<'a, V> Iterator for Iter<'a, V> {
    type Item = (&'a [u8], &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        self.inner
            .next()
            .map(|entry| (entry.key.as_ref(), &entry.value))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<V> DoubleEndedIterator for Iter<'_, V> {
    fn next_back(&mut self) -> Option<Self::Item> {
        self.inner
            .next_back()
            .map(|entry| (entry.key.as_ref(), &entry.value))
    }
}

impl<V> ExactSizeIterator for Iter<'_, V> {}

impl<'a, V, H> IntoIterator for &'a LruBase<V, H>
where
    H: ValueHelper<V>,
{
    type Item = (&'a [u8], &'a V);
    type IntoIter = Iter<'a, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
