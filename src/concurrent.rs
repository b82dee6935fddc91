//! Thread-safe wrappers around the single-threaded cores.
//!
//! Every operation, lookups included, takes the same
//! `parking_lot::Mutex`: freshening reorders the recency list and even
//! `get_no_freshen` bumps hit/miss counters, so there is no read-only path
//! worth a shared lock.
//!
//! ```text
//!   Thread 1            Thread 2            Thread 3
//!      │ put              │ is_valid          │ merge
//!      ▼                  ▼                   ▼
//!   ┌──────────────────────────────────────────────┐
//!   │            parking_lot::Mutex<T>             │
//!   └──────────────────────────────────────────────┘
//!                          │
//!                          ▼
//!              PurgeSet / LruBase<V, H>
//! ```
//!
//! Lookups return owned copies because a reference cannot outlive the
//! guard. [`with_inner`](ConcurrentPurgeSet::with_inner) runs a closure under
//! the lock for anything not covered here.

use parking_lot::Mutex;

use crate::error::ClockSkewError;
use crate::helper::ValueHelper;
use crate::lru_base::{LruBase, PutOutcome};
use crate::purge_set::{PurgeSet, PurgeSetSnapshot};
use crate::stats::LruStatsSnapshot;

/// [`LruBase`] behind a mutex.
#[derive(Debug)]
pub struct ConcurrentLruBase<V, H> {
    inner: Mutex<LruBase<V, H>>,
}

impl<V, H> ConcurrentLruBase<V, H>
where
    V: Clone,
    H: ValueHelper<V>,
{
    pub fn new(max_bytes: usize, helper: H) -> Self {
        Self::from_inner(LruBase::new(max_bytes, helper))
    }

    pub fn from_inner(lru: LruBase<V, H>) -> Self {
        Self {
            inner: Mutex::new(lru),
        }
    }

    pub fn into_inner(self) -> LruBase<V, H> {
        self.inner.into_inner()
    }

    pub fn get_and_freshen(&self, key: impl AsRef<[u8]>) -> Option<V> {
        self.inner.lock().get_and_freshen(key).cloned()
    }

    pub fn get_no_freshen(&self, key: impl AsRef<[u8]>) -> Option<V> {
        self.inner.lock().get_no_freshen(key).cloned()
    }

    pub fn put(&self, key: impl AsRef<[u8]>, value: V) -> PutOutcome {
        self.inner.lock().put(key, value)
    }

    pub fn delete(&self, key: impl AsRef<[u8]>) -> bool {
        self.inner.lock().delete(key)
    }

    pub fn contains(&self, key: impl AsRef<[u8]>) -> bool {
        self.inner.lock().contains(key)
    }

    pub fn clear(&self) {
        self.inner.lock().clear();
    }

    pub fn set_max_bytes(&self, max_bytes: usize) {
        self.inner.lock().set_max_bytes(max_bytes);
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }

    pub fn size_bytes(&self) -> usize {
        self.inner.lock().size_bytes()
    }

    pub fn stats(&self) -> LruStatsSnapshot {
        self.inner.lock().stats()
    }

    /// Runs `f` with exclusive access to the substrate.
    pub fn with_inner<R>(&self, f: impl FnOnce(&mut LruBase<V, H>) -> R) -> R {
        f(&mut self.inner.lock())
    }
}

/// [`PurgeSet`] behind a mutex.
#[derive(Debug, Default)]
pub struct ConcurrentPurgeSet {
    inner: Mutex<PurgeSet>,
}

impl ConcurrentPurgeSet {
    pub fn new(max_bytes: usize) -> Self {
        Self::from_inner(PurgeSet::new(max_bytes))
    }

    pub fn from_inner(purges: PurgeSet) -> Self {
        Self {
            inner: Mutex::new(purges),
        }
    }

    pub fn into_inner(self) -> PurgeSet {
        self.inner.into_inner()
    }

    pub fn put(&self, key: impl AsRef<[u8]>, timestamp_ms: i64) -> Result<(), ClockSkewError> {
        self.inner.lock().put(key, timestamp_ms)
    }

    pub fn update_global_invalidation_timestamp(
        &self,
        timestamp_ms: i64,
    ) -> Result<(), ClockSkewError> {
        self.inner
            .lock()
            .update_global_invalidation_timestamp(timestamp_ms)
    }

    pub fn is_valid(&self, key: impl AsRef<[u8]>, timestamp_ms: i64) -> bool {
        self.inner.lock().is_valid(key, timestamp_ms)
    }

    /// Merges a private purge set into the shared one.
    pub fn merge(&self, src: &PurgeSet) {
        self.inner.lock().merge(src);
    }

    /// Copies the current state out, e.g. to publish it elsewhere.
    pub fn snapshot_set(&self) -> PurgeSet {
        self.inner.lock().clone()
    }

    /// Replaces the shared set with `purges`, returning the previous one.
    pub fn replace(&self, mut purges: PurgeSet) -> PurgeSet {
        self.inner.lock().swap(&mut purges);
        purges
    }

    pub fn clear(&self) {
        self.inner.lock().clear();
    }

    pub fn global_invalidation_timestamp_ms(&self) -> i64 {
        self.inner.lock().global_invalidation_timestamp_ms()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }

    pub fn snapshot(&self) -> PurgeSetSnapshot {
        self.inner.lock().snapshot()
    }

    pub fn with_inner<R>(&self, f: impl FnOnce(&mut PurgeSet) -> R) -> R {
        f(&mut self.inner.lock())
    }
}
