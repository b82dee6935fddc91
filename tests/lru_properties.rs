// ==============================================
// PROPERTY TESTS (integration)
// ==============================================
//
// Random operation sequences against LruBase and PurgeSet. The substrate is
// compared with a deliberately naive VecDeque model; the purge set is checked
// for the safety properties callers rely on.

use std::collections::VecDeque;

use proptest::prelude::*;
use purgekit::prelude::*;

// ==============================================
// Substrate vs. model
// ==============================================

#[derive(Debug, Clone)]
enum LruOp {
    Put(u8, Vec<u8>),
    Get(u8),
    Delete(u8),
    SetMaxBytes(usize),
}

fn lru_op() -> impl Strategy<Value = LruOp> {
    prop_oneof![
        6 => (0u8..8, prop::collection::vec(0u8..4, 0..12))
            .prop_map(|(k, v)| LruOp::Put(k, v)),
        3 => (0u8..8).prop_map(LruOp::Get),
        1 => (0u8..8).prop_map(LruOp::Delete),
        1 => (1usize..64).prop_map(LruOp::SetMaxBytes),
    ]
}

/// Oldest first, like `LruBase::iter`.
#[derive(Debug, Default)]
struct Model {
    entries: VecDeque<(u8, Vec<u8>)>,
    max_bytes: usize,
    evictions: u64,
}

impl Model {
    fn charge(value: &[u8]) -> usize {
        1 + value.len()
    }

    fn bytes(&self) -> usize {
        self.entries.iter().map(|(_, v)| Self::charge(v)).sum()
    }

    fn position(&self, key: u8) -> Option<usize> {
        self.entries.iter().position(|(k, _)| *k == key)
    }

    fn freshen(&mut self, pos: usize) {
        if let Some(entry) = self.entries.remove(pos) {
            self.entries.push_back(entry);
        }
    }

    fn put(&mut self, key: u8, value: Vec<u8>) -> PutOutcome {
        let mut replaced = false;
        if let Some(pos) = self.position(key) {
            if self.entries[pos].1 == value {
                self.freshen(pos);
                return PutOutcome::Identical;
            }
            self.entries.remove(pos);
            replaced = true;
        }
        let needed = Self::charge(&value);
        if needed > self.max_bytes {
            return PutOutcome::Rejected;
        }
        while self.bytes() + needed > self.max_bytes {
            if self.entries.pop_front().is_none() {
                break;
            }
            self.evictions += 1;
        }
        self.entries.push_back((key, value));
        if replaced {
            PutOutcome::Replaced
        } else {
            PutOutcome::Inserted
        }
    }

    fn get(&mut self, key: u8) -> Option<Vec<u8>> {
        let pos = self.position(key)?;
        let value = self.entries[pos].1.clone();
        self.freshen(pos);
        Some(value)
    }

    fn delete(&mut self, key: u8) -> bool {
        match self.position(key) {
            Some(pos) => {
                self.entries.remove(pos);
                true
            }
            None => false,
        }
    }
}

proptest! {
    /// Property: LruBase agrees with the model on content, order and outcomes
    #[cfg_attr(miri, ignore)]
    #[test]
    fn prop_matches_model(
        max_bytes in 1usize..64,
        ops in prop::collection::vec(lru_op(), 0..200)
    ) {
        let mut lru: LruBase<Vec<u8>, ByteLenHelper> =
            LruBase::new(max_bytes, ByteLenHelper::new());
        let mut model = Model { max_bytes, ..Default::default() };
        // A lowered budget is only enforced by the next admitted put.
        let mut over_budget_allowed = false;

        for op in ops {
            match op {
                LruOp::Put(k, v) => {
                    let outcome = lru.put([k], v.clone());
                    prop_assert_eq!(outcome, model.put(k, v));
                    if matches!(outcome, PutOutcome::Inserted | PutOutcome::Replaced) {
                        over_budget_allowed = false;
                    }
                }
                LruOp::Get(k) => {
                    prop_assert_eq!(lru.get_and_freshen([k]).cloned(), model.get(k));
                }
                LruOp::Delete(k) => {
                    prop_assert_eq!(lru.delete([k]), model.delete(k));
                }
                LruOp::SetMaxBytes(bytes) => {
                    lru.set_max_bytes(bytes);
                    model.max_bytes = bytes;
                    over_budget_allowed |= lru.size_bytes() > bytes;
                }
            }

            let keys: Vec<u8> = lru.iter().map(|(k, _)| k[0]).collect();
            let expected: Vec<u8> = model.entries.iter().map(|(k, _)| *k).collect();
            prop_assert_eq!(keys, expected);
            prop_assert_eq!(lru.size_bytes(), model.bytes());
            prop_assert_eq!(lru.num_elements(), model.entries.len());
            if !over_budget_allowed {
                prop_assert!(lru.check_invariants().is_ok());
            }
        }
    }

    /// Property: evict_notify fires exactly once per eviction
    #[cfg_attr(miri, ignore)]
    #[test]
    fn prop_notify_count_matches_evictions(
        max_bytes in 1usize..32,
        puts in prop::collection::vec((0u8..16, prop::collection::vec(any::<u8>(), 0..8)), 0..100)
    ) {
        let mut lru: LruBase<Vec<u8>, ByteLenHelper> =
            LruBase::new(max_bytes, ByteLenHelper::new());
        for (k, v) in puts {
            lru.put([k], v);
            prop_assert_eq!(lru.helper().evictions(), lru.stats().evictions);
            prop_assert!(lru.size_bytes() <= lru.max_bytes());
        }
        lru.sanity_check();
    }
}

// ==============================================
// Purge set
// ==============================================

#[derive(Debug, Clone)]
enum PurgeOp {
    Put(u8, i64),
    Global(i64),
}

fn purge_op(max_ts: i64) -> impl Strategy<Value = PurgeOp> {
    prop_oneof![
        5 => (0u8..8, 0..max_ts).prop_map(|(k, t)| PurgeOp::Put(k, t)),
        1 => (0..max_ts).prop_map(PurgeOp::Global),
    ]
}

fn key(k: u8) -> String {
    format!("k{k}")
}

fn build(max_bytes: usize, ops: &[PurgeOp]) -> PurgeSet {
    let mut purges = PurgeSet::new(max_bytes);
    for op in ops {
        let _ = match *op {
            PurgeOp::Put(k, t) => purges.put(key(k), t),
            PurgeOp::Global(t) => purges.update_global_invalidation_timestamp(t),
        };
    }
    purges
}

proptest! {
    /// Property: once a purge is accepted, matching cache entries stay invalid
    #[cfg_attr(miri, ignore)]
    #[test]
    fn prop_purges_are_never_forgotten(
        max_bytes in 10usize..60,
        ops in prop::collection::vec(purge_op(2_000), 0..150)
    ) {
        let mut purges = PurgeSet::new(max_bytes);
        let mut accepted: Vec<(u8, i64)> = Vec::new();
        let mut last_global = purges.global_invalidation_timestamp_ms();

        for op in ops {
            match op {
                PurgeOp::Put(k, t) => {
                    purges.put(key(k), t).unwrap();
                    accepted.push((k, t));
                }
                PurgeOp::Global(t) => {
                    purges.update_global_invalidation_timestamp(t).unwrap();
                    for k in 0..8 {
                        accepted.push((k, t));
                    }
                }
            }

            let global = purges.global_invalidation_timestamp_ms();
            prop_assert!(global >= last_global);
            last_global = global;

            for &(k, t) in &accepted {
                prop_assert!(!purges.is_valid(key(k), t));
            }
            for (_, record_ms) in purges.iter() {
                prop_assert!(record_ms > global);
            }
            purges.sanity_check();
        }
    }

    /// Property: a rejected timestamp leaves the set untouched
    #[cfg_attr(miri, ignore)]
    #[test]
    fn prop_rejected_timestamp_is_no_op(
        ops in prop::collection::vec(purge_op(1_000), 0..80)
    ) {
        let mut purges = PurgeSetBuilder::new(50)
            .clock_skew_allowance_ms(100)
            .try_build()
            .unwrap();

        for op in ops {
            let before = purges.clone();
            let last_seen = purges.last_seen_timestamp_ms();
            let result = match op {
                PurgeOp::Put(k, t) => purges.put(key(k), t),
                PurgeOp::Global(t) => purges.update_global_invalidation_timestamp(t),
            };
            match result {
                Ok(()) => prop_assert!(purges.last_seen_timestamp_ms() >= last_seen),
                Err(err) => {
                    prop_assert!(err.skew_ms() > 100);
                    prop_assert_eq!(&purges, &before);
                    prop_assert_eq!(purges.last_seen_timestamp_ms(), last_seen);
                }
            }
        }
    }

    /// Property: merge is commutative for equal budgets
    #[cfg_attr(miri, ignore)]
    #[test]
    fn prop_merge_is_commutative(
        max_bytes in 10usize..80,
        left in prop::collection::vec(purge_op(5_000), 0..40),
        right in prop::collection::vec(purge_op(5_000), 0..40)
    ) {
        let a = build(max_bytes, &left);
        let b = build(max_bytes, &right);

        let mut ab = a.clone();
        ab.merge(&b);
        let mut ba = b.clone();
        ba.merge(&a);

        prop_assert_eq!(&ab, &ba);
        prop_assert_eq!(
            ab.global_invalidation_timestamp_ms(),
            ba.global_invalidation_timestamp_ms()
        );
        prop_assert!(
            ab.global_invalidation_timestamp_ms()
                >= a.global_invalidation_timestamp_ms()
                    .max(b.global_invalidation_timestamp_ms())
        );
        ab.sanity_check();
    }

    /// Property: merging loses no purge from either side
    #[cfg_attr(miri, ignore)]
    #[test]
    fn prop_merge_keeps_every_purge(
        left in prop::collection::vec((0u8..8, 0i64..5_000), 0..30),
        right in prop::collection::vec((0u8..8, 0i64..5_000), 0..30)
    ) {
        let mut a = PurgeSet::new(40);
        let mut b = PurgeSet::new(40);
        for &(k, t) in &left {
            a.put(key(k), t).unwrap();
        }
        for &(k, t) in &right {
            b.put(key(k), t).unwrap();
        }

        a.merge(&b);
        for &(k, t) in left.iter().chain(&right) {
            prop_assert!(!a.is_valid(key(k), t));
        }
    }
}
