//! Value helper contract for [`LruBase`](crate::lru_base::LruBase).
//!
//! The substrate never looks inside a value. Everything it needs to know
//! (how many bytes a value costs, whether two values are the same, whether a
//! re-put should win, and what to do when a value is evicted) comes from a
//! [`ValueHelper`].
//!
//! The substrate owns its helper. A caller that wants to keep ownership can
//! hand in `&mut H` instead, since every `&mut H` is itself a helper.

/// Policy hooks the substrate consults for value type `V`.
///
/// Implementations must not panic: hooks run in the middle of a mutation
/// and the substrate does not roll back.
pub trait ValueHelper<V> {
    /// Bytes attributed to `value`. Must be a pure function of the value.
    fn size(&self, value: &V) -> usize;

    /// Semantic equality, used to detect identical re-puts.
    fn equal(&self, a: &V, b: &V) -> bool;

    /// Whether `new` should supersede `old` when a key is re-put.
    ///
    /// When this returns `false` the existing entry is kept and freshened.
    fn should_replace(&self, old: &V, new: &V) -> bool;

    /// Called exactly once for each entry removed because of size pressure,
    /// before the value is dropped. Not called on delete, clear or drop.
    fn evict_notify(&mut self, value: &V);
}

impl<V, H> ValueHelper<V> for &mut H
where
    H: ValueHelper<V> + ?Sized,
{
    fn size(&self, value: &V) -> usize {
        (**self).size(value)
    }

    fn equal(&self, a: &V, b: &V) -> bool {
        (**self).equal(a, b)
    }

    fn should_replace(&self, old: &V, new: &V) -> bool {
        (**self).should_replace(old, new)
    }

    fn evict_notify(&mut self, value: &V) {
        (**self).evict_notify(value)
    }
}

/// Helper for byte-like values: size is the value's length, equality is
/// byte equality, every re-put replaces, and evictions are counted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ByteLenHelper {
    evictions: u64,
}

impl ByteLenHelper {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `evict_notify` calls received so far.
    pub fn evictions(&self) -> u64 {
        self.evictions
    }
}

impl<V: AsRef<[u8]>> ValueHelper<V> for ByteLenHelper {
    fn size(&self, value: &V) -> usize {
        value.as_ref().len()
    }

    fn equal(&self, a: &V, b: &V) -> bool {
        a.as_ref() == b.as_ref()
    }

    fn should_replace(&self, _old: &V, _new: &V) -> bool {
        true
    }

    fn evict_notify(&mut self, _value: &V) {
        self.evictions += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn byte_len_helper_measures_length() {
        let helper = ByteLenHelper::new();
        assert_eq!(ValueHelper::<&str>::size(&helper, &"abcd"), 4);
        assert_eq!(ValueHelper::<Vec<u8>>::size(&helper, &vec![0u8; 7]), 7);
        assert!(ValueHelper::<&str>::equal(&helper, &"x", &"x"));
        assert!(!ValueHelper::<&str>::equal(&helper, &"x", &"y"));
        assert!(ValueHelper::<&str>::should_replace(&helper, &"x", &"x"));
    }

    #[test]
    fn borrowed_helper_forwards_to_owner() {
        let mut owned = ByteLenHelper::new();
        {
            let mut borrowed = &mut owned;
            ValueHelper::<String>::evict_notify(&mut borrowed, &"gone".to_string());
            assert_eq!(ValueHelper::<String>::size(&borrowed, &"abc".to_string()), 3);
        }
        assert_eq!(owned.evictions(), 1);
    }
}
