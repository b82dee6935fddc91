//! Arena-backed doubly linked recency list.
//!
//! Nodes live in a slot vector and link to each other by [`NodeId`], so a
//! handle stays valid across insertions and removals of *other* nodes. The
//! front of the list is the most recently used entry, the back the least
//! recently used one.
//!
//! ```text
//!   slots: Vec<Option<Node<T>>>          free: Vec<usize>
//!   ┌────┬──────────────────────────┐    ┌───┐
//!   │ 0  │ { A, prev: -, next: 2 }  │    │ 1 │  (reused by next push)
//!   │ 1  │ None                     │    └───┘
//!   │ 2  │ { B, prev: 0, next: 3 }  │
//!   │ 3  │ { C, prev: 2, next: - }  │
//!   └────┴──────────────────────────┘
//!
//!   head (MRU) ─► [0] ◄──► [2] ◄──► [3] ◄── tail (LRU)
//! ```
//!
//! All operations except iteration and [`RecencyList::check_links`] are O(1).

use crate::error::InvariantError;

/// Stable handle to a node in a [`RecencyList`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

impl NodeId {
    /// Returns the slot index backing this handle.
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone)]
struct Node<T> {
    value: T,
    prev: Option<NodeId>,
    next: Option<NodeId>,
}

/// Doubly linked list whose nodes are addressed by stable [`NodeId`]s.
#[derive(Debug, Clone)]
pub struct RecencyList<T> {
    slots: Vec<Option<Node<T>>>,
    free: Vec<usize>,
    head: Option<NodeId>,
    tail: Option<NodeId>,
    len: usize,
}

impl<T> RecencyList<T> {
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    /// Creates an empty list with room for `capacity` nodes before reallocating.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: Vec::with_capacity(capacity),
            free: Vec::new(),
            head: None,
            tail: None,
            len: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns `true` if `id` refers to a live node.
    pub fn contains(&self, id: NodeId) -> bool {
        self.node(id).is_some()
    }

    /// Handle of the most recently used node.
    pub fn front_id(&self) -> Option<NodeId> {
        self.head
    }

    /// Handle of the least recently used node.
    pub fn back_id(&self) -> Option<NodeId> {
        self.tail
    }

    pub fn get(&self, id: NodeId) -> Option<&T> {
        self.node(id).map(|node| &node.value)
    }

    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut T> {
        self.node_mut(id).map(|node| &mut node.value)
    }

    /// Links `value` in at the front and returns its handle.
    pub fn push_front(&mut self, value: T) -> NodeId {
        let node = Node {
            value,
            prev: None,
            next: self.head,
        };
        let id = match self.free.pop() {
            Some(idx) => {
                self.slots[idx] = Some(node);
                NodeId(idx)
            },
            None => {
                self.slots.push(Some(node));
                NodeId(self.slots.len() - 1)
            },
        };
        match self.head {
            Some(old_head) => {
                if let Some(head) = self.node_mut(old_head) {
                    head.prev = Some(id);
                }
            },
            None => self.tail = Some(id),
        }
        self.head = Some(id);
        self.len += 1;
        id
    }

    /// Unlinks and returns the least recently used value.
    pub fn pop_back(&mut self) -> Option<T> {
        let id = self.tail?;
        self.remove(id)
    }

    /// Unlinks `id` and frees its slot.
    pub fn remove(&mut self, id: NodeId) -> Option<T> {
        self.unlink(id)?;
        let node = self.slots.get_mut(id.0)?.take()?;
        self.free.push(id.0);
        self.len -= 1;
        Some(node.value)
    }

    /// Moves `id` to the front; returns `false` if `id` is not live.
    pub fn move_to_front(&mut self, id: NodeId) -> bool {
        if !self.contains(id) {
            return false;
        }
        if self.head == Some(id) {
            return true;
        }
        self.unlink(id);
        let old_head = self.head;
        if let Some(node) = self.node_mut(id) {
            node.prev = None;
            node.next = old_head;
        }
        match old_head {
            Some(old_head) => {
                if let Some(head) = self.node_mut(old_head) {
                    head.prev = Some(id);
                }
            },
            None => self.tail = Some(id),
        }
        self.head = Some(id);
        true
    }

    /// Drops every node and releases slot bookkeeping.
    pub fn clear(&mut self) {
        self.slots.clear();
        self.free.clear();
        self.head = None;
        self.tail = None;
        self.len = 0;
    }

    /// Iterates from the back (LRU) to the front (MRU).
    pub fn iter_oldest_first(&self) -> Iter<'_, T> {
        Iter {
            list: self,
            oldest: self.tail,
            newest: self.head,
            remaining: self.len,
        }
    }

    /// Walks the list in both directions and checks that the links agree
    /// with each other and with the live-slot count.
    pub fn check_links(&self) -> Result<(), InvariantError> {
        let live = self.slots.iter().filter(|slot| slot.is_some()).count();
        if live != self.len {
            return Err(InvariantError::new(format!(
                "recency list holds {live} live slots but reports len {}",
                self.len
            )));
        }

        let mut forward = 0usize;
        let mut prev = None;
        let mut cursor = self.head;
        while let Some(id) = cursor {
            let node = self
                .node(id)
                .ok_or_else(|| InvariantError::new(format!("dangling link to slot {}", id.0)))?;
            if node.prev != prev {
                return Err(InvariantError::new(format!(
                    "slot {} has prev {:?}, expected {:?}",
                    id.0, node.prev, prev
                )));
            }
            forward += 1;
            if forward > self.len {
                return Err(InvariantError::new("forward walk exceeds len (cycle)"));
            }
            prev = cursor;
            cursor = node.next;
        }
        if prev != self.tail {
            return Err(InvariantError::new("forward walk does not end at tail"));
        }

        let mut backward = 0usize;
        let mut next = None;
        let mut cursor = self.tail;
        while let Some(id) = cursor {
            let node = self
                .node(id)
                .ok_or_else(|| InvariantError::new(format!("dangling link to slot {}", id.0)))?;
            if node.next != next {
                return Err(InvariantError::new(format!(
                    "slot {} has next {:?}, expected {:?}",
                    id.0, node.next, next
                )));
            }
            backward += 1;
            if backward > self.len {
                return Err(InvariantError::new("backward walk exceeds len (cycle)"));
            }
            next = cursor;
            cursor = node.prev;
        }
        if next != self.head {
            return Err(InvariantError::new("backward walk does not end at head"));
        }

        if forward != self.len || backward != self.len {
            return Err(InvariantError::new(format!(
                "walked {forward} forward and {backward} backward, len is {}",
                self.len
            )));
        }
        Ok(())
    }

    fn node(&self, id: NodeId) -> Option<&Node<T>> {
        self.slots.get(id.0).and_then(Option::as_ref)
    }

    fn node_mut(&mut self, id: NodeId) -> Option<&mut Node<T>> {
        self.slots.get_mut(id.0).and_then(Option::as_mut)
    }

    fn unlink(&mut self, id: NodeId) -> Option<()> {
        let (prev, next) = {
            let node = self.node(id)?;
            (node.prev, node.next)
        };
        match prev {
            Some(prev_id) => {
                if let Some(prev_node) = self.node_mut(prev_id) {
                    prev_node.next = next;
                }
            },
            None => self.head = next,
        }
        match next {
            Some(next_id) => {
                if let Some(next_node) = self.node_mut(next_id) {
                    next_node.prev = prev;
                }
            },
            None => self.tail = prev,
        }
        if let Some(node) = self.node_mut(id) {
            node.prev = None;
            node.next = None;
        }
        Some(())
    }
}

impl<T> Default for RecencyList<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Oldest-to-newest iterator over a [`RecencyList`].
///
/// Reversible: `next_back` yields from the most recently used end.
pub struct Iter<'a, T> {
    list: &'a RecencyList<T>,
    oldest: Option<NodeId>,
    newest: Option<NodeId>,
    remaining: usize,
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let node = self.list.node(self.oldest?)?;
        self.oldest = node.prev;
        self.remaining -= 1;
        Some(&node.value)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<T> DoubleEndedIterator for Iter<'_, T> {
    fn next_back(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let node = self.list.node(self.newest?)?;
        self.newest = node.next;
        self.remaining -= 1;
        Some(&node.value)
    }
}

impl<T> ExactSizeIterator for Iter<'_, T> {}

#[cfg(test)]
mod tests {
    use super::*;

    fn oldest_first<T: Copy>(list: &RecencyList<T>) -> Vec<T> {
        list.iter_oldest_first().copied().collect()
    }

    #[test]
    fn push_front_orders_newest_last() {
        let mut list = RecencyList::new();
        list.push_front("a");
        list.push_front("b");
        list.push_front("c");
        assert_eq!(oldest_first(&list), vec!["a", "b", "c"]);
        assert_eq!(list.len(), 3);
        list.check_links().unwrap();
    }

    #[test]
    fn move_to_front_reorders() {
        let mut list = RecencyList::new();
        let a = list.push_front(1);
        let b = list.push_front(2);
        let _c = list.push_front(3);

        assert!(list.move_to_front(a));
        assert_eq!(oldest_first(&list), vec![2, 3, 1]);
        assert!(list.move_to_front(a));
        assert_eq!(list.front_id(), Some(a));
        assert_eq!(list.back_id(), Some(b));
        list.check_links().unwrap();
    }

    #[test]
    fn pop_back_takes_oldest() {
        let mut list = RecencyList::new();
        list.push_front('x');
        list.push_front('y');
        assert_eq!(list.pop_back(), Some('x'));
        assert_eq!(list.pop_back(), Some('y'));
        assert_eq!(list.pop_back(), None);
        assert!(list.is_empty());
        assert_eq!(list.front_id(), None);
        assert_eq!(list.back_id(), None);
    }

    #[test]
    fn handles_survive_unrelated_removals() {
        let mut list = RecencyList::new();
        let a = list.push_front("a");
        let b = list.push_front("b");
        let c = list.push_front("c");

        assert_eq!(list.remove(b), Some("b"));
        assert_eq!(list.get(a), Some(&"a"));
        assert_eq!(list.get(c), Some(&"c"));
        assert!(!list.contains(b));
        assert!(!list.move_to_front(b));

        let d = list.push_front("d");
        assert_eq!(d.index(), b.index(), "freed slot is reused");
        assert_eq!(oldest_first(&list), vec!["a", "c", "d"]);
        list.check_links().unwrap();
    }

    #[test]
    fn iterator_is_double_ended_and_exact() {
        let mut list = RecencyList::new();
        for i in 0..5 {
            list.push_front(i);
        }
        let mut iter = list.iter_oldest_first();
        assert_eq!(iter.len(), 5);
        assert_eq!(iter.next(), Some(&0));
        assert_eq!(iter.next_back(), Some(&4));
        assert_eq!(iter.len(), 3);
        let middle: Vec<_> = iter.copied().collect();
        assert_eq!(middle, vec![1, 2, 3]);

        let newest_first: Vec<_> = list.iter_oldest_first().rev().copied().collect();
        assert_eq!(newest_first, vec![4, 3, 2, 1, 0]);
    }

    #[test]
    fn get_mut_edits_in_place() {
        let mut list = RecencyList::new();
        let id = list.push_front(10);
        if let Some(value) = list.get_mut(id) {
            *value = 20;
        }
        assert_eq!(list.get(id), Some(&20));
    }

    #[test]
    fn check_links_reports_broken_next_link() {
        let mut list = RecencyList::new();
        let a = list.push_front('a');
        let _b = list.push_front('b');
        let c = list.push_front('c');
        list.check_links().unwrap();

        // c (head) skips b and points straight at a
        if let Some(node) = list.node_mut(c) {
            node.next = Some(a);
        }
        assert!(list.check_links().is_err());
    }

    #[test]
    fn check_links_reports_stale_head() {
        let mut list = RecencyList::new();
        list.push_front(1);
        let b = list.push_front(2);
        list.push_front(3);

        list.head = Some(b);
        assert!(list.check_links().is_err());
    }

    #[test]
    fn clear_resets_everything() {
        let mut list = RecencyList::with_capacity(4);
        let a = list.push_front(1);
        list.push_front(2);
        list.clear();
        assert!(list.is_empty());
        assert!(!list.contains(a));
        assert_eq!(list.iter_oldest_first().count(), 0);
        list.check_links().unwrap();
    }
}
