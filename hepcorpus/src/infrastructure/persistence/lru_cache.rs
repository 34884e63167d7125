// /////////////////////////////////////////////////////////////////////////////
// HEPCorpus Aggregator
// Copyright (c) 2025 HEPCorpus Contributors
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # LRU Writer Cache
//!
//! A fixed-capacity pool of open per-variable record writers, keyed by
//! variable name and evicted in least-recently-used order. Large corpora
//! touch tens of thousands of variables; the cache bounds the open-file
//! population while keeping the hot variables' writers resident.
//!
//! ## Structure
//!
//! The doubly-linked recency list lives in an arena: nodes are slots in a
//! `Vec`, links are stable indices, and the key map stores indices rather
//! than owning pointers. Unlinking, promotion and eviction are all O(1)
//! index surgery; no reference cycles, no unsafe.
//!
//! ## Eviction contract
//!
//! Evicting a writer calls [`EvictableWriter::close`] exactly once,
//! *before* the entry leaves the map, with the currently-active
//! transaction - so whatever cleanup the writer schedules (pending bytes,
//! file closures) lands in that transaction. Evicting mid-submission is
//! legal: the transaction holds buffers by file-handle identity, not by
//! writer identity, so an evicted writer's residual bytes still commit.

use std::collections::HashMap;

use tracing::debug;

use hepcorpus_domain::CorpusError;

use super::transaction::Transaction;

/// Default bound on concurrently open writers.
pub const DEFAULT_CAPACITY: usize = 100;

/// A cache value that needs transactional cleanup when evicted.
pub trait EvictableWriter {
    /// Schedules this writer's cleanup into `txn`. Called exactly once.
    fn close(&mut self, txn: &mut Transaction) -> Result<(), CorpusError>;
}

struct Node<V> {
    key: String,
    value: V,
    prev: Option<usize>,
    next: Option<usize>,
}

/// Fixed-capacity LRU cache of writers; head = most recently used.
pub struct WriterCache<V> {
    capacity: usize,
    slots: Vec<Option<Node<V>>>,
    free: Vec<usize>,
    by_key: HashMap<String, usize>,
    head: Option<usize>,
    tail: Option<usize>,
}

impl<V: EvictableWriter> WriterCache<V> {
    /// Creates an empty cache holding at most `capacity` writers.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            slots: Vec::new(),
            free: Vec::new(),
            by_key: HashMap::new(),
            head: None,
            tail: None,
        }
    }

    /// Looks up the writer for `key`, constructing it with `create` on a
    /// miss. On a full cache the least-recently-used writer is closed into
    /// `txn` and dropped before the new one is built. The returned writer
    /// is at the head of the recency list.
    pub fn get(
        &mut self,
        key: &str,
        txn: &mut Transaction,
        create: impl FnOnce(&str, &mut Transaction) -> Result<V, CorpusError>,
    ) -> Result<&mut V, CorpusError> {
        if let Some(&idx) = self.by_key.get(key) {
            self.promote(idx);
            return Ok(&mut self.node_mut(idx).value);
        }

        if self.by_key.len() >= self.capacity {
            self.evict_tail(txn)?;
        }

        let value = create(key, txn)?;
        let idx = self.push_head(key, value);
        Ok(&mut self.node_mut(idx).value)
    }

    /// Closes every cached writer into `txn`, least-recently-used first.
    pub fn close_all(&mut self, txn: &mut Transaction) -> Result<(), CorpusError> {
        while self.tail.is_some() {
            self.evict_tail(txn)?;
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.by_key.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_key.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn contains(&self, key: &str) -> bool {
        self.by_key.contains_key(key)
    }

    /// Keys from most to least recently used.
    pub fn keys_front_to_back(&self) -> Vec<&str> {
        let mut keys = Vec::with_capacity(self.by_key.len());
        let mut cursor = self.head;
        while let Some(idx) = cursor {
            let node = self.node(idx);
            keys.push(node.key.as_str());
            cursor = node.next;
        }
        keys
    }

    /// Keys from least to most recently used.
    pub fn keys_back_to_front(&self) -> Vec<&str> {
        let mut keys = Vec::with_capacity(self.by_key.len());
        let mut cursor = self.tail;
        while let Some(idx) = cursor {
            let node = self.node(idx);
            keys.push(node.key.as_str());
            cursor = node.prev;
        }
        keys
    }

    fn node(&self, idx: usize) -> &Node<V> {
        self.slots[idx].as_ref().expect("cache invariant: live slot")
    }

    fn node_mut(&mut self, idx: usize) -> &mut Node<V> {
        self.slots[idx].as_mut().expect("cache invariant: live slot")
    }

    fn unlink(&mut self, idx: usize) {
        let (prev, next) = {
            let node = self.node(idx);
            (node.prev, node.next)
        };

        if self.head == Some(idx) {
            self.head = next;
        }
        if self.tail == Some(idx) {
            self.tail = prev;
        }
        if let Some(p) = prev {
            self.node_mut(p).next = next;
        }
        if let Some(n) = next {
            self.node_mut(n).prev = prev;
        }

        let node = self.node_mut(idx);
        node.prev = None;
        node.next = None;
    }

    /// Moves a linked node to the head of the list.
    fn promote(&mut self, idx: usize) {
        if self.head == Some(idx) {
            return;
        }
        self.unlink(idx);
        self.link_head(idx);
    }

    fn link_head(&mut self, idx: usize) {
        self.node_mut(idx).next = self.head;
        if let Some(old_head) = self.head {
            self.node_mut(old_head).prev = Some(idx);
        }
        self.head = Some(idx);
        if self.tail.is_none() {
            self.tail = Some(idx);
        }
    }

    fn push_head(&mut self, key: &str, value: V) -> usize {
        let node = Node {
            key: key.to_string(),
            value,
            prev: None,
            next: None,
        };
        let idx = match self.free.pop() {
            Some(idx) => {
                self.slots[idx] = Some(node);
                idx
            }
            None => {
                self.slots.push(Some(node));
                self.slots.len() - 1
            }
        };
        self.link_head(idx);
        self.by_key.insert(key.to_string(), idx);
        idx
    }

    /// Closes and removes the least-recently-used writer.
    fn evict_tail(&mut self, txn: &mut Transaction) -> Result<(), CorpusError> {
        let tail_idx = self.tail.ok_or_else(|| {
            CorpusError::internal_error("eviction requested on an empty writer cache")
        })?;

        // Close before the entry leaves the map, so cleanup failures leave
        // the cache observable.
        self.node_mut(tail_idx).value.close(txn)?;

        let key = self.node(tail_idx).key.clone();
        debug!(key = %key, "evicted writer");
        self.by_key.remove(&key);
        self.unlink(tail_idx);
        self.slots[tail_idx] = None;
        self.free.push(tail_idx);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::collections::HashMap as StdHashMap;
    use std::rc::Rc;

    struct DummyWriter {
        closes: Rc<Cell<usize>>,
    }

    impl EvictableWriter for DummyWriter {
        fn close(&mut self, _txn: &mut Transaction) -> Result<(), CorpusError> {
            self.closes.set(self.closes.get() + 1);
            Ok(())
        }
    }

    struct Harness {
        cache: WriterCache<DummyWriter>,
        closes: StdHashMap<String, Rc<Cell<usize>>>,
    }

    impl Harness {
        fn new(capacity: usize) -> Self {
            Self {
                cache: WriterCache::new(capacity),
                closes: StdHashMap::new(),
            }
        }

        fn get(&mut self, key: &str, txn: &mut Transaction) {
            let counter = self
                .closes
                .entry(key.to_string())
                .or_insert_with(|| Rc::new(Cell::new(0)))
                .clone();
            self.cache
                .get(key, txn, |_, _| Ok(DummyWriter { closes: counter }))
                .unwrap();
            self.check_invariants();
        }

        fn close_count(&self, key: &str) -> usize {
            self.closes[key].get()
        }

        /// Forward and backward traversal must agree, and so must the map
        /// and list sizes.
        fn check_invariants(&self) {
            let forward = self.cache.keys_front_to_back();
            let mut backward = self.cache.keys_back_to_front();
            backward.reverse();
            assert_eq!(forward, backward);
            assert_eq!(forward.len(), self.cache.len());
            assert!(self.cache.len() <= self.cache.capacity());
        }
    }

    #[test]
    fn test_single_element() {
        let mut h = Harness::new(3);
        let mut txn = Transaction::begin();

        h.get("1", &mut txn);
        h.get("1", &mut txn);
        assert_eq!(h.cache.keys_front_to_back(), vec!["1"]);
        assert_eq!(h.close_count("1"), 0);
    }

    #[test]
    fn test_single_element_capacity_evicts() {
        let mut h = Harness::new(1);
        let mut txn = Transaction::begin();

        h.get("a", &mut txn);
        h.get("b", &mut txn);
        assert_eq!(h.cache.keys_front_to_back(), vec!["b"]);
        assert_eq!(h.close_count("a"), 1);
        assert_eq!(h.close_count("b"), 0);

        // Re-inserting a previously evicted key builds a fresh writer.
        h.get("a", &mut txn);
        assert_eq!(h.close_count("b"), 1);
        assert_eq!(h.cache.keys_front_to_back(), vec!["a"]);
    }

    #[test]
    fn test_promotion_order() {
        let mut h = Harness::new(3);
        let mut txn = Transaction::begin();

        h.get("a", &mut txn);
        h.get("b", &mut txn);
        h.get("a", &mut txn);
        assert_eq!(h.cache.keys_front_to_back(), vec!["a", "b"]);
    }

    #[test]
    fn test_eviction_scenario_capacity_three() {
        let mut h = Harness::new(3);
        let mut txn = Transaction::begin();

        h.get("1", &mut txn);
        h.get("2", &mut txn);
        h.get("1", &mut txn);
        h.get("3", &mut txn);
        h.get("4", &mut txn);

        assert_eq!(h.cache.keys_front_to_back(), vec!["4", "3", "1"]);
        assert_eq!(h.close_count("2"), 1);
        assert_eq!(h.close_count("1"), 0);
        assert_eq!(h.close_count("3"), 0);
        assert_eq!(h.close_count("4"), 0);
    }

    #[test]
    fn test_close_all_closes_each_exactly_once() {
        let mut h = Harness::new(4);
        let mut txn = Transaction::begin();

        for key in ["w", "x", "y", "z"] {
            h.get(key, &mut txn);
        }
        h.cache.close_all(&mut txn).unwrap();

        assert!(h.cache.is_empty());
        assert_eq!(h.cache.keys_front_to_back(), Vec::<&str>::new());
        for key in ["w", "x", "y", "z"] {
            assert_eq!(h.close_count(key), 1);
        }
    }

    #[test]
    fn test_slot_reuse_after_eviction() {
        let mut h = Harness::new(2);
        let mut txn = Transaction::begin();

        for key in ["a", "b", "c", "d", "e"] {
            h.get(key, &mut txn);
        }
        assert_eq!(h.cache.keys_front_to_back(), vec!["e", "d"]);
        // The arena never grows past capacity worth of live slots plus
        // freed ones being recycled.
        assert!(h.cache.slots.len() <= 3);
    }
}
