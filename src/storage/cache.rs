//! Bounded LRU cache.
//!
//! A fixed-capacity mapping from key to value with least-recently-used
//! eviction. The recency list is an index-linked doubly-linked list over a
//! slab of slots; the slab owns the entries and the map holds slot indices
//! only, so there are no reference cycles and no per-access allocation.
//!
//! `get`, `put`, and `remove` are all expected O(1).

use bytes::Bytes;
use std::collections::HashMap;

/// Sentinel for "no slot".
const NIL: usize = usize::MAX;

/// One entry in the recency slab.
#[derive(Debug)]
struct Slot {
    key: Vec<u8>,
    value: Bytes,
    prev: usize,
    next: usize,
}

/// Bounded LRU cache over byte-string keys and values.
#[derive(Debug)]
pub struct LruCache {
    /// Key → slot index.
    map: HashMap<Vec<u8>, usize>,

    /// Slab owning all entries, linked MRU→LRU through prev/next.
    slots: Vec<Slot>,

    /// Recycled slot indices.
    free: Vec<usize>,

    /// Most-recently-used slot.
    head: usize,

    /// Least-recently-used slot; evicted first.
    tail: usize,

    /// Maximum number of live entries.
    capacity: usize,
}

impl LruCache {
    /// Create a cache holding at most `capacity` entries.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is 0; config validation rejects that before any
    /// cache is built.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "cache capacity must be > 0");
        Self {
            map: HashMap::with_capacity(capacity),
            slots: Vec::with_capacity(capacity),
            free: Vec::new(),
            head: NIL,
            tail: NIL,
            capacity,
        }
    }

    /// Current entry count.
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// True if the cache holds no entries.
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Configured capacity.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Look up a key. On hit, the entry becomes most-recently-used.
    pub fn get(&mut self, key: &[u8]) -> Option<Bytes> {
        let idx = *self.map.get(key)?;
        self.unlink(idx);
        self.push_front(idx);
        Some(self.slots[idx].value.clone())
    }

    /// Insert or update a key. The entry becomes most-recently-used; if the
    /// insert pushes the cache past capacity, the least-recently-used entry
    /// is evicted before returning.
    pub fn put(&mut self, key: &[u8], value: Bytes) {
        if let Some(&idx) = self.map.get(key) {
            self.slots[idx].value = value;
            self.unlink(idx);
            self.push_front(idx);
            return;
        }

        let idx = match self.free.pop() {
            Some(idx) => {
                self.slots[idx].key = key.to_vec();
                self.slots[idx].value = value;
                idx
            }
            None => {
                self.slots.push(Slot {
                    key: key.to_vec(),
                    value,
                    prev: NIL,
                    next: NIL,
                });
                self.slots.len() - 1
            }
        };

        self.map.insert(key.to_vec(), idx);
        self.push_front(idx);

        if self.map.len() > self.capacity {
            self.evict_lru();
        }
    }

    /// Remove a key if present; no-op otherwise.
    pub fn remove(&mut self, key: &[u8]) {
        if let Some(idx) = self.map.remove(key) {
            self.unlink(idx);
            self.release(idx);
        }
    }

    /// Current keys in most-recently-used-first order. Diagnostics only.
    pub fn keys(&self) -> Vec<Vec<u8>> {
        let mut out = Vec::with_capacity(self.map.len());
        let mut cur = self.head;
        while cur != NIL {
            out.push(self.slots[cur].key.clone());
            cur = self.slots[cur].next;
        }
        out
    }

    /// Drop the least-recently-used entry.
    fn evict_lru(&mut self) {
        let idx = self.tail;
        if idx == NIL {
            return;
        }
        self.unlink(idx);
        self.map.remove(&self.slots[idx].key);
        self.release(idx);
    }

    /// Detach a slot from the recency list.
    fn unlink(&mut self, idx: usize) {
        let prev = self.slots[idx].prev;
        let next = self.slots[idx].next;

        if prev != NIL {
            self.slots[prev].next = next;
        } else {
            self.head = next;
        }

        if next != NIL {
            self.slots[next].prev = prev;
        } else {
            self.tail = prev;
        }

        self.slots[idx].prev = NIL;
        self.slots[idx].next = NIL;
    }

    /// Attach a detached slot at the MRU position.
    fn push_front(&mut self, idx: usize) {
        self.slots[idx].prev = NIL;
        self.slots[idx].next = self.head;
        if self.head != NIL {
            self.slots[self.head].prev = idx;
        }
        self.head = idx;
        if self.tail == NIL {
            self.tail = idx;
        }
    }

    /// Return a detached slot to the free list, dropping its payload.
    fn release(&mut self, idx: usize) {
        self.slots[idx].key = Vec::new();
        self.slots[idx].value = Bytes::new();
        self.free.push(idx);
    }
}
