//! # Bounded Seen-Id Cache
//!
//! Remembers the most recent ids so a duplicate delivery can be recognized.
//!
//! - Capacity is fixed at construction (minimum 1).
//! - Inserting past capacity evicts the oldest id first.
//! - An evicted id is forgotten; a very late duplicate of it is treated as new.

use std::collections::{HashSet, VecDeque};
use std::hash::Hash;

#[derive(Debug, Clone)]
pub struct SeenIdCache<K> {
    order: VecDeque<K>,
    members: HashSet<K>,
    capacity: usize,
}

impl<K: Hash + Eq + Clone> SeenIdCache<K> {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            order: VecDeque::with_capacity(capacity),
            members: HashSet::with_capacity(capacity),
            capacity,
        }
    }

    /// Record an id. Returns `true` on its first sighting, `false` for a
    /// duplicate still inside the window.
    pub fn insert(&mut self, id: K) -> bool {
        if self.members.contains(&id) {
            return false;
        }
        self.members.insert(id.clone());
        self.order.push_back(id);
        while self.order.len() > self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.members.remove(&oldest);
            }
        }
        true
    }

    #[must_use]
    pub fn contains(&self, id: &K) -> bool {
        self.members.contains(id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.order.clear();
        self.members.clear();
    }
}
