//! LinkedTreeHashMap: TreeHashMap plus a doubly linked list over entries
//! that records insertion order.
//!
//! The list is keyed by arena node, not by key. Node keys survive resizes
//! and rotations, so the only structural event the list must follow is the
//! two-child removal, where a surviving entry's content moves into the node
//! of the entry being removed.

use crate::error::InvariantViolation;
use crate::node::NodeKey;
use crate::ordering::{KeyComparator, Unordered};
use crate::tree_hash_map::{Removal, TreeHashMap};
use core::borrow::Borrow;
use core::fmt;
use core::hash::{BuildHasher, Hash};
use hashbrown::hash_map::DefaultHashBuilder;
use slotmap::SecondaryMap;

#[derive(Copy, Clone, Debug, Default)]
struct Links {
    prev: Option<NodeKey>,
    next: Option<NodeKey>,
}

pub struct LinkedTreeHashMap<K, V, S = DefaultHashBuilder, C = Unordered> {
    map: TreeHashMap<K, V, S, C>,
    links: SecondaryMap<NodeKey, Links>,
    head: Option<NodeKey>,
    tail: Option<NodeKey>,
}

impl<K, V> LinkedTreeHashMap<K, V> {
    pub fn new() -> Self {
        Self::from_map(TreeHashMap::new())
    }

    /// # Panics
    /// If `capacity` cannot be rounded up to a power of two.
    pub fn with_capacity(capacity: usize) -> Self {
        Self::from_map(TreeHashMap::with_capacity(capacity))
    }
}

impl<K, V, S> LinkedTreeHashMap<K, V, S> {
    pub fn with_hasher(hasher: S) -> Self {
        Self::from_map(TreeHashMap::with_hasher(hasher))
    }
}

impl<K, V, C> LinkedTreeHashMap<K, V, DefaultHashBuilder, C> {
    pub fn with_comparator(comparator: C) -> Self {
        Self::from_map(TreeHashMap::with_comparator(comparator))
    }
}

impl<K, V> Default for LinkedTreeHashMap<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V, S, C> LinkedTreeHashMap<K, V, S, C> {
    /// Wrap an empty map.
    pub(crate) fn from_map(map: TreeHashMap<K, V, S, C>) -> Self {
        debug_assert!(map.is_empty());
        Self {
            map,
            links: SecondaryMap::new(),
            head: None,
            tail: None,
        }
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.map.capacity()
    }

    pub fn clear(&mut self) {
        self.map.clear();
        self.links.clear();
        self.head = None;
        self.tail = None;
    }

    /// Oldest live entry.
    pub fn first(&self) -> Option<(&K, &V)> {
        self.head.map(|k| self.map.entry_at(k))
    }

    /// Newest live entry.
    pub fn last(&self) -> Option<(&K, &V)> {
        self.tail.map(|k| self.map.entry_at(k))
    }

    /// Entries in insertion order.
    pub fn iter(&self) -> Iter<'_, K, V, S, C> {
        Iter {
            owner: self,
            cur: self.head,
            remaining: self.len(),
        }
    }

    pub fn keys(&self) -> impl Iterator<Item = &K> + '_ {
        self.iter().map(|(k, _)| k)
    }

    pub fn values(&self) -> impl Iterator<Item = &V> + '_ {
        self.iter().map(|(_, v)| v)
    }

    pub fn contains_value(&self, value: &V) -> bool
    where
        V: PartialEq,
    {
        self.map.contains_value(value)
    }

    /// Check the inner map, then the order list: one link per entry, open
    /// ends at both anchors, matching back links, and a walk of `len` steps.
    pub fn validate(&self) -> Result<(), InvariantViolation>
    where
        K: Eq,
        C: KeyComparator<K>,
    {
        self.map.validate()?;
        let len = self.map.len();
        if self.links.len() != len {
            return Err(InvariantViolation::OrderLenMismatch {
                linked: self.links.len(),
                len,
            });
        }
        match (self.head, self.tail) {
            (None, None) if len == 0 => {}
            (Some(h), Some(t)) => {
                let open_head = self.links.get(h).is_some_and(|l| l.prev.is_none());
                let open_tail = self.links.get(t).is_some_and(|l| l.next.is_none());
                if !(open_head && open_tail) {
                    return Err(InvariantViolation::OrderAnchor);
                }
            }
            _ => return Err(InvariantViolation::OrderAnchor),
        }

        let mut visited = 0;
        let mut prev = None;
        let mut cur = self.head;
        while let Some(k) = cur {
            if visited == len {
                return Err(InvariantViolation::OrderWalk {
                    visited: visited + 1,
                    len,
                });
            }
            let links = match self.links.get(k) {
                Some(l) if l.prev == prev && self.map.nodes.contains_key(k) => l,
                _ => return Err(InvariantViolation::OrderBackLink),
            };
            visited += 1;
            prev = Some(k);
            cur = links.next;
        }
        if visited != len {
            return Err(InvariantViolation::OrderWalk { visited, len });
        }
        Ok(())
    }

    fn push_back(&mut self, node: NodeKey) {
        self.links.insert(
            node,
            Links {
                prev: self.tail,
                next: None,
            },
        );
        match self.tail {
            Some(t) => self.links[t].next = Some(node),
            None => self.head = Some(node),
        }
        self.tail = Some(node);
    }

    fn unlink(&mut self, node: NodeKey) {
        let Some(Links { prev, next }) = self.links.remove(node) else {
            return;
        };
        match prev {
            Some(p) => self.links[p].next = next,
            None => self.head = next,
        }
        match next {
            Some(n) => self.links[n].prev = prev,
            None => self.tail = prev,
        }
    }

    /// Give `to` the list position currently held by `from`.
    fn retarget(&mut self, from: NodeKey, to: NodeKey) {
        let Some(links) = self.links.remove(from) else {
            return;
        };
        match links.prev {
            Some(p) => self.links[p].next = Some(to),
            None => self.head = Some(to),
        }
        match links.next {
            Some(n) => self.links[n].prev = Some(to),
            None => self.tail = Some(to),
        }
        self.links.insert(to, links);
    }

    fn forget(&mut self, removal: &Removal<K, V>) {
        match removal.relocated {
            // `to` lost its own entry and now holds the one that lived in
            // `freed`, so it inherits `freed`'s position.
            Some(to) => {
                self.unlink(to);
                self.retarget(removal.freed, to);
            }
            None => self.unlink(removal.freed),
        }
    }
}

impl<K, V, S, C> LinkedTreeHashMap<K, V, S, C>
where
    K: Eq + Hash,
    S: BuildHasher,
{
    pub fn get<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
        C: KeyComparator<Q>,
    {
        self.map.get(key)
    }

    pub fn get_mut<Q>(&mut self, key: &Q) -> Option<&mut V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
        C: KeyComparator<Q>,
    {
        self.map.get_mut(key)
    }

    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
        C: KeyComparator<Q>,
    {
        self.map.contains_key(key)
    }

    pub fn remove<Q>(&mut self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
        C: KeyComparator<Q>,
    {
        self.remove_entry(key).map(|(_, v)| v)
    }

    pub fn remove_entry<Q>(&mut self, key: &Q) -> Option<(K, V)>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
        C: KeyComparator<Q>,
    {
        let removal = self.map.remove_node(key)?;
        self.forget(&removal);
        Some((removal.content.key, removal.content.value))
    }
}

impl<K, V, S, C> LinkedTreeHashMap<K, V, S, C>
where
    K: Eq + Hash,
    S: BuildHasher,
    C: KeyComparator<K>,
{
    /// Insert or overwrite. An overwrite keeps the entry's original position.
    pub fn insert(&mut self, key: K, value: V) -> Option<V> {
        let (node, old) = self.map.insert_full(key, value);
        if old.is_none() {
            self.push_back(node);
        }
        old
    }
}

impl<K, V, S, C> fmt::Debug for LinkedTreeHashMap<K, V, S, C>
where
    K: fmt::Debug,
    V: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl<K, V, S, C> Extend<(K, V)> for LinkedTreeHashMap<K, V, S, C>
where
    K: Eq + Hash,
    S: BuildHasher,
    C: KeyComparator<K>,
{
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (k, v) in iter {
            self.insert(k, v);
        }
    }
}

impl<K, V, S, C> FromIterator<(K, V)> for LinkedTreeHashMap<K, V, S, C>
where
    K: Eq + Hash,
    S: BuildHasher + Default,
    C: KeyComparator<K> + Default,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut m = Self::from_map(TreeHashMap::from_iter(core::iter::empty()));
        m.extend(iter);
        m
    }
}

/// Insertion-ordered iterator.
pub struct Iter<'a, K, V, S, C> {
    owner: &'a LinkedTreeHashMap<K, V, S, C>,
    cur: Option<NodeKey>,
    remaining: usize,
}

impl<'a, K, V, S, C> Iterator for Iter<'a, K, V, S, C> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        let k = self.cur?;
        self.cur = self.owner.links[k].next;
        self.remaining -= 1;
        Some(self.owner.map.entry_at(k))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<'a, K, V, S, C> IntoIterator for &'a LinkedTreeHashMap<K, V, S, C> {
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V, S, C>;
    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
