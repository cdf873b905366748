//! TreeHashMap: bucket table whose collision chains are red-black trees.

use crate::node::{Arena, Content, Node, NodeKey};
use crate::ordering::{self, KeyComparator, Seat, Unordered};
use crate::rebalance::Tree;
use crate::table::BucketTable;
use crate::work_queue::WorkQueue;
use core::borrow::Borrow;
use core::fmt;
use core::hash::{BuildHasher, Hash};
use hashbrown::hash_map::DefaultHashBuilder;
use std::collections::VecDeque;

pub struct TreeHashMap<K, V, S = DefaultHashBuilder, C = Unordered> {
    pub(crate) hasher: S,
    pub(crate) comparator: C,
    pub(crate) nodes: Arena<K, V>,
    pub(crate) table: BucketTable,
    // Creation sequence handed to the next new entry.
    next_seq: u64,
}

/// What `remove_node` took out of the structure.
pub(crate) struct Removal<K, V> {
    pub content: Content<K, V>,
    /// Node freed from the arena.
    pub freed: NodeKey,
    /// Node that received the freed node's content (two-child removals).
    pub relocated: Option<NodeKey>,
}

impl<K, V> TreeHashMap<K, V> {
    pub fn new() -> Self {
        Self::with_hasher(DefaultHashBuilder::default())
    }

    /// # Panics
    /// If `capacity` cannot be rounded up to a power of two.
    pub fn with_capacity(capacity: usize) -> Self {
        Self::with_capacity_and_hasher(capacity, DefaultHashBuilder::default())
    }
}

impl<K, V, S> TreeHashMap<K, V, S> {
    pub fn with_hasher(hasher: S) -> Self {
        Self::from_parts(BucketTable::default(), hasher, Unordered)
    }

    /// # Panics
    /// If `capacity` cannot be rounded up to a power of two.
    pub fn with_capacity_and_hasher(capacity: usize, hasher: S) -> Self {
        match BucketTable::with_capacity(capacity) {
            Ok(table) => Self::from_parts(table, hasher, Unordered),
            Err(e) => panic!("TreeHashMap::with_capacity: {e}"),
        }
    }
}

impl<K, V, C> TreeHashMap<K, V, DefaultHashBuilder, C> {
    /// Map that orders colliding keys with `comparator` before falling back
    /// to creation order.
    pub fn with_comparator(comparator: C) -> Self {
        Self::from_parts(
            BucketTable::default(),
            DefaultHashBuilder::default(),
            comparator,
        )
    }
}

impl<K, V, S, C> TreeHashMap<K, V, S, C> {
    pub(crate) fn from_parts(table: BucketTable, hasher: S, comparator: C) -> Self {
        Self {
            hasher,
            comparator,
            nodes: Arena::with_key(),
            table,
            next_seq: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Number of buckets; 0 until the first insert.
    pub fn capacity(&self) -> usize {
        self.table.capacity()
    }

    pub fn load_factor(&self) -> f32 {
        self.table.load_factor()
    }

    pub fn hasher(&self) -> &S {
        &self.hasher
    }

    pub fn comparator(&self) -> &C {
        &self.comparator
    }

    /// Drop every entry; the bucket array keeps its size.
    pub fn clear(&mut self) {
        tracing::trace!(len = self.nodes.len(), capacity = self.table.capacity(), "clearing map");
        self.nodes.clear();
        self.table.clear();
        self.next_seq = 0;
    }

    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter {
            it: self.nodes.iter(),
        }
    }

    pub fn iter_mut(&mut self) -> IterMut<'_, K, V> {
        IterMut {
            it: self.nodes.iter_mut(),
        }
    }

    pub fn keys(&self) -> Keys<'_, K, V> {
        Keys { inner: self.iter() }
    }

    pub fn values(&self) -> Values<'_, K, V> {
        Values { inner: self.iter() }
    }

    pub fn values_mut(&mut self) -> ValuesMut<'_, K, V> {
        ValuesMut {
            inner: self.iter_mut(),
        }
    }

    pub(crate) fn entry_at(&self, k: NodeKey) -> (&K, &V) {
        let c = &self.nodes[k].content;
        (&c.key, &c.value)
    }

    /// Breadth-first search of every bucket tree.
    pub fn contains_value(&self, value: &V) -> bool
    where
        V: PartialEq,
    {
        let mut queue = VecDeque::new();
        for (_, root) in self.table.roots() {
            queue.push(root);
            while let Some(k) = queue.pop() {
                let n = &self.nodes[k];
                if n.content.value == *value {
                    return true;
                }
                if let Some(l) = n.left {
                    queue.push(l);
                }
                if let Some(r) = n.right {
                    queue.push(r);
                }
            }
        }
        false
    }
}

// Lookups accept any borrowed form of the key; the comparator must order it.
impl<K, V, S, C> TreeHashMap<K, V, S, C>
where
    K: Eq + Hash,
    S: BuildHasher,
{
    pub(crate) fn find<Q>(&self, key: &Q) -> Option<NodeKey>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
        C: KeyComparator<Q>,
    {
        if self.nodes.is_empty() {
            return None;
        }
        let hash = self.hasher.hash_one(key);
        ordering::locate(
            &self.nodes,
            self.table.root_for(hash),
            hash,
            key,
            &self.comparator,
        )
    }

    pub fn get<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
        C: KeyComparator<Q>,
    {
        self.find(key).map(|k| &self.nodes[k].content.value)
    }

    pub fn get_key_value<Q>(&self, key: &Q) -> Option<(&K, &V)>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
        C: KeyComparator<Q>,
    {
        self.find(key).map(|k| self.entry_at(k))
    }

    pub fn get_mut<Q>(&mut self, key: &Q) -> Option<&mut V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
        C: KeyComparator<Q>,
    {
        let k = self.find(key)?;
        Some(&mut self.nodes[k].content.value)
    }

    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
        C: KeyComparator<Q>,
    {
        self.find(key).is_some()
    }

    pub fn remove<Q>(&mut self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
        C: KeyComparator<Q>,
    {
        self.remove_node(key).map(|r| r.content.value)
    }

    pub fn remove_entry<Q>(&mut self, key: &Q) -> Option<(K, V)>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
        C: KeyComparator<Q>,
    {
        self.remove_node(key)
            .map(|r| (r.content.key, r.content.value))
    }

    /// Unlink the entry for `key`. A two-child node keeps its place in the
    /// tree and takes over its successor's content; the successor's node is
    /// the one freed.
    pub(crate) fn remove_node<Q>(&mut self, key: &Q) -> Option<Removal<K, V>>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
        C: KeyComparator<Q>,
    {
        let target = self.find(key)?;
        let index = self.table.index(self.nodes[target].content.hash);
        let mut tree = Tree::new(&mut self.nodes, self.table.root_mut(index));
        let victim = tree.removal_victim(target);
        tree.unlink(victim);

        let mut freed = self
            .nodes
            .remove(victim)
            .expect("unlinked node must still be in the arena");
        let relocated = if victim != target {
            core::mem::swap(&mut self.nodes[target].content, &mut freed.content);
            Some(target)
        } else {
            None
        };
        Some(Removal {
            content: freed.content,
            freed: victim,
            relocated,
        })
    }
}

impl<K, V, S, C> TreeHashMap<K, V, S, C>
where
    K: Eq + Hash,
    S: BuildHasher,
    C: KeyComparator<K>,
{
    /// Insert or overwrite. On overwrite the stored key is kept and the
    /// previous value returned.
    pub fn insert(&mut self, key: K, value: V) -> Option<V> {
        self.insert_full(key, value).1
    }

    pub(crate) fn insert_full(&mut self, key: K, value: V) -> (NodeKey, Option<V>) {
        self.table.ensure_allocated();
        if self.nodes.len() > self.table.threshold() {
            self.resize();
        }

        let hash = self.hasher.hash_one(&key);
        let index = self.table.index(hash);
        let seat = ordering::seat(
            &self.nodes,
            self.table.root(index),
            hash,
            &key,
            self.next_seq,
            &self.comparator,
            true,
        );
        match seat {
            Seat::Occupied(k) => {
                let old = core::mem::replace(&mut self.nodes[k].content.value, value);
                (k, Some(old))
            }
            Seat::Vacant { parent, as_left } => {
                let seq = self.next_seq;
                self.next_seq += 1;
                let node = self.nodes.insert(Node::new(Content {
                    key,
                    value,
                    hash,
                    seq,
                }));
                Tree::new(&mut self.nodes, self.table.root_mut(index)).attach(node, parent, as_left);
                (node, None)
            }
        }
    }

    /// Double the table and re-seat every entry. Node keys are preserved.
    fn resize(&mut self) {
        let old = self.table.grow();
        tracing::debug!(
            old_capacity = old.len(),
            new_capacity = self.table.capacity(),
            len = self.nodes.len(),
            "growing bucket table"
        );
        let mut queue = VecDeque::new();
        for root in old.into_iter().flatten() {
            queue.push(root);
            while let Some(k) = queue.pop() {
                let node = &mut self.nodes[k];
                if let Some(l) = node.left {
                    queue.push(l);
                }
                if let Some(r) = node.right {
                    queue.push(r);
                }
                node.reset_links();
                self.reseat(k);
            }
        }
    }

    fn reseat(&mut self, k: NodeKey) {
        let content = &self.nodes[k].content;
        let index = self.table.index(content.hash);
        let seat = ordering::seat(
            &self.nodes,
            self.table.root(index),
            content.hash,
            &content.key,
            content.seq,
            &self.comparator,
            false,
        );
        match seat {
            Seat::Vacant { parent, as_left } => {
                Tree::new(&mut self.nodes, self.table.root_mut(index)).attach(k, parent, as_left);
            }
            Seat::Occupied(_) => unreachable!("relocated keys are distinct"),
        }
    }
}

impl<K, V> Default for TreeHashMap<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V, S, C> Clone for TreeHashMap<K, V, S, C>
where
    K: Clone,
    V: Clone,
    S: Clone,
    C: Clone,
{
    fn clone(&self) -> Self {
        Self {
            hasher: self.hasher.clone(),
            comparator: self.comparator.clone(),
            nodes: self.nodes.clone(),
            table: self.table.clone(),
            next_seq: self.next_seq,
        }
    }
}

impl<K, V, S, C> fmt::Debug for TreeHashMap<K, V, S, C>
where
    K: fmt::Debug,
    V: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl<K, V, S, C> Extend<(K, V)> for TreeHashMap<K, V, S, C>
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

impl<K, V, S, C> FromIterator<(K, V)> for TreeHashMap<K, V, S, C>
where
    K: Eq + Hash,
    S: BuildHasher + Default,
    C: KeyComparator<K> + Default,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut m = Self::from_parts(BucketTable::default(), S::default(), C::default());
        m.extend(iter);
        m
    }
}

/// Iterator over entries in arena order (no ordering guarantee).
pub struct Iter<'a, K, V> {
    it: slotmap::basic::Iter<'a, NodeKey, Node<K, V>>,
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);
    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        self.it.next().map(|(_, n)| (&n.content.key, &n.content.value))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.it.size_hint()
    }
}

pub struct IterMut<'a, K, V> {
    it: slotmap::basic::IterMut<'a, NodeKey, Node<K, V>>,
}

impl<'a, K, V> Iterator for IterMut<'a, K, V> {
    type Item = (&'a K, &'a mut V);
    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        self.it.next().map(|(_, n)| {
            let c = &mut n.content;
            (&c.key, &mut c.value)
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.it.size_hint()
    }
}

pub struct Keys<'a, K, V> {
    inner: Iter<'a, K, V>,
}

impl<'a, K, V> Iterator for Keys<'a, K, V> {
    type Item = &'a K;
    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(k, _)| k)
    }
}

pub struct Values<'a, K, V> {
    inner: Iter<'a, K, V>,
}

impl<'a, K, V> Iterator for Values<'a, K, V> {
    type Item = &'a V;
    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(_, v)| v)
    }
}

pub struct ValuesMut<'a, K, V> {
    inner: IterMut<'a, K, V>,
}

impl<'a, K, V> Iterator for ValuesMut<'a, K, V> {
    type Item = &'a mut V;
    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(_, v)| v)
    }
}

/// Owning iterator over entries.
pub struct IntoIter<K, V> {
    it: slotmap::basic::IntoIter<NodeKey, Node<K, V>>,
}

impl<K, V> Iterator for IntoIter<K, V> {
    type Item = (K, V);
    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        self.it.next().map(|(_, n)| (n.content.key, n.content.value))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.it.size_hint()
    }
}

impl<K, V, S, C> IntoIterator for TreeHashMap<K, V, S, C> {
    type Item = (K, V);
    type IntoIter = IntoIter<K, V>;
    fn into_iter(self) -> Self::IntoIter {
        IntoIter {
            it: self.nodes.into_iter(),
        }
    }
}

impl<'a, K, V, S, C> IntoIterator for &'a TreeHashMap<K, V, S, C> {
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V>;
    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<'a, K, V, S, C> IntoIterator for &'a mut TreeHashMap<K, V, S, C> {
    type Item = (&'a K, &'a mut V);
    type IntoIter = IterMut<'a, K, V>;
    fn into_iter(self) -> Self::IntoIter {
        self.iter_mut()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ordering::{CompareFn, Natural};
    use std::collections::BTreeSet;
    use std::hash::Hasher;

    // Hashes integers to `value % 4`; everything else to 0.
    #[derive(Clone, Default)]
    struct Mod4BuildHasher;
    #[derive(Default)]
    struct Mod4Hasher(u64);
    impl BuildHasher for Mod4BuildHasher {
        type Hasher = Mod4Hasher;
        fn build_hasher(&self) -> Self::Hasher {
            Mod4Hasher::default()
        }
    }
    impl Hasher for Mod4Hasher {
        fn write(&mut self, _bytes: &[u8]) {}
        fn write_u64(&mut self, n: u64) {
            self.0 = n;
        }
        fn finish(&self) -> u64 {
            self.0 % 4
        }
    }

    /// Invariant: Overwriting a key replaces the value, returns the old one
    /// and leaves `len` unchanged.
    #[test]
    fn overwrite_returns_previous_value() {
        let mut m: TreeHashMap<String, i32> = TreeHashMap::new();
        assert_eq!(m.insert("a".to_string(), 1), None);
        assert_eq!(m.insert("a".to_string(), 2), Some(1));
        assert_eq!(m.get("a"), Some(&2));
        assert_eq!(m.len(), 1);
        m.validate().unwrap();
    }

    /// Invariant: The bucket array is allocated lazily on first insert.
    #[test]
    fn table_allocated_on_first_insert() {
        let mut m: TreeHashMap<u32, u32> = TreeHashMap::with_capacity(5);
        assert_eq!(m.capacity(), 0);
        assert_eq!(m.get(&1), None);
        assert!(!m.contains_value(&1));
        assert_eq!(m.remove(&1), None);
        m.insert(1, 1);
        assert_eq!(m.capacity(), 8);
    }

    /// Invariant: Crossing the load threshold doubles capacity and keeps
    /// every entry reachable with its value.
    #[test]
    fn resize_keeps_entries_reachable() {
        let mut m: TreeHashMap<u64, u64> = TreeHashMap::new();
        let mut last_capacity = 0;
        for i in 0..500 {
            m.insert(i, i * 10);
            if m.capacity() != last_capacity {
                for j in 0..=i {
                    assert_eq!(m.get(&j), Some(&(j * 10)), "after growing to {}", m.capacity());
                }
                last_capacity = m.capacity();
                m.validate().unwrap();
            }
        }
        assert!(m.capacity() >= 512);
        assert_eq!(m.len(), 500);
    }

    /// Invariant: Removing an absent key is a no-op returning `None`.
    #[test]
    fn removing_absent_key_is_noop() {
        let mut m: TreeHashMap<&str, i32> = TreeHashMap::new();
        m.insert("x", 1);
        assert_eq!(m.remove(&"y"), None);
        assert_eq!(m.remove_entry(&"y"), None);
        assert_eq!(m.len(), 1);
        assert_eq!(m.remove_entry(&"x"), Some(("x", 1)));
        assert_eq!(m.remove(&"x"), None);
        assert!(m.is_empty());
    }

    /// Invariant: Heavy collisions with no key order still resolve every key
    /// and keep each bucket a valid red-black tree.
    #[test]
    fn unordered_collisions_resolve() {
        let mut m: TreeHashMap<u64, u64, Mod4BuildHasher> = TreeHashMap::with_hasher(Mod4BuildHasher);
        for k in 0..300 {
            m.insert(k, k + 1);
        }
        m.validate().unwrap();
        for k in 0..300 {
            assert_eq!(m.get(&k), Some(&(k + 1)));
        }
        for k in (0..300).step_by(3) {
            assert_eq!(m.remove(&k), Some(k + 1));
            m.validate().unwrap();
        }
        assert_eq!(m.len(), 200);
        assert!(!m.contains_key(&3));
        assert!(m.contains_key(&4));
    }

    /// Invariant: An injected comparator orders colliding keys; lookups and
    /// removals agree with it.
    #[test]
    fn injected_comparator_orders_collisions() {
        let rev = CompareFn(|a: &u64, b: &u64| b.cmp(a));
        let mut m = TreeHashMap::from_parts(BucketTable::default(), Mod4BuildHasher, rev);
        for k in 0..100u64 {
            m.insert(k, ());
        }
        m.validate().unwrap();
        for k in (0..100u64).filter(|k| k % 2 == 1) {
            assert!(m.remove(&k).is_some());
        }
        m.validate().unwrap();
        let keys: BTreeSet<u64> = m.keys().copied().collect();
        assert_eq!(keys, (0..100).filter(|k| k % 2 == 0).collect::<BTreeSet<u64>>());
    }

    /// Invariant: Borrowed lookups work with a natural order on the borrowed form.
    #[test]
    fn borrowed_lookup_with_natural_order() {
        let mut m: TreeHashMap<String, usize, DefaultHashBuilder, Natural> =
            TreeHashMap::with_comparator(Natural);
        for (i, w) in ["alpha", "beta", "gamma"].iter().enumerate() {
            m.insert((*w).to_string(), i);
        }
        assert_eq!(m.get("beta"), Some(&1));
        assert_eq!(m.get_key_value("gamma"), Some((&"gamma".to_string(), &2)));
        assert!(!m.contains_key("delta"));
        *m.get_mut("alpha").unwrap() += 10;
        assert_eq!(m.get("alpha"), Some(&10));
    }

    /// Invariant: `None` is an ordinary key; absence is modelled, not a sentinel.
    #[test]
    fn option_keys_include_none() {
        let mut m: TreeHashMap<Option<&str>, i32> = TreeHashMap::new();
        m.insert(None, 0);
        m.insert(Some("a"), 1);
        assert_eq!(m.get(&None), Some(&0));
        assert_eq!(m.insert(None, 5), Some(0));
        assert_eq!(m.len(), 2);
    }

    /// Invariant: `clear` empties the map but keeps the bucket array.
    #[test]
    fn clear_keeps_capacity() {
        let mut m: TreeHashMap<u32, u32> = (0..100).map(|i| (i, i)).collect();
        let cap = m.capacity();
        m.clear();
        assert!(m.is_empty());
        assert_eq!(m.capacity(), cap);
        assert_eq!(m.get(&5), None);
        m.insert(5, 6);
        assert_eq!(m.get(&5), Some(&6));
        m.validate().unwrap();
    }

    /// Invariant: Iteration yields each live entry exactly once; `iter_mut`
    /// and `values_mut` updates are visible to lookups.
    #[test]
    fn iteration_and_mutation() {
        let mut m: TreeHashMap<u32, u32> = TreeHashMap::new();
        m.extend((0..20).map(|i| (i, i)));
        for (_, v) in m.iter_mut() {
            *v += 1;
        }
        for v in m.values_mut() {
            *v *= 2;
        }
        let mut seen: Vec<(u32, u32)> = m.iter().map(|(k, v)| (*k, *v)).collect();
        seen.sort_unstable();
        assert_eq!(seen, (0..20).map(|i| (i, (i + 1) * 2)).collect::<Vec<_>>());
        assert_eq!(m.values().count(), 20);

        let mut owned: Vec<(u32, u32)> = m.clone().into_iter().collect();
        owned.sort_unstable();
        assert_eq!(owned, seen);
    }

    /// Invariant: Debug renders as a map.
    #[test]
    fn debug_is_map_like() {
        let mut m: TreeHashMap<&str, i32> = TreeHashMap::new();
        m.insert("k", 1);
        assert_eq!(format!("{:?}", m), r#"{"k": 1}"#);
    }
}
