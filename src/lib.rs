//! rb-hashmap: a single-threaded hash map whose collision buckets are
//! red-black trees instead of linked lists.
//!
//! Internal Design:
//!
//! Summary
//! - Goal: keep lookups O(log n) per bucket even when many keys share a
//!   bucket (or a full hash), without requiring keys to be `Ord`.
//! - Layers:
//!   - Node arena: every entry of every bucket lives in one `SlotMap`;
//!     tree links (`left`, `right`, `parent`) are `NodeKey`s. The arena
//!     owns all nodes, so the parent back-link is never an ownership edge.
//!   - BucketTable: power-of-two array of tree roots, allocated on first
//!     insert, doubled when `len` exceeds `capacity * load_factor`.
//!   - Rebalancer (`rebalance::Tree`): rotations plus insert and remove
//!     fix-ups over one bucket's tree.
//!   - TreeHashMap<K, V, S, C>: the public map.
//!   - LinkedTreeHashMap<K, V, S, C>: TreeHashMap plus an insertion-order
//!     list kept in a `SecondaryMap` keyed by node.
//!
//! Ordering inside a bucket
//! - Cached 64-bit hash first; equal hashes then test `K: Eq`; unequal keys
//!   consult the map's `KeyComparator` (`Unordered`, `Natural`, or a
//!   `CompareFn` closure); if that is not decisive, the first tied node's
//!   subtree is scanned for an equal key and, failing that, the entry's
//!   creation sequence number breaks the tie.
//! - The sequence number travels with the key, so relative order of
//!   colliding keys is stable across resizes and removals.
//! - Built-in comparators declare `KeyComparator::CONSISTENT`. A comparator
//!   that does not may order only some pairs, which is not transitive; a
//!   miss is then confirmed by scanning every entry sharing the hash, all of
//!   which sit under the first such node on the search path.
//!
//! Removal
//! - A node with two children is not unlinked. Its in-order successor's
//!   content moves into it and the successor's node is unlinked and freed.
//!   The insertion-order list follows that move so iteration reflects the
//!   logical entries, not the node that holds them.
//!
//! Hasher and rehashing invariants
//! - Each entry stores its `u64` hash; `K: Hash` is never invoked after
//!   insertion. Bucket index is `(h ^ (h >> 32)) & (capacity - 1)`.
//! - Resizing walks each old tree breadth-first, capturing children before
//!   clearing a node's links, and re-seats each node through the ordinary
//!   insert path. Node keys do not change.
//!
//! Notes and non-goals
//! - Single-threaded; no internal synchronization, no fail-fast iterators.
//! - No serialization.
//! - `TreeHashMap` iteration order is unspecified; use `LinkedTreeHashMap`
//!   for insertion order.
//! - Structural invariants are checked with `debug_assert!` where cheap and
//!   fully by `validate()`.

mod config;
mod error;
mod invariants;
pub mod linked_tree_hash_map;
mod node;
mod ordering;
mod rebalance;
mod table;
pub mod tree_hash_map;
mod tree_hash_map_proptest;
pub mod work_queue;

// Public surface
pub use config::Builder;
pub use error::{ConfigError, InvariantViolation};
pub use linked_tree_hash_map::LinkedTreeHashMap;
pub use ordering::{CompareFn, KeyComparator, Natural, Unordered};
pub use tree_hash_map::TreeHashMap;
pub use work_queue::WorkQueue;
