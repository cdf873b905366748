//! Key ordering inside a bucket tree.
//!
//! Placement escalates through: cached hash, key equality, the map's
//! `KeyComparator`, and finally the entry's creation sequence number. The
//! same descent serves lookups and inserts; only the miss handling differs.

use crate::node::{Arena, NodeKey};
use core::borrow::Borrow;
use core::cmp::Ordering;

/// Optional order consulted when two distinct keys share a hash.
///
/// Returning `None` (or `Some(Equal)` for unequal keys) defers to the
/// creation-order tie-break. An implementation may answer `None` for some
/// pairs and `Some` for others; such a mixed order is not transitive, so the
/// map then confirms every miss by scanning all entries sharing the hash.
pub trait KeyComparator<Q: ?Sized> {
    /// `true` when `compare` is a total preorder: it answers `None` for no
    /// pair or for every pair, and decisive answers are transitive. Descents
    /// then trust decisive answers and skip the confirming scan.
    const CONSISTENT: bool = false;

    fn compare(&self, a: &Q, b: &Q) -> Option<Ordering>;
}

/// No key order: colliding keys are ordered by creation sequence.
#[derive(Copy, Clone, Debug, Default)]
pub struct Unordered;

impl<Q: ?Sized> KeyComparator<Q> for Unordered {
    const CONSISTENT: bool = true;

    #[inline]
    fn compare(&self, _a: &Q, _b: &Q) -> Option<Ordering> {
        None
    }
}

/// Uses the key's `Ord` implementation.
#[derive(Copy, Clone, Debug, Default)]
pub struct Natural;

impl<Q: ?Sized + Ord> KeyComparator<Q> for Natural {
    const CONSISTENT: bool = true;

    #[inline]
    fn compare(&self, a: &Q, b: &Q) -> Option<Ordering> {
        Some(a.cmp(b))
    }
}

/// Injected comparator closure. Like `slice::sort_by`, the closure must be a
/// total preorder; `Equal` for unequal keys falls back to creation order.
#[derive(Copy, Clone, Default)]
pub struct CompareFn<F>(pub F);

impl<Q: ?Sized, F> KeyComparator<Q> for CompareFn<F>
where
    F: Fn(&Q, &Q) -> Ordering,
{
    const CONSISTENT: bool = true;

    #[inline]
    fn compare(&self, a: &Q, b: &Q) -> Option<Ordering> {
        Some((self.0)(a, b))
    }
}

impl<F> core::fmt::Debug for CompareFn<F> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str("CompareFn")
    }
}

/// Outcome of comparing a probe against one node.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub(crate) enum Step {
    Left,
    Right,
    Found,
    /// Same hash, unequal, and no decisive order.
    Tie,
}

/// Rules 1-3 of the placement protocol.
pub(crate) fn step<K, Q, C>(comparator: &C, hash: u64, key: &Q, node_hash: u64, node_key: &K) -> Step
where
    K: Borrow<Q>,
    Q: ?Sized + Eq,
    C: KeyComparator<Q>,
{
    match hash.cmp(&node_hash) {
        Ordering::Less => return Step::Left,
        Ordering::Greater => return Step::Right,
        Ordering::Equal => {}
    }
    let node_key = node_key.borrow();
    if key == node_key {
        return Step::Found;
    }
    match comparator.compare(key, node_key) {
        Some(Ordering::Less) => Step::Left,
        Some(Ordering::Greater) => Step::Right,
        _ => Step::Tie,
    }
}

/// Look for an entry equal to `key` anywhere below and including `from`.
/// Uses an explicit stack so degenerate subtrees cannot exhaust the call stack.
pub(crate) fn scan<K, V, Q>(nodes: &Arena<K, V>, from: NodeKey, hash: u64, key: &Q) -> Option<NodeKey>
where
    K: Borrow<Q>,
    Q: ?Sized + Eq,
{
    let mut stack = vec![from];
    while let Some(k) = stack.pop() {
        let n = &nodes[k];
        if n.content.hash == hash && n.content.key.borrow() == key {
            return Some(k);
        }
        stack.extend(n.left);
        stack.extend(n.right);
    }
    None
}

/// Lookup descent: the node holding `key`, if any.
///
/// Entries sharing a hash are contiguous in order, so they all sit under the
/// first such node on the path (`class_top`). A mixed comparator can steer
/// the descent past the entry, and the miss is then settled by scanning there.
pub(crate) fn locate<K, V, Q, C>(
    nodes: &Arena<K, V>,
    root: Option<NodeKey>,
    hash: u64,
    key: &Q,
    comparator: &C,
) -> Option<NodeKey>
where
    K: Borrow<Q>,
    Q: ?Sized + Eq,
    C: KeyComparator<Q>,
{
    let consistent = <C as KeyComparator<Q>>::CONSISTENT;
    let mut class_top = None;
    let mut cur = root;
    while let Some(k) = cur {
        let n = &nodes[k];
        if class_top.is_none() && n.content.hash == hash {
            class_top = Some(k);
        }
        cur = match step(comparator, hash, key, n.content.hash, &n.content.key) {
            Step::Left => n.left,
            Step::Right => n.right,
            Step::Found => return Some(k),
            // Every entry tied with `key` lives under the first tied node.
            Step::Tie if consistent => return scan(nodes, k, hash, key),
            Step::Tie => break,
        };
    }
    if consistent {
        return None;
    }
    class_top.and_then(|top| scan(nodes, top, hash, key))
}

/// Where an insert lands.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub(crate) enum Seat {
    Occupied(NodeKey),
    Vacant {
        parent: Option<NodeKey>,
        as_left: bool,
    },
}

/// Insert descent for a key with creation number `seq`.
///
/// With `may_exist == false` the caller guarantees the key is absent (resize
/// relocation) and nothing is scanned. Otherwise a consistent comparator
/// scans the first tied subtree, and any other comparator scans the whole
/// equal-hash run before reporting a vacancy.
pub(crate) fn seat<K, V, C>(
    nodes: &Arena<K, V>,
    root: Option<NodeKey>,
    hash: u64,
    key: &K,
    seq: u64,
    comparator: &C,
    may_exist: bool,
) -> Seat
where
    K: Eq,
    C: KeyComparator<K>,
{
    let consistent = <C as KeyComparator<K>>::CONSISTENT;
    let mut searched = !may_exist;
    let mut class_top = None;
    let mut parent = None;
    let mut as_left = false;
    let mut cur = root;
    while let Some(k) = cur {
        let n = &nodes[k];
        if class_top.is_none() && n.content.hash == hash {
            class_top = Some(k);
        }
        let go_left = match step(comparator, hash, key, n.content.hash, &n.content.key) {
            Step::Left => true,
            Step::Right => false,
            Step::Found => return Seat::Occupied(k),
            Step::Tie => {
                if consistent && !searched {
                    if let Some(hit) = scan(nodes, k, hash, key) {
                        return Seat::Occupied(hit);
                    }
                    searched = true;
                }
                seq < n.content.seq
            }
        };
        parent = Some(k);
        as_left = go_left;
        cur = if go_left { n.left } else { n.right };
    }
    if !consistent && !searched {
        if let Some(hit) = class_top.and_then(|top| scan(nodes, top, hash, key)) {
            return Seat::Occupied(hit);
        }
    }
    Seat::Vacant { parent, as_left }
}
