//! Structural self-checks for tests and debugging.
//!
//! `validate` walks every bucket tree and reports the first broken
//! property. It is O(n) plus a pairwise scan of equal-hash runs, so it is
//! meant for tests and diagnostics, not hot paths.

use crate::error::InvariantViolation;
use crate::node::{Arena, Color, Node, NodeKey};
use crate::ordering::KeyComparator;
use crate::tree_hash_map::TreeHashMap;
use core::cmp::Ordering;

impl<K, V, S, C> TreeHashMap<K, V, S, C>
where
    K: Eq,
    C: KeyComparator<K>,
{
    /// Check every red-black, ordering, placement and size invariant.
    pub fn validate(&self) -> Result<(), InvariantViolation> {
        let mut reachable = 0;
        for (bucket, root) in self.table.roots() {
            let r = &self.nodes[root];
            if r.parent.is_some() {
                return Err(InvariantViolation::ParentLink { bucket });
            }
            if r.color == Color::Red {
                return Err(InvariantViolation::RedRoot { bucket });
            }
            black_height(&self.nodes, bucket, root)?;

            let order = in_order(&self.nodes, root);
            reachable += order.len();
            for &k in &order {
                let expected = self.table.index(self.nodes[k].content.hash);
                if expected != bucket {
                    return Err(InvariantViolation::Misplaced { bucket, expected });
                }
            }
            for pair in order.windows(2) {
                if !self.precedes(&self.nodes[pair[0]], &self.nodes[pair[1]]) {
                    return Err(InvariantViolation::OutOfOrder { bucket });
                }
            }
            // Equal hashes are contiguous in order; only those runs can hold
            // duplicates.
            for run in order.chunk_by(|a, b| self.nodes[*a].content.hash == self.nodes[*b].content.hash) {
                for (i, a) in run.iter().enumerate() {
                    for b in &run[i + 1..] {
                        if self.nodes[*a].content.key == self.nodes[*b].content.key {
                            return Err(InvariantViolation::DuplicateKey { bucket });
                        }
                    }
                }
            }
        }
        if reachable != self.nodes.len() {
            return Err(InvariantViolation::LenMismatch {
                reachable,
                len: self.nodes.len(),
            });
        }
        Ok(())
    }

    // A mixed comparator gives no transitive order inside an equal-hash run,
    // so only the hash order is checked there.
    fn precedes(&self, a: &Node<K, V>, b: &Node<K, V>) -> bool {
        let (a, b) = (&a.content, &b.content);
        match a.hash.cmp(&b.hash) {
            Ordering::Less => true,
            Ordering::Greater => false,
            Ordering::Equal if !<C as KeyComparator<K>>::CONSISTENT => true,
            Ordering::Equal => match self.comparator.compare(&a.key, &b.key) {
                Some(Ordering::Less) => true,
                Some(Ordering::Greater) => false,
                _ => a.seq < b.seq,
            },
        }
    }
}

impl<K, V, S, C> TreeHashMap<K, V, S, C> {
    /// Node count on the longest root-to-leaf path over all buckets.
    pub fn tree_height(&self) -> usize {
        let mut tallest = 0;
        let mut stack = Vec::new();
        for (_, root) in self.table.roots() {
            stack.push((root, 1));
            while let Some((k, depth)) = stack.pop() {
                tallest = tallest.max(depth);
                let n = &self.nodes[k];
                stack.extend(n.left.map(|l| (l, depth + 1)));
                stack.extend(n.right.map(|r| (r, depth + 1)));
            }
        }
        tallest
    }
}

fn in_order<K, V>(nodes: &Arena<K, V>, root: NodeKey) -> Vec<NodeKey> {
    let mut out = Vec::new();
    let mut stack = Vec::new();
    let mut cur = Some(root);
    while cur.is_some() || !stack.is_empty() {
        while let Some(k) = cur {
            stack.push(k);
            cur = nodes[k].left;
        }
        if let Some(k) = stack.pop() {
            out.push(k);
            cur = nodes[k].right;
        }
    }
    out
}

// Black nodes on any path from `k` down to an empty leaf, leaf included.
fn black_height<K, V>(
    nodes: &Arena<K, V>,
    bucket: usize,
    k: NodeKey,
) -> Result<usize, InvariantViolation> {
    let n = &nodes[k];
    let mut heights = [1usize; 2];
    for (slot, child) in [n.left, n.right].into_iter().enumerate() {
        let Some(c) = child else { continue };
        if nodes[c].parent != Some(k) {
            return Err(InvariantViolation::ParentLink { bucket });
        }
        if n.color == Color::Red && nodes[c].color == Color::Red {
            return Err(InvariantViolation::RedRed { bucket });
        }
        heights[slot] = black_height(nodes, bucket, c)?;
    }
    if heights[0] != heights[1] {
        return Err(InvariantViolation::BlackHeight {
            bucket,
            left: heights[0],
            right: heights[1],
        });
    }
    Ok(heights[0] + usize::from(n.color == Color::Black))
}
