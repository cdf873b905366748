//! Tree entries stored in the map's node arena.

use slotmap::{new_key_type, SlotMap};

new_key_type! {
    /// Stable address of an entry inside the node arena. Survives resizes
    /// and rotations; invalidated only when the entry's node is freed.
    pub(crate) struct NodeKey;
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub(crate) enum Color {
    Red,
    Black,
}

/// User payload of a node. When a node with two children is removed, the
/// successor's content moves into it, so `seq` travels with its key.
#[derive(Clone, Debug)]
pub(crate) struct Content<K, V> {
    pub key: K,
    pub value: V,
    pub hash: u64,
    pub seq: u64,
}

#[derive(Clone, Debug)]
pub(crate) struct Node<K, V> {
    pub content: Content<K, V>,
    pub color: Color,
    pub left: Option<NodeKey>,
    pub right: Option<NodeKey>,
    // Back-index only; never an ownership edge.
    pub parent: Option<NodeKey>,
}

impl<K, V> Node<K, V> {
    pub fn new(content: Content<K, V>) -> Self {
        Self {
            content,
            color: Color::Red,
            left: None,
            right: None,
            parent: None,
        }
    }

    /// Detach from whatever tree the node was in so it can be re-seated.
    pub fn reset_links(&mut self) {
        self.color = Color::Red;
        self.left = None;
        self.right = None;
        self.parent = None;
    }
}

/// Owner of every node of every bucket tree.
pub(crate) type Arena<K, V> = SlotMap<NodeKey, Node<K, V>>;
