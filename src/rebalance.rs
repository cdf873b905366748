//! Red-black maintenance for a single bucket tree.
//!
//! `Tree` is a mutable view over the shared node arena plus the root slot of
//! one bucket. All structural edits (attach, unlink, rotations) go through it
//! so parent back-indices and the root slot are retargeted in one place.

use crate::node::{Arena, Color, NodeKey};

pub(crate) struct Tree<'a, K, V> {
    nodes: &'a mut Arena<K, V>,
    root: &'a mut Option<NodeKey>,
}

impl<'a, K, V> Tree<'a, K, V> {
    pub fn new(nodes: &'a mut Arena<K, V>, root: &'a mut Option<NodeKey>) -> Self {
        Self { nodes, root }
    }

    fn color(&self, n: Option<NodeKey>) -> Color {
        n.map_or(Color::Black, |k| self.nodes[k].color)
    }

    fn is_red(&self, n: Option<NodeKey>) -> bool {
        self.color(n) == Color::Red
    }

    fn paint(&mut self, n: Option<NodeKey>, color: Color) {
        if let Some(k) = n {
            self.nodes[k].color = color;
        }
    }

    fn parent(&self, n: NodeKey) -> Option<NodeKey> {
        self.nodes[n].parent
    }

    fn left(&self, n: NodeKey) -> Option<NodeKey> {
        self.nodes[n].left
    }

    fn right(&self, n: NodeKey) -> Option<NodeKey> {
        self.nodes[n].right
    }

    fn is_left_child(&self, n: NodeKey) -> bool {
        self.parent(n)
            .is_some_and(|p| self.nodes[p].left == Some(n))
    }

    fn sibling(&self, n: NodeKey) -> Option<NodeKey> {
        let p = self.parent(n)?;
        if self.nodes[p].left == Some(n) {
            self.nodes[p].right
        } else {
            self.nodes[p].left
        }
    }

    /// Point `parent`'s link (or the root slot) that referenced `old` at `new`.
    fn replace_child(&mut self, parent: Option<NodeKey>, old: NodeKey, new: Option<NodeKey>) {
        match parent {
            Some(p) if self.nodes[p].left == Some(old) => self.nodes[p].left = new,
            Some(p) => {
                debug_assert_eq!(self.nodes[p].right, Some(old), "parent does not own child");
                self.nodes[p].right = new;
            }
            None => *self.root = new,
        }
    }

    //     g                r
    //    / \              / \
    //   a   r     ->     g   c
    //      / \          / \
    //     b   c        a   b
    fn rotate_left(&mut self, g: NodeKey) {
        let r = self.right(g).expect("rotate_left requires a right child");
        let b = self.left(r);
        self.nodes[g].right = b;
        if let Some(b) = b {
            self.nodes[b].parent = Some(g);
        }
        let gp = self.parent(g);
        self.nodes[r].parent = gp;
        self.replace_child(gp, g, Some(r));
        self.nodes[r].left = Some(g);
        self.nodes[g].parent = Some(r);
    }

    //       g            l
    //      / \          / \
    //     l   c   ->   a   g
    //    / \              / \
    //   a   b            b   c
    fn rotate_right(&mut self, g: NodeKey) {
        let l = self.left(g).expect("rotate_right requires a left child");
        let b = self.right(l);
        self.nodes[g].left = b;
        if let Some(b) = b {
            self.nodes[b].parent = Some(g);
        }
        let gp = self.parent(g);
        self.nodes[l].parent = gp;
        self.replace_child(gp, g, Some(l));
        self.nodes[l].right = Some(g);
        self.nodes[g].parent = Some(l);
    }

    /// Hang a detached red node below `parent` (or as the root) and restore
    /// the red-black properties.
    pub fn attach(&mut self, node: NodeKey, parent: Option<NodeKey>, as_left: bool) {
        debug_assert!(self.left(node).is_none() && self.right(node).is_none());
        self.nodes[node].parent = parent;
        self.nodes[node].color = Color::Red;
        match parent {
            Some(p) if as_left => {
                debug_assert!(self.nodes[p].left.is_none());
                self.nodes[p].left = Some(node);
            }
            Some(p) => {
                debug_assert!(self.nodes[p].right.is_none());
                self.nodes[p].right = Some(node);
            }
            None => {
                debug_assert!(self.root.is_none());
                *self.root = Some(node);
            }
        }
        self.fix_after_insert(node);
    }

    fn fix_after_insert(&mut self, mut node: NodeKey) {
        loop {
            let Some(parent) = self.parent(node) else {
                self.paint(Some(node), Color::Black);
                return;
            };
            if !self.is_red(Some(parent)) {
                return;
            }
            let grand = self
                .parent(parent)
                .expect("a red parent is never the root");
            let uncle = self.sibling(parent);

            if self.is_red(uncle) {
                // Push the blackness down from the grandparent and carry the
                // possible double red upward.
                self.paint(Some(parent), Color::Black);
                self.paint(uncle, Color::Black);
                self.paint(Some(grand), Color::Red);
                node = grand;
                continue;
            }

            self.paint(Some(grand), Color::Red);
            if self.is_left_child(parent) {
                if self.is_left_child(node) {
                    // LL
                    self.paint(Some(parent), Color::Black);
                } else {
                    // LR
                    self.paint(Some(node), Color::Black);
                    self.rotate_left(parent);
                }
                self.rotate_right(grand);
            } else {
                if self.is_left_child(node) {
                    // RL
                    self.paint(Some(node), Color::Black);
                    self.rotate_right(parent);
                } else {
                    // RR
                    self.paint(Some(parent), Color::Black);
                }
                self.rotate_left(grand);
            }
            return;
        }
    }

    /// In-order successor of a node that has a right subtree.
    pub fn successor(&self, node: NodeKey) -> Option<NodeKey> {
        let mut cur = self.right(node)?;
        while let Some(l) = self.left(cur) {
            cur = l;
        }
        Some(cur)
    }

    /// The node to unlink in order to remove `node`'s content: the node
    /// itself, or its successor when it has two children.
    pub fn removal_victim(&self, node: NodeKey) -> NodeKey {
        match (self.left(node), self.right(node)) {
            (Some(_), Some(_)) => self
                .successor(node)
                .expect("a node with a right child has a successor"),
            _ => node,
        }
    }

    /// Structurally remove a node with at most one child and rebalance.
    /// The node stays in the arena with cleared links; freeing it is the
    /// caller's business.
    pub fn unlink(&mut self, node: NodeKey) {
        let left = self.left(node);
        let right = self.right(node);
        debug_assert!(left.is_none() || right.is_none(), "unlink needs at most one child");
        let parent = self.parent(node);
        let color = self.nodes[node].color;

        if let Some(child) = left.or(right) {
            // Only a black node can have a single (red) child.
            self.nodes[child].parent = parent;
            self.replace_child(parent, node, Some(child));
            self.paint(Some(child), Color::Black);
        } else if let Some(p) = parent {
            let was_left = self.nodes[p].left == Some(node);
            self.replace_child(Some(p), node, None);
            if color == Color::Black {
                self.fix_double_black(p, was_left);
            }
        } else {
            *self.root = None;
        }
        self.nodes[node].reset_links();
    }

    /// The subtree on `parent`'s `left_side` lost one black node.
    fn fix_double_black(&mut self, mut parent: NodeKey, mut left_side: bool) {
        loop {
            let mut sibling = self
                .child(parent, !left_side)
                .expect("a black-height deficit implies a sibling");

            if self.is_red(Some(sibling)) {
                self.paint(Some(sibling), Color::Black);
                self.paint(Some(parent), Color::Red);
                self.rotate_toward(parent, left_side);
                sibling = self
                    .child(parent, !left_side)
                    .expect("a red sibling has black children");
            }

            let near = self.child(sibling, left_side);
            let far = self.child(sibling, !left_side);

            if !self.is_red(near) && !self.is_red(far) {
                // Merge: the sibling gives up a black level too.
                let parent_was_black = !self.is_red(Some(parent));
                self.paint(Some(sibling), Color::Red);
                self.paint(Some(parent), Color::Black);
                if !parent_was_black {
                    return;
                }
                match self.parent(parent) {
                    Some(gp) => {
                        left_side = self.nodes[gp].left == Some(parent);
                        parent = gp;
                        continue;
                    }
                    None => return,
                }
            }

            if !self.is_red(far) {
                // Turn the near red child into the far one.
                self.rotate_toward(sibling, !left_side);
                sibling = self
                    .child(parent, !left_side)
                    .expect("rotation keeps a sibling in place");
            }

            // Borrow: one rotation at the parent closes the deficit.
            let parent_color = self.nodes[parent].color;
            self.paint(Some(sibling), parent_color);
            self.paint(Some(parent), Color::Black);
            let far = self.child(sibling, !left_side);
            self.paint(far, Color::Black);
            self.rotate_toward(parent, left_side);
            return;
        }
    }

    fn child(&self, n: NodeKey, left: bool) -> Option<NodeKey> {
        if left {
            self.left(n)
        } else {
            self.right(n)
        }
    }

    /// Rotate so that `n` moves down to its `left`-hand side.
    fn rotate_toward(&mut self, n: NodeKey, left: bool) {
        if left {
            self.rotate_left(n);
        } else {
            self.rotate_right(n);
        }
    }
}
