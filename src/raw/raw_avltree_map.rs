use core::borrow::Borrow;

use alloc::vec::Vec;

use super::handle::Handle;
use super::node::Side;
use super::raw_bsttree_map::{Attach, RawBstTreeMap};

/// The AVL balancing layer backing `AvlTreeMap`.
///
/// Wraps the plain substrate and owns everything balance-related: the
/// per-node balance indicators, the rotation set, and the insert/remove
/// fix-up walks. Every public operation leaves each node's stored indicator
/// equal to its true height difference (right-positive: height(right) −
/// height(left)), with all indicators in {−1, 0, +1}.
#[derive(Clone)]
pub(crate) struct RawAvlTreeMap<K, V> {
    bst: RawBstTreeMap<K, V>,
}

impl<K, V> RawAvlTreeMap<K, V> {
    /// Creates a new, empty tree.
    pub(crate) const fn new() -> Self {
        Self { bst: RawBstTreeMap::new() }
    }

    /// Creates a new, empty tree with pre-allocated capacity.
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self { bst: RawBstTreeMap::with_capacity(capacity) }
    }

    pub(crate) fn capacity(&self) -> usize {
        self.bst.capacity()
    }

    pub(crate) const fn len(&self) -> usize {
        self.bst.len()
    }

    pub(crate) const fn is_empty(&self) -> bool {
        self.bst.is_empty()
    }

    pub(crate) fn clear(&mut self) {
        self.bst.clear();
    }

    /// Read access to the substrate, for iterator construction and in-order
    /// walks.
    pub(crate) const fn bst(&self) -> &RawBstTreeMap<K, V> {
        &self.bst
    }

    /// Mutable substrate access for value-level iteration. Structural
    /// mutation must go through the balancing entry points.
    pub(crate) fn bst_mut(&mut self) -> &mut RawBstTreeMap<K, V> {
        &mut self.bst
    }

    // ─── Lookup delegation ──────────────────────────────────────────────────

    pub(crate) fn search<Q>(&self, key: &Q) -> Option<Handle>
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        self.bst.search(key)
    }

    pub(crate) fn get<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        self.bst.get(key)
    }

    pub(crate) fn get_mut<Q>(&mut self, key: &Q) -> Option<&mut V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        self.bst.get_mut(key)
    }

    pub(crate) fn get_key_value<Q>(&self, key: &Q) -> Option<(&K, &V)>
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        self.bst.get_key_value(key)
    }

    pub(crate) fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        self.bst.contains_key(key)
    }

    pub(crate) fn first(&self) -> Option<Handle> {
        self.bst.first()
    }

    pub(crate) fn last(&self) -> Option<Handle> {
        self.bst.last()
    }

    pub(crate) fn first_key_value(&self) -> Option<(&K, &V)> {
        self.bst.first_key_value()
    }

    pub(crate) fn last_key_value(&self) -> Option<(&K, &V)> {
        self.bst.last_key_value()
    }

    pub(crate) fn node_key(&self, handle: Handle) -> &K {
        self.bst.key_value(handle).0
    }

    pub(crate) fn node_value(&self, handle: Handle) -> &V {
        self.bst.key_value(handle).1
    }

    pub(crate) fn node_value_mut(&mut self, handle: Handle) -> &mut V {
        self.bst.key_value_mut(handle).1
    }

    pub(crate) fn is_balanced(&self) -> bool {
        self.bst.is_balanced()
    }

    pub(crate) fn drain_to_vec(&mut self) -> Vec<(K, V)> {
        self.bst.drain_to_vec()
    }

    // ─── Insert ─────────────────────────────────────────────────────────────

    /// Inserts with rebalancing. Returns the node holding the key, and the
    /// previous value when the key was already present.
    pub(crate) fn insert(&mut self, key: K, value: V) -> (Handle, Option<V>)
    where
        K: Ord,
    {
        match self.bst.attach(key, value) {
            Attach::Replaced { node, old } => (node, Some(old)),
            Attach::Linked { node, parent } => {
                if let Some(parent) = parent {
                    let side = self.bst.child_side(parent, node);
                    let balance = self.bst.node(parent).balance() + side.sign();
                    self.bst.node_mut(parent).set_balance(balance);
                    // Reaching 0 means the leaf filled in next to an existing
                    // child; the parent's subtree height is unchanged.
                    if balance != 0 {
                        self.insert_fix(parent, node);
                    }
                }
                (node, None)
            }
        }
    }

    /// Restores balance after the subtree rooted at `node` — `parent`'s
    /// direct child on the side that grew — gained one level of height.
    ///
    /// Walks upward adjusting indicators. At most one rotation (single or
    /// double) happens per insertion, and it terminates the walk: a rotated
    /// subtree regains its pre-insertion height.
    fn insert_fix(&mut self, parent: Handle, node: Handle) {
        let Some(grand) = self.bst.node(parent).parent() else { return };
        let side = self.bst.child_side(grand, parent);
        let balance = self.bst.node(grand).balance() + side.sign();

        match balance {
            0 => self.bst.node_mut(grand).set_balance(0),
            -1 | 1 => {
                self.bst.node_mut(grand).set_balance(balance);
                self.insert_fix(grand, parent);
            }
            -2 => {
                // Left overflow; `parent` is the left child.
                if self.bst.child_side(parent, node) == Side::Left {
                    // zig-zig
                    self.rotate_right(grand);
                    self.bst.node_mut(parent).set_balance(0);
                    self.bst.node_mut(grand).set_balance(0);
                } else {
                    // zig-zag: the new indicators depend on which side of
                    // `node` carried the insertion.
                    let before = self.bst.node(node).balance();
                    self.rotate_left(parent);
                    self.rotate_right(grand);
                    let (parent_balance, grand_balance) = match before {
                        -1 => (0, 1),
                        1 => (-1, 0),
                        _ => (0, 0),
                    };
                    self.bst.node_mut(parent).set_balance(parent_balance);
                    self.bst.node_mut(grand).set_balance(grand_balance);
                    self.bst.node_mut(node).set_balance(0);
                }
            }
            _ => {
                // Right overflow; `parent` is the right child.
                if self.bst.child_side(parent, node) == Side::Right {
                    // zig-zig
                    self.rotate_left(grand);
                    self.bst.node_mut(parent).set_balance(0);
                    self.bst.node_mut(grand).set_balance(0);
                } else {
                    // zig-zag
                    let before = self.bst.node(node).balance();
                    self.rotate_right(parent);
                    self.rotate_left(grand);
                    let (parent_balance, grand_balance) = match before {
                        1 => (0, -1),
                        -1 => (1, 0),
                        _ => (0, 0),
                    };
                    self.bst.node_mut(parent).set_balance(parent_balance);
                    self.bst.node_mut(grand).set_balance(grand_balance);
                    self.bst.node_mut(node).set_balance(0);
                }
            }
        }
    }

    // ─── Remove ─────────────────────────────────────────────────────────────

    /// Removes with rebalancing, returning the stored key and the value.
    pub(crate) fn remove<Q>(&mut self, key: &Q) -> Option<(K, V)>
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        let handle = self.bst.search(key)?;
        Some(self.remove_at(handle))
    }

    /// Removes the node at `handle` with rebalancing.
    pub(crate) fn remove_at(&mut self, handle: Handle) -> (K, V) {
        let node = self.bst.node(handle);
        if let (Some(left), Some(_)) = (node.left(), node.right()) {
            // Two children: trade places with the in-order predecessor, which
            // has at most one child. The substrate swap is balance-agnostic;
            // the indicator tracks position, so it is exchanged here.
            let predecessor = self.bst.rightmost(left);
            self.bst.swap_nodes(handle, predecessor);
            let ours = self.bst.node(handle).balance();
            let theirs = self.bst.node(predecessor).balance();
            self.bst.node_mut(handle).set_balance(theirs);
            self.bst.node_mut(predecessor).set_balance(ours);
        }

        let (key, value, vacated) = self.bst.splice(handle);
        if let Some((parent, side)) = vacated {
            self.remove_fix(parent, -side.sign());
        }
        (key, value)
    }

    /// Restores balance after one side of `node` lost one level of height:
    /// `diff` is +1 when the left subtree shrank, −1 when the right did.
    ///
    /// Unlike insertion, removal can rotate at every level on the way to the
    /// root. The only rotation that stops the walk is the one against an
    /// evenly-balanced child, which leaves the subtree height unchanged.
    fn remove_fix(&mut self, node: Handle, diff: i8) {
        // Captured before any rotation can push `node` downward.
        let parent = self.bst.node(node).parent();
        let propagate = parent.map(|parent| (parent, -self.bst.child_side(parent, node).sign()));

        let balance = self.bst.node(node).balance();
        if diff == 1 {
            // The left subtree shrank.
            match balance {
                -1 => {
                    self.bst.node_mut(node).set_balance(0);
                    if let Some((parent, diff)) = propagate {
                        self.remove_fix(parent, diff);
                    }
                }
                0 => self.bst.node_mut(node).set_balance(1),
                _ => {
                    // Already right-heavy; the right side now overflows.
                    let child = self.bst.node(node).right().expect("a +1 balance requires a right child");
                    match self.bst.node(child).balance() {
                        0 => {
                            self.rotate_left(node);
                            self.bst.node_mut(node).set_balance(1);
                            self.bst.node_mut(child).set_balance(-1);
                            // Subtree height unchanged: the walk stops here.
                        }
                        1 => {
                            self.rotate_left(node);
                            self.bst.node_mut(node).set_balance(0);
                            self.bst.node_mut(child).set_balance(0);
                            if let Some((parent, diff)) = propagate {
                                self.remove_fix(parent, diff);
                            }
                        }
                        _ => {
                            let inner = self.bst.node(child).left().expect("a -1 balance requires a left child");
                            let before = self.bst.node(inner).balance();
                            self.rotate_right(child);
                            self.rotate_left(node);
                            let (node_balance, child_balance) = match before {
                                1 => (-1, 0),
                                -1 => (0, 1),
                                _ => (0, 0),
                            };
                            self.bst.node_mut(node).set_balance(node_balance);
                            self.bst.node_mut(child).set_balance(child_balance);
                            self.bst.node_mut(inner).set_balance(0);
                            if let Some((parent, diff)) = propagate {
                                self.remove_fix(parent, diff);
                            }
                        }
                    }
                }
            }
        } else {
            // The right subtree shrank: mirror image.
            match balance {
                1 => {
                    self.bst.node_mut(node).set_balance(0);
                    if let Some((parent, diff)) = propagate {
                        self.remove_fix(parent, diff);
                    }
                }
                0 => self.bst.node_mut(node).set_balance(-1),
                _ => {
                    let child = self.bst.node(node).left().expect("a -1 balance requires a left child");
                    match self.bst.node(child).balance() {
                        0 => {
                            self.rotate_right(node);
                            self.bst.node_mut(node).set_balance(-1);
                            self.bst.node_mut(child).set_balance(1);
                        }
                        -1 => {
                            self.rotate_right(node);
                            self.bst.node_mut(node).set_balance(0);
                            self.bst.node_mut(child).set_balance(0);
                            if let Some((parent, diff)) = propagate {
                                self.remove_fix(parent, diff);
                            }
                        }
                        _ => {
                            let inner = self.bst.node(child).right().expect("a +1 balance requires a right child");
                            let before = self.bst.node(inner).balance();
                            self.rotate_left(child);
                            self.rotate_right(node);
                            let (node_balance, child_balance) = match before {
                                -1 => (1, 0),
                                1 => (0, -1),
                                _ => (0, 0),
                            };
                            self.bst.node_mut(node).set_balance(node_balance);
                            self.bst.node_mut(child).set_balance(child_balance);
                            self.bst.node_mut(inner).set_balance(0);
                            if let Some((parent, diff)) = propagate {
                                self.remove_fix(parent, diff);
                            }
                        }
                    }
                }
            }
        }
    }

    // ─── Rotations ──────────────────────────────────────────────────────────

    /// Left rotation: the right child becomes the subtree root and `node`
    /// descends to its left; the displaced inner subtree crosses over. O(1)
    /// structural; each calling context assigns the balance indicators.
    fn rotate_left(&mut self, node: Handle) {
        let pivot = self.bst.node(node).right().expect("`rotate_left` requires a right child");
        let inner = self.bst.node(pivot).left();
        let parent = self.bst.node(node).parent();

        self.bst.node_mut(node).set_right(inner);
        if let Some(inner) = inner {
            self.bst.node_mut(inner).set_parent(Some(node));
        }

        self.bst.replace_child(parent, node, Some(pivot));
        self.bst.node_mut(pivot).set_parent(parent);

        self.bst.node_mut(pivot).set_left(Some(node));
        self.bst.node_mut(node).set_parent(Some(pivot));
    }

    /// Right rotation: mirror of `rotate_left`.
    fn rotate_right(&mut self, node: Handle) {
        let pivot = self.bst.node(node).left().expect("`rotate_right` requires a left child");
        let inner = self.bst.node(pivot).right();
        let parent = self.bst.node(node).parent();

        self.bst.node_mut(node).set_left(inner);
        if let Some(inner) = inner {
            self.bst.node_mut(inner).set_parent(Some(node));
        }

        self.bst.replace_child(parent, node, Some(pivot));
        self.bst.node_mut(pivot).set_parent(parent);

        self.bst.node_mut(pivot).set_right(Some(node));
        self.bst.node_mut(node).set_parent(Some(pivot));
    }
}
