use core::borrow::Borrow;
use core::cmp::Ordering;

use alloc::vec::Vec;

use super::arena::Arena;
use super::handle::Handle;
use super::node::{Node, Side};

/// The plain binary-search-tree substrate backing `BstTreeMap` and, through
/// the balancing layer, `AvlTreeMap`.
///
/// Owns structure only: storage, search, attach/splice, in-order navigation,
/// and the position exchange of two arbitrary nodes. It never reads or writes
/// a balance indicator; callers that maintain position-tied bookkeeping do so
/// themselves around the structural calls.
#[derive(Clone)]
pub(crate) struct RawBstTreeMap<K, V> {
    /// Arena storing all tree nodes.
    nodes: Arena<Node<K>>,
    /// Arena storing all values (separate from nodes for cache efficiency and
    /// so `iter_mut` can prove its accesses disjoint).
    values: Arena<V>,
    /// Handle to the root node, if the tree is non-empty.
    root: Option<Handle>,
}

/// Result of an attach attempt.
pub(crate) enum Attach<V> {
    /// The key was present; its value was overwritten in place. No structural
    /// change happened.
    Replaced {
        /// The node already holding the key.
        node: Handle,
        /// The previous value.
        old: V,
    },
    /// A fresh leaf was linked in. `parent` is `None` exactly when the leaf
    /// became the root.
    Linked {
        /// The new leaf.
        node: Handle,
        /// The leaf's parent.
        parent: Option<Handle>,
    },
}

impl<K, V> RawBstTreeMap<K, V> {
    /// Creates a new, empty tree.
    pub(crate) const fn new() -> Self {
        Self {
            nodes: Arena::new(),
            values: Arena::new(),
            root: None,
        }
    }

    /// Creates a new, empty tree with pre-allocated capacity.
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            nodes: Arena::with_capacity(capacity),
            values: Arena::with_capacity(capacity),
            root: None,
        }
    }

    pub(crate) fn capacity(&self) -> usize {
        self.values.capacity()
    }

    /// Number of key-value pairs, derived from node-arena occupancy.
    pub(crate) const fn len(&self) -> usize {
        self.nodes.len()
    }

    pub(crate) const fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    pub(crate) const fn root(&self) -> Option<Handle> {
        self.root
    }

    /// Removes all elements, releasing node and value storage.
    pub(crate) fn clear(&mut self) {
        self.nodes.clear();
        self.values.clear();
        self.root = None;
    }

    // ─── Node and value access ──────────────────────────────────────────────

    #[inline]
    pub(crate) fn node(&self, handle: Handle) -> &Node<K> {
        self.nodes.get(handle)
    }

    #[inline]
    pub(crate) fn node_mut(&mut self, handle: Handle) -> &mut Node<K> {
        self.nodes.get_mut(handle)
    }

    /// Returns a node reference from a raw tree pointer.
    ///
    /// # Safety
    /// - `ptr` must point to a valid, allocated `RawBstTreeMap<K, V>`.
    #[inline]
    pub(crate) unsafe fn node_ptr<'a>(ptr: *const Self, handle: Handle) -> &'a Node<K> {
        // SAFETY: We only access the `nodes` field through addr_of, avoiding aliasing with
        // the `values` field.
        unsafe { Arena::get_ptr(core::ptr::addr_of!((*ptr).nodes), handle) }
    }

    /// Returns the key and value of a node.
    #[inline]
    pub(crate) fn key_value(&self, handle: Handle) -> (&K, &V) {
        let node = self.nodes.get(handle);
        (node.key(), self.values.get(node.value()))
    }

    /// Returns the key and a mutable value reference for a node.
    ///
    /// Safe split borrow: the key lives in the node arena, the value in the
    /// value arena.
    #[inline]
    pub(crate) fn key_value_mut(&mut self, handle: Handle) -> (&K, &mut V) {
        let node = self.nodes.get(handle);
        (node.key(), self.values.get_mut(node.value()))
    }

    /// Returns the key and a mutable value reference from a raw tree pointer.
    ///
    /// # Safety
    /// - `ptr` must point to a valid, allocated `RawBstTreeMap<K, V>`.
    /// - The value of `handle` must not be borrowed elsewhere.
    #[inline]
    pub(crate) unsafe fn key_value_mut_ptr<'a>(ptr: *mut Self, handle: Handle) -> (&'a K, &'a mut V) {
        // SAFETY: The key is read through the `nodes` projection, the value through the
        // `values` projection; the two fields never alias.
        unsafe {
            let node = Self::node_ptr(ptr, handle);
            let value = (*core::ptr::addr_of_mut!((*ptr).values)).get_mut(node.value());
            (node.key(), value)
        }
    }

    // ─── Search ─────────────────────────────────────────────────────────────

    /// Returns the handle of the node holding `key`, if present.
    pub(crate) fn search<Q>(&self, key: &Q) -> Option<Handle>
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        let mut current = self.root;
        while let Some(handle) = current {
            let node = self.nodes.get(handle);
            current = match key.cmp(node.key().borrow()) {
                Ordering::Equal => return Some(handle),
                Ordering::Less => node.left(),
                Ordering::Greater => node.right(),
            };
        }
        None
    }

    pub(crate) fn get<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        self.search(key).map(|handle| self.key_value(handle).1)
    }

    pub(crate) fn get_mut<Q>(&mut self, key: &Q) -> Option<&mut V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        let handle = self.search(key)?;
        Some(self.key_value_mut(handle).1)
    }

    pub(crate) fn get_key_value<Q>(&self, key: &Q) -> Option<(&K, &V)>
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        self.search(key).map(|handle| self.key_value(handle))
    }

    pub(crate) fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        self.search(key).is_some()
    }

    // ─── In-order navigation ────────────────────────────────────────────────

    /// Handle of the minimum node.
    pub(crate) fn first(&self) -> Option<Handle> {
        self.root.map(|root| self.leftmost(root))
    }

    /// Handle of the maximum node.
    pub(crate) fn last(&self) -> Option<Handle> {
        self.root.map(|root| self.rightmost(root))
    }

    pub(crate) fn first_key_value(&self) -> Option<(&K, &V)> {
        self.first().map(|handle| self.key_value(handle))
    }

    pub(crate) fn last_key_value(&self) -> Option<(&K, &V)> {
        self.last().map(|handle| self.key_value(handle))
    }

    pub(crate) fn leftmost(&self, from: Handle) -> Handle {
        let mut current = from;
        while let Some(left) = self.nodes.get(current).left() {
            current = left;
        }
        current
    }

    pub(crate) fn rightmost(&self, from: Handle) -> Handle {
        let mut current = from;
        while let Some(right) = self.nodes.get(current).right() {
            current = right;
        }
        current
    }

    /// In-order successor: leftmost of the right subtree, else the first
    /// ancestor reached from a left child. O(height), no allocation.
    pub(crate) fn successor(&self, handle: Handle) -> Option<Handle> {
        // SAFETY: `self` is a valid tree and the borrow is held for the call.
        unsafe { Self::successor_ptr(self, handle) }
    }

    /// In-order predecessor: rightmost of the left subtree, else the first
    /// ancestor reached from a right child.
    pub(crate) fn predecessor(&self, handle: Handle) -> Option<Handle> {
        // SAFETY: `self` is a valid tree and the borrow is held for the call.
        unsafe { Self::predecessor_ptr(self, handle) }
    }

    /// `successor` from a raw tree pointer, for iterators holding `*mut Self`.
    ///
    /// # Safety
    /// - `ptr` must point to a valid, allocated `RawBstTreeMap<K, V>`.
    pub(crate) unsafe fn successor_ptr(ptr: *const Self, handle: Handle) -> Option<Handle> {
        // SAFETY: All reads stay inside the `nodes` projection.
        let node = unsafe { Self::node_ptr(ptr, handle) };
        if let Some(right) = node.right() {
            let mut current = right;
            loop {
                // SAFETY: As above.
                let n = unsafe { Self::node_ptr(ptr, current) };
                match n.left() {
                    Some(left) => current = left,
                    None => return Some(current),
                }
            }
        }

        let mut child = handle;
        let mut parent = node.parent();
        while let Some(p) = parent {
            // SAFETY: As above.
            let n = unsafe { Self::node_ptr(ptr, p) };
            if n.left() == Some(child) {
                return Some(p);
            }
            child = p;
            parent = n.parent();
        }
        None
    }

    /// `predecessor` from a raw tree pointer, for iterators holding `*mut Self`.
    ///
    /// # Safety
    /// - `ptr` must point to a valid, allocated `RawBstTreeMap<K, V>`.
    pub(crate) unsafe fn predecessor_ptr(ptr: *const Self, handle: Handle) -> Option<Handle> {
        // SAFETY: All reads stay inside the `nodes` projection.
        let node = unsafe { Self::node_ptr(ptr, handle) };
        if let Some(left) = node.left() {
            let mut current = left;
            loop {
                // SAFETY: As above.
                let n = unsafe { Self::node_ptr(ptr, current) };
                match n.right() {
                    Some(right) => current = right,
                    None => return Some(current),
                }
            }
        }

        let mut child = handle;
        let mut parent = node.parent();
        while let Some(p) = parent {
            // SAFETY: As above.
            let n = unsafe { Self::node_ptr(ptr, p) };
            if n.right() == Some(child) {
                return Some(p);
            }
            child = p;
            parent = n.parent();
        }
        None
    }

    // ─── Link plumbing ──────────────────────────────────────────────────────

    /// Which child slot of `parent` holds `child`.
    pub(crate) fn child_side(&self, parent: Handle, child: Handle) -> Side {
        if self.nodes.get(parent).left() == Some(child) {
            Side::Left
        } else {
            debug_assert_eq!(self.nodes.get(parent).right(), Some(child));
            Side::Right
        }
    }

    /// Points the slot that held `old` (a child slot of `parent`, or the root
    /// reference) at `new`. Does not touch parent links.
    pub(crate) fn replace_child(&mut self, parent: Option<Handle>, old: Handle, new: Option<Handle>) {
        match parent {
            Some(parent) => {
                let side = self.child_side(parent, old);
                self.nodes.get_mut(parent).set_child(side, new);
            }
            None => self.root = new,
        }
    }

    // ─── Mutation ───────────────────────────────────────────────────────────

    /// Descends from the root and either overwrites the value of an existing
    /// key in place or links a fresh leaf at the null slot the search fell off.
    pub(crate) fn attach(&mut self, key: K, value: V) -> Attach<V>
    where
        K: Ord,
    {
        let Some(root) = self.root else {
            let value = self.values.alloc(value);
            let node = self.nodes.alloc(Node::new(key, value));
            self.root = Some(node);
            return Attach::Linked { node, parent: None };
        };

        let mut current = root;
        loop {
            let side = match key.cmp(self.nodes.get(current).key()) {
                Ordering::Equal => {
                    // Overwrite in place; the stored key and the structure are
                    // untouched.
                    let slot = self.nodes.get(current).value();
                    let old = core::mem::replace(self.values.get_mut(slot), value);
                    return Attach::Replaced { node: current, old };
                }
                Ordering::Less => Side::Left,
                Ordering::Greater => Side::Right,
            };

            match self.nodes.get(current).child(side) {
                Some(child) => current = child,
                None => {
                    let value = self.values.alloc(value);
                    let node = self.nodes.alloc(Node::new(key, value));
                    self.nodes.get_mut(node).set_parent(Some(current));
                    self.nodes.get_mut(current).set_child(side, Some(node));
                    return Attach::Linked { node, parent: Some(current) };
                }
            }
        }
    }

    /// Plain insert: attach with no rebalancing.
    pub(crate) fn insert(&mut self, key: K, value: V) -> Option<V>
    where
        K: Ord,
    {
        match self.attach(key, value) {
            Attach::Replaced { old, .. } => Some(old),
            Attach::Linked { .. } => None,
        }
    }

    /// Plain remove: swap-with-predecessor for two-children nodes, then splice.
    pub(crate) fn remove<Q>(&mut self, key: &Q) -> Option<(K, V)>
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        let handle = self.search(key)?;
        Some(self.remove_at(handle))
    }

    /// Removes the node at `handle` with no rebalancing.
    pub(crate) fn remove_at(&mut self, handle: Handle) -> (K, V) {
        let node = self.nodes.get(handle);
        if let (Some(left), Some(_)) = (node.left(), node.right()) {
            let predecessor = self.rightmost(left);
            self.swap_nodes(handle, predecessor);
        }
        let (key, value, _) = self.splice(handle);
        (key, value)
    }

    /// Unlinks a node with at most one child: the child (if any) replaces it
    /// under its parent. Returns the key, the value, and the parent/side that
    /// lost a node (`None` when the root was removed) so balance-aware callers
    /// can react.
    pub(crate) fn splice(&mut self, handle: Handle) -> (K, V, Option<(Handle, Side)>) {
        let node = self.nodes.get(handle);
        debug_assert!(
            node.left().is_none() || node.right().is_none(),
            "`RawBstTreeMap::splice()` - node still has two children!"
        );
        let child = node.left().or(node.right());
        let parent = node.parent();

        let vacated = match parent {
            Some(parent) => {
                let side = self.child_side(parent, handle);
                self.nodes.get_mut(parent).set_child(side, child);
                Some((parent, side))
            }
            None => {
                self.root = child;
                None
            }
        };
        if let Some(child) = child {
            self.nodes.get_mut(child).set_parent(parent);
        }

        let node = self.nodes.take(handle);
        let value = self.values.take(node.value());
        (node.into_key(), value, vacated)
    }

    // ─── Position exchange ──────────────────────────────────────────────────

    /// Exchanges the tree positions of two nodes by rewiring links.
    ///
    /// Keys and values stay with their nodes; only position changes. Auxiliary
    /// data tied to position (such as a balance indicator) is NOT exchanged —
    /// callers that maintain such data must swap it themselves.
    pub(crate) fn swap_nodes(&mut self, a: Handle, b: Handle) {
        if a == b {
            return;
        }
        // Normalize the adjacent case so the parent is always `a`.
        let (a, b) = if self.nodes.get(a).parent() == Some(b) { (b, a) } else { (a, b) };
        if self.nodes.get(b).parent() == Some(a) {
            self.swap_adjacent(a, b);
        } else {
            self.swap_distant(a, b);
        }
    }

    /// Swaps a node with one of its direct children; the shared edge inverts.
    fn swap_adjacent(&mut self, parent: Handle, child: Handle) {
        let side = self.child_side(parent, child);
        let grand = self.nodes.get(parent).parent();
        let sibling = self.nodes.get(parent).child(side.opposite());
        let (child_left, child_right) = {
            let node = self.nodes.get(child);
            (node.left(), node.right())
        };

        // The child takes the parent's place under the grandparent.
        self.replace_child(grand, parent, Some(child));
        self.nodes.get_mut(child).set_parent(grand);

        // The shared edge inverts; the sibling moves across.
        self.nodes.get_mut(child).set_child(side, Some(parent));
        self.nodes.get_mut(parent).set_parent(Some(child));
        self.nodes.get_mut(child).set_child(side.opposite(), sibling);
        if let Some(sibling) = sibling {
            self.nodes.get_mut(sibling).set_parent(Some(child));
        }

        // The parent inherits the child's children.
        self.nodes.get_mut(parent).set_left(child_left);
        if let Some(left) = child_left {
            self.nodes.get_mut(left).set_parent(Some(parent));
        }
        self.nodes.get_mut(parent).set_right(child_right);
        if let Some(right) = child_right {
            self.nodes.get_mut(right).set_parent(Some(parent));
        }
    }

    /// Swaps two nodes that are not parent and child. Link triples and parent
    /// sides are captured before any rewiring so the shared-parent (sibling)
    /// case resolves against the original slots.
    fn swap_distant(&mut self, a: Handle, b: Handle) {
        let (a_parent, a_left, a_right) = {
            let node = self.nodes.get(a);
            (node.parent(), node.left(), node.right())
        };
        let (b_parent, b_left, b_right) = {
            let node = self.nodes.get(b);
            (node.parent(), node.left(), node.right())
        };
        let a_side = a_parent.map(|parent| self.child_side(parent, a));
        let b_side = b_parent.map(|parent| self.child_side(parent, b));

        match (a_parent, a_side) {
            (Some(parent), Some(side)) => self.nodes.get_mut(parent).set_child(side, Some(b)),
            _ => self.root = Some(b),
        }
        match (b_parent, b_side) {
            (Some(parent), Some(side)) => self.nodes.get_mut(parent).set_child(side, Some(a)),
            _ => self.root = Some(a),
        }

        if let Some(left) = a_left {
            self.nodes.get_mut(left).set_parent(Some(b));
        }
        if let Some(right) = a_right {
            self.nodes.get_mut(right).set_parent(Some(b));
        }
        if let Some(left) = b_left {
            self.nodes.get_mut(left).set_parent(Some(a));
        }
        if let Some(right) = b_right {
            self.nodes.get_mut(right).set_parent(Some(a));
        }

        {
            let node = self.nodes.get_mut(a);
            node.set_parent(b_parent);
            node.set_left(b_left);
            node.set_right(b_right);
        }
        {
            let node = self.nodes.get_mut(b);
            node.set_parent(a_parent);
            node.set_left(a_left);
            node.set_right(a_right);
        }
    }

    // ─── Balance audit ──────────────────────────────────────────────────────

    /// Recomputes subtree heights from scratch — stored balance indicators are
    /// ignored — and reports whether every node's height difference is within
    /// ±1. O(n).
    pub(crate) fn is_balanced(&self) -> bool {
        self.balanced_height(self.root).is_some()
    }

    /// Height of the subtree if it is height-balanced, `None` otherwise.
    fn balanced_height(&self, node: Option<Handle>) -> Option<usize> {
        let Some(handle) = node else { return Some(0) };
        let n = self.nodes.get(handle);
        let left = self.balanced_height(n.left())?;
        let right = self.balanced_height(n.right())?;
        if left.abs_diff(right) > 1 {
            return None;
        }
        Some(left.max(right) + 1)
    }

    // ─── Draining ───────────────────────────────────────────────────────────

    /// Moves every pair out in ascending key order, leaving the tree empty.
    ///
    /// Two passes: the handle walk completes before any node is taken, because
    /// the successor walk climbs through ancestors.
    pub(crate) fn drain_to_vec(&mut self) -> Vec<(K, V)> {
        let mut handles = Vec::with_capacity(self.len());
        let mut current = self.first();
        while let Some(handle) = current {
            handles.push(handle);
            current = self.successor(handle);
        }

        let mut pairs = Vec::with_capacity(handles.len());
        for handle in handles {
            let node = self.nodes.take(handle);
            let value = self.values.take(node.value());
            pairs.push((node.into_key(), value));
        }

        self.nodes.clear();
        self.values.clear();
        self.root = None;
        pairs
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use alloc::collections::BTreeMap;
    use alloc::vec;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    /// Structural snapshot: one row per node, keyed and linked by key, sorted
    /// by key. Derived by a structural walk, so it stays valid even when a
    /// position swap has put keys out of search order.
    type Shape = Vec<(i32, Option<i32>, Option<i32>, Option<i32>)>;

    fn shape(map: &RawBstTreeMap<i32, i32>) -> Shape {
        let mut rows = Vec::new();
        let mut current = map.first();
        while let Some(handle) = current {
            let node = map.node(handle);
            rows.push((
                *node.key(),
                node.parent().map(|p| *map.node(p).key()),
                node.left().map(|c| *map.node(c).key()),
                node.right().map(|c| *map.node(c).key()),
            ));
            current = map.successor(handle);
        }
        rows.sort_unstable_by_key(|row| row.0);
        rows
    }

    fn in_order(map: &RawBstTreeMap<i32, i32>) -> Vec<(i32, i32)> {
        let mut pairs = Vec::new();
        let mut current = map.first();
        while let Some(handle) = current {
            let (key, value) = map.key_value(handle);
            pairs.push((*key, *value));
            current = map.successor(handle);
        }
        pairs
    }

    /// Parent links and reachable-node count must agree with the arenas.
    fn check_links(map: &RawBstTreeMap<i32, i32>) {
        fn walk(map: &RawBstTreeMap<i32, i32>, handle: Handle, count: &mut usize) {
            *count += 1;
            let node = map.node(handle);
            if let Some(left) = node.left() {
                assert_eq!(map.node(left).parent(), Some(handle));
                walk(map, left, count);
            }
            if let Some(right) = node.right() {
                assert_eq!(map.node(right).parent(), Some(handle));
                walk(map, right, count);
            }
        }

        let mut count = 0;
        if let Some(root) = map.root() {
            assert_eq!(map.node(root).parent(), None);
            walk(map, root, &mut count);
        }
        assert_eq!(count, map.len());
    }

    fn build(keys: &[i32]) -> RawBstTreeMap<i32, i32> {
        let mut map = RawBstTreeMap::new();
        for &key in keys {
            map.insert(key, key * 10);
        }
        map
    }

    // ─── Attach and overwrite ───────────────────────────────────────────────

    #[test]
    fn attach_links_left_and_right() {
        let map = build(&[5, 3, 8]);
        assert_eq!(
            shape(&map),
            vec![
                (3, Some(5), None, None),
                (5, None, Some(3), Some(8)),
                (8, Some(5), None, None),
            ]
        );
        check_links(&map);
    }

    #[test]
    fn attach_reports_parent_and_root() {
        let mut map: RawBstTreeMap<i32, i32> = RawBstTreeMap::new();
        let Attach::Linked { node: root, parent: None } = map.attach(5, 50) else {
            panic!("first attach must link a root");
        };
        let Attach::Linked { node: _, parent: Some(parent) } = map.attach(3, 30) else {
            panic!("second attach must link under the root");
        };
        assert_eq!(parent, root);
    }

    #[test]
    fn overwrite_keeps_shape_and_len() {
        let mut map = build(&[5, 3, 8, 1, 4]);
        let before = shape(&map);

        let Attach::Replaced { old, .. } = map.attach(3, 999) else {
            panic!("existing key must be overwritten in place");
        };
        assert_eq!(old, 30);
        assert_eq!(shape(&map), before);
        assert_eq!(map.len(), 5);
        assert_eq!(map.get(&3), Some(&999));
    }

    // ─── Splice ─────────────────────────────────────────────────────────────

    #[test]
    fn splice_leaf_reports_vacated_side() {
        let mut map = build(&[5, 3, 8]);
        let handle = map.search(&3).unwrap();
        let parent = map.search(&5).unwrap();

        let (key, value, vacated) = map.splice(handle);
        assert_eq!((key, value), (3, 30));
        assert_eq!(vacated, Some((parent, Side::Left)));
        assert_eq!(in_order(&map), vec![(5, 50), (8, 80)]);
        check_links(&map);
    }

    #[test]
    fn splice_lifts_single_child() {
        let mut map = build(&[5, 3, 8, 7]);
        let handle = map.search(&8).unwrap();

        let (key, _, vacated) = map.splice(handle);
        assert_eq!(key, 8);
        assert_eq!(vacated, Some((map.search(&5).unwrap(), Side::Right)));
        assert_eq!(
            shape(&map),
            vec![
                (3, Some(5), None, None),
                (5, None, Some(3), Some(7)),
                (7, Some(5), None, None),
            ]
        );
        check_links(&map);
    }

    #[test]
    fn splice_root_promotes_child() {
        let mut map = build(&[5, 3]);
        let root = map.search(&5).unwrap();

        let (key, _, vacated) = map.splice(root);
        assert_eq!(key, 5);
        assert_eq!(vacated, None);
        assert_eq!(shape(&map), vec![(3, None, None, None)]);
        check_links(&map);
    }

    #[test]
    fn splice_last_node_empties_tree() {
        let mut map = build(&[5]);
        let root = map.search(&5).unwrap();

        let (key, value, vacated) = map.splice(root);
        assert_eq!((key, value, vacated), (5, 50, None));
        assert!(map.is_empty());
        assert_eq!(map.len(), 0);
    }

    // ─── Remove ─────────────────────────────────────────────────────────────

    #[test]
    fn remove_two_children_swaps_with_predecessor() {
        let mut map = build(&[5, 3, 8, 1, 4, 7, 9]);

        assert_eq!(map.remove(&5), Some((5, 50)));
        // The in-order predecessor (4) takes the removed node's place.
        let root = map.root().unwrap();
        assert_eq!(*map.node(root).key(), 4);
        assert_eq!(in_order(&map), vec![(1, 10), (3, 30), (4, 40), (7, 70), (8, 80), (9, 90)]);
        check_links(&map);
    }

    #[test]
    fn remove_missing_key_is_none() {
        let mut map = build(&[5, 3, 8]);
        assert_eq!(map.remove(&42), None);
        assert_eq!(map.len(), 3);
    }

    // ─── Navigation ─────────────────────────────────────────────────────────

    #[test]
    fn navigation_walks_both_directions() {
        let map = build(&[5, 3, 8, 1, 4, 7, 9]);
        let sorted = vec![1, 3, 4, 5, 7, 8, 9];

        let mut forward = Vec::new();
        let mut current = map.first();
        while let Some(handle) = current {
            forward.push(*map.node(handle).key());
            current = map.successor(handle);
        }
        assert_eq!(forward, sorted);

        let mut backward = Vec::new();
        let mut current = map.last();
        while let Some(handle) = current {
            backward.push(*map.node(handle).key());
            current = map.predecessor(handle);
        }
        let mut reversed = sorted;
        reversed.reverse();
        assert_eq!(backward, reversed);
    }

    #[test]
    fn first_and_last_key_value() {
        let map = build(&[5, 3, 8, 1, 9]);
        assert_eq!(map.first_key_value(), Some((&1, &10)));
        assert_eq!(map.last_key_value(), Some((&9, &90)));

        let empty: RawBstTreeMap<i32, i32> = RawBstTreeMap::new();
        assert_eq!(empty.first_key_value(), None);
        assert_eq!(empty.last_key_value(), None);
    }

    // ─── Position exchange ──────────────────────────────────────────────────

    #[test]
    fn swap_parent_with_left_child() {
        let mut map = build(&[2, 1, 3]);
        let parent = map.search(&2).unwrap();
        let child = map.search(&1).unwrap();

        map.swap_nodes(parent, child);
        assert_eq!(
            shape(&map),
            vec![
                (1, None, Some(2), Some(3)),
                (2, Some(1), None, None),
                (3, Some(1), None, None),
            ]
        );
    }

    #[test]
    fn swap_normalizes_argument_order() {
        let mut forward = build(&[2, 1, 3]);
        let mut reversed = build(&[2, 1, 3]);

        let parent = forward.search(&2).unwrap();
        let child = forward.search(&1).unwrap();
        forward.swap_nodes(parent, child);

        let parent = reversed.search(&2).unwrap();
        let child = reversed.search(&1).unwrap();
        reversed.swap_nodes(child, parent);

        assert_eq!(shape(&forward), shape(&reversed));
    }

    #[test]
    fn swap_siblings_shares_a_parent() {
        let mut map = build(&[2, 1, 3]);
        let left = map.search(&1).unwrap();
        let right = map.search(&3).unwrap();

        map.swap_nodes(left, right);
        assert_eq!(
            shape(&map),
            vec![
                (1, Some(2), None, None),
                (2, None, Some(3), Some(1)),
                (3, Some(2), None, None),
            ]
        );
    }

    #[test]
    fn swap_root_with_distant_node() {
        let mut map = build(&[4, 2, 6, 1, 3, 5, 7]);
        let root = map.search(&4).unwrap();
        let leaf = map.search(&1).unwrap();

        map.swap_nodes(root, leaf);
        let root_now = map.root().unwrap();
        assert_eq!(*map.node(root_now).key(), 1);
        assert_eq!(
            shape(&map),
            vec![
                (1, None, Some(2), Some(6)),
                (2, Some(1), Some(4), Some(3)),
                (3, Some(2), None, None),
                (4, Some(2), None, None),
                (5, Some(6), None, None),
                (6, Some(1), Some(5), Some(7)),
                (7, Some(6), None, None),
            ]
        );
    }

    proptest! {
        #[test]
        fn swap_exchanges_exactly_two_identities(
            keys in proptest::collection::btree_set(-1000..1000i32, 2..48)
                .prop_map(|set| set.into_iter().collect::<Vec<_>>())
                .prop_shuffle(),
            a_pick in any::<usize>(),
            b_pick in any::<usize>(),
        ) {
            let map_keys = keys;
            let mut map = build(&map_keys);

            let a_index = a_pick % map_keys.len();
            let mut b_index = b_pick % map_keys.len();
            if b_index == a_index {
                b_index = (b_index + 1) % map_keys.len();
            }
            let a_key = map_keys[a_index];
            let b_key = map_keys[b_index];
            let a = map.search(&a_key).unwrap();
            let b = map.search(&b_key).unwrap();

            let before = shape(&map);
            map.swap_nodes(a, b);

            // Expected: the original structure with exactly the two identities
            // exchanged, derived independently of the implementation.
            let rename = |key: i32| {
                if key == a_key {
                    b_key
                } else if key == b_key {
                    a_key
                } else {
                    key
                }
            };
            let mut expected: Shape = before
                .iter()
                .map(|&(key, parent, left, right)| {
                    (rename(key), parent.map(rename), left.map(rename), right.map(rename))
                })
                .collect();
            expected.sort_unstable_by_key(|row| row.0);
            prop_assert_eq!(shape(&map), expected);

            // Swapping back restores the original exactly.
            map.swap_nodes(a, b);
            prop_assert_eq!(shape(&map), before);
        }
    }

    // ─── Balance audit ──────────────────────────────────────────────────────

    #[test]
    fn descending_chain_is_not_balanced() {
        let map = build(&[10, 9, 8, 7, 6, 5, 4, 3, 2, 1]);
        assert!(!map.is_balanced());
        assert_eq!(in_order(&map).iter().map(|&(k, _)| k).collect::<Vec<_>>(), (1..=10).collect::<Vec<_>>());
    }

    #[test]
    fn compact_shapes_are_balanced() {
        assert!(build(&[]).is_balanced());
        assert!(build(&[1]).is_balanced());
        assert!(build(&[2, 1, 3]).is_balanced());
        assert!(build(&[4, 2, 6, 1, 3, 5, 7]).is_balanced());
        // Height difference of exactly one is still balanced.
        assert!(build(&[2, 1, 3, 4]).is_balanced());
        // Two levels of difference is not.
        assert!(!build(&[1, 2, 3]).is_balanced());
    }

    // ─── Draining and clearing ──────────────────────────────────────────────

    #[test]
    fn drain_to_vec_is_sorted_and_empties() {
        let mut map = build(&[5, 3, 8, 1, 4, 7, 9]);
        let pairs = map.drain_to_vec();
        assert_eq!(pairs, vec![(1, 10), (3, 30), (4, 40), (5, 50), (7, 70), (8, 80), (9, 90)]);
        assert!(map.is_empty());
        assert_eq!(map.len(), 0);

        // The drained map is still usable.
        map.insert(2, 20);
        assert_eq!(in_order(&map), vec![(2, 20)]);
    }

    #[test]
    fn clear_resets_but_stays_usable() {
        let mut map = build(&[5, 3, 8]);
        map.clear();
        assert!(map.is_empty());
        assert_eq!(map.root(), None);

        map.insert(1, 10);
        assert_eq!(map.len(), 1);
    }

    // ─── Model test ─────────────────────────────────────────────────────────

    #[derive(Clone, Debug)]
    enum Operation {
        Insert(i32, i32),
        Remove(i32),
        Get(i32),
    }

    fn operation() -> impl Strategy<Value = Operation> {
        prop_oneof![
            4 => (-64..64i32, any::<i32>()).prop_map(|(k, v)| Operation::Insert(k, v)),
            2 => (-64..64i32).prop_map(Operation::Remove),
            1 => (-64..64i32).prop_map(Operation::Get),
        ]
    }

    proptest! {
        #[test]
        fn behaves_like_btreemap(operations in proptest::collection::vec(operation(), 0..256)) {
            let mut model: BTreeMap<i32, i32> = BTreeMap::new();
            let mut map: RawBstTreeMap<i32, i32> = RawBstTreeMap::new();

            for operation in operations {
                match operation {
                    Operation::Insert(key, value) => {
                        prop_assert_eq!(map.insert(key, value), model.insert(key, value));
                    }
                    Operation::Remove(key) => {
                        prop_assert_eq!(map.remove(&key), model.remove(&key).map(|v| (key, v)));
                    }
                    Operation::Get(key) => {
                        prop_assert_eq!(map.get(&key), model.get(&key));
                    }
                }

                prop_assert_eq!(map.len(), model.len());
                prop_assert_eq!(map.is_empty(), model.is_empty());
            }

            check_links(&map);
            let pairs: Vec<(i32, i32)> = model.into_iter().collect();
            prop_assert_eq!(in_order(&map), pairs);
        }
    }
}
