use super::handle::Handle;

/// Which child slot of a parent a node occupies.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum Side {
    Left,
    Right,
}

impl Side {
    pub(crate) const fn opposite(self) -> Side {
        match self {
            Side::Left => Side::Right,
            Side::Right => Side::Left,
        }
    }

    /// Contribution of a child on this side to its parent's balance indicator.
    ///
    /// The crate-wide convention is right-positive: balance = height(right) −
    /// height(left). Growth on the left contributes −1, growth on the right +1.
    pub(crate) const fn sign(self) -> i8 {
        match self {
            Side::Left => -1,
            Side::Right => 1,
        }
    }
}

/// A tree node: key, value handle, links, and the balance indicator.
///
/// One node type serves both layers. The plain map never touches `balance`;
/// the balancing layer keeps it equal to the node's true height difference
/// between public operations. Values live in a separate arena (nodes store a
/// handle) so that mutable value access and read-only structure walks never
/// alias.
#[derive(Clone)]
pub(crate) struct Node<K> {
    key: K,
    value: Handle,
    parent: Option<Handle>,
    left: Option<Handle>,
    right: Option<Handle>,
    balance: i8,
}

impl<K> Node<K> {
    /// Creates an unlinked leaf with a zero balance indicator.
    pub(crate) const fn new(key: K, value: Handle) -> Self {
        Self {
            key,
            value,
            parent: None,
            left: None,
            right: None,
            balance: 0,
        }
    }

    #[inline]
    pub(crate) const fn key(&self) -> &K {
        &self.key
    }

    #[inline]
    pub(crate) fn into_key(self) -> K {
        self.key
    }

    #[inline]
    pub(crate) const fn value(&self) -> Handle {
        self.value
    }

    #[inline]
    pub(crate) const fn parent(&self) -> Option<Handle> {
        self.parent
    }

    #[inline]
    pub(crate) const fn set_parent(&mut self, parent: Option<Handle>) {
        self.parent = parent;
    }

    #[inline]
    pub(crate) const fn left(&self) -> Option<Handle> {
        self.left
    }

    #[inline]
    pub(crate) const fn set_left(&mut self, left: Option<Handle>) {
        self.left = left;
    }

    #[inline]
    pub(crate) const fn right(&self) -> Option<Handle> {
        self.right
    }

    #[inline]
    pub(crate) const fn set_right(&mut self, right: Option<Handle>) {
        self.right = right;
    }

    #[inline]
    pub(crate) const fn child(&self, side: Side) -> Option<Handle> {
        match side {
            Side::Left => self.left,
            Side::Right => self.right,
        }
    }

    #[inline]
    pub(crate) const fn set_child(&mut self, side: Side, child: Option<Handle>) {
        match side {
            Side::Left => self.left = child,
            Side::Right => self.right = child,
        }
    }

    #[inline]
    pub(crate) const fn balance(&self) -> i8 {
        self.balance
    }

    #[inline]
    pub(crate) const fn set_balance(&mut self, balance: i8) {
        self.balance = balance;
    }
}
