//! Red-black tree node definitions.

/// Node identifier in the tree arena.
pub type NodeId = usize;

/// Node color.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Color {
    Red,
    Black,
}

/// A node in the red-black tree.
///
/// Children are owned through the arena; `parent` is a plain back link that
/// every rotation and splice keeps in sync.
#[derive(Clone, Debug)]
pub struct Node<K, V> {
    pub key: K,
    pub value: V,
    pub color: Color,
    pub parent: Option<NodeId>,
    pub left: Option<NodeId>,
    pub right: Option<NodeId>,
}

impl<K, V> Node<K, V> {
    /// Creates a detached red node.
    pub fn new(key: K, value: V, parent: Option<NodeId>) -> Self {
        Self {
            key,
            value,
            color: Color::Red,
            parent,
            left: None,
            right: None,
        }
    }

    #[inline]
    pub fn is_red(&self) -> bool {
        self.color == Color::Red
    }
}

/// Read-only view of a node, used to inspect the tree shape.
pub struct NodeRef<'a, K, V> {
    pub(super) arena: &'a [Node<K, V>],
    pub(super) id: NodeId,
}

impl<'a, K, V> NodeRef<'a, K, V> {
    fn node(&self) -> &'a Node<K, V> {
        &self.arena[self.id]
    }

    pub fn key(&self) -> &'a K {
        &self.node().key
    }

    pub fn value(&self) -> &'a V {
        &self.node().value
    }

    pub fn color(&self) -> Color {
        self.node().color
    }

    pub fn left(&self) -> Option<NodeRef<'a, K, V>> {
        self.node().left.map(|id| NodeRef { arena: self.arena, id })
    }

    pub fn right(&self) -> Option<NodeRef<'a, K, V>> {
        self.node().right.map(|id| NodeRef { arena: self.arena, id })
    }

    pub fn parent(&self) -> Option<NodeRef<'a, K, V>> {
        self.node().parent.map(|id| NodeRef { arena: self.arena, id })
    }
}
