//! Red-black tree range iterator.

use super::node::NodeId;
use super::tree::RedBlackTree;
use crate::comparator::Comparator;

/// In-order iterator over a contiguous run of tree entries.
///
/// Walks from `front` to `back` inclusive; both ends advance through the
/// tree's parent links, so the iterator is double-ended.
pub struct Range<'a, K, V, C> {
    tree: &'a RedBlackTree<K, V, C>,
    front: Option<NodeId>,
    back: Option<NodeId>,
}

impl<'a, K, V, C: Comparator<K>> Range<'a, K, V, C> {
    pub(super) fn new(
        tree: &'a RedBlackTree<K, V, C>,
        front: Option<NodeId>,
        back: Option<NodeId>,
    ) -> Self {
        Self { tree, front, back }
    }

    fn finish(&mut self) {
        self.front = None;
        self.back = None;
    }
}

impl<'a, K, V, C: Comparator<K>> Iterator for Range<'a, K, V, C> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.front?;
        if self.front == self.back {
            self.finish();
        } else {
            self.front = self.tree.successor(id);
        }
        let tree: &'a RedBlackTree<K, V, C> = self.tree;
        let node = tree.node(id);
        Some((&node.key, &node.value))
    }
}

impl<'a, K, V, C: Comparator<K>> DoubleEndedIterator for Range<'a, K, V, C> {
    fn next_back(&mut self) -> Option<Self::Item> {
        let id = self.back?;
        if self.front == self.back {
            self.finish();
        } else {
            self.back = self.tree.predecessor(id);
        }
        let tree: &'a RedBlackTree<K, V, C> = self.tree;
        let node = tree.node(id);
        Some((&node.key, &node.value))
    }
}
