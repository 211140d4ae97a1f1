//! Red-black tree implementation.

use super::iter::Range;
use super::node::{Color, Node, NodeId, NodeRef};
use crate::comparator::Comparator;
use crate::traits::{IndexError, KeyRange};
use alloc::vec::Vec;
use core::cmp::Ordering;
use core::mem;

/// An arena-backed red-black tree ordered by a [`Comparator`].
///
/// Keys are unique under the comparator. Nodes live in a single `Vec`; a
/// removed slot is filled by the last node of the arena and the links that
/// pointed at the moved node are patched, so the arena never holds holes.
#[derive(Debug)]
pub struct RedBlackTree<K, V, C> {
    arena: Vec<Node<K, V>>,
    root: Option<NodeId>,
    comparator: C,
}

impl<K, V, C: Comparator<K>> RedBlackTree<K, V, C> {
    /// Creates an empty tree ordered by `comparator`.
    pub fn new(comparator: C) -> Self {
        Self {
            arena: Vec::new(),
            root: None,
            comparator,
        }
    }

    /// Returns the number of keys in the tree.
    #[inline]
    pub fn len(&self) -> usize {
        self.arena.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.arena.is_empty()
    }

    /// Returns the comparator ordering this tree.
    pub fn comparator(&self) -> &C {
        &self.comparator
    }

    /// Returns a view of the root node.
    pub fn root(&self) -> Option<NodeRef<'_, K, V>> {
        self.root.map(|id| NodeRef {
            arena: &self.arena,
            id,
        })
    }

    /// Removes every node.
    pub fn clear(&mut self) {
        self.arena.clear();
        self.root = None;
    }

    #[inline]
    pub(super) fn node(&self, id: NodeId) -> &Node<K, V> {
        &self.arena[id]
    }

    fn find(&self, key: &K) -> Option<NodeId> {
        let mut current = self.root;
        while let Some(id) = current {
            let node = &self.arena[id];
            current = match self.comparator.compare(key, &node.key) {
                Ordering::Less => node.left,
                Ordering::Greater => node.right,
                Ordering::Equal => return Some(id),
            };
        }
        None
    }

    /// Looks up the value stored under `key`.
    pub fn get(&self, key: &K) -> Option<&V> {
        self.find(key).map(|id| &self.arena[id].value)
    }

    /// Looks up the value stored under `key` for modification.
    pub fn get_mut(&mut self, key: &K) -> Option<&mut V> {
        self.find(key).map(move |id| &mut self.arena[id].value)
    }

    pub fn contains_key(&self, key: &K) -> bool {
        self.find(key).is_some()
    }

    /// Inserts a new key. Fails with [`IndexError::DuplicateKey`] if a key
    /// comparing equal is already present; the tree is left unchanged.
    pub fn insert(&mut self, key: K, value: V) -> Result<(), IndexError> {
        let mut parent = None;
        let mut went_left = false;
        let mut current = self.root;

        while let Some(id) = current {
            parent = Some(id);
            let node = &self.arena[id];
            match self.comparator.compare(&key, &node.key) {
                Ordering::Less => {
                    went_left = true;
                    current = node.left;
                }
                Ordering::Greater => {
                    went_left = false;
                    current = node.right;
                }
                Ordering::Equal => return Err(IndexError::DuplicateKey),
            }
        }

        let id = self.arena.len();
        self.arena.push(Node::new(key, value, parent));
        match parent {
            None => self.root = Some(id),
            Some(p) if went_left => self.arena[p].left = Some(id),
            Some(p) => self.arena[p].right = Some(id),
        }
        self.insert_fixup(id);
        Ok(())
    }

    /// Removes `key` and returns its value.
    pub fn remove(&mut self, key: &K) -> Option<V> {
        let found = self.find(key)?;

        // A node with two children trades its payload with its in-order
        // successor, which has no left child, and the successor is unlinked.
        let target = match (self.arena[found].left, self.arena[found].right) {
            (Some(_), Some(right)) => {
                let successor = self.leftmost(right);
                self.swap_payload(found, successor);
                successor
            }
            _ => found,
        };

        let child = self.arena[target].left.or(self.arena[target].right);
        let parent = self.arena[target].parent;
        if let Some(c) = child {
            self.arena[c].parent = parent;
        }
        self.replace_child(parent, target, child);

        if self.arena[target].color == Color::Black {
            self.remove_fixup(child, parent);
        }

        Some(self.free(target).value)
    }

    /// Smallest key and its value.
    pub fn min(&self) -> Option<(&K, &V)> {
        self.root.map(|r| {
            let node = &self.arena[self.leftmost(r)];
            (&node.key, &node.value)
        })
    }

    /// Largest key and its value.
    pub fn max(&self) -> Option<(&K, &V)> {
        self.root.map(|r| {
            let node = &self.arena[self.rightmost(r)];
            (&node.key, &node.value)
        })
    }

    /// In-order traversal over all entries.
    pub fn iter(&self) -> Range<'_, K, V, C> {
        self.range(&KeyRange::All)
    }

    /// In-order traversal over the entries whose keys fall in `range`.
    ///
    /// Both ends are located by descending from the root and pruning the
    /// subtrees outside the bounds; the walk between them follows parent
    /// links.
    pub fn range(&self, range: &KeyRange<K>) -> Range<'_, K, V, C> {
        let front = self.first_in(range);
        let back = self.last_in(range);
        match (front, back) {
            (Some(f), Some(b))
                if self.comparator.compare(&self.arena[f].key, &self.arena[b].key)
                    != Ordering::Greater =>
            {
                Range::new(self, Some(f), Some(b))
            }
            _ => Range::new(self, None, None),
        }
    }

    /// Entries with keys after `from`; `open` excludes `from` itself.
    pub fn select_greater(&self, from: K, open: bool) -> Range<'_, K, V, C> {
        self.range(&KeyRange::lower_bound(from, open))
    }

    /// Entries with keys before `to`; `open` excludes `to` itself.
    pub fn select_less(&self, to: K, open: bool) -> Range<'_, K, V, C> {
        self.range(&KeyRange::upper_bound(to, open))
    }

    fn first_in(&self, range: &KeyRange<K>) -> Option<NodeId> {
        let mut candidate = None;
        let mut current = self.root;
        while let Some(id) = current {
            let node = &self.arena[id];
            if range.above_lower(&node.key, &self.comparator) {
                candidate = Some(id);
                current = node.left;
            } else {
                current = node.right;
            }
        }
        candidate
    }

    fn last_in(&self, range: &KeyRange<K>) -> Option<NodeId> {
        let mut candidate = None;
        let mut current = self.root;
        while let Some(id) = current {
            let node = &self.arena[id];
            if range.below_upper(&node.key, &self.comparator) {
                candidate = Some(id);
                current = node.right;
            } else {
                current = node.left;
            }
        }
        candidate
    }

    pub(super) fn successor(&self, id: NodeId) -> Option<NodeId> {
        if let Some(right) = self.arena[id].right {
            return Some(self.leftmost(right));
        }
        let mut current = id;
        while let Some(parent) = self.arena[current].parent {
            if self.arena[parent].left == Some(current) {
                return Some(parent);
            }
            current = parent;
        }
        None
    }

    pub(super) fn predecessor(&self, id: NodeId) -> Option<NodeId> {
        if let Some(left) = self.arena[id].left {
            return Some(self.rightmost(left));
        }
        let mut current = id;
        while let Some(parent) = self.arena[current].parent {
            if self.arena[parent].right == Some(current) {
                return Some(parent);
            }
            current = parent;
        }
        None
    }

    fn leftmost(&self, mut id: NodeId) -> NodeId {
        while let Some(left) = self.arena[id].left {
            id = left;
        }
        id
    }

    fn rightmost(&self, mut id: NodeId) -> NodeId {
        while let Some(right) = self.arena[id].right {
            id = right;
        }
        id
    }

    #[inline]
    fn is_red(&self, id: Option<NodeId>) -> bool {
        id.is_some_and(|id| self.arena[id].is_red())
    }

    #[inline]
    fn set_color(&mut self, id: Option<NodeId>, color: Color) {
        if let Some(id) = id {
            self.arena[id].color = color;
        }
    }

    /// Points `parent`'s link to `old` at `new` instead; a missing parent
    /// means `old` was the root.
    fn replace_child(&mut self, parent: Option<NodeId>, old: NodeId, new: Option<NodeId>) {
        match parent {
            None => self.root = new,
            Some(p) => {
                if self.arena[p].left == Some(old) {
                    self.arena[p].left = new;
                } else {
                    self.arena[p].right = new;
                }
            }
        }
    }

    fn rotate_left(&mut self, x: NodeId) {
        let Some(y) = self.arena[x].right else {
            return;
        };
        let inner = self.arena[y].left;
        self.arena[x].right = inner;
        if let Some(b) = inner {
            self.arena[b].parent = Some(x);
        }
        let parent = self.arena[x].parent;
        self.arena[y].parent = parent;
        self.replace_child(parent, x, Some(y));
        self.arena[y].left = Some(x);
        self.arena[x].parent = Some(y);
    }

    fn rotate_right(&mut self, x: NodeId) {
        let Some(y) = self.arena[x].left else {
            return;
        };
        let inner = self.arena[y].right;
        self.arena[x].left = inner;
        if let Some(b) = inner {
            self.arena[b].parent = Some(x);
        }
        let parent = self.arena[x].parent;
        self.arena[y].parent = parent;
        self.replace_child(parent, x, Some(y));
        self.arena[y].right = Some(x);
        self.arena[x].parent = Some(y);
    }

    fn insert_fixup(&mut self, mut z: NodeId) {
        while let Some(parent) = self.arena[z].parent {
            if !self.arena[parent].is_red() {
                break;
            }
            // A red parent is never the root.
            let Some(grand) = self.arena[parent].parent else {
                break;
            };

            if self.arena[grand].left == Some(parent) {
                let uncle = self.arena[grand].right;
                if self.is_red(uncle) {
                    self.arena[parent].color = Color::Black;
                    self.set_color(uncle, Color::Black);
                    self.arena[grand].color = Color::Red;
                    z = grand;
                    continue;
                }
                let mut parent = parent;
                if self.arena[parent].right == Some(z) {
                    // left-right: reduce to left-left
                    z = parent;
                    self.rotate_left(z);
                    parent = match self.arena[z].parent {
                        Some(p) => p,
                        None => break,
                    };
                }
                self.arena[parent].color = Color::Black;
                self.arena[grand].color = Color::Red;
                self.rotate_right(grand);
            } else {
                let uncle = self.arena[grand].left;
                if self.is_red(uncle) {
                    self.arena[parent].color = Color::Black;
                    self.set_color(uncle, Color::Black);
                    self.arena[grand].color = Color::Red;
                    z = grand;
                    continue;
                }
                let mut parent = parent;
                if self.arena[parent].left == Some(z) {
                    // right-left: reduce to right-right
                    z = parent;
                    self.rotate_right(z);
                    parent = match self.arena[z].parent {
                        Some(p) => p,
                        None => break,
                    };
                }
                self.arena[parent].color = Color::Black;
                self.arena[grand].color = Color::Red;
                self.rotate_left(grand);
            }
        }
        self.set_color(self.root, Color::Black);
    }

    /// Restores black-height after a black node was unlinked. `x` is the
    /// spliced-in child (possibly absent) and `parent` its parent.
    fn remove_fixup(&mut self, mut x: Option<NodeId>, mut parent: Option<NodeId>) {
        while x != self.root && !self.is_red(x) {
            let Some(p) = parent else {
                break;
            };

            if self.arena[p].left == x {
                // The sibling of a doubly-black position always exists.
                let Some(mut w) = self.arena[p].right else {
                    break;
                };
                if self.arena[w].is_red() {
                    self.arena[w].color = Color::Black;
                    self.arena[p].color = Color::Red;
                    self.rotate_left(p);
                    w = match self.arena[p].right {
                        Some(w) => w,
                        None => break,
                    };
                }
                if !self.is_red(self.arena[w].left) && !self.is_red(self.arena[w].right) {
                    self.arena[w].color = Color::Red;
                    x = Some(p);
                    parent = self.arena[p].parent;
                } else {
                    if !self.is_red(self.arena[w].right) {
                        self.set_color(self.arena[w].left, Color::Black);
                        self.arena[w].color = Color::Red;
                        self.rotate_right(w);
                        w = match self.arena[p].right {
                            Some(w) => w,
                            None => break,
                        };
                    }
                    self.arena[w].color = self.arena[p].color;
                    self.arena[p].color = Color::Black;
                    self.set_color(self.arena[w].right, Color::Black);
                    self.rotate_left(p);
                    x = self.root;
                    parent = None;
                }
            } else {
                let Some(mut w) = self.arena[p].left else {
                    break;
                };
                if self.arena[w].is_red() {
                    self.arena[w].color = Color::Black;
                    self.arena[p].color = Color::Red;
                    self.rotate_right(p);
                    w = match self.arena[p].left {
                        Some(w) => w,
                        None => break,
                    };
                }
                if !self.is_red(self.arena[w].left) && !self.is_red(self.arena[w].right) {
                    self.arena[w].color = Color::Red;
                    x = Some(p);
                    parent = self.arena[p].parent;
                } else {
                    if !self.is_red(self.arena[w].left) {
                        self.set_color(self.arena[w].right, Color::Black);
                        self.arena[w].color = Color::Red;
                        self.rotate_left(w);
                        w = match self.arena[p].left {
                            Some(w) => w,
                            None => break,
                        };
                    }
                    self.arena[w].color = self.arena[p].color;
                    self.arena[p].color = Color::Black;
                    self.set_color(self.arena[w].left, Color::Black);
                    self.rotate_right(p);
                    x = self.root;
                    parent = None;
                }
            }
        }
        self.set_color(x, Color::Black);
    }

    fn swap_payload(&mut self, a: NodeId, b: NodeId) {
        if a == b {
            return;
        }
        let (lo, hi) = if a < b { (a, b) } else { (b, a) };
        let (head, tail) = self.arena.split_at_mut(hi);
        let (x, y) = (&mut head[lo], &mut tail[0]);
        mem::swap(&mut x.key, &mut y.key);
        mem::swap(&mut x.value, &mut y.value);
    }

    /// Releases an unlinked node's slot. The last node of the arena moves
    /// into the slot and its neighbours are re-pointed.
    fn free(&mut self, id: NodeId) -> Node<K, V> {
        let last = self.arena.len() - 1;
        let node = self.arena.swap_remove(id);
        if id != last {
            let moved = &self.arena[id];
            let (parent, left, right) = (moved.parent, moved.left, moved.right);
            match parent {
                None => self.root = Some(id),
                Some(p) => {
                    if self.arena[p].left == Some(last) {
                        self.arena[p].left = Some(id);
                    } else {
                        self.arena[p].right = Some(id);
                    }
                }
            }
            if let Some(l) = left {
                self.arena[l].parent = Some(id);
            }
            if let Some(r) = right {
                self.arena[r].parent = Some(id);
            }
        }
        node
    }

    /// Checks every red-black and search-tree invariant, returning the
    /// black-height of the tree (counting the null leaves).
    pub fn validate(&self) -> Result<usize, &'static str> {
        let Some(root) = self.root else {
            return if self.arena.is_empty() {
                Ok(1)
            } else {
                Err("detached nodes in arena")
            };
        };
        if self.arena[root].is_red() {
            return Err("root is red");
        }
        if self.arena[root].parent.is_some() {
            return Err("root has a parent");
        }
        let mut visited = 0;
        let height = self.validate_subtree(root, None, None, &mut visited)?;
        if visited != self.arena.len() {
            return Err("detached nodes in arena");
        }
        Ok(height)
    }

    fn validate_subtree(
        &self,
        id: NodeId,
        lower: Option<&K>,
        upper: Option<&K>,
        visited: &mut usize,
    ) -> Result<usize, &'static str> {
        *visited += 1;
        let node = &self.arena[id];
        if let Some(lower) = lower {
            if self.comparator.compare(&node.key, lower) != Ordering::Greater {
                return Err("keys out of order");
            }
        }
        if let Some(upper) = upper {
            if self.comparator.compare(&node.key, upper) != Ordering::Less {
                return Err("keys out of order");
            }
        }

        let mut heights = [1usize; 2];
        for (slot, child) in [node.left, node.right].into_iter().enumerate() {
            let Some(child) = child else {
                continue;
            };
            if self.arena[child].parent != Some(id) {
                return Err("broken parent link");
            }
            if node.is_red() && self.arena[child].is_red() {
                return Err("red node with red child");
            }
            heights[slot] = if slot == 0 {
                self.validate_subtree(child, lower, Some(&node.key), visited)?
            } else {
                self.validate_subtree(child, Some(&node.key), upper, visited)?
            };
        }

        if heights[0] != heights[1] {
            return Err("unequal black height");
        }
        Ok(heights[0] + usize::from(!node.is_red()))
    }
}
