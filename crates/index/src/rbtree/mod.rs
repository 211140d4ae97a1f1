//! Red-black tree index implementation for relstore.
//!
//! This module provides a self-balancing ordered tree and the range-capable
//! index built on it.

mod index;
mod iter;
mod node;
mod tree;

pub use index::TreeIndex;
pub use iter::Range;
pub use node::{Color, NodeId, NodeRef};
pub use tree::RedBlackTree;
