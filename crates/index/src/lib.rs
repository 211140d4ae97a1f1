//! Index structures for relstore tables.
//!
//! Every table keeps one unique primary index plus any number of secondary
//! indexes, each backed by one of:
//!
//! - [`TreeIndex`]: a red-black tree ordered by a [`Comparator`], answering
//!   point lookups and [`KeyRange`] scans in either direction
//! - [`HashIndex`]: hashed point lookups with no ordering
//!
//! Both map a key to the [`RowId`](relstore_core::RowId)s stored under it.
//!
//! ```rust
//! use relstore_index::{HashIndex, Index, KeyRange, RangeIndex, TreeIndex};
//!
//! let mut by_price: TreeIndex<i32> = TreeIndex::new(false);
//! for (row, price) in [(1, 30), (2, 10), (3, 30), (4, 20)] {
//!     by_price.add(price, row).unwrap();
//! }
//! assert_eq!(by_price.get(&30), vec![1, 3]);
//! assert_eq!(by_price.get_range(&KeyRange::upper_bound(20, false), true, None), vec![4, 2]);
//!
//! let mut by_sku: HashIndex<&str> = HashIndex::new(true);
//! by_sku.add("A-1", 1).unwrap();
//! assert!(by_sku.add("A-1", 2).is_err());
//! ```

#![no_std]

extern crate alloc;

pub mod comparator;
pub mod hash;
pub mod rbtree;
pub mod stats;
pub mod traits;

pub use comparator::{Comparator, KeyComparator, Order, SimpleComparator};
pub use hash::HashIndex;
pub use rbtree::{Color, RedBlackTree, TreeIndex};
pub use stats::IndexStats;
pub use traits::{Index, IndexError, KeyRange, RangeIndex};
