//! Index traits and key ranges.
//!
//! [`Index`] is the point-lookup contract both index kinds share;
//! [`RangeIndex`] adds ordered scans and is only implemented by the tree.

use crate::comparator::Comparator;
use alloc::vec::Vec;
use core::cmp::Ordering;
use relstore_core::RowId;

/// A key range for index queries.
///
/// Bounds are evaluated with the index's own comparator, so a range over a
/// descending index runs from the larger key to the smaller one.
#[derive(Clone, Debug, PartialEq)]
pub enum KeyRange<K> {
    /// Unbounded.
    All,
    /// Exactly one key.
    Only(K),
    /// From `value` onwards.
    LowerBound { value: K, exclusive: bool },
    /// Up to `value`.
    UpperBound { value: K, exclusive: bool },
    Bound {
        lower: K,
        upper: K,
        lower_exclusive: bool,
        upper_exclusive: bool,
    },
}

impl<K> KeyRange<K> {
    pub fn all() -> Self {
        KeyRange::All
    }

    pub fn only(key: K) -> Self {
        KeyRange::Only(key)
    }

    pub fn lower_bound(value: K, exclusive: bool) -> Self {
        KeyRange::LowerBound { value, exclusive }
    }

    pub fn upper_bound(value: K, exclusive: bool) -> Self {
        KeyRange::UpperBound { value, exclusive }
    }

    pub fn bound(lower: K, upper: K, lower_exclusive: bool, upper_exclusive: bool) -> Self {
        KeyRange::Bound {
            lower,
            upper,
            lower_exclusive,
            upper_exclusive,
        }
    }

    pub fn is_only(&self) -> bool {
        matches!(self, KeyRange::Only(_))
    }

    pub fn is_all(&self) -> bool {
        matches!(self, KeyRange::All)
    }

    /// Lower bound and its exclusivity; `Only` bounds itself on both sides.
    pub fn lower(&self) -> Option<(&K, bool)> {
        match self {
            KeyRange::Only(k) => Some((k, false)),
            KeyRange::LowerBound { value, exclusive } => Some((value, *exclusive)),
            KeyRange::Bound { lower, lower_exclusive, .. } => Some((lower, *lower_exclusive)),
            KeyRange::All | KeyRange::UpperBound { .. } => None,
        }
    }

    pub fn upper(&self) -> Option<(&K, bool)> {
        match self {
            KeyRange::Only(k) => Some((k, false)),
            KeyRange::UpperBound { value, exclusive } => Some((value, *exclusive)),
            KeyRange::Bound { upper, upper_exclusive, .. } => Some((upper, *upper_exclusive)),
            KeyRange::All | KeyRange::LowerBound { .. } => None,
        }
    }

    /// Returns true if `key` is at or after the lower bound.
    pub fn above_lower<C: Comparator<K>>(&self, key: &K, cmp: &C) -> bool {
        match self.lower() {
            None => true,
            Some((bound, exclusive)) => match cmp.compare(key, bound) {
                Ordering::Greater => true,
                Ordering::Equal => !exclusive,
                Ordering::Less => false,
            },
        }
    }

    /// Returns true if `key` is at or before the upper bound.
    pub fn below_upper<C: Comparator<K>>(&self, key: &K, cmp: &C) -> bool {
        match self.upper() {
            None => true,
            Some((bound, exclusive)) => match cmp.compare(key, bound) {
                Ordering::Less => true,
                Ordering::Equal => !exclusive,
                Ordering::Greater => false,
            },
        }
    }

    pub fn contains<C: Comparator<K>>(&self, key: &K, cmp: &C) -> bool {
        self.above_lower(key, cmp) && self.below_upper(key, cmp)
    }
}

/// Operations shared by every index kind.
///
/// An index maps keys to the row ids of the entities carrying that key. A
/// unique index holds at most one row id per key.
pub trait Index<K> {
    /// Maps `key` to `value`; a unique index refuses a key it already holds.
    fn add(&mut self, key: K, value: RowId) -> Result<(), IndexError>;

    /// Gets all row IDs associated with a key; empty if the key is absent.
    fn get(&self, key: &K) -> Vec<RowId>;

    /// Gets the single row ID of a unique key.
    fn get_unique(&self, key: &K) -> Option<RowId> {
        self.get(key).first().copied()
    }

    /// Removes one value from a key. Returns false if the pair was absent.
    fn remove(&mut self, key: &K, value: RowId) -> bool;

    /// Checks if the index contains the given key.
    fn contains_key(&self, key: &K) -> bool;

    /// Returns the number of entries (row IDs) in the index.
    fn len(&self) -> usize;

    /// Returns true if the index is empty.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns whether this index rejects duplicate keys.
    fn is_unique(&self) -> bool;

    /// Clears all entries from the index.
    fn clear(&mut self);

    /// Returns every row ID in the index (key order for ordered indexes).
    fn get_all(&self) -> Vec<RowId>;

    /// Returns the estimated cost (number of rows) for a key range query.
    fn cost(&self, range: &KeyRange<K>) -> usize;
}

/// Ordered scans over an index that keeps its keys sorted.
pub trait RangeIndex<K>: Index<K> {
    /// Gets all row IDs within the given key range, in key order.
    fn get_range(&self, range: &KeyRange<K>, reverse: bool, limit: Option<usize>) -> Vec<RowId>;

    /// Row IDs with keys after `from`.
    fn select_greater(&self, from: K, open: bool) -> Vec<RowId> {
        self.get_range(&KeyRange::lower_bound(from, open), false, None)
    }

    /// Row IDs with keys before `to`.
    fn select_less(&self, to: K, open: bool) -> Vec<RowId> {
        self.get_range(&KeyRange::upper_bound(to, open), false, None)
    }

    /// Returns the minimum key and its values.
    fn min(&self) -> Option<(&K, Vec<RowId>)>;

    /// Returns the maximum key and its values.
    fn max(&self) -> Option<(&K, Vec<RowId>)>;
}

/// Error type for index operations.
#[derive(Clone, Debug, PartialEq)]
pub enum IndexError {
    /// A unique index already holds the key.
    DuplicateKey,
    /// Key not found.
    KeyNotFound,
}

impl core::fmt::Display for IndexError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            IndexError::DuplicateKey => write!(f, "duplicate key in unique index"),
            IndexError::KeyNotFound => write!(f, "key not found"),
        }
    }
}
