//! Ordered index backed by the red-black tree.

use super::tree::RedBlackTree;
use crate::comparator::{Comparator, KeyComparator};
use crate::stats::IndexStats;
use crate::traits::{Index, IndexError, KeyRange, RangeIndex};
use alloc::vec;
use alloc::vec::Vec;
use relstore_core::{Key, RowId};

/// An ordered index supporting point lookups and range scans.
///
/// Each tree node holds one logical key and the row IDs carrying it. A
/// unique index keeps at most one row per key; a non-unique index keeps
/// rows in insertion order.
#[derive(Debug)]
pub struct TreeIndex<K, C = KeyComparator> {
    tree: RedBlackTree<K, Vec<RowId>, C>,
    unique: bool,
    stats: IndexStats,
}

impl<K: Key> TreeIndex<K, KeyComparator> {
    /// Creates an ascending tree index.
    pub fn new(unique: bool) -> Self {
        Self::with_comparator(unique, KeyComparator::ascending(K::arity()))
    }
}

impl<K, C: Comparator<K>> TreeIndex<K, C> {
    /// Creates a tree index with a custom comparator.
    pub fn with_comparator(unique: bool, comparator: C) -> Self {
        Self {
            tree: RedBlackTree::new(comparator),
            unique,
            stats: IndexStats::new(),
        }
    }

    /// Returns the statistics for this index.
    pub fn stats(&self) -> &IndexStats {
        &self.stats
    }

    /// Returns the underlying tree.
    pub fn tree(&self) -> &RedBlackTree<K, Vec<RowId>, C> {
        &self.tree
    }

    /// Returns the number of distinct keys.
    pub fn key_count(&self) -> usize {
        self.tree.len()
    }
}

impl<K, C: Comparator<K>> Index<K> for TreeIndex<K, C> {
    fn add(&mut self, key: K, value: RowId) -> Result<(), IndexError> {
        match self.tree.get_mut(&key) {
            Some(_) if self.unique => return Err(IndexError::DuplicateKey),
            Some(rows) => rows.push(value),
            None => {
                self.tree.insert(key, vec![value])?;
                self.stats.record_insert(true);
                return Ok(());
            }
        }
        self.stats.record_insert(false);
        Ok(())
    }

    fn get(&self, key: &K) -> Vec<RowId> {
        self.tree.get(key).cloned().unwrap_or_default()
    }

    fn remove(&mut self, key: &K, value: RowId) -> bool {
        let Some(rows) = self.tree.get_mut(key) else {
            return false;
        };
        let Some(pos) = rows.iter().position(|&r| r == value) else {
            return false;
        };
        rows.remove(pos);
        let key_gone = rows.is_empty();
        if key_gone {
            self.tree.remove(key);
        }
        self.stats.record_remove(key_gone);
        true
    }

    fn contains_key(&self, key: &K) -> bool {
        self.tree.contains_key(key)
    }

    fn len(&self) -> usize {
        self.stats.total_rows()
    }

    fn is_unique(&self) -> bool {
        self.unique
    }

    fn clear(&mut self) {
        self.tree.clear();
        self.stats.reset();
    }

    fn get_all(&self) -> Vec<RowId> {
        self.tree
            .iter()
            .flat_map(|(_, rows)| rows.iter().copied())
            .collect()
    }

    fn cost(&self, range: &KeyRange<K>) -> usize {
        match range {
            KeyRange::All => self.stats.total_rows(),
            KeyRange::Only(key) => self.tree.get(key).map_or(0, Vec::len),
            _ => self.tree.range(range).map(|(_, rows)| rows.len()).sum(),
        }
    }
}

impl<K, C: Comparator<K>> RangeIndex<K> for TreeIndex<K, C> {
    fn get_range(&self, range: &KeyRange<K>, reverse: bool, limit: Option<usize>) -> Vec<RowId> {
        let limit = limit.unwrap_or(usize::MAX);
        let entries = self.tree.range(range);
        if reverse {
            entries
                .rev()
                .flat_map(|(_, rows)| rows.iter().rev().copied())
                .take(limit)
                .collect()
        } else {
            entries
                .flat_map(|(_, rows)| rows.iter().copied())
                .take(limit)
                .collect()
        }
    }

    fn min(&self) -> Option<(&K, Vec<RowId>)> {
        self.tree.min().map(|(k, rows)| (k, rows.clone()))
    }

    fn max(&self) -> Option<(&K, Vec<RowId>)> {
        self.tree.max().map(|(k, rows)| (k, rows.clone()))
    }
}
