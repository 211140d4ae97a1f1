//! Hashed index: point lookups only.

use crate::stats::IndexStats;
use crate::traits::{Index, IndexError, KeyRange};
use alloc::vec;
use alloc::vec::Vec;
use core::hash::Hash;
use hashbrown::hash_map::Entry;
use hashbrown::HashMap;
use relstore_core::RowId;

#[derive(Debug)]
enum Slots<K> {
    /// One row per key.
    Unique(HashMap<K, RowId>),
    /// Rows per key in insertion order.
    Multi(HashMap<K, Vec<RowId>>),
}

/// A hashed index over keys of type `K`.
///
/// Range requests other than `All` and `Only` cannot be answered; callers
/// that need ordered scans use [`TreeIndex`](crate::TreeIndex).
#[derive(Debug)]
pub struct HashIndex<K> {
    slots: Slots<K>,
    stats: IndexStats,
}

impl<K: Eq + Hash> HashIndex<K> {
    pub fn new(unique: bool) -> Self {
        let slots = if unique {
            Slots::Unique(HashMap::new())
        } else {
            Slots::Multi(HashMap::new())
        };
        Self {
            slots,
            stats: IndexStats::new(),
        }
    }

    pub fn stats(&self) -> &IndexStats {
        &self.stats
    }

    /// Number of distinct keys.
    pub fn key_count(&self) -> usize {
        match &self.slots {
            Slots::Unique(map) => map.len(),
            Slots::Multi(map) => map.len(),
        }
    }
}

impl<K: Eq + Hash> Index<K> for HashIndex<K> {
    fn add(&mut self, key: K, value: RowId) -> Result<(), IndexError> {
        let new_key = match &mut self.slots {
            Slots::Unique(map) => match map.entry(key) {
                Entry::Occupied(_) => return Err(IndexError::DuplicateKey),
                Entry::Vacant(slot) => {
                    slot.insert(value);
                    true
                }
            },
            Slots::Multi(map) => match map.entry(key) {
                Entry::Occupied(mut rows) => {
                    rows.get_mut().push(value);
                    false
                }
                Entry::Vacant(slot) => {
                    slot.insert(vec![value]);
                    true
                }
            },
        };
        self.stats.record_insert(new_key);
        Ok(())
    }

    fn get(&self, key: &K) -> Vec<RowId> {
        match &self.slots {
            Slots::Unique(map) => map.get(key).map(|&row| vec![row]).unwrap_or_default(),
            Slots::Multi(map) => map.get(key).cloned().unwrap_or_default(),
        }
    }

    fn get_unique(&self, key: &K) -> Option<RowId> {
        match &self.slots {
            Slots::Unique(map) => map.get(key).copied(),
            Slots::Multi(map) => map.get(key).and_then(|rows| rows.first().copied()),
        }
    }

    fn remove(&mut self, key: &K, value: RowId) -> bool {
        let key_gone = match &mut self.slots {
            Slots::Unique(map) => {
                if map.get(key) != Some(&value) {
                    return false;
                }
                map.remove(key);
                true
            }
            Slots::Multi(map) => {
                let Some(rows) = map.get_mut(key) else {
                    return false;
                };
                let Some(pos) = rows.iter().position(|&row| row == value) else {
                    return false;
                };
                rows.remove(pos);
                let emptied = rows.is_empty();
                if emptied {
                    map.remove(key);
                }
                emptied
            }
        };
        self.stats.record_remove(key_gone);
        true
    }

    fn contains_key(&self, key: &K) -> bool {
        match &self.slots {
            Slots::Unique(map) => map.contains_key(key),
            Slots::Multi(map) => map.contains_key(key),
        }
    }

    fn len(&self) -> usize {
        self.stats.total_rows()
    }

    fn is_unique(&self) -> bool {
        matches!(self.slots, Slots::Unique(_))
    }

    fn clear(&mut self) {
        match &mut self.slots {
            Slots::Unique(map) => map.clear(),
            Slots::Multi(map) => map.clear(),
        }
        self.stats.reset();
    }

    fn get_all(&self) -> Vec<RowId> {
        match &self.slots {
            Slots::Unique(map) => map.values().copied().collect(),
            Slots::Multi(map) => map.values().flatten().copied().collect(),
        }
    }

    fn cost(&self, range: &KeyRange<K>) -> usize {
        match range {
            KeyRange::Only(key) => self.get(key).len(),
            // every other range degrades to a full scan
            _ => self.stats.total_rows(),
        }
    }
}
