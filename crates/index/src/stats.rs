//! Index statistics for relstore.
//!
//! Counters are updated by the owning index under its `&mut self`; they
//! back `len` and feed cost estimates.

/// Row and key counts of one index.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct IndexStats {
    rows: usize,
    keys: usize,
}

impl IndexStats {
    pub const fn new() -> Self {
        Self { rows: 0, keys: 0 }
    }

    /// Number of row entries.
    pub fn total_rows(&self) -> usize {
        self.rows
    }

    /// Number of distinct keys.
    pub fn distinct_keys(&self) -> usize {
        self.keys
    }

    /// Records one row entering the index; `new_key` if its key was absent.
    pub(crate) fn record_insert(&mut self, new_key: bool) {
        self.rows += 1;
        if new_key {
            self.keys += 1;
        }
    }

    /// Records one row leaving the index; `key_gone` if it was the last
    /// row under its key.
    pub(crate) fn record_remove(&mut self, key_gone: bool) {
        self.rows = self.rows.saturating_sub(1);
        if key_gone {
            self.keys = self.keys.saturating_sub(1);
        }
    }

    /// Average rows per key rounded up, the expected result size of a point
    /// lookup. Zero when empty.
    pub fn rows_per_key(&self) -> usize {
        if self.keys == 0 {
            0
        } else {
            self.rows.div_ceil(self.keys)
        }
    }

    pub(crate) fn reset(&mut self) {
        *self = Self::new();
    }
}
