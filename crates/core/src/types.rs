//! Identifier and opaque value types shared by every relstore crate.

use core::fmt;

/// Identifier of a stored row inside one table.
///
/// Row ids are allocated by the owning table and never reused while the
/// table lives; indexes map keys to row ids rather than to entities.
pub type RowId = u64;

/// Identifier of a transaction.
pub type TransactionId = u64;

/// Identifier of a table, handed out by the owning database in creation order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TableId(pub u32);

impl fmt::Display for TableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "table#{}", self.0)
    }
}

/// Position of an index inside its table. The primary index is always `0`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct IndexId(pub u32);

impl IndexId {
    /// The primary (unique) index of every table.
    pub const PRIMARY: IndexId = IndexId(0);

    /// Returns true for the primary index slot.
    #[inline]
    pub fn is_primary(&self) -> bool {
        *self == Self::PRIMARY
    }
}

/// Identifier of a relation, handed out by the owning database.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RelationId(pub u32);

/// Opaque row-version token.
///
/// A fresh token is stamped on every insert and update of a row that carries
/// a row-version constraint. Tokens are totally ordered by issue time.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RowVersion(u64);

impl RowVersion {
    /// Creates a token from its raw value.
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the raw value.
    pub const fn raw(&self) -> u64 {
        self.0
    }

    /// Returns true if the token was never stamped.
    pub const fn is_unset(&self) -> bool {
        self.0 == 0
    }
}

/// Opaque binary blob stored in an entity field.
#[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Binary(Vec<u8>);

impl Binary {
    /// Wraps raw bytes.
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    /// Returns the bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Returns the blob length in bytes.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if the blob holds no bytes.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<u8>> for Binary {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

impl From<&[u8]> for Binary {
    fn from(bytes: &[u8]) -> Self {
        Self(bytes.to_vec())
    }
}
