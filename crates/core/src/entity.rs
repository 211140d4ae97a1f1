//! Entity model.
//!
//! An entity is a plain-data record: value fields, strings, [`Binary`] blobs
//! and [`RowVersion`] tokens, never shared references. A field-by-field copy
//! (`Clone`) therefore always yields an isolated snapshot, which is what the
//! table relies on for its copy-in/copy-out isolation.
//!
//! [`Binary`]: crate::Binary
//! [`RowVersion`]: crate::RowVersion

use core::fmt;

/// A set of field positions, as declared by [`Entity::fields`].
///
/// Backed by a growable bitset, one word per 64 fields. Positions are only
/// ever added, so the last word is never zero and equal sets compare equal.
#[derive(Clone, Default, PartialEq, Eq, Hash)]
pub struct FieldSet(Vec<u64>);

impl FieldSet {
    const WORD: usize = u64::BITS as usize;

    /// The empty set.
    pub const fn empty() -> Self {
        Self(Vec::new())
    }

    /// Builds a set from field positions.
    pub fn from_positions(positions: &[usize]) -> Self {
        let mut set = Self::empty();
        for &pos in positions {
            set.insert(pos);
        }
        set
    }

    /// Adds a field position.
    #[inline]
    pub fn insert(&mut self, position: usize) {
        let word = position / Self::WORD;
        if word >= self.0.len() {
            self.0.resize(word + 1, 0);
        }
        self.0[word] |= 1u64 << (position % Self::WORD);
    }

    /// Returns true if the position is in the set.
    #[inline]
    pub fn contains(&self, position: usize) -> bool {
        self.0
            .get(position / Self::WORD)
            .is_some_and(|word| word & (1u64 << (position % Self::WORD)) != 0)
    }

    /// Returns true if no field is in the set.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns true if both sets share a position.
    #[inline]
    pub fn intersects(&self, other: &FieldSet) -> bool {
        self.0.iter().zip(&other.0).any(|(a, b)| a & b != 0)
    }

    /// Returns the number of positions in the set.
    pub fn len(&self) -> usize {
        self.0.iter().map(|word| word.count_ones() as usize).sum()
    }

    /// Iterates positions in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        self.0.iter().enumerate().flat_map(|(index, &word)| {
            (0..Self::WORD)
                .filter(move |bit| word & (1u64 << bit) != 0)
                .map(move |bit| index * Self::WORD + bit)
        })
    }
}

impl fmt::Debug for FieldSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

/// A record type that can be stored in a table.
///
/// Implement it with [`impl_entity!`](crate::impl_entity), which generates
/// the field list and the field-level change detector from the struct's
/// field names.
pub trait Entity: Clone + fmt::Debug + Send + Sync + 'static {
    /// Field names in declaration order.
    fn fields() -> &'static [&'static str];

    /// Returns the positions of the fields whose values differ.
    fn changed_fields(&self, other: &Self) -> FieldSet;

    /// Copies every field of `source` onto `self`.
    fn copy_from(&mut self, source: &Self) {
        self.clone_from(source);
    }

    /// Resolves a field name to its position.
    fn field_position(name: &str) -> Option<usize> {
        Self::fields().iter().position(|f| *f == name)
    }
}

/// Implements [`Entity`] for a struct whose listed fields all implement
/// `PartialEq`.
///
/// ```
/// use relstore_core::{impl_entity, Entity};
///
/// #[derive(Clone, Debug)]
/// struct Order {
///     id: i32,
///     customer: String,
/// }
///
/// impl_entity!(Order { id, customer });
///
/// let a = Order { id: 1, customer: "ann".into() };
/// let mut b = a.clone();
/// b.customer = "bob".into();
/// assert_eq!(Order::fields(), &["id", "customer"]);
/// assert!(a.changed_fields(&b).contains(1));
/// ```
#[macro_export]
macro_rules! impl_entity {
    ($ty:ty { $($field:ident),+ $(,)? }) => {
        impl $crate::Entity for $ty {
            fn fields() -> &'static [&'static str] {
                &[$(stringify!($field)),+]
            }

            fn changed_fields(&self, other: &Self) -> $crate::FieldSet {
                let mut changed = $crate::FieldSet::empty();
                let mut position = 0usize;
                $(
                    if self.$field != other.$field {
                        changed.insert(position);
                    }
                    position += 1;
                )+
                let _ = position;
                changed
            }
        }
    };
}
