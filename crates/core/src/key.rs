//! Key model.
//!
//! A [`Key`] is a value extracted from an entity that an index is keyed by:
//! a scalar, an `Option` of a key (a nullable column) or a tuple of keys (a
//! composite key). Keys compare honoring a per-column [`Order`]; nulls sort
//! before non-null values in ascending order and the sign flips under
//! descending order.

use crate::types::{Binary, RowVersion};
use core::cmp::Ordering;
use core::fmt::Debug;
use core::hash::Hash;
use uuid::Uuid;

/// Sort order for a key column.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum Order {
    /// Ascending order (smallest first).
    #[default]
    Asc,
    /// Descending order (largest first).
    Desc,
}

impl Order {
    /// Applies this order to a comparison result.
    #[inline]
    pub fn apply(&self, ord: Ordering) -> Ordering {
        match self {
            Order::Asc => ord,
            Order::Desc => ord.reverse(),
        }
    }
}

/// A value an index can be keyed by.
pub trait Key: Clone + Eq + Hash + Debug + Send + Sync + 'static {
    /// Number of columns this key spans.
    fn arity() -> usize {
        1
    }

    /// Compares two keys column by column, applying `orders[i]` to column `i`.
    /// Missing orders default to ascending.
    fn compare_ordered(&self, other: &Self, orders: &[Order]) -> Ordering;

    /// Returns true if the key represents "no value": a null, or a composite
    /// key with any null component. Empty foreign keys are exempt from
    /// referential checks.
    fn is_empty_key(&self) -> bool {
        false
    }
}

#[inline]
fn first_order(orders: &[Order]) -> Order {
    orders.first().copied().unwrap_or_default()
}

macro_rules! scalar_key {
    ($($ty:ty),* $(,)?) => {
        $(
            impl Key for $ty {
                #[inline]
                fn compare_ordered(&self, other: &Self, orders: &[Order]) -> Ordering {
                    first_order(orders).apply(self.cmp(other))
                }
            }
        )*
    };
}

scalar_key!(
    bool, char, i8, i16, i32, i64, i128, u8, u16, u32, u64, u128, usize, isize, String, Uuid,
    RowVersion, Binary,
);

impl<T: Key> Key for Option<T> {
    fn arity() -> usize {
        T::arity()
    }

    fn compare_ordered(&self, other: &Self, orders: &[Order]) -> Ordering {
        match (self, other) {
            (Some(a), Some(b)) => a.compare_ordered(b, orders),
            (None, Some(_)) => first_order(orders).apply(Ordering::Less),
            (Some(_), None) => first_order(orders).apply(Ordering::Greater),
            (None, None) => Ordering::Equal,
        }
    }

    fn is_empty_key(&self) -> bool {
        match self {
            Some(inner) => inner.is_empty_key(),
            None => true,
        }
    }
}

macro_rules! tuple_key {
    ($(($($name:ident $idx:tt),+))+) => {
        $(
            impl<$($name: Key),+> Key for ($($name,)+) {
                fn arity() -> usize {
                    [$($idx),+].len()
                }

                fn compare_ordered(&self, other: &Self, orders: &[Order]) -> Ordering {
                    $(
                        let column = orders.get($idx..$idx + 1).unwrap_or(&[]);
                        let cmp = self.$idx.compare_ordered(&other.$idx, column);
                        if cmp != Ordering::Equal {
                            return cmp;
                        }
                    )+
                    Ordering::Equal
                }

                fn is_empty_key(&self) -> bool {
                    $(self.$idx.is_empty_key())||+
                }
            }
        )+
    };
}

tuple_key! {
    (A 0, B 1)
    (A 0, B 1, C 2)
    (A 0, B 1, C 2, D 3)
    (A 0, B 1, C 2, D 3, E 4)
}
