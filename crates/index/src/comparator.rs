//! Key comparators for tree indexes.
//!
//! [`SimpleComparator`] orders any `Ord` key in one direction.
//! [`KeyComparator`] honors a per-column order and is what tables use.

use alloc::sync::Arc;
use alloc::vec;
use core::cmp::Ordering;
use relstore_core::Key;

pub use relstore_core::Order;

/// Total order over index keys used by the tree.
pub trait Comparator<K> {
    fn compare(&self, a: &K, b: &K) -> Ordering;
}

/// A simple comparator for single keys that implement Ord.
#[derive(Clone, Debug)]
pub struct SimpleComparator {
    order: Order,
}

impl SimpleComparator {
    /// Creates a new simple comparator with the given order.
    pub fn new(order: Order) -> Self {
        Self { order }
    }

    /// Creates an ascending comparator.
    pub fn asc() -> Self {
        Self::new(Order::Asc)
    }

    /// Creates a descending comparator.
    pub fn desc() -> Self {
        Self::new(Order::Desc)
    }

    /// Returns the order of this comparator.
    pub fn order(&self) -> Order {
        self.order
    }
}

impl Default for SimpleComparator {
    fn default() -> Self {
        Self::asc()
    }
}

impl<K: Ord> Comparator<K> for SimpleComparator {
    fn compare(&self, a: &K, b: &K) -> Ordering {
        self.order.apply(a.cmp(b))
    }
}

/// Comparator for index keys honoring a per-column sort order.
///
/// Composite keys compare column by column; nullable columns sort nulls
/// first under ascending order and last under descending order.
#[derive(Clone, Debug)]
pub struct KeyComparator {
    orders: Arc<[Order]>,
}

impl KeyComparator {
    /// Creates a comparator from per-column orders.
    pub fn new(orders: impl Into<Arc<[Order]>>) -> Self {
        Self { orders: orders.into() }
    }

    /// Creates an ascending comparator for a key spanning `columns` columns.
    pub fn ascending(columns: usize) -> Self {
        Self::new(vec![Order::Asc; columns])
    }

    /// Returns the per-column orders.
    pub fn orders(&self) -> &[Order] {
        &self.orders
    }
}

impl<K: Key> Comparator<K> for KeyComparator {
    #[inline]
    fn compare(&self, a: &K, b: &K) -> Ordering {
        a.compare_ordered(b, &self.orders)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::string::String;

    #[test]
    fn test_simple_comparator() {
        assert_eq!(SimpleComparator::asc().compare(&3, &8), Ordering::Less);
        assert_eq!(SimpleComparator::desc().compare(&3, &8), Ordering::Greater);
        assert_eq!(SimpleComparator::default().compare(&"x", &"x"), Ordering::Equal);
        assert_eq!(SimpleComparator::desc().order(), Order::Desc);
    }

    #[test]
    fn test_mixed_column_orders() {
        let cmp = KeyComparator::new(vec![Order::Asc, Order::Desc]);
        assert_eq!(cmp.compare(&(1, 10), &(2, 5)), Ordering::Less);
        // tie on the first column falls through to the descending second
        assert_eq!(cmp.compare(&(1, 10), &(1, 5)), Ordering::Less);
        assert_eq!(cmp.compare(&(4, 4), &(4, 4)), Ordering::Equal);
    }

    #[test]
    fn test_null_placement() {
        let asc = KeyComparator::ascending(2);
        assert_eq!(asc.orders(), &[Order::Asc, Order::Asc]);
        assert_eq!(asc.compare(&(None, Some(9)), &(Some(0), Some(0))), Ordering::Less);
        assert_eq!(asc.compare(&(Some(1), None), &(Some(1), Some(-5))), Ordering::Less);

        let desc = KeyComparator::new(vec![Order::Desc]);
        assert_eq!(desc.compare(&None::<i32>, &Some(1)), Ordering::Greater);
    }

    #[test]
    fn test_string_columns() {
        let cmp = KeyComparator::ascending(2);
        let red = (String::from("apple"), String::from("red"));
        let green = (String::from("apple"), String::from("green"));
        assert_eq!(cmp.compare(&red, &green), Ordering::Greater);
    }
}
