//! Key extraction metadata.

use crate::entity::{Entity, FieldSet};
use crate::error::{Error, Result};
use crate::key::{Key, Order};
use core::cmp::Ordering;
use core::fmt;
use std::sync::Arc;

/// Describes how an index key is built from an entity.
///
/// Holds the ordered source columns, a per-column sort order, the key
/// selector, and derives the comparer and emptiness test from them.
/// Immutable once built; cloning is cheap.
pub struct KeyInfo<E, K> {
    columns: Arc<[&'static str]>,
    positions: FieldSet,
    orders: Arc<[Order]>,
    selector: Arc<dyn Fn(&E) -> K + Send + Sync>,
}

impl<E, K> Clone for KeyInfo<E, K> {
    fn clone(&self) -> Self {
        Self {
            columns: Arc::clone(&self.columns),
            positions: self.positions.clone(),
            orders: Arc::clone(&self.orders),
            selector: Arc::clone(&self.selector),
        }
    }
}

impl<E: Entity, K: Key> KeyInfo<E, K> {
    /// Creates key info over the given columns, all ascending.
    pub fn new<F>(columns: &[&'static str], selector: F) -> Result<Self>
    where
        F: Fn(&E) -> K + Send + Sync + 'static,
    {
        let orders = vec![Order::Asc; columns.len()];
        Self::with_orders(columns, &orders, selector)
    }

    /// Creates key info with an explicit order per column.
    pub fn with_orders<F>(columns: &[&'static str], orders: &[Order], selector: F) -> Result<Self>
    where
        F: Fn(&E) -> K + Send + Sync + 'static,
    {
        if columns.is_empty() {
            return Err(Error::invalid_schema("key must span at least one column"));
        }
        if columns.len() != orders.len() {
            return Err(Error::invalid_schema(format!(
                "{} key columns but {} sort orders",
                columns.len(),
                orders.len()
            )));
        }
        if columns.len() != K::arity() {
            return Err(Error::invalid_schema(format!(
                "key type spans {} column(s) but {} were named",
                K::arity(),
                columns.len()
            )));
        }

        let mut positions = FieldSet::empty();
        for column in columns {
            let pos = E::field_position(column).ok_or_else(|| {
                Error::invalid_schema(format!("unknown column {} in key", column))
            })?;
            positions.insert(pos);
        }

        Ok(Self {
            columns: columns.into(),
            positions,
            orders: orders.into(),
            selector: Arc::new(selector),
        })
    }

    /// Extracts the key from an entity.
    #[inline]
    pub fn select(&self, entity: &E) -> K {
        (self.selector)(entity)
    }

    /// Compares two keys under the per-column orders.
    #[inline]
    pub fn compare(&self, a: &K, b: &K) -> Ordering {
        a.compare_ordered(b, &self.orders)
    }

    /// Returns true if the key represents "no value".
    #[inline]
    pub fn is_empty(&self, key: &K) -> bool {
        key.is_empty_key()
    }

    /// Source column names in key order.
    pub fn columns(&self) -> &[&'static str] {
        &self.columns
    }

    /// Source column positions as a set.
    pub fn positions(&self) -> &FieldSet {
        &self.positions
    }

    /// Per-column sort orders.
    pub fn orders(&self) -> &[Order] {
        &self.orders
    }

    /// Shared handle to the per-column orders.
    pub fn shared_orders(&self) -> Arc<[Order]> {
        Arc::clone(&self.orders)
    }

    /// Returns true if a change to `changed` can alter this key.
    #[inline]
    pub fn is_affected_by(&self, changed: &FieldSet) -> bool {
        self.positions.intersects(changed)
    }
}

impl<E, K> fmt::Debug for KeyInfo<E, K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyInfo")
            .field("columns", &self.columns)
            .field("orders", &self.orders)
            .finish()
    }
}
