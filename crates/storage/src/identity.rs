//! Identity (auto-increment) columns.

use relstore_core::{Entity, Error, Result};
use std::fmt;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

/// Declares an identity column: where the value lives and how it advances.
pub struct IdentitySpec<E> {
    column: &'static str,
    seed: i64,
    increment: i64,
    get: Arc<dyn Fn(&E) -> i64 + Send + Sync>,
    set: Arc<dyn Fn(&mut E, i64) + Send + Sync>,
}

impl<E: Entity> IdentitySpec<E> {
    /// Identity on `column` starting at 1 and advancing by 1.
    pub fn new<G, S>(column: &'static str, get: G, set: S) -> Self
    where
        G: Fn(&E) -> i64 + Send + Sync + 'static,
        S: Fn(&mut E, i64) + Send + Sync + 'static,
    {
        Self {
            column,
            seed: 1,
            increment: 1,
            get: Arc::new(get),
            set: Arc::new(set),
        }
    }

    /// Sets the first generated value.
    #[must_use]
    pub fn seed(mut self, seed: i64) -> Self {
        self.seed = seed;
        self
    }

    /// Sets the step between generated values. May be negative.
    #[must_use]
    pub fn increment(mut self, increment: i64) -> Self {
        self.increment = increment;
        self
    }

    pub fn column(&self) -> &'static str {
        self.column
    }
}

impl<E> fmt::Debug for IdentitySpec<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IdentitySpec")
            .field("column", &self.column)
            .field("seed", &self.seed)
            .field("increment", &self.increment)
            .finish()
    }
}

/// Live identity generator of one table.
///
/// `last` holds the most recently issued value; the next value is
/// `last + increment`, claimed with a single fetch-and-add.
pub(crate) struct Identity<E> {
    spec: IdentitySpec<E>,
    last: AtomicI64,
}

impl<E: Entity> Identity<E> {
    pub(crate) fn new(spec: IdentitySpec<E>) -> Result<Self> {
        if spec.increment == 0 {
            return Err(Error::invalid_schema(format!(
                "identity column {} has a zero increment",
                spec.column
            )));
        }
        if E::field_position(spec.column).is_none() {
            return Err(Error::invalid_schema(format!(
                "unknown identity column {}",
                spec.column
            )));
        }
        let last = spec.seed.wrapping_sub(spec.increment);
        Ok(Self {
            spec,
            last: AtomicI64::new(last),
        })
    }

    pub(crate) fn column(&self) -> &'static str {
        self.spec.column
    }

    /// Claims the next value and writes it into `entity`.
    pub(crate) fn assign(&self, entity: &mut E) -> i64 {
        let increment = self.spec.increment;
        let value = self
            .last
            .fetch_add(increment, Ordering::SeqCst)
            .wrapping_add(increment);
        (self.spec.set)(entity, value);
        value
    }

    /// The value the next insert will receive.
    pub(crate) fn peek_next(&self) -> i64 {
        self.last
            .load(Ordering::SeqCst)
            .wrapping_add(self.spec.increment)
    }

    /// Restarts the sequence after the extremum of `rows`: the maximum for
    /// ascending identities, the minimum for descending ones. An empty
    /// table restarts at the seed. Returns the next value.
    pub(crate) fn reseed<'a>(&self, rows: impl Iterator<Item = &'a E>) -> i64
    where
        E: 'a,
    {
        let values = rows.map(|row| (self.spec.get)(row));
        let extremum = if self.spec.increment > 0 {
            values.max()
        } else {
            values.min()
        };
        let last = extremum.unwrap_or_else(|| self.spec.seed.wrapping_sub(self.spec.increment));
        self.last.store(last, Ordering::SeqCst);
        self.peek_next()
    }
}
