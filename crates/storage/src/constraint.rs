//! Column constraints.
//!
//! Constraints run against the stored copy of a row before it reaches any
//! index. Generating constraints (row versions, guids) fill in values;
//! validating constraints reject the row.

use crate::catalog::Catalog;
use relstore_core::{Entity, Error, Result, RowVersion, Uuid};
use std::fmt;
use std::sync::Arc;

/// Which mutation a constraint runs for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    Insert,
    Update,
}

type CustomCheck<E> = Arc<dyn Fn(&mut E, Phase) -> Result<()> + Send + Sync>;

/// A column constraint of a table.
pub enum Constraint<E> {
    /// Stamps a fresh row version on insert and update.
    RowVersionStamp {
        column: &'static str,
        set: fn(&mut E, RowVersion),
    },
    /// Replaces a nil uuid with a random one on insert.
    GeneratedGuid {
        column: &'static str,
        get: fn(&E) -> Uuid,
        set: fn(&mut E, Uuid),
    },
    /// Rejects rows where the column has no value.
    NotNull {
        column: &'static str,
        is_present: fn(&E) -> bool,
    },
    /// Rejects rows whose string column is longer than `max` characters.
    MaxLength {
        column: &'static str,
        get: fn(&E) -> &str,
        max: usize,
    },
    /// Arbitrary check; may also rewrite the row.
    Custom {
        name: &'static str,
        check: CustomCheck<E>,
    },
}

impl<E: Entity> Constraint<E> {
    pub fn row_version(column: &'static str, set: fn(&mut E, RowVersion)) -> Self {
        Constraint::RowVersionStamp { column, set }
    }

    pub fn generated_guid(column: &'static str, get: fn(&E) -> Uuid, set: fn(&mut E, Uuid)) -> Self {
        Constraint::GeneratedGuid { column, get, set }
    }

    pub fn not_null(column: &'static str, is_present: fn(&E) -> bool) -> Self {
        Constraint::NotNull { column, is_present }
    }

    pub fn max_length(column: &'static str, get: fn(&E) -> &str, max: usize) -> Self {
        Constraint::MaxLength { column, get, max }
    }

    pub fn custom<F>(name: &'static str, check: F) -> Self
    where
        F: Fn(&mut E, Phase) -> Result<()> + Send + Sync + 'static,
    {
        Constraint::Custom {
            name,
            check: Arc::new(check),
        }
    }

    /// Column the constraint is declared on, if any.
    pub fn column(&self) -> Option<&'static str> {
        match self {
            Constraint::RowVersionStamp { column, .. }
            | Constraint::GeneratedGuid { column, .. }
            | Constraint::NotNull { column, .. }
            | Constraint::MaxLength { column, .. } => Some(*column),
            Constraint::Custom { .. } => None,
        }
    }

    fn apply(&self, entity: &mut E, phase: Phase, table: &str, catalog: &Catalog) -> Result<()> {
        match self {
            Constraint::RowVersionStamp { set, .. } => {
                set(entity, catalog.next_row_version());
            }
            Constraint::GeneratedGuid { get, set, .. } => {
                if phase == Phase::Insert && get(entity).is_nil() {
                    set(entity, Uuid::new_v4());
                }
            }
            Constraint::NotNull { column, is_present } => {
                if !is_present(entity) {
                    return Err(Error::constraint_violation(table, *column, "value is required"));
                }
            }
            Constraint::MaxLength { column, get, max } => {
                let len = get(entity).chars().count();
                if len > *max {
                    return Err(Error::constraint_violation(
                        table,
                        *column,
                        format!("length {} exceeds {}", len, max),
                    ));
                }
            }
            Constraint::Custom { check, .. } => check(entity, phase)?,
        }
        Ok(())
    }
}

impl<E> fmt::Debug for Constraint<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Constraint::RowVersionStamp { column, .. } => write!(f, "RowVersionStamp({})", column),
            Constraint::GeneratedGuid { column, .. } => write!(f, "GeneratedGuid({})", column),
            Constraint::NotNull { column, .. } => write!(f, "NotNull({})", column),
            Constraint::MaxLength { column, max, .. } => write!(f, "MaxLength({}, {})", column, max),
            Constraint::Custom { name, .. } => write!(f, "Custom({})", name),
        }
    }
}

/// Constraint checker for validating database constraints.
pub(crate) struct ConstraintChecker;

impl ConstraintChecker {
    /// Rejects constraints declared on columns the entity does not have.
    pub(crate) fn check_schema<E: Entity>(constraints: &[Constraint<E>]) -> Result<()> {
        for constraint in constraints {
            if let Some(column) = constraint.column() {
                if E::field_position(column).is_none() {
                    return Err(Error::invalid_schema(format!(
                        "unknown column {} in {:?}",
                        column, constraint
                    )));
                }
            }
        }
        Ok(())
    }

    /// Applies every constraint in declaration order.
    pub(crate) fn apply_all<E: Entity>(
        constraints: &[Constraint<E>],
        entity: &mut E,
        phase: Phase,
        table: &str,
        catalog: &Catalog,
    ) -> Result<()> {
        for constraint in constraints {
            constraint.apply(entity, phase, table, catalog)?;
        }
        Ok(())
    }
}
