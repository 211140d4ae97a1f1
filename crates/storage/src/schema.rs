//! Table definitions.

use crate::config::IndexKind;
use crate::constraint::{Constraint, ConstraintChecker};
use crate::identity::IdentitySpec;
use relstore_core::{Entity, Error, Key, KeyInfo, Result};

/// Name of the primary index when none is given.
pub const DEFAULT_PRIMARY_INDEX: &str = "pk";

/// Builder for a table definition, consumed by `Database::create_table`.
pub struct TableBuilder<E, PK> {
    pub(crate) name: String,
    pub(crate) primary_key: KeyInfo<E, PK>,
    pub(crate) primary_index_name: String,
    pub(crate) index_kind: Option<IndexKind>,
    pub(crate) identity: Option<IdentitySpec<E>>,
    pub(crate) constraints: Vec<Constraint<E>>,
}

impl<E: Entity, PK: Key> TableBuilder<E, PK> {
    /// Creates a builder for a table keyed by `primary_key`.
    pub fn new(name: impl Into<String>, primary_key: KeyInfo<E, PK>) -> Result<Self> {
        let name = name.into();
        check_naming_rules(&name)?;
        Ok(Self {
            name,
            primary_key,
            primary_index_name: DEFAULT_PRIMARY_INDEX.to_string(),
            index_kind: None,
            identity: None,
            constraints: Vec::new(),
        })
    }

    /// Renames the primary index.
    pub fn primary_index_name(mut self, name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        check_naming_rules(&name)?;
        self.primary_index_name = name;
        Ok(self)
    }

    /// Overrides the configured primary index kind.
    pub fn index_kind(mut self, kind: IndexKind) -> Self {
        self.index_kind = Some(kind);
        self
    }

    /// Declares the identity column.
    pub fn identity(mut self, spec: IdentitySpec<E>) -> Self {
        self.identity = Some(spec);
        self
    }

    /// Adds a column constraint. Constraints run in the order added.
    pub fn constraint(mut self, constraint: Constraint<E>) -> Self {
        self.constraints.push(constraint);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn validate(&self) -> Result<()> {
        ConstraintChecker::check_schema(&self.constraints)
    }
}

/// Validates a name follows naming rules.
pub(crate) fn check_naming_rules(name: &str) -> Result<()> {
    let Some(first) = name.chars().next() else {
        return Err(Error::invalid_schema("Name cannot be empty"));
    };
    if !first.is_ascii_alphabetic() && first != '_' {
        return Err(Error::invalid_schema(format!(
            "Name must start with letter or underscore: {}",
            name
        )));
    }
    if !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(Error::invalid_schema(format!(
            "Name contains invalid characters: {}",
            name
        )));
    }
    Ok(())
}
