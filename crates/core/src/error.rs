//! Error types for relstore.

use crate::types::TableId;
use thiserror::Error;

/// Result type alias for relstore operations.
pub type Result<T> = core::result::Result<T, Error>;

/// Failures surfaced by the lock manager.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ConcurrencyError {
    /// The lock was not granted within the configured timeout.
    #[error("lock on {table} not granted within {waited_ms} ms")]
    Timeout {
        /// Table whose lock was requested.
        table: TableId,
        /// Time spent waiting.
        waited_ms: u64,
    },
    /// Granting the lock would close a wait cycle.
    #[error("deadlock detected while waiting for {table}")]
    Deadlock {
        /// Table whose lock was requested.
        table: TableId,
    },
}

/// Error types for relstore operations.
#[derive(Debug, Error)]
pub enum Error {
    /// A unique index already holds the key.
    #[error("duplicate key {key} in unique index {index}")]
    DuplicateKey {
        /// Qualified index name (`table.index`).
        index: String,
        /// Offending key.
        key: String,
    },
    /// A non-empty foreign key has no matching primary row.
    #[error("foreign key violation between {primary_index} and {foreign_index}: key {key} not found")]
    ForeignKeyViolation {
        /// Qualified primary index name.
        primary_index: String,
        /// Qualified foreign index name.
        foreign_index: String,
        /// Offending foreign key.
        key: String,
    },
    /// A delete is blocked by rows that still reference the removed key.
    #[error("cannot remove key {key} from {primary_index}: {count} row(s) in {foreign_index} refer to it")]
    ReferringRowsExist {
        /// Qualified primary index name.
        primary_index: String,
        /// Qualified foreign index name.
        foreign_index: String,
        /// Removed primary key.
        key: String,
        /// Number of rows still referring to the key.
        count: usize,
    },
    /// Lock acquisition failed.
    #[error("concurrency failure: {0}")]
    Concurrency(#[from] ConcurrencyError),
    /// A column constraint rejected the row.
    #[error("constraint violation on {table}.{column}: {message}")]
    ConstraintViolation {
        /// Table name.
        table: String,
        /// Column name.
        column: String,
        /// Description of the violation.
        message: String,
    },
    /// Row not found.
    #[error("not found in table {table}: {key}")]
    NotFound {
        /// Table name.
        table: String,
        /// Requested key.
        key: String,
    },
    /// Invalid table, index or relation definition.
    #[error("invalid schema: {message}")]
    InvalidSchema {
        /// Description.
        message: String,
    },
    /// Operation not allowed in the current state.
    #[error("invalid operation: {message}")]
    InvalidOperation {
        /// Description.
        message: String,
    },
    /// Any other failure raised inside an atomic section.
    #[error("operation failed: {message}")]
    Operation {
        /// Description.
        message: String,
    },
}

impl Error {
    /// Creates a duplicate key error.
    pub fn duplicate_key(index: impl Into<String>, key: &impl core::fmt::Debug) -> Self {
        Error::DuplicateKey {
            index: index.into(),
            key: format!("{:?}", key),
        }
    }

    /// Creates a foreign key violation.
    pub fn foreign_key_violation(
        primary_index: impl Into<String>,
        foreign_index: impl Into<String>,
        key: &impl core::fmt::Debug,
    ) -> Self {
        Error::ForeignKeyViolation {
            primary_index: primary_index.into(),
            foreign_index: foreign_index.into(),
            key: format!("{:?}", key),
        }
    }

    /// Creates a referring-rows violation.
    pub fn referring_rows_exist(
        primary_index: impl Into<String>,
        foreign_index: impl Into<String>,
        key: &impl core::fmt::Debug,
        count: usize,
    ) -> Self {
        Error::ReferringRowsExist {
            primary_index: primary_index.into(),
            foreign_index: foreign_index.into(),
            key: format!("{:?}", key),
            count,
        }
    }

    /// Creates a constraint violation.
    pub fn constraint_violation(
        table: impl Into<String>,
        column: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Error::ConstraintViolation {
            table: table.into(),
            column: column.into(),
            message: message.into(),
        }
    }

    /// Creates a not found error.
    pub fn not_found(table: impl Into<String>, key: &impl core::fmt::Debug) -> Self {
        Error::NotFound {
            table: table.into(),
            key: format!("{:?}", key),
        }
    }

    /// Creates an invalid schema error.
    pub fn invalid_schema(message: impl Into<String>) -> Self {
        Error::InvalidSchema {
            message: message.into(),
        }
    }

    /// Creates an invalid operation error.
    pub fn invalid_operation(message: impl Into<String>) -> Self {
        Error::InvalidOperation {
            message: message.into(),
        }
    }

    /// Creates a generic operation failure.
    pub fn operation(message: impl Into<String>) -> Self {
        Error::Operation {
            message: message.into(),
        }
    }

    /// Returns true for referential integrity failures.
    pub fn is_referential(&self) -> bool {
        matches!(
            self,
            Error::ForeignKeyViolation { .. } | Error::ReferringRowsExist { .. }
        )
    }
}
