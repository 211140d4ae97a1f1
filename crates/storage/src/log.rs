//! Transaction undo log.
//!
//! The log is an append-only list of undo records. A [`LogPosition`] marks a
//! checkpoint; rolling back to it undoes every later record in strict
//! reverse order and truncates the log.

use relstore_core::{Error, Result};
use std::fmt;
use tracing::{error, trace};

/// A checkpoint in a transaction log.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LogPosition(usize);

impl LogPosition {
    /// Position of an empty log.
    pub const START: LogPosition = LogPosition(0);

    /// Number of records before this position.
    pub fn offset(&self) -> usize {
        self.0
    }
}

/// An undoable mutation.
pub trait UndoRecord: Send {
    /// Reverts the mutation.
    fn undo(&mut self) -> Result<()>;

    /// Short description used in logs.
    fn describe(&self) -> String;
}

/// Append-only list of undo records for one transaction.
#[derive(Default)]
pub struct TransactionLog {
    records: Vec<Box<dyn UndoRecord>>,
}

impl TransactionLog {
    /// Creates an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the current checkpoint.
    pub fn position(&self) -> LogPosition {
        LogPosition(self.records.len())
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Appends an undo record.
    pub fn write(&mut self, record: Box<dyn UndoRecord>) {
        trace!(position = self.records.len(), record = %record.describe(), "log append");
        self.records.push(record);
    }

    /// Undoes every record after `position`, newest first, then truncates.
    ///
    /// A failing record is logged and skipped so the remaining records are
    /// still undone; the first failure is returned.
    pub fn rollback_to(&mut self, position: LogPosition) -> Result<()> {
        if position.0 > self.records.len() {
            return Err(Error::invalid_operation(format!(
                "log position {} is past the end of the log ({})",
                position.0,
                self.records.len()
            )));
        }

        let mut first_error = None;
        while self.records.len() > position.0 {
            let Some(mut record) = self.records.pop() else {
                break;
            };
            if let Err(e) = record.undo() {
                error!(record = %record.describe(), error = %e, "undo failed");
                first_error.get_or_insert(e);
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Detaches the records after `position` into a new log.
    pub fn split_off(&mut self, position: LogPosition) -> TransactionLog {
        let at = position.0.min(self.records.len());
        TransactionLog {
            records: self.records.split_off(at),
        }
    }

    /// Discards every record without undoing it.
    pub fn clear(&mut self) {
        self.records.clear();
    }
}

impl fmt::Debug for TransactionLog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.records.iter().map(|r| r.describe()))
            .finish()
    }
}
