//! Transaction management for relstore.
//!
//! A transaction owns an undo log and the table locks taken on its behalf.
//! Every table mutation runs inside an atomic section: a span that records
//! a checkpoint on entry and, if the mutation fails, rolls the log back to
//! it before the error propagates.

use crate::lock::LockManager;
use crate::log::{LogPosition, TransactionLog, UndoRecord};
use parking_lot::Mutex;
use relstore_core::{Error, Result, TransactionId};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

/// Transaction state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TransactionState {
    /// Transaction is active and can perform operations.
    Active,
    /// Transaction has been committed.
    Committed,
    /// Transaction has been rolled back.
    RolledBack,
}

/// A database transaction.
///
/// Dropping an active transaction rolls it back.
pub struct Transaction {
    /// Unique transaction ID.
    id: TransactionId,
    /// Undo records for the changes made so far.
    log: Mutex<TransactionLog>,
    /// Current state.
    state: Mutex<TransactionState>,
    /// Set while an atomic section is open.
    atomic_section: AtomicBool,
    /// Lock manager holding this transaction's table locks.
    locks: Arc<dyn LockManager>,
}

impl Transaction {
    pub(crate) fn begin(id: TransactionId, locks: Arc<dyn LockManager>) -> Self {
        debug!(txn = id, "transaction started");
        Self {
            id,
            log: Mutex::new(TransactionLog::new()),
            state: Mutex::new(TransactionState::Active),
            atomic_section: AtomicBool::new(false),
            locks,
        }
    }

    /// Returns the transaction ID.
    pub fn id(&self) -> TransactionId {
        self.id
    }

    /// Returns the current state.
    pub fn state(&self) -> TransactionState {
        *self.state.lock()
    }

    /// Returns true if the transaction is active.
    pub fn is_active(&self) -> bool {
        self.state() == TransactionState::Active
    }

    /// Number of undo records currently held.
    pub fn log_len(&self) -> usize {
        self.log.lock().len()
    }

    /// Checks if the transaction is active, returns error if not.
    pub(crate) fn ensure_active(&self) -> Result<()> {
        if !self.is_active() {
            return Err(Error::invalid_operation("Transaction is not active"));
        }
        Ok(())
    }

    pub(crate) fn lock_manager(&self) -> &dyn LockManager {
        self.locks.as_ref()
    }

    /// Appends an undo record.
    pub(crate) fn write(&self, record: Box<dyn UndoRecord>) {
        self.log.lock().write(record);
    }

    /// Marks the current end of the log.
    pub fn savepoint(&self) -> LogPosition {
        self.log.lock().position()
    }

    /// Undoes every change made after `position`. Locks stay held.
    pub fn rollback_to(&self, position: LogPosition) -> Result<()> {
        self.ensure_active()?;
        if self.atomic_section.load(Ordering::Acquire) {
            return Err(Error::invalid_operation(
                "cannot roll back while an atomic section is open",
            ));
        }
        self.undo_to(position)
    }

    fn undo_to(&self, position: LogPosition) -> Result<()> {
        // Undo outside the log mutex; undo records take table locks.
        let mut tail = {
            let mut log = self.log.lock();
            if position.offset() > log.len() {
                return Err(Error::invalid_operation(format!(
                    "log position {} is past the end of the log ({})",
                    position.offset(),
                    log.len()
                )));
            }
            log.split_off(position)
        };
        tail.rollback_to(LogPosition::START)
    }

    /// Runs `f` as an atomic section.
    ///
    /// On error every record written by `f` is undone before the error is
    /// returned unchanged. Sections do not nest.
    pub(crate) fn atomic<T>(&self, f: impl FnOnce() -> Result<T>) -> Result<T> {
        self.ensure_active()?;
        if self.atomic_section.swap(true, Ordering::AcqRel) {
            return Err(Error::invalid_operation("atomic section already open"));
        }
        let _section = SectionGuard(&self.atomic_section);

        let checkpoint = self.savepoint();
        match f() {
            Ok(value) => Ok(value),
            Err(e) => {
                warn!(txn = self.id, checkpoint = checkpoint.offset(), error = %e, "rolling back to checkpoint");
                if let Err(undo) = self.undo_to(checkpoint) {
                    warn!(txn = self.id, error = %undo, "rollback incomplete");
                }
                Err(e)
            }
        }
    }

    /// Commits the transaction, discarding the undo log and releasing locks.
    pub fn commit(self) -> Result<()> {
        self.ensure_active()?;
        *self.state.lock() = TransactionState::Committed;
        let records = {
            let mut log = self.log.lock();
            let len = log.len();
            log.clear();
            len
        };
        self.locks.release_all(self.id);
        debug!(txn = self.id, records, "transaction committed");
        Ok(())
    }

    /// Rolls back the transaction, undoing every change and releasing locks.
    pub fn rollback(self) -> Result<()> {
        self.ensure_active()?;
        self.abort()
    }

    fn abort(&self) -> Result<()> {
        *self.state.lock() = TransactionState::RolledBack;
        let result = self.undo_to(LogPosition::START);
        self.locks.release_all(self.id);
        debug!(txn = self.id, "transaction rolled back");
        result
    }
}

impl Drop for Transaction {
    fn drop(&mut self) {
        if self.is_active() {
            warn!(txn = self.id, "active transaction dropped; rolling back");
            let _ = self.abort();
        }
    }
}

impl std::fmt::Debug for Transaction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transaction")
            .field("id", &self.id)
            .field("state", &self.state())
            .field("log_len", &self.log_len())
            .finish()
    }
}

struct SectionGuard<'a>(&'a AtomicBool);

impl Drop for SectionGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}
