//! Per-operation pipeline state.

use relstore_core::{TableId, TransactionId};
use tracing::trace;

/// Pipeline state of one insert, update or delete.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OperationState {
    NotStarted,
    LockAcquired,
    LoggingOpen,
    IndexesMutated,
    RelationsValidated,
    Committed,
    RollingBack,
    LockReleased,
}

impl OperationState {
    /// Returns true for `Committed` and `LockReleased`.
    pub fn is_terminal(&self) -> bool {
        matches!(self, OperationState::Committed | OperationState::LockReleased)
    }

    /// Returns true if the pipeline may move from `self` to `next`.
    pub fn can_advance_to(&self, next: OperationState) -> bool {
        use OperationState::*;
        match (*self, next) {
            (NotStarted, LockAcquired)
            | (LockAcquired, LoggingOpen)
            | (LoggingOpen, IndexesMutated)
            | (IndexesMutated, RelationsValidated)
            | (RelationsValidated, Committed)
            | (RollingBack, LockReleased) => true,
            (state, RollingBack) => !state.is_terminal() && state != RollingBack,
            _ => false,
        }
    }
}

/// Tracks and traces the state of a running operation.
#[derive(Debug)]
pub(crate) struct OperationTracker {
    kind: &'static str,
    table: TableId,
    txn: TransactionId,
    state: OperationState,
}

impl OperationTracker {
    pub(crate) fn new(kind: &'static str, table: TableId, txn: TransactionId) -> Self {
        Self {
            kind,
            table,
            txn,
            state: OperationState::NotStarted,
        }
    }

    pub(crate) fn state(&self) -> OperationState {
        self.state
    }

    pub(crate) fn advance(&mut self, next: OperationState) {
        debug_assert!(
            self.state.can_advance_to(next),
            "{} cannot move from {:?} to {:?}",
            self.kind,
            self.state,
            next
        );
        trace!(
            table = %self.table,
            txn = self.txn,
            op = self.kind,
            from = ?self.state,
            to = ?next,
            "operation state"
        );
        self.state = next;
    }

    /// Moves to `RollingBack` unless the operation already ended.
    pub(crate) fn fail(&mut self) {
        if !self.state.is_terminal() && self.state != OperationState::RollingBack {
            self.advance(OperationState::RollingBack);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use OperationState::*;

    #[test]
    fn test_happy_path() {
        let mut op = OperationTracker::new("insert", TableId(1), 1);
        for next in [LockAcquired, LoggingOpen, IndexesMutated, RelationsValidated, Committed] {
            op.advance(next);
        }
        assert!(op.state().is_terminal());
    }

    #[test]
    fn test_failure_path() {
        let mut op = OperationTracker::new("delete", TableId(1), 1);
        op.advance(LockAcquired);
        op.advance(LoggingOpen);
        op.fail();
        assert_eq!(op.state(), RollingBack);
        op.fail();
        assert_eq!(op.state(), RollingBack);
        op.advance(LockReleased);
        assert!(op.state().is_terminal());
    }

    #[test]
    fn test_transitions() {
        assert!(NotStarted.can_advance_to(RollingBack));
        assert!(!Committed.can_advance_to(RollingBack));
        assert!(!NotStarted.can_advance_to(IndexesMutated));
        assert!(!LockReleased.can_advance_to(LockAcquired));
    }
}
