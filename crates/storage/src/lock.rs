//! Lock management for relstore.
//!
//! Tables are locked at table granularity on behalf of a transaction. The
//! storage layer only depends on the [`LockManager`] contract; the
//! [`DefaultLockManager`] provides blocking shared/exclusive locks with a
//! timeout and wait-for graph deadlock detection.

use crate::config::DatabaseConfig;
use hashbrown::{HashMap, HashSet};
use parking_lot::{Condvar, Mutex};
use relstore_core::{ConcurrencyError, TableId, TransactionId};
use std::time::{Duration, Instant};
use tracing::trace;

/// Lock type.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LockType {
    /// Shared lock (read).
    Shared,
    /// Exclusive lock (write).
    Exclusive,
}

/// Per-table read/write lock contract consumed by the table pipeline.
///
/// Acquisition is reentrant per transaction: asking again for a lock the
/// transaction already holds (or a read lock under a held write lock)
/// succeeds immediately.
pub trait LockManager: Send + Sync {
    /// Acquires a shared lock on `table`.
    fn acquire_read(&self, table: TableId, txn: TransactionId) -> Result<(), ConcurrencyError>;

    /// Acquires an exclusive lock on `table`.
    fn acquire_write(&self, table: TableId, txn: TransactionId) -> Result<(), ConcurrencyError>;

    /// Acquires the lock taken on a table reached through a relation.
    fn acquire_related(&self, table: TableId, txn: TransactionId) -> Result<(), ConcurrencyError> {
        self.acquire_write(table, txn)
    }

    /// Returns true if `txn` holds any lock on `table`.
    fn is_held(&self, table: TableId, txn: TransactionId) -> bool;

    /// Releases a shared lock.
    fn release_read(&self, table: TableId, txn: TransactionId);

    /// Releases an exclusive lock.
    fn release_write(&self, table: TableId, txn: TransactionId);

    /// Releases every lock held by `txn`.
    fn release_all(&self, txn: TransactionId);
}

/// Lock state for a table.
#[derive(Clone, Debug, Default)]
struct LockState {
    /// Transactions holding shared locks.
    shared_holders: HashSet<TransactionId>,
    /// Transaction holding exclusive lock (if any).
    exclusive_holder: Option<TransactionId>,
}

impl LockState {
    fn is_free(&self) -> bool {
        self.shared_holders.is_empty() && self.exclusive_holder.is_none()
    }

    fn holds(&self, txn: TransactionId, lock_type: LockType) -> bool {
        match lock_type {
            LockType::Shared => {
                self.shared_holders.contains(&txn) || self.exclusive_holder == Some(txn)
            }
            LockType::Exclusive => self.exclusive_holder == Some(txn),
        }
    }

    fn can_grant(&self, txn: TransactionId, lock_type: LockType) -> bool {
        match lock_type {
            // Can grant shared if no exclusive lock or we already hold it
            LockType::Shared => self.exclusive_holder.is_none() || self.exclusive_holder == Some(txn),
            // Can grant exclusive if no locks or only we hold shared
            LockType::Exclusive => {
                self.exclusive_holder == Some(txn)
                    || (self.exclusive_holder.is_none()
                        && self.shared_holders.iter().all(|&holder| holder == txn))
            }
        }
    }

    fn grant(&mut self, txn: TransactionId, lock_type: LockType) {
        match lock_type {
            LockType::Shared => {
                if self.exclusive_holder != Some(txn) {
                    self.shared_holders.insert(txn);
                }
            }
            LockType::Exclusive => {
                // Upgrade from shared if needed
                self.shared_holders.remove(&txn);
                self.exclusive_holder = Some(txn);
            }
        }
    }

    /// Transactions `txn` has to wait for.
    fn blockers(&self, txn: TransactionId, lock_type: LockType) -> HashSet<TransactionId> {
        let mut blockers: HashSet<TransactionId> = self.exclusive_holder.into_iter().collect();
        if lock_type == LockType::Exclusive {
            blockers.extend(self.shared_holders.iter().copied());
        }
        blockers.remove(&txn);
        blockers
    }

    fn release(&mut self, txn: TransactionId) {
        self.shared_holders.remove(&txn);
        if self.exclusive_holder == Some(txn) {
            self.exclusive_holder = None;
        }
    }
}

#[derive(Debug, Default)]
struct LockTable {
    /// Locks by table.
    locks: HashMap<TableId, LockState>,
    /// Wait-for graph: waiter -> transactions it is blocked on.
    waits: HashMap<TransactionId, HashSet<TransactionId>>,
}

impl LockTable {
    /// DFS from `start` along wait-for edges looking for a path back to it.
    fn has_cycle(&self, start: TransactionId) -> bool {
        let mut visited = HashSet::new();
        let mut stack: Vec<TransactionId> = self
            .waits
            .get(&start)
            .map(|holders| holders.iter().copied().collect())
            .unwrap_or_default();

        while let Some(current) = stack.pop() {
            if current == start {
                return true;
            }
            if !visited.insert(current) {
                continue;
            }
            if let Some(holders) = self.waits.get(&current) {
                stack.extend(holders.iter().copied());
            }
        }
        false
    }

    fn release(&mut self, table: TableId, txn: TransactionId) {
        if let Some(state) = self.locks.get_mut(&table) {
            state.release(txn);
            if state.is_free() {
                self.locks.remove(&table);
            }
        }
    }
}

/// Blocking table lock manager.
#[derive(Debug)]
pub struct DefaultLockManager {
    table: Mutex<LockTable>,
    released: Condvar,
    timeout: Duration,
    deadlock_detection: bool,
}

impl DefaultLockManager {
    /// Creates a lock manager with the given timeout and deadlock detection.
    pub fn new(timeout: Duration, deadlock_detection: bool) -> Self {
        Self {
            table: Mutex::new(LockTable::default()),
            released: Condvar::new(),
            timeout,
            deadlock_detection,
        }
    }

    /// Creates a lock manager from database configuration.
    pub fn from_config(config: &DatabaseConfig) -> Self {
        Self::new(config.lock_timeout, config.deadlock_detection)
    }

    fn acquire(
        &self,
        table_id: TableId,
        txn: TransactionId,
        lock_type: LockType,
    ) -> Result<(), ConcurrencyError> {
        let started = Instant::now();
        let deadline = started + self.timeout;
        let mut table = self.table.lock();

        loop {
            let state = table.locks.entry(table_id).or_default();
            if state.holds(txn, lock_type) {
                return Ok(());
            }
            if state.can_grant(txn, lock_type) {
                state.grant(txn, lock_type);
                table.waits.remove(&txn);
                trace!(table = %table_id, txn, ?lock_type, "lock granted");
                return Ok(());
            }

            let blockers = state.blockers(txn, lock_type);
            table.waits.insert(txn, blockers);
            if self.deadlock_detection && table.has_cycle(txn) {
                table.waits.remove(&txn);
                trace!(table = %table_id, txn, "deadlock detected");
                return Err(ConcurrencyError::Deadlock { table: table_id });
            }

            trace!(table = %table_id, txn, ?lock_type, "waiting for lock");
            if self.released.wait_until(&mut table, deadline).timed_out() {
                let state = table.locks.entry(table_id).or_default();
                if state.can_grant(txn, lock_type) {
                    state.grant(txn, lock_type);
                    table.waits.remove(&txn);
                    return Ok(());
                }
                table.waits.remove(&txn);
                return Err(ConcurrencyError::Timeout {
                    table: table_id,
                    waited_ms: started.elapsed().as_millis() as u64,
                });
            }
        }
    }

    /// Checks if a transaction holds a lock on a table.
    pub fn holds_lock(&self, table: TableId, txn: TransactionId) -> bool {
        self.table
            .lock()
            .locks
            .get(&table)
            .is_some_and(|state| state.holds(txn, LockType::Shared))
    }

    /// Checks if a transaction holds an exclusive lock on a table.
    pub fn holds_exclusive(&self, table: TableId, txn: TransactionId) -> bool {
        self.table
            .lock()
            .locks
            .get(&table)
            .is_some_and(|state| state.holds(txn, LockType::Exclusive))
    }

    /// Returns all tables locked by a transaction.
    pub fn locked_tables(&self, txn: TransactionId) -> Vec<TableId> {
        let mut tables: Vec<TableId> = self
            .table
            .lock()
            .locks
            .iter()
            .filter(|(_, state)| state.holds(txn, LockType::Shared))
            .map(|(id, _)| *id)
            .collect();
        tables.sort();
        tables
    }
}

impl Default for DefaultLockManager {
    fn default() -> Self {
        Self::from_config(&DatabaseConfig::default())
    }
}

impl LockManager for DefaultLockManager {
    fn acquire_read(&self, table: TableId, txn: TransactionId) -> Result<(), ConcurrencyError> {
        self.acquire(table, txn, LockType::Shared)
    }

    fn acquire_write(&self, table: TableId, txn: TransactionId) -> Result<(), ConcurrencyError> {
        self.acquire(table, txn, LockType::Exclusive)
    }

    fn is_held(&self, table: TableId, txn: TransactionId) -> bool {
        self.holds_lock(table, txn)
    }

    fn release_read(&self, table: TableId, txn: TransactionId) {
        let mut locks = self.table.lock();
        if locks.locks.get(&table).is_some_and(|s| s.shared_holders.contains(&txn)) {
            locks.release(table, txn);
        }
        drop(locks);
        self.released.notify_all();
    }

    fn release_write(&self, table: TableId, txn: TransactionId) {
        let mut locks = self.table.lock();
        if locks.locks.get(&table).is_some_and(|s| s.exclusive_holder == Some(txn)) {
            locks.release(table, txn);
        }
        drop(locks);
        self.released.notify_all();
    }

    fn release_all(&self, txn: TransactionId) {
        let mut locks = self.table.lock();
        for state in locks.locks.values_mut() {
            state.release(txn);
        }
        // Clean up empty lock states
        locks.locks.retain(|_, state| !state.is_free());
        locks.waits.remove(&txn);
        drop(locks);
        trace!(txn, "released all locks");
        self.released.notify_all();
    }
}
