//! Tables and the mutation pipeline.
//!
//! A table stores isolated copies of its rows in a heap keyed by row id and
//! maintains every index over that heap. Each insert, update and delete:
//!
//! 1. prepares the stored copy (identity, constraints) without touching state,
//! 2. locks its own table and every related table in table-id order,
//! 3. opens an atomic section on the transaction,
//! 4. mutates the heap and all affected indexes, logging an undo record for
//!    each step,
//! 5. validates the relations touching the changed columns.
//!
//! A failure in steps 4-5 rolls the log back to the section checkpoint, so
//! no index ever holds a row the primary index does not.

use crate::catalog::Catalog;
use crate::config::IndexKind;
use crate::constraint::{Constraint, ConstraintChecker, Phase};
use crate::identity::Identity;
use crate::index::{EntityIndex, IndexHandle, IndexInfo, TypedIndex};
use crate::log::UndoRecord;
use crate::operation::{OperationState, OperationTracker};
use crate::relation::{ReferredRelation, ReferringRelation};
use crate::schema::{check_naming_rules, TableBuilder};
use crate::transaction::Transaction;
use hashbrown::HashMap;
use parking_lot::{RwLock, RwLockReadGuard};
use relstore_core::{Entity, Error, FieldSet, IndexId, Key, KeyInfo, Result, RowId, TableId};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, trace};

type IndexObserver = Box<dyn Fn(&IndexInfo) + Send + Sync>;

/// Rows and indexes of a table, guarded together.
pub(crate) struct TableState<E> {
    rows: HashMap<RowId, E>,
    /// Slot 0 is the primary index; an index id is its slot.
    indexes: Vec<Box<dyn EntityIndex<E>>>,
    next_row_id: RowId,
}

impl<E: Entity> TableState<E> {
    pub(crate) fn typed_index<K: Key>(&self, id: IndexId) -> Result<&TypedIndex<E, K>> {
        self.indexes
            .get(id.0 as usize)
            .and_then(|index| index.as_any().downcast_ref::<TypedIndex<E, K>>())
            .ok_or_else(|| {
                Error::invalid_operation(format!("no index {:?} with the requested key type", id))
            })
    }

    fn index_mut(&mut self, id: IndexId) -> Result<&mut Box<dyn EntityIndex<E>>> {
        self.indexes
            .get_mut(id.0 as usize)
            .ok_or_else(|| Error::invalid_operation(format!("no index {:?}", id)))
    }

    /// Copies of the given rows, skipping ids not in the heap.
    pub(crate) fn entities(&self, rows: &[RowId]) -> Vec<E> {
        rows.iter().filter_map(|row| self.rows.get(row).cloned()).collect()
    }

    /// Row ids in primary index order.
    fn primary_rows(&self) -> Vec<RowId> {
        self.indexes.first().map(|index| index.row_ids()).unwrap_or_default()
    }

    /// Copies of every row in primary index order.
    pub(crate) fn all_entities(&self) -> Vec<E> {
        self.entities(&self.primary_rows())
    }

    fn rows_matching(&self, predicate: &dyn Fn(&E) -> bool) -> Vec<RowId> {
        self.primary_rows()
            .into_iter()
            .filter(|row| self.rows.get(row).is_some_and(predicate))
            .collect()
    }
}

/// Shared part of a table, referenced by handles, relations and undo records.
pub(crate) struct TableInner<E> {
    id: TableId,
    name: String,
    catalog: Arc<Catalog>,
    state: RwLock<TableState<E>>,
    identity: Option<Identity<E>>,
    constraints: Vec<Constraint<E>>,
    referred: RwLock<Vec<Arc<dyn ReferredRelation<E>>>>,
    referring: RwLock<Vec<Arc<dyn ReferringRelation<E>>>>,
    observers: RwLock<Vec<IndexObserver>>,
}

/// Locks taken by one operation that the transaction did not hold before.
struct FreshLocks(Vec<TableId>);

impl FreshLocks {
    fn release(self, tx: &Transaction) {
        let locks = tx.lock_manager();
        for table in self.0 {
            locks.release_write(table, tx.id());
            locks.release_read(table, tx.id());
        }
    }
}

struct RowChange<E> {
    old: E,
    new: E,
    changed: FieldSet,
}

impl<E: Entity> TableInner<E> {
    pub(crate) fn id(&self) -> TableId {
        self.id
    }

    pub(crate) fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn catalog(&self) -> &Arc<Catalog> {
        &self.catalog
    }

    pub(crate) fn read_state(&self) -> RwLockReadGuard<'_, TableState<E>> {
        self.state.read()
    }

    pub(crate) fn add_referred(&self, relation: Arc<dyn ReferredRelation<E>>) {
        self.referred.write().push(relation);
    }

    pub(crate) fn add_referring(&self, relation: Arc<dyn ReferringRelation<E>>) {
        self.referring.write().push(relation);
    }

    /// Takes the table read lock for `tx`.
    pub(crate) fn lock_read(&self, tx: &Transaction) -> Result<()> {
        tx.ensure_active()?;
        tx.lock_manager().acquire_read(self.id, tx.id())?;
        Ok(())
    }

    /// Takes the write lock on this table and on `related`, in table-id
    /// order.
    fn lock_tables(&self, tx: &Transaction, mut related: Vec<TableId>) -> Result<FreshLocks> {
        related.push(self.id);
        related.sort();
        related.dedup();

        let locks = tx.lock_manager();
        let mut fresh = Vec::new();
        for table in related {
            let held = locks.is_held(table, tx.id());
            let acquired = if table == self.id {
                locks.acquire_write(table, tx.id())
            } else {
                locks.acquire_related(table, tx.id())
            };
            if let Err(e) = acquired {
                FreshLocks(fresh).release(tx);
                return Err(e.into());
            }
            trace!(table = %table, txn = tx.id(), "write lock held");
            if !held {
                fresh.push(table);
            }
        }
        Ok(FreshLocks(fresh))
    }

    /// Runs one mutation through the pipeline: lock, open an atomic
    /// section, mutate, validate. On failure the section is rolled back and
    /// the locks this operation took are released.
    fn run<M>(
        &self,
        tx: &Transaction,
        kind: &'static str,
        related: Vec<TableId>,
        mutate: impl FnOnce() -> Result<M>,
        validate: impl FnOnce(&M) -> Result<()>,
    ) -> Result<M> {
        tx.ensure_active()?;
        let mut op = OperationTracker::new(kind, self.id, tx.id());

        let fresh = match self.lock_tables(tx, related) {
            Ok(fresh) => fresh,
            Err(e) => {
                op.fail();
                op.advance(OperationState::LockReleased);
                return Err(e);
            }
        };
        op.advance(OperationState::LockAcquired);

        let result = tx.atomic(|| {
            op.advance(OperationState::LoggingOpen);
            let mutated = mutate()?;
            op.advance(OperationState::IndexesMutated);
            validate(&mutated)?;
            op.advance(OperationState::RelationsValidated);
            Ok(mutated)
        });

        match result {
            Ok(mutated) => {
                op.advance(OperationState::Committed);
                debug_assert!(op.state().is_terminal());
                Ok(mutated)
            }
            Err(e) => {
                op.fail();
                fresh.release(tx);
                op.advance(OperationState::LockReleased);
                Err(e)
            }
        }
    }

    fn log(self: &Arc<Self>, tx: &Transaction, op: TableUndo<E>) {
        tx.write(Box::new(TableUndoRecord {
            table: Arc::clone(self),
            op,
        }));
    }

    pub(crate) fn insert(self: &Arc<Self>, tx: &Transaction, entity: &mut E) -> Result<RowId> {
        tx.ensure_active()?;
        let mut stored = entity.clone();
        if let Some(identity) = &self.identity {
            let value = identity.assign(&mut stored);
            trace!(table = %self.name, column = identity.column(), value, "identity assigned");
        }
        ConstraintChecker::apply_all(&self.constraints, &mut stored, Phase::Insert, &self.name, &self.catalog)?;

        let referred = self.referred.read().clone();
        let related = referred.iter().map(|r| r.primary_table_id()).collect();
        let row = self.run(
            tx,
            "insert",
            related,
            || self.insert_row(tx, &stored),
            |_| {
                for relation in &referred {
                    relation.validate_entity(&stored)?;
                    trace!(table = %self.name, relation = relation.relation_id().0, "foreign key resolved");
                }
                Ok(())
            },
        )?;

        entity.copy_from(&stored);
        trace!(table = %self.name, txn = tx.id(), row, "row inserted");
        Ok(row)
    }

    fn insert_row(self: &Arc<Self>, tx: &Transaction, stored: &E) -> Result<RowId> {
        let mut guard = self.state.write();
        let state = &mut *guard;
        let row = state.next_row_id;
        state.next_row_id += 1;

        state.rows.insert(row, stored.clone());
        self.log(tx, TableUndo::RowInsert { row });

        for index in state.indexes.iter_mut() {
            index.insert(stored, row)?;
            self.log(
                tx,
                TableUndo::IndexInsert {
                    index: index.id(),
                    row,
                    entity: stored.clone(),
                },
            );
        }
        Ok(row)
    }

    /// Applies `change` to every row `resolve` selects and returns the
    /// stored results.
    pub(crate) fn update_rows(
        self: &Arc<Self>,
        tx: &Transaction,
        resolve: impl FnOnce(&TableState<E>) -> Result<Vec<RowId>>,
        mut change: impl FnMut(&mut E),
    ) -> Result<Vec<E>> {
        tx.ensure_active()?;
        let referred = self.referred.read().clone();
        let referring = self.referring.read().clone();
        let mut related: Vec<TableId> = referred.iter().map(|r| r.primary_table_id()).collect();
        related.extend(referring.iter().map(|r| r.foreign_table_id()));

        let changes = self.run(
            tx,
            "update",
            related,
            || {
                let targets = resolve(&self.state.read())?;
                let mut changes = Vec::with_capacity(targets.len());
                for row in targets {
                    let Some(old) = self.state.read().rows.get(&row).cloned() else {
                        continue;
                    };
                    let mut new = old.clone();
                    change(&mut new);
                    if old.changed_fields(&new).is_empty() {
                        changes.push(RowChange { old, new, changed: FieldSet::empty() });
                        continue;
                    }
                    ConstraintChecker::apply_all(
                        &self.constraints,
                        &mut new,
                        Phase::Update,
                        &self.name,
                        &self.catalog,
                    )?;
                    let changed = old.changed_fields(&new);
                    self.replace_row(tx, row, &old, &new, &changed)?;
                    changes.push(RowChange { old, new, changed });
                }
                Ok(changes)
            },
            |changes| {
                for change in changes.iter().filter(|c| !c.changed.is_empty()) {
                    for relation in &referred {
                        if relation.foreign_positions().intersects(&change.changed) {
                            relation.validate_entity(&change.new)?;
                        }
                    }
                    for relation in &referring {
                        if relation.primary_positions().intersects(&change.changed) {
                            relation.validate_referrers(&change.old)?;
                        }
                    }
                }
                Ok(())
            },
        )?;

        trace!(table = %self.name, txn = tx.id(), rows = changes.len(), "rows updated");
        Ok(changes.into_iter().map(|c| c.new).collect())
    }

    /// Removes the old entries of the indexes `changed` touches, replaces
    /// the heap row, then inserts the new entries.
    fn replace_row(
        self: &Arc<Self>,
        tx: &Transaction,
        row: RowId,
        old: &E,
        new: &E,
        changed: &FieldSet,
    ) -> Result<()> {
        let mut guard = self.state.write();
        let state = &mut *guard;
        let affected: Vec<usize> = state
            .indexes
            .iter()
            .enumerate()
            .filter(|(_, index)| index.positions().intersects(changed))
            .map(|(slot, _)| slot)
            .collect();

        for &slot in &affected {
            let index = &mut state.indexes[slot];
            if index.remove(old, row) {
                self.log(
                    tx,
                    TableUndo::IndexDelete {
                        index: index.id(),
                        row,
                        entity: old.clone(),
                    },
                );
            }
        }

        let stored = state
            .rows
            .get_mut(&row)
            .ok_or_else(|| Error::not_found(&self.name, &row))?;
        stored.copy_from(new);
        self.log(
            tx,
            TableUndo::RowUpdate {
                row,
                backup: old.clone(),
            },
        );

        for &slot in &affected {
            let index = &mut state.indexes[slot];
            index.insert(new, row)?;
            self.log(
                tx,
                TableUndo::IndexInsert {
                    index: index.id(),
                    row,
                    entity: new.clone(),
                },
            );
        }
        Ok(())
    }

    /// Deletes the rows `resolve` selects, with cascades.
    pub(crate) fn delete_where(
        self: &Arc<Self>,
        tx: &Transaction,
        resolve: impl FnOnce(&TableState<E>) -> Result<Vec<RowId>>,
    ) -> Result<Vec<E>> {
        tx.ensure_active()?;
        let related = self.catalog.referring_closure(self.id);
        let removed = self.run(
            tx,
            "delete",
            related,
            || {
                let targets = resolve(&self.state.read())?;
                self.delete_rows(tx, &targets)
            },
            |_| Ok(()),
        )?;
        trace!(table = %self.name, txn = tx.id(), rows = removed.len(), "rows deleted");
        Ok(removed)
    }

    /// Removes rows from every index and the heap, then settles the
    /// referring relations: cascading ones delete their dependents, enabled
    /// non-cascading ones fail if dependents remain.
    ///
    /// Must run inside an atomic section that holds the locks of every
    /// table reachable through referring relations.
    pub(crate) fn delete_rows(self: &Arc<Self>, tx: &Transaction, rows: &[RowId]) -> Result<Vec<E>> {
        let removed = {
            let mut guard = self.state.write();
            let state = &mut *guard;
            let mut removed = Vec::with_capacity(rows.len());
            for &row in rows {
                // already gone through a cascade cycle
                let Some(entity) = state.rows.get(&row).cloned() else {
                    continue;
                };
                for index in state.indexes.iter_mut() {
                    if index.remove(&entity, row) {
                        self.log(
                            tx,
                            TableUndo::IndexDelete {
                                index: index.id(),
                                row,
                                entity: entity.clone(),
                            },
                        );
                    }
                }
                state.rows.remove(&row);
                self.log(
                    tx,
                    TableUndo::RowDelete {
                        row,
                        entity: entity.clone(),
                    },
                );
                removed.push(entity);
            }
            removed
        };

        let referring = self.referring.read().clone();
        for relation in referring.iter().filter(|r| r.is_cascading()) {
            let mut cascaded = 0;
            for entity in &removed {
                cascaded += relation.cascade_delete(tx, entity)?;
            }
            trace!(table = %self.name, relation = relation.relation_id().0, cascaded, "cascade settled");
        }
        for relation in referring.iter().filter(|r| !r.is_cascading() && r.is_enabled()) {
            for entity in &removed {
                relation.ensure_unreferenced(entity)?;
            }
        }
        Ok(removed)
    }

    fn notify_index_added(&self, info: &IndexInfo) {
        for observer in self.observers.read().iter() {
            observer(info);
        }
    }
}

enum TableUndo<E> {
    RowInsert { row: RowId },
    RowDelete { row: RowId, entity: E },
    RowUpdate { row: RowId, backup: E },
    IndexInsert { index: IndexId, row: RowId, entity: E },
    IndexDelete { index: IndexId, row: RowId, entity: E },
}

struct TableUndoRecord<E> {
    table: Arc<TableInner<E>>,
    op: TableUndo<E>,
}

impl<E: Entity> UndoRecord for TableUndoRecord<E> {
    fn undo(&mut self) -> Result<()> {
        let mut guard = self.table.state.write();
        let state = &mut *guard;
        match &self.op {
            TableUndo::RowInsert { row } => {
                state.rows.remove(row);
            }
            TableUndo::RowDelete { row, entity } => {
                state.rows.insert(*row, entity.clone());
            }
            TableUndo::RowUpdate { row, backup } => {
                let stored = state
                    .rows
                    .get_mut(row)
                    .ok_or_else(|| Error::not_found(&self.table.name, row))?;
                stored.copy_from(backup);
            }
            TableUndo::IndexInsert { index, row, entity } => {
                if !state.index_mut(*index)?.remove(entity, *row) {
                    return Err(Error::operation(format!(
                        "row {} missing from index {:?} of {}",
                        row, index, self.table.name
                    )));
                }
            }
            TableUndo::IndexDelete { index, row, entity } => {
                state.index_mut(*index)?.insert(entity, *row)?;
            }
        }
        Ok(())
    }

    fn describe(&self) -> String {
        let table = &self.table.name;
        match &self.op {
            TableUndo::RowInsert { row } => format!("{} insert row {}", table, row),
            TableUndo::RowDelete { row, .. } => format!("{} delete row {}", table, row),
            TableUndo::RowUpdate { row, .. } => format!("{} update row {}", table, row),
            TableUndo::IndexInsert { index, row, .. } => {
                format!("{} index {} insert row {}", table, index.0, row)
            }
            TableUndo::IndexDelete { index, row, .. } => {
                format!("{} index {} delete row {}", table, index.0, row)
            }
        }
    }
}

/// A table of `E` rows keyed by `PK`.
///
/// Every operation takes the transaction it runs in. Rows go in and come
/// out as copies; the table never hands out references to stored rows.
pub struct Table<E, PK> {
    inner: Arc<TableInner<E>>,
    primary: IndexHandle<E, PK>,
}

impl<E, PK> Clone for Table<E, PK> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            primary: self.primary.clone(),
        }
    }
}

impl<E: Entity, PK: Key> Table<E, PK> {
    pub(crate) fn create(
        id: TableId,
        catalog: Arc<Catalog>,
        builder: TableBuilder<E, PK>,
        identity: Option<Identity<E>>,
        default_kind: IndexKind,
    ) -> Self {
        let kind = builder.index_kind.unwrap_or(default_kind);
        let primary_index = TypedIndex::new(
            IndexId::PRIMARY,
            &builder.name,
            &builder.primary_index_name,
            builder.primary_key.clone(),
            true,
            kind,
        );

        let inner = Arc::new(TableInner {
            id,
            name: builder.name,
            catalog,
            state: RwLock::new(TableState {
                rows: HashMap::new(),
                indexes: vec![Box::new(primary_index)],
                next_row_id: 1,
            }),
            identity,
            constraints: builder.constraints,
            referred: RwLock::new(Vec::new()),
            referring: RwLock::new(Vec::new()),
            observers: RwLock::new(Vec::new()),
        });

        let primary = IndexHandle {
            table: Arc::clone(&inner),
            id: IndexId::PRIMARY,
            name: builder.primary_index_name,
            unique: true,
            kind,
            key_info: builder.primary_key,
        };
        debug!(table = %inner.name, id = %id, ?kind, "table created");
        Self { inner, primary }
    }

    pub fn id(&self) -> TableId {
        self.inner.id
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// The unique index over the primary key.
    pub fn primary_index(&self) -> &IndexHandle<E, PK> {
        &self.primary
    }

    /// Number of stored rows, read under the table's read lock.
    pub fn len(&self, tx: &Transaction) -> Result<usize> {
        self.inner.lock_read(tx)?;
        Ok(self.inner.state.read().rows.len())
    }

    pub fn is_empty(&self, tx: &Transaction) -> Result<bool> {
        self.len(tx).map(|len| len == 0)
    }

    fn by_key(&self, key: &PK) -> impl FnOnce(&TableState<E>) -> Result<Vec<RowId>> {
        let key = key.clone();
        move |state| Ok(state.typed_index::<PK>(IndexId::PRIMARY)?.get(&key))
    }

    /// Inserts a copy of `entity`. On success generated values (identity,
    /// row version, guid) are copied back into `entity`; on failure it is
    /// left untouched.
    pub fn insert(&self, tx: &Transaction, entity: &mut E) -> Result<()> {
        self.inner.insert(tx, entity).map(|_| ())
    }

    /// Replaces the stored row with the primary key of `entity` by a copy
    /// of `entity`, then copies the stored result back.
    pub fn update(&self, tx: &Transaction, entity: &mut E) -> Result<()> {
        let key = self.primary.key_info.select(entity);
        let source = entity.clone();
        let updated = self
            .inner
            .update_rows(tx, self.by_key(&key), |stored| stored.copy_from(&source))?;
        match updated.into_iter().next() {
            Some(stored) => {
                entity.copy_from(&stored);
                Ok(())
            }
            None => Err(Error::not_found(&self.inner.name, &key)),
        }
    }

    /// Modifies the row stored under `key` in place and returns a copy of
    /// the result.
    pub fn update_with(&self, tx: &Transaction, key: &PK, f: impl FnOnce(&mut E)) -> Result<E> {
        let mut f = Some(f);
        let updated = self.inner.update_rows(tx, self.by_key(key), |stored| {
            if let Some(f) = f.take() {
                f(stored);
            }
        })?;
        updated
            .into_iter()
            .next()
            .ok_or_else(|| Error::not_found(&self.inner.name, key))
    }

    /// Applies `updater` to every row matching `predicate` in one atomic
    /// section. Returns the number of matched rows.
    pub fn update_where(
        &self,
        tx: &Transaction,
        predicate: impl Fn(&E) -> bool,
        updater: impl FnMut(&mut E),
    ) -> Result<usize> {
        let updated = self
            .inner
            .update_rows(tx, |state| Ok(state.rows_matching(&predicate)), updater)?;
        Ok(updated.len())
    }

    /// Deletes the row stored under `key`. Returns false if there is none.
    pub fn delete(&self, tx: &Transaction, key: &PK) -> Result<bool> {
        let removed = self.inner.delete_where(tx, self.by_key(key))?;
        Ok(!removed.is_empty())
    }

    /// Deletes the row with the primary key of `entity`.
    pub fn delete_entity(&self, tx: &Transaction, entity: &E) -> Result<bool> {
        self.delete(tx, &self.primary.key_info.select(entity))
    }

    /// Deletes every row matching `predicate`. Returns the number of rows
    /// removed from this table; cascaded rows are not counted.
    pub fn delete_where(&self, tx: &Transaction, predicate: impl Fn(&E) -> bool) -> Result<usize> {
        let removed = self
            .inner
            .delete_where(tx, |state| Ok(state.rows_matching(&predicate)))?;
        Ok(removed.len())
    }

    pub fn find(&self, tx: &Transaction, key: &PK) -> Result<Option<E>> {
        self.primary.get_by_unique_key(tx, key)
    }

    pub fn contains_key(&self, tx: &Transaction, key: &PK) -> Result<bool> {
        self.primary.contains(tx, key)
    }

    /// Every row in primary key order.
    pub fn select_all(&self, tx: &Transaction) -> Result<Vec<E>> {
        self.primary.select_all(tx)
    }

    /// Adds an index and fills it from the rows already stored.
    ///
    /// Index creation is not part of the transaction log; it survives a
    /// rollback of `tx`.
    pub fn create_index<K: Key>(
        &self,
        tx: &Transaction,
        name: &str,
        key_info: KeyInfo<E, K>,
        unique: bool,
        kind: IndexKind,
    ) -> Result<IndexHandle<E, K>> {
        check_naming_rules(name)?;
        let fresh = self.inner.lock_tables(tx, Vec::new())?;

        let built = {
            let mut guard = self.inner.state.write();
            let state = &mut *guard;
            if state.indexes.iter().any(|index| index.info().name == name) {
                Err(Error::invalid_schema(format!(
                    "index {} already exists on {}",
                    name, self.inner.name
                )))
            } else {
                let id = IndexId(state.indexes.len() as u32);
                let mut index = TypedIndex::new(id, &self.inner.name, name, key_info.clone(), unique, kind);
                let filled = state.primary_rows().into_iter().try_for_each(|row| {
                    match state.rows.get(&row) {
                        Some(entity) => index.insert(entity, row),
                        None => Ok(()),
                    }
                });
                filled.map(|()| {
                    let info = index.info();
                    state.indexes.push(Box::new(index));
                    info
                })
            }
        };

        let info = match built {
            Ok(info) => info,
            Err(e) => {
                fresh.release(tx);
                return Err(e);
            }
        };
        debug!(table = %self.inner.name, index = name, rows = self.inner.state.read().rows.len(), "index created");
        self.inner.notify_index_added(&info);

        Ok(IndexHandle {
            table: Arc::clone(&self.inner),
            id: info.id,
            name: info.name,
            unique,
            kind,
            key_info,
        })
    }

    /// Looks up an index by name. Fails if the name is unknown or the index
    /// is keyed by a type other than `K`.
    pub fn index<K: Key>(&self, name: &str) -> Result<IndexHandle<E, K>> {
        let state = self.inner.state.read();
        let id = state
            .indexes
            .iter()
            .find(|index| index.info().name == name)
            .map(|index| index.id())
            .ok_or_else(|| Error::not_found(&self.inner.name, &name))?;
        let index = state.typed_index::<K>(id)?;
        let handle = IndexHandle {
            table: Arc::clone(&self.inner),
            id,
            name: name.to_string(),
            unique: index.is_unique(),
            kind: index.kind(),
            key_info: index.key_info().clone(),
        };
        Ok(handle)
    }

    /// Descriptions of every index, primary first.
    pub fn indexes(&self, tx: &Transaction) -> Result<Vec<IndexInfo>> {
        self.inner.lock_read(tx)?;
        Ok(self.inner.state.read().indexes.iter().map(|index| index.info()).collect())
    }

    /// Restarts the identity sequence after the extremum of the stored
    /// identity values. Returns the next value, or `None` if the table has
    /// no identity column.
    pub fn reseed_identity(&self, tx: &Transaction) -> Result<Option<i64>> {
        let Some(identity) = &self.inner.identity else {
            return Ok(None);
        };
        let _locks = self.inner.lock_tables(tx, Vec::new())?;
        let next = identity.reseed(self.inner.state.read().rows.values());
        debug!(table = %self.inner.name, next, "identity reseeded");
        Ok(Some(next))
    }

    /// Registers a callback run after every successful `create_index`.
    pub fn on_index_added(&self, observer: impl Fn(&IndexInfo) + Send + Sync + 'static) {
        self.inner.observers.write().push(Box::new(observer));
    }
}

impl<E, PK> fmt::Debug for Table<E, PK> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Table")
            .field("id", &self.inner.id)
            .field("name", &self.inner.name)
            .finish()
    }
}
