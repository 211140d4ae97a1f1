//! Relations between tables.
//!
//! A relation binds a foreign index on one table to the unique primary
//! index of another (or the same) table. The foreign table consults it as a
//! [`ReferredRelation`] when its rows change; the primary table consults it
//! as a [`ReferringRelation`] when rows that may be pointed at change or go
//! away.

use crate::index::IndexHandle;
use crate::table::TableInner;
use crate::transaction::Transaction;
use relstore_core::{Entity, Error, FieldSet, IndexId, Key, KeyInfo, RelationId, Result, RowId, TableId};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use tracing::debug;

/// Relation options.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RelationOptions {
    /// Delete referring rows together with the row they point at.
    pub cascaded_deletion: bool,
}

impl RelationOptions {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn cascaded_deletion(mut self, value: bool) -> Self {
        self.cascaded_deletion = value;
        self
    }
}

/// A relation as seen from its foreign table.
pub(crate) trait ReferredRelation<F>: Send + Sync {
    fn relation_id(&self) -> RelationId;

    fn primary_table_id(&self) -> TableId;

    /// Fields the foreign key is built from.
    fn foreign_positions(&self) -> &FieldSet;

    /// Checks that the foreign key of `entity` resolves to a primary row.
    fn validate_entity(&self, entity: &F) -> Result<()>;
}

/// A relation as seen from its primary table.
pub(crate) trait ReferringRelation<P>: Send + Sync {
    fn relation_id(&self) -> RelationId;

    fn foreign_table_id(&self) -> TableId;

    /// Fields the primary key is built from.
    fn primary_positions(&self) -> &FieldSet;

    fn is_cascading(&self) -> bool;

    fn is_enabled(&self) -> bool;

    /// Deletes the foreign rows that pointed at `removed`.
    fn cascade_delete(&self, tx: &Transaction, removed: &P) -> Result<usize>;

    /// Fails if foreign rows still point at the key of `removed`.
    fn ensure_unreferenced(&self, removed: &P) -> Result<()>;

    /// Fails if foreign rows pointed at the key `old` had before an update
    /// and no primary row holds that key anymore.
    fn validate_referrers(&self, old: &P) -> Result<()>;
}

/// Foreign-key relation between `F` rows keyed by `FK` and `P` rows keyed
/// by `PK`.
pub struct Relation<P, PK, F, FK> {
    id: RelationId,
    primary: Weak<TableInner<P>>,
    foreign: Weak<TableInner<F>>,
    primary_table: TableId,
    foreign_table: TableId,
    primary_index: IndexId,
    foreign_index: IndexId,
    primary_name: String,
    foreign_name: String,
    primary_key: KeyInfo<P, PK>,
    foreign_key: KeyInfo<F, FK>,
    to_primary: Arc<dyn Fn(&FK) -> PK + Send + Sync>,
    to_foreign: Arc<dyn Fn(&PK) -> FK + Send + Sync>,
    enabled: AtomicBool,
    options: RelationOptions,
}

impl<P: Entity, PK: Key, F: Entity, FK: Key> Relation<P, PK, F, FK> {
    pub(crate) fn new<TP, TF>(
        id: RelationId,
        primary: &IndexHandle<P, PK>,
        foreign: &IndexHandle<F, FK>,
        to_primary: TP,
        to_foreign: TF,
        options: RelationOptions,
    ) -> Self
    where
        TP: Fn(&FK) -> PK + Send + Sync + 'static,
        TF: Fn(&PK) -> FK + Send + Sync + 'static,
    {
        Self {
            id,
            primary: Arc::downgrade(&primary.table),
            foreign: Arc::downgrade(&foreign.table),
            primary_table: primary.table.id(),
            foreign_table: foreign.table.id(),
            primary_index: primary.id,
            foreign_index: foreign.id,
            primary_name: format!("{}.{}", primary.table.name(), primary.name),
            foreign_name: format!("{}.{}", foreign.table.name(), foreign.name),
            primary_key: primary.key_info.clone(),
            foreign_key: foreign.key_info.clone(),
            to_primary: Arc::new(to_primary),
            to_foreign: Arc::new(to_foreign),
            enabled: AtomicBool::new(true),
            options,
        }
    }

    pub fn id(&self) -> RelationId {
        self.id
    }

    pub fn options(&self) -> RelationOptions {
        self.options
    }

    /// Qualified name of the primary index.
    pub fn primary_index_name(&self) -> &str {
        &self.primary_name
    }

    /// Qualified name of the foreign index.
    pub fn foreign_index_name(&self) -> &str {
        &self.foreign_name
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }

    /// Turns the foreign key check on or off.
    ///
    /// Re-enabling validates every foreign row first; if any row fails the
    /// relation stays disabled and the violation is returned.
    pub fn set_enabled(&self, tx: &Transaction, enabled: bool) -> Result<()> {
        if enabled && !self.is_enabled() {
            self.lock_both(tx)?;
            self.check_all()?;
        }
        self.enabled.store(enabled, Ordering::Release);
        debug!(relation = self.id.0, enabled, "relation toggled");
        Ok(())
    }

    /// Checks one foreign row. A no-op while the relation is disabled.
    pub fn validate_entity(&self, tx: &Transaction, entity: &F) -> Result<()> {
        self.primary_table()?.lock_read(tx)?;
        if !self.is_enabled() {
            return Ok(());
        }
        self.check_entity(entity)
    }

    /// Checks every foreign row, whether or not the relation is enabled.
    pub fn validate_all(&self, tx: &Transaction) -> Result<()> {
        self.lock_both(tx)?;
        self.check_all()
    }

    /// The primary row `entity` points at, if its key is not empty.
    pub fn referred_entity(&self, tx: &Transaction, entity: &F) -> Result<Option<P>> {
        let primary = self.primary_table()?;
        primary.lock_read(tx)?;
        let fk = self.foreign_key.select(entity);
        if fk.is_empty_key() {
            return Ok(None);
        }
        let pk = (self.to_primary)(&fk);
        let state = primary.read_state();
        let rows = state.typed_index::<PK>(self.primary_index)?.get(&pk);
        let entity = state.entities(&rows).into_iter().next();
        Ok(entity)
    }

    /// The foreign rows pointing at `entity`.
    pub fn referring_entities(&self, tx: &Transaction, entity: &P) -> Result<Vec<F>> {
        let foreign = self.foreign_table()?;
        foreign.lock_read(tx)?;
        let fk = (self.to_foreign)(&self.primary_key.select(entity));
        let state = foreign.read_state();
        let rows = state.typed_index::<FK>(self.foreign_index)?.get(&fk);
        let entities = state.entities(&rows);
        Ok(entities)
    }

    fn lock_both(&self, tx: &Transaction) -> Result<()> {
        let (first, second) = if self.primary_table <= self.foreign_table {
            (self.primary_table, self.foreign_table)
        } else {
            (self.foreign_table, self.primary_table)
        };
        tx.ensure_active()?;
        tx.lock_manager().acquire_read(first, tx.id())?;
        tx.lock_manager().acquire_read(second, tx.id())?;
        Ok(())
    }

    fn primary_table(&self) -> Result<Arc<TableInner<P>>> {
        self.primary
            .upgrade()
            .ok_or_else(|| Error::invalid_operation(format!("table of {} was dropped", self.primary_name)))
    }

    fn foreign_table(&self) -> Result<Arc<TableInner<F>>> {
        self.foreign
            .upgrade()
            .ok_or_else(|| Error::invalid_operation(format!("table of {} was dropped", self.foreign_name)))
    }

    fn primary_contains(&self, pk: &PK) -> Result<bool> {
        let primary = self.primary_table()?;
        let state = primary.read_state();
        let found = state.typed_index::<PK>(self.primary_index)?.contains_key(pk);
        Ok(found)
    }

    fn foreign_rows(&self, fk: &FK) -> Result<Vec<RowId>> {
        let foreign = self.foreign_table()?;
        let state = foreign.read_state();
        let rows = state.typed_index::<FK>(self.foreign_index)?.get(fk);
        Ok(rows)
    }

    fn check_entity(&self, entity: &F) -> Result<()> {
        let fk = self.foreign_key.select(entity);
        if fk.is_empty_key() {
            return Ok(());
        }
        let pk = (self.to_primary)(&fk);
        if self.primary_contains(&pk)? {
            Ok(())
        } else {
            Err(Error::foreign_key_violation(&self.primary_name, &self.foreign_name, &fk))
        }
    }

    pub(crate) fn check_all(&self) -> Result<()> {
        let rows = {
            let foreign = self.foreign_table()?;
            let state = foreign.read_state();
            state.all_entities()
        };
        for row in &rows {
            self.check_entity(row)?;
        }
        Ok(())
    }
}

impl<P: Entity, PK: Key, F: Entity, FK: Key> ReferredRelation<F> for Relation<P, PK, F, FK> {
    fn relation_id(&self) -> RelationId {
        self.id
    }

    fn primary_table_id(&self) -> TableId {
        self.primary_table
    }

    fn foreign_positions(&self) -> &FieldSet {
        self.foreign_key.positions()
    }

    fn validate_entity(&self, entity: &F) -> Result<()> {
        if !self.is_enabled() {
            return Ok(());
        }
        self.check_entity(entity)
    }
}

impl<P: Entity, PK: Key, F: Entity, FK: Key> ReferringRelation<P> for Relation<P, PK, F, FK> {
    fn relation_id(&self) -> RelationId {
        self.id
    }

    fn foreign_table_id(&self) -> TableId {
        self.foreign_table
    }

    fn primary_positions(&self) -> &FieldSet {
        self.primary_key.positions()
    }

    fn is_cascading(&self) -> bool {
        self.options.cascaded_deletion
    }

    fn is_enabled(&self) -> bool {
        Relation::is_enabled(self)
    }

    fn cascade_delete(&self, tx: &Transaction, removed: &P) -> Result<usize> {
        let fk = (self.to_foreign)(&self.primary_key.select(removed));
        if fk.is_empty_key() {
            return Ok(0);
        }
        let rows = self.foreign_rows(&fk)?;
        if rows.is_empty() {
            return Ok(0);
        }
        let deleted = self.foreign_table()?.delete_rows(tx, &rows)?.len();
        debug!(relation = self.id.0, rows = deleted, "cascaded delete");
        Ok(deleted)
    }

    fn ensure_unreferenced(&self, removed: &P) -> Result<()> {
        let pk = self.primary_key.select(removed);
        let fk = (self.to_foreign)(&pk);
        if fk.is_empty_key() {
            return Ok(());
        }
        let count = self.foreign_rows(&fk)?.len();
        if count > 0 {
            return Err(Error::referring_rows_exist(
                &self.primary_name,
                &self.foreign_name,
                &pk,
                count,
            ));
        }
        Ok(())
    }

    fn validate_referrers(&self, old: &P) -> Result<()> {
        if !self.is_enabled() {
            return Ok(());
        }
        let pk = self.primary_key.select(old);
        if self.primary_contains(&pk)? {
            return Ok(());
        }
        let fk = (self.to_foreign)(&pk);
        if fk.is_empty_key() || self.foreign_rows(&fk)?.is_empty() {
            return Ok(());
        }
        Err(Error::foreign_key_violation(&self.primary_name, &self.foreign_name, &fk))
    }
}

impl<P, PK, F, FK> fmt::Debug for Relation<P, PK, F, FK> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Relation")
            .field("id", &self.id)
            .field("primary", &self.primary_name)
            .field("foreign", &self.foreign_name)
            .field("enabled", &self.enabled.load(Ordering::Relaxed))
            .field("options", &self.options)
            .finish()
    }
}
