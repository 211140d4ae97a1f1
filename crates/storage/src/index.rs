//! Table indexes.
//!
//! A table keeps its indexes type-erased as [`EntityIndex`] so that every
//! index can be maintained from one entity without knowing its key type.
//! Typed access goes through [`IndexHandle`], which downcasts back to the
//! [`TypedIndex`] it was created for.

use crate::config::IndexKind;
use crate::table::{TableInner, TableState};
use crate::transaction::Transaction;
use relstore_core::{Entity, Error, FieldSet, IndexId, Key, KeyInfo, Result, RowId};
use relstore_index::{HashIndex, Index, IndexError, KeyComparator, KeyRange, RangeIndex, TreeIndex};
use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// Summary of an index, as reported to index-change observers.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IndexInfo {
    pub id: IndexId,
    pub name: String,
    pub unique: bool,
    pub kind: IndexKind,
    pub columns: Vec<&'static str>,
}

/// Key-erased view of an index used by the mutation pipeline.
pub(crate) trait EntityIndex<E>: Send + Sync {
    fn info(&self) -> IndexInfo;

    fn id(&self) -> IndexId;

    fn is_unique(&self) -> bool;

    /// Fields the key is built from.
    fn positions(&self) -> &FieldSet;

    /// Adds `row` under the key of `entity`.
    fn insert(&mut self, entity: &E, row: RowId) -> Result<()>;

    /// Removes `row` from under the key of `entity`.
    fn remove(&mut self, entity: &E, row: RowId) -> bool;

    fn len(&self) -> usize;

    /// Every row id, in key order for ordered indexes.
    fn row_ids(&self) -> Vec<RowId>;

    fn as_any(&self) -> &dyn Any;
}

enum Backing<K> {
    Tree(TreeIndex<K, KeyComparator>),
    Hash(HashIndex<K>),
}

/// An index over key type `K` of entity type `E`.
pub(crate) struct TypedIndex<E, K> {
    id: IndexId,
    name: String,
    qualified: String,
    key_info: KeyInfo<E, K>,
    backing: Backing<K>,
}

impl<E: Entity, K: Key> TypedIndex<E, K> {
    pub(crate) fn new(
        id: IndexId,
        table: &str,
        name: &str,
        key_info: KeyInfo<E, K>,
        unique: bool,
        kind: IndexKind,
    ) -> Self {
        let backing = match kind {
            IndexKind::Tree => Backing::Tree(TreeIndex::with_comparator(
                unique,
                KeyComparator::new(key_info.shared_orders()),
            )),
            IndexKind::Hash => Backing::Hash(HashIndex::new(unique)),
        };
        Self {
            id,
            name: name.to_string(),
            qualified: format!("{}.{}", table, name),
            key_info,
            backing,
        }
    }

    pub(crate) fn key_info(&self) -> &KeyInfo<E, K> {
        &self.key_info
    }

    pub(crate) fn kind(&self) -> IndexKind {
        match self.backing {
            Backing::Tree(_) => IndexKind::Tree,
            Backing::Hash(_) => IndexKind::Hash,
        }
    }

    fn index(&self) -> &dyn Index<K> {
        match &self.backing {
            Backing::Tree(tree) => tree,
            Backing::Hash(hash) => hash,
        }
    }

    fn index_mut(&mut self) -> &mut dyn Index<K> {
        match &mut self.backing {
            Backing::Tree(tree) => tree,
            Backing::Hash(hash) => hash,
        }
    }

    pub(crate) fn get(&self, key: &K) -> Vec<RowId> {
        self.index().get(key)
    }

    pub(crate) fn contains_key(&self, key: &K) -> bool {
        self.index().contains_key(key)
    }

    /// Rows whose keys fall in `range`, in key order.
    pub(crate) fn range(&self, range: &KeyRange<K>) -> Result<Vec<RowId>> {
        match &self.backing {
            Backing::Tree(tree) => Ok(tree.get_range(range, false, None)),
            Backing::Hash(_) => Err(Error::invalid_operation(format!(
                "hash index {} does not support range scans",
                self.qualified
            ))),
        }
    }
}

impl<E: Entity, K: Key> EntityIndex<E> for TypedIndex<E, K> {
    fn info(&self) -> IndexInfo {
        IndexInfo {
            id: self.id,
            name: self.name.clone(),
            unique: self.is_unique(),
            kind: self.kind(),
            columns: self.key_info.columns().to_vec(),
        }
    }

    fn id(&self) -> IndexId {
        self.id
    }

    fn is_unique(&self) -> bool {
        self.index().is_unique()
    }

    fn positions(&self) -> &FieldSet {
        self.key_info.positions()
    }

    fn insert(&mut self, entity: &E, row: RowId) -> Result<()> {
        let key = self.key_info.select(entity);
        match self.index_mut().add(key.clone(), row) {
            Ok(()) => Ok(()),
            Err(IndexError::DuplicateKey) => Err(Error::duplicate_key(self.qualified.clone(), &key)),
            Err(IndexError::KeyNotFound) => Err(Error::not_found(self.qualified.clone(), &key)),
        }
    }

    fn remove(&mut self, entity: &E, row: RowId) -> bool {
        let key = self.key_info.select(entity);
        self.index_mut().remove(&key, row)
    }

    fn len(&self) -> usize {
        self.index().len()
    }

    fn row_ids(&self) -> Vec<RowId> {
        self.index().get_all()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Typed handle to one index of a table.
///
/// Every read takes the table's read lock for the given transaction and
/// returns copies of the stored rows.
pub struct IndexHandle<E, K> {
    pub(crate) table: Arc<TableInner<E>>,
    pub(crate) id: IndexId,
    pub(crate) name: String,
    pub(crate) unique: bool,
    pub(crate) kind: IndexKind,
    pub(crate) key_info: KeyInfo<E, K>,
}

impl<E, K> Clone for IndexHandle<E, K> {
    fn clone(&self) -> Self {
        Self {
            table: Arc::clone(&self.table),
            id: self.id,
            name: self.name.clone(),
            unique: self.unique,
            kind: self.kind,
            key_info: self.key_info.clone(),
        }
    }
}

impl<E: Entity, K: Key> IndexHandle<E, K> {
    pub fn id(&self) -> IndexId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_unique(&self) -> bool {
        self.unique
    }

    pub fn kind(&self) -> IndexKind {
        self.kind
    }

    pub fn key_info(&self) -> &KeyInfo<E, K> {
        &self.key_info
    }

    /// Name of the owning table.
    pub fn table_name(&self) -> &str {
        self.table.name()
    }

    fn read<R>(
        &self,
        tx: &Transaction,
        f: impl FnOnce(&TypedIndex<E, K>, &TableState<E>) -> Result<R>,
    ) -> Result<R> {
        self.table.lock_read(tx)?;
        let state = self.table.read_state();
        let index = state.typed_index::<K>(self.id)?;
        f(index, &state)
    }

    /// Rows stored under `key`; empty if the key is absent.
    pub fn select(&self, tx: &Transaction, key: &K) -> Result<Vec<E>> {
        self.read(tx, |index, state| Ok(state.entities(&index.get(key))))
    }

    /// The single row stored under `key` of a unique index.
    pub fn get_by_unique_key(&self, tx: &Transaction, key: &K) -> Result<Option<E>> {
        if !self.unique {
            return Err(Error::invalid_operation(format!(
                "index {}.{} is not unique",
                self.table.name(),
                self.name
            )));
        }
        self.read(tx, |index, state| Ok(state.entities(&index.get(key)).into_iter().next()))
    }

    pub fn contains(&self, tx: &Transaction, key: &K) -> Result<bool> {
        self.read(tx, |index, _| Ok(index.contains_key(key)))
    }

    /// Rows with keys between `from` and `to` in index order. Open bounds
    /// exclude keys equal to the bound.
    pub fn select_range(
        &self,
        tx: &Transaction,
        from: K,
        to: K,
        from_open: bool,
        to_open: bool,
    ) -> Result<Vec<E>> {
        let range = KeyRange::bound(from, to, from_open, to_open);
        self.read(tx, |index, state| Ok(state.entities(&index.range(&range)?)))
    }

    pub fn select_greater(&self, tx: &Transaction, from: K, open: bool) -> Result<Vec<E>> {
        let range = KeyRange::lower_bound(from, open);
        self.read(tx, |index, state| Ok(state.entities(&index.range(&range)?)))
    }

    pub fn select_less(&self, tx: &Transaction, to: K, open: bool) -> Result<Vec<E>> {
        let range = KeyRange::upper_bound(to, open);
        self.read(tx, |index, state| Ok(state.entities(&index.range(&range)?)))
    }

    /// Every row, in key order for tree indexes.
    pub fn select_all(&self, tx: &Transaction) -> Result<Vec<E>> {
        self.read(tx, |index, state| Ok(state.entities(&index.row_ids())))
    }

    /// Number of rows in the index.
    pub fn len(&self, tx: &Transaction) -> Result<usize> {
        self.read(tx, |index, _| Ok(index.len()))
    }

    pub fn is_empty(&self, tx: &Transaction) -> Result<bool> {
        self.len(tx).map(|len| len == 0)
    }
}

impl<E, K> fmt::Debug for IndexHandle<E, K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IndexHandle")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("unique", &self.unique)
            .field("kind", &self.kind)
            .finish()
    }
}
