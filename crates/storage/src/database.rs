//! Database - entry point for creating tables, relations and transactions.

use crate::catalog::{Catalog, RelationEdge};
use crate::config::DatabaseConfig;
use crate::identity::Identity;
use crate::index::IndexHandle;
use crate::lock::{DefaultLockManager, LockManager};
use crate::relation::{Relation, RelationOptions};
use crate::schema::TableBuilder;
use crate::table::Table;
use crate::transaction::Transaction;
use hashbrown::HashMap;
use parking_lot::RwLock;
use relstore_core::{Entity, Error, Key, Result, TableId};
use std::any::Any;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, error};

struct DatabaseInner {
    config: DatabaseConfig,
    locks: Arc<dyn LockManager>,
    catalog: Arc<Catalog>,
    /// Owns every table for the lifetime of the database; each entry is a
    /// `Table<E, PK>`.
    tables: RwLock<HashMap<TableId, Arc<dyn Any + Send + Sync>>>,
    next_txn: AtomicU64,
}

/// An in-process table store.
///
/// Cloning a `Database` yields another handle to the same store.
#[derive(Clone)]
pub struct Database {
    inner: Arc<DatabaseInner>,
}

impl Database {
    /// Creates a database with the default configuration.
    pub fn new() -> Self {
        Self::with_config(DatabaseConfig::default())
    }

    pub fn with_config(config: DatabaseConfig) -> Self {
        let locks = Arc::new(DefaultLockManager::from_config(&config));
        Self::with_lock_manager(config, locks)
    }

    /// Creates a database that takes its table locks from `locks`.
    pub fn with_lock_manager(config: DatabaseConfig, locks: Arc<dyn LockManager>) -> Self {
        Self {
            inner: Arc::new(DatabaseInner {
                config,
                locks,
                catalog: Arc::new(Catalog::new()),
                tables: RwLock::new(HashMap::new()),
                next_txn: AtomicU64::new(1),
            }),
        }
    }

    pub fn config(&self) -> &DatabaseConfig {
        &self.inner.config
    }

    /// Starts a transaction.
    pub fn begin(&self) -> Transaction {
        let id = self.inner.next_txn.fetch_add(1, Ordering::Relaxed);
        Transaction::begin(id, Arc::clone(&self.inner.locks))
    }

    /// Runs `f` in a fresh transaction: commits if it succeeds, rolls back
    /// and returns its error otherwise.
    pub fn execute<T>(&self, f: impl FnOnce(&Transaction) -> Result<T>) -> Result<T> {
        let tx = self.begin();
        match f(&tx) {
            Ok(value) => {
                tx.commit()?;
                Ok(value)
            }
            Err(e) => {
                let txn = tx.id();
                if let Err(rollback) = tx.rollback() {
                    error!(txn, error = %rollback, "rollback failed");
                }
                Err(e)
            }
        }
    }

    /// Id of the table named `name`.
    pub fn table_id(&self, name: &str) -> Option<TableId> {
        self.inner.catalog.table_id(name)
    }

    /// Another handle to the table named `name`.
    ///
    /// Fails if no such table exists or if it stores other entity or key
    /// types.
    pub fn table<E: Entity, PK: Key>(&self, name: &str) -> Result<Table<E, PK>> {
        let id = self
            .table_id(name)
            .ok_or_else(|| Error::invalid_schema(format!("no table named {}", name)))?;
        let tables = self.inner.tables.read();
        tables
            .get(&id)
            .and_then(|table| table.downcast_ref::<Table<E, PK>>())
            .cloned()
            .ok_or_else(|| Error::invalid_schema(format!("table {} stores other entity or key types", name)))
    }

    /// Names of every table, in creation order.
    pub fn table_names(&self) -> Vec<String> {
        self.inner.catalog.table_names()
    }

    /// Creates a table from `builder`.
    pub fn create_table<E: Entity, PK: Key>(&self, mut builder: TableBuilder<E, PK>) -> Result<Table<E, PK>> {
        builder.validate()?;
        let identity = builder.identity.take().map(Identity::new).transpose()?;
        let id = self.inner.catalog.register_table(&builder.name)?;
        let table = Table::create(
            id,
            Arc::clone(&self.inner.catalog),
            builder,
            identity,
            self.inner.config.default_index_kind,
        );
        self.inner.tables.write().insert(id, Arc::new(table.clone()));
        Ok(table)
    }

    /// Links rows of the foreign table to rows of the primary table.
    ///
    /// `primary` must be a unique index. `to_primary` maps a foreign key to
    /// the primary key it refers to and `to_foreign` maps back. Unless
    /// disabled in the configuration, existing foreign rows are validated
    /// first and the relation is not created if any of them is orphaned.
    pub fn create_relation<P, PK, F, FK, TP, TF>(
        &self,
        primary: &IndexHandle<P, PK>,
        foreign: &IndexHandle<F, FK>,
        to_primary: TP,
        to_foreign: TF,
        options: RelationOptions,
    ) -> Result<Arc<Relation<P, PK, F, FK>>>
    where
        P: Entity,
        PK: Key,
        F: Entity,
        FK: Key,
        TP: Fn(&FK) -> PK + Send + Sync + 'static,
        TF: Fn(&PK) -> FK + Send + Sync + 'static,
    {
        if !primary.is_unique() {
            return Err(Error::invalid_schema(format!(
                "primary index {}.{} of a relation must be unique",
                primary.table_name(),
                primary.name()
            )));
        }
        let catalog = &self.inner.catalog;
        if !Arc::ptr_eq(primary.table.catalog(), catalog) || !Arc::ptr_eq(foreign.table.catalog(), catalog) {
            return Err(Error::invalid_schema("relation tables belong to another database"));
        }

        let relation = Arc::new(Relation::new(
            catalog.next_relation_id(),
            primary,
            foreign,
            to_primary,
            to_foreign,
            options,
        ));

        let tx = self.begin();
        if self.inner.config.validate_relations_on_create {
            if let Err(e) = relation.validate_all(&tx) {
                if let Err(rollback) = tx.rollback() {
                    error!(error = %rollback, "rollback failed");
                }
                return Err(e);
            }
        }

        primary.table.add_referring(relation.clone());
        foreign.table.add_referred(relation.clone());
        catalog.register_relation(RelationEdge {
            id: relation.id(),
            primary: primary.table.id(),
            foreign: foreign.table.id(),
        });
        tx.commit()?;

        debug!(
            relation = relation.id().0,
            primary = relation.primary_index_name(),
            foreign = relation.foreign_index_name(),
            cascade = options.cascaded_deletion,
            "relation created"
        );
        Ok(relation)
    }
}

impl Default for Database {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Database {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Database")
            .field("config", &self.inner.config)
            .field("tables", &self.inner.catalog.table_names())
            .field("relations", &self.inner.catalog.relation_count())
            .finish()
    }
}
