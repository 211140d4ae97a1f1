//! relstore Storage - Transactional table store for relstore.
//!
//! This crate provides the storage layer including:
//!
//! - `Database`: table and relation registry, transaction factory
//! - `Table`: row heap with index maintenance, identity columns and
//!   constraints; inserts, updates and deletes run through one pipeline
//! - `IndexHandle`: typed reads through a primary or secondary index
//! - `Relation`: foreign-key validation and cascading deletes
//! - `Transaction`: undo log with savepoints and rollback
//! - `LockManager`: per-table shared/exclusive locks with timeout and
//!   deadlock detection
//!
//! # Example
//!
//! ```rust
//! use relstore_core::{impl_entity, Error, KeyInfo};
//! use relstore_storage::{Database, IdentitySpec, IndexKind, RelationOptions, TableBuilder};
//!
//! #[derive(Clone, Debug, Default)]
//! struct Order {
//!     id: i64,
//!     customer: String,
//! }
//! impl_entity!(Order { id, customer });
//!
//! #[derive(Clone, Debug, Default)]
//! struct Item {
//!     id: i64,
//!     order_id: i64,
//! }
//! impl_entity!(Item { id, order_id });
//!
//! let db = Database::new();
//! let orders = db
//!     .create_table(
//!         TableBuilder::new("orders", KeyInfo::new(&["id"], |o: &Order| o.id).unwrap())
//!             .unwrap()
//!             .identity(IdentitySpec::new("id", |o: &Order| o.id, |o: &mut Order, v| o.id = v)),
//!     )
//!     .unwrap();
//! let items = db
//!     .create_table(TableBuilder::new("items", KeyInfo::new(&["id"], |i: &Item| i.id).unwrap()).unwrap())
//!     .unwrap();
//!
//! let tx = db.begin();
//! let by_order = items
//!     .create_index(&tx, "by_order", KeyInfo::new(&["order_id"], |i: &Item| i.order_id).unwrap(), false, IndexKind::Tree)
//!     .unwrap();
//! tx.commit().unwrap();
//!
//! db.create_relation(
//!     orders.primary_index(),
//!     &by_order,
//!     |fk: &i64| *fk,
//!     |pk: &i64| *pk,
//!     RelationOptions::new().cascaded_deletion(true),
//! )
//! .unwrap();
//!
//! db.execute(|tx| {
//!     let mut order = Order { customer: "ann".into(), ..Order::default() };
//!     orders.insert(tx, &mut order)?;
//!     assert_eq!(order.id, 1);
//!     items.insert(tx, &mut Item { id: 10, order_id: order.id })
//! })
//! .unwrap();
//!
//! let tx = db.begin();
//! let err = items.insert(&tx, &mut Item { id: 11, order_id: 99 }).unwrap_err();
//! assert!(matches!(err, Error::ForeignKeyViolation { .. }));
//!
//! orders.delete(&tx, &1).unwrap();
//! assert!(items.select_all(&tx).unwrap().is_empty());
//! tx.commit().unwrap();
//! ```

mod catalog;
pub mod config;
pub mod constraint;
pub mod database;
pub mod identity;
pub mod index;
pub mod lock;
mod log;
pub mod operation;
pub mod relation;
pub mod schema;
pub mod table;
pub mod transaction;

pub use config::{DatabaseConfig, IndexKind};
pub use constraint::{Constraint, Phase};
pub use database::Database;
pub use identity::IdentitySpec;
pub use index::{IndexHandle, IndexInfo};
pub use lock::{DefaultLockManager, LockManager, LockType};
pub use log::LogPosition;
pub use operation::OperationState;
pub use relation::{Relation, RelationOptions};
pub use schema::{TableBuilder, DEFAULT_PRIMARY_INDEX};
pub use table::Table;
pub use transaction::{Transaction, TransactionState};
