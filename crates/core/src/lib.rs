//! relstore Core - Entity, key and error model for the relstore table store.
//!
//! This crate provides the foundational types shared by the index engine and
//! the transactional storage layer:
//!
//! - `Entity`: a plain-data record type with a static field list and a
//!   field-level change detector (see `impl_entity!`)
//! - `Key` / `Order`: index key values and per-column sort order
//! - `KeyInfo`: how an index key is extracted from an entity
//! - `RowId`, `TableId`, `IndexId`, `RelationId`, `TransactionId`: identifiers
//! - `Binary`, `RowVersion`: opaque field value types
//! - `Error`: error types for table store operations
//!
//! # Example
//!
//! ```rust
//! use relstore_core::{impl_entity, Entity, KeyInfo, Order};
//!
//! #[derive(Clone, Debug)]
//! struct User {
//!     id: i64,
//!     name: String,
//!     manager: Option<i64>,
//! }
//!
//! impl_entity!(User { id, name, manager });
//!
//! let by_manager = KeyInfo::with_orders(&["manager"], &[Order::Desc], |u: &User| u.manager)
//!     .unwrap();
//!
//! let user = User { id: 1, name: "Alice".into(), manager: None };
//! assert!(by_manager.is_empty(&by_manager.select(&user)));
//! assert_eq!(User::fields().len(), 3);
//! ```

mod entity;
mod error;
mod key;
mod key_info;
mod types;

pub use entity::{Entity, FieldSet};
pub use error::{ConcurrencyError, Error, Result};
pub use key::{Key, Order};
pub use key_info::KeyInfo;
pub use types::{Binary, IndexId, RelationId, RowId, RowVersion, TableId, TransactionId};
pub use uuid::Uuid;
