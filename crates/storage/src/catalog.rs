//! Database-wide registry of tables and relations.
//!
//! The catalog hands out table and relation ids, issues row-version tokens
//! and keeps the relation graph as plain table-id edges, which is all the
//! lock planner needs to find every table an operation can reach.

use hashbrown::{HashMap, HashSet};
use parking_lot::RwLock;
use relstore_core::{Error, RelationId, Result, RowVersion, TableId};
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};

/// One relation as seen by the lock planner.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct RelationEdge {
    pub(crate) id: RelationId,
    pub(crate) primary: TableId,
    pub(crate) foreign: TableId,
}

#[derive(Debug, Default)]
pub(crate) struct Catalog {
    next_table: AtomicU32,
    next_relation: AtomicU32,
    row_versions: AtomicU64,
    tables: RwLock<HashMap<String, TableId>>,
    relations: RwLock<Vec<RelationEdge>>,
}

impl Catalog {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Registers a table name and returns its id.
    pub(crate) fn register_table(&self, name: &str) -> Result<TableId> {
        let mut tables = self.tables.write();
        if tables.contains_key(name) {
            return Err(Error::invalid_schema(format!("table {} already exists", name)));
        }
        let id = TableId(self.next_table.fetch_add(1, Ordering::SeqCst));
        tables.insert(name.to_string(), id);
        Ok(id)
    }

    pub(crate) fn table_id(&self, name: &str) -> Option<TableId> {
        self.tables.read().get(name).copied()
    }

    pub(crate) fn table_names(&self) -> Vec<String> {
        let tables = self.tables.read();
        let mut names: Vec<(TableId, String)> =
            tables.iter().map(|(name, id)| (*id, name.clone())).collect();
        names.sort();
        names.into_iter().map(|(_, name)| name).collect()
    }

    pub(crate) fn next_relation_id(&self) -> RelationId {
        RelationId(self.next_relation.fetch_add(1, Ordering::SeqCst))
    }

    pub(crate) fn register_relation(&self, edge: RelationEdge) {
        self.relations.write().push(edge);
    }

    pub(crate) fn relation_count(&self) -> usize {
        self.relations.read().len()
    }

    /// Issues a fresh row-version token.
    pub(crate) fn next_row_version(&self) -> RowVersion {
        RowVersion::from_raw(self.row_versions.fetch_add(1, Ordering::SeqCst) + 1)
    }

    /// Tables whose rows refer to `table`, directly or through a chain of
    /// relations, sorted by id. `table` itself is excluded.
    pub(crate) fn referring_closure(&self, table: TableId) -> Vec<TableId> {
        let relations = self.relations.read();
        let mut seen = HashSet::new();
        let mut stack = vec![table];
        while let Some(current) = stack.pop() {
            for edge in relations.iter().filter(|edge| edge.primary == current) {
                if seen.insert(edge.foreign) {
                    stack.push(edge.foreign);
                }
            }
        }
        seen.remove(&table);
        let mut tables: Vec<TableId> = seen.into_iter().collect();
        tables.sort();
        tables
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_tables() {
        let catalog = Catalog::new();
        let a = catalog.register_table("orders").unwrap();
        let b = catalog.register_table("items").unwrap();
        assert!(a < b);
        assert!(catalog.register_table("orders").is_err());
        assert_eq!(catalog.table_id("items"), Some(b));
        assert_eq!(catalog.table_names(), vec!["orders", "items"]);
    }

    #[test]
    fn test_row_versions_increase() {
        let catalog = Catalog::new();
        let first = catalog.next_row_version();
        let second = catalog.next_row_version();
        assert!(!first.is_unset());
        assert!(first < second);
    }

    #[test]
    fn test_referring_closure() {
        let catalog = Catalog::new();
        let (a, b, c, d) = (TableId(0), TableId(1), TableId(2), TableId(3));
        // b -> a, c -> b, a -> a, d unrelated
        for (primary, foreign) in [(a, b), (b, c), (a, a)] {
            catalog.register_relation(RelationEdge {
                id: catalog.next_relation_id(),
                primary,
                foreign,
            });
        }
        assert_eq!(catalog.referring_closure(a), vec![b, c]);
        assert_eq!(catalog.referring_closure(c), Vec::<TableId>::new());
        assert!(catalog.referring_closure(d).is_empty());
        assert_eq!(catalog.relation_count(), 3);
    }
}
