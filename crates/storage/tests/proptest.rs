//! Property-based tests for relstore-storage using proptest.

use proptest::prelude::*;
use relstore_core::{impl_entity, KeyInfo};
use relstore_storage::{Database, IndexHandle, IndexKind, Table, TableBuilder, Transaction};
use std::collections::BTreeMap;

#[derive(Clone, Debug, Default, PartialEq)]
struct Row {
    id: i32,
    code: i32,
    group: i32,
}

impl_entity!(Row { id, code, group });

#[derive(Clone, Debug)]
enum Op {
    Insert { id: i32, code: i32, group: i32 },
    Update { id: i32, code: i32 },
    Regroup { group: i32, to: i32 },
    Delete(i32),
}

fn ops() -> impl Strategy<Value = Vec<Op>> {
    prop::collection::vec(
        prop_oneof![
            (0i32..30, 0i32..30, 0i32..4).prop_map(|(id, code, group)| Op::Insert { id, code, group }),
            (0i32..30, 0i32..30).prop_map(|(id, code)| Op::Update { id, code }),
            (0i32..4, 0i32..4).prop_map(|(group, to)| Op::Regroup { group, to }),
            (0i32..30).prop_map(Op::Delete),
        ],
        1..60,
    )
}

struct Fixture {
    db: Database,
    table: Table<Row, i32>,
    by_code: IndexHandle<Row, i32>,
    by_group: IndexHandle<Row, i32>,
}

fn fixture(kind: IndexKind) -> Fixture {
    let db = Database::new();
    let table = db
        .create_table(
            TableBuilder::new("rows", KeyInfo::new(&["id"], |r: &Row| r.id).unwrap())
                .unwrap()
                .index_kind(kind),
        )
        .unwrap();
    let tx = db.begin();
    let by_code = table
        .create_index(&tx, "by_code", KeyInfo::new(&["code"], |r: &Row| r.code).unwrap(), true, kind)
        .unwrap();
    let by_group = table
        .create_index(&tx, "by_group", KeyInfo::new(&["group"], |r: &Row| r.group).unwrap(), false, kind)
        .unwrap();
    tx.commit().unwrap();
    Fixture {
        db,
        table,
        by_code,
        by_group,
    }
}

/// Applies `op` to the table and, when it succeeds, to the model.
fn apply(f: &Fixture, tx: &Transaction, model: &mut BTreeMap<i32, Row>, op: &Op) {
    match *op {
        Op::Insert { id, code, group } => {
            let mut row = Row { id, code, group };
            if f.table.insert(tx, &mut row).is_ok() {
                model.insert(id, row);
            }
        }
        Op::Update { id, code } => {
            if let Ok(row) = f.table.update_with(tx, &id, |r| r.code = code) {
                model.insert(id, row);
            }
        }
        Op::Regroup { group, to } => {
            let result = f.table.update_where(tx, |r| r.group == group, |r| r.group = to);
            if result.is_ok() {
                for row in model.values_mut().filter(|r| r.group == group) {
                    row.group = to;
                }
            }
        }
        Op::Delete(id) => {
            if f.table.delete(tx, &id).unwrap() {
                model.remove(&id);
            }
        }
    }
}

/// Every index holds exactly the rows of the model.
fn check_coherent(f: &Fixture, tx: &Transaction, model: &BTreeMap<i32, Row>) -> Result<(), TestCaseError> {
    let expected: Vec<Row> = model.values().cloned().collect();
    let mut stored = f.table.select_all(tx).unwrap();
    stored.sort_by_key(|r| r.id);
    prop_assert_eq!(stored, expected);
    prop_assert_eq!(f.table.len(tx).unwrap(), model.len());
    prop_assert_eq!(f.by_code.len(tx).unwrap(), model.len());
    prop_assert_eq!(f.by_group.len(tx).unwrap(), model.len());
    for row in model.values() {
        prop_assert_eq!(f.by_code.get_by_unique_key(tx, &row.code).unwrap(), Some(row.clone()));
        prop_assert!(f.by_group.select(tx, &row.group).unwrap().contains(row));
    }
    Ok(())
}

proptest! {
    /// After any sequence of mutations, with failures rolled back
    /// statement by statement, every index agrees with the heap.
    #[test]
    fn indexes_stay_coherent(ops in ops(), hash in any::<bool>()) {
        let f = fixture(if hash { IndexKind::Hash } else { IndexKind::Tree });
        let tx = f.db.begin();
        let mut model = BTreeMap::new();
        for op in &ops {
            apply(&f, &tx, &mut model, op);
        }
        check_coherent(&f, &tx, &model)?;
    }

    /// Rolling back to a savepoint restores the exact state at that point.
    #[test]
    fn rollback_to_savepoint_restores_state(before in ops(), after in ops()) {
        let f = fixture(IndexKind::Tree);
        let tx = f.db.begin();
        let mut model = BTreeMap::new();
        for op in &before {
            apply(&f, &tx, &mut model, op);
        }
        let savepoint = tx.savepoint();
        let mut scratch = model.clone();
        for op in &after {
            apply(&f, &tx, &mut scratch, op);
        }
        tx.rollback_to(savepoint).unwrap();
        check_coherent(&f, &tx, &model)?;
        prop_assert_eq!(tx.log_len(), savepoint.offset());
    }

    /// A rolled back transaction leaves no trace.
    #[test]
    fn rollback_discards_everything(committed in ops(), discarded in ops()) {
        let f = fixture(IndexKind::Tree);
        let mut model = BTreeMap::new();
        let tx = f.db.begin();
        for op in &committed {
            apply(&f, &tx, &mut model, op);
        }
        tx.commit().unwrap();

        let tx = f.db.begin();
        let mut scratch = model.clone();
        for op in &discarded {
            apply(&f, &tx, &mut scratch, op);
        }
        tx.rollback().unwrap();

        let tx = f.db.begin();
        check_coherent(&f, &tx, &model)?;
    }
}
