//! Integration tests for concurrent use: identity generation under
//! contention, lock hand-off between transactions, timeouts and deadlock
//! detection.

use relstore_core::{impl_entity, ConcurrencyError, Error, KeyInfo, TableId};
use relstore_storage::{
    Database, DatabaseConfig, DefaultLockManager, IdentitySpec, IndexKind, LockManager, RelationOptions, Table,
    TableBuilder,
};
use std::collections::BTreeSet;
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

#[derive(Clone, Debug, Default, PartialEq)]
struct Event {
    seq: i64,
    source: u32,
}

impl_entity!(Event { seq, source });

#[derive(Clone, Debug, Default, PartialEq)]
struct Account {
    id: i32,
    parent: Option<i32>,
}

impl_entity!(Account { id, parent });

fn events(db: &Database, increment: i64) -> Table<Event, i64> {
    let builder = TableBuilder::new("events", KeyInfo::new(&["seq"], |e: &Event| e.seq).unwrap())
        .unwrap()
        .identity(
            IdentitySpec::new("seq", |e: &Event| e.seq, |e: &mut Event, v| e.seq = v)
                .seed(100)
                .increment(increment),
        );
    db.create_table(builder).unwrap()
}

#[test]
fn test_identity_unique_across_threads() {
    let db = Database::new();
    let table = events(&db, 1);
    let threads = 4;
    let per_thread = 50;

    let handles: Vec<_> = (0..threads)
        .map(|source| {
            let db = db.clone();
            let table = table.clone();
            thread::spawn(move || {
                let mut seen = Vec::new();
                for _ in 0..per_thread {
                    let mut event = Event { seq: 0, source };
                    db.execute(|tx| table.insert(tx, &mut event)).unwrap();
                    seen.push(event.seq);
                }
                seen
            })
        })
        .collect();

    let mut all = BTreeSet::new();
    for handle in handles {
        let seen = handle.join().unwrap();
        assert!(seen.windows(2).all(|w| w[0] < w[1]));
        all.extend(seen);
    }
    let total = (threads as usize) * per_thread;
    assert_eq!(all.len(), total);
    assert_eq!(all.first(), Some(&100));
    assert_eq!(all.last(), Some(&(100 + total as i64 - 1)));
    assert_eq!(db.execute(|tx| table.len(tx)).unwrap(), total);
}

#[test]
fn test_negative_increment() {
    let db = Database::new();
    let table = events(&db, -5);
    let tx = db.begin();
    let mut seqs = Vec::new();
    for _ in 0..3 {
        let mut event = Event::default();
        table.insert(&tx, &mut event).unwrap();
        seqs.push(event.seq);
    }
    assert_eq!(seqs, vec![100, 95, 90]);
}

#[test]
fn test_writer_waits_for_commit() {
    let db = Database::new();
    let table = events(&db, 1);
    let first = db.begin();
    table.insert(&first, &mut Event::default()).unwrap();

    let waiter = {
        let db = db.clone();
        let table = table.clone();
        thread::spawn(move || {
            let tx = db.begin();
            let rows = table.select_all(&tx).unwrap();
            tx.commit().unwrap();
            rows.len()
        })
    };

    thread::sleep(Duration::from_millis(50));
    first.commit().unwrap();
    assert_eq!(waiter.join().unwrap(), 1);
}

#[test]
fn test_lock_timeout_rolls_back_operation() {
    let config = DatabaseConfig::new().lock_timeout(Duration::from_millis(50));
    let db = Database::with_config(config);
    let table = events(&db, 1);
    let holder = db.begin();
    table.insert(&holder, &mut Event::default()).unwrap();

    let blocked = db.begin();
    let mut event = Event::default();
    let err = table.insert(&blocked, &mut event).unwrap_err();
    assert!(matches!(err, Error::Concurrency(ConcurrencyError::Timeout { .. })));
    assert_eq!(event.seq, 0);
    assert_eq!(blocked.log_len(), 0);

    holder.rollback().unwrap();
    table.insert(&blocked, &mut Event::default()).unwrap();
    blocked.commit().unwrap();
    assert_eq!(db.execute(|tx| table.len(tx)).unwrap(), 1);
}

#[test]
fn test_row_count_waits_for_writer() {
    let config = DatabaseConfig::new().lock_timeout(Duration::from_millis(50));
    let db = Database::with_config(config);
    let table = events(&db, 1);
    let writer = db.begin();
    table.insert(&writer, &mut Event::default()).unwrap();
    assert_eq!(table.len(&writer).unwrap(), 1);

    let reader = db.begin();
    let err = table.len(&reader).unwrap_err();
    assert!(matches!(err, Error::Concurrency(ConcurrencyError::Timeout { .. })));
    assert!(table.indexes(&reader).is_err());

    writer.rollback().unwrap();
    assert!(table.is_empty(&reader).unwrap());
    assert_eq!(table.indexes(&reader).unwrap().len(), 1);
}

#[test]
fn test_deadlock_detected() {
    let db = Database::new();
    let a = db
        .create_table(TableBuilder::new("a", KeyInfo::new(&["id"], |r: &Account| r.id).unwrap()).unwrap())
        .unwrap();
    let b = db
        .create_table(TableBuilder::new("b", KeyInfo::new(&["id"], |r: &Account| r.id).unwrap()).unwrap())
        .unwrap();

    let t1 = db.begin();
    let t2 = db.begin();
    a.insert(&t1, &mut Account { id: 1, parent: None }).unwrap();
    b.insert(&t2, &mut Account { id: 1, parent: None }).unwrap();

    let barrier = Arc::new(Barrier::new(2));
    let handle = {
        let barrier = Arc::clone(&barrier);
        let a = a.clone();
        thread::spawn(move || {
            barrier.wait();
            let result = a.insert(&t2, &mut Account { id: 2, parent: None });
            let deadlocked = matches!(result, Err(Error::Concurrency(ConcurrencyError::Deadlock { .. })));
            if deadlocked {
                t2.rollback().unwrap();
            } else {
                result.unwrap();
                t2.commit().unwrap();
            }
            deadlocked
        })
    };

    barrier.wait();
    thread::sleep(Duration::from_millis(20));
    let result = b.insert(&t1, &mut Account { id: 2, parent: None });
    let deadlocked = matches!(result, Err(Error::Concurrency(ConcurrencyError::Deadlock { .. })));
    if deadlocked {
        t1.rollback().unwrap();
    } else {
        result.unwrap();
        t1.commit().unwrap();
    }
    let other_deadlocked = handle.join().unwrap();

    // exactly one side sees the cycle; the other proceeds once it is broken
    assert_ne!(deadlocked, other_deadlocked);
}

#[test]
fn test_related_tables_locked_in_table_order() {
    let locks = Arc::new(DefaultLockManager::new(Duration::from_secs(5), true));
    let db = Database::with_lock_manager(DatabaseConfig::new(), locks.clone());
    let parents = db
        .create_table(TableBuilder::new("parents", KeyInfo::new(&["id"], |r: &Account| r.id).unwrap()).unwrap())
        .unwrap();
    let children = db
        .create_table(TableBuilder::new("children", KeyInfo::new(&["id"], |r: &Account| r.id).unwrap()).unwrap())
        .unwrap();
    let by_parent = db
        .execute(|tx| {
            children.create_index(
                tx,
                "by_parent",
                KeyInfo::new(&["parent"], |r: &Account| r.parent)?,
                false,
                IndexKind::Tree,
            )
        })
        .unwrap();
    db.create_relation(
        parents.primary_index(),
        &by_parent,
        |fk: &Option<i32>| fk.unwrap_or_default(),
        |pk: &i32| Some(*pk),
        RelationOptions::new().cascaded_deletion(true),
    )
    .unwrap();

    let tx = db.begin();
    children.insert(&tx, &mut Account { id: 1, parent: None }).unwrap();
    let mut held = locks.locked_tables(tx.id());
    held.sort();
    assert_eq!(held, vec![parents.id(), children.id()]);
    assert!(locks.holds_exclusive(parents.id(), tx.id()));
    let id = tx.id();
    tx.commit().unwrap();
    assert!(locks.locked_tables(id).is_empty());

    // writers entering the relation from either side never deadlock
    let writers: Vec<_> = (0..4)
        .map(|n| {
            let db = db.clone();
            let parents = parents.clone();
            let children = children.clone();
            thread::spawn(move || {
                for i in 0..20 {
                    let id = 1_000 + n * 100 + i;
                    db.execute(|tx| {
                        if n % 2 == 0 {
                            parents.insert(tx, &mut Account { id, parent: None })?;
                            children.insert(tx, &mut Account { id, parent: Some(id) })
                        } else {
                            children.insert(tx, &mut Account { id, parent: None })?;
                            parents.delete(tx, &id).map(|_| ())
                        }
                    })
                    .unwrap();
                }
            })
        })
        .collect();
    for writer in writers {
        writer.join().unwrap();
    }
    assert_eq!(db.execute(|tx| parents.len(tx)).unwrap(), 40);
    assert_eq!(db.execute(|tx| children.len(tx)).unwrap(), 81);
}

#[test]
fn test_lock_manager_reentrant() {
    let locks = DefaultLockManager::default();
    let table = TableId(3);
    locks.acquire_write(table, 1).unwrap();
    locks.acquire_write(table, 1).unwrap();
    locks.acquire_read(table, 1).unwrap();
    assert!(locks.is_held(table, 1));
    locks.release_all(1);
    assert!(!locks.is_held(table, 1));
}
