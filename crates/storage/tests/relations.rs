//! Integration tests for relations: foreign key validation, cascading and
//! blocked deletes, self references and relation toggling.

use relstore_core::{impl_entity, Error, KeyInfo};
use relstore_storage::{Database, IndexHandle, IndexKind, Relation, RelationOptions, Table, TableBuilder};
use std::sync::Arc;

#[derive(Clone, Debug, Default, PartialEq)]
struct Order {
    id: i64,
    customer: String,
}

impl_entity!(Order { id, customer });

#[derive(Clone, Debug, Default, PartialEq)]
struct Item {
    id: i64,
    order_id: Option<i64>,
    sku: String,
}

impl_entity!(Item { id, order_id, sku });

#[derive(Clone, Debug, Default, PartialEq)]
struct Employee {
    id: i32,
    manager: Option<i32>,
}

impl_entity!(Employee { id, manager });

struct Shop {
    db: Database,
    orders: Table<Order, i64>,
    items: Table<Item, i64>,
    by_order: IndexHandle<Item, Option<i64>>,
    relation: Arc<Relation<Order, i64, Item, Option<i64>>>,
}

/// Helper to create the orders/items pair linked by `items.by_order`.
fn shop(cascade: bool) -> Shop {
    let db = Database::new();
    let orders = db
        .create_table(TableBuilder::new("orders", KeyInfo::new(&["id"], |o: &Order| o.id).unwrap()).unwrap())
        .unwrap();
    let items = db
        .create_table(TableBuilder::new("items", KeyInfo::new(&["id"], |i: &Item| i.id).unwrap()).unwrap())
        .unwrap();
    let by_order = db
        .execute(|tx| {
            items.create_index(
                tx,
                "by_order",
                KeyInfo::new(&["order_id"], |i: &Item| i.order_id)?,
                false,
                IndexKind::Tree,
            )
        })
        .unwrap();
    let relation = db
        .create_relation(
            orders.primary_index(),
            &by_order,
            |fk: &Option<i64>| fk.unwrap_or_default(),
            |pk: &i64| Some(*pk),
            RelationOptions::new().cascaded_deletion(cascade),
        )
        .unwrap();
    Shop {
        db,
        orders,
        items,
        by_order,
        relation,
    }
}

fn order(id: i64) -> Order {
    Order {
        id,
        customer: format!("customer{}", id),
    }
}

fn item(id: i64, order_id: Option<i64>) -> Item {
    Item {
        id,
        order_id,
        sku: format!("sku{}", id),
    }
}

#[test]
fn test_cascade_scenario() {
    let s = shop(true);
    let tx = s.db.begin();
    s.orders.insert(&tx, &mut order(1)).unwrap();
    s.items.insert(&tx, &mut item(1, Some(1))).unwrap();

    let err = s.items.insert(&tx, &mut item(2, Some(99))).unwrap_err();
    assert!(matches!(
        err,
        Error::ForeignKeyViolation { ref primary_index, ref foreign_index, .. }
            if primary_index == "orders.pk" && foreign_index == "items.by_order"
    ));
    assert_eq!(s.items.primary_index().len(&tx).unwrap(), 1);
    assert_eq!(s.by_order.len(&tx).unwrap(), 1);

    assert!(s.orders.delete(&tx, &1).unwrap());
    assert!(s.items.primary_index().is_empty(&tx).unwrap());
    assert!(s.by_order.is_empty(&tx).unwrap());
    tx.commit().unwrap();
}

#[test]
fn test_empty_foreign_key_is_exempt() {
    let s = shop(false);
    let tx = s.db.begin();
    s.items.insert(&tx, &mut item(1, None)).unwrap();
    assert_eq!(s.relation.referred_entity(&tx, &item(1, None)).unwrap(), None);
    s.relation.validate_all(&tx).unwrap();
}

#[test]
fn test_blocked_delete_keeps_rows() {
    let s = shop(false);
    let tx = s.db.begin();
    s.orders.insert(&tx, &mut order(1)).unwrap();
    s.items.insert(&tx, &mut item(1, Some(1))).unwrap();
    s.items.insert(&tx, &mut item(2, Some(1))).unwrap();

    let err = s.orders.delete(&tx, &1).unwrap_err();
    assert!(matches!(err, Error::ReferringRowsExist { count: 2, .. }));
    assert!(err.is_referential());
    assert!(s.orders.contains_key(&tx, &1).unwrap());
    assert_eq!(s.items.len(&tx).unwrap(), 2);

    s.items.delete_where(&tx, |i| i.order_id == Some(1)).unwrap();
    assert!(s.orders.delete(&tx, &1).unwrap());
    tx.commit().unwrap();
}

#[test]
fn test_cascade_failure_rolls_back_parent() {
    let s = shop(true);
    let tx = s.db.begin();
    s.orders.insert(&tx, &mut order(1)).unwrap();
    s.items.insert(&tx, &mut item(1, Some(1))).unwrap();

    // a blocking relation one level down stops the whole cascade
    let parts = s
        .db
        .create_table(TableBuilder::new("parts", KeyInfo::new(&["id"], |e: &Employee| e.id).unwrap()).unwrap())
        .unwrap();
    let by_item = parts
        .create_index(
            &tx,
            "by_item",
            KeyInfo::new(&["manager"], |e: &Employee| e.manager).unwrap(),
            false,
            IndexKind::Hash,
        )
        .unwrap();
    tx.commit().unwrap();
    s.db.create_relation(
        s.items.primary_index(),
        &by_item,
        |fk: &Option<i32>| i64::from(fk.unwrap_or_default()),
        |pk: &i64| Some(*pk as i32),
        RelationOptions::new(),
    )
    .unwrap();

    let tx = s.db.begin();
    parts.insert(&tx, &mut Employee { id: 1, manager: Some(1) }).unwrap();
    let err = s.orders.delete(&tx, &1).unwrap_err();
    assert!(matches!(err, Error::ReferringRowsExist { .. }));
    assert!(s.orders.contains_key(&tx, &1).unwrap());
    assert_eq!(s.items.select_all(&tx).unwrap(), vec![item(1, Some(1))]);
    assert_eq!(s.by_order.len(&tx).unwrap(), 1);
}

#[test]
fn test_update_foreign_key_is_validated() {
    let s = shop(false);
    let tx = s.db.begin();
    s.orders.insert(&tx, &mut order(1)).unwrap();
    s.orders.insert(&tx, &mut order(2)).unwrap();
    s.items.insert(&tx, &mut item(1, Some(1))).unwrap();

    s.items.update_with(&tx, &1, |i| i.order_id = Some(2)).unwrap();
    assert_eq!(s.by_order.select(&tx, &Some(2)).unwrap().len(), 1);

    let err = s.items.update_with(&tx, &1, |i| i.order_id = Some(5)).unwrap_err();
    assert!(matches!(err, Error::ForeignKeyViolation { .. }));
    assert_eq!(s.items.find(&tx, &1).unwrap().unwrap().order_id, Some(2));

    // changing a non-key column skips the check
    s.items.update_with(&tx, &1, |i| i.sku = "other".into()).unwrap();
}

#[test]
fn test_update_orphaning_referrers_fails() {
    let s = shop(false);
    let tx = s.db.begin();
    s.orders.insert(&tx, &mut order(1)).unwrap();
    s.items.insert(&tx, &mut item(1, Some(1))).unwrap();

    let err = s.orders.update_with(&tx, &1, |o| o.id = 10).unwrap_err();
    assert!(matches!(err, Error::ForeignKeyViolation { .. }));
    assert!(s.orders.contains_key(&tx, &1).unwrap());
    assert!(!s.orders.contains_key(&tx, &10).unwrap());

    s.orders.update_with(&tx, &1, |o| o.customer = "renamed".into()).unwrap();
}

#[test]
fn test_disabled_relation() {
    let s = shop(false);
    let tx = s.db.begin();
    s.relation.set_enabled(&tx, false).unwrap();
    s.items.insert(&tx, &mut item(1, Some(7))).unwrap();
    assert!(s.relation.validate_entity(&tx, &item(1, Some(7))).is_ok());

    let err = s.relation.set_enabled(&tx, true).unwrap_err();
    assert!(matches!(err, Error::ForeignKeyViolation { .. }));
    assert!(!s.relation.is_enabled());

    s.orders.insert(&tx, &mut order(7)).unwrap();
    s.relation.set_enabled(&tx, true).unwrap();
    assert!(s.relation.is_enabled());
    assert!(s.items.insert(&tx, &mut item(2, Some(8))).is_err());
}

#[test]
fn test_referring_and_referred_entities() {
    let s = shop(true);
    let tx = s.db.begin();
    s.orders.insert(&tx, &mut order(1)).unwrap();
    s.items.insert(&tx, &mut item(1, Some(1))).unwrap();
    s.items.insert(&tx, &mut item(2, Some(1))).unwrap();

    let referring = s.relation.referring_entities(&tx, &order(1)).unwrap();
    assert_eq!(referring.len(), 2);
    assert_eq!(s.relation.referred_entity(&tx, &item(2, Some(1))).unwrap(), Some(order(1)));
    assert!(s.relation.options().cascaded_deletion);
}

#[test]
fn test_self_reference() {
    let db = Database::new();
    let staff = db
        .create_table(TableBuilder::new("staff", KeyInfo::new(&["id"], |e: &Employee| e.id).unwrap()).unwrap())
        .unwrap();
    let by_manager = db
        .execute(|tx| {
            staff.create_index(
                tx,
                "by_manager",
                KeyInfo::new(&["manager"], |e: &Employee| e.manager)?,
                false,
                IndexKind::Tree,
            )
        })
        .unwrap();
    db.create_relation(
        staff.primary_index(),
        &by_manager,
        |fk: &Option<i32>| fk.unwrap_or_default(),
        |pk: &i32| Some(*pk),
        RelationOptions::new().cascaded_deletion(true),
    )
    .unwrap();

    let tx = db.begin();
    // a row may point at itself
    staff.insert(&tx, &mut Employee { id: 1, manager: Some(1) }).unwrap();
    staff.insert(&tx, &mut Employee { id: 2, manager: Some(1) }).unwrap();
    staff.insert(&tx, &mut Employee { id: 3, manager: Some(2) }).unwrap();
    staff.insert(&tx, &mut Employee { id: 4, manager: None }).unwrap();
    assert!(staff.insert(&tx, &mut Employee { id: 5, manager: Some(9) }).is_err());

    assert!(staff.delete(&tx, &1).unwrap());
    let left: Vec<i32> = staff.select_all(&tx).unwrap().iter().map(|e| e.id).collect();
    assert_eq!(left, vec![4]);
    tx.commit().unwrap();
}

#[test]
fn test_database_keeps_tables_alive() {
    let Shop {
        db,
        orders,
        items,
        by_order,
        relation,
    } = shop(true);
    db.execute(|tx| {
        orders.insert(tx, &mut order(1))?;
        items.insert(tx, &mut item(1, Some(1)))
    })
    .unwrap();
    drop(items);
    drop(by_order);
    drop(relation);

    let tx = db.begin();
    assert!(orders.delete(&tx, &1).unwrap());
    let items: Table<Item, i64> = db.table("items").unwrap();
    assert!(items.is_empty(&tx).unwrap());
    tx.commit().unwrap();

    assert_eq!(db.table_names(), vec!["orders", "items"]);
    let tx = db.begin();
    assert!(items.insert(&tx, &mut item(2, Some(5))).is_err());
}

#[test]
fn test_rollback_restores_cascaded_rows() {
    let s = shop(true);
    s.db.execute(|tx| {
        s.orders.insert(tx, &mut order(1))?;
        s.items.insert(tx, &mut item(1, Some(1)))?;
        s.items.insert(tx, &mut item(2, Some(1)))
    })
    .unwrap();

    let tx = s.db.begin();
    s.orders.delete(&tx, &1).unwrap();
    assert!(s.items.is_empty(&tx).unwrap());
    tx.rollback().unwrap();

    let tx = s.db.begin();
    assert_eq!(s.items.select_all(&tx).unwrap(), vec![item(1, Some(1)), item(2, Some(1))]);
    assert_eq!(s.by_order.select(&tx, &Some(1)).unwrap().len(), 2);
}
