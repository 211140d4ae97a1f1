//! Benchmarks for table mutations: single-row deletes vs predicate deletes,
//! and cascading deletes across a relation.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use relstore_core::{impl_entity, KeyInfo};
use relstore_storage::{Database, IndexKind, RelationOptions, Table, TableBuilder};

#[derive(Clone, Debug, Default)]
struct Quote {
    id: i64,
    price: i64,
    symbol: String,
    sector: String,
}

impl_entity!(Quote { id, price, symbol, sector });

#[derive(Clone, Debug, Default)]
struct Trade {
    id: i64,
    quote: Option<i64>,
}

impl_entity!(Trade { id, quote });

fn quotes(db: &Database) -> Table<Quote, i64> {
    let table = db
        .create_table(TableBuilder::new("quotes", KeyInfo::new(&["id"], |q: &Quote| q.id).unwrap()).unwrap())
        .unwrap();
    let tx = db.begin();
    table
        .create_index(&tx, "idx_price", KeyInfo::new(&["price"], |q: &Quote| q.price).unwrap(), false, IndexKind::Tree)
        .unwrap();
    table
        .create_index(&tx, "idx_symbol", KeyInfo::new(&["symbol"], |q: &Quote| q.symbol.clone()).unwrap(), true, IndexKind::Hash)
        .unwrap();
    table
        .create_index(&tx, "idx_sector", KeyInfo::new(&["sector"], |q: &Quote| q.sector.clone()).unwrap(), false, IndexKind::Tree)
        .unwrap();
    tx.commit().unwrap();
    table
}

fn populate(db: &Database, table: &Table<Quote, i64>, count: i64) {
    let sectors = ["Tech", "Finance", "Health", "Energy", "Consumer"];
    db.execute(|tx| {
        for i in 1..=count {
            let mut quote = Quote {
                id: i,
                price: 100 + i % 50,
                symbol: format!("SYM{}", i),
                sector: sectors[(i as usize) % sectors.len()].into(),
            };
            table.insert(tx, &mut quote)?;
        }
        Ok(())
    })
    .unwrap();
}

/// Benchmark: inserting rows into a table with three secondary indexes
fn table_insert_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("table_insert");
    for count in [1_000i64, 10_000].iter() {
        group.bench_with_input(BenchmarkId::from_parameter(count), count, |b, &count| {
            b.iter_batched(
                || {
                    let db = Database::new();
                    let table = quotes(&db);
                    (db, table)
                },
                |(db, table)| {
                    populate(&db, &table, count);
                    black_box(table)
                },
                criterion::BatchSize::SmallInput,
            );
        });
    }
    group.finish();
}

/// Benchmark: individual delete() calls vs delete_where()
fn table_delete_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("table_delete");
    let total_rows = 10_000i64;

    for delete_count in [100i64, 1000].iter() {
        group.bench_with_input(
            BenchmarkId::new("individual", delete_count),
            delete_count,
            |b, &delete_count| {
                b.iter_batched(
                    || {
                        let db = Database::new();
                        let table = quotes(&db);
                        populate(&db, &table, total_rows);
                        (db, table)
                    },
                    |(db, table)| {
                        db.execute(|tx| {
                            for id in 1..=delete_count {
                                table.delete(tx, &id)?;
                            }
                            Ok(())
                        })
                        .unwrap();
                        black_box(table)
                    },
                    criterion::BatchSize::SmallInput,
                );
            },
        );

        group.bench_with_input(
            BenchmarkId::new("predicate", delete_count),
            delete_count,
            |b, &delete_count| {
                b.iter_batched(
                    || {
                        let db = Database::new();
                        let table = quotes(&db);
                        populate(&db, &table, total_rows);
                        (db, table)
                    },
                    |(db, table)| {
                        db.execute(|tx| table.delete_where(tx, |q| q.id <= delete_count)).unwrap();
                        black_box(table)
                    },
                    criterion::BatchSize::SmallInput,
                );
            },
        );
    }

    group.finish();
}

/// Benchmark: deleting parents that cascade to their trades
fn table_cascade_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("table_cascade");
    let parents = 1_000i64;

    for per_parent in [1i64, 10].iter() {
        group.bench_with_input(BenchmarkId::from_parameter(per_parent), per_parent, |b, &per_parent| {
            b.iter_batched(
                || {
                    let db = Database::new();
                    let quotes = quotes(&db);
                    populate(&db, &quotes, parents);
                    let trades = db
                        .create_table(TableBuilder::new("trades", KeyInfo::new(&["id"], |t: &Trade| t.id).unwrap()).unwrap())
                        .unwrap();
                    let by_quote = db
                        .execute(|tx| {
                            trades.create_index(tx, "by_quote", KeyInfo::new(&["quote"], |t: &Trade| t.quote)?, false, IndexKind::Tree)
                        })
                        .unwrap();
                    db.create_relation(
                        quotes.primary_index(),
                        &by_quote,
                        |fk: &Option<i64>| fk.unwrap_or_default(),
                        |pk: &i64| Some(*pk),
                        RelationOptions::new().cascaded_deletion(true),
                    )
                    .unwrap();
                    db.execute(|tx| {
                        for i in 0..parents * per_parent {
                            trades.insert(tx, &mut Trade { id: i, quote: Some(1 + i % parents) })?;
                        }
                        Ok(())
                    })
                    .unwrap();
                    (db, quotes, trades)
                },
                |(db, quotes, trades)| {
                    db.execute(|tx| quotes.delete_where(tx, |_| true)).unwrap();
                    black_box(trades)
                },
                criterion::BatchSize::SmallInput,
            );
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    table_insert_benchmark,
    table_delete_benchmark,
    table_cascade_benchmark,
);

criterion_main!(benches);
