//! Index benchmarks: tree against hash on the lookups a table issues.

use criterion::{black_box, criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion};
use relstore_index::{HashIndex, Index, KeyComparator, KeyRange, Order, RangeIndex, TreeIndex};

const ROWS: i64 = 20_000;

fn filled<I: Index<i64>>(mut index: I, rows: i64) -> I {
    // interleave keys so the tree sees rotations on both sides
    for i in 0..rows {
        let key = if i % 2 == 0 { i } else { rows * 2 - i };
        index.add(key, i as u64).unwrap();
    }
    index
}

fn build(c: &mut Criterion) {
    let mut group = c.benchmark_group("build");
    for rows in [1_000i64, ROWS] {
        group.bench_with_input(BenchmarkId::new("tree", rows), &rows, |b, &rows| {
            b.iter(|| black_box(filled(TreeIndex::<i64>::new(true), rows)))
        });
        group.bench_with_input(BenchmarkId::new("hash", rows), &rows, |b, &rows| {
            b.iter(|| black_box(filled(HashIndex::<i64>::new(true), rows)))
        });
    }
    group.finish();
}

fn point_lookup(c: &mut Criterion) {
    let tree = filled(TreeIndex::<i64>::new(true), ROWS);
    let hash = filled(HashIndex::<i64>::new(true), ROWS);
    let probes: Vec<i64> = (0..ROWS * 2).step_by(97).collect();

    let mut group = c.benchmark_group("point_lookup");
    group.bench_function("tree", |b| {
        b.iter(|| probes.iter().filter_map(|k| tree.get_unique(k)).count())
    });
    group.bench_function("hash", |b| {
        b.iter(|| probes.iter().filter_map(|k| hash.get_unique(k)).count())
    });
    group.finish();
}

fn range_scan(c: &mut Criterion) {
    let asc = filled(TreeIndex::<i64>::new(false), ROWS);
    let desc = filled(
        TreeIndex::with_comparator(false, KeyComparator::new(vec![Order::Desc])),
        ROWS,
    );

    let mut group = c.benchmark_group("range_scan");
    for width in [100i64, 5_000] {
        let range = KeyRange::bound(ROWS, ROWS + width, false, true);
        group.bench_with_input(BenchmarkId::new("asc", width), &range, |b, range| {
            b.iter(|| black_box(asc.get_range(range, false, None)))
        });
        let range = KeyRange::bound(ROWS + width, ROWS, false, true);
        group.bench_with_input(BenchmarkId::new("desc", width), &range, |b, range| {
            b.iter(|| black_box(desc.get_range(range, false, None)))
        });
    }
    group.bench_function("limit_10_reverse", |b| {
        b.iter(|| black_box(asc.get_range(&KeyRange::all(), true, Some(10))))
    });
    group.finish();
}

fn churn(c: &mut Criterion) {
    c.bench_function("tree_remove_half", |b| {
        b.iter_batched(
            || filled(TreeIndex::<i64>::new(true), ROWS),
            |mut tree| {
                for i in (0..ROWS).step_by(2) {
                    tree.remove(&i, i as u64);
                }
                tree
            },
            BatchSize::LargeInput,
        )
    });
}

criterion_group!(benches, build, point_lookup, range_scan, churn);
criterion_main!(benches);
