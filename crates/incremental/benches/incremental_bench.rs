//! Benchmarks for cynos-incremental module.
//!
//! Target: single-key commit < 10μs

use cynos_incremental::{filter_changes, map_changes, ChangeMessage, KeyedStore, Write};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

fn bench_store_commit(c: &mut Criterion) {
    let mut group = c.benchmark_group("store_commit");

    for size in [1u64, 10, 100, 1000] {
        group.bench_with_input(BenchmarkId::new("insert_batch", size), &size, |b, &size| {
            b.iter(|| {
                let mut store: KeyedStore<u64, u64> = KeyedStore::new();
                store.begin().unwrap();
                for i in 0..size {
                    store.write(Write::Insert(i, i * 2)).unwrap();
                }
                black_box(store.commit().unwrap())
            })
        });
    }

    group.finish();
}

fn bench_filter_changes(c: &mut Criterion) {
    let mut group = c.benchmark_group("filter");

    for size in [1u64, 10, 100, 1000] {
        let changes: Vec<ChangeMessage<u64, u64>> = (0..size)
            .map(|i| ChangeMessage::update(i, i, i + 50))
            .collect();

        group.bench_with_input(BenchmarkId::new("filter_gt_50", size), &changes, |b, changes| {
            b.iter(|| filter_changes(black_box(changes), |&x| x > 50))
        });
    }

    group.finish();
}

fn bench_map_changes(c: &mut Criterion) {
    let mut group = c.benchmark_group("map");

    for size in [1u64, 10, 100, 1000] {
        let changes: Vec<ChangeMessage<u64, u64>> =
            (0..size).map(|i| ChangeMessage::insert(i, i)).collect();

        group.bench_with_input(BenchmarkId::new("map_double", size), &changes, |b, changes| {
            b.iter(|| map_changes(black_box(changes), |&x| x * 2))
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_store_commit,
    bench_filter_changes,
    bench_map_changes
);
criterion_main!(benches);
