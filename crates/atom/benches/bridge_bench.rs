//! Benchmarks for cynos-atom.
//!
//! Measures how long a collection write takes to reach an atom subscriber,
//! directly and through a live query.

use cynos_atom::{collection_atom, query_atom, QueryOptions};
use cynos_collection::{Collection, CollectionConfig, ManualSync, QueryBuilder, Write};
use cynos_reactive::Registry;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

fn ready_source() -> (Collection<u64, u64>, ManualSync<u64, u64>) {
    let sync = ManualSync::new();
    let collection = Collection::new(
        CollectionConfig::new()
            .with_sync(sync.clone())
            .with_gc_time(None)
            .with_start_sync(true),
    );
    sync.mark_ready().unwrap();
    (collection, sync)
}

fn fill(sync: &ManualSync<u64, u64>, size: u64) {
    sync.apply((0..size).map(|i| Write::Insert(i, i))).unwrap();
}

fn bench_collection_atom(c: &mut Criterion) {
    let mut group = c.benchmark_group("collection_atom");

    for size in [10u64, 100, 1000] {
        group.bench_with_input(BenchmarkId::new("update_one", size), &size, |b, &size| {
            let (collection, sync) = ready_source();
            fill(&sync, size);
            let atom = collection_atom(&collection);
            let registry = Registry::new();
            let sub = registry.subscribe(&atom, |v| {
                black_box(v);
            });

            let mut n = 0u64;
            b.iter(|| {
                n += 1;
                sync.update(n % size, n).unwrap();
            });
            sub.unsubscribe();
        });
    }

    group.finish();
}

fn bench_query_atom(c: &mut Criterion) {
    let mut group = c.benchmark_group("query_atom");

    for size in [10u64, 100, 1000] {
        group.bench_with_input(BenchmarkId::new("filtered_update", size), &size, |b, &size| {
            let (collection, sync) = ready_source();
            fill(&sync, size);
            let atom = query_atom(
                move |q: &QueryBuilder| Some(q.from(&collection).filter(|v: &u64| v % 2 == 0)),
                QueryOptions::default(),
            );
            let registry = Registry::new();
            let sub = registry.subscribe(&atom, |v| {
                black_box(v);
            });

            let mut n = 0u64;
            b.iter(|| {
                n += 1;
                sync.update(n % size, n).unwrap();
            });
            sub.unsubscribe();
        });

        group.bench_with_input(BenchmarkId::new("bind", size), &size, |b, &size| {
            let (collection, sync) = ready_source();
            fill(&sync, size);
            let registry = Registry::new();

            b.iter(|| {
                let source = collection.clone();
                let atom = query_atom(
                    move |q: &QueryBuilder| Some(q.from(&source)),
                    QueryOptions::default(),
                );
                black_box(registry.subscribe(&atom, |_| {}).unsubscribe())
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_collection_atom, bench_query_atom);
criterion_main!(benches);
