//! Benchmarks for loadable reads: memoized hits versus reads after a change.
//!
//! Run with: cargo bench -p loadable-core -- read

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use std::hint::black_box;

use loadable_core::{LoadableRegistry, StatusRule, is_loading};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn people(count: usize) -> Vec<String> {
    (0..count).map(|i| format!("person-{i}")).collect()
}

// ---------------------------------------------------------------------------
// 1. Cached reads
// ---------------------------------------------------------------------------

fn bench_cached_read(c: &mut Criterion) {
    let mut group = c.benchmark_group("read/cached");

    for count in [10usize, 1_000] {
        group.throughput(Throughput::Elements(1));
        let mut registry = LoadableRegistry::new("Bench");
        let persons = registry
            .declare("persons", people(count))
            .expect("fresh registry");
        let _ = persons.get();

        group.bench_with_input(BenchmarkId::new("with", count), &(), |b, _| {
            b.iter(|| black_box(persons.with(|read| (is_loading(read), read.len()))))
        });
        group.bench_with_input(BenchmarkId::new("get", count), &(), |b, _| {
            b.iter(|| black_box(persons.get().len()))
        });
    }
    group.finish();
}

// ---------------------------------------------------------------------------
// 2. Flag flips
// ---------------------------------------------------------------------------

fn bench_flip_then_read(c: &mut Criterion) {
    let mut group = c.benchmark_group("read/flip");

    for observed in [false, true] {
        let mut registry = LoadableRegistry::new("Bench");
        let persons = registry
            .declare("persons", people(100))
            .expect("fresh registry");
        let toggle = registry
            .toggle::<(bool,)>("persons", StatusRule::first_argument())
            .expect("declared field");
        let _sub = observed.then(|| {
            persons.subscribe(|read| {
                black_box(read.len());
            })
        });

        let mut flag = false;
        group.bench_with_input(BenchmarkId::new("toggle", observed), &(), |b, _| {
            b.iter(|| {
                flag = !flag;
                toggle.apply((flag,), |_| ());
                black_box(persons.with(|read| is_loading(read)))
            })
        });
    }
    group.finish();
}

criterion_group!(benches, bench_cached_read, bench_flip_then_read);
criterion_main!(benches);
