//! Storage cache benchmarks.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rand::Rng;
use tessera_core::{AccessMode, DatabaseConfig, StorageConfig};
use tessera_testkit::TestDatabase;

/// Benchmark loads served from the cache.
fn bench_cache_hit(c: &mut Criterion) {
    c.bench_function("cache_hit", |b| {
        let t = TestDatabase::new();
        let loader = t.loader(6);
        t.storage.load(&t.connection, &loader).unwrap();

        b.iter(|| {
            let person = t.storage.load(&t.connection, black_box(&loader)).unwrap();
            black_box(person);
        });
    });
}

/// Benchmark loads that always go to the backend.
fn bench_cache_fault(c: &mut Criterion) {
    c.bench_function("cache_fault", |b| {
        let t = TestDatabase::with_config(
            DatabaseConfig::default(),
            StorageConfig::new().access_mode(AccessMode::ReadEver),
            10,
        );
        let loader = t.loader(6);

        b.iter(|| {
            let person = t.storage.load(&t.connection, black_box(&loader)).unwrap();
            black_box(person);
        });
    });
}

/// Benchmark random loads with a cache smaller than the data set.
fn bench_random_loads(c: &mut Criterion) {
    let mut group = c.benchmark_group("random_loads");
    let records = 1_000;

    for cache_size in [16, 128, 1_000].iter() {
        group.bench_with_input(
            BenchmarkId::from_parameter(cache_size),
            cache_size,
            |b, &cache_size| {
                let t = TestDatabase::with_config(
                    DatabaseConfig::default(),
                    StorageConfig::new().max_cache_size(cache_size),
                    records,
                );
                let loaders: Vec<_> = (0..records).map(|id| t.loader(id)).collect();
                let mut rng = rand::thread_rng();

                b.iter(|| {
                    let idx = rng.gen_range(0..loaders.len());
                    let person = t.storage.load(&t.connection, &loaders[idx]).unwrap();
                    black_box(person);
                });
            },
        );
    }
    group.finish();
}

/// Benchmark saves through the cache.
fn bench_save(c: &mut Criterion) {
    let mut group = c.benchmark_group("save");
    group.throughput(Throughput::Elements(1));

    group.bench_function("upsert", |b| {
        let t = TestDatabase::new();
        let recorder = t.recorder(3, "renamed");

        b.iter(|| {
            let person = t.storage.save(&t.connection, black_box(&recorder)).unwrap();
            black_box(person);
        });
    });
    group.finish();
}

criterion_group!(
    benches,
    bench_cache_hit,
    bench_cache_fault,
    bench_random_loads,
    bench_save,
);

criterion_main!(benches);
