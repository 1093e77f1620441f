//! Guard and commit benchmarks.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use tessera_core::{GuardConnection, GuardStatement};
use tessera_testkit::TestDatabase;

/// Benchmark acquiring and releasing a connection guard.
fn bench_guard_overhead(c: &mut Criterion) {
    c.bench_function("guard_overhead", |b| {
        let t = TestDatabase::new();

        b.iter(|| {
            let guard = GuardConnection::new(black_box(&t.connection)).unwrap();
            black_box(guard.pending());
        });
    });
}

/// Benchmark a raw execute and fetch through guards.
fn bench_execute_fetch(c: &mut Criterion) {
    c.bench_function("execute_fetch", |b| {
        let t = TestDatabase::new();

        b.iter(|| {
            let guard = GuardConnection::new(&t.connection).unwrap();
            let mut statement = GuardStatement::new(&guard, &t.read).unwrap();
            statement.set_input(0, black_box(4_i64)).unwrap();
            statement.execute().unwrap();
            black_box(statement.fetch().unwrap());
        });
    });
}

/// Benchmark writes with different commit-pending thresholds.
fn bench_batched_commit(c: &mut Criterion) {
    let mut group = c.benchmark_group("batched_commit");
    let writes = 100;
    group.throughput(Throughput::Elements(writes as u64));

    for threshold in [0, 10, 100].iter() {
        group.bench_with_input(
            BenchmarkId::from_parameter(threshold),
            threshold,
            |b, &threshold| {
                let t = TestDatabase::new();
                let recorders: Vec<_> = (0..writes as i64)
                    .map(|id| t.recorder(id, &format!("bench {id}")))
                    .collect();

                b.iter(|| {
                    let guard = GuardConnection::new(&t.connection).unwrap();
                    guard.set_max_commit_pending(threshold);
                    for recorder in &recorders {
                        t.storage.save_in(&guard, recorder).unwrap();
                    }
                    guard.finish().unwrap();
                });
            },
        );
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_guard_overhead,
    bench_execute_fetch,
    bench_batched_commit,
);

criterion_main!(benches);
