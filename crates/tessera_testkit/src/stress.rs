//! Stress tests for Tessera.
//!
//! These helpers drive a [`TestDatabase`] from several threads at once and
//! report throughput. They verify that guards serialize access and that
//! the cache counters stay consistent under contention.

use crate::fixtures::TestDatabase;
use serde::Serialize;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tessera_core::GuardConnection;

/// Result of a stress test run.
#[derive(Debug, Clone, Serialize)]
pub struct StressTestResult {
    /// Total operations performed.
    pub total_ops: usize,
    /// Successful operations.
    pub successful_ops: usize,
    /// Failed operations.
    pub failed_ops: usize,
    /// Total duration.
    pub duration: Duration,
    /// Operations per second.
    pub ops_per_second: f64,
}

impl StressTestResult {
    /// Creates a new result.
    pub fn new(successful: usize, failed: usize, duration: Duration) -> Self {
        let total = successful + failed;
        let ops_per_second = if duration.as_secs_f64() > 0.0 {
            total as f64 / duration.as_secs_f64()
        } else {
            0.0
        };

        Self {
            total_ops: total,
            successful_ops: successful,
            failed_ops: failed,
            duration,
            ops_per_second,
        }
    }

    /// Renders the result as JSON.
    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_default()
    }

    /// Prints a summary of the test.
    pub fn print_summary(&self, name: &str) {
        println!("\n=== {} ===", name);
        println!("Total operations: {}", self.total_ops);
        println!("Successful: {}", self.successful_ops);
        println!("Failed: {}", self.failed_ops);
        println!("Duration: {:?}", self.duration);
        println!("Throughput: {:.2} ops/sec", self.ops_per_second);
    }
}

/// Configuration for stress tests.
#[derive(Debug, Clone)]
pub struct StressConfig {
    /// Operations per thread.
    pub operations: usize,
    /// Number of concurrent threads.
    pub threads: usize,
    /// Number of preloaded records the workload cycles over.
    pub records: i64,
}

impl Default for StressConfig {
    fn default() -> Self {
        Self {
            operations: 1_000,
            threads: 4,
            records: 10,
        }
    }
}

fn run_threads<F>(config: &StressConfig, work: F) -> StressTestResult
where
    F: Fn(usize, usize) -> bool + Send + Sync + 'static,
{
    let work = Arc::new(work);
    let successful = Arc::new(AtomicUsize::new(0));
    let failed = Arc::new(AtomicUsize::new(0));
    let start = Instant::now();

    let handles: Vec<_> = (0..config.threads)
        .map(|thread_id| {
            let work = Arc::clone(&work);
            let successful = Arc::clone(&successful);
            let failed = Arc::clone(&failed);
            let operations = config.operations;
            thread::spawn(move || {
                for i in 0..operations {
                    if work(thread_id, i) {
                        successful.fetch_add(1, Ordering::Relaxed);
                    } else {
                        failed.fetch_add(1, Ordering::Relaxed);
                    }
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().expect("Stress thread panicked");
    }

    StressTestResult::new(
        successful.load(Ordering::Relaxed),
        failed.load(Ordering::Relaxed),
        start.elapsed(),
    )
}

/// Loads records through one shared connection from every thread.
///
/// All guards contend for the same connection lock.
pub fn stress_shared_connection_loads(
    test_db: &Arc<TestDatabase>,
    config: &StressConfig,
) -> StressTestResult {
    let t = Arc::clone(test_db);
    let records = config.records;
    run_threads(config, move |thread_id, i| {
        let id = ((thread_id + i) as i64) % records;
        t.storage.load(&t.connection, &t.loader(id)).is_ok()
    })
}

/// Upserts records from every thread, each through its own connection.
pub fn stress_per_thread_writes(
    test_db: &Arc<TestDatabase>,
    config: &StressConfig,
) -> StressTestResult {
    let connections: Vec<_> = (0..config.threads)
        .map(|n| test_db.connect(&format!("stress-{n}")))
        .collect();
    let connections = Arc::new(connections);
    let t = Arc::clone(test_db);
    let records = config.records;
    run_threads(config, move |thread_id, i| {
        let id = (i as i64) % records;
        let name = format!("writer {thread_id} op {i}");
        t.storage
            .save(&connections[thread_id], &t.recorder(id, &name))
            .is_ok()
    })
}

/// Writes in batches of `batch` under one guard per thread iteration.
///
/// Returns the result and the number of commits the backend saw.
pub fn stress_batched_writes(
    test_db: &Arc<TestDatabase>,
    config: &StressConfig,
    batch: usize,
) -> (StressTestResult, u64) {
    let t = Arc::clone(test_db);
    let records = config.records;
    let before = test_db.backend.commit_count();
    let result = run_threads(config, move |thread_id, i| {
        let Ok(guard) = GuardConnection::new(&t.connection) else {
            return false;
        };
        guard.set_max_commit_pending(batch);
        let mut ok = true;
        for n in 0..batch {
            let id = ((i * batch + n) as i64) % records;
            let name = format!("batch {thread_id}/{i}/{n}");
            ok &= t.storage.save_in(&guard, &t.recorder(id, &name)).is_ok();
        }
        ok && guard.finish().is_ok()
    });
    (result, test_db.backend.commit_count() - before)
}
