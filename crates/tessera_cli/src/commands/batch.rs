//! Batch command implementation.

use super::demo::Demo;
use serde::Serialize;
use tessera_core::{DatabaseConfig, DatabaseStatsSnapshot, GuardConnection, StorageConfig};

/// Batch commit report.
#[derive(Debug, Serialize)]
pub struct BatchReport {
    /// Writes performed under one guard.
    pub writes: usize,
    /// Commit-pending threshold (0 commits every write).
    pub threshold: usize,
    /// Backend commits observed after each write.
    pub commits_after_write: Vec<u64>,
    /// Writes still pending when the guard finished.
    pub pending_at_finish: usize,
    /// Backend commits after the guard finished.
    pub total_commits: u64,
    /// Database counters at the end.
    pub stats: DatabaseStatsSnapshot,
}

/// Runs the batch command.
pub fn run(writes: usize, threshold: usize, format: &str) -> Result<(), Box<dyn std::error::Error>> {
    let demo = Demo::new(0, DatabaseConfig::default(), StorageConfig::default())?;
    let before = demo.backend.commit_count();

    let guard = GuardConnection::new(&demo.connection)?;
    guard.set_max_commit_pending(threshold);
    let mut commits_after_write = Vec::with_capacity(writes);
    for n in 0..writes {
        let id = n as i64;
        demo.storage
            .save_in(&guard, &demo.recorder(id, &format!("written {id}"))?)?;
        commits_after_write.push(demo.backend.commit_count() - before);
    }
    let pending_at_finish = guard.pending();
    guard.finish()?;

    let report = BatchReport {
        writes,
        threshold,
        commits_after_write,
        pending_at_finish,
        total_commits: demo.backend.commit_count() - before,
        stats: demo.db.stats().snapshot(),
    };

    match format {
        "json" => println!("{}", serde_json::to_string_pretty(&report)?),
        _ => print_text_output(&report),
    }

    Ok(())
}

fn print_text_output(report: &BatchReport) {
    println!("Tessera Commit Batching");
    println!("=======================");
    println!();
    println!("Writes:    {}", report.writes);
    println!("Threshold: {}", report.threshold);
    println!();
    for (n, commits) in report.commits_after_write.iter().enumerate() {
        println!("  write {:>4} -> {} commit(s)", n + 1, commits);
    }
    println!();
    println!("Pending at finish: {}", report.pending_at_finish);
    println!("Total commits:     {}", report.total_commits);
}
