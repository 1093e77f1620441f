//! Recover command implementation.
//!
//! Breaks the demo connection on purpose and shows how the database
//! reacts: an automatic reopen, or an unavailable connection and a call to
//! the failure handler.

use super::demo::Demo;
use serde::Serialize;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tessera_core::{Connection, ConnectionSnapshot, DatabaseConfig, StorageConfig};
use tracing::info;

/// Recovery drill report.
#[derive(Debug, Serialize)]
pub struct RecoverReport {
    /// Whether automatic recovery was enabled.
    pub auto_recovery: bool,
    /// Whether the backend refused to reopen.
    pub refuse_reopen: bool,
    /// Error returned by the operation that hit the broken link.
    pub failure: Option<String>,
    /// Outcome of the next operation.
    pub retry: String,
    /// Failure handler invocations.
    pub handler_calls: usize,
    /// Connection state at the end.
    pub connection: ConnectionSnapshot,
}

/// Runs the recover command.
pub fn run(
    auto_recovery: bool,
    refuse_reopen: bool,
    format: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let demo = Demo::new(
        4,
        DatabaseConfig::new().auto_recovery(auto_recovery),
        StorageConfig::new().max_cache_size(1),
    )?;

    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    demo.db.set_recovery_handler(move |connection: &Connection| {
        info!(connection = connection.name(), "failure handler called");
        counter.fetch_add(1, Ordering::SeqCst);
    });

    demo.backend.refuse_open(refuse_reopen);
    demo.connection.manual_break();

    let failure = demo
        .storage
        .load(&demo.connection, &demo.loader(1))
        .err()
        .map(|e| e.to_string());
    let retry = match demo.storage.load(&demo.connection, &demo.loader(2)) {
        Ok(person) => format!("loaded {}", person.get_text("name")?),
        Err(e) => e.to_string(),
    };

    let report = RecoverReport {
        auto_recovery,
        refuse_reopen,
        failure,
        retry,
        handler_calls: calls.load(Ordering::SeqCst),
        connection: demo.connection.snapshot(),
    };

    match format {
        "json" => println!("{}", serde_json::to_string_pretty(&report)?),
        _ => print_text_output(&report),
    }

    Ok(())
}

fn print_text_output(report: &RecoverReport) {
    println!("Tessera Recovery Drill");
    println!("======================");
    println!();
    println!("Auto recovery: {}", report.auto_recovery);
    println!("Refuse reopen: {}", report.refuse_reopen);
    println!();
    println!(
        "Failure:       {}",
        report.failure.as_deref().unwrap_or("(none)")
    );
    println!("Retry:         {}", report.retry);
    println!("Handler calls: {}", report.handler_calls);
    println!();
    println!("Connection '{}':", report.connection.name);
    println!("  State:      {}", report.connection.state);
    println!("  Opens:      {}", report.connection.stats.opens);
    println!("  Recoveries: {}", report.connection.stats.recoveries);
    println!("  Errors:     {}", report.connection.stats.errors);
}
