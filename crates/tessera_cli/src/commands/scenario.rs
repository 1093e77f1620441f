//! Scenario command implementation.
//!
//! Loads one record twice, erases it, and tries to load it again, reporting
//! the cache counters after every step.

use super::demo::Demo;
use serde::Serialize;
use tessera_core::{DatabaseConfig, RepositorySnapshot, StorageConfig};

/// One step of the scenario.
#[derive(Debug, Serialize)]
pub struct Step {
    /// What was done.
    pub action: String,
    /// The value read, or the error returned.
    pub outcome: String,
    /// Whether the step succeeded.
    pub ok: bool,
    /// Fault counter after the step.
    pub faults: u64,
    /// Hit counter after the step.
    pub hits: u64,
}

/// Scenario report.
#[derive(Debug, Serialize)]
pub struct ScenarioReport {
    /// Preloaded records.
    pub records: i64,
    /// Record the scenario works on.
    pub id: i64,
    /// Steps in execution order.
    pub steps: Vec<Step>,
    /// Repository state at the end.
    pub repository: RepositorySnapshot,
}

/// Runs the scenario command.
pub fn run(
    records: i64,
    id: i64,
    cache_size: usize,
    format: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let demo = Demo::new(
        records,
        DatabaseConfig::default(),
        StorageConfig::new().max_cache_size(cache_size),
    )?;
    let mut steps = Vec::new();

    for _ in 0..2 {
        let outcome = demo
            .storage
            .load(&demo.connection, &demo.loader(id))
            .and_then(|person| person.get_text("name").map(str::to_string));
        steps.push(step(&demo, format!("load {id}"), outcome));
    }

    let erased = demo
        .storage
        .erase(&demo.connection, &demo.eraser(id))
        .map(|()| "erased".to_string());
    steps.push(step(&demo, format!("erase {id}"), erased));

    let outcome = demo
        .storage
        .load(&demo.connection, &demo.loader(id))
        .and_then(|person| person.get_text("name").map(str::to_string));
    steps.push(step(&demo, format!("load {id}"), outcome));

    let report = ScenarioReport {
        records,
        id,
        steps,
        repository: demo.repository.snapshot(),
    };

    match format {
        "json" => println!("{}", serde_json::to_string_pretty(&report)?),
        _ => print_text_output(&report),
    }

    Ok(())
}

fn step<E: std::fmt::Display>(demo: &Demo, action: String, outcome: Result<String, E>) -> Step {
    let (ok, outcome) = match outcome {
        Ok(value) => (true, value),
        Err(e) => (false, e.to_string()),
    };
    Step {
        action,
        outcome,
        ok,
        faults: demo.storage.fault_counter(),
        hits: demo.storage.hit_counter(),
    }
}

fn print_text_output(report: &ScenarioReport) {
    println!("Tessera Cache Scenario");
    println!("======================");
    println!();
    println!("Records: {}", report.records);
    println!();
    for step in &report.steps {
        let mark = if step.ok { "✓" } else { "✗" };
        println!(
            "  {} {:<10} {:<40} faults={} hits={}",
            mark, step.action, step.outcome, step.faults, step.hits
        );
    }
    for storage in &report.repository.storages {
        println!();
        println!(
            "Storage '{}': {} cached of {} ({})",
            storage.name, storage.cached, storage.max_cache_size, storage.access_mode
        );
    }
}
