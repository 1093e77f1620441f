//! Database and connection statistics.
//!
//! All counters are atomic and can be read while operations are in
//! progress. Values only ever increase.
//!
//! # Usage
//!
//! ```rust,ignore
//! let stats = db.stats();
//! println!("Executions: {}", stats.executions());
//! println!("Recoveries: {}", stats.recoveries());
//! ```

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

/// Database-wide statistics.
#[derive(Debug, Default)]
pub struct DatabaseStats {
    // Guard traffic
    /// Guards acquired on any connection.
    guards: AtomicU64,
    /// Statement executions that reached the backend.
    executions: AtomicU64,
    /// Rows fetched.
    fetches: AtomicU64,

    // Transaction boundaries
    /// Commits issued by guards.
    commits: AtomicU64,
    /// Rollbacks issued by guards.
    rollbacks: AtomicU64,

    // Failures
    /// Backend failures observed.
    errors: AtomicU64,
    /// Lost links detected.
    lost_connections: AtomicU64,
    /// Connections successfully reopened after a lost link.
    recoveries: AtomicU64,
    /// Connections left unavailable after a lost link.
    failed_recoveries: AtomicU64,
}

impl DatabaseStats {
    /// Creates a new stats instance.
    pub fn new() -> Self {
        Self::default()
    }

    // === Increment methods (internal use) ===

    pub(crate) fn record_guard(&self) {
        self.guards.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_execution(&self) {
        self.executions.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_fetch(&self) {
        self.fetches.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_commit(&self) {
        self.commits.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_rollback(&self) {
        self.rollbacks.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_error(&self) {
        self.errors.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_lost_connection(&self) {
        self.lost_connections.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_recovery(&self) {
        self.recoveries.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_failed_recovery(&self) {
        self.failed_recoveries.fetch_add(1, Ordering::Relaxed);
    }

    // === Getter methods (public API) ===

    /// Returns the number of guards acquired.
    pub fn guards(&self) -> u64 {
        self.guards.load(Ordering::Relaxed)
    }

    /// Returns the number of statement executions.
    pub fn executions(&self) -> u64 {
        self.executions.load(Ordering::Relaxed)
    }

    /// Returns the number of rows fetched.
    pub fn fetches(&self) -> u64 {
        self.fetches.load(Ordering::Relaxed)
    }

    /// Returns the number of commits.
    pub fn commits(&self) -> u64 {
        self.commits.load(Ordering::Relaxed)
    }

    /// Returns the number of rollbacks.
    pub fn rollbacks(&self) -> u64 {
        self.rollbacks.load(Ordering::Relaxed)
    }

    /// Returns the number of backend failures.
    pub fn errors(&self) -> u64 {
        self.errors.load(Ordering::Relaxed)
    }

    /// Returns the number of lost links detected.
    pub fn lost_connections(&self) -> u64 {
        self.lost_connections.load(Ordering::Relaxed)
    }

    /// Returns the number of successful recoveries.
    pub fn recoveries(&self) -> u64 {
        self.recoveries.load(Ordering::Relaxed)
    }

    /// Returns the number of recoveries that left a connection unavailable.
    pub fn failed_recoveries(&self) -> u64 {
        self.failed_recoveries.load(Ordering::Relaxed)
    }

    /// Returns a snapshot of all stats.
    pub fn snapshot(&self) -> DatabaseStatsSnapshot {
        DatabaseStatsSnapshot {
            guards: self.guards(),
            executions: self.executions(),
            fetches: self.fetches(),
            commits: self.commits(),
            rollbacks: self.rollbacks(),
            errors: self.errors(),
            lost_connections: self.lost_connections(),
            recoveries: self.recoveries(),
            failed_recoveries: self.failed_recoveries(),
        }
    }
}

/// A point-in-time snapshot of database statistics.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct DatabaseStatsSnapshot {
    /// Guards acquired.
    pub guards: u64,
    /// Statement executions.
    pub executions: u64,
    /// Rows fetched.
    pub fetches: u64,
    /// Commits.
    pub commits: u64,
    /// Rollbacks.
    pub rollbacks: u64,
    /// Backend failures.
    pub errors: u64,
    /// Lost links detected.
    pub lost_connections: u64,
    /// Successful recoveries.
    pub recoveries: u64,
    /// Failed recoveries.
    pub failed_recoveries: u64,
}

/// Per-connection statistics.
#[derive(Debug, Default)]
pub struct ConnectionStats {
    opens: AtomicU64,
    closes: AtomicU64,
    operations: AtomicU64,
    commits: AtomicU64,
    rollbacks: AtomicU64,
    errors: AtomicU64,
    recoveries: AtomicU64,
}

impl ConnectionStats {
    /// Creates a new stats instance.
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_open(&self) {
        self.opens.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_close(&self) {
        self.closes.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_operation(&self) {
        self.operations.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_commit(&self) {
        self.commits.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_rollback(&self) {
        self.rollbacks.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_error(&self) {
        self.errors.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_recovery(&self) {
        self.recoveries.fetch_add(1, Ordering::Relaxed);
    }

    /// Returns how many times the session was opened.
    pub fn opens(&self) -> u64 {
        self.opens.load(Ordering::Relaxed)
    }

    /// Returns how many times the session was closed.
    pub fn closes(&self) -> u64 {
        self.closes.load(Ordering::Relaxed)
    }

    /// Returns the number of executions and fetches.
    pub fn operations(&self) -> u64 {
        self.operations.load(Ordering::Relaxed)
    }

    /// Returns the number of commits.
    pub fn commits(&self) -> u64 {
        self.commits.load(Ordering::Relaxed)
    }

    /// Returns the number of rollbacks.
    pub fn rollbacks(&self) -> u64 {
        self.rollbacks.load(Ordering::Relaxed)
    }

    /// Returns the number of backend failures.
    pub fn errors(&self) -> u64 {
        self.errors.load(Ordering::Relaxed)
    }

    /// Returns the number of successful recoveries.
    pub fn recoveries(&self) -> u64 {
        self.recoveries.load(Ordering::Relaxed)
    }

    /// Returns a snapshot of all stats.
    pub fn snapshot(&self) -> ConnectionStatsSnapshot {
        ConnectionStatsSnapshot {
            opens: self.opens(),
            closes: self.closes(),
            operations: self.operations(),
            commits: self.commits(),
            rollbacks: self.rollbacks(),
            errors: self.errors(),
            recoveries: self.recoveries(),
        }
    }
}

/// A point-in-time snapshot of connection statistics.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct ConnectionStatsSnapshot {
    /// Opens.
    pub opens: u64,
    /// Closes.
    pub closes: u64,
    /// Executions and fetches.
    pub operations: u64,
    /// Commits.
    pub commits: u64,
    /// Rollbacks.
    pub rollbacks: u64,
    /// Backend failures.
    pub errors: u64,
    /// Successful recoveries.
    pub recoveries: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_stats_are_zero() {
        let stats = DatabaseStats::new();
        assert_eq!(stats.executions(), 0);
        assert_eq!(stats.commits(), 0);
        assert_eq!(stats.recoveries(), 0);
    }

    #[test]
    fn snapshot() {
        let stats = DatabaseStats::new();
        stats.record_execution();
        stats.record_execution();
        stats.record_commit();
        stats.record_lost_connection();
        stats.record_recovery();

        let snap = stats.snapshot();
        assert_eq!(snap.executions, 2);
        assert_eq!(snap.commits, 1);
        assert_eq!(snap.lost_connections, 1);
        assert_eq!(snap.recoveries, 1);
        assert_eq!(snap.failed_recoveries, 0);
    }

    #[test]
    fn connection_snapshot() {
        let stats = ConnectionStats::new();
        stats.record_open();
        stats.record_close();
        stats.record_open();
        stats.record_recovery();

        let snap = stats.snapshot();
        assert_eq!(snap.opens, 2);
        assert_eq!(snap.closes, 1);
        assert_eq!(snap.recoveries, 1);
    }

    #[test]
    fn concurrent_updates() {
        use std::sync::Arc;
        use std::thread;

        let stats = Arc::new(DatabaseStats::new());
        let mut handles = vec![];

        for _ in 0..10 {
            let s = Arc::clone(&stats);
            handles.push(thread::spawn(move || {
                for _ in 0..100 {
                    s.record_execution();
                    s.record_fetch();
                }
            }));
        }

        for h in handles {
            h.join().unwrap();
        }

        assert_eq!(stats.executions(), 1000);
        assert_eq!(stats.fetches(), 1000);
    }
}
