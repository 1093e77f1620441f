//! Serializable point-in-time views of the runtime objects.
//!
//! Snapshots hold plain data only, so they can be logged, compared in tests
//! or rendered as JSON.

use crate::stats::{ConnectionStatsSnapshot, DatabaseStatsSnapshot};
use crate::types::{AccessMode, ActionOnError, ConnectionState};
use serde::Serialize;

/// View of a [`crate::Database`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DatabaseSnapshot {
    /// Database name.
    pub name: String,
    /// Backend name.
    pub backend: String,
    /// Whether the database is started.
    pub running: bool,
    /// Connections, in creation order.
    pub connections: Vec<ConnectionSnapshot>,
    /// Statements, in creation order.
    pub statements: Vec<StatementSnapshot>,
    /// Database-wide counters.
    pub stats: DatabaseStatsSnapshot,
}

/// View of a [`crate::Connection`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConnectionSnapshot {
    /// Connection ID.
    pub id: u32,
    /// Connection name.
    pub name: String,
    /// Lifecycle state.
    pub state: ConnectionState,
    /// Whether lost links are recovered automatically.
    pub auto_recovery: bool,
    /// Whether a guard holds the connection.
    pub locked: bool,
    /// Per-connection counters.
    pub stats: ConnectionStatsSnapshot,
}

/// View of a [`crate::Statement`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatementSnapshot {
    /// Statement ID.
    pub id: u32,
    /// Statement name.
    pub name: String,
    /// Translated expression.
    pub expression: String,
    /// Number of input binders.
    pub inputs: usize,
    /// Number of output binders.
    pub outputs: usize,
    /// Whether executions count as writes.
    pub requires_commit: bool,
    /// Error policy.
    pub action_on_error: ActionOnError,
    /// Whether a guard binds the statement.
    pub bound: bool,
}

/// View of a [`crate::Storage`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StorageSnapshot {
    /// Storage name.
    pub name: String,
    /// Class name.
    pub class: String,
    /// Reload policy.
    pub access_mode: AccessMode,
    /// Cache capacity.
    pub max_cache_size: usize,
    /// Number of cached objects.
    pub cached: usize,
    /// Loads that went to the backend.
    pub faults: u64,
    /// Loads served from the cache.
    pub hits: u64,
}

/// View of a [`crate::Repository`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RepositorySnapshot {
    /// Repository name.
    pub name: String,
    /// Storages, ordered by name.
    pub storages: Vec<StorageSnapshot>,
}
