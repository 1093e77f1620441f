//! Database: registry of connections and statements.

use crate::config::DatabaseConfig;
use crate::connection::Connection;
use crate::diagnostics::DatabaseSnapshot;
use crate::error::{CoreError, CoreResult};
use crate::recovery::FailRecoveryHandler;
use crate::result_code::ResultCode;
use crate::statement::{Statement, StatementParams, StatementTranslator};
use crate::stats::DatabaseStats;
use crate::types::{ConnectionId, ConnectionState, StatementId};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use tessera_backend::{Backend, ConnectionParams, ErrorCodeInterpreter};
use tracing::{debug, info, warn};

/// Name-indexed list of shared entries.
///
/// Entries are never removed; their position is their ID.
struct Registry<T> {
    entries: Vec<Arc<T>>,
    index: HashMap<String, usize>,
}

impl<T> Registry<T> {
    fn new() -> Self {
        Self {
            entries: Vec::new(),
            index: HashMap::new(),
        }
    }

    fn get(&self, name: &str) -> Option<Arc<T>> {
        self.index.get(name).map(|&i| Arc::clone(&self.entries[i]))
    }

    fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    fn len(&self) -> usize {
        self.entries.len()
    }

    fn next_id(&self) -> u32 {
        u32::try_from(self.entries.len()).unwrap_or(u32::MAX)
    }

    fn insert(&mut self, name: String, entry: Arc<T>) {
        self.index.insert(name, self.entries.len());
        self.entries.push(entry);
    }

    fn all(&self) -> Vec<Arc<T>> {
        self.entries.clone()
    }
}

/// A logical database.
///
/// `Database` owns a bounded set of [`Connection`]s and a set of
/// [`Statement`]s, both addressed by unique name, plus the collaborators
/// that give meaning to backend outcomes:
/// - an [`ErrorCodeInterpreter`] (the backend's own table by default)
/// - an optional [`StatementTranslator`], applied at statement creation
/// - an optional [`FailRecoveryHandler`], called when a connection is lost
///   for good
///
/// # Example
///
/// ```rust,ignore
/// use tessera_core::{Database, DatabaseConfig, StatementParams};
/// use tessera_backend::{ConnectionParams, MemoryBackend};
///
/// let backend = MemoryBackend::new();
/// backend.create_table("person", 1);
///
/// let db = Database::new("main", backend, DatabaseConfig::default());
/// db.start();
/// let conn = db.create_connection("c1", &ConnectionParams::new())?;
/// let read = db.create_statement(
///     "read",
///     "select person",
///     StatementParams::new()
///         .input("id", DataType::Integer)
///         .output("name", DataType::Text),
/// )?;
/// ```
pub struct Database {
    name: String,
    config: DatabaseConfig,
    backend: Box<dyn Backend>,
    self_ref: Weak<Database>,
    connections: RwLock<Registry<Connection>>,
    statements: RwLock<Registry<Statement>>,
    interpreter: RwLock<Option<Arc<dyn ErrorCodeInterpreter>>>,
    translator: RwLock<Option<Arc<dyn StatementTranslator>>>,
    recovery_handler: RwLock<Option<Arc<dyn FailRecoveryHandler>>>,
    running: AtomicBool,
    stats: DatabaseStats,
}

impl Database {
    /// Creates a stopped database over `backend`.
    ///
    /// The backend's own error code table is installed as interpreter.
    pub fn new(
        name: impl Into<String>,
        backend: impl Backend + 'static,
        config: DatabaseConfig,
    ) -> Arc<Self> {
        let name = name.into();
        let interpreter = backend.error_interpreter();
        debug!(database = %name, backend = backend.name(), "database created");
        Arc::new_cyclic(|self_ref| Self {
            name,
            config,
            backend: Box::new(backend),
            self_ref: self_ref.clone(),
            connections: RwLock::new(Registry::new()),
            statements: RwLock::new(Registry::new()),
            interpreter: RwLock::new(Some(interpreter)),
            translator: RwLock::new(None),
            recovery_handler: RwLock::new(None),
            running: AtomicBool::new(false),
            stats: DatabaseStats::new(),
        })
    }

    /// Returns the database name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the configuration.
    pub fn config(&self) -> &DatabaseConfig {
        &self.config
    }

    /// Returns the backend name.
    pub fn backend_name(&self) -> &str {
        self.backend.name()
    }

    /// Returns the database statistics.
    pub fn stats(&self) -> &DatabaseStats {
        &self.stats
    }

    /// Returns true between [`start`](Self::start) and [`stop`](Self::stop).
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Starts the database and opens every closed connection.
    ///
    /// A connection that fails to open is logged and left closed.
    pub fn start(&self) {
        self.running.store(true, Ordering::Release);
        for connection in self.connections() {
            if connection.state() == ConnectionState::Closed {
                if let Err(e) = connection.open() {
                    warn!(database = %self.name, connection = connection.name(), error = %e, "connection not opened at start");
                }
            }
        }
        info!(database = %self.name, "database started");
    }

    /// Stops the database and closes every connection.
    ///
    /// Blocks until guards held on other threads are released.
    pub fn stop(&self) {
        if !self.running.swap(false, Ordering::AcqRel) {
            return;
        }
        for connection in self.connections() {
            connection.close();
        }
        info!(database = %self.name, "database stopped");
    }

    /// Creates and registers a connection.
    ///
    /// If the database is running the connection is opened right away; a
    /// failure to open is logged and the connection stays closed.
    ///
    /// # Errors
    ///
    /// - `DuplicateName` if a connection with this name exists
    /// - `TooManyConnections` if the configured limit is reached
    /// - a backend error if the backend refuses to allocate the session
    pub fn create_connection(
        &self,
        name: &str,
        params: &ConnectionParams,
    ) -> CoreResult<Arc<Connection>> {
        let mut connections = self.connections.write();
        if connections.contains(name) {
            return Err(CoreError::duplicate("connection", name));
        }
        if connections.len() >= self.config.max_connections {
            return Err(CoreError::TooManyConnections {
                max: self.config.max_connections,
            });
        }

        let session = self.backend.create_connection(name, params).map_err(|e| {
            CoreError::database(name, ResultCode::from_error(e, self.error_interpreter()))
        })?;
        let connection = Arc::new(Connection::new(
            ConnectionId::new(connections.next_id()),
            name.to_string(),
            self.self_ref.clone(),
            session,
            self.config.auto_recovery,
        ));

        if self.is_running() {
            if let Err(e) = connection.open() {
                warn!(database = %self.name, connection = name, error = %e, "connection created closed");
            }
        }

        connections.insert(name.to_string(), Arc::clone(&connection));
        debug!(database = %self.name, connection = name, id = %connection.id(), "connection registered");
        Ok(connection)
    }

    /// Creates and registers a statement.
    ///
    /// The expression is passed through the translator, if one is set.
    ///
    /// # Errors
    ///
    /// Returns `DuplicateName` if a statement with this name exists.
    pub fn create_statement(
        &self,
        name: &str,
        expression: &str,
        params: StatementParams,
    ) -> CoreResult<Arc<Statement>> {
        let mut statements = self.statements.write();
        if statements.contains(name) {
            return Err(CoreError::duplicate("statement", name));
        }

        let expression = match self.translator.read().as_ref() {
            Some(translator) => translator.apply(expression),
            None => expression.to_string(),
        };
        let statement = Arc::new(Statement::new(
            StatementId::new(statements.next_id()),
            name.to_string(),
            expression,
            params,
        ));
        statements.insert(name.to_string(), Arc::clone(&statement));
        debug!(database = %self.name, statement = name, expression = statement.expression(), "statement registered");
        Ok(statement)
    }

    /// Looks up a connection by name.
    ///
    /// # Errors
    ///
    /// Returns `ConnectionNotFound` if no connection has this name.
    pub fn find_connection(&self, name: &str) -> CoreResult<Arc<Connection>> {
        self.connections
            .read()
            .get(name)
            .ok_or_else(|| CoreError::ConnectionNotFound {
                name: name.to_string(),
            })
    }

    /// Looks up a statement by name.
    ///
    /// # Errors
    ///
    /// Returns `StatementNotFound` if no statement has this name.
    pub fn find_statement(&self, name: &str) -> CoreResult<Arc<Statement>> {
        self.statements
            .read()
            .get(name)
            .ok_or_else(|| CoreError::StatementNotFound {
                name: name.to_string(),
            })
    }

    /// Returns every connection, in creation order.
    pub fn connections(&self) -> Vec<Arc<Connection>> {
        self.connections.read().all()
    }

    /// Returns every statement, in creation order.
    pub fn statements(&self) -> Vec<Arc<Statement>> {
        self.statements.read().all()
    }

    /// Returns the current error code interpreter.
    pub fn error_interpreter(&self) -> Option<Arc<dyn ErrorCodeInterpreter>> {
        self.interpreter.read().clone()
    }

    /// Replaces the error code interpreter.
    pub fn set_error_interpreter(&self, interpreter: Arc<dyn ErrorCodeInterpreter>) {
        *self.interpreter.write() = Some(interpreter);
    }

    /// Removes the error code interpreter.
    ///
    /// Result codes produced afterwards cannot be queried.
    pub fn clear_error_interpreter(&self) {
        *self.interpreter.write() = None;
    }

    /// Sets the translator applied to statements created afterwards.
    pub fn set_translator(&self, translator: impl StatementTranslator + 'static) {
        *self.translator.write() = Some(Arc::new(translator));
    }

    /// Sets the handler called when a connection becomes unavailable.
    pub fn set_recovery_handler(&self, handler: impl FailRecoveryHandler + 'static) {
        *self.recovery_handler.write() = Some(Arc::new(handler));
    }

    pub(crate) fn recovery_handler(&self) -> Option<Arc<dyn FailRecoveryHandler>> {
        self.recovery_handler.read().clone()
    }

    /// Returns a serializable view of the database.
    pub fn snapshot(&self) -> DatabaseSnapshot {
        DatabaseSnapshot {
            name: self.name.clone(),
            backend: self.backend.name().to_string(),
            running: self.is_running(),
            connections: self.connections().iter().map(|c| c.snapshot()).collect(),
            statements: self.statements().iter().map(|s| s.snapshot()).collect(),
            stats: self.stats.snapshot(),
        }
    }
}

impl fmt::Debug for Database {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Database")
            .field("name", &self.name)
            .field("backend", &self.backend.name())
            .field("running", &self.is_running())
            .field("connections", &self.connections.read().len())
            .field("statements", &self.statements.read().len())
            .finish_non_exhaustive()
    }
}

impl Drop for Database {
    fn drop(&mut self) {
        self.stop();
    }
}
