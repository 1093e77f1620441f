//! Connections: handles to one physical backend session.

use crate::database::Database;
use crate::diagnostics::ConnectionSnapshot;
use crate::error::{CoreError, CoreResult};
use crate::result_code::ResultCode;
use crate::statement::Statement;
use crate::stats::ConnectionStats;
use crate::types::{ConnectionId, ConnectionState, StatementId};
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use tessera_backend::{BackendConnection, BackendError, ErrorCodeInterpreter, PreparedId};
use tracing::{debug, warn};

/// The backend session plus what has been prepared on it.
///
/// Only reachable through the connection lock.
pub(crate) struct Session {
    pub(crate) backend: Box<dyn BackendConnection>,
    pub(crate) prepared: HashMap<StatementId, PreparedId>,
}

/// A named handle to one backend session, owned by a [`Database`].
///
/// All traffic goes through a [`crate::GuardConnection`], which holds the
/// connection lock for its lifetime. The state machine is:
///
/// ```text
/// Closed --open--> Open --lost link--> Broken --reopen--> Open
///                                        \--failed/declined--> Unavailable
/// ```
///
/// `Unavailable` is terminal until an explicit successful [`Connection::open`].
pub struct Connection {
    id: ConnectionId,
    name: String,
    database: Weak<Database>,
    session: Mutex<Session>,
    state: RwLock<ConnectionState>,
    auto_recovery: AtomicBool,
    stats: ConnectionStats,
}

impl Connection {
    pub(crate) fn new(
        id: ConnectionId,
        name: String,
        database: Weak<Database>,
        backend: Box<dyn BackendConnection>,
        auto_recovery: bool,
    ) -> Self {
        Self {
            id,
            name,
            database,
            session: Mutex::new(Session {
                backend,
                prepared: HashMap::new(),
            }),
            state: RwLock::new(ConnectionState::Closed),
            auto_recovery: AtomicBool::new(auto_recovery),
            stats: ConnectionStats::new(),
        }
    }

    /// Returns the connection ID.
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// Returns the connection name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the current state.
    pub fn state(&self) -> ConnectionState {
        *self.state.read()
    }

    /// Returns true if guards can be acquired on this connection.
    pub fn is_available(&self) -> bool {
        self.state() == ConnectionState::Open
    }

    /// Returns whether a lost link is followed by an automatic reopen.
    pub fn auto_recovery(&self) -> bool {
        self.auto_recovery.load(Ordering::Acquire)
    }

    /// Enables or disables automatic reopen after a lost link.
    pub fn set_auto_recovery(&self, value: bool) {
        self.auto_recovery.store(value, Ordering::Release);
    }

    /// Returns the connection statistics.
    pub fn stats(&self) -> &ConnectionStats {
        &self.stats
    }

    /// Returns the owning database, if it is still alive.
    pub fn database(&self) -> Option<Arc<Database>> {
        self.database.upgrade()
    }

    /// Opens (or reopens) the backend session.
    ///
    /// Blocks while a guard holds the connection. Must not be called from a
    /// thread that holds a guard on this connection.
    ///
    /// # Errors
    ///
    /// Returns a backend error if the backend refuses the session; the
    /// state is left unchanged.
    pub fn open(&self) -> CoreResult<()> {
        let mut session = self.session.lock();
        self.open_session(&mut session)
    }

    /// Closes the backend session. Best-effort: never fails.
    ///
    /// Blocks while a guard holds the connection. A connection that lost
    /// its link was already shut down by recovery and is only marked
    /// closed.
    pub fn close(&self) {
        let mut session = self.session.lock();
        if self.state() == ConnectionState::Open {
            self.shutdown(&mut session);
        }
        *self.state.write() = ConnectionState::Closed;
    }

    /// Asks the backend to simulate a lost link.
    ///
    /// The next operation through this connection fails with the backend's
    /// lost-connection code and triggers recovery.
    pub fn manual_break(&self) {
        self.session.lock().backend.manual_break();
        debug!(connection = %self.name, "manual break requested");
    }

    pub(crate) fn lock_session(&self) -> parking_lot::MutexGuard<'_, Session> {
        self.session.lock()
    }

    pub(crate) fn set_state(&self, state: ConnectionState) {
        *self.state.write() = state;
    }

    pub(crate) fn ensure_available(&self) -> CoreResult<()> {
        let state = self.state();
        if state == ConnectionState::Open {
            Ok(())
        } else {
            Err(CoreError::ConnectionUnavailable {
                name: self.name.clone(),
                state,
            })
        }
    }

    pub(crate) fn open_session(&self, session: &mut Session) -> CoreResult<()> {
        match session.backend.open() {
            Ok(()) => {
                session.prepared.clear();
                self.stats.record_open();
                self.set_state(ConnectionState::Open);
                debug!(connection = %self.name, "connection opened");
                Ok(())
            }
            Err(e) => {
                warn!(connection = %self.name, error = %e, "failed to open connection");
                Err(self.backend_error(e))
            }
        }
    }

    /// Closes the backend session without touching the state.
    pub(crate) fn shutdown(&self, session: &mut Session) {
        session.backend.close();
        session.prepared.clear();
        self.stats.record_close();
        debug!(connection = %self.name, "connection closed");
    }

    /// Returns the preparation of `statement` on this session, preparing it
    /// first if needed.
    pub(crate) fn prepare(
        &self,
        session: &mut Session,
        statement: &Statement,
    ) -> CoreResult<PreparedId> {
        if let Some(id) = session.prepared.get(&statement.id()) {
            return Ok(*id);
        }
        let id = session
            .backend
            .prepare(&statement.descriptor())
            .map_err(|e| self.backend_error(e))?;
        debug!(connection = %self.name, statement = statement.name(), %id, "statement prepared");
        session.prepared.insert(statement.id(), id);
        Ok(id)
    }

    pub(crate) fn interpreter(&self) -> Option<Arc<dyn ErrorCodeInterpreter>> {
        self.database().and_then(|db| db.error_interpreter())
    }

    /// Wraps a backend failure and counts it.
    pub(crate) fn backend_error(&self, error: BackendError) -> CoreError {
        self.stats.record_error();
        if let Some(db) = self.database() {
            db.stats().record_error();
        }
        CoreError::database(
            self.name.clone(),
            ResultCode::from_error(error, self.interpreter()),
        )
    }

    /// Wraps a non-successful status and counts it.
    pub(crate) fn status_error(&self, code: ResultCode) -> CoreError {
        self.stats.record_error();
        if let Some(db) = self.database() {
            db.stats().record_error();
        }
        CoreError::database(self.name.clone(), code)
    }

    /// Returns a serializable view of this connection.
    pub fn snapshot(&self) -> ConnectionSnapshot {
        ConnectionSnapshot {
            id: self.id.as_u32(),
            name: self.name.clone(),
            state: self.state(),
            auto_recovery: self.auto_recovery(),
            locked: self.session.is_locked(),
            stats: self.stats.snapshot(),
        }
    }
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("state", &self.state())
            .field("auto_recovery", &self.auto_recovery())
            .finish_non_exhaustive()
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        if *self.state.get_mut() != ConnectionState::Closed {
            self.session.get_mut().backend.close();
        }
    }
}
