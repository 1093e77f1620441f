//! Scoped exclusive access to a connection.

use crate::cache::SharedCache;
use crate::connection::{Connection, Session};
use crate::database::Database;
use crate::error::{CoreError, CoreResult, ErrorKind};
use crate::recovery;
use crate::schema::PrimaryKey;
use crate::types::ActionOnError;
use parking_lot::MutexGuard;
use std::cell::{Cell, RefCell};
use std::sync::Arc;
use std::thread;
use tracing::{debug, error, trace, warn};

/// Exclusive lock on one [`Connection`] for the lifetime of the guard.
///
/// The guard counts successful writes made through it. With a batching
/// threshold of 0 every write is committed at once; with `N > 0` a commit
/// is issued each time `N` writes are pending. Whatever is still pending is
/// committed when the guard is dropped, or rolled back if it is dropped
/// during a panic.
///
/// Cache entries written while writes are pending belong to the current
/// commit window: a commit keeps them, any rollback evicts them.
///
/// Commit failures at drop time can only be logged; call
/// [`finish`](Self::finish) to observe them.
pub struct GuardConnection<'c> {
    connection: &'c Connection,
    database: Option<Arc<Database>>,
    pub(super) session: RefCell<MutexGuard<'c, Session>>,
    linked: Cell<usize>,
    pending: Cell<usize>,
    max_commit_pending: Cell<usize>,
    uncommitted: RefCell<Vec<(SharedCache, PrimaryKey)>>,
}

impl<'c> GuardConnection<'c> {
    /// Locks `connection`, blocking while another guard holds it.
    ///
    /// # Errors
    ///
    /// Returns `ConnectionUnavailable` if the connection is not open,
    /// either before or after the lock is acquired. No recovery is
    /// attempted here.
    pub fn new(connection: &'c Connection) -> CoreResult<Self> {
        connection.ensure_available()?;
        let session = connection.lock_session();
        connection.ensure_available()?;

        let database = connection.database();
        let max_commit_pending = database
            .as_ref()
            .map_or(0, |db| db.config().max_commit_pending);
        if let Some(db) = &database {
            db.stats().record_guard();
        }
        trace!(connection = connection.name(), "guard acquired");

        Ok(Self {
            connection,
            database,
            session: RefCell::new(session),
            linked: Cell::new(0),
            pending: Cell::new(0),
            max_commit_pending: Cell::new(max_commit_pending),
            uncommitted: RefCell::new(Vec::new()),
        })
    }

    /// Returns the guarded connection.
    pub fn connection(&self) -> &'c Connection {
        self.connection
    }

    /// Returns the number of writes not yet committed.
    pub fn pending(&self) -> usize {
        self.pending.get()
    }

    /// Returns the number of live statement bindings on this guard.
    pub fn linked_statements(&self) -> usize {
        self.linked.get()
    }

    /// Returns the commit batching threshold.
    pub fn max_commit_pending(&self) -> usize {
        self.max_commit_pending.get()
    }

    /// Sets the commit batching threshold.
    pub fn set_max_commit_pending(&self, value: usize) {
        self.max_commit_pending.set(value);
    }

    /// Restores commit-after-every-write.
    pub fn clear_max_commit_pending(&self) {
        self.max_commit_pending.set(0);
    }

    /// Returns true while the guarded connection is open.
    pub fn is_available(&self) -> bool {
        self.connection.is_available()
    }

    /// Commits every pending write.
    ///
    /// # Errors
    ///
    /// Returns a backend error if the commit fails; pending work is then
    /// rolled back.
    pub fn commit(&self) -> CoreResult<()> {
        let mut session = self.session.borrow_mut();
        self.commit_session(&mut session)
    }

    /// Discards every pending write.
    ///
    /// # Errors
    ///
    /// Returns a backend error if the rollback fails.
    pub fn rollback(&self) -> CoreResult<()> {
        let mut session = self.session.borrow_mut();
        self.discard_pending();
        match session.backend.rollback() {
            Ok(()) => {
                self.record_rollback();
                debug!(connection = self.connection.name(), "rolled back");
                Ok(())
            }
            Err(e) => {
                let err = self.connection.backend_error(e);
                Err(self.on_failure(&mut session, err, ActionOnError::Ignore))
            }
        }
    }

    /// Commits pending writes, if any, and releases the connection.
    ///
    /// # Errors
    ///
    /// Returns a backend error if the final commit fails.
    pub fn finish(self) -> CoreResult<()> {
        if self.pending.get() > 0 {
            self.commit()
        } else {
            Ok(())
        }
    }

    /// Asks the backend to simulate a lost link on the guarded session.
    pub fn manual_break(&self) {
        self.session.borrow_mut().backend.manual_break();
        debug!(connection = self.connection.name(), "manual break requested");
    }

    pub(super) fn link(&self) {
        self.linked.set(self.linked.get() + 1);
    }

    pub(super) fn unlink(&self) {
        self.linked.set(self.linked.get().saturating_sub(1));
    }

    pub(super) fn database(&self) -> Option<&Database> {
        self.database.as_deref()
    }

    /// Ties a cache entry to the current commit window.
    ///
    /// Does nothing when no write is pending.
    pub(crate) fn track_uncommitted(&self, cache: &SharedCache, key: &PrimaryKey) {
        if self.pending.get() == 0 {
            return;
        }
        let mut tracked = self.uncommitted.borrow_mut();
        if !tracked
            .iter()
            .any(|(c, k)| Arc::ptr_eq(c, cache) && k == key)
        {
            tracked.push((Arc::clone(cache), key.clone()));
        }
    }

    /// Drops the pending count and evicts the cache entries written since
    /// the last commit. Returns the number of writes discarded.
    fn discard_pending(&self) -> usize {
        let discarded = self.pending.replace(0);
        let tracked = std::mem::take(&mut *self.uncommitted.borrow_mut());
        for (cache, key) in &tracked {
            cache.lock().remove(key);
        }
        if !tracked.is_empty() {
            debug!(
                connection = self.connection.name(),
                evicted = tracked.len(),
                "evicted uncommitted cache entries"
            );
        }
        discarded
    }

    /// Counts one successful write and commits if the batch is full.
    pub(super) fn record_write(&self, session: &mut Session) -> CoreResult<()> {
        let pending = self.pending.get() + 1;
        self.pending.set(pending);
        let max = self.max_commit_pending.get();
        if max == 0 || pending >= max {
            self.commit_session(session)?;
        }
        Ok(())
    }

    fn commit_session(&self, session: &mut Session) -> CoreResult<()> {
        match session.backend.commit() {
            Ok(()) => {
                let committed = self.pending.replace(0);
                self.uncommitted.borrow_mut().clear();
                self.connection.stats().record_commit();
                if let Some(db) = &self.database {
                    db.stats().record_commit();
                }
                debug!(connection = self.connection.name(), committed, "committed");
                Ok(())
            }
            Err(e) => {
                let err = self.connection.backend_error(e);
                Err(self.on_failure(session, err, ActionOnError::Rollback))
            }
        }
    }

    fn record_rollback(&self) {
        self.connection.stats().record_rollback();
        if let Some(db) = &self.database {
            db.stats().record_rollback();
        }
    }

    /// Applies the failure policy to `err` and hands it back.
    ///
    /// A lost link runs the recovery protocol; any other backend failure
    /// rolls back pending work under [`ActionOnError::Rollback`].
    pub(super) fn on_failure(
        &self,
        session: &mut Session,
        err: CoreError,
        action: ActionOnError,
    ) -> CoreError {
        if err.kind() != ErrorKind::Backend {
            return err;
        }
        if err.is_lost_connection() {
            self.discard_pending();
            recovery::recover(self.connection, session);
            return err;
        }
        if action == ActionOnError::Rollback {
            let discarded = self.discard_pending();
            match session.backend.rollback() {
                Ok(()) => {
                    self.record_rollback();
                    warn!(connection = self.connection.name(), discarded, error = %err, "rolled back after failure");
                }
                Err(e) => {
                    warn!(connection = self.connection.name(), error = %e, "rollback after failure failed");
                }
            }
        }
        err
    }
}

impl Drop for GuardConnection<'_> {
    fn drop(&mut self) {
        if self.pending.get() == 0 || !self.connection.is_available() {
            self.discard_pending();
            trace!(connection = self.connection.name(), "guard released");
            return;
        }
        let mut session = self.session.borrow_mut();
        if thread::panicking() {
            self.discard_pending();
            match session.backend.rollback() {
                Ok(()) => self.record_rollback(),
                Err(e) => {
                    error!(connection = self.connection.name(), error = %e, "rollback on unwind failed");
                }
            }
        } else if let Err(e) = self.commit_session(&mut session) {
            error!(connection = self.connection.name(), error = %e, "commit on release failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DatabaseConfig;
    use crate::guard::GuardStatement;
    use crate::statement::StatementParams;
    use crate::types::ConnectionState;
    use tessera_backend::{ConnectionParams, MemoryBackend};
    use tessera_data::{DataType, Value};

    fn setup(config: DatabaseConfig) -> (MemoryBackend, Arc<Database>, Arc<Connection>) {
        let backend = MemoryBackend::new();
        backend.create_table("person", 1);
        let db = Database::new("test", backend.clone(), config);
        db.start();
        let conn = db.create_connection("c1", &ConnectionParams::new()).unwrap();
        db.create_statement(
            "write",
            "upsert person",
            StatementParams::new()
                .input("id", DataType::Integer)
                .input("name", DataType::Text),
        )
        .unwrap();
        (backend, db, conn)
    }

    fn write(guard: &GuardConnection<'_>, db: &Database, id: i64) {
        let stmt = db.find_statement("write").unwrap();
        let mut bound = GuardStatement::new(guard, &stmt).unwrap();
        bound.set_input(0, id).unwrap();
        bound.set_input(1, format!("name {id}")).unwrap();
        bound.execute().unwrap();
    }

    #[test]
    fn unavailable_connection_is_refused() {
        let (_backend, db, _conn) = setup(DatabaseConfig::default());
        let closed = db.create_connection("c2", &ConnectionParams::new()).unwrap();
        closed.close();
        let err = GuardConnection::new(&closed).err().unwrap();
        assert!(matches!(
            err,
            CoreError::ConnectionUnavailable {
                state: ConnectionState::Closed,
                ..
            }
        ));
    }

    #[test]
    fn zero_threshold_commits_every_write() {
        let (backend, db, conn) = setup(DatabaseConfig::default());
        let guard = GuardConnection::new(&conn).unwrap();
        write(&guard, &db, 1);
        write(&guard, &db, 2);
        assert_eq!(backend.commit_count(), 2);
        assert_eq!(guard.pending(), 0);
        assert_eq!(backend.row_count("person"), 2);
    }

    #[test]
    fn batch_commits_at_threshold() {
        let (backend, db, conn) = setup(DatabaseConfig::default());
        let guard = GuardConnection::new(&conn).unwrap();
        guard.set_max_commit_pending(3);

        write(&guard, &db, 1);
        write(&guard, &db, 2);
        assert_eq!(backend.commit_count(), 0);
        assert_eq!(guard.pending(), 2);

        write(&guard, &db, 3);
        assert_eq!(backend.commit_count(), 1);
        assert_eq!(guard.pending(), 0);
    }

    #[test]
    fn drop_commits_remaining_work() {
        let (backend, db, conn) = setup(DatabaseConfig::new().max_commit_pending(10));
        {
            let guard = GuardConnection::new(&conn).unwrap();
            assert_eq!(guard.max_commit_pending(), 10);
            write(&guard, &db, 1);
            assert_eq!(backend.row_count("person"), 0);
        }
        assert_eq!(backend.commit_count(), 1);
        assert_eq!(
            backend.row("person", &[Value::Integer(1)]),
            Some(vec![Value::from("name 1")])
        );
    }

    #[test]
    fn explicit_rollback_discards_pending() {
        let (backend, db, conn) = setup(DatabaseConfig::new().max_commit_pending(10));
        let guard = GuardConnection::new(&conn).unwrap();
        write(&guard, &db, 1);
        guard.rollback().unwrap();
        assert_eq!(guard.pending(), 0);
        guard.finish().unwrap();
        assert_eq!(backend.commit_count(), 0);
        assert_eq!(backend.row_count("person"), 0);
    }

    #[test]
    fn clear_threshold() {
        let (_backend, _db, conn) = setup(DatabaseConfig::default());
        let guard = GuardConnection::new(&conn).unwrap();
        guard.set_max_commit_pending(5);
        guard.clear_max_commit_pending();
        assert_eq!(guard.max_commit_pending(), 0);
    }

    #[test]
    fn second_guard_blocks_until_release() {
        use std::sync::mpsc;
        use std::time::Duration;

        let (_backend, _db, conn) = setup(DatabaseConfig::default());
        let guard = GuardConnection::new(&conn).unwrap();

        let (tx, rx) = mpsc::channel();
        let other = Arc::clone(&conn);
        let handle = thread::spawn(move || {
            let guard = GuardConnection::new(&other).unwrap();
            tx.send(()).unwrap();
            drop(guard);
        });

        assert!(rx.recv_timeout(Duration::from_millis(100)).is_err());
        drop(guard);
        rx.recv_timeout(Duration::from_secs(5)).unwrap();
        handle.join().unwrap();
    }
}
