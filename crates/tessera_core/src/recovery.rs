//! Lost-connection recovery.
//!
//! Recovery runs at most once per detected failure, on the thread that saw
//! it, while that thread's guard still holds the connection lock:
//!
//! 1. The connection is marked `Broken` and its session is closed.
//! 2. With auto-recovery enabled the session is reopened; on success the
//!    connection is `Open` again with every preparation forgotten.
//! 3. Otherwise, or if the reopen fails, the connection becomes
//!    `Unavailable` and the database's [`FailRecoveryHandler`] is called.
//!
//! The failure that triggered recovery is always returned to the caller.

use crate::connection::{Connection, Session};
use crate::types::ConnectionState;
use tracing::{error, info, warn};

/// Called once when a connection is lost for good.
///
/// The handler runs while the connection lock is held, so it must not call
/// [`Connection::open`] or [`Connection::close`] on the same connection.
/// Scheduling a reopen on another thread is fine.
pub trait FailRecoveryHandler: Send + Sync {
    /// Reacts to `connection` becoming unavailable.
    fn apply(&self, connection: &Connection);
}

impl<F> FailRecoveryHandler for F
where
    F: Fn(&Connection) + Send + Sync,
{
    fn apply(&self, connection: &Connection) {
        self(connection);
    }
}

/// Runs the recovery protocol on a connection whose link was lost.
pub(crate) fn recover(connection: &Connection, session: &mut Session) {
    let database = connection.database();
    warn!(connection = connection.name(), "lost connection detected");

    connection.set_state(ConnectionState::Broken);
    if let Some(db) = &database {
        db.stats().record_lost_connection();
    }
    connection.shutdown(session);

    if connection.auto_recovery() {
        match connection.open_session(session) {
            Ok(()) => {
                connection.stats().record_recovery();
                if let Some(db) = &database {
                    db.stats().record_recovery();
                }
                info!(connection = connection.name(), "connection recovered");
                return;
            }
            Err(e) => {
                warn!(connection = connection.name(), error = %e, "reopen failed");
            }
        }
    }

    connection.set_state(ConnectionState::Unavailable);
    error!(connection = connection.name(), "connection unavailable");
    if let Some(db) = &database {
        db.stats().record_failed_recovery();
        if let Some(handler) = db.recovery_handler() {
            handler.apply(connection);
        }
    }
}
