//! Backend capability traits.

use crate::error::BackendResult;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use tessera_data::{DataType, Value};

/// A backend driver.
///
/// A backend is selected once, when a database is constructed, and acts as
/// the factory for its sessions. The set of capabilities a session offers is
/// fixed by [`BackendConnection`]; backends differ only in how they
/// implement it.
///
/// # Implementors
///
/// - [`super::MemoryBackend`] - In-memory tables, for tests and tooling
pub trait Backend: Send + Sync {
    /// Returns the backend name, used in logs and diagnostics.
    fn name(&self) -> &str;

    /// Allocates a new, not yet opened, session.
    ///
    /// # Errors
    ///
    /// Returns an error if the parameters are not acceptable to the backend.
    fn create_connection(
        &self,
        name: &str,
        params: &ConnectionParams,
    ) -> BackendResult<Box<dyn BackendConnection>>;

    /// Returns the table that gives meaning to this backend's codes.
    fn error_interpreter(&self) -> Arc<dyn ErrorCodeInterpreter>;
}

/// One physical backend session.
///
/// A session is only ever driven by the thread holding the connection lock,
/// so implementations need `Send` but not `Sync`.
pub trait BackendConnection: Send {
    /// Opens (or reopens) the session.
    ///
    /// A reopen discards every preparation and every uncommitted write.
    ///
    /// # Errors
    ///
    /// Returns an error carrying the backend's lost-connection code if the
    /// backend refuses the session.
    fn open(&mut self) -> BackendResult<()>;

    /// Closes the session. Best-effort: never fails.
    fn close(&mut self);

    /// Makes all writes since the last commit durable and visible.
    ///
    /// # Errors
    ///
    /// Returns an error if the commit is refused.
    fn commit(&mut self) -> BackendResult<()>;

    /// Discards all writes since the last commit.
    ///
    /// # Errors
    ///
    /// Returns an error if the session cannot roll back.
    fn rollback(&mut self) -> BackendResult<()>;

    /// Prepares a statement on this session.
    ///
    /// # Errors
    ///
    /// Returns an error if the expression is not understood or its binders
    /// do not fit it.
    fn prepare(&mut self, statement: &StatementDescriptor<'_>) -> BackendResult<PreparedId>;

    /// Executes a prepared statement with the given input values.
    ///
    /// Returns the raw status of the execution. A status may be a
    /// non-failure outcome such as "not found".
    ///
    /// # Errors
    ///
    /// Returns an error if the execution failed.
    fn execute(&mut self, prepared: PreparedId, inputs: &[Value]) -> BackendResult<Status>;

    /// Moves the cursor of an executed statement to the next row, writing
    /// the row into `outputs`. Returns `false` once the cursor is exhausted.
    ///
    /// # Errors
    ///
    /// Returns an error if the row cannot be read.
    fn fetch(&mut self, prepared: PreparedId, outputs: &mut [Value]) -> BackendResult<bool>;

    /// Simulates the loss of the physical link.
    ///
    /// After this call every operation fails with the backend's
    /// lost-connection code until the session is reopened. Backends that
    /// cannot simulate it ignore the request.
    fn manual_break(&mut self) {}
}

/// Translates backend numeric codes into the four outcomes the data-access
/// layer reasons about.
pub trait ErrorCodeInterpreter: Send + Sync {
    /// The operation succeeded.
    fn successful(&self, code: i32) -> bool;

    /// The operation found no matching data. Not a failure by itself.
    fn not_found(&self, code: i32) -> bool;

    /// The data was locked by another session.
    fn locked(&self, code: i32) -> bool;

    /// The link to the backend was lost.
    fn lost_connection(&self, code: i32) -> bool;
}

/// Identifies a preparation inside one session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PreparedId(pub u32);

impl fmt::Display for PreparedId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "prep:{}", self.0)
    }
}

/// Raw outcome of one backend call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Status {
    /// Backend-specific numeric code.
    pub code: i32,
    /// Optional backend comment.
    pub message: Option<String>,
}

impl Status {
    /// Creates a status with the given code.
    #[must_use]
    pub const fn new(code: i32) -> Self {
        Self {
            code,
            message: None,
        }
    }

    /// Attaches a comment.
    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

/// What a backend needs to know to prepare a statement.
#[derive(Debug, Clone, Copy)]
pub struct StatementDescriptor<'a> {
    /// Statement name.
    pub name: &'a str,
    /// Expression text, already translated.
    pub expression: &'a str,
    /// Types of the input binders, in position order.
    pub inputs: &'a [DataType],
    /// Types of the output binders, in position order.
    pub outputs: &'a [DataType],
}

/// Parameters used to allocate a session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConnectionParams {
    /// User name, if the backend authenticates.
    pub user: Option<String>,
    /// Password, if the backend authenticates.
    pub password: Option<String>,
    /// Backend-specific options.
    pub options: BTreeMap<String, String>,
}

impl ConnectionParams {
    /// Creates empty parameters.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the user and password.
    #[must_use]
    pub fn credentials(mut self, user: impl Into<String>, password: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self.password = Some(password.into());
        self
    }

    /// Adds a backend-specific option.
    #[must_use]
    pub fn option(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.options.insert(key.into(), value.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn params_builder() {
        let params = ConnectionParams::new()
            .credentials("scott", "tiger")
            .option("schema", "main");
        assert_eq!(params.user.as_deref(), Some("scott"));
        assert_eq!(params.password.as_deref(), Some("tiger"));
        assert_eq!(params.options.get("schema").map(String::as_str), Some("main"));
    }

    #[test]
    fn status_with_message() {
        let status = Status::new(100).with_message("no rows");
        assert_eq!(status.code, 100);
        assert_eq!(status.message.as_deref(), Some("no rows"));
    }
}
