//! Error types for Tessera core.

use crate::result_code::ResultCode;
use crate::types::ConnectionState;
use tessera_data::DataError;
use thiserror::Error;

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Coarse classification of a [`CoreError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The caller broke a usage rule (unknown name, unavailable connection,
    /// bad binder index...). Never touches the backend state.
    Contract,
    /// The backend reported a failure, or a requested row does not exist.
    Backend,
    /// A value was read or bound with the wrong type.
    Data,
}

/// Errors that can occur in Tessera core operations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// No connection with this name.
    #[error("connection not found: {name}")]
    ConnectionNotFound {
        /// The requested name.
        name: String,
    },

    /// No statement with this name.
    #[error("statement not found: {name}")]
    StatementNotFound {
        /// The requested name.
        name: String,
    },

    /// No storage with this name.
    #[error("storage not found: {name}")]
    StorageNotFound {
        /// The requested name.
        name: String,
    },

    /// A registry already holds an entry with this name.
    #[error("duplicate {kind} name: {name}")]
    DuplicateName {
        /// Registry kind ("connection", "statement", "storage").
        kind: &'static str,
        /// The offending name.
        name: String,
    },

    /// The database already owns its maximum number of connections.
    #[error("too many connections: limit is {max}")]
    TooManyConnections {
        /// The configured limit.
        max: usize,
    },

    /// A binder index is past the end of the statement's binders.
    #[error("{direction} binder {index} out of range for statement {statement} ({count} binders)")]
    BinderOutOfRange {
        /// Statement name.
        statement: String,
        /// "input" or "output".
        direction: &'static str,
        /// The requested index.
        index: usize,
        /// Number of binders.
        count: usize,
    },

    /// The connection cannot be used right now.
    #[error("connection {name} is not available ({state})")]
    ConnectionUnavailable {
        /// Connection name.
        name: String,
        /// State at the time of the check.
        state: ConnectionState,
    },

    /// The statement is already bound on the calling thread.
    #[error("statement {name} is already bound on this thread")]
    StatementBusy {
        /// Statement name.
        name: String,
    },

    /// A primary key does not have the shape of its class.
    #[error("key mismatch: {message}")]
    KeyMismatch {
        /// What is wrong with the key.
        message: String,
    },

    /// A class has no field with this name.
    #[error("class {class} has no field {name}")]
    FieldNotFound {
        /// Class name.
        class: String,
        /// Requested field.
        name: String,
    },

    /// A result code was queried without an interpreter attached.
    #[error("no error code interpreter registered")]
    NoErrorInterpreter,

    /// Operation not permitted in current state.
    #[error("invalid operation: {message}")]
    InvalidOperation {
        /// Description of why operation is invalid.
        message: String,
    },

    /// The backend reported a failure.
    #[error("database error on connection {connection}: {code}")]
    Database {
        /// Connection the failure happened on.
        connection: String,
        /// Interpreted backend outcome.
        code: ResultCode,
    },

    /// A load found no row for its key.
    #[error("object not found in storage {storage}: {key}")]
    ObjectNotFound {
        /// Storage name.
        storage: String,
        /// Rendered key.
        key: String,
    },

    /// Typed value access failed.
    #[error("data error: {0}")]
    Data(#[from] DataError),
}

impl CoreError {
    /// Creates a duplicate name error.
    pub fn duplicate(kind: &'static str, name: impl Into<String>) -> Self {
        Self::DuplicateName {
            kind,
            name: name.into(),
        }
    }

    /// Creates a key mismatch error.
    pub fn key_mismatch(message: impl Into<String>) -> Self {
        Self::KeyMismatch {
            message: message.into(),
        }
    }

    /// Creates an invalid operation error.
    pub fn invalid_operation(message: impl Into<String>) -> Self {
        Self::InvalidOperation {
            message: message.into(),
        }
    }

    /// Creates a backend failure error.
    pub fn database(connection: impl Into<String>, code: ResultCode) -> Self {
        Self::Database {
            connection: connection.into(),
            code,
        }
    }

    /// Returns the coarse classification of this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Database { .. } | Self::ObjectNotFound { .. } => ErrorKind::Backend,
            Self::Data(_) => ErrorKind::Data,
            _ => ErrorKind::Contract,
        }
    }

    /// Returns the backend result code, for backend failures.
    #[must_use]
    pub fn result_code(&self) -> Option<&ResultCode> {
        match self {
            Self::Database { code, .. } => Some(code),
            _ => None,
        }
    }

    /// Returns true if this is a backend failure interpreted as a lost link.
    #[must_use]
    pub fn is_lost_connection(&self) -> bool {
        self.result_code()
            .is_some_and(|code| code.lost_connection().unwrap_or(false))
    }

    /// Returns true if this is a backend failure interpreted as a lock conflict.
    #[must_use]
    pub fn is_locked(&self) -> bool {
        self.result_code()
            .is_some_and(|code| code.locked().unwrap_or(false))
    }
}
