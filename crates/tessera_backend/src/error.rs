//! Error types for backend operations.

use thiserror::Error;

/// Result type for backend operations.
pub type BackendResult<T> = Result<T, BackendError>;

/// A failure reported by a backend.
///
/// The backend only reports its raw numeric code and a message. What the
/// code *means* (lost connection, lock contention, ...) is decided by an
/// [`crate::ErrorCodeInterpreter`], never by the caller sniffing messages.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("backend code {code}: {message}")]
pub struct BackendError {
    /// Backend-specific numeric code.
    pub code: i32,
    /// Human readable description.
    pub message: String,
}

impl BackendError {
    /// Creates a backend error.
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}
