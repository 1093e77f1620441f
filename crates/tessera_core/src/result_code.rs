//! Backend result codes and their interpretation.

use crate::error::{CoreError, CoreResult};
use std::fmt;
use std::sync::Arc;
use tessera_backend::{BackendError, ErrorCodeInterpreter, Status};

/// Outcome of one backend call.
///
/// A `ResultCode` pairs the backend's raw numeric code with the interpreter
/// of the database that produced it. The semantic queries delegate to that
/// interpreter and fail if none was registered.
#[derive(Clone)]
pub struct ResultCode {
    code: i32,
    comment: Option<String>,
    interpreter: Option<Arc<dyn ErrorCodeInterpreter>>,
}

impl ResultCode {
    /// Creates a result code.
    pub fn new(
        code: i32,
        comment: Option<String>,
        interpreter: Option<Arc<dyn ErrorCodeInterpreter>>,
    ) -> Self {
        Self {
            code,
            comment,
            interpreter,
        }
    }

    pub(crate) fn from_status(
        status: Status,
        interpreter: Option<Arc<dyn ErrorCodeInterpreter>>,
    ) -> Self {
        Self::new(status.code, status.message, interpreter)
    }

    pub(crate) fn from_error(
        error: BackendError,
        interpreter: Option<Arc<dyn ErrorCodeInterpreter>>,
    ) -> Self {
        Self::new(error.code, Some(error.message), interpreter)
    }

    /// Returns the raw backend code.
    #[must_use]
    pub fn code(&self) -> i32 {
        self.code
    }

    /// Returns the backend comment, if any.
    #[must_use]
    pub fn comment(&self) -> Option<&str> {
        self.comment.as_deref()
    }

    /// Returns true if the code means success.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::NoErrorInterpreter`] if no interpreter is attached.
    pub fn successful(&self) -> CoreResult<bool> {
        Ok(self.interpreter()?.successful(self.code))
    }

    /// Returns true if the code means "no data found".
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::NoErrorInterpreter`] if no interpreter is attached.
    pub fn not_found(&self) -> CoreResult<bool> {
        Ok(self.interpreter()?.not_found(self.code))
    }

    /// Returns true if the code means the data was locked.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::NoErrorInterpreter`] if no interpreter is attached.
    pub fn locked(&self) -> CoreResult<bool> {
        Ok(self.interpreter()?.locked(self.code))
    }

    /// Returns true if the code means the link to the backend was lost.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::NoErrorInterpreter`] if no interpreter is attached.
    pub fn lost_connection(&self) -> CoreResult<bool> {
        Ok(self.interpreter()?.lost_connection(self.code))
    }

    fn interpreter(&self) -> CoreResult<&dyn ErrorCodeInterpreter> {
        self.interpreter
            .as_deref()
            .ok_or(CoreError::NoErrorInterpreter)
    }
}

impl fmt::Debug for ResultCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResultCode")
            .field("code", &self.code)
            .field("comment", &self.comment)
            .field("interpreted", &self.interpreter.is_some())
            .finish()
    }
}

impl fmt::Display for ResultCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.comment {
            Some(comment) => write!(f, "code {} ({comment})", self.code),
            None => write!(f, "code {}", self.code),
        }
    }
}
