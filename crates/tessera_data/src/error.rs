//! Error types for typed value access.

use crate::types::DataType;
use thiserror::Error;

/// Result type for value access.
pub type DataResult<T> = Result<T, DataError>;

/// Errors raised when a value is read as something it is not.
///
/// These never involve the backend: they are local to field access and do
/// not trigger a rollback on their own.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DataError {
    /// The value holds a different type than the one requested.
    #[error("type mismatch: expected {expected}, found {found}")]
    TypeMismatch {
        /// The requested type.
        expected: DataType,
        /// The type actually stored.
        found: DataType,
    },

    /// The value is null and was read without checking.
    #[error("null value read as {expected}")]
    NullValue {
        /// The requested type.
        expected: DataType,
    },

    /// A numeric value does not fit the requested representation.
    #[error("value out of range for {target}: {value}")]
    OutOfRange {
        /// Name of the target representation.
        target: &'static str,
        /// The offending value, rendered.
        value: String,
    },
}

impl DataError {
    /// Creates a type mismatch error.
    pub fn type_mismatch(expected: DataType, found: DataType) -> Self {
        Self::TypeMismatch { expected, found }
    }

    /// Creates a null value error.
    pub fn null_value(expected: DataType) -> Self {
        Self::NullValue { expected }
    }

    /// Creates an out-of-range error.
    pub fn out_of_range(target: &'static str, value: impl ToString) -> Self {
        Self::OutOfRange {
            target,
            value: value.to_string(),
        }
    }
}
