//! # Tessera Data
//!
//! Typed field values for Tessera.
//!
//! Every binder slot, primary-key field and object field in Tessera holds a
//! [`Value`] from a closed set of variants. Reading a value through one of
//! the checked accessors either yields the requested Rust type or a
//! [`DataError`]; there is no runtime type identification beyond the
//! variant tag.
//!
//! ## Usage
//!
//! ```
//! use tessera_data::{DataType, Value};
//!
//! let value = Value::from("the name 6");
//! assert_eq!(value.data_type(), Some(DataType::Text));
//! assert_eq!(value.as_text().unwrap(), "the name 6");
//! assert!(value.as_integer().is_err());
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod error;
mod types;
mod value;

pub use error::{DataError, DataResult};
pub use types::{DataType, Timestamp};
pub use value::Value;
