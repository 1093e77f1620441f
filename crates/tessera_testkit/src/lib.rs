//! # Tessera Testkit
//!
//! Test utilities for Tessera.
//!
//! This crate provides:
//! - Test fixtures over the in-memory backend
//! - Property-based test generators using proptest
//! - Cross-crate integration test helpers
//! - Stress testing utilities
//!
//! ## Usage
//!
//! ```rust,ignore
//! use tessera_testkit::prelude::*;
//!
//! #[test]
//! fn test_with_database() {
//!     with_test_db(|t| {
//!         let person = t.storage.load(&t.connection, &t.loader(6)).unwrap();
//!         // ... test operations
//!     });
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;
pub mod integration;
pub mod stress;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fixtures::*;
    pub use crate::generators::*;
    pub use crate::integration::*;
    pub use crate::stress::*;
}

pub use fixtures::*;
pub use generators::*;
pub use integration::*;
pub use stress::*;
