//! # Tessera Backend
//!
//! Backend capability traits and implementations for Tessera.
//!
//! This crate is the lowest layer of Tessera. A backend exposes sessions
//! with a fixed set of capabilities: open, close, commit, rollback,
//! prepare, execute and fetch. It reports outcomes as raw numeric codes;
//! an [`ErrorCodeInterpreter`] supplied by the backend turns those codes
//! into meaning.
//!
//! ## Design Principles
//!
//! - Backends know nothing about guards, caches or objects
//! - A session is driven by one thread at a time (`Send`, not `Sync`)
//! - Failures are reported, never retried, by the backend
//! - The data-access layer owns all recovery policy
//!
//! ## Available Backends
//!
//! - [`MemoryBackend`] - In-memory keyed tables with fault injection

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod backend;
mod error;
mod memory;

pub use backend::{
    Backend, BackendConnection, ConnectionParams, ErrorCodeInterpreter, PreparedId,
    StatementDescriptor, Status,
};
pub use error::{BackendError, BackendResult};
pub use memory::{codes, MemoryBackend, MemoryCodeTable};
