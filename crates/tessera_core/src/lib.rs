//! # Tessera Core
//!
//! Backend-agnostic data-access layer.
//!
//! This crate provides:
//! - `Database`: a registry of named connections and statements
//! - Guards that serialize access to a connection and batch its commits
//! - Recovery of connections whose backend link was lost
//! - A typed schema (`PrimaryKey`, `Class`, `Object`)
//! - `Storage`: an LRU object cache driven by loaders, recorders and erasers
//!
//! ## Example
//!
//! ```rust,ignore
//! use tessera_core::{Class, Database, DatabaseConfig, KeyLoader, PrimaryKey, Repository,
//!                    StatementParams, StorageConfig};
//!
//! let db = Database::new("main", backend, DatabaseConfig::default());
//! db.start();
//! let conn = db.create_connection("c1", &ConnectionParams::new())?;
//! let read = db.create_statement("read", "select person", params)?;
//!
//! let repo = Repository::new("app");
//! let people = repo.create_storage("people", person, StorageConfig::default())?;
//! let ann = people.load(&conn, &KeyLoader::new(read, PrimaryKey::new().with("id", 6)))?;
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod cache;
mod config;
mod connection;
mod database;
mod diagnostics;
mod error;
mod guard;
mod recovery;
mod result_code;
mod schema;
mod statement;
mod stats;
mod types;

pub use cache::{Eraser, KeyEraser, KeyLoader, Loader, ObjectRecorder, Recorder, Repository, Storage};
pub use config::{DatabaseConfig, StorageConfig};
pub use connection::Connection;
pub use database::Database;
pub use diagnostics::{
    ConnectionSnapshot, DatabaseSnapshot, RepositorySnapshot, StatementSnapshot, StorageSnapshot,
};
pub use error::{CoreError, CoreResult, ErrorKind};
pub use guard::{GuardConnection, GuardStatement};
pub use recovery::FailRecoveryHandler;
pub use result_code::ResultCode;
pub use schema::{Class, ClassBuilder, FieldDef, Object, PrimaryKey};
pub use statement::{Binder, Statement, StatementParams, StatementTranslator};
pub use stats::{ConnectionStats, ConnectionStatsSnapshot, DatabaseStats, DatabaseStatsSnapshot};
pub use types::{AccessMode, ActionOnError, ConnectionId, ConnectionState, StatementId};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
