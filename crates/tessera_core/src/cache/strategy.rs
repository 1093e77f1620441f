//! Strategies binding objects to statements.
//!
//! A [`Storage`](super::Storage) does not know how its class maps onto
//! statement binders. Loaders, recorders and erasers supply that mapping;
//! the provided implementations bind key fields first, then class fields,
//! by position.

use crate::error::CoreResult;
use crate::guard::GuardStatement;
use crate::schema::{Object, PrimaryKey};
use crate::statement::Statement;
use std::sync::Arc;

/// Reads one object by key.
pub trait Loader {
    /// Statement that reads the row.
    fn statement(&self) -> &Statement;

    /// Key of the object to load.
    fn key(&self) -> &PrimaryKey;

    /// Binds the statement inputs before execution.
    fn initialize(&self, statement: &mut GuardStatement<'_, '_>) -> CoreResult<()> {
        bind_key(statement, self.key())
    }

    /// Copies the fetched row into `object`.
    fn apply(&self, statement: &GuardStatement<'_, '_>, object: &mut Object) -> CoreResult<()> {
        for (index, value) in statement.outputs().iter().enumerate() {
            object.set_at(index, value.clone())?;
        }
        Ok(())
    }

    /// Decides whether a cached object must be read again.
    ///
    /// Only consulted by storages in read-write mode. The default trusts
    /// the cache.
    fn has_to_refresh(&self, _statement: &Statement, _object: &Object) -> CoreResult<bool> {
        Ok(false)
    }
}

/// Writes one object.
pub trait Recorder {
    /// Statement that writes the row.
    fn statement(&self) -> &Statement;

    /// Object to write.
    fn object(&self) -> &Object;

    /// Binds the statement inputs before execution.
    fn apply(&self, statement: &mut GuardStatement<'_, '_>) -> CoreResult<()> {
        let object = self.object();
        let offset = object.key().len();
        bind_key(statement, object.key())?;
        for (index, value) in object.values().iter().enumerate() {
            statement.set_input(offset + index, value.clone())?;
        }
        Ok(())
    }

    /// Whether the guard commits right after a successful write.
    fn auto_commit(&self) -> bool {
        false
    }
}

/// Removes one object by key.
pub trait Eraser {
    /// Statement that deletes the row.
    fn statement(&self) -> &Statement;

    /// Key of the object to remove.
    fn key(&self) -> &PrimaryKey;

    /// Binds the statement inputs before execution.
    fn apply(&self, statement: &mut GuardStatement<'_, '_>) -> CoreResult<()> {
        bind_key(statement, self.key())
    }
}

fn bind_key(statement: &mut GuardStatement<'_, '_>, key: &PrimaryKey) -> CoreResult<()> {
    for (index, value) in key.values().enumerate() {
        statement.set_input(index, value.clone())?;
    }
    Ok(())
}

/// Loader binding the key by position.
#[derive(Debug, Clone)]
pub struct KeyLoader {
    statement: Arc<Statement>,
    key: PrimaryKey,
    force_refresh: bool,
}

impl KeyLoader {
    /// Creates a loader for `key`.
    pub fn new(statement: Arc<Statement>, key: PrimaryKey) -> Self {
        Self {
            statement,
            key,
            force_refresh: false,
        }
    }

    /// Makes read-write storages reload the object even when cached.
    #[must_use]
    pub fn force_refresh(mut self) -> Self {
        self.force_refresh = true;
        self
    }
}

impl Loader for KeyLoader {
    fn statement(&self) -> &Statement {
        &self.statement
    }

    fn key(&self) -> &PrimaryKey {
        &self.key
    }

    fn has_to_refresh(&self, _statement: &Statement, _object: &Object) -> CoreResult<bool> {
        Ok(self.force_refresh)
    }
}

/// Recorder binding key then fields by position.
#[derive(Debug, Clone)]
pub struct ObjectRecorder {
    statement: Arc<Statement>,
    object: Object,
    auto_commit: bool,
}

impl ObjectRecorder {
    /// Creates a recorder for `object`.
    pub fn new(statement: Arc<Statement>, object: Object) -> Self {
        Self {
            statement,
            object,
            auto_commit: false,
        }
    }

    /// Commits the guard right after the write.
    #[must_use]
    pub fn enable_auto_commit(mut self) -> Self {
        self.auto_commit = true;
        self
    }
}

impl Recorder for ObjectRecorder {
    fn statement(&self) -> &Statement {
        &self.statement
    }

    fn object(&self) -> &Object {
        &self.object
    }

    fn auto_commit(&self) -> bool {
        self.auto_commit
    }
}

/// Eraser binding the key by position.
#[derive(Debug, Clone)]
pub struct KeyEraser {
    statement: Arc<Statement>,
    key: PrimaryKey,
}

impl KeyEraser {
    /// Creates an eraser for `key`.
    pub fn new(statement: Arc<Statement>, key: PrimaryKey) -> Self {
        Self { statement, key }
    }
}

impl Eraser for KeyEraser {
    fn statement(&self) -> &Statement {
        &self.statement
    }

    fn key(&self) -> &PrimaryKey {
        &self.key
    }
}
