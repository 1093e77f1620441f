//! Scoped binding of a statement to a guarded connection.

use super::GuardConnection;
use crate::error::{CoreError, CoreResult};
use crate::result_code::ResultCode;
use crate::statement::{Slots, Statement};
use parking_lot::MutexGuard;
use tessera_data::Value;
use tracing::trace;

/// Exclusive binding of one [`Statement`] under a live [`GuardConnection`].
///
/// While it lives, no other guard can bind the same statement: another
/// thread blocks, the same thread gets `StatementBusy`. Inputs are set by
/// position, then [`execute`](Self::execute) runs the statement and
/// [`fetch`](Self::fetch) walks its rows into the outputs.
pub struct GuardStatement<'g, 'c> {
    guard: &'g GuardConnection<'c>,
    statement: &'g Statement,
    slots: MutexGuard<'g, Slots>,
    requires_commit: bool,
}

impl<'g, 'c> GuardStatement<'g, 'c> {
    /// Binds `statement` to `guard`.
    ///
    /// # Errors
    ///
    /// Returns `StatementBusy` if the calling thread already binds this
    /// statement.
    pub fn new(guard: &'g GuardConnection<'c>, statement: &'g Statement) -> CoreResult<Self> {
        let slots = statement.bind()?;
        guard.link();
        trace!(
            connection = guard.connection().name(),
            statement = statement.name(),
            "statement bound"
        );
        Ok(Self {
            guard,
            statement,
            slots,
            requires_commit: statement.requires_commit(),
        })
    }

    /// Returns the bound statement.
    pub fn statement(&self) -> &Statement {
        self.statement
    }

    /// Returns true if executions through this binding count as writes.
    pub fn requires_commit(&self) -> bool {
        self.requires_commit
    }

    /// Changes whether executions through this binding count as writes.
    ///
    /// Returns false, with no effect, when asked to clear the flag on a
    /// statement without outputs.
    pub fn set_requires_commit(&mut self, value: bool) -> bool {
        if !value && self.statement.outputs().is_empty() {
            return false;
        }
        self.requires_commit = value;
        true
    }

    /// Returns the number of input binders.
    pub fn input_count(&self) -> usize {
        self.slots.inputs.len()
    }

    /// Returns the number of output binders.
    pub fn output_count(&self) -> usize {
        self.slots.outputs.len()
    }

    /// Returns the value bound to input `index`.
    ///
    /// # Errors
    ///
    /// Returns `BinderOutOfRange` if there is no such input.
    pub fn input(&self, index: usize) -> CoreResult<&Value> {
        self.statement.input_binder(index)?;
        Ok(&self.slots.inputs[index])
    }

    /// Binds `value` to input `index`.
    ///
    /// # Errors
    ///
    /// - `BinderOutOfRange` if there is no such input
    /// - a data error if the value does not have the binder's type
    pub fn set_input(&mut self, index: usize, value: impl Into<Value>) -> CoreResult<()> {
        let binder = self.statement.input_binder(index)?;
        let value = value.into();
        value.check_type(binder.data_type)?;
        self.slots.inputs[index] = value;
        Ok(())
    }

    /// Returns the value of output `index` from the last fetched row.
    ///
    /// # Errors
    ///
    /// Returns `BinderOutOfRange` if there is no such output.
    pub fn output(&self, index: usize) -> CoreResult<&Value> {
        self.statement.output_binder(index)?;
        Ok(&self.slots.outputs[index])
    }

    /// Returns all outputs from the last fetched row.
    pub fn outputs(&self) -> &[Value] {
        &self.slots.outputs
    }

    /// Runs the statement, preparing it on this connection first if needed.
    ///
    /// Returns the backend outcome, which is either successful or "not
    /// found". A successful execution that requires commit counts as one
    /// pending write on the guard.
    ///
    /// # Errors
    ///
    /// Returns a backend error for any other outcome, after the failure
    /// policy ran: recovery for a lost link, rollback of pending work
    /// unless the statement ignores errors.
    ///
    /// Returns `NoErrorInterpreter`, without reaching the backend, when no
    /// error code interpreter is registered.
    pub fn execute(&mut self) -> CoreResult<ResultCode> {
        let connection = self.guard.connection();
        let action = self.statement.action_on_error();
        let interpreter = connection
            .interpreter()
            .ok_or(CoreError::NoErrorInterpreter)?;
        let mut session = self.guard.session.borrow_mut();

        let prepared = match connection.prepare(&mut session, self.statement) {
            Ok(prepared) => prepared,
            Err(err) => return Err(self.guard.on_failure(&mut session, err, action)),
        };

        connection.stats().record_operation();
        if let Some(db) = self.guard.database() {
            db.stats().record_execution();
        }
        let status = match session.backend.execute(prepared, &self.slots.inputs) {
            Ok(status) => status,
            Err(e) => {
                let err = connection.backend_error(e);
                return Err(self.guard.on_failure(&mut session, err, action));
            }
        };

        let code = ResultCode::from_status(status, Some(interpreter));
        if code.successful()? {
            trace!(connection = connection.name(), statement = self.statement.name(), "executed");
            if self.requires_commit {
                self.guard.record_write(&mut session)?;
            }
            Ok(code)
        } else if code.not_found()? {
            trace!(connection = connection.name(), statement = self.statement.name(), "executed, not found");
            Ok(code)
        } else {
            let err = connection.status_error(code);
            Err(self.guard.on_failure(&mut session, err, action))
        }
    }

    /// Reads the next row of the last execution into the outputs.
    ///
    /// Returns false once the rows are exhausted.
    ///
    /// # Errors
    ///
    /// - `InvalidOperation` if the statement was never executed here
    /// - a backend error if the row cannot be read
    /// - a data error if the row does not match the output binders
    pub fn fetch(&mut self) -> CoreResult<bool> {
        let connection = self.guard.connection();
        let mut session = self.guard.session.borrow_mut();

        let Some(prepared) = session.prepared.get(&self.statement.id()).copied() else {
            return Err(CoreError::invalid_operation(format!(
                "statement {} has not been executed on connection {}",
                self.statement.name(),
                connection.name()
            )));
        };

        connection.stats().record_operation();
        let found = match session.backend.fetch(prepared, &mut self.slots.outputs) {
            Ok(found) => found,
            Err(e) => {
                let err = connection.backend_error(e);
                let action = self.statement.action_on_error();
                return Err(self.guard.on_failure(&mut session, err, action));
            }
        };
        if !found {
            return Ok(false);
        }

        if let Some(db) = self.guard.database() {
            db.stats().record_fetch();
        }
        for (value, binder) in self.slots.outputs.iter().zip(self.statement.outputs()) {
            value.check_type(binder.data_type)?;
        }
        Ok(true)
    }
}

impl Drop for GuardStatement<'_, '_> {
    fn drop(&mut self) {
        self.statement.unbind();
        self.guard.unlink();
    }
}
