//! Statements: named, parameterized backend operations.

use crate::diagnostics::StatementSnapshot;
use crate::error::{CoreError, CoreResult};
use crate::types::{ActionOnError, StatementId};
use parking_lot::{Mutex, MutexGuard};
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, ThreadId};
use tessera_backend::StatementDescriptor;
use tessera_data::{DataType, Value};

/// A named, typed slot of a statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binder {
    /// Binder name.
    pub name: String,
    /// Type accepted by the slot.
    pub data_type: DataType,
}

impl Binder {
    /// Creates a binder.
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
        }
    }
}

/// Shape and policy of a statement, given at creation.
#[derive(Debug, Clone, Default)]
pub struct StatementParams {
    inputs: Vec<Binder>,
    outputs: Vec<Binder>,
    action_on_error: ActionOnError,
    requires_commit: bool,
}

impl StatementParams {
    /// Creates parameters with no binders.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an input binder.
    #[must_use]
    pub fn input(mut self, name: impl Into<String>, data_type: DataType) -> Self {
        self.inputs.push(Binder::new(name, data_type));
        self
    }

    /// Appends an output binder.
    #[must_use]
    pub fn output(mut self, name: impl Into<String>, data_type: DataType) -> Self {
        self.outputs.push(Binder::new(name, data_type));
        self
    }

    /// Sets what a failed execution does to pending work.
    #[must_use]
    pub const fn action_on_error(mut self, action: ActionOnError) -> Self {
        self.action_on_error = action;
        self
    }

    /// Forces statements with outputs to count as writes.
    #[must_use]
    pub const fn requires_commit(mut self, value: bool) -> Self {
        self.requires_commit = value;
        self
    }
}

/// Rewrites statement expressions before they are stored.
///
/// A database applies its translator once, when a statement is created.
pub trait StatementTranslator: Send + Sync {
    /// Returns the translated expression.
    fn apply(&self, expression: &str) -> String;
}

impl<F> StatementTranslator for F
where
    F: Fn(&str) -> String + Send + Sync,
{
    fn apply(&self, expression: &str) -> String {
        self(expression)
    }
}

/// Values bound to a statement while it is held by a guard.
#[derive(Debug)]
pub(crate) struct Slots {
    pub(crate) inputs: Vec<Value>,
    pub(crate) outputs: Vec<Value>,
}

/// A parameterized operation owned by a database.
///
/// A statement is reusable across connections; it is prepared lazily on
/// each connection the first time it executes there. At most one
/// [`crate::GuardStatement`] binds it at a time.
#[derive(Debug)]
pub struct Statement {
    id: StatementId,
    name: String,
    expression: String,
    action_on_error: ActionOnError,
    inputs: Vec<Binder>,
    outputs: Vec<Binder>,
    input_types: Vec<DataType>,
    output_types: Vec<DataType>,
    requires_commit: AtomicBool,
    slots: Mutex<Slots>,
    owner: Mutex<Option<ThreadId>>,
}

impl Statement {
    pub(crate) fn new(
        id: StatementId,
        name: String,
        expression: String,
        params: StatementParams,
    ) -> Self {
        let input_types = params.inputs.iter().map(|b| b.data_type).collect();
        let output_types = params.outputs.iter().map(|b| b.data_type).collect();
        let slots = Slots {
            inputs: vec![Value::Null; params.inputs.len()],
            outputs: vec![Value::Null; params.outputs.len()],
        };
        Self {
            id,
            name,
            expression,
            action_on_error: params.action_on_error,
            inputs: params.inputs,
            outputs: params.outputs,
            input_types,
            output_types,
            requires_commit: AtomicBool::new(params.requires_commit),
            slots: Mutex::new(slots),
            owner: Mutex::new(None),
        }
    }

    /// Returns the statement ID.
    pub fn id(&self) -> StatementId {
        self.id
    }

    /// Returns the statement name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the expression, as translated at creation.
    pub fn expression(&self) -> &str {
        &self.expression
    }

    /// Returns the error policy.
    pub fn action_on_error(&self) -> ActionOnError {
        self.action_on_error
    }

    /// Returns the input binders.
    pub fn inputs(&self) -> &[Binder] {
        &self.inputs
    }

    /// Returns the output binders.
    pub fn outputs(&self) -> &[Binder] {
        &self.outputs
    }

    /// Returns true if a successful execution counts as pending work.
    ///
    /// Statements without outputs always do.
    pub fn requires_commit(&self) -> bool {
        self.outputs.is_empty() || self.requires_commit.load(Ordering::Acquire)
    }

    /// Changes whether executions count as pending work.
    ///
    /// Returns false, with no effect, when asked to clear the flag on a
    /// statement without outputs.
    pub fn set_requires_commit(&self, value: bool) -> bool {
        if !value && self.outputs.is_empty() {
            return false;
        }
        self.requires_commit.store(value, Ordering::Release);
        true
    }

    /// Returns true if a guard currently binds this statement.
    pub fn is_bound(&self) -> bool {
        self.slots.is_locked()
    }

    pub(crate) fn descriptor(&self) -> StatementDescriptor<'_> {
        StatementDescriptor {
            name: &self.name,
            expression: &self.expression,
            inputs: &self.input_types,
            outputs: &self.output_types,
        }
    }

    pub(crate) fn input_binder(&self, index: usize) -> CoreResult<&Binder> {
        self.inputs
            .get(index)
            .ok_or_else(|| self.out_of_range("input", index, self.inputs.len()))
    }

    pub(crate) fn output_binder(&self, index: usize) -> CoreResult<&Binder> {
        self.outputs
            .get(index)
            .ok_or_else(|| self.out_of_range("output", index, self.outputs.len()))
    }

    fn out_of_range(&self, direction: &'static str, index: usize, count: usize) -> CoreError {
        CoreError::BinderOutOfRange {
            statement: self.name.clone(),
            direction,
            index,
            count,
        }
    }

    /// Takes the slot lock for a new binding.
    ///
    /// Fails if the calling thread already holds it; blocks while another
    /// thread does.
    pub(crate) fn bind(&self) -> CoreResult<MutexGuard<'_, Slots>> {
        let me = thread::current().id();
        let mut slots = match self.slots.try_lock() {
            Some(slots) => slots,
            None => {
                if *self.owner.lock() == Some(me) {
                    return Err(CoreError::StatementBusy {
                        name: self.name.clone(),
                    });
                }
                self.slots.lock()
            }
        };
        *self.owner.lock() = Some(me);
        slots.inputs.fill(Value::Null);
        slots.outputs.fill(Value::Null);
        Ok(slots)
    }

    /// Forgets the binding thread. Must run before the slot lock is released.
    pub(crate) fn unbind(&self) {
        *self.owner.lock() = None;
    }

    /// Returns a serializable view of this statement.
    pub fn snapshot(&self) -> StatementSnapshot {
        StatementSnapshot {
            id: self.id.as_u32(),
            name: self.name.clone(),
            expression: self.expression.clone(),
            inputs: self.inputs.len(),
            outputs: self.outputs.len(),
            requires_commit: self.requires_commit(),
            action_on_error: self.action_on_error,
            bound: self.is_bound(),
        }
    }
}
