//! In-memory reference backend.

use crate::backend::{
    Backend, BackendConnection, ConnectionParams, ErrorCodeInterpreter, PreparedId,
    StatementDescriptor, Status,
};
use crate::error::{BackendError, BackendResult};
use parking_lot::{Mutex, RwLock};
use std::collections::{BTreeMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tessera_data::Value;
use tracing::{debug, trace};

/// Numeric codes reported by [`MemoryBackend`].
pub mod codes {
    /// Success.
    pub const OK: i32 = 0;
    /// No row matched.
    pub const NOT_FOUND: i32 = 100;
    /// The session is closed or broken.
    pub const LOST_CONNECTION: i32 = -1;
    /// The data is locked.
    pub const LOCKED: i32 = -2;
    /// The expression could not be parsed.
    pub const SYNTAX_ERROR: i32 = -3;
    /// The expression names an unknown table.
    pub const UNKNOWN_TABLE: i32 = -4;
    /// An insert collided with an existing key.
    pub const DUPLICATE_KEY: i32 = -5;
    /// Binder count does not fit the statement or table.
    pub const BAD_ARITY: i32 = -6;
    /// The prepared id is not known to the session.
    pub const NOT_PREPARED: i32 = -7;
}

/// Code table of the in-memory backend.
#[derive(Debug, Clone, Copy, Default)]
pub struct MemoryCodeTable;

impl ErrorCodeInterpreter for MemoryCodeTable {
    fn successful(&self, code: i32) -> bool {
        code == codes::OK
    }

    fn not_found(&self, code: i32) -> bool {
        code == codes::NOT_FOUND
    }

    fn locked(&self, code: i32) -> bool {
        code == codes::LOCKED
    }

    fn lost_connection(&self, code: i32) -> bool {
        code == codes::LOST_CONNECTION
    }
}

/// An in-memory backend made of keyed tables.
///
/// This backend is suitable for:
/// - Unit and integration tests
/// - Tooling and demos that need a backend without a server
///
/// Each session keeps a private log of uncommitted writes. Reads through a
/// session see committed rows plus that session's own pending writes; a
/// commit applies the log atomically, a rollback discards it.
///
/// Expressions have the form `<verb> <table>`:
///
/// | verb     | inputs            | effect                                   |
/// |----------|-------------------|------------------------------------------|
/// | `select` | key               | one row, non-key columns per fetch       |
/// | `scan`   | none              | every row, key then columns per fetch    |
/// | `insert` | key then columns  | fails with `DUPLICATE_KEY` on collision  |
/// | `update` | key then columns  | `NOT_FOUND` status if the key is absent  |
/// | `upsert` | key then columns  | insert or replace                        |
/// | `delete` | key               | `NOT_FOUND` status if the key is absent  |
///
/// # Thread Safety
///
/// The backend is cheap to clone; clones share the same tables, so a test
/// can keep a handle to inspect state while a database owns another.
///
/// # Example
///
/// ```rust
/// use tessera_backend::{
///     Backend, BackendConnection, ConnectionParams, MemoryBackend, StatementDescriptor,
/// };
/// use tessera_data::{DataType, Value};
///
/// let backend = MemoryBackend::new();
/// backend.create_table("person", 1);
/// backend.insert_row("person", vec![Value::Integer(1)], vec![Value::from("ann")]).unwrap();
///
/// let mut session = backend.create_connection("c0", &ConnectionParams::new()).unwrap();
/// session.open().unwrap();
/// let read = session
///     .prepare(&StatementDescriptor {
///         name: "read",
///         expression: "select person",
///         inputs: &[DataType::Integer],
///         outputs: &[DataType::Text],
///     })
///     .unwrap();
/// session.execute(read, &[Value::Integer(1)]).unwrap();
/// let mut row = vec![Value::Null];
/// assert!(session.fetch(read, &mut row).unwrap());
/// assert_eq!(row[0], Value::from("ann"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    store: Arc<MemoryStore>,
}

#[derive(Debug, Default)]
struct MemoryStore {
    tables: RwLock<BTreeMap<String, Table>>,
    refuse_open: AtomicBool,
    fail_next_execute: Mutex<Option<i32>>,
    commits: AtomicU64,
    rollbacks: AtomicU64,
    opens: AtomicU64,
}

#[derive(Debug, Clone)]
struct Table {
    key_arity: usize,
    rows: BTreeMap<Vec<Value>, Vec<Value>>,
}

impl MemoryBackend {
    /// Creates a backend with no tables.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a table whose first `key_arity` values form the key.
    ///
    /// Creating an existing table is a no-op.
    pub fn create_table(&self, name: &str, key_arity: usize) {
        self.store
            .tables
            .write()
            .entry(name.to_string())
            .or_insert_with(|| Table {
                key_arity,
                rows: BTreeMap::new(),
            });
    }

    /// Writes a committed row directly, bypassing sessions.
    ///
    /// Useful for preloading test data.
    ///
    /// # Errors
    ///
    /// Returns an error if the table is unknown or the key has the wrong arity.
    pub fn insert_row(
        &self,
        table: &str,
        key: Vec<Value>,
        columns: Vec<Value>,
    ) -> BackendResult<()> {
        let mut tables = self.store.tables.write();
        let entry = tables.get_mut(table).ok_or_else(|| unknown_table(table))?;
        if key.len() != entry.key_arity {
            return Err(bad_arity(table, entry.key_arity, key.len()));
        }
        entry.rows.insert(key, columns);
        Ok(())
    }

    /// Returns the committed columns stored under `key`.
    #[must_use]
    pub fn row(&self, table: &str, key: &[Value]) -> Option<Vec<Value>> {
        self.store
            .tables
            .read()
            .get(table)
            .and_then(|t| t.rows.get(key).cloned())
    }

    /// Returns the number of committed rows in a table.
    #[must_use]
    pub fn row_count(&self, table: &str) -> usize {
        self.store
            .tables
            .read()
            .get(table)
            .map_or(0, |t| t.rows.len())
    }

    /// Returns how many commits sessions have performed.
    #[must_use]
    pub fn commit_count(&self) -> u64 {
        self.store.commits.load(Ordering::SeqCst)
    }

    /// Returns how many rollbacks sessions have performed.
    #[must_use]
    pub fn rollback_count(&self) -> u64 {
        self.store.rollbacks.load(Ordering::SeqCst)
    }

    /// Returns how many times a session has been opened.
    #[must_use]
    pub fn open_count(&self) -> u64 {
        self.store.opens.load(Ordering::SeqCst)
    }

    /// Makes every subsequent `open` fail with a lost-connection code.
    pub fn refuse_open(&self, refuse: bool) {
        self.store.refuse_open.store(refuse, Ordering::SeqCst);
    }

    /// Makes the next `execute` on any session fail with `code`.
    pub fn fail_next_execute(&self, code: i32) {
        *self.store.fail_next_execute.lock() = Some(code);
    }
}

impl Backend for MemoryBackend {
    fn name(&self) -> &str {
        "memory"
    }

    fn create_connection(
        &self,
        name: &str,
        _params: &ConnectionParams,
    ) -> BackendResult<Box<dyn BackendConnection>> {
        Ok(Box::new(MemorySession {
            name: name.to_string(),
            store: Arc::clone(&self.store),
            open: false,
            broken: false,
            pending: Vec::new(),
            prepared: Vec::new(),
        }))
    }

    fn error_interpreter(&self) -> Arc<dyn ErrorCodeInterpreter> {
        Arc::new(MemoryCodeTable)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Verb {
    Select,
    Scan,
    Insert,
    Update,
    Upsert,
    Delete,
}

impl Verb {
    fn parse(word: &str) -> Option<Self> {
        match word.to_ascii_lowercase().as_str() {
            "select" => Some(Verb::Select),
            "scan" => Some(Verb::Scan),
            "insert" => Some(Verb::Insert),
            "update" => Some(Verb::Update),
            "upsert" => Some(Verb::Upsert),
            "delete" => Some(Verb::Delete),
            _ => None,
        }
    }
}

#[derive(Debug)]
struct Prepared {
    verb: Verb,
    table: String,
    key_arity: usize,
    cursor: VecDeque<Vec<Value>>,
}

#[derive(Debug)]
struct PendingWrite {
    table: String,
    key: Vec<Value>,
    row: Option<Vec<Value>>,
}

struct MemorySession {
    name: String,
    store: Arc<MemoryStore>,
    open: bool,
    broken: bool,
    pending: Vec<PendingWrite>,
    prepared: Vec<Prepared>,
}

impl MemorySession {
    fn ensure_usable(&self) -> BackendResult<()> {
        if !self.open {
            return Err(BackendError::new(
                codes::LOST_CONNECTION,
                format!("session '{}' is not open", self.name),
            ));
        }
        if self.broken {
            return Err(BackendError::new(
                codes::LOST_CONNECTION,
                format!("session '{}' lost its link", self.name),
            ));
        }
        Ok(())
    }

    /// Row visible to this session: own pending writes first, then committed.
    fn visible(&self, table: &str, key: &[Value]) -> Option<Vec<Value>> {
        if let Some(write) = self
            .pending
            .iter()
            .rev()
            .find(|w| w.table == table && w.key == key)
        {
            return write.row.clone();
        }
        self.store
            .tables
            .read()
            .get(table)
            .and_then(|t| t.rows.get(key).cloned())
    }

    fn visible_rows(&self, table: &str) -> Vec<Vec<Value>> {
        let mut rows = self
            .store
            .tables
            .read()
            .get(table)
            .map(|t| t.rows.clone())
            .unwrap_or_default();
        for write in self.pending.iter().filter(|w| w.table == table) {
            match &write.row {
                Some(row) => {
                    rows.insert(write.key.clone(), row.clone());
                }
                None => {
                    rows.remove(&write.key);
                }
            }
        }
        rows.into_iter()
            .map(|(mut key, columns)| {
                key.extend(columns);
                key
            })
            .collect()
    }
}

impl BackendConnection for MemorySession {
    fn open(&mut self) -> BackendResult<()> {
        if self.store.refuse_open.load(Ordering::SeqCst) {
            return Err(BackendError::new(
                codes::LOST_CONNECTION,
                format!("session '{}' refused", self.name),
            ));
        }
        self.open = true;
        self.broken = false;
        self.pending.clear();
        self.prepared.clear();
        self.store.opens.fetch_add(1, Ordering::SeqCst);
        debug!(session = %self.name, "memory session opened");
        Ok(())
    }

    fn close(&mut self) {
        self.open = false;
        self.pending.clear();
        self.prepared.clear();
        debug!(session = %self.name, "memory session closed");
    }

    fn commit(&mut self) -> BackendResult<()> {
        self.ensure_usable()?;
        let mut tables = self.store.tables.write();
        for write in self.pending.drain(..) {
            if let Some(table) = tables.get_mut(&write.table) {
                match write.row {
                    Some(row) => {
                        table.rows.insert(write.key, row);
                    }
                    None => {
                        table.rows.remove(&write.key);
                    }
                }
            }
        }
        self.store.commits.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn rollback(&mut self) -> BackendResult<()> {
        self.ensure_usable()?;
        self.pending.clear();
        self.store.rollbacks.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn prepare(&mut self, statement: &StatementDescriptor<'_>) -> BackendResult<PreparedId> {
        self.ensure_usable()?;

        let mut words = statement.expression.split_whitespace();
        let (verb, table) = match (words.next().and_then(Verb::parse), words.next(), words.next())
        {
            (Some(verb), Some(table), None) => (verb, table.to_string()),
            _ => {
                return Err(BackendError::new(
                    codes::SYNTAX_ERROR,
                    format!("cannot parse '{}'", statement.expression),
                ))
            }
        };

        let key_arity = self
            .store
            .tables
            .read()
            .get(&table)
            .map(|t| t.key_arity)
            .ok_or_else(|| unknown_table(&table))?;

        let inputs = statement.inputs.len();
        let fits = match verb {
            Verb::Select | Verb::Delete => inputs == key_arity,
            Verb::Scan => inputs == 0,
            Verb::Insert | Verb::Update | Verb::Upsert => inputs >= key_arity,
        };
        if !fits {
            return Err(bad_arity(&table, key_arity, inputs));
        }

        let id = PreparedId(u32::try_from(self.prepared.len()).unwrap_or(u32::MAX));
        trace!(session = %self.name, statement = statement.name, %id, "prepared");
        self.prepared.push(Prepared {
            verb,
            table,
            key_arity,
            cursor: VecDeque::new(),
        });
        Ok(id)
    }

    fn execute(&mut self, prepared: PreparedId, inputs: &[Value]) -> BackendResult<Status> {
        self.ensure_usable()?;
        if let Some(code) = self.store.fail_next_execute.lock().take() {
            return Err(BackendError::new(code, "injected failure"));
        }

        let (verb, table, key_arity) = {
            let p = self
                .prepared
                .get(prepared.0 as usize)
                .ok_or_else(|| not_prepared(prepared))?;
            (p.verb, p.table.clone(), p.key_arity)
        };
        let split = if verb == Verb::Scan { 0 } else { key_arity };
        if inputs.len() < split {
            return Err(bad_arity(&table, key_arity, inputs.len()));
        }
        let key = inputs[..split].to_vec();
        let columns = inputs[split..].to_vec();

        let status = match verb {
            Verb::Select => {
                let rows: VecDeque<_> = self.visible(&table, &key).into_iter().collect();
                self.prepared[prepared.0 as usize].cursor = rows;
                Status::new(codes::OK)
            }
            Verb::Scan => {
                let rows = self.visible_rows(&table).into_iter().collect();
                self.prepared[prepared.0 as usize].cursor = rows;
                Status::new(codes::OK)
            }
            Verb::Insert => {
                if self.visible(&table, &key).is_some() {
                    return Err(BackendError::new(
                        codes::DUPLICATE_KEY,
                        format!("duplicate key in '{table}'"),
                    ));
                }
                self.pending.push(PendingWrite {
                    table,
                    key,
                    row: Some(columns),
                });
                Status::new(codes::OK)
            }
            Verb::Update => {
                if self.visible(&table, &key).is_none() {
                    Status::new(codes::NOT_FOUND).with_message("no row to update")
                } else {
                    self.pending.push(PendingWrite {
                        table,
                        key,
                        row: Some(columns),
                    });
                    Status::new(codes::OK)
                }
            }
            Verb::Upsert => {
                self.pending.push(PendingWrite {
                    table,
                    key,
                    row: Some(columns),
                });
                Status::new(codes::OK)
            }
            Verb::Delete => {
                if self.visible(&table, &key).is_none() {
                    Status::new(codes::NOT_FOUND).with_message("no row to delete")
                } else {
                    self.pending.push(PendingWrite {
                        table,
                        key,
                        row: None,
                    });
                    Status::new(codes::OK)
                }
            }
        };
        Ok(status)
    }

    fn fetch(&mut self, prepared: PreparedId, outputs: &mut [Value]) -> BackendResult<bool> {
        self.ensure_usable()?;
        let p = self
            .prepared
            .get_mut(prepared.0 as usize)
            .ok_or_else(|| not_prepared(prepared))?;
        let Some(row) = p.cursor.pop_front() else {
            return Ok(false);
        };
        if outputs.len() > row.len() {
            return Err(bad_arity(&p.table, row.len(), outputs.len()));
        }
        for (slot, value) in outputs.iter_mut().zip(row) {
            *slot = value;
        }
        Ok(true)
    }

    fn manual_break(&mut self) {
        self.broken = true;
        debug!(session = %self.name, "memory session broken on request");
    }
}

fn unknown_table(table: &str) -> BackendError {
    BackendError::new(codes::UNKNOWN_TABLE, format!("unknown table '{table}'"))
}

fn bad_arity(table: &str, expected: usize, actual: usize) -> BackendError {
    BackendError::new(
        codes::BAD_ARITY,
        format!("table '{table}' expects {expected} values, got {actual}"),
    )
}

fn not_prepared(prepared: PreparedId) -> BackendError {
    BackendError::new(codes::NOT_PREPARED, format!("{prepared} is not prepared"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use tessera_data::DataType;

    fn backend_with_people() -> MemoryBackend {
        let backend = MemoryBackend::new();
        backend.create_table("person", 1);
        for id in 0..3 {
            backend
                .insert_row(
                    "person",
                    vec![Value::Integer(id)],
                    vec![Value::from(format!("name {id}"))],
                )
                .unwrap();
        }
        backend
    }

    fn open_session(backend: &MemoryBackend) -> Box<dyn BackendConnection> {
        let mut session = backend
            .create_connection("test", &ConnectionParams::new())
            .unwrap();
        session.open().unwrap();
        session
    }

    fn prepare(
        session: &mut Box<dyn BackendConnection>,
        expression: &str,
        inputs: &[DataType],
        outputs: &[DataType],
    ) -> BackendResult<PreparedId> {
        session.prepare(&StatementDescriptor {
            name: "stmt",
            expression,
            inputs,
            outputs,
        })
    }

    #[test]
    fn memory_select_existing_row() {
        let backend = backend_with_people();
        let mut session = open_session(&backend);
        let id = prepare(&mut session, "select person", &[DataType::Integer], &[DataType::Text])
            .unwrap();

        let status = session.execute(id, &[Value::Integer(1)]).unwrap();
        assert_eq!(status.code, codes::OK);

        let mut out = vec![Value::Null];
        assert!(session.fetch(id, &mut out).unwrap());
        assert_eq!(out[0], Value::from("name 1"));
        assert!(!session.fetch(id, &mut out).unwrap());
    }

    #[test]
    fn memory_select_missing_row_fetches_nothing() {
        let backend = backend_with_people();
        let mut session = open_session(&backend);
        let id = prepare(&mut session, "select person", &[DataType::Integer], &[DataType::Text])
            .unwrap();
        session.execute(id, &[Value::Integer(42)]).unwrap();
        let mut out = vec![Value::Null];
        assert!(!session.fetch(id, &mut out).unwrap());
    }

    #[test]
    fn memory_pending_writes_need_commit() {
        let backend = backend_with_people();
        let mut session = open_session(&backend);
        let id = prepare(
            &mut session,
            "upsert person",
            &[DataType::Integer, DataType::Text],
            &[],
        )
        .unwrap();
        session
            .execute(id, &[Value::Integer(9), Value::from("nine")])
            .unwrap();
        assert_eq!(backend.row("person", &[Value::Integer(9)]), None);

        session.commit().unwrap();
        assert_eq!(
            backend.row("person", &[Value::Integer(9)]),
            Some(vec![Value::from("nine")])
        );
        assert_eq!(backend.commit_count(), 1);
    }

    #[test]
    fn memory_rollback_discards_writes() {
        let backend = backend_with_people();
        let mut session = open_session(&backend);
        let id = prepare(&mut session, "delete person", &[DataType::Integer], &[]).unwrap();
        session.execute(id, &[Value::Integer(0)]).unwrap();
        session.rollback().unwrap();
        session.commit().unwrap();
        assert_eq!(backend.row_count("person"), 3);
        assert_eq!(backend.rollback_count(), 1);
    }

    #[test]
    fn memory_reads_see_own_pending_writes() {
        let backend = backend_with_people();
        let mut session = open_session(&backend);
        let del = prepare(&mut session, "delete person", &[DataType::Integer], &[]).unwrap();
        let scan = prepare(
            &mut session,
            "scan person",
            &[],
            &[DataType::Integer, DataType::Text],
        )
        .unwrap();
        session.execute(del, &[Value::Integer(0)]).unwrap();
        session.execute(scan, &[]).unwrap();

        let mut out = vec![Value::Null, Value::Null];
        let mut seen = Vec::new();
        while session.fetch(scan, &mut out).unwrap() {
            seen.push(out[0].clone());
        }
        assert_eq!(seen, vec![Value::Integer(1), Value::Integer(2)]);
    }

    #[test]
    fn memory_update_and_delete_missing_report_not_found() {
        let backend = backend_with_people();
        let mut session = open_session(&backend);
        let update = prepare(
            &mut session,
            "update person",
            &[DataType::Integer, DataType::Text],
            &[],
        )
        .unwrap();
        let delete = prepare(&mut session, "delete person", &[DataType::Integer], &[]).unwrap();

        let status = session
            .execute(update, &[Value::Integer(77), Value::from("x")])
            .unwrap();
        assert_eq!(status.code, codes::NOT_FOUND);
        let status = session.execute(delete, &[Value::Integer(77)]).unwrap();
        assert_eq!(status.code, codes::NOT_FOUND);
    }

    #[test]
    fn memory_insert_duplicate_fails() {
        let backend = backend_with_people();
        let mut session = open_session(&backend);
        let id = prepare(
            &mut session,
            "insert person",
            &[DataType::Integer, DataType::Text],
            &[],
        )
        .unwrap();
        let err = session
            .execute(id, &[Value::Integer(1), Value::from("dup")])
            .unwrap_err();
        assert_eq!(err.code, codes::DUPLICATE_KEY);
    }

    #[test]
    fn memory_prepare_errors() {
        let backend = backend_with_people();
        let mut session = open_session(&backend);

        let err = prepare(&mut session, "frobnicate person", &[], &[]).unwrap_err();
        assert_eq!(err.code, codes::SYNTAX_ERROR);

        let err = prepare(&mut session, "select nobody", &[DataType::Integer], &[]).unwrap_err();
        assert_eq!(err.code, codes::UNKNOWN_TABLE);

        let err = prepare(&mut session, "select person", &[], &[]).unwrap_err();
        assert_eq!(err.code, codes::BAD_ARITY);
    }

    #[test]
    fn memory_manual_break_loses_connection() {
        let backend = backend_with_people();
        let mut session = open_session(&backend);
        let id = prepare(&mut session, "select person", &[DataType::Integer], &[DataType::Text])
            .unwrap();
        session.manual_break();

        let err = session.execute(id, &[Value::Integer(1)]).unwrap_err();
        assert!(MemoryCodeTable.lost_connection(err.code));

        session.close();
        session.open().unwrap();
        // Preparations do not survive a reopen.
        let err = session.execute(id, &[Value::Integer(1)]).unwrap_err();
        assert_eq!(err.code, codes::NOT_PREPARED);
    }

    #[test]
    fn memory_refuse_open() {
        let backend = backend_with_people();
        backend.refuse_open(true);
        let mut session = backend
            .create_connection("test", &ConnectionParams::new())
            .unwrap();
        let err = session.open().unwrap_err();
        assert_eq!(err.code, codes::LOST_CONNECTION);

        backend.refuse_open(false);
        session.open().unwrap();
        assert_eq!(backend.open_count(), 1);
    }

    #[test]
    fn memory_injected_failure_fires_once() {
        let backend = backend_with_people();
        let mut session = open_session(&backend);
        let id = prepare(&mut session, "select person", &[DataType::Integer], &[DataType::Text])
            .unwrap();
        backend.fail_next_execute(codes::LOCKED);

        let err = session.execute(id, &[Value::Integer(1)]).unwrap_err();
        assert!(MemoryCodeTable.locked(err.code));
        assert!(session.execute(id, &[Value::Integer(1)]).is_ok());
    }

    #[test]
    fn memory_insert_row_checks_arity() {
        let backend = MemoryBackend::new();
        backend.create_table("pair", 2);
        let err = backend
            .insert_row("pair", vec![Value::Integer(1)], vec![])
            .unwrap_err();
        assert_eq!(err.code, codes::BAD_ARITY);
        assert!(backend.insert_row("missing", vec![], vec![]).is_err());
    }

    proptest! {
        #[test]
        fn memory_commit_matches_model(
            writes in prop::collection::vec((0i64..6, prop::option::of("[a-z]{1,8}")), 0..32),
            commit in any::<bool>(),
        ) {
            let backend = backend_with_people();
            let mut session = open_session(&backend);
            let upsert = prepare(
                &mut session,
                "upsert person",
                &[DataType::Integer, DataType::Text],
                &[],
            )
            .unwrap();
            let delete = prepare(&mut session, "delete person", &[DataType::Integer], &[]).unwrap();

            let mut model: BTreeMap<i64, String> = (0..3).map(|id| (id, format!("name {id}"))).collect();
            let committed = model.clone();
            for (id, name) in &writes {
                match name {
                    Some(name) => {
                        session.execute(upsert, &[Value::Integer(*id), Value::from(name.as_str())]).unwrap();
                        model.insert(*id, name.clone());
                    }
                    None => {
                        session.execute(delete, &[Value::Integer(*id)]).unwrap();
                        model.remove(id);
                    }
                }
            }

            let expected = if commit {
                session.commit().unwrap();
                model
            } else {
                session.rollback().unwrap();
                committed
            };
            prop_assert_eq!(backend.row_count("person"), expected.len());
            for (id, name) in &expected {
                prop_assert_eq!(
                    backend.row("person", &[Value::Integer(*id)]),
                    Some(vec![Value::from(name.as_str())])
                );
            }
        }
    }
}
