//! Object cache over a class.

use super::lru::LruMap;
use super::strategy::{Eraser, Loader, Recorder};
use crate::config::StorageConfig;
use crate::connection::Connection;
use crate::diagnostics::StorageSnapshot;
use crate::error::{CoreError, CoreResult};
use crate::guard::{GuardConnection, GuardStatement};
use crate::schema::{Class, Object, PrimaryKey};
use crate::types::AccessMode;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::trace;

/// Cache map shared between a storage and the guards whose uncommitted
/// writes it holds.
pub(crate) type SharedCache = Arc<Mutex<LruMap<PrimaryKey, Arc<Object>>>>;

/// LRU cache of objects of one class, keyed by primary key.
///
/// Reads go to the backend only on a cache miss, or when the access mode
/// asks for a reload. Writes and erases go to the backend first and touch
/// the cache only once the statement succeeded.
///
/// Each operation has two forms: `load(&connection, ..)` runs under a
/// guard of its own, `load_in(&guard, ..)` joins the caller's guard and
/// its commit window.
///
/// An entry cached while its guard still has pending writes is evicted if
/// that guard rolls back or loses its connection, so the cache never keeps
/// data the backend discarded.
#[derive(Debug)]
pub struct Storage {
    name: String,
    class: Arc<Class>,
    config: StorageConfig,
    cache: SharedCache,
    faults: AtomicU64,
    hits: AtomicU64,
}

impl Storage {
    /// Creates an empty storage.
    pub fn new(name: impl Into<String>, class: Arc<Class>, config: StorageConfig) -> Self {
        Self {
            name: name.into(),
            class,
            cache: Arc::new(Mutex::new(LruMap::new(config.max_cache_size))),
            config,
            faults: AtomicU64::new(0),
            hits: AtomicU64::new(0),
        }
    }

    /// Returns the storage name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the class of cached objects.
    pub fn class(&self) -> &Arc<Class> {
        &self.class
    }

    /// Returns the reload policy.
    pub fn access_mode(&self) -> AccessMode {
        self.config.access_mode
    }

    /// Returns the cache capacity.
    pub fn max_cache_size(&self) -> usize {
        self.config.max_cache_size.max(1)
    }

    /// Returns the number of loads that went to the backend.
    pub fn fault_counter(&self) -> u64 {
        self.faults.load(Ordering::Relaxed)
    }

    /// Returns the number of loads served from the cache.
    pub fn hit_counter(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    /// Returns the number of cached objects.
    pub fn len(&self) -> usize {
        self.cache.lock().len()
    }

    /// Returns true if nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns true if `key` is cached.
    pub fn contains(&self, key: &PrimaryKey) -> bool {
        self.cache.lock().contains(key)
    }

    /// Returns the cached object for `key` without touching the backend or
    /// the counters.
    pub fn cached(&self, key: &PrimaryKey) -> Option<Arc<Object>> {
        self.cache.lock().peek(key).cloned()
    }

    /// Drops every cached object. Counters are kept.
    pub fn clear(&self) {
        self.cache.lock().clear();
    }

    /// Loads an object under a guard of its own.
    ///
    /// # Errors
    ///
    /// See [`load_in`](Self::load_in); also fails if no guard can be
    /// acquired on `connection`.
    pub fn load(&self, connection: &Connection, loader: &dyn Loader) -> CoreResult<Arc<Object>> {
        let guard = GuardConnection::new(connection)?;
        let object = self.load_in(&guard, loader)?;
        guard.finish()?;
        Ok(object)
    }

    /// Loads an object, from the cache when the access mode allows it.
    ///
    /// # Errors
    ///
    /// - `KeyMismatch` if the loader's key does not fit the class
    /// - `ObjectNotFound` if the backend has no row for the key
    /// - any backend or data error from the statement
    ///
    /// The cache is unchanged on error.
    pub fn load_in(
        &self,
        guard: &GuardConnection<'_>,
        loader: &dyn Loader,
    ) -> CoreResult<Arc<Object>> {
        let key = loader.key();
        self.class.check_key(key)?;

        if let Some(object) = self.cached(key) {
            let reload = match self.config.access_mode {
                AccessMode::ReadOnly => false,
                AccessMode::ReadWrite => loader.has_to_refresh(loader.statement(), &object)?,
                AccessMode::ReadEver => true,
            };
            if !reload {
                self.cache.lock().get(key);
                self.hits.fetch_add(1, Ordering::Relaxed);
                trace!(storage = %self.name, %key, "cache hit");
                return Ok(object);
            }
        }

        let mut statement = GuardStatement::new(guard, loader.statement())?;
        loader.initialize(&mut statement)?;
        let code = statement.execute()?;
        if code.not_found()? || !statement.fetch()? {
            return Err(self.not_found(key));
        }
        let mut object = Object::new(Arc::clone(&self.class), key.clone())?;
        loader.apply(&statement, &mut object)?;
        drop(statement);

        let object = Arc::new(object);
        self.cache.lock().insert(key.clone(), Arc::clone(&object));
        guard.track_uncommitted(&self.cache, key);
        self.faults.fetch_add(1, Ordering::Relaxed);
        trace!(storage = %self.name, %key, "cache fault");
        Ok(object)
    }

    /// Writes an object under a guard of its own.
    ///
    /// # Errors
    ///
    /// See [`save_in`](Self::save_in). If the final commit fails the write
    /// is rolled back and the object is not left in the cache.
    pub fn save(&self, connection: &Connection, recorder: &dyn Recorder) -> CoreResult<Arc<Object>> {
        let guard = GuardConnection::new(connection)?;
        let object = self.save_in(&guard, recorder)?;
        guard.finish()?;
        Ok(object)
    }

    /// Writes an object and caches it.
    ///
    /// # Errors
    ///
    /// - `InvalidOperation` on a read-only storage or for an object of
    ///   another class
    /// - `KeyMismatch` if the object's key does not fit the class
    /// - `ObjectNotFound` if the backend found no row to update
    /// - any backend or data error from the statement
    ///
    /// The cache is unchanged on error. While the write is pending, the
    /// cached object is tied to `guard` and evicted if the guard rolls back.
    pub fn save_in(
        &self,
        guard: &GuardConnection<'_>,
        recorder: &dyn Recorder,
    ) -> CoreResult<Arc<Object>> {
        self.ensure_writable("save")?;
        let object = recorder.object();
        if object.class().name() != self.class.name() {
            return Err(CoreError::invalid_operation(format!(
                "storage {} holds {} objects, not {}",
                self.name,
                self.class.name(),
                object.class().name()
            )));
        }
        self.class.check_key(object.key())?;

        let mut statement = GuardStatement::new(guard, recorder.statement())?;
        recorder.apply(&mut statement)?;
        let code = statement.execute()?;
        drop(statement);
        if code.not_found()? {
            return Err(self.not_found(object.key()));
        }
        if recorder.auto_commit() {
            guard.commit()?;
        }

        let object = Arc::new(object.clone());
        self.cache
            .lock()
            .insert(object.key().clone(), Arc::clone(&object));
        guard.track_uncommitted(&self.cache, object.key());
        trace!(storage = %self.name, key = %object.key(), "object saved");
        Ok(object)
    }

    /// Erases an object under a guard of its own.
    ///
    /// # Errors
    ///
    /// See [`erase_in`](Self::erase_in).
    pub fn erase(&self, connection: &Connection, eraser: &dyn Eraser) -> CoreResult<()> {
        let guard = GuardConnection::new(connection)?;
        self.erase_in(&guard, eraser)?;
        guard.finish()
    }

    /// Erases an object and drops it from the cache.
    ///
    /// # Errors
    ///
    /// - `InvalidOperation` on a read-only storage
    /// - `KeyMismatch` if the key does not fit the class
    /// - `ObjectNotFound` if the backend had no such row; a stale cached
    ///   copy is dropped all the same
    /// - any backend or data error from the statement
    pub fn erase_in(&self, guard: &GuardConnection<'_>, eraser: &dyn Eraser) -> CoreResult<()> {
        self.ensure_writable("erase")?;
        let key = eraser.key();
        self.class.check_key(key)?;

        let mut statement = GuardStatement::new(guard, eraser.statement())?;
        eraser.apply(&mut statement)?;
        let code = statement.execute()?;
        drop(statement);

        self.cache.lock().remove(key);
        if code.not_found()? {
            return Err(self.not_found(key));
        }
        trace!(storage = %self.name, %key, "object erased");
        Ok(())
    }

    fn ensure_writable(&self, operation: &str) -> CoreResult<()> {
        if self.config.access_mode == AccessMode::ReadOnly {
            return Err(CoreError::invalid_operation(format!(
                "cannot {operation} through read-only storage {}",
                self.name
            )));
        }
        Ok(())
    }

    fn not_found(&self, key: &PrimaryKey) -> CoreError {
        CoreError::ObjectNotFound {
            storage: self.name.clone(),
            key: key.to_string(),
        }
    }

    /// Returns a serializable view of this storage.
    pub fn snapshot(&self) -> StorageSnapshot {
        StorageSnapshot {
            name: self.name.clone(),
            class: self.class.name().to_string(),
            access_mode: self.config.access_mode,
            max_cache_size: self.max_cache_size(),
            cached: self.len(),
            faults: self.fault_counter(),
            hits: self.hit_counter(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::strategy::{KeyEraser, KeyLoader, ObjectRecorder};
    use crate::config::DatabaseConfig;
    use crate::database::Database;
    use crate::statement::{Statement, StatementParams};
    use tessera_backend::{codes, ConnectionParams, MemoryBackend};
    use tessera_data::{DataType, Value};

    struct Fixture {
        backend: MemoryBackend,
        _db: Arc<Database>,
        conn: Arc<Connection>,
        read: Arc<Statement>,
        write: Arc<Statement>,
        delete: Arc<Statement>,
        class: Arc<Class>,
    }

    fn fixture() -> Fixture {
        let backend = MemoryBackend::new();
        backend.create_table("person", 1);
        for id in 0..10 {
            backend
                .insert_row(
                    "person",
                    vec![Value::Integer(id)],
                    vec![Value::from(format!("the name {id}"))],
                )
                .unwrap();
        }
        let db = Database::new("test", backend.clone(), DatabaseConfig::default());
        db.start();
        let conn = db.create_connection("c1", &ConnectionParams::new()).unwrap();
        let read = db
            .create_statement(
                "read",
                "select person",
                StatementParams::new()
                    .input("id", DataType::Integer)
                    .output("name", DataType::Text),
            )
            .unwrap();
        let write = db
            .create_statement(
                "write",
                "update person",
                StatementParams::new()
                    .input("id", DataType::Integer)
                    .input("name", DataType::Text),
            )
            .unwrap();
        let delete = db
            .create_statement(
                "delete",
                "delete person",
                StatementParams::new().input("id", DataType::Integer),
            )
            .unwrap();
        let class = Class::builder("person")
            .key("id", DataType::Integer)
            .field("name", DataType::Text)
            .build()
            .unwrap();
        Fixture {
            backend,
            _db: db,
            conn,
            read,
            write,
            delete,
            class,
        }
    }

    fn key(id: i64) -> PrimaryKey {
        PrimaryKey::new().with("id", id)
    }

    fn renamed(f: &Fixture, id: i64, name: &str) -> ObjectRecorder {
        let mut object = Object::new(Arc::clone(&f.class), key(id)).unwrap();
        object.set("name", name).unwrap();
        ObjectRecorder::new(Arc::clone(&f.write), object)
    }

    #[test]
    fn load_faults_then_hits() {
        let f = fixture();
        let storage = Storage::new("people", Arc::clone(&f.class), StorageConfig::default());
        let loader = KeyLoader::new(Arc::clone(&f.read), key(6));

        let object = storage.load(&f.conn, &loader).unwrap();
        assert_eq!(object.get_text("name").unwrap(), "the name 6");
        assert_eq!((storage.fault_counter(), storage.hit_counter()), (1, 0));

        let again = storage.load(&f.conn, &loader).unwrap();
        assert!(Arc::ptr_eq(&object, &again));
        assert_eq!((storage.fault_counter(), storage.hit_counter()), (1, 1));
    }

    #[test]
    fn missing_row_is_not_cached() {
        let f = fixture();
        let storage = Storage::new("people", Arc::clone(&f.class), StorageConfig::default());
        let loader = KeyLoader::new(Arc::clone(&f.read), key(42));
        let err = storage.load(&f.conn, &loader).unwrap_err();
        assert!(matches!(err, CoreError::ObjectNotFound { .. }));
        assert!(storage.is_empty());
        assert_eq!(storage.fault_counter(), 0);
    }

    #[test]
    fn bad_key_is_rejected_before_execution() {
        let f = fixture();
        let storage = Storage::new("people", Arc::clone(&f.class), StorageConfig::default());
        let loader = KeyLoader::new(Arc::clone(&f.read), PrimaryKey::new().with("id", "six"));
        let err = storage.load(&f.conn, &loader).unwrap_err();
        assert!(matches!(err, CoreError::KeyMismatch { .. }));
        assert_eq!(f.conn.stats().operations(), 0);
    }

    #[test]
    fn eviction_at_capacity() {
        let f = fixture();
        let storage = Storage::new(
            "people",
            Arc::clone(&f.class),
            StorageConfig::new().max_cache_size(3),
        );
        for id in 0..3 {
            storage
                .load(&f.conn, &KeyLoader::new(Arc::clone(&f.read), key(id)))
                .unwrap();
        }
        // touch 0 so that 1 is the oldest
        storage
            .load(&f.conn, &KeyLoader::new(Arc::clone(&f.read), key(0)))
            .unwrap();
        storage
            .load(&f.conn, &KeyLoader::new(Arc::clone(&f.read), key(3)))
            .unwrap();

        assert_eq!(storage.len(), 3);
        assert!(!storage.contains(&key(1)));
        assert!(storage.contains(&key(0)));
        assert!(storage.contains(&key(2)));
        assert!(storage.contains(&key(3)));
    }

    #[test]
    fn save_updates_backend_and_cache() {
        let f = fixture();
        let storage = Storage::new("people", Arc::clone(&f.class), StorageConfig::default());
        let mut object = Object::new(Arc::clone(&f.class), key(3)).unwrap();
        object.set("name", "renamed").unwrap();

        storage
            .save(&f.conn, &ObjectRecorder::new(Arc::clone(&f.write), object))
            .unwrap();
        assert_eq!(
            f.backend.row("person", &[Value::Integer(3)]),
            Some(vec![Value::from("renamed")])
        );
        let cached = storage.cached(&key(3)).unwrap();
        assert_eq!(cached.get_text("name").unwrap(), "renamed");
    }

    #[test]
    fn save_of_missing_row_fails() {
        let f = fixture();
        let storage = Storage::new("people", Arc::clone(&f.class), StorageConfig::default());
        let object = Object::new(Arc::clone(&f.class), key(99)).unwrap();
        let err = storage
            .save(&f.conn, &ObjectRecorder::new(Arc::clone(&f.write), object))
            .unwrap_err();
        assert!(matches!(err, CoreError::ObjectNotFound { .. }));
        assert!(storage.is_empty());
    }

    #[test]
    fn auto_commit_inside_batch() {
        let f = fixture();
        let storage = Storage::new("people", Arc::clone(&f.class), StorageConfig::default());
        let guard = GuardConnection::new(&f.conn).unwrap();
        guard.set_max_commit_pending(100);

        let mut object = Object::new(Arc::clone(&f.class), key(1)).unwrap();
        object.set("name", "one").unwrap();
        storage
            .save_in(&guard, &ObjectRecorder::new(Arc::clone(&f.write), object.clone()))
            .unwrap();
        assert_eq!(guard.pending(), 1);
        assert_eq!(f.backend.commit_count(), 0);

        storage
            .save_in(
                &guard,
                &ObjectRecorder::new(Arc::clone(&f.write), object).enable_auto_commit(),
            )
            .unwrap();
        assert_eq!(guard.pending(), 0);
        assert_eq!(f.backend.commit_count(), 1);
    }

    #[test]
    fn erase_then_load_fails() {
        let f = fixture();
        let storage = Storage::new("people", Arc::clone(&f.class), StorageConfig::default());
        storage
            .load(&f.conn, &KeyLoader::new(Arc::clone(&f.read), key(6)))
            .unwrap();
        storage
            .erase(&f.conn, &KeyEraser::new(Arc::clone(&f.delete), key(6)))
            .unwrap();
        assert!(!storage.contains(&key(6)));

        let err = storage
            .load(&f.conn, &KeyLoader::new(Arc::clone(&f.read), key(6)))
            .unwrap_err();
        assert!(matches!(err, CoreError::ObjectNotFound { .. }));
    }

    #[test]
    fn read_ever_always_faults() {
        let f = fixture();
        let storage = Storage::new(
            "people",
            Arc::clone(&f.class),
            StorageConfig::new().access_mode(AccessMode::ReadEver),
        );
        let loader = KeyLoader::new(Arc::clone(&f.read), key(2));
        storage.load(&f.conn, &loader).unwrap();
        storage.load(&f.conn, &loader).unwrap();
        assert_eq!((storage.fault_counter(), storage.hit_counter()), (2, 0));
    }

    #[test]
    fn forced_refresh_in_read_write_mode() {
        let f = fixture();
        let storage = Storage::new("people", Arc::clone(&f.class), StorageConfig::default());
        storage
            .load(&f.conn, &KeyLoader::new(Arc::clone(&f.read), key(2)))
            .unwrap();
        f.backend
            .insert_row("person", vec![Value::Integer(2)], vec![Value::from("changed")])
            .unwrap();

        let stale = storage
            .load(&f.conn, &KeyLoader::new(Arc::clone(&f.read), key(2)))
            .unwrap();
        assert_eq!(stale.get_text("name").unwrap(), "the name 2");

        let fresh = storage
            .load(
                &f.conn,
                &KeyLoader::new(Arc::clone(&f.read), key(2)).force_refresh(),
            )
            .unwrap();
        assert_eq!(fresh.get_text("name").unwrap(), "changed");
        assert_eq!((storage.fault_counter(), storage.hit_counter()), (2, 1));
    }

    #[test]
    fn read_only_rejects_writes_and_never_reloads() {
        let f = fixture();
        let storage = Storage::new(
            "people",
            Arc::clone(&f.class),
            StorageConfig::new().access_mode(AccessMode::ReadOnly),
        );
        let loader = KeyLoader::new(Arc::clone(&f.read), key(2)).force_refresh();
        storage.load(&f.conn, &loader).unwrap();
        storage.load(&f.conn, &loader).unwrap();
        assert_eq!((storage.fault_counter(), storage.hit_counter()), (1, 1));

        let object = Object::new(Arc::clone(&f.class), key(2)).unwrap();
        let err = storage
            .save(&f.conn, &ObjectRecorder::new(Arc::clone(&f.write), object))
            .unwrap_err();
        assert!(matches!(err, CoreError::InvalidOperation { .. }));
        let err = storage
            .erase(&f.conn, &KeyEraser::new(Arc::clone(&f.delete), key(2)))
            .unwrap_err();
        assert!(matches!(err, CoreError::InvalidOperation { .. }));
        assert_eq!(f.backend.row_count("person"), 10);
    }

    #[test]
    fn rollback_evicts_uncommitted_entries() {
        let f = fixture();
        let storage = Storage::new("people", Arc::clone(&f.class), StorageConfig::default());
        let guard = GuardConnection::new(&f.conn).unwrap();
        guard.set_max_commit_pending(10);

        storage.save_in(&guard, &renamed(&f, 5, "draft")).unwrap();
        assert!(storage.contains(&key(5)));
        guard.rollback().unwrap();
        assert!(!storage.contains(&key(5)));
        drop(guard);

        let object = storage
            .load(&f.conn, &KeyLoader::new(Arc::clone(&f.read), key(5)))
            .unwrap();
        assert_eq!(object.get_text("name").unwrap(), "the name 5");
        assert_eq!((storage.fault_counter(), storage.hit_counter()), (1, 0));
    }

    #[test]
    fn failed_statement_evicts_uncommitted_entries() {
        let f = fixture();
        let storage = Storage::new("people", Arc::clone(&f.class), StorageConfig::default());
        let guard = GuardConnection::new(&f.conn).unwrap();
        guard.set_max_commit_pending(10);

        storage.save_in(&guard, &renamed(&f, 5, "draft")).unwrap();
        f.backend.fail_next_execute(codes::LOCKED);
        let err = storage.save_in(&guard, &renamed(&f, 6, "other")).unwrap_err();
        assert!(err.is_locked());
        assert_eq!(guard.pending(), 0);
        assert!(!storage.contains(&key(5)));
        assert!(!storage.contains(&key(6)));
    }

    #[test]
    fn committed_entries_survive_later_rollback() {
        let f = fixture();
        let storage = Storage::new("people", Arc::clone(&f.class), StorageConfig::default());
        let guard = GuardConnection::new(&f.conn).unwrap();
        guard.set_max_commit_pending(2);

        storage.save_in(&guard, &renamed(&f, 1, "one")).unwrap();
        storage.save_in(&guard, &renamed(&f, 2, "two")).unwrap();
        assert_eq!(f.backend.commit_count(), 1);
        storage.save_in(&guard, &renamed(&f, 3, "three")).unwrap();
        guard.rollback().unwrap();

        assert!(storage.contains(&key(1)));
        assert!(storage.contains(&key(2)));
        assert!(!storage.contains(&key(3)));
    }

    #[test]
    fn lost_connection_evicts_uncommitted_entries() {
        let f = fixture();
        let storage = Storage::new("people", Arc::clone(&f.class), StorageConfig::default());
        let guard = GuardConnection::new(&f.conn).unwrap();
        guard.set_max_commit_pending(10);

        storage
            .load_in(&guard, &KeyLoader::new(Arc::clone(&f.read), key(7)))
            .unwrap();
        storage.save_in(&guard, &renamed(&f, 5, "draft")).unwrap();
        guard.manual_break();
        assert!(guard.commit().unwrap_err().is_lost_connection());

        assert!(!storage.contains(&key(5)));
        assert!(storage.contains(&key(7)));
        assert_eq!(
            f.backend.row("person", &[Value::Integer(5)]),
            Some(vec![Value::from("the name 5")])
        );
    }

    #[test]
    fn loads_of_pending_writes_are_evicted_on_rollback() {
        let f = fixture();
        let storage = Storage::new("people", Arc::clone(&f.class), StorageConfig::default());
        let guard = GuardConnection::new(&f.conn).unwrap();
        guard.set_max_commit_pending(10);

        storage.save_in(&guard, &renamed(&f, 5, "draft")).unwrap();
        storage.clear();
        let object = storage
            .load_in(&guard, &KeyLoader::new(Arc::clone(&f.read), key(5)))
            .unwrap();
        assert_eq!(object.get_text("name").unwrap(), "draft");

        guard.rollback().unwrap();
        assert!(!storage.contains(&key(5)));
    }
}
