//! Test fixtures and database helpers.
//!
//! Provides a started database over the in-memory backend with a `person`
//! table, the statements that read and write it, and a storage caching it.

use std::sync::Arc;
use tessera_backend::{ConnectionParams, MemoryBackend};
use tessera_core::{
    Class, Connection, Database, DatabaseConfig, KeyEraser, KeyLoader, Object, ObjectRecorder,
    PrimaryKey, Repository, Statement, StatementParams, Storage, StorageConfig,
};
use tessera_data::{DataType, Value};

/// Name of the fixture table.
pub const PERSON_TABLE: &str = "person";

/// Name stored for preloaded record `id`.
pub fn person_name(id: i64) -> String {
    format!("the name {id}")
}

/// Primary key of record `id`.
pub fn person_key(id: i64) -> PrimaryKey {
    PrimaryKey::new().with("id", id)
}

/// A started test database with a preloaded `person` table.
pub struct TestDatabase {
    /// The backend, shared with the database.
    pub backend: MemoryBackend,
    /// The database instance.
    pub db: Arc<Database>,
    /// An open connection.
    pub connection: Arc<Connection>,
    /// `select person`: id in, name out.
    pub read: Arc<Statement>,
    /// `upsert person`: id and name in.
    pub write: Arc<Statement>,
    /// `update person`: id and name in; not found if absent.
    pub update: Arc<Statement>,
    /// `delete person`: id in.
    pub delete: Arc<Statement>,
    /// `scan person`: id and name out.
    pub scan: Arc<Statement>,
    /// The `person` class.
    pub class: Arc<Class>,
    /// Repository holding [`TestDatabase::storage`].
    pub repository: Repository,
    /// Storage of `person` objects.
    pub storage: Arc<Storage>,
}

impl TestDatabase {
    /// Creates a database with 10 preloaded records and default settings.
    pub fn new() -> Self {
        Self::preloaded(10)
    }

    /// Creates a database with records `0..records` and default settings.
    pub fn preloaded(records: i64) -> Self {
        Self::with_config(DatabaseConfig::default(), StorageConfig::default(), records)
    }

    /// Creates a database with the given settings and records `0..records`.
    pub fn with_config(
        db_config: DatabaseConfig,
        storage_config: StorageConfig,
        records: i64,
    ) -> Self {
        let backend = MemoryBackend::new();
        backend.create_table(PERSON_TABLE, 1);
        for id in 0..records {
            backend
                .insert_row(
                    PERSON_TABLE,
                    vec![Value::Integer(id)],
                    vec![Value::from(person_name(id))],
                )
                .expect("Failed to preload record");
        }

        let db = Database::new("test", backend.clone(), db_config);
        db.start();
        let connection = db
            .create_connection("main", &ConnectionParams::new())
            .expect("Failed to create connection");

        let keyed = || StatementParams::new().input("id", DataType::Integer);
        let read = db
            .create_statement("read", "select person", keyed().output("name", DataType::Text))
            .expect("Failed to create statement");
        let write = db
            .create_statement("write", "upsert person", keyed().input("name", DataType::Text))
            .expect("Failed to create statement");
        let update = db
            .create_statement("update", "update person", keyed().input("name", DataType::Text))
            .expect("Failed to create statement");
        let delete = db
            .create_statement("delete", "delete person", keyed())
            .expect("Failed to create statement");
        let scan = db
            .create_statement(
                "scan",
                "scan person",
                StatementParams::new()
                    .output("id", DataType::Integer)
                    .output("name", DataType::Text),
            )
            .expect("Failed to create statement");

        let class = Class::builder("person")
            .key("id", DataType::Integer)
            .field("name", DataType::Text)
            .build()
            .expect("Failed to build class");
        let repository = Repository::new("test");
        let storage = repository
            .create_storage("people", Arc::clone(&class), storage_config)
            .expect("Failed to create storage");

        Self {
            backend,
            db,
            connection,
            read,
            write,
            update,
            delete,
            scan,
            class,
            repository,
            storage,
        }
    }

    /// Creates and opens another connection.
    pub fn connect(&self, name: &str) -> Arc<Connection> {
        self.db
            .create_connection(name, &ConnectionParams::new())
            .expect("Failed to create connection")
    }

    /// Returns a loader for record `id`.
    pub fn loader(&self, id: i64) -> KeyLoader {
        KeyLoader::new(Arc::clone(&self.read), person_key(id))
    }

    /// Returns an upserting recorder for record `id`.
    pub fn recorder(&self, id: i64, name: &str) -> ObjectRecorder {
        ObjectRecorder::new(Arc::clone(&self.write), self.person(id, name))
    }

    /// Returns an eraser for record `id`.
    pub fn eraser(&self, id: i64) -> KeyEraser {
        KeyEraser::new(Arc::clone(&self.delete), person_key(id))
    }

    /// Builds a `person` object.
    pub fn person(&self, id: i64, name: &str) -> Object {
        let mut object =
            Object::new(Arc::clone(&self.class), person_key(id)).expect("Failed to build object");
        object.set("name", name).expect("Failed to set name");
        object
    }

    /// Returns the committed name of record `id`, read behind the cache.
    pub fn committed_name(&self, id: i64) -> Option<String> {
        self.backend
            .row(PERSON_TABLE, &[Value::Integer(id)])
            .and_then(|row| row.into_iter().next())
            .and_then(|value| value.as_text().ok().map(str::to_string))
    }
}

impl Default for TestDatabase {
    fn default() -> Self {
        Self::new()
    }
}

impl std::ops::Deref for TestDatabase {
    type Target = Database;

    fn deref(&self) -> &Self::Target {
        &self.db
    }
}

/// Runs a test with a fresh preloaded database.
///
/// # Example
///
/// ```rust,ignore
/// use tessera_testkit::with_test_db;
///
/// #[test]
/// fn my_test() {
///     with_test_db(|t| {
///         let ann = t.storage.load(&t.connection, &t.loader(1)).unwrap();
///         // ... test operations
///     });
/// }
/// ```
pub fn with_test_db<F, R>(f: F) -> R
where
    F: FnOnce(&TestDatabase) -> R,
{
    let test_db = TestDatabase::new();
    f(&test_db)
}
