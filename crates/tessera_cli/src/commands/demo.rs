//! Demo database shared by the commands.

use std::sync::Arc;
use tessera_backend::{ConnectionParams, MemoryBackend};
use tessera_core::{
    Class, Connection, Database, DatabaseConfig, KeyEraser, KeyLoader, Object, ObjectRecorder,
    PrimaryKey, Repository, Statement, StatementParams, Storage, StorageConfig,
};
use tessera_data::{DataType, Value};

const TABLE: &str = "person";

/// A started database over the in-memory backend with a `person` table.
pub struct Demo {
    /// The backend, shared with the database.
    pub backend: MemoryBackend,
    /// The database.
    pub db: Arc<Database>,
    /// The connection every command works through.
    pub connection: Arc<Connection>,
    /// The repository holding [`Demo::storage`].
    pub repository: Repository,
    /// Storage of `person` objects.
    pub storage: Arc<Storage>,
    read: Arc<Statement>,
    write: Arc<Statement>,
    delete: Arc<Statement>,
    class: Arc<Class>,
}

impl Demo {
    /// Builds the demo database with records `0..records`.
    pub fn new(
        records: i64,
        db_config: DatabaseConfig,
        storage_config: StorageConfig,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let backend = MemoryBackend::new();
        backend.create_table(TABLE, 1);
        for id in 0..records {
            backend.insert_row(
                TABLE,
                vec![Value::Integer(id)],
                vec![Value::from(format!("the name {id}"))],
            )?;
        }

        let db = Database::new("demo", backend.clone(), db_config);
        db.start();
        let connection = db.create_connection("main", &ConnectionParams::new())?;

        let keyed = || StatementParams::new().input("id", DataType::Integer);
        let read = db.create_statement(
            "read",
            "select person",
            keyed().output("name", DataType::Text),
        )?;
        let write = db.create_statement(
            "write",
            "upsert person",
            keyed().input("name", DataType::Text),
        )?;
        let delete = db.create_statement("delete", "delete person", keyed())?;

        let class = Class::builder(TABLE)
            .key("id", DataType::Integer)
            .field("name", DataType::Text)
            .build()?;
        let repository = Repository::new("demo");
        let storage = repository.create_storage("people", Arc::clone(&class), storage_config)?;

        Ok(Self {
            backend,
            db,
            connection,
            repository,
            storage,
            read,
            write,
            delete,
            class,
        })
    }

    /// Returns a loader for record `id`.
    pub fn loader(&self, id: i64) -> KeyLoader {
        KeyLoader::new(Arc::clone(&self.read), key(id))
    }

    /// Returns an upserting recorder for record `id`.
    pub fn recorder(&self, id: i64, name: &str) -> Result<ObjectRecorder, Box<dyn std::error::Error>> {
        let mut object = Object::new(Arc::clone(&self.class), key(id))?;
        object.set("name", name)?;
        Ok(ObjectRecorder::new(Arc::clone(&self.write), object))
    }

    /// Returns an eraser for record `id`.
    pub fn eraser(&self, id: i64) -> KeyEraser {
        KeyEraser::new(Arc::clone(&self.delete), key(id))
    }
}

fn key(id: i64) -> PrimaryKey {
    PrimaryKey::new().with("id", id)
}
