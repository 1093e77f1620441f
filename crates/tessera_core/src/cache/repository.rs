//! Named collection of storages.

use super::Storage;
use crate::config::StorageConfig;
use crate::diagnostics::RepositorySnapshot;
use crate::error::{CoreError, CoreResult};
use crate::schema::Class;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

/// A named set of [`Storage`]s.
#[derive(Debug)]
pub struct Repository {
    name: String,
    storages: RwLock<BTreeMap<String, Arc<Storage>>>,
}

impl Repository {
    /// Creates an empty repository.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            storages: RwLock::new(BTreeMap::new()),
        }
    }

    /// Returns the repository name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Creates and registers a storage.
    ///
    /// # Errors
    ///
    /// Returns `DuplicateName` if a storage with this name exists.
    pub fn create_storage(
        &self,
        name: &str,
        class: Arc<Class>,
        config: StorageConfig,
    ) -> CoreResult<Arc<Storage>> {
        let mut storages = self.storages.write();
        if storages.contains_key(name) {
            return Err(CoreError::duplicate("storage", name));
        }
        let storage = Arc::new(Storage::new(name, class, config));
        storages.insert(name.to_string(), Arc::clone(&storage));
        debug!(repository = %self.name, storage = name, "storage registered");
        Ok(storage)
    }

    /// Looks up a storage by name.
    ///
    /// # Errors
    ///
    /// Returns `StorageNotFound` if no storage has this name.
    pub fn find_storage(&self, name: &str) -> CoreResult<Arc<Storage>> {
        self.storages
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| CoreError::StorageNotFound {
                name: name.to_string(),
            })
    }

    /// Returns every storage, ordered by name.
    pub fn storages(&self) -> Vec<Arc<Storage>> {
        self.storages.read().values().cloned().collect()
    }

    /// Returns a serializable view of every storage.
    pub fn snapshot(&self) -> RepositorySnapshot {
        RepositorySnapshot {
            name: self.name.clone(),
            storages: self.storages().iter().map(|s| s.snapshot()).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tessera_data::DataType;

    fn class() -> Arc<Class> {
        Class::builder("person")
            .key("id", DataType::Integer)
            .build()
            .unwrap()
    }

    #[test]
    fn create_and_find() {
        let repo = Repository::new("app");
        repo.create_storage("b", class(), StorageConfig::default())
            .unwrap();
        repo.create_storage("a", class(), StorageConfig::default())
            .unwrap();

        assert_eq!(repo.find_storage("a").unwrap().name(), "a");
        let names: Vec<_> = repo
            .storages()
            .iter()
            .map(|s| s.name().to_string())
            .collect();
        assert_eq!(names, vec!["a", "b"]);
        assert!(matches!(
            repo.find_storage("c"),
            Err(CoreError::StorageNotFound { .. })
        ));
    }

    #[test]
    fn duplicate_storage() {
        let repo = Repository::new("app");
        repo.create_storage("a", class(), StorageConfig::default())
            .unwrap();
        let err = repo
            .create_storage("a", class(), StorageConfig::default())
            .unwrap_err();
        assert!(matches!(err, CoreError::DuplicateName { kind: "storage", .. }));
    }

    #[test]
    fn snapshot() {
        let repo = Repository::new("app");
        repo.create_storage("a", class(), StorageConfig::new().max_cache_size(4))
            .unwrap();
        let snap = repo.snapshot();
        assert_eq!(snap.name, "app");
        assert_eq!(snap.storages[0].max_cache_size, 4);
        assert_eq!(snap.storages[0].cached, 0);
    }
}
