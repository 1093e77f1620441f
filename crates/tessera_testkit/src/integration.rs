//! Cross-crate integration test helpers.
//!
//! Provides a harness that drives a storage and checks every answer
//! against a plain map of what the backend should hold.

use crate::fixtures::{person_key, person_name, TestDatabase};
use crate::generators::CacheOp;
use std::collections::BTreeMap;
use tessera_core::{CoreError, CoreResult, DatabaseConfig, StorageConfig};

/// A test harness for integration testing.
pub struct IntegrationHarness {
    /// The database under test.
    pub db: TestDatabase,
    /// Expected committed rows.
    expected: BTreeMap<i64, String>,
}

impl IntegrationHarness {
    /// Creates a harness over `records` preloaded records.
    pub fn new(records: i64, storage_config: StorageConfig) -> Self {
        let db = TestDatabase::with_config(DatabaseConfig::default(), storage_config, records);
        let expected = (0..records).map(|id| (id, person_name(id))).collect();
        Self { db, expected }
    }

    /// Applies one operation through the storage and verifies its outcome.
    pub fn apply(&mut self, op: &CacheOp) {
        let t = &self.db;
        match op {
            CacheOp::Load(id) => {
                let result = t.storage.load(&t.connection, &t.loader(*id));
                self.check_load(*id, result.map(|o| o.get_text("name").map(str::to_string)));
            }
            CacheOp::Save(id, name) => {
                t.storage
                    .save(&t.connection, &t.recorder(*id, name))
                    .expect("Failed to save");
                self.expected.insert(*id, name.clone());
            }
            CacheOp::Erase(id) => {
                let result = t.storage.erase(&t.connection, &t.eraser(*id));
                match self.expected.remove(id) {
                    Some(_) => result.expect("Failed to erase"),
                    None => assert!(
                        matches!(result, Err(CoreError::ObjectNotFound { .. })),
                        "erase of missing {id} returned {result:?}"
                    ),
                }
                assert!(!t.storage.contains(&person_key(*id)));
            }
        }
    }

    fn check_load(&self, id: i64, result: CoreResult<CoreResult<String>>) {
        match (self.expected.get(&id), result) {
            (Some(expected), Ok(Ok(name))) => assert_eq!(&name, expected, "record {id}"),
            (None, Err(CoreError::ObjectNotFound { .. })) => {}
            (expected, other) => panic!("load {id}: expected {expected:?}, got {other:?}"),
        }
    }

    /// Verifies that the backend holds exactly the expected rows.
    pub fn verify_backend(&self) {
        let t = &self.db;
        assert_eq!(
            t.backend.row_count(crate::fixtures::PERSON_TABLE),
            self.expected.len()
        );
        for (id, name) in &self.expected {
            assert_eq!(t.committed_name(*id).as_deref(), Some(name.as_str()));
        }
    }

    /// Verifies the cache never holds more than its capacity.
    pub fn verify_cache_bound(&self) {
        let storage = &self.db.storage;
        assert!(storage.len() <= storage.max_cache_size());
    }

    /// Returns the expected rows.
    pub fn expected(&self) -> &BTreeMap<i64, String> {
        &self.expected
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn harness_tracks_writes() {
        let mut harness = IntegrationHarness::new(3, StorageConfig::default());
        harness.apply(&CacheOp::Load(1));
        harness.apply(&CacheOp::Save(1, "renamed".into()));
        harness.apply(&CacheOp::Load(1));
        harness.apply(&CacheOp::Erase(2));
        harness.apply(&CacheOp::Load(2));
        harness.apply(&CacheOp::Erase(2));
        harness.verify_backend();
        harness.verify_cache_bound();
        assert_eq!(harness.expected().len(), 2);
    }
}
