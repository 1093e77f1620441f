//! Database and storage configuration.

use crate::types::AccessMode;

/// Configuration for a database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseConfig {
    /// Maximum number of connections the database may own.
    pub max_connections: usize,

    /// Default commit batching threshold for new guards (0 = commit after
    /// every write).
    pub max_commit_pending: usize,

    /// Whether new connections reopen themselves after a lost link.
    pub auto_recovery: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            max_connections: 32,
            max_commit_pending: 0,
            auto_recovery: true,
        }
    }
}

impl DatabaseConfig {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the maximum number of connections.
    #[must_use]
    pub const fn max_connections(mut self, value: usize) -> Self {
        self.max_connections = value;
        self
    }

    /// Sets the default commit batching threshold.
    #[must_use]
    pub const fn max_commit_pending(mut self, value: usize) -> Self {
        self.max_commit_pending = value;
        self
    }

    /// Sets whether connections recover automatically.
    #[must_use]
    pub const fn auto_recovery(mut self, value: bool) -> Self {
        self.auto_recovery = value;
        self
    }
}

/// Configuration for a [`crate::Storage`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageConfig {
    /// Maximum number of cached objects.
    pub max_cache_size: usize,

    /// Reload policy.
    pub access_mode: AccessMode,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            max_cache_size: 128,
            access_mode: AccessMode::ReadWrite,
        }
    }
}

impl StorageConfig {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the cache capacity. A capacity of 0 is treated as 1.
    #[must_use]
    pub const fn max_cache_size(mut self, value: usize) -> Self {
        self.max_cache_size = value;
        self
    }

    /// Sets the reload policy.
    #[must_use]
    pub const fn access_mode(mut self, value: AccessMode) -> Self {
        self.access_mode = value;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = DatabaseConfig::default();
        assert_eq!(config.max_connections, 32);
        assert_eq!(config.max_commit_pending, 0);
        assert!(config.auto_recovery);

        let storage = StorageConfig::default();
        assert_eq!(storage.max_cache_size, 128);
        assert_eq!(storage.access_mode, AccessMode::ReadWrite);
    }

    #[test]
    fn builder_pattern() {
        let config = DatabaseConfig::new()
            .max_connections(2)
            .max_commit_pending(10)
            .auto_recovery(false);

        assert_eq!(config.max_connections, 2);
        assert_eq!(config.max_commit_pending, 10);
        assert!(!config.auto_recovery);

        let storage = StorageConfig::new()
            .max_cache_size(5)
            .access_mode(AccessMode::ReadEver);
        assert_eq!(storage.max_cache_size, 5);
        assert_eq!(storage.access_mode, AccessMode::ReadEver);
    }
}
