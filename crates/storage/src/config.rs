//! Database configuration.

use std::time::Duration;

/// Backing structure for an index.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum IndexKind {
    /// Red-black tree: point lookups and range scans.
    #[default]
    Tree,
    /// Hash map: point lookups only.
    Hash,
}

/// Configuration for a database instance.
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// How long the default lock manager blocks before failing a request.
    pub lock_timeout: Duration,

    /// Whether the default lock manager checks for wait cycles before blocking.
    pub deadlock_detection: bool,

    /// Backing structure of the primary index of new tables.
    pub default_index_kind: IndexKind,

    /// Whether a new relation validates every existing foreign row.
    pub validate_relations_on_create: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            lock_timeout: Duration::from_secs(10),
            deadlock_detection: true,
            default_index_kind: IndexKind::Tree,
            validate_relations_on_create: true,
        }
    }
}

impl DatabaseConfig {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the lock acquisition timeout.
    #[must_use]
    pub const fn lock_timeout(mut self, timeout: Duration) -> Self {
        self.lock_timeout = timeout;
        self
    }

    /// Sets whether wait cycles are detected.
    #[must_use]
    pub const fn deadlock_detection(mut self, value: bool) -> Self {
        self.deadlock_detection = value;
        self
    }

    /// Sets the primary index kind for new tables.
    #[must_use]
    pub const fn default_index_kind(mut self, kind: IndexKind) -> Self {
        self.default_index_kind = kind;
        self
    }

    /// Sets whether relations validate existing rows when created.
    #[must_use]
    pub const fn validate_relations_on_create(mut self, value: bool) -> Self {
        self.validate_relations_on_create = value;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = DatabaseConfig::default();
        assert_eq!(config.lock_timeout, Duration::from_secs(10));
        assert!(config.deadlock_detection);
        assert_eq!(config.default_index_kind, IndexKind::Tree);
        assert!(config.validate_relations_on_create);
    }

    #[test]
    fn builder_pattern() {
        let config = DatabaseConfig::new()
            .lock_timeout(Duration::from_millis(50))
            .deadlock_detection(false)
            .default_index_kind(IndexKind::Hash)
            .validate_relations_on_create(false);

        assert_eq!(config.lock_timeout, Duration::from_millis(50));
        assert!(!config.deadlock_detection);
        assert_eq!(config.default_index_kind, IndexKind::Hash);
        assert!(!config.validate_relations_on_create);
    }
}
