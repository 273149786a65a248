//! Database configuration.

/// What the index synchronizer does when the search index rejects a write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IndexFailurePolicy {
    /// Return the adapter error from `commit`. The data commit has already
    /// happened, so the index stays behind until the next write or reindex.
    #[default]
    Propagate,
    /// Log the failure and keep the operation for
    /// [`IndexSynchronizer::retry_deferred`](crate::IndexSynchronizer::retry_deferred).
    Defer,
}

/// Configuration for opening a database.
#[derive(Debug, Clone)]
pub struct Config {
    /// Whether to create the database directory if it doesn't exist.
    pub create_if_missing: bool,

    /// Whether to error if the database directory already holds a journal.
    pub error_if_exists: bool,

    /// Whether to flush the journal on every commit.
    pub sync_on_commit: bool,

    /// How adapter failures during post-commit replay are handled.
    pub index_failure_policy: IndexFailurePolicy,

    /// Page size used when a caller does not pick one.
    pub default_per_page: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            create_if_missing: true,
            error_if_exists: false,
            sync_on_commit: true,
            index_failure_policy: IndexFailurePolicy::Propagate,
            default_per_page: 25,
        }
    }
}

impl Config {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets whether to create the database if missing.
    #[must_use]
    pub const fn create_if_missing(mut self, value: bool) -> Self {
        self.create_if_missing = value;
        self
    }

    /// Sets whether to error if the database exists.
    #[must_use]
    pub const fn error_if_exists(mut self, value: bool) -> Self {
        self.error_if_exists = value;
        self
    }

    /// Sets whether to flush the journal on every commit.
    #[must_use]
    pub const fn sync_on_commit(mut self, value: bool) -> Self {
        self.sync_on_commit = value;
        self
    }

    /// Sets the index failure policy.
    #[must_use]
    pub const fn index_failure_policy(mut self, policy: IndexFailurePolicy) -> Self {
        self.index_failure_policy = policy;
        self
    }

    /// Sets the default page size for searches.
    #[must_use]
    pub const fn default_per_page(mut self, per_page: usize) -> Self {
        self.default_per_page = per_page;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = Config::default();
        assert!(config.create_if_missing);
        assert!(!config.error_if_exists);
        assert!(config.sync_on_commit);
        assert_eq!(config.index_failure_policy, IndexFailurePolicy::Propagate);
        assert_eq!(config.default_per_page, 25);
    }

    #[test]
    fn builder_pattern() {
        let config = Config::new()
            .create_if_missing(false)
            .sync_on_commit(false)
            .index_failure_policy(IndexFailurePolicy::Defer)
            .default_per_page(10);

        assert!(!config.create_if_missing);
        assert!(!config.sync_on_commit);
        assert_eq!(config.index_failure_policy, IndexFailurePolicy::Defer);
        assert_eq!(config.default_per_page, 10);
    }
}
