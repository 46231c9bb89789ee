//! Repository configuration.

/// Default name of the index subdirectory.
pub const DEFAULT_INDEX_DIR: &str = "indexes";

/// Configuration for opening a repository.
#[derive(Debug, Clone)]
pub struct RepositoryConfig {
    /// Whether to create the repository directory if it doesn't exist.
    pub create_if_missing: bool,

    /// Name of the subdirectory holding index records.
    pub index_dir: String,

    /// Whether to `fsync` every entity file and index record after writing.
    pub sync_writes: bool,

    /// Whether to hold an advisory lock on the directory while open.
    pub exclusive_lock: bool,

    /// Whether a malformed index record is rebuilt from the entities
    /// instead of failing the load.
    pub rebuild_corrupt_indexes: bool,
}

impl Default for RepositoryConfig {
    fn default() -> Self {
        Self {
            create_if_missing: true,
            index_dir: DEFAULT_INDEX_DIR.to_string(),
            sync_writes: false,
            exclusive_lock: true,
            rebuild_corrupt_indexes: false,
        }
    }
}

impl RepositoryConfig {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets whether to create the directory if missing.
    #[must_use]
    pub const fn create_if_missing(mut self, value: bool) -> Self {
        self.create_if_missing = value;
        self
    }

    /// Sets the index subdirectory name.
    #[must_use]
    pub fn index_dir(mut self, name: impl Into<String>) -> Self {
        self.index_dir = name.into();
        self
    }

    /// Sets whether writes are synced to disk.
    #[must_use]
    pub const fn sync_writes(mut self, value: bool) -> Self {
        self.sync_writes = value;
        self
    }

    /// Sets whether the directory lock is taken.
    #[must_use]
    pub const fn exclusive_lock(mut self, value: bool) -> Self {
        self.exclusive_lock = value;
        self
    }

    /// Sets whether corrupt index records are rebuilt.
    #[must_use]
    pub const fn rebuild_corrupt_indexes(mut self, value: bool) -> Self {
        self.rebuild_corrupt_indexes = value;
        self
    }
}
