//! Error types for EntiFile core.

use entifile_codec::CodecError;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur in EntiFile core operations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A primary key value was rejected at construction.
    #[error("invalid primary key: {message}")]
    InvalidKey {
        /// Why the key was rejected.
        message: String,
    },

    /// An entity or argument failed validation.
    #[error("validation failed: {message}")]
    Validation {
        /// Description of the problem.
        message: String,
    },

    /// No entity is stored under the key.
    #[error("entity not found: {key}")]
    NotFound {
        /// The key that was looked up.
        key: String,
    },

    /// An entity is already stored under the key.
    #[error("entity already exists: {key}")]
    DuplicateKey {
        /// The colliding key.
        key: String,
    },

    /// A unique index already maps the entity's value to another key.
    #[error("entity {key} violates unique constraint of index '{index}'")]
    UniqueConstraintViolation {
        /// The index that rejected the entity.
        index: String,
        /// The rejected entity's key.
        key: String,
    },

    /// No index is registered under the name.
    #[error("index not found: {name}")]
    IndexNotFound {
        /// The requested index name.
        name: String,
    },

    /// An index with the name is already registered.
    #[error("index already exists: {name}")]
    DuplicateIndexName {
        /// The colliding name.
        name: String,
    },

    /// A persisted index record does not describe the live index.
    #[error(
        "index metadata mismatch for '{name}': record has name '{stored_name}', unique={stored_unique}"
    )]
    IndexMetadataMismatch {
        /// Name of the live index.
        name: String,
        /// Name found in the record header.
        stored_name: String,
        /// Uniqueness flag found in the record header.
        stored_unique: bool,
    },

    /// An index could not be populated from the stored entities.
    #[error("failed to create index '{name}': {reason}")]
    IndexCreation {
        /// The index being created.
        name: String,
        /// Why population failed.
        reason: String,
    },

    /// The repository directory could not be created or used.
    #[error("directory error at {}: {source}", .path.display())]
    Directory {
        /// The directory path.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// A file could not be read.
    #[error("failed to read {}: {source}", .path.display())]
    Read {
        /// The file path.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// A file could not be written.
    #[error("failed to write {}: {source}", .path.display())]
    Write {
        /// The file path.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// A file could not be removed.
    #[error("failed to delete {}: {source}", .path.display())]
    Delete {
        /// The file path.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// An entity file exists but its content could not be turned into an entity.
    #[error("failed to decode entity file {}: {source}", .path.display())]
    EntityDecode {
        /// The entity file.
        path: PathBuf,
        /// What the serializer reported.
        #[source]
        source: Box<CoreError>,
    },

    /// Binary content (an index record or key bytes) is malformed.
    #[error("decode error: {message}")]
    Decode {
        /// Description of the problem.
        message: String,
    },

    /// A required field was missing or malformed.
    #[error("codec error: {0}")]
    Codec(#[from] CodecError),

    /// Another repository instance holds the directory lock.
    #[error("repository locked: {}", .path.display())]
    RepositoryLocked {
        /// The lock file path.
        path: PathBuf,
    },

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl CoreError {
    /// Creates an invalid key error.
    pub fn invalid_key(message: impl Into<String>) -> Self {
        Self::InvalidKey {
            message: message.into(),
        }
    }

    /// Creates a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Creates a not found error.
    pub fn not_found(key: impl ToString) -> Self {
        Self::NotFound {
            key: key.to_string(),
        }
    }

    /// Creates a duplicate key error.
    pub fn duplicate_key(key: impl ToString) -> Self {
        Self::DuplicateKey {
            key: key.to_string(),
        }
    }

    /// Creates a unique constraint violation error.
    pub fn unique_violation(index: impl Into<String>, key: impl ToString) -> Self {
        Self::UniqueConstraintViolation {
            index: index.into(),
            key: key.to_string(),
        }
    }

    /// Creates an index not found error.
    pub fn index_not_found(name: impl Into<String>) -> Self {
        Self::IndexNotFound { name: name.into() }
    }

    /// Creates a duplicate index name error.
    pub fn duplicate_index_name(name: impl Into<String>) -> Self {
        Self::DuplicateIndexName { name: name.into() }
    }

    /// Creates an index creation error.
    pub fn index_creation(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::IndexCreation {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// Creates a decode error.
    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode {
            message: message.into(),
        }
    }

    /// Returns true for errors raised because a key was absent.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Returns true for unique index violations.
    #[must_use]
    pub fn is_unique_violation(&self) -> bool {
        matches!(self, Self::UniqueConstraintViolation { .. })
    }
}
