//! Error types for the codec crate.

use thiserror::Error;

/// Result type for codec operations.
pub type CodecResult<T> = Result<T, CodecError>;

/// Errors that can occur while reading fields out of a serialized entity.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// A required key is not present.
    #[error("missing field: {key}")]
    MissingField {
        /// The key that was looked up.
        key: String,
    },

    /// A field expected to hold an integer holds something else.
    #[error("invalid integer for field {key}: {value:?}")]
    InvalidInteger {
        /// The key that was looked up.
        key: String,
        /// The raw text stored under the key.
        value: String,
    },

    /// A field value could not be converted to the requested type.
    #[error("invalid value for field {key}: {message}")]
    InvalidValue {
        /// The key that was looked up.
        key: String,
        /// Description of the conversion failure.
        message: String,
    },
}

impl CodecError {
    /// Creates a missing field error.
    pub fn missing_field(key: impl Into<String>) -> Self {
        Self::MissingField { key: key.into() }
    }

    /// Creates an invalid integer error.
    pub fn invalid_integer(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self::InvalidInteger {
            key: key.into(),
            value: value.into(),
        }
    }

    /// Creates an invalid value error.
    pub fn invalid_value(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidValue {
            key: key.into(),
            message: message.into(),
        }
    }
}
