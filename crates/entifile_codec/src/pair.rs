//! A single `key=value` line.

use std::fmt;

/// One attribute of a serialized entity.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct KeyValuePair {
    key: String,
    value: String,
}

impl KeyValuePair {
    /// Creates a pair.
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }

    /// Returns the key.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Returns the value.
    #[must_use]
    pub fn value(&self) -> &str {
        &self.value
    }

    /// Parses a `key=value` line.
    ///
    /// The line is split on the first `=`. Returns `None` for an empty line,
    /// a line without `=`, or a line whose key would be empty.
    #[must_use]
    pub fn parse(line: &str) -> Option<Self> {
        let (key, value) = line.split_once('=')?;
        if key.is_empty() {
            return None;
        }
        Some(Self::new(key, value))
    }
}

impl fmt::Display for KeyValuePair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.key, self.value)
    }
}
