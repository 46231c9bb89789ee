//! Ordered key/value representation of one entity.

use crate::error::{CodecError, CodecResult};
use crate::pair::KeyValuePair;
use std::fmt::Display;
use std::str::FromStr;

/// An entity flattened to an ordered list of text pairs.
///
/// Keys are not required to be unique; lookups return the first match.
/// The text form is one `key=value` line per pair. Values are written
/// verbatim, so they must not contain line breaks.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SerializedEntity {
    pairs: Vec<KeyValuePair>,
}

impl SerializedEntity {
    /// Creates a serialized entity from pairs.
    #[must_use]
    pub fn new(pairs: Vec<KeyValuePair>) -> Self {
        Self { pairs }
    }

    /// Creates an entity with no pairs.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Starts building a serialized entity.
    #[must_use]
    pub fn builder() -> SerializedEntityBuilder {
        SerializedEntityBuilder::default()
    }

    /// Returns all pairs in order.
    #[must_use]
    pub fn pairs(&self) -> &[KeyValuePair] {
        &self.pairs
    }

    /// Returns the number of pairs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    /// Returns true if there are no pairs.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Returns the first value stored under `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|pair| pair.key() == key)
            .map(KeyValuePair::value)
    }

    /// Returns true if some pair has this key.
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Returns the value under `key`, failing if it is absent.
    pub fn require(&self, key: &str) -> CodecResult<&str> {
        self.get(key).ok_or_else(|| CodecError::missing_field(key))
    }

    /// Returns the value under `key` parsed as an integer.
    pub fn get_int(&self, key: &str) -> CodecResult<i64> {
        let raw = self.require(key)?;
        raw.parse::<i64>()
            .map_err(|_| CodecError::invalid_integer(key, raw))
    }

    /// Returns the value under `key` parsed with [`FromStr`].
    pub fn get_parsed<T>(&self, key: &str) -> CodecResult<T>
    where
        T: FromStr,
        T::Err: Display,
    {
        let raw = self.require(key)?;
        raw.parse::<T>()
            .map_err(|e| CodecError::invalid_value(key, e.to_string()))
    }

    /// Passes the value under `key` to `consumer`.
    ///
    /// Fails with [`CodecError::MissingField`] if the key is absent. Returns
    /// `self` so extractions can be chained with `?`.
    pub fn extract<F>(&self, key: &str, consumer: F) -> CodecResult<&Self>
    where
        F: FnOnce(&str),
    {
        consumer(self.require(key)?);
        Ok(self)
    }

    /// Passes the integer under `key` to `consumer`.
    pub fn extract_int<F>(&self, key: &str, consumer: F) -> CodecResult<&Self>
    where
        F: FnOnce(i64),
    {
        consumer(self.get_int(key)?);
        Ok(self)
    }

    /// Like [`extract`](Self::extract), but does nothing when the key is absent.
    pub fn extract_optional<F>(&self, key: &str, consumer: F) -> &Self
    where
        F: FnOnce(&str),
    {
        if let Some(value) = self.get(key) {
            consumer(value);
        }
        self
    }

    /// Like [`extract_int`](Self::extract_int), but does nothing when the key is absent.
    pub fn extract_optional_int<F>(&self, key: &str, consumer: F) -> CodecResult<&Self>
    where
        F: FnOnce(i64),
    {
        if self.contains_key(key) {
            consumer(self.get_int(key)?);
        }
        Ok(self)
    }

    /// Renders the entity as file content, one `key=value` line per pair.
    #[must_use]
    pub fn to_file_content(&self) -> String {
        let mut out = String::new();
        for pair in &self.pairs {
            out.push_str(pair.key());
            out.push('=');
            out.push_str(pair.value());
            out.push('\n');
        }
        out
    }

    /// Parses file content.
    ///
    /// Each line is trimmed; blank lines and lines that are not `key=value`
    /// are skipped.
    #[must_use]
    pub fn from_file_content(content: &str) -> Self {
        let pairs = content
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .filter_map(KeyValuePair::parse)
            .collect();
        Self { pairs }
    }
}

impl FromIterator<KeyValuePair> for SerializedEntity {
    fn from_iter<I: IntoIterator<Item = KeyValuePair>>(iter: I) -> Self {
        Self {
            pairs: iter.into_iter().collect(),
        }
    }
}

/// Builder for [`SerializedEntity`].
#[derive(Debug, Default)]
pub struct SerializedEntityBuilder {
    pairs: Vec<KeyValuePair>,
}

impl SerializedEntityBuilder {
    /// Appends a text pair.
    #[must_use]
    pub fn add(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.pairs.push(KeyValuePair::new(key, value));
        self
    }

    /// Appends an integer pair.
    #[must_use]
    pub fn add_int(self, key: impl Into<String>, value: i64) -> Self {
        self.add(key, value.to_string())
    }

    /// Appends a pair using the value's [`Display`] form.
    #[must_use]
    pub fn add_display<T: Display>(self, key: impl Into<String>, value: &T) -> Self {
        self.add(key, value.to_string())
    }

    /// Appends a pair only when `value` is present.
    #[must_use]
    pub fn add_optional<T: Display>(self, key: impl Into<String>, value: Option<&T>) -> Self {
        match value {
            Some(value) => self.add_display(key, value),
            None => self,
        }
    }

    /// Finishes the entity.
    #[must_use]
    pub fn build(self) -> SerializedEntity {
        SerializedEntity { pairs: self.pairs }
    }
}
