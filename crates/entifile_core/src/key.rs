//! Primary key types.

use crate::error::{CoreError, CoreResult};
use std::fmt;
use std::hash::Hash;

/// Suffix appended to every entity file name.
pub const FILE_SUFFIX: &str = ".txt";

/// An ordered identifier that names an entity's file.
///
/// Implementations must keep [`file_name`](Self::file_name) injective:
/// two keys that compare unequal must never share a file name.
pub trait PrimaryKey:
    Clone + Eq + Ord + Hash + fmt::Debug + fmt::Display + Send + Sync + 'static
{
    /// Returns the file name this key is stored under.
    fn file_name(&self) -> String;

    /// Serializes the key for index records.
    fn to_bytes(&self) -> Vec<u8>;

    /// Deserializes a key written by [`to_bytes`](Self::to_bytes).
    fn from_bytes(bytes: &[u8]) -> CoreResult<Self>;
}

/// A non-empty text key.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StringKey(String);

impl StringKey {
    /// Creates a key, rejecting an empty value.
    pub fn new(value: impl Into<String>) -> CoreResult<Self> {
        let value = value.into();
        if value.is_empty() {
            return Err(CoreError::invalid_key("string key cannot be empty"));
        }
        Ok(Self(value))
    }

    /// Returns the underlying value.
    #[must_use]
    pub fn value(&self) -> &str {
        &self.0
    }
}

impl PrimaryKey for StringKey {
    /// ASCII alphanumerics, `-` and `.` are kept, `_` is doubled and every
    /// other byte becomes `_XX`.
    fn file_name(&self) -> String {
        let mut name = String::with_capacity(self.0.len() + FILE_SUFFIX.len());
        for byte in self.0.bytes() {
            match byte {
                b'a'..=b'z' | b'A'..=b'Z' | b'0'..=b'9' | b'-' | b'.' => name.push(byte as char),
                b'_' => name.push_str("__"),
                other => {
                    name.push('_');
                    name.push_str(&format!("{other:02X}"));
                }
            }
        }
        name.push_str(FILE_SUFFIX);
        name
    }

    fn to_bytes(&self) -> Vec<u8> {
        self.0.as_bytes().to_vec()
    }

    fn from_bytes(bytes: &[u8]) -> CoreResult<Self> {
        let value = String::from_utf8(bytes.to_vec())
            .map_err(|_| CoreError::decode("invalid UTF-8 in string key"))?;
        Self::new(value).map_err(|_| CoreError::decode("empty string key"))
    }
}

impl TryFrom<&str> for StringKey {
    type Error = CoreError;

    fn try_from(value: &str) -> CoreResult<Self> {
        Self::new(value)
    }
}

impl TryFrom<String> for StringKey {
    type Error = CoreError;

    fn try_from(value: String) -> CoreResult<Self> {
        Self::new(value)
    }
}

impl fmt::Debug for StringKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StringKey({:?})", self.0)
    }
}

impl fmt::Display for StringKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// An integer key. Every `i64` is valid.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct IntKey(i64);

impl IntKey {
    /// Creates a key.
    #[inline]
    #[must_use]
    pub const fn new(value: i64) -> Self {
        Self(value)
    }

    /// Returns the underlying value.
    #[inline]
    #[must_use]
    pub const fn value(&self) -> i64 {
        self.0
    }
}

impl PrimaryKey for IntKey {
    fn file_name(&self) -> String {
        format!("{}{FILE_SUFFIX}", self.0)
    }

    fn to_bytes(&self) -> Vec<u8> {
        self.0.to_be_bytes().to_vec()
    }

    fn from_bytes(bytes: &[u8]) -> CoreResult<Self> {
        let arr: [u8; 8] = bytes
            .try_into()
            .map_err(|_| CoreError::decode("expected 8 bytes for integer key"))?;
        Ok(Self(i64::from_be_bytes(arr)))
    }
}

impl From<i64> for IntKey {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl From<IntKey> for i64 {
    fn from(key: IntKey) -> Self {
        key.0
    }
}

impl fmt::Debug for IntKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "IntKey({})", self.0)
    }
}

impl fmt::Display for IntKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::HashSet;

    #[test]
    fn empty_string_key_rejected() {
        assert!(matches!(
            StringKey::new(""),
            Err(CoreError::InvalidKey { .. })
        ));
    }

    #[test]
    fn plain_key_file_name() {
        let key = StringKey::new("user-42").unwrap();
        assert_eq!(key.file_name(), "user-42.txt");
    }

    #[test]
    fn unsafe_characters_escaped() {
        let key = StringKey::new("a/b:c").unwrap();
        assert_eq!(key.file_name(), "a_2Fb_3Ac.txt");
    }

    #[test]
    fn escaping_does_not_collide() {
        let keys = ["a/b", "a_b", "a_2Fb", "a b", "a__b"];
        let names: HashSet<String> = keys
            .iter()
            .map(|k| StringKey::new(*k).unwrap().file_name())
            .collect();
        assert_eq!(names.len(), keys.len());
    }

    #[test]
    fn int_key_file_name() {
        assert_eq!(IntKey::new(7).file_name(), "7.txt");
        assert_eq!(IntKey::new(-7).file_name(), "-7.txt");
    }

    #[test]
    fn ordering_follows_value() {
        assert!(StringKey::new("a").unwrap() < StringKey::new("b").unwrap());
        assert!(IntKey::new(-1) < IntKey::new(3));
    }

    #[test]
    fn bytes_roundtrip() {
        let key = StringKey::new("Zoë").unwrap();
        assert_eq!(StringKey::from_bytes(&key.to_bytes()).unwrap(), key);

        let key = IntKey::new(i64::MIN);
        assert_eq!(IntKey::from_bytes(&key.to_bytes()).unwrap(), key);
    }

    #[test]
    fn from_bytes_rejects_garbage() {
        assert!(IntKey::from_bytes(&[1, 2, 3]).is_err());
        assert!(StringKey::from_bytes(&[0xff, 0xfe]).is_err());
        assert!(StringKey::from_bytes(&[]).is_err());
    }

    proptest! {
        #[test]
        fn file_name_is_injective(a in "\\PC{1,12}", b in "\\PC{1,12}") {
            let ka = StringKey::new(a.clone()).unwrap();
            let kb = StringKey::new(b.clone()).unwrap();
            prop_assert_eq!(ka.file_name() == kb.file_name(), a == b);
        }

        #[test]
        fn file_name_is_path_safe(a in "\\PC{1,24}") {
            let name = StringKey::new(a).unwrap().file_name();
            prop_assert!(name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '.' | '_')));
        }
    }
}
