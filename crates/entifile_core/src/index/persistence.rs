//! Binary index records.
//!
//! Each index is persisted to `<index_dir>/<name>.idx`. All integers are
//! big-endian:
//!
//! ```text
//! IndexRecord {
//!     name_len: u16, name: [u8; name_len]     // UTF-8
//!     unique: u8                              // 0 | 1
//!     entry_count: u32
//!     entries: [Entry; entry_count]
//! }
//! Entry {
//!     value_count: u32
//!     values: [Value; value_count]
//!     unique:     key_len: u32, key: [u8; key_len]
//!     non-unique: key_count: u32, [key_len: u32, key: [u8; key_len]]
//! }
//! Value = tag: u8, payload
//!     0 Null | 1 Bool(u8) | 2 Int(i64) | 3 Text(len: u32, UTF-8)
//! ```
//!
//! The layout carries no magic or version; the header is only the name and
//! the uniqueness flag, which are checked against the live index on load.

use crate::error::{CoreError, CoreResult};
use crate::index::value::{IndexTuple, Value};
use crate::key::PrimaryKey;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;

/// File extension of index records.
pub const INDEX_FILE_EXTENSION: &str = "idx";

const TAG_NULL: u8 = 0;
const TAG_BOOL: u8 = 1;
const TAG_INT: u8 = 2;
const TAG_TEXT: u8 = 3;

/// The keys stored under one indexed value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Postings<K> {
    /// The single key of a unique entry.
    One(K),
    /// The keys of a non-unique entry, in insertion order, without duplicates.
    Many(Vec<K>),
}

impl<K: PrimaryKey> Postings<K> {
    /// Returns the keys as a slice.
    #[must_use]
    pub fn keys(&self) -> &[K] {
        match self {
            Postings::One(key) => std::slice::from_ref(key),
            Postings::Many(keys) => keys,
        }
    }

    /// Returns the number of keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.keys().len()
    }

    /// Returns true if no key is held.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.keys().is_empty()
    }

    /// Returns true if `key` is held.
    #[must_use]
    pub fn contains(&self, key: &K) -> bool {
        self.keys().contains(key)
    }
}

/// Decoded content of an index record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexRecord<K> {
    /// Index name from the header.
    pub name: String,
    /// Uniqueness flag from the header.
    pub unique: bool,
    /// Entries in stored order.
    pub entries: Vec<(IndexTuple, Postings<K>)>,
}

impl<K: PrimaryKey> IndexRecord<K> {
    /// Serializes the record.
    ///
    /// # Errors
    ///
    /// Fails if the name or a count does not fit its length prefix.
    pub fn encode(&self) -> CoreResult<Vec<u8>> {
        let mut buf = Vec::new();

        let name = self.name.as_bytes();
        let name_len = u16::try_from(name.len())
            .map_err(|_| CoreError::validation(format!("index name too long: {}", self.name)))?;
        buf.extend_from_slice(&name_len.to_be_bytes());
        buf.extend_from_slice(name);
        buf.push(u8::from(self.unique));

        write_len(&mut buf, self.entries.len())?;
        for (tuple, postings) in &self.entries {
            write_len(&mut buf, tuple.len())?;
            for value in tuple.values() {
                write_value(&mut buf, value)?;
            }
            match postings {
                Postings::One(key) => write_bytes(&mut buf, &key.to_bytes())?,
                Postings::Many(keys) => {
                    write_len(&mut buf, keys.len())?;
                    for key in keys {
                        write_bytes(&mut buf, &key.to_bytes())?;
                    }
                }
            }
        }

        Ok(buf)
    }

    /// Parses a record.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Decode`] on truncated, malformed or trailing data.
    pub fn decode(data: &[u8]) -> CoreResult<Self> {
        let mut reader = Reader::new(data);

        let name_len = usize::from(reader.u16("name length")?);
        let name = String::from_utf8(reader.take(name_len, "name")?.to_vec())
            .map_err(|_| CoreError::decode("invalid UTF-8 in index name"))?;
        let unique = match reader.u8("unique flag")? {
            0 => false,
            1 => true,
            other => return Err(CoreError::decode(format!("invalid unique flag: {other}"))),
        };

        let entry_count = reader.len("entry count")?;
        let mut entries = Vec::with_capacity(entry_count.min(4096));
        for _ in 0..entry_count {
            let value_count = reader.len("value count")?;
            let mut values = Vec::with_capacity(value_count.min(64));
            for _ in 0..value_count {
                values.push(reader.value()?);
            }

            let postings = if unique {
                Postings::One(reader.key()?)
            } else {
                let key_count = reader.len("key count")?;
                let mut keys = Vec::with_capacity(key_count.min(4096));
                for _ in 0..key_count {
                    keys.push(reader.key()?);
                }
                Postings::Many(keys)
            };

            entries.push((IndexTuple::new(values), postings));
        }

        if !reader.is_done() {
            return Err(CoreError::decode("trailing bytes after index entries"));
        }

        Ok(Self {
            name,
            unique,
            entries,
        })
    }

    /// Reads a record file, returning `None` if it does not exist.
    pub fn read_file(path: &Path) -> CoreResult<Option<Self>> {
        match fs::read(path) {
            Ok(data) => Self::decode(&data).map(Some),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(source) => Err(CoreError::Read {
                path: path.to_path_buf(),
                source,
            }),
        }
    }

    /// Returns the total number of keys across entries.
    #[must_use]
    pub fn key_count(&self) -> usize {
        self.entries.iter().map(|(_, postings)| postings.len()).sum()
    }
}

fn write_len(buf: &mut Vec<u8>, len: usize) -> CoreResult<()> {
    let len = u32::try_from(len)
        .map_err(|_| CoreError::validation(format!("length {len} exceeds u32")))?;
    buf.extend_from_slice(&len.to_be_bytes());
    Ok(())
}

fn write_bytes(buf: &mut Vec<u8>, bytes: &[u8]) -> CoreResult<()> {
    write_len(buf, bytes.len())?;
    buf.extend_from_slice(bytes);
    Ok(())
}

fn write_value(buf: &mut Vec<u8>, value: &Value) -> CoreResult<()> {
    match value {
        Value::Null => buf.push(TAG_NULL),
        Value::Bool(b) => {
            buf.push(TAG_BOOL);
            buf.push(u8::from(*b));
        }
        Value::Int(i) => {
            buf.push(TAG_INT);
            buf.extend_from_slice(&i.to_be_bytes());
        }
        Value::Text(s) => {
            buf.push(TAG_TEXT);
            write_bytes(buf, s.as_bytes())?;
        }
    }
    Ok(())
}

/// Bounds-checked cursor over record bytes.
struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    fn is_done(&self) -> bool {
        self.pos == self.data.len()
    }

    fn take(&mut self, n: usize, what: &str) -> CoreResult<&'a [u8]> {
        let end = self
            .pos
            .checked_add(n)
            .filter(|end| *end <= self.data.len())
            .ok_or_else(|| CoreError::decode(format!("truncated {what}")))?;
        let slice = &self.data[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn array<const N: usize>(&mut self, what: &str) -> CoreResult<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N, what)?);
        Ok(out)
    }

    fn u8(&mut self, what: &str) -> CoreResult<u8> {
        Ok(self.array::<1>(what)?[0])
    }

    fn u16(&mut self, what: &str) -> CoreResult<u16> {
        Ok(u16::from_be_bytes(self.array(what)?))
    }

    fn len(&mut self, what: &str) -> CoreResult<usize> {
        Ok(u32::from_be_bytes(self.array(what)?) as usize)
    }

    fn value(&mut self) -> CoreResult<Value> {
        match self.u8("value tag")? {
            TAG_NULL => Ok(Value::Null),
            TAG_BOOL => match self.u8("bool value")? {
                0 => Ok(Value::Bool(false)),
                1 => Ok(Value::Bool(true)),
                other => Err(CoreError::decode(format!("invalid bool value: {other}"))),
            },
            TAG_INT => Ok(Value::Int(i64::from_be_bytes(self.array("int value")?))),
            TAG_TEXT => {
                let len = self.len("text length")?;
                let bytes = self.take(len, "text value")?;
                String::from_utf8(bytes.to_vec())
                    .map(Value::Text)
                    .map_err(|_| CoreError::decode("invalid UTF-8 in text value"))
            }
            other => Err(CoreError::decode(format!("unknown value tag: {other}"))),
        }
    }

    fn key<K: PrimaryKey>(&mut self) -> CoreResult<K> {
        let len = self.len("key length")?;
        K::from_bytes(self.take(len, "key")?)
    }
}
