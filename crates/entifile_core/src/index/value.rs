//! Values produced by index extractors.

use std::fmt;

/// A single indexed attribute value.
///
/// Values are totally ordered (by variant, then content) and `Null`
/// equals `Null`, so tuple comparison is null-safe.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Value {
    /// Absent value.
    Null,
    /// Boolean value.
    Bool(bool),
    /// Signed integer.
    Int(i64),
    /// Text value.
    Text(String),
}

impl Value {
    /// Returns the text content, if this is a `Text` value.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the integer content, if this is an `Int` value.
    #[must_use]
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Returns true for `Null`.
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("null"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Text(s) => write!(f, "{s:?}"),
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Text(value)
    }
}

impl From<&String> for Value {
    fn from(value: &String) -> Self {
        Value::Text(value.clone())
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Int(i64::from(value))
    }
}

impl From<u32> for Value {
    fn from(value: u32) -> Self {
        Value::Int(i64::from(value))
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Value::Null, Into::into)
    }
}

/// The ordered list of values an index is keyed by.
///
/// Scalar indexes use one-element tuples. Two tuples are equal when they
/// have the same length and are pairwise equal in order.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct IndexTuple(Vec<Value>);

impl IndexTuple {
    /// Creates a tuple.
    #[must_use]
    pub fn new(values: Vec<Value>) -> Self {
        Self(values)
    }

    /// Returns the values.
    #[must_use]
    pub fn values(&self) -> &[Value] {
        &self.0
    }

    /// Returns the number of values.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true for the empty tuple.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Consumes the tuple, returning its values.
    #[must_use]
    pub fn into_values(self) -> Vec<Value> {
        self.0
    }
}

impl fmt::Display for IndexTuple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let [single] = self.0.as_slice() {
            return write!(f, "{single}");
        }
        f.write_str("(")?;
        for (i, value) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{value}")?;
        }
        f.write_str(")")
    }
}

impl From<Value> for IndexTuple {
    fn from(value: Value) -> Self {
        Self(vec![value])
    }
}

impl From<Vec<Value>> for IndexTuple {
    fn from(values: Vec<Value>) -> Self {
        Self(values)
    }
}

impl From<&str> for IndexTuple {
    fn from(value: &str) -> Self {
        Value::from(value).into()
    }
}

impl From<String> for IndexTuple {
    fn from(value: String) -> Self {
        Value::from(value).into()
    }
}

impl From<i64> for IndexTuple {
    fn from(value: i64) -> Self {
        Value::from(value).into()
    }
}

impl From<i32> for IndexTuple {
    fn from(value: i32) -> Self {
        Value::from(value).into()
    }
}

impl From<bool> for IndexTuple {
    fn from(value: bool) -> Self {
        Value::from(value).into()
    }
}

/// Builds an [`IndexTuple`] from a list of values convertible to [`Value`].
///
/// ```
/// use entifile_core::{tuple, IndexTuple, Value};
///
/// let t: IndexTuple = tuple!["Smith", 42, Option::<i64>::None];
/// assert_eq!(t.values()[2], Value::Null);
/// ```
#[macro_export]
macro_rules! tuple {
    ($($value:expr),* $(,)?) => {
        $crate::IndexTuple::new(vec![$($crate::Value::from($value)),*])
    };
}
