//! Secondary index over one entity type.

use crate::dir;
use crate::entity::Entity;
use crate::error::{CoreError, CoreResult};
use crate::index::persistence::{IndexRecord, Postings};
use crate::index::value::{IndexTuple, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

/// Computes the indexed value of an entity.
///
/// Extractors must be stable: the same entity must always yield the same
/// value, or the index cannot find the entries it wrote.
pub enum Extractor<E> {
    /// One attribute.
    Scalar(Arc<dyn Fn(&E) -> Value + Send + Sync>),
    /// An ordered list of attributes.
    Tuple(Arc<dyn Fn(&E) -> Vec<Value> + Send + Sync>),
}

impl<E: 'static> Extractor<E> {
    /// Wraps a single-attribute extractor.
    pub fn scalar<F, V>(f: F) -> Self
    where
        F: Fn(&E) -> V + Send + Sync + 'static,
        V: Into<Value>,
    {
        Extractor::Scalar(Arc::new(move |entity: &E| f(entity).into()))
    }

    /// Wraps a multi-attribute extractor.
    pub fn tuple<F>(f: F) -> Self
    where
        F: Fn(&E) -> Vec<Value> + Send + Sync + 'static,
    {
        Extractor::Tuple(Arc::new(f))
    }

    /// Applies the extractor.
    pub fn extract(&self, entity: &E) -> IndexTuple {
        match self {
            Extractor::Scalar(f) => IndexTuple::from(f(entity)),
            Extractor::Tuple(f) => IndexTuple::new(f(entity)),
        }
    }

    /// Returns the kind of value this extractor produces.
    #[must_use]
    pub fn kind(&self) -> IndexKind {
        match self {
            Extractor::Scalar(_) => IndexKind::Scalar,
            Extractor::Tuple(_) => IndexKind::MultiColumn,
        }
    }
}

impl<E> Clone for Extractor<E> {
    fn clone(&self) -> Self {
        match self {
            Extractor::Scalar(f) => Extractor::Scalar(Arc::clone(f)),
            Extractor::Tuple(f) => Extractor::Tuple(Arc::clone(f)),
        }
    }
}

impl<E> fmt::Debug for Extractor<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Extractor::Scalar(_) => f.write_str("Extractor::Scalar"),
            Extractor::Tuple(_) => f.write_str("Extractor::Tuple"),
        }
    }
}

/// Whether an index is keyed by one value or by a tuple.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexKind {
    /// Keyed by one value.
    Scalar,
    /// Keyed by an ordered tuple of values.
    MultiColumn,
}

impl fmt::Display for IndexKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndexKind::Scalar => f.write_str("scalar"),
            IndexKind::MultiColumn => f.write_str("multi-column"),
        }
    }
}

/// Summary of an index, detached from the index itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexInfo {
    /// Index name.
    pub name: String,
    /// Whether the index enforces uniqueness.
    pub unique: bool,
    /// Scalar or multi-column.
    pub kind: IndexKind,
    /// Number of distinct values.
    pub entries: usize,
    /// Number of indexed keys.
    pub keys: usize,
}

/// Maps extracted values to the primary keys of the entities holding them.
///
/// Unique, non-unique and multi-column behaviour is selected by the
/// uniqueness flag and the [`Extractor`] variant:
///
/// - unique: each value maps to exactly one key; a different key under the
///   same value is rejected by [`add_entity`](Self::add_entity)
/// - non-unique: each value maps to its keys in insertion order
///
/// Entries live in memory and are written out by
/// [`save_to_file`](Self::save_to_file).
pub struct Index<E: Entity> {
    name: String,
    unique: bool,
    extractor: Extractor<E>,
    entries: BTreeMap<IndexTuple, Postings<E::Key>>,
}

impl<E: Entity> Index<E> {
    /// Creates an empty index.
    pub fn new(name: impl Into<String>, extractor: Extractor<E>, unique: bool) -> Self {
        Self {
            name: name.into(),
            unique,
            extractor,
            entries: BTreeMap::new(),
        }
    }

    /// Returns the index name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns true if the index enforces uniqueness.
    #[must_use]
    pub fn is_unique(&self) -> bool {
        self.unique
    }

    /// Returns whether the index is scalar or multi-column.
    #[must_use]
    pub fn kind(&self) -> IndexKind {
        self.extractor.kind()
    }

    /// Returns the extractor.
    #[must_use]
    pub fn extractor(&self) -> &Extractor<E> {
        &self.extractor
    }

    /// Applies the extractor to an entity.
    pub fn extract(&self, entity: &E) -> IndexTuple {
        self.extractor.extract(entity)
    }

    /// Returns the number of distinct values.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if no value is indexed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the number of indexed keys.
    #[must_use]
    pub fn key_count(&self) -> usize {
        self.entries.values().map(Postings::len).sum()
    }

    /// Iterates over the distinct values in order.
    pub fn values(&self) -> impl Iterator<Item = &IndexTuple> {
        self.entries.keys()
    }

    /// Returns a detached summary.
    #[must_use]
    pub fn info(&self) -> IndexInfo {
        IndexInfo {
            name: self.name.clone(),
            unique: self.unique,
            kind: self.kind(),
            entries: self.len(),
            keys: self.key_count(),
        }
    }

    /// Adds an entity under its extracted value.
    ///
    /// Returns false, leaving the index unchanged, if the index is unique
    /// and the value is already held by a different key. Adding an entity
    /// that is already indexed under the same value is a no-op.
    ///
    /// Entities without a key are ignored and reported as accepted.
    pub fn add_entity(&mut self, entity: &E) -> bool {
        let Some(key) = entity.primary_key() else {
            return true;
        };
        let value = self.extract(entity);

        match self.entries.get_mut(&value) {
            Some(Postings::One(existing)) => *existing == key,
            Some(Postings::Many(keys)) => {
                if !keys.contains(&key) {
                    keys.push(key);
                }
                true
            }
            None => {
                let postings = if self.unique {
                    Postings::One(key)
                } else {
                    Postings::Many(vec![key])
                };
                self.entries.insert(value, postings);
                true
            }
        }
    }

    /// Removes an entity from the index.
    ///
    /// Does nothing if the entity's value or key is not indexed. A key list
    /// left empty is removed with its value.
    pub fn remove_entity(&mut self, entity: &E) {
        let Some(key) = entity.primary_key() else {
            return;
        };
        let value = self.extract(entity);

        let now_empty = match self.entries.get_mut(&value) {
            Some(Postings::One(existing)) => *existing == key,
            Some(Postings::Many(keys)) => {
                keys.retain(|k| *k != key);
                keys.is_empty()
            }
            None => false,
        };

        if now_empty {
            self.entries.remove(&value);
        }
    }

    /// Returns the keys indexed under `value`, in insertion order.
    pub fn find_by_value(&self, value: impl Into<IndexTuple>) -> Vec<E::Key> {
        self.entries
            .get(&value.into())
            .map(|postings| postings.keys().to_vec())
            .unwrap_or_default()
    }

    /// Returns true if `value` is indexed.
    pub fn contains_value(&self, value: impl Into<IndexTuple>) -> bool {
        self.entries.contains_key(&value.into())
    }

    /// Removes every entry.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Replaces the content with the given entities, added in order.
    ///
    /// Returns the number of entities a unique index rejected.
    pub fn rebuild(&mut self, entities: &[E]) -> usize {
        self.clear();
        let mut rejected = 0;
        for entity in entities {
            if !self.add_entity(entity) {
                rejected += 1;
                warn!(
                    index = %self.name,
                    key = ?entity.primary_key(),
                    "duplicate value skipped during rebuild"
                );
            }
        }
        rejected
    }

    /// Returns the persisted form of the index.
    #[must_use]
    pub fn to_record(&self) -> IndexRecord<E::Key> {
        IndexRecord {
            name: self.name.clone(),
            unique: self.unique,
            entries: self
                .entries
                .iter()
                .map(|(value, postings)| (value.clone(), postings.clone()))
                .collect(),
        }
    }

    /// Replaces the content with a decoded record.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::IndexMetadataMismatch`] if the record's name or
    /// uniqueness differ from this index, and [`CoreError::Decode`] if it
    /// holds the same value twice or a scalar index entry with more than one
    /// value. The index is left unchanged on error.
    pub fn restore(&mut self, record: IndexRecord<E::Key>) -> CoreResult<()> {
        if record.name != self.name || record.unique != self.unique {
            return Err(CoreError::IndexMetadataMismatch {
                name: self.name.clone(),
                stored_name: record.name,
                stored_unique: record.unique,
            });
        }

        let scalar = self.kind() == IndexKind::Scalar;
        let mut entries = BTreeMap::new();
        for (value, postings) in record.entries {
            if scalar && value.len() != 1 {
                return Err(CoreError::decode(format!(
                    "index {}: scalar entry holds {} values",
                    self.name,
                    value.len()
                )));
            }
            if postings.is_empty() {
                continue;
            }
            if entries.insert(value.clone(), postings).is_some() {
                return Err(CoreError::decode(format!(
                    "index {}: duplicate value {value}",
                    self.name
                )));
            }
        }
        self.entries = entries;
        Ok(())
    }

    /// Writes the index record to `path`, replacing any previous record.
    pub fn save_to_file(&self, path: &Path, sync: bool) -> CoreResult<()> {
        let bytes = self.to_record().encode()?;
        dir::write_file_atomic(path, &bytes, sync)
    }

    /// Loads the index from `path`.
    ///
    /// When no record exists the index is rebuilt from `entities`. When the
    /// record is malformed and `rebuild_corrupt` is set, the index is rebuilt
    /// as well; otherwise the decode error is returned.
    pub fn load_from_file(
        &mut self,
        path: &Path,
        entities: &[E],
        rebuild_corrupt: bool,
    ) -> CoreResult<()> {
        self.clear();

        let restored = IndexRecord::read_file(path).and_then(|record| match record {
            Some(record) => self.restore(record).map(|()| true),
            None => Ok(false),
        });
        match restored {
            Ok(true) => Ok(()),
            Ok(false) => {
                info!(index = %self.name, entities = entities.len(), "no index record, rebuilding");
                self.rebuild(entities);
                Ok(())
            }
            Err(e @ CoreError::Decode { .. }) if rebuild_corrupt => {
                warn!(index = %self.name, error = %e, "corrupt index record, rebuilding");
                self.rebuild(entities);
                Ok(())
            }
            Err(e) => Err(e),
        }
    }
}

impl<E: Entity> fmt::Debug for Index<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Index")
            .field("name", &self.name)
            .field("unique", &self.unique)
            .field("kind", &self.kind())
            .field("entries", &self.entries.len())
            .finish_non_exhaustive()
    }
}
