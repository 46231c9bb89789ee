//! Registry of the indexes of one repository.

use crate::config::RepositoryConfig;
use crate::dir;
use crate::entity::Entity;
use crate::error::{CoreError, CoreResult};
use crate::index::btree::{Extractor, Index};
use crate::index::persistence::INDEX_FILE_EXTENSION;
use crate::index::value::{IndexTuple, Value};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Owns the indexes of one entity type and their record files.
///
/// Indexes are kept in creation order; fan-out operations visit them in
/// that order.
pub struct IndexManager<E: Entity> {
    indexes: Vec<Index<E>>,
    index_dir: PathBuf,
    sync_writes: bool,
    rebuild_corrupt: bool,
}

impl<E: Entity> IndexManager<E> {
    /// Creates a manager storing records under `index_dir`.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Directory`] if the directory cannot be created.
    pub fn new(index_dir: impl AsRef<Path>, config: &RepositoryConfig) -> CoreResult<Self> {
        let index_dir = index_dir.as_ref().to_path_buf();
        dir::ensure_dir(&index_dir, true)?;
        Ok(Self {
            indexes: Vec::new(),
            index_dir,
            sync_writes: config.sync_writes,
            rebuild_corrupt: config.rebuild_corrupt_indexes,
        })
    }

    /// Returns the directory holding index records.
    #[must_use]
    pub fn index_dir(&self) -> &Path {
        &self.index_dir
    }

    /// Returns the record path of the index called `name`.
    #[must_use]
    pub fn index_file_path(&self, name: &str) -> PathBuf {
        self.index_dir
            .join(format!("{name}.{INDEX_FILE_EXTENSION}"))
    }

    /// Registers an empty unique index.
    pub fn create_unique_index<F, V>(&mut self, name: &str, extractor: F) -> CoreResult<&Index<E>>
    where
        F: Fn(&E) -> V + Send + Sync + 'static,
        V: Into<Value>,
    {
        self.register(Index::new(name, Extractor::scalar(extractor), true))
    }

    /// Registers an empty non-unique index.
    pub fn create_non_unique_index<F, V>(
        &mut self,
        name: &str,
        extractor: F,
    ) -> CoreResult<&Index<E>>
    where
        F: Fn(&E) -> V + Send + Sync + 'static,
        V: Into<Value>,
    {
        self.register(Index::new(name, Extractor::scalar(extractor), false))
    }

    /// Registers an empty index keyed by a tuple of values.
    pub fn create_multi_column_index<F>(
        &mut self,
        name: &str,
        extractor: F,
        unique: bool,
    ) -> CoreResult<&Index<E>>
    where
        F: Fn(&E) -> Vec<Value> + Send + Sync + 'static,
    {
        self.register(Index::new(name, Extractor::tuple(extractor), unique))
    }

    /// Registers an already built index.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::DuplicateIndexName`] if the name is taken, or
    /// [`CoreError::Validation`] if it cannot be used as a file name.
    pub fn register(&mut self, index: Index<E>) -> CoreResult<&Index<E>> {
        validate_index_name(index.name())?;
        if self.get_index(index.name()).is_some() {
            return Err(CoreError::duplicate_index_name(index.name()));
        }

        info!(index = %index.name(), unique = index.is_unique(), kind = %index.kind(), "created index");
        self.indexes.push(index);
        let last = self.indexes.len() - 1;
        Ok(&self.indexes[last])
    }

    /// Returns the index called `name`.
    #[must_use]
    pub fn get_index(&self, name: &str) -> Option<&Index<E>> {
        self.indexes.iter().find(|index| index.name() == name)
    }

    pub(crate) fn get_index_mut(&mut self, name: &str) -> Option<&mut Index<E>> {
        self.indexes.iter_mut().find(|index| index.name() == name)
    }

    /// Returns every index in creation order.
    #[must_use]
    pub fn indexes(&self) -> &[Index<E>] {
        &self.indexes
    }

    /// Returns the index names in creation order.
    #[must_use]
    pub fn index_names(&self) -> Vec<String> {
        self.indexes.iter().map(|i| i.name().to_string()).collect()
    }

    /// Returns the number of indexes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.indexes.len()
    }

    /// Returns true if no index is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.indexes.is_empty()
    }

    /// Detaches the index called `name` and deletes its record file.
    ///
    /// Returns false if no such index exists.
    pub fn remove_index(&mut self, name: &str) -> CoreResult<bool> {
        let Some(position) = self.indexes.iter().position(|i| i.name() == name) else {
            return Ok(false);
        };
        self.indexes.remove(position);

        let path = self.index_file_path(name);
        match fs::remove_file(&path) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(source) => return Err(CoreError::Delete { path, source }),
        }

        info!(index = %name, "removed index");
        Ok(true)
    }

    /// Returns the keys the index `name` holds under `value`.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::IndexNotFound`] if no such index exists.
    pub fn find_by_indexed_value(
        &self,
        name: &str,
        value: impl Into<IndexTuple>,
    ) -> CoreResult<Vec<E::Key>> {
        self.get_index(name)
            .map(|index| index.find_by_value(value))
            .ok_or_else(|| CoreError::index_not_found(name))
    }

    /// Adds an entity to every index, in order.
    ///
    /// Stops at the first unique index that rejects the entity. Indexes
    /// visited before it keep the entity.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::UniqueConstraintViolation`] naming the index.
    pub fn add_entity_to_indexes(&mut self, entity: &E) -> CoreResult<()> {
        for index in &mut self.indexes {
            if !index.add_entity(entity) {
                let key = entity
                    .primary_key()
                    .map(|k| k.to_string())
                    .unwrap_or_default();
                return Err(CoreError::unique_violation(index.name(), key));
            }
        }
        debug!(key = ?entity.primary_key(), indexes = self.indexes.len(), "indexed entity");
        Ok(())
    }

    /// Removes an entity from every index.
    pub fn remove_entity_from_indexes(&mut self, entity: &E) {
        for index in &mut self.indexes {
            index.remove_entity(entity);
        }
        debug!(key = ?entity.primary_key(), indexes = self.indexes.len(), "unindexed entity");
    }

    /// Removes every entry of every index.
    pub fn clear_indexes(&mut self) {
        for index in &mut self.indexes {
            index.clear();
        }
    }

    /// Writes every index record.
    pub fn save_indexes(&self) -> CoreResult<()> {
        for index in &self.indexes {
            index.save_to_file(&self.index_file_path(index.name()), self.sync_writes)?;
        }
        debug!(indexes = self.indexes.len(), "saved indexes");
        Ok(())
    }

    /// Loads every index from its record, rebuilding from `entities` where
    /// the record is missing.
    pub fn load_indexes(&mut self, entities: &[E]) -> CoreResult<()> {
        let rebuild_corrupt = self.rebuild_corrupt;
        for i in 0..self.indexes.len() {
            let path = self.index_file_path(self.indexes[i].name());
            self.indexes[i].load_from_file(&path, entities, rebuild_corrupt)?;
        }
        debug!(indexes = self.indexes.len(), "loaded indexes");
        Ok(())
    }
}

impl<E: Entity> std::fmt::Debug for IndexManager<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IndexManager")
            .field("index_dir", &self.index_dir)
            .field("indexes", &self.indexes)
            .finish_non_exhaustive()
    }
}

/// Index names become file names, so they must be a single path component.
fn validate_index_name(name: &str) -> CoreResult<()> {
    if dir::is_single_component(name) {
        Ok(())
    } else {
        Err(CoreError::validation(format!("invalid index name: {name:?}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::test_support::Person;
    use crate::key::StringKey;
    use crate::tuple;
    use tempfile::{tempdir, TempDir};

    fn manager() -> (TempDir, IndexManager<Person>) {
        let temp = tempdir().unwrap();
        let manager = IndexManager::new(temp.path().join("indexes"), &RepositoryConfig::default())
            .unwrap();
        (temp, manager)
    }

    fn with_indexes(manager: &mut IndexManager<Person>) {
        manager
            .create_unique_index("email", |p: &Person| p.email.clone())
            .unwrap();
        manager
            .create_non_unique_index("city", |p: &Person| p.city.clone())
            .unwrap();
        manager
            .create_multi_column_index(
                "city_age",
                |p: &Person| vec![Value::from(&p.city), Value::from(p.age)],
                false,
            )
            .unwrap();
    }

    fn people() -> Vec<Person> {
        vec![
            Person::new("a", "a@x", "Oslo", 30),
            Person::new("b", "b@x", "Oslo", 41),
            Person::new("c", "c@x", "Rome", 30),
        ]
    }

    fn key(id: &str) -> StringKey {
        Person::key(id)
    }

    #[test]
    fn creates_directory() {
        let (temp, _manager) = manager();
        assert!(temp.path().join("indexes").is_dir());
    }

    #[test]
    fn duplicate_name_rejected() {
        let (_temp, mut manager) = manager();
        manager.create_non_unique_index("city", |p: &Person| p.city.clone()).unwrap();
        let result = manager.create_unique_index("city", |p: &Person| p.email.clone());
        assert!(matches!(result, Err(CoreError::DuplicateIndexName { .. })));
        assert_eq!(manager.len(), 1);
    }

    #[test]
    fn path_like_name_rejected() {
        let (_temp, mut manager) = manager();
        for name in ["", "..", "a/b"] {
            let result = manager.create_unique_index(name, |p: &Person| p.email.clone());
            assert!(matches!(result, Err(CoreError::Validation { .. })), "{name}");
        }
    }

    #[test]
    fn names_in_creation_order() {
        let (_temp, mut manager) = manager();
        with_indexes(&mut manager);
        assert_eq!(manager.index_names(), vec!["email", "city", "city_age"]);
        assert!(manager.index_file_path("city").ends_with("indexes/city.idx"));
    }

    #[test]
    fn fan_out_add_and_remove() {
        let (_temp, mut manager) = manager();
        with_indexes(&mut manager);
        for p in people() {
            manager.add_entity_to_indexes(&p).unwrap();
        }

        assert_eq!(manager.find_by_indexed_value("city", "Oslo").unwrap(), vec![key("a"), key("b")]);
        assert_eq!(
            manager.find_by_indexed_value("city_age", tuple!["Rome", 30i64]).unwrap(),
            vec![key("c")]
        );

        manager.remove_entity_from_indexes(&people()[0]);
        assert!(manager.find_by_indexed_value("email", "a@x").unwrap().is_empty());
        assert_eq!(manager.find_by_indexed_value("city", "Oslo").unwrap(), vec![key("b")]);
    }

    #[test]
    fn unknown_index_lookup_fails() {
        let (_temp, manager) = manager();
        let result = manager.find_by_indexed_value("nope", "x");
        assert!(matches!(result, Err(CoreError::IndexNotFound { .. })));
    }

    #[test]
    fn violation_names_index_and_keeps_earlier_adds() {
        let (_temp, mut manager) = manager();
        manager.create_non_unique_index("city", |p: &Person| p.city.clone()).unwrap();
        manager.create_unique_index("email", |p: &Person| p.email.clone()).unwrap();
        manager.add_entity_to_indexes(&Person::new("a", "same", "Oslo", 1)).unwrap();

        let err = manager
            .add_entity_to_indexes(&Person::new("b", "same", "Rome", 1))
            .unwrap_err();
        match err {
            CoreError::UniqueConstraintViolation { index, key } => {
                assert_eq!(index, "email");
                assert_eq!(key, "b");
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(manager.find_by_indexed_value("city", "Rome").unwrap(), vec![Person::key("b")]);
    }

    #[test]
    fn persistence_roundtrip_through_fresh_manager() {
        let (temp, mut manager) = manager();
        with_indexes(&mut manager);
        for p in people() {
            manager.add_entity_to_indexes(&p).unwrap();
        }
        manager.save_indexes().unwrap();

        let mut fresh: IndexManager<Person> =
            IndexManager::new(temp.path().join("indexes"), &RepositoryConfig::default()).unwrap();
        with_indexes(&mut fresh);
        fresh.load_indexes(&[]).unwrap();

        for (old, new) in manager.indexes().iter().zip(fresh.indexes()) {
            assert_eq!(old.to_record(), new.to_record());
        }
    }

    #[test]
    fn missing_records_rebuild_like_incremental() {
        let (_temp, mut incremental) = manager();
        with_indexes(&mut incremental);
        for p in people() {
            incremental.add_entity_to_indexes(&p).unwrap();
        }

        let (_temp2, mut rebuilt) = manager();
        with_indexes(&mut rebuilt);
        rebuilt.load_indexes(&people()).unwrap();

        for (a, b) in incremental.indexes().iter().zip(rebuilt.indexes()) {
            assert_eq!(a.to_record(), b.to_record());
        }
    }

    #[test]
    fn remove_index_deletes_record() {
        let (_temp, mut manager) = manager();
        with_indexes(&mut manager);
        manager.save_indexes().unwrap();
        let path = manager.index_file_path("city");
        assert!(path.exists());

        assert!(manager.remove_index("city").unwrap());
        assert!(!path.exists());
        assert!(!manager.remove_index("city").unwrap());
        assert_eq!(manager.index_names(), vec!["email", "city_age"]);
    }

    #[test]
    fn clear_empties_every_index() {
        let (_temp, mut manager) = manager();
        with_indexes(&mut manager);
        for p in people() {
            manager.add_entity_to_indexes(&p).unwrap();
        }
        manager.clear_indexes();
        assert!(manager.indexes().iter().all(Index::is_empty));
    }
}
