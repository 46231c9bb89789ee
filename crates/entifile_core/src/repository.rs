//! File store with maintained secondary indexes.

use crate::config::RepositoryConfig;
use crate::dir::{is_single_component, DirLock};
use crate::entity::{require_key, Entity, EntitySerializer};
use crate::error::{CoreError, CoreResult};
use crate::index::{Extractor, Index, IndexInfo, IndexManager, IndexTuple, Value};
use crate::store::{EntityRepository, FileEntityStore};
use parking_lot::RwLock;
use std::path::Path;
use tracing::{debug, info, warn};

/// A [`FileEntityStore`] whose writes keep a set of indexes current.
///
/// Every mutating call holds the write lock for its whole duration, so the
/// stored entities and the in-memory indexes change together. Reads take
/// the read lock. Index records are written after every successful
/// mutation.
///
/// # Example
///
/// ```rust,ignore
/// let repo = IndexedRepository::open("data/users", UserSerializer)?;
/// repo.create_unique_index("username", |u: &User| u.username.clone())?;
/// repo.create_non_unique_index("country", |u: &User| u.country.clone())?;
///
/// repo.save(&user)?;
/// let canadians = repo.find_by_indexed_value("country", "Canada")?;
/// ```
pub struct IndexedRepository<E: Entity, S> {
    store: FileEntityStore<E, S>,
    indexes: RwLock<IndexManager<E>>,
    config: RepositoryConfig,
    _lock: Option<DirLock>,
}

impl<E, S> IndexedRepository<E, S>
where
    E: Entity,
    S: EntitySerializer<E>,
{
    /// Opens a repository with default configuration.
    pub fn open(dir: impl AsRef<Path>, serializer: S) -> CoreResult<Self> {
        Self::open_with_config(dir, serializer, RepositoryConfig::default())
    }

    /// Opens a repository.
    ///
    /// No index is registered on open; create them with the
    /// `create_*_index` methods.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Validation`] if `config.index_dir` is not a
    /// single directory name, [`CoreError::Directory`] if the directories
    /// cannot be used, or [`CoreError::RepositoryLocked`] if another handle
    /// holds the lock.
    pub fn open_with_config(
        dir: impl AsRef<Path>,
        serializer: S,
        config: RepositoryConfig,
    ) -> CoreResult<Self> {
        if !is_single_component(&config.index_dir) {
            return Err(CoreError::validation(format!(
                "invalid index directory: {:?}",
                config.index_dir
            )));
        }
        let store = FileEntityStore::open_with_config(dir, serializer, &config)?;
        let index_dir = store.path().join(&config.index_dir);
        let indexes = IndexManager::new(&index_dir, &config)?;

        let lock = if config.exclusive_lock {
            Some(DirLock::acquire(&index_dir)?)
        } else {
            None
        };

        info!(path = %store.path().display(), locked = lock.is_some(), "opened repository");

        Ok(Self {
            store,
            indexes: RwLock::new(indexes),
            config,
            _lock: lock,
        })
    }

    /// Returns the repository directory.
    #[must_use]
    pub fn path(&self) -> &Path {
        self.store.path()
    }

    /// Returns the configuration the repository was opened with.
    #[must_use]
    pub fn config(&self) -> &RepositoryConfig {
        &self.config
    }

    /// Returns the number of stored entities.
    pub fn count(&self) -> CoreResult<usize> {
        let _guard = self.indexes.read();
        self.store.count()
    }

    /// Creates a unique index and populates it from the stored entities.
    pub fn create_unique_index<F, V>(&self, name: &str, extractor: F) -> CoreResult<IndexInfo>
    where
        F: Fn(&E) -> V + Send + Sync + 'static,
        V: Into<Value>,
    {
        self.create_index(Index::new(name, Extractor::scalar(extractor), true))
    }

    /// Creates a non-unique index and populates it from the stored entities.
    pub fn create_non_unique_index<F, V>(&self, name: &str, extractor: F) -> CoreResult<IndexInfo>
    where
        F: Fn(&E) -> V + Send + Sync + 'static,
        V: Into<Value>,
    {
        self.create_index(Index::new(name, Extractor::scalar(extractor), false))
    }

    /// Creates an index keyed by a tuple of values and populates it from the
    /// stored entities.
    pub fn create_multi_column_index<F>(
        &self,
        name: &str,
        extractor: F,
        unique: bool,
    ) -> CoreResult<IndexInfo>
    where
        F: Fn(&E) -> Vec<Value> + Send + Sync + 'static,
    {
        self.create_index(Index::new(name, Extractor::tuple(extractor), unique))
    }

    /// Registers `index`, fills it and writes every index record.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::DuplicateIndexName`] if the name is taken, or
    /// [`CoreError::IndexCreation`] if the stored entities cannot be read or
    /// violate uniqueness. In the latter case the index is discarded and the
    /// stored entities are untouched.
    fn create_index(&self, index: Index<E>) -> CoreResult<IndexInfo> {
        let mut indexes = self.indexes.write();
        let name = index.name().to_string();
        indexes.register(index)?;

        let populated = self.store.find_all().and_then(|entities| {
            let index = indexes
                .get_index_mut(&name)
                .ok_or_else(|| CoreError::index_not_found(&name))?;
            for entity in &entities {
                if !index.add_entity(entity) {
                    let key = require_key(entity)?;
                    return Err(CoreError::unique_violation(&name, key));
                }
            }
            Ok(index.info())
        });

        match populated {
            Ok(info) => {
                indexes.save_indexes()?;
                info!(index = %name, entries = info.entries, keys = info.keys, "populated index");
                Ok(info)
            }
            Err(e) => {
                indexes.remove_index(&name)?;
                warn!(index = %name, error = %e, "index creation failed");
                Err(CoreError::index_creation(name, e.to_string()))
            }
        }
    }

    /// Removes the index called `name` and its record file.
    ///
    /// Returns false if no such index exists.
    pub fn remove_index(&self, name: &str) -> CoreResult<bool> {
        self.indexes.write().remove_index(name)
    }

    /// Returns a summary of the index called `name`.
    #[must_use]
    pub fn index_info(&self, name: &str) -> Option<IndexInfo> {
        self.indexes.read().get_index(name).map(Index::info)
    }

    /// Returns a summary of every index, in creation order.
    #[must_use]
    pub fn indexes(&self) -> Vec<IndexInfo> {
        self.indexes.read().indexes().iter().map(Index::info).collect()
    }

    /// Returns the index names, in creation order.
    #[must_use]
    pub fn index_names(&self) -> Vec<String> {
        self.indexes.read().index_names()
    }

    /// Returns the entities the index `name` holds under `value`.
    ///
    /// Keys whose file has disappeared are skipped.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::IndexNotFound`] if no such index exists.
    pub fn find_by_indexed_value(
        &self,
        name: &str,
        value: impl Into<IndexTuple>,
    ) -> CoreResult<Vec<E>> {
        let indexes = self.indexes.read();
        let keys = indexes.find_by_indexed_value(name, value)?;

        let mut found = Vec::with_capacity(keys.len());
        for key in &keys {
            match self.store.find_by_id(key)? {
                Some(entity) => found.push(entity),
                None => debug!(index = %name, key = %key, "indexed key has no file"),
            }
        }
        Ok(found)
    }

    /// Returns the keys the index `name` holds under `value`.
    pub fn find_keys_by_indexed_value(
        &self,
        name: &str,
        value: impl Into<IndexTuple>,
    ) -> CoreResult<Vec<E::Key>> {
        self.indexes.read().find_by_indexed_value(name, value)
    }

    /// Reloads every index from its record file, rebuilding from the stored
    /// entities where a record is missing.
    pub fn load_indexes(&self) -> CoreResult<()> {
        let mut indexes = self.indexes.write();
        let entities = self.store.find_all()?;
        indexes.load_indexes(&entities)?;
        info!(indexes = indexes.len(), entities = entities.len(), "loaded indexes");
        Ok(())
    }

    /// Rejects `entity` if a unique index holds its value under another key.
    fn check_unique(indexes: &IndexManager<E>, entity: &E, key: &E::Key) -> CoreResult<()> {
        for index in indexes.indexes().iter().filter(|i| i.is_unique()) {
            let held = index.find_by_value(index.extract(entity));
            if held.iter().any(|k| k != key) {
                return Err(CoreError::unique_violation(index.name(), key));
            }
        }
        Ok(())
    }

    /// Rewrites the index records once a failed mutation has been undone in
    /// memory. Records left behind by a failed rewrite still hold the undone
    /// change until the next successful mutation.
    fn persist_after_rollback(indexes: &IndexManager<E>) {
        if let Err(e) = indexes.save_indexes() {
            warn!(error = %e, "failed to rewrite index records after rollback");
        }
    }

    /// Puts a previously indexed entity back after a failed mutation.
    fn reinstate(indexes: &mut IndexManager<E>, previous: &E) {
        if let Err(e) = indexes.add_entity_to_indexes(previous) {
            warn!(key = ?previous.primary_key(), error = %e, "failed to reinstate index entries");
        }
    }
}

impl<E, S> EntityRepository<E> for IndexedRepository<E, S>
where
    E: Entity,
    S: EntitySerializer<E>,
{
    fn find_by_id(&self, key: &E::Key) -> CoreResult<Option<E>> {
        let _guard = self.indexes.read();
        self.store.find_by_id(key)
    }

    fn find_all(&self) -> CoreResult<Vec<E>> {
        let _guard = self.indexes.read();
        self.store.find_all()
    }

    /// Stores a new entity and adds it to every index.
    ///
    /// Unique indexes are checked before anything is written. If indexing or
    /// persisting the index records fails afterwards, the entity is removed
    /// from the indexes and its file deleted.
    fn save(&self, entity: &E) -> CoreResult<()> {
        let key = require_key(entity)?;
        let mut indexes = self.indexes.write();

        Self::check_unique(&indexes, entity, &key)?;
        self.store.save(entity)?;

        let committed = indexes
            .add_entity_to_indexes(entity)
            .and_then(|()| indexes.save_indexes());
        if let Err(e) = committed {
            warn!(key = %key, error = %e, "save failed, rolling back");
            indexes.remove_entity_from_indexes(entity);
            if let Err(delete_error) = self.store.delete(&key) {
                warn!(key = %key, error = %delete_error, "failed to remove entity file");
            }
            Self::persist_after_rollback(&indexes);
            return Err(e);
        }
        Ok(())
    }

    /// Overwrites an entity and moves its index entries.
    ///
    /// The update runs in two phases. First the stored entity is detached
    /// from every index. Then the new value is checked against the unique
    /// indexes, written and indexed, and the records are persisted. If the
    /// second phase fails, the previous file content is written back and the
    /// stored entity is attached again, leaving the indexes as before the
    /// call.
    fn update(&self, entity: &E) -> CoreResult<()> {
        let key = require_key(entity)?;
        let mut indexes = self.indexes.write();

        let previous = self
            .store
            .find_by_id(&key)?
            .ok_or_else(|| CoreError::not_found(&key))?;

        indexes.remove_entity_from_indexes(&previous);

        if let Err(e) = Self::check_unique(&indexes, entity, &key) {
            debug!(key = %key, error = %e, "update rejected, reinstating previous entity");
            Self::reinstate(&mut indexes, &previous);
            return Err(e);
        }

        let mut committed = self.store.update(entity);
        if committed.is_ok() {
            committed = indexes.add_entity_to_indexes(entity);
        }
        if committed.is_ok() {
            committed = indexes.save_indexes();
        }
        if let Err(e) = committed {
            warn!(key = %key, error = %e, "update failed, restoring previous entity");
            indexes.remove_entity_from_indexes(entity);
            if let Err(restore_error) = self.store.update(&previous) {
                warn!(key = %key, error = %restore_error, "failed to restore entity file");
            }
            Self::reinstate(&mut indexes, &previous);
            Self::persist_after_rollback(&indexes);
            return Err(e);
        }
        Ok(())
    }

    /// Deletes the entity file, then removes the entity from every index.
    ///
    /// If the file cannot be deleted the indexes are left untouched. If the
    /// index records cannot be persisted afterwards, the file is written
    /// back and the entity attached again.
    fn delete(&self, key: &E::Key) -> CoreResult<()> {
        let mut indexes = self.indexes.write();

        let previous = self
            .store
            .find_by_id(key)?
            .ok_or_else(|| CoreError::not_found(key))?;

        self.store.delete(key)?;
        indexes.remove_entity_from_indexes(&previous);

        if let Err(e) = indexes.save_indexes() {
            warn!(key = %key, error = %e, "delete failed, restoring entity");
            if let Err(restore_error) = self.store.save(&previous) {
                warn!(key = %key, error = %restore_error, "failed to restore entity file");
            }
            Self::reinstate(&mut indexes, &previous);
            Self::persist_after_rollback(&indexes);
            return Err(e);
        }
        Ok(())
    }

    fn exists(&self, key: &E::Key) -> CoreResult<bool> {
        let _guard = self.indexes.read();
        Ok(self.store.file_path(key).is_file())
    }
}

impl<E: Entity, S> std::fmt::Debug for IndexedRepository<E, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IndexedRepository")
            .field("store", &self.store)
            .field("indexes", &*self.indexes.read())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::test_support::{Person, PersonSerializer, Ticket, TicketSerializer};
    use crate::key::{IntKey, StringKey};
    use crate::tuple;
    use std::fs;
    use std::path::PathBuf;
    use tempfile::{tempdir, TempDir};

    type Repo = IndexedRepository<Person, PersonSerializer>;

    fn open(temp: &TempDir) -> Repo {
        IndexedRepository::open(temp.path(), PersonSerializer).unwrap()
    }

    fn open_indexed(temp: &TempDir) -> Repo {
        let repo = open(temp);
        repo.create_unique_index("email", |p: &Person| p.email.clone())
            .unwrap();
        repo.create_non_unique_index("city", |p: &Person| p.city.clone())
            .unwrap();
        repo
    }

    /// Makes writes of the named index record fail by occupying its
    /// temporary path with a directory.
    fn block_record(temp: &TempDir, name: &str) -> PathBuf {
        let blocker = temp.path().join(format!("indexes/{name}.idx.tmp"));
        fs::create_dir(&blocker).unwrap();
        blocker
    }

    fn ids(people: &[Person]) -> Vec<&str> {
        people
            .iter()
            .filter_map(|p| p.id.as_ref().map(StringKey::value))
            .collect()
    }

    #[test]
    fn repository_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Repo>();
    }

    #[test]
    fn save_indexes_entity() {
        let temp = tempdir().unwrap();
        let repo = open_indexed(&temp);
        let alice = Person::new("alice", "alice@x", "Oslo", 30);
        repo.save(&alice).unwrap();

        assert_eq!(repo.find_by_id(&Person::key("alice")).unwrap(), Some(alice.clone()));
        assert_eq!(repo.find_by_indexed_value("email", "alice@x").unwrap(), vec![alice.clone()]);
        assert_eq!(repo.find_by_indexed_value("city", "Oslo").unwrap(), vec![alice]);
        assert!(temp.path().join("indexes/email.idx").exists());
    }

    #[test]
    fn colliding_save_changes_nothing() {
        let temp = tempdir().unwrap();
        let repo = open_indexed(&temp);
        repo.save(&Person::new("a", "same", "Oslo", 1)).unwrap();

        let err = repo.save(&Person::new("b", "same", "Rome", 2)).unwrap_err();
        assert!(err.is_unique_violation());

        assert_eq!(ids(&repo.find_all().unwrap()), vec!["a"]);
        assert!(repo.find_by_indexed_value("city", "Rome").unwrap().is_empty());
        assert!(!repo.exists(&Person::key("b")).unwrap());
    }

    #[test]
    fn save_existing_key_is_duplicate() {
        let temp = tempdir().unwrap();
        let repo = open_indexed(&temp);
        let a = Person::new("a", "a@x", "Oslo", 1);
        repo.save(&a).unwrap();

        let result = repo.save(&a);
        assert!(matches!(result, Err(CoreError::DuplicateKey { .. })));
        assert_eq!(repo.find_keys_by_indexed_value("city", "Oslo").unwrap().len(), 1);
    }

    #[test]
    fn update_moves_index_entries() {
        let temp = tempdir().unwrap();
        let repo = open_indexed(&temp);
        repo.save(&Person::new("a", "a@x", "Oslo", 1)).unwrap();

        repo.update(&Person::new("a", "a2@x", "Rome", 2)).unwrap();

        assert!(repo.find_by_indexed_value("city", "Oslo").unwrap().is_empty());
        assert!(repo.find_by_indexed_value("email", "a@x").unwrap().is_empty());
        assert_eq!(ids(&repo.find_by_indexed_value("city", "Rome").unwrap()), vec!["a"]);
        assert_eq!(repo.find_by_id(&Person::key("a")).unwrap().unwrap().age, 2);
    }

    #[test]
    fn update_keeping_unique_value_succeeds() {
        let temp = tempdir().unwrap();
        let repo = open_indexed(&temp);
        repo.save(&Person::new("a", "a@x", "Oslo", 1)).unwrap();
        repo.update(&Person::new("a", "a@x", "Oslo", 5)).unwrap();
        assert_eq!(repo.find_by_indexed_value("email", "a@x").unwrap()[0].age, 5);
    }

    #[test]
    fn update_collision_reinstates_previous() {
        let temp = tempdir().unwrap();
        let repo = open_indexed(&temp);
        repo.save(&Person::new("a", "a@x", "Oslo", 1)).unwrap();
        repo.save(&Person::new("b", "b@x", "Rome", 1)).unwrap();

        let err = repo.update(&Person::new("b", "a@x", "Lima", 1)).unwrap_err();
        assert!(err.is_unique_violation());

        assert_eq!(ids(&repo.find_by_indexed_value("email", "b@x").unwrap()), vec!["b"]);
        assert_eq!(ids(&repo.find_by_indexed_value("city", "Rome").unwrap()), vec!["b"]);
        assert!(repo.find_by_indexed_value("city", "Lima").unwrap().is_empty());
        assert_eq!(repo.find_by_id(&Person::key("b")).unwrap().unwrap().city, "Rome");
    }

    #[test]
    fn update_missing_is_not_found() {
        let temp = tempdir().unwrap();
        let repo = open_indexed(&temp);
        let err = repo.update(&Person::new("ghost", "g", "Oslo", 1)).unwrap_err();
        assert!(err.is_not_found());
        assert!(repo.find_by_indexed_value("city", "Oslo").unwrap().is_empty());
    }

    #[test]
    fn delete_removes_file_and_entries() {
        let temp = tempdir().unwrap();
        let repo = open_indexed(&temp);
        repo.save(&Person::new("a", "a@x", "Oslo", 1)).unwrap();
        repo.save(&Person::new("b", "b@x", "Oslo", 1)).unwrap();

        repo.delete(&Person::key("a")).unwrap();

        assert_eq!(repo.find_by_id(&Person::key("a")).unwrap(), None);
        assert_eq!(repo.find_keys_by_indexed_value("city", "Oslo").unwrap(), vec![Person::key("b")]);
        assert!(repo.delete(&Person::key("a")).unwrap_err().is_not_found());
    }

    #[test]
    fn index_creation_populates_from_store() {
        let temp = tempdir().unwrap();
        let repo = open(&temp);
        repo.save(&Person::new("a", "a@x", "Oslo", 30)).unwrap();
        repo.save(&Person::new("b", "b@x", "Oslo", 30)).unwrap();

        let info = repo
            .create_multi_column_index(
                "city_age",
                |p: &Person| vec![Value::from(&p.city), Value::from(p.age)],
                false,
            )
            .unwrap();
        assert_eq!(info.entries, 1);
        assert_eq!(info.keys, 2);

        let mut found = ids(&repo.find_by_indexed_value("city_age", tuple!["Oslo", 30i64]).unwrap())
            .into_iter()
            .map(String::from)
            .collect::<Vec<_>>();
        found.sort();
        assert_eq!(found, vec!["a", "b"]);
    }

    #[test]
    fn index_creation_over_duplicates_fails_cleanly() {
        let temp = tempdir().unwrap();
        let repo = open(&temp);
        repo.save(&Person::new("a", "same", "Oslo", 1)).unwrap();
        repo.save(&Person::new("b", "same", "Oslo", 1)).unwrap();

        let result = repo.create_unique_index("email", |p: &Person| p.email.clone());
        assert!(matches!(result, Err(CoreError::IndexCreation { .. })));
        assert!(repo.index_names().is_empty());
        assert!(!temp.path().join("indexes/email.idx").exists());
        assert_eq!(repo.count().unwrap(), 2);
    }

    #[test]
    fn unknown_index_lookup_fails() {
        let temp = tempdir().unwrap();
        let repo = open(&temp);
        let result = repo.find_by_indexed_value("nope", "x");
        assert!(matches!(result, Err(CoreError::IndexNotFound { .. })));
    }

    #[test]
    fn lookup_skips_missing_files() {
        let temp = tempdir().unwrap();
        let repo = open_indexed(&temp);
        repo.save(&Person::new("a", "a@x", "Oslo", 1)).unwrap();
        repo.save(&Person::new("b", "b@x", "Oslo", 1)).unwrap();

        fs::remove_file(temp.path().join("a.txt")).unwrap();

        assert_eq!(ids(&repo.find_by_indexed_value("city", "Oslo").unwrap()), vec!["b"]);
        assert_eq!(repo.find_keys_by_indexed_value("city", "Oslo").unwrap().len(), 2);
    }

    #[test]
    fn second_open_is_locked() {
        let temp = tempdir().unwrap();
        let _repo = open(&temp);
        let result = Repo::open(temp.path(), PersonSerializer);
        assert!(matches!(result, Err(CoreError::RepositoryLocked { .. })));
    }

    #[test]
    fn lock_released_on_drop() {
        let temp = tempdir().unwrap();
        drop(open(&temp));
        let _repo = open(&temp);
    }

    #[test]
    fn unlocked_config_allows_two_handles() {
        let temp = tempdir().unwrap();
        let config = RepositoryConfig::new().exclusive_lock(false);
        let _a = Repo::open_with_config(temp.path(), PersonSerializer, config.clone()).unwrap();
        let _b = Repo::open_with_config(temp.path(), PersonSerializer, config).unwrap();
    }

    #[test]
    fn lock_file_is_not_an_entity() {
        let temp = tempdir().unwrap();
        let repo = open_indexed(&temp);
        repo.save(&Person::new("a", "a@x", "Oslo", 1)).unwrap();
        assert_eq!(repo.count().unwrap(), 1);
        assert_eq!(repo.find_all().unwrap().len(), 1);
    }

    #[test]
    fn reopen_loads_saved_records() {
        let temp = tempdir().unwrap();
        {
            let repo = open_indexed(&temp);
            repo.save(&Person::new("a", "a@x", "Oslo", 1)).unwrap();
            repo.save(&Person::new("b", "b@x", "Rome", 1)).unwrap();
        }

        let repo = open_indexed(&temp);
        repo.load_indexes().unwrap();
        assert_eq!(ids(&repo.find_by_indexed_value("city", "Rome").unwrap()), vec!["b"]);
        assert_eq!(repo.index_info("email").unwrap().keys, 2);
    }

    #[test]
    fn load_rebuilds_missing_record() {
        let temp = tempdir().unwrap();
        let repo = open_indexed(&temp);
        repo.save(&Person::new("a", "a@x", "Oslo", 1)).unwrap();
        fs::remove_file(temp.path().join("indexes/city.idx")).unwrap();

        repo.load_indexes().unwrap();
        assert_eq!(ids(&repo.find_by_indexed_value("city", "Oslo").unwrap()), vec!["a"]);
    }

    #[test]
    fn remove_index_forgets_it() {
        let temp = tempdir().unwrap();
        let repo = open_indexed(&temp);
        assert!(repo.remove_index("city").unwrap());
        assert_eq!(repo.index_names(), vec!["email"]);
        assert!(repo.index_info("city").is_none());
        assert!(!temp.path().join("indexes/city.idx").exists());
    }

    #[test]
    fn save_or_update_keeps_indexes_current() {
        let temp = tempdir().unwrap();
        let repo = open_indexed(&temp);
        repo.save_or_update(&Person::new("a", "a@x", "Oslo", 1)).unwrap();
        repo.save_or_update(&Person::new("a", "a@x", "Rome", 1)).unwrap();
        assert!(repo.find_by_indexed_value("city", "Oslo").unwrap().is_empty());
        assert_eq!(repo.find_by_indexed_value("city", "Rome").unwrap().len(), 1);
    }

    #[test]
    fn failed_record_write_rolls_back_save() {
        let temp = tempdir().unwrap();
        let repo = open_indexed(&temp);
        let blocker = block_record(&temp, "city");
        let alice = Person::new("alice", "alice@x", "Oslo", 30);

        assert!(matches!(repo.save(&alice), Err(CoreError::Write { .. })));
        assert_eq!(repo.find_by_id(&Person::key("alice")).unwrap(), None);
        assert!(repo.find_by_indexed_value("email", "alice@x").unwrap().is_empty());
        assert!(repo.find_by_indexed_value("city", "Oslo").unwrap().is_empty());

        fs::remove_dir(blocker).unwrap();
        repo.save(&alice).unwrap();
        assert_eq!(repo.find_by_indexed_value("city", "Oslo").unwrap(), vec![alice]);
    }

    #[test]
    fn failed_record_write_rolls_back_update() {
        let temp = tempdir().unwrap();
        let repo = open_indexed(&temp);
        let before = Person::new("a", "a@x", "Oslo", 1);
        repo.save(&before).unwrap();
        let blocker = block_record(&temp, "city");

        let moved = Person::new("a", "a@y", "Rome", 2);
        assert!(repo.update(&moved).is_err());

        assert_eq!(repo.find_by_id(&Person::key("a")).unwrap(), Some(before.clone()));
        assert_eq!(ids(&repo.find_by_indexed_value("city", "Oslo").unwrap()), vec!["a"]);
        assert!(repo.find_by_indexed_value("city", "Rome").unwrap().is_empty());
        assert_eq!(ids(&repo.find_by_indexed_value("email", "a@x").unwrap()), vec!["a"]);
        assert!(repo.find_by_indexed_value("email", "a@y").unwrap().is_empty());

        fs::remove_dir(blocker).unwrap();
        repo.update(&moved).unwrap();
        assert_eq!(ids(&repo.find_by_indexed_value("city", "Rome").unwrap()), vec!["a"]);
    }

    #[test]
    fn failed_record_write_rolls_back_delete() {
        let temp = tempdir().unwrap();
        let repo = open_indexed(&temp);
        let alice = Person::new("alice", "alice@x", "Oslo", 30);
        repo.save(&alice).unwrap();
        let blocker = block_record(&temp, "city");

        assert!(repo.delete(&Person::key("alice")).is_err());
        assert_eq!(repo.find_by_id(&Person::key("alice")).unwrap(), Some(alice.clone()));
        assert_eq!(repo.find_by_indexed_value("email", "alice@x").unwrap(), vec![alice.clone()]);
        assert_eq!(repo.find_by_indexed_value("city", "Oslo").unwrap(), vec![alice]);

        fs::remove_dir(blocker).unwrap();
        repo.delete(&Person::key("alice")).unwrap();
        assert!(!repo.exists(&Person::key("alice")).unwrap());
    }

    #[test]
    fn index_dir_must_be_one_component() {
        for index_dir in ["", ".", "..", "/tmp/elsewhere", "a/b", "../outside"] {
            let temp = tempdir().unwrap();
            let config = RepositoryConfig::new().index_dir(index_dir);
            let result = Repo::open_with_config(temp.path(), PersonSerializer, config);
            assert!(
                matches!(result, Err(CoreError::Validation { .. })),
                "{index_dir:?}"
            );
        }

        let temp = tempdir().unwrap();
        let config = RepositoryConfig::new().index_dir("idx");
        Repo::open_with_config(temp.path(), PersonSerializer, config).unwrap();
        assert!(temp.path().join("idx").is_dir());
    }

    #[test]
    fn integer_keys_round_trip() {
        let temp = tempdir().unwrap();
        let repo = IndexedRepository::open(temp.path(), TicketSerializer).unwrap();
        repo.create_non_unique_index("queue", |t: &Ticket| t.queue.clone())
            .unwrap();

        let low = Ticket::new(-5, "support");
        let high = Ticket::new(7, "support");
        repo.save(&low).unwrap();
        repo.save(&high).unwrap();
        assert!(temp.path().join("-5.txt").is_file());

        assert_eq!(repo.find_by_id(&IntKey::new(-5)).unwrap(), Some(low));
        let keys = repo.find_keys_by_indexed_value("queue", "support").unwrap();
        assert_eq!(keys, vec![IntKey::new(-5), IntKey::new(7)]);

        repo.delete(&IntKey::new(-5)).unwrap();
        drop(repo);
        let repo = IndexedRepository::open(temp.path(), TicketSerializer).unwrap();
        repo.create_non_unique_index("queue", |t: &Ticket| t.queue.clone())
            .unwrap();
        assert_eq!(
            repo.find_keys_by_indexed_value("queue", "support").unwrap(),
            vec![IntKey::new(7)]
        );
    }
}
