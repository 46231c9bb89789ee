//! One-file-per-entity storage.

use crate::config::RepositoryConfig;
use crate::dir;
use crate::entity::{require_key, Entity, EntitySerializer};
use crate::error::{CoreError, CoreResult};
use crate::key::PrimaryKey;
use std::fs;
use std::io::ErrorKind;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use tracing::debug;

/// CRUD operations shared by the plain and the indexed repository.
pub trait EntityRepository<E: Entity> {
    /// Returns the entity stored under `key`, or `None`.
    fn find_by_id(&self, key: &E::Key) -> CoreResult<Option<E>>;

    /// Returns every stored entity, in directory listing order.
    fn find_all(&self) -> CoreResult<Vec<E>>;

    /// Stores a new entity.
    fn save(&self, entity: &E) -> CoreResult<()>;

    /// Overwrites an existing entity.
    fn update(&self, entity: &E) -> CoreResult<()>;

    /// Removes the entity stored under `key`.
    fn delete(&self, key: &E::Key) -> CoreResult<()>;

    /// Returns every stored entity matching `condition`. Always a full scan.
    fn find_by_condition<P>(&self, condition: P) -> CoreResult<Vec<E>>
    where
        P: FnMut(&E) -> bool,
    {
        let mut condition = condition;
        Ok(self
            .find_all()?
            .into_iter()
            .filter(|entity| condition(entity))
            .collect())
    }

    /// Returns true if an entity is stored under `key`.
    fn exists(&self, key: &E::Key) -> CoreResult<bool> {
        Ok(self.find_by_id(key)?.is_some())
    }

    /// Updates the entity if its key is stored, saves it otherwise.
    fn save_or_update(&self, entity: &E) -> CoreResult<()> {
        let key = require_key(entity)?;
        if self.exists(&key)? {
            self.update(entity)
        } else {
            self.save(entity)
        }
    }
}

/// Stores each entity as one text file in a directory.
///
/// The file name is [`PrimaryKey::file_name`]. Writes overwrite the whole
/// file; a crash mid-write can leave it truncated.
///
/// # Example
///
/// ```rust,ignore
/// let store = FileEntityStore::open("data/users", UserSerializer)?;
/// store.save(&user)?;
/// let found = store.find_by_id(&user.id)?;
/// ```
pub struct FileEntityStore<E, S> {
    dir: PathBuf,
    serializer: S,
    sync_writes: bool,
    _marker: PhantomData<fn() -> E>,
}

impl<E, S> FileEntityStore<E, S>
where
    E: Entity,
    S: EntitySerializer<E>,
{
    /// Opens a store with default configuration, creating the directory.
    pub fn open(dir: impl AsRef<Path>, serializer: S) -> CoreResult<Self> {
        Self::open_with_config(dir, serializer, &RepositoryConfig::default())
    }

    /// Opens a store.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Directory`] if the directory cannot be created
    /// or used.
    pub fn open_with_config(
        dir: impl AsRef<Path>,
        serializer: S,
        config: &RepositoryConfig,
    ) -> CoreResult<Self> {
        let dir = dir.as_ref().to_path_buf();
        dir::ensure_dir(&dir, config.create_if_missing)?;
        Ok(Self {
            dir,
            serializer,
            sync_writes: config.sync_writes,
            _marker: PhantomData,
        })
    }

    /// Returns the store directory.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.dir
    }

    /// Returns the path of the file that holds `key`.
    #[must_use]
    pub fn file_path(&self, key: &E::Key) -> PathBuf {
        self.dir.join(key.file_name())
    }

    /// Returns the number of stored entities without decoding them.
    pub fn count(&self) -> CoreResult<usize> {
        Ok(self.entity_files()?.len())
    }

    fn entity_files(&self) -> CoreResult<Vec<PathBuf>> {
        let read_error = |source| CoreError::Read {
            path: self.dir.clone(),
            source,
        };
        let mut files = Vec::new();
        for entry in fs::read_dir(&self.dir).map_err(read_error)? {
            let entry = entry.map_err(read_error)?;
            if entry.file_type().map_err(read_error)?.is_file() {
                files.push(entry.path());
            }
        }
        Ok(files)
    }

    fn read_entity(&self, path: &Path) -> CoreResult<E> {
        let content = fs::read_to_string(path).map_err(|source| CoreError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        self.serializer
            .deserialize(&content)
            .map_err(|e| CoreError::EntityDecode {
                path: path.to_path_buf(),
                source: Box::new(e),
            })
    }

    fn write_entity(&self, path: &Path, entity: &E) -> CoreResult<()> {
        let content = self.serializer.serialize(entity)?;
        dir::write_file(path, content.as_bytes(), self.sync_writes)
    }
}

impl<E, S> EntityRepository<E> for FileEntityStore<E, S>
where
    E: Entity,
    S: EntitySerializer<E>,
{
    fn find_by_id(&self, key: &E::Key) -> CoreResult<Option<E>> {
        let path = self.file_path(key);
        match self.read_entity(&path) {
            Ok(entity) => Ok(Some(entity)),
            Err(CoreError::Read { source, .. }) if source.kind() == ErrorKind::NotFound => {
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    fn find_all(&self) -> CoreResult<Vec<E>> {
        self.entity_files()?
            .iter()
            .map(|path| self.read_entity(path))
            .collect()
    }

    fn save(&self, entity: &E) -> CoreResult<()> {
        let key = require_key(entity)?;
        let path = self.file_path(&key);
        if path.exists() {
            return Err(CoreError::duplicate_key(&key));
        }

        self.write_entity(&path, entity)?;
        debug!(key = %key, path = %path.display(), "saved entity");
        Ok(())
    }

    fn update(&self, entity: &E) -> CoreResult<()> {
        let key = require_key(entity)?;
        let path = self.file_path(&key);
        if !path.exists() {
            return Err(CoreError::not_found(&key));
        }

        self.write_entity(&path, entity)?;
        debug!(key = %key, "updated entity");
        Ok(())
    }

    fn delete(&self, key: &E::Key) -> CoreResult<()> {
        let path = self.file_path(key);
        if !path.exists() {
            return Err(CoreError::not_found(key));
        }

        fs::remove_file(&path).map_err(|source| CoreError::Delete {
            path: path.clone(),
            source,
        })?;
        debug!(key = %key, "deleted entity");
        Ok(())
    }
}

impl<E, S> std::fmt::Debug for FileEntityStore<E, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileEntityStore")
            .field("dir", &self.dir)
            .field("sync_writes", &self.sync_writes)
            .finish_non_exhaustive()
    }
}
