//! Repository directory management.
//!
//! Layout of a repository directory:
//!
//! ```text
//! <repo_dir>/
//! ├─ <file_name(key)>       # one entity per file
//! └─ indexes/
//!    ├─ LOCK                # advisory lock for a single open instance
//!    └─ <index_name>.idx    # one record per index
//! ```
//!
//! The lock lives inside the index directory so that the entity scan, which
//! reads every regular file at the top level, never sees it.

use crate::error::{CoreError, CoreResult};
use fs2::FileExt;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Component, Path, PathBuf};

/// Lock file name within the index directory.
const LOCK_FILE: &str = "LOCK";

/// Suffix for records being written before the rename.
const TEMP_SUFFIX: &str = ".tmp";

/// Ensures `path` exists as a directory.
///
/// # Errors
///
/// Returns [`CoreError::Directory`] if the directory is missing and
/// `create_if_missing` is false, if creation fails, or if the path exists
/// but is not a directory.
pub fn ensure_dir(path: &Path, create_if_missing: bool) -> CoreResult<()> {
    if !path.exists() {
        if !create_if_missing {
            return Err(directory_error(
                path,
                std::io::Error::new(std::io::ErrorKind::NotFound, "directory does not exist"),
            ));
        }
        fs::create_dir_all(path).map_err(|source| directory_error(path, source))?;
    }

    if !path.is_dir() {
        return Err(directory_error(
            path,
            std::io::Error::new(std::io::ErrorKind::Other, "path is not a directory"),
        ));
    }

    Ok(())
}

fn directory_error(path: &Path, source: std::io::Error) -> CoreError {
    CoreError::Directory {
        path: path.to_path_buf(),
        source,
    }
}

/// Overwrites `path` with `data`.
///
/// The write is not atomic: a crash can leave a truncated file.
pub fn write_file(path: &Path, data: &[u8], sync: bool) -> CoreResult<()> {
    let to_error = |source| CoreError::Write {
        path: path.to_path_buf(),
        source,
    };
    let mut file = File::create(path).map_err(to_error)?;
    file.write_all(data).map_err(to_error)?;
    if sync {
        file.sync_all().map_err(to_error)?;
    }
    Ok(())
}

/// Replaces `path` with `data` using write-then-rename.
pub fn write_file_atomic(path: &Path, data: &[u8], sync: bool) -> CoreResult<()> {
    let mut temp = path.as_os_str().to_owned();
    temp.push(TEMP_SUFFIX);
    let temp = PathBuf::from(temp);

    write_file(&temp, data, sync)?;
    fs::rename(&temp, path).map_err(|source| CoreError::Write {
        path: path.to_path_buf(),
        source,
    })?;

    if sync {
        if let Some(parent) = path.parent() {
            sync_directory(parent)?;
        }
    }
    Ok(())
}

#[cfg(unix)]
fn sync_directory(path: &Path) -> CoreResult<()> {
    let write_error = |source| CoreError::Write {
        path: path.to_path_buf(),
        source,
    };
    let dir = File::open(path).map_err(write_error)?;
    dir.sync_all().map_err(write_error)
}

#[cfg(not(unix))]
fn sync_directory(_path: &Path) -> CoreResult<()> {
    Ok(())
}

/// Returns true if `name` is a single normal path component, usable as a
/// file or directory name directly below another directory.
pub(crate) fn is_single_component(name: &str) -> bool {
    if name.contains(['\\', '\0']) {
        return false;
    }
    let mut components = Path::new(name).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    )
}

/// An exclusive advisory lock on a repository, released on drop.
#[derive(Debug)]
pub struct DirLock {
    path: PathBuf,
    _file: File,
}

impl DirLock {
    /// Acquires the lock file inside `dir` without blocking.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::RepositoryLocked`] if another handle holds it.
    pub fn acquire(dir: &Path) -> CoreResult<Self> {
        let path = dir.join(LOCK_FILE);
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)?;

        if file.try_lock_exclusive().is_err() {
            return Err(CoreError::RepositoryLocked { path });
        }

        Ok(Self { path, _file: file })
    }

    /// Returns the lock file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}
