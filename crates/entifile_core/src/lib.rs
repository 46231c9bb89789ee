//! # EntiFile Core
//!
//! File-backed entity repository with secondary indexes.
//!
//! This crate provides:
//! - Primary keys that map injectively to file names
//! - A store keeping one text file per entity
//! - Unique, non-unique and multi-column indexes over entity attributes
//! - An indexed repository that keeps store and indexes consistent
//! - Binary index records, reloaded or rebuilt on demand
//!
//! ## Layout
//!
//! ```text
//! <repo>/
//!   <key file name>.txt     one per entity
//!   indexes/
//!     LOCK                  advisory lock
//!     <index name>.idx      one per index
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use entifile_core::{EntityRepository, IndexedRepository};
//!
//! let repo = IndexedRepository::open("data/users", UserSerializer)?;
//! repo.create_unique_index("username", |u: &User| u.username.clone())?;
//! repo.save(&user)?;
//! let found = repo.find_by_indexed_value("username", "alice")?;
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod config;
pub mod dir;
mod entity;
mod error;
mod index;
mod key;
mod repository;
mod store;

pub use config::{RepositoryConfig, DEFAULT_INDEX_DIR};
pub use entity::{Entity, EntitySerializer, TextSerializer};
pub use error::{CoreError, CoreResult};
pub use index::{
    Extractor, Index, IndexInfo, IndexKind, IndexManager, IndexRecord, IndexTuple, Postings,
    Value, INDEX_FILE_EXTENSION,
};
pub use key::{IntKey, PrimaryKey, StringKey, FILE_SUFFIX};
pub use repository::IndexedRepository;
pub use store::{EntityRepository, FileEntityStore};

pub use entifile_codec::{
    CodecError, CodecResult, KeyValuePair, SerializedEntity, SerializedEntityBuilder,
};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
