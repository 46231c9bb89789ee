//! Secondary indexes.
//!
//! An index maps a value extracted from each entity to the primary keys
//! holding it. Indexes live in memory, are maintained by the repository on
//! every write and are persisted as one record file per index.
//!
//! # Index Types
//!
//! - unique: at most one key per value
//! - non-unique: any number of keys per value, in insertion order
//! - multi-column: keyed by an ordered tuple of values, unique or not

mod btree;
mod manager;
mod persistence;
mod value;

pub use btree::{Extractor, Index, IndexInfo, IndexKind};
pub use manager::IndexManager;
pub use persistence::{IndexRecord, Postings, INDEX_FILE_EXTENSION};
pub use value::{IndexTuple, Value};
