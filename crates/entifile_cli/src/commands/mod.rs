//! CLI command implementations.

pub mod dump_index;
pub mod inspect;
pub mod verify;

use clap::ValueEnum;
use entifile_core::{CoreError, IndexRecord, PrimaryKey, Value, INDEX_FILE_EXTENSION};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors reported by the CLI commands.
#[derive(Debug, Error)]
pub enum CliError {
    /// The path is not a repository directory.
    #[error("no repository found at {}", .path.display())]
    NoRepository {
        /// The path given.
        path: PathBuf,
    },

    /// No record exists for the requested index.
    #[error("index record not found: {name}")]
    IndexNotFound {
        /// Index name.
        name: String,
    },

    /// Verification found problems.
    #[error("verification failed with {problems} problem(s)")]
    VerificationFailed {
        /// Number of problems found.
        problems: usize,
    },

    /// Error from the core crate.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for CLI commands.
pub type CliResult<T> = Result<T, CliError>;

/// Primary key type the records were written with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum KeyType {
    /// String keys.
    Text,
    /// 64-bit integer keys.
    Int,
}

/// Output format of reporting commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text.
    Text,
    /// Pretty-printed JSON.
    Json,
}

/// An index record decoded with the requested key type, keys rendered as text.
#[derive(Debug, Clone)]
pub struct DecodedRecord {
    /// Stored index name.
    pub name: String,
    /// Stored uniqueness flag.
    pub unique: bool,
    /// Entries as values and key strings.
    pub entries: Vec<(Vec<Value>, Vec<String>)>,
    /// Entity file names of every key, in entry order.
    pub file_names: Vec<String>,
}

impl DecodedRecord {
    /// Returns the number of keys across all entries.
    pub fn key_count(&self) -> usize {
        self.entries.iter().map(|(_, keys)| keys.len()).sum()
    }
}

/// Fails unless `path` is an existing directory.
pub fn require_repository(path: &Path) -> CliResult<()> {
    if path.is_dir() {
        Ok(())
    } else {
        Err(CliError::NoRepository {
            path: path.to_path_buf(),
        })
    }
}

/// Returns the regular files at the top level of the repository, sorted.
pub fn entity_files(path: &Path) -> CliResult<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(path)? {
        let entry = entry?;
        if entry.file_type()?.is_file() {
            files.push(entry.path());
        }
    }
    files.sort();
    Ok(files)
}

/// Returns `(index name, record path)` for every index record, sorted by name.
pub fn index_records(index_dir: &Path) -> CliResult<Vec<(String, PathBuf)>> {
    if !index_dir.is_dir() {
        return Ok(Vec::new());
    }

    let mut records = Vec::new();
    for entry in fs::read_dir(index_dir)? {
        let path = entry?.path();
        if path.extension().and_then(|e| e.to_str()) != Some(INDEX_FILE_EXTENSION) {
            continue;
        }
        if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
            records.push((stem.to_string(), path.clone()));
        }
    }
    records.sort();
    Ok(records)
}

/// Decodes the record at `path` with the given key type.
pub fn decode_record(path: &Path, key_type: KeyType) -> CliResult<DecodedRecord> {
    let data = fs::read(path)?;
    let record = match key_type {
        KeyType::Text => flatten(IndexRecord::<entifile_core::StringKey>::decode(&data)?),
        KeyType::Int => flatten(IndexRecord::<entifile_core::IntKey>::decode(&data)?),
    };
    Ok(record)
}

fn flatten<K: PrimaryKey>(record: IndexRecord<K>) -> DecodedRecord {
    let mut file_names = Vec::new();
    let entries = record
        .entries
        .into_iter()
        .map(|(tuple, postings)| {
            let keys = postings
                .keys()
                .iter()
                .map(|key| {
                    file_names.push(key.file_name());
                    key.to_string()
                })
                .collect();
            (tuple.into_values(), keys)
        })
        .collect();

    DecodedRecord {
        name: record.name,
        unique: record.unique,
        entries,
        file_names,
    }
}

/// Converts an index value to JSON.
pub fn value_to_json(value: &Value) -> serde_json::Value {
    match value {
        Value::Null => serde_json::Value::Null,
        Value::Bool(b) => serde_json::Value::Bool(*b),
        Value::Int(i) => serde_json::Value::from(*i),
        Value::Text(s) => serde_json::Value::String(s.clone()),
    }
}

/// Formats a byte count for display.
pub fn format_size(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{bytes} B")
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}
