//! Dump-index command implementation.

use super::{decode_record, require_repository, value_to_json};
use super::{CliError, CliResult, KeyType, OutputFormat};
use entifile_core::{IndexTuple, INDEX_FILE_EXTENSION};
use serde::Serialize;
use std::path::Path;

/// Entries of one index record.
#[derive(Debug, Serialize)]
pub struct IndexDump {
    /// Stored index name.
    pub name: String,
    /// Stored uniqueness flag.
    pub unique: bool,
    /// Number of entries in the record.
    pub total_entries: usize,
    /// Dumped entries, in value order.
    pub entries: Vec<DumpEntry>,
}

/// One value and its keys.
#[derive(Debug, Serialize)]
pub struct DumpEntry {
    /// The indexed tuple, rendered for display.
    #[serde(skip)]
    pub display: String,
    /// The indexed values.
    pub values: Vec<serde_json::Value>,
    /// Keys stored under the values.
    pub keys: Vec<String>,
}

/// Runs the dump-index command.
pub fn run(
    path: &Path,
    index_dir: &str,
    name: &str,
    key_type: KeyType,
    limit: Option<usize>,
) -> CliResult<IndexDump> {
    require_repository(path)?;
    let record_path = path
        .join(index_dir)
        .join(format!("{name}.{INDEX_FILE_EXTENSION}"));
    if !record_path.is_file() {
        return Err(CliError::IndexNotFound {
            name: name.to_string(),
        });
    }

    let record = decode_record(&record_path, key_type)?;
    let total_entries = record.entries.len();
    let entries = record
        .entries
        .into_iter()
        .take(limit.unwrap_or(usize::MAX))
        .map(|(values, keys)| DumpEntry {
            values: values.iter().map(value_to_json).collect(),
            display: IndexTuple::new(values).to_string(),
            keys,
        })
        .collect();

    Ok(IndexDump {
        name: record.name,
        unique: record.unique,
        total_entries,
        entries,
    })
}

/// Prints an index dump.
pub fn print(dump: &IndexDump, format: OutputFormat) -> CliResult<()> {
    match format {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(dump).map_err(std::io::Error::from)?;
            println!("{json}");
        }
        OutputFormat::Text => {
            let kind = if dump.unique { "unique" } else { "non-unique" };
            println!("Index '{}' ({kind}), {} entries", dump.name, dump.total_entries);
            for entry in &dump.entries {
                println!("  {} -> {}", entry.display, entry.keys.join(", "));
            }
            if dump.entries.len() < dump.total_entries {
                println!("  ... {} more", dump.total_entries - dump.entries.len());
            }
        }
    }
    Ok(())
}
