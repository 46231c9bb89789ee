//! Inspect command implementation.

use super::{decode_record, entity_files, format_size, index_records, require_repository};
use super::{CliResult, KeyType, OutputFormat};
use serde::Serialize;
use std::fs;
use std::path::Path;
use tracing::debug;

/// Repository inspection result.
#[derive(Debug, Serialize)]
pub struct InspectResult {
    /// Repository path.
    pub path: String,
    /// Number of entity files.
    pub entity_count: usize,
    /// Total size of entity files in bytes.
    pub entity_bytes: u64,
    /// Whether the lock file exists.
    pub lock_file: bool,
    /// Index record statistics.
    pub indexes: Vec<IndexStats>,
}

/// Statistics for a single index record.
#[derive(Debug, Serialize)]
pub struct IndexStats {
    /// Index name, from the file name.
    pub name: String,
    /// Record size in bytes.
    pub size: u64,
    /// Whether the index is unique.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unique: Option<bool>,
    /// Number of distinct values.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entries: Option<usize>,
    /// Number of indexed keys.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keys: Option<usize>,
    /// Decode error, if the record could not be read.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Runs the inspect command.
pub fn run(path: &Path, index_dir: &str, key_type: KeyType) -> CliResult<InspectResult> {
    require_repository(path)?;
    let index_dir = path.join(index_dir);

    let files = entity_files(path)?;
    let mut entity_bytes = 0;
    for file in &files {
        entity_bytes += fs::metadata(file)?.len();
    }

    let mut indexes = Vec::new();
    for (name, record_path) in index_records(&index_dir)? {
        let size = fs::metadata(&record_path)?.len();
        let stats = match decode_record(&record_path, key_type) {
            Ok(record) => IndexStats {
                name,
                size,
                unique: Some(record.unique),
                entries: Some(record.entries.len()),
                keys: Some(record.key_count()),
                error: None,
            },
            Err(e) => {
                debug!(index = %name, error = %e, "unreadable index record");
                IndexStats {
                    name,
                    size,
                    unique: None,
                    entries: None,
                    keys: None,
                    error: Some(e.to_string()),
                }
            }
        };
        indexes.push(stats);
    }

    Ok(InspectResult {
        path: path.display().to_string(),
        entity_count: files.len(),
        entity_bytes,
        lock_file: index_dir.join("LOCK").is_file(),
        indexes,
    })
}

/// Prints an inspection result.
pub fn print(result: &InspectResult, format: OutputFormat) -> CliResult<()> {
    match format {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(result).map_err(std::io::Error::from)?;
            println!("{json}");
        }
        OutputFormat::Text => print_text_output(result),
    }
    Ok(())
}

fn print_text_output(result: &InspectResult) {
    println!("EntiFile Repository Inspection");
    println!("==============================");
    println!();
    println!("Path: {}", result.path);
    println!("Lock file: {}", if result.lock_file { "present" } else { "absent" });
    println!();
    println!("Entities:");
    println!("  Files: {}", result.entity_count);
    println!("  Size:  {}", format_size(result.entity_bytes));
    println!();
    println!("Indexes:");
    if result.indexes.is_empty() {
        println!("  (none)");
    }
    for index in &result.indexes {
        match &index.error {
            Some(error) => println!(
                "  {} ({}): ERROR {}",
                index.name,
                format_size(index.size),
                error
            ),
            None => println!(
                "  {} [{}] {} values, {} keys, {}",
                index.name,
                if index.unique == Some(true) { "unique" } else { "non-unique" },
                index.entries.unwrap_or(0),
                index.keys.unwrap_or(0),
                format_size(index.size)
            ),
        }
    }
}
