//! Verify command implementation.

use super::{decode_record, entity_files, index_records, require_repository};
use super::{CliResult, KeyType};
use entifile_codec::SerializedEntity;
use entifile_core::FILE_SUFFIX;
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use tracing::debug;

/// Verification result.
#[derive(Debug, Default)]
pub struct VerifyReport {
    /// Number of entity files checked.
    pub entities_checked: usize,
    /// Number of index records checked.
    pub indexes_checked: usize,
    /// Problems that make the repository inconsistent.
    pub errors: Vec<String>,
    /// Oddities that do not affect reads.
    pub warnings: Vec<String>,
}

impl VerifyReport {
    /// Returns true if no error was found.
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Runs the verify command.
///
/// Entity files must be UTF-8 and hold at least one `key=value` line.
/// Every index record must decode, carry the name of its file, reference
/// only keys whose file exists, list each key under a single value, and
/// hold exactly one key per value when unique.
pub fn run(path: &Path, index_dir: &str, key_type: KeyType) -> CliResult<VerifyReport> {
    require_repository(path)?;
    let mut report = VerifyReport::default();

    let mut present = HashSet::new();
    for file in entity_files(path)? {
        report.entities_checked += 1;
        let file_name = file
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        if !file_name.ends_with(FILE_SUFFIX) {
            report
                .warnings
                .push(format!("{file_name}: not an entity file name"));
        }

        match fs::read_to_string(&file) {
            Ok(content) if SerializedEntity::from_file_content(&content).is_empty() => {
                report.errors.push(format!("{file_name}: no key=value pairs"));
            }
            Ok(_) => {}
            Err(e) => report.errors.push(format!("{file_name}: {e}")),
        }
        present.insert(file_name);
    }

    let index_dir = path.join(index_dir);
    for (name, record_path) in index_records(&index_dir)? {
        report.indexes_checked += 1;
        debug!(index = %name, "verifying index record");

        let record = match decode_record(&record_path, key_type) {
            Ok(record) => record,
            Err(e) => {
                report.errors.push(format!("index '{name}': {e}"));
                continue;
            }
        };

        if record.name != name {
            report.errors.push(format!(
                "index '{name}': record names itself '{}'",
                record.name
            ));
        }

        for (values, keys) in &record.entries {
            if record.unique && keys.len() != 1 {
                report.errors.push(format!(
                    "index '{name}': unique entry {values:?} holds {} keys",
                    keys.len()
                ));
            }
            if keys.is_empty() {
                report
                    .errors
                    .push(format!("index '{name}': entry {values:?} has no keys"));
            }
        }

        let mut seen = HashSet::new();
        for file_name in &record.file_names {
            if !seen.insert(file_name) {
                report
                    .errors
                    .push(format!("index '{name}': {file_name} indexed more than once"));
            }
            if !present.contains(file_name) {
                report
                    .errors
                    .push(format!("index '{name}': {file_name} does not exist"));
            }
        }
    }

    if index_dir.is_dir() {
        for entry in fs::read_dir(&index_dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) == Some("tmp") {
                report
                    .warnings
                    .push(format!("leftover temporary file {}", path.display()));
            }
        }
    }

    Ok(report)
}

/// Prints a verification report.
pub fn print(report: &VerifyReport) {
    println!(
        "Checked {} entity files and {} index records",
        report.entities_checked, report.indexes_checked
    );
    for warning in &report.warnings {
        println!("  WARNING: {warning}");
    }
    for error in &report.errors {
        println!("  ERROR: {error}");
    }

    println!();
    if report.is_ok() {
        println!("✓ Repository verification passed");
    } else {
        println!("✗ Repository verification failed");
    }
}
