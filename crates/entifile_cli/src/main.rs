//! EntiFile CLI
//!
//! Offline tools for EntiFile repository directories.
//!
//! # Commands
//!
//! - `inspect` - Display entity and index statistics
//! - `dump-index` - Dump the entries of one index record
//! - `verify` - Check entity files and index records for consistency
//! - `version` - Show version information

mod commands;

use clap::{Parser, Subcommand};
use commands::{KeyType, OutputFormat};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// EntiFile command-line repository tools.
#[derive(Parser)]
#[command(name = "entifile")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the repository directory
    #[arg(global = true, short, long)]
    path: Option<PathBuf>,

    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    /// Primary key type the repository was written with
    #[arg(global = true, short, long, value_enum, default_value_t = KeyType::Text)]
    key_type: KeyType,

    /// Name of the index subdirectory
    #[arg(global = true, long, default_value = entifile_core::DEFAULT_INDEX_DIR)]
    index_dir: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Display entity and index statistics
    Inspect {
        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },

    /// Dump the entries of one index record
    DumpIndex {
        /// Index name
        name: String,

        /// Maximum number of entries to dump
        #[arg(short, long)]
        limit: Option<usize>,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },

    /// Check entity files and index records for consistency
    Verify,

    /// Show version information
    Version,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match cli.command {
        Commands::Inspect { format } => {
            let path = cli.path.ok_or("Repository path required for inspect")?;
            let result = commands::inspect::run(&path, &cli.index_dir, cli.key_type)?;
            commands::inspect::print(&result, format)?;
        }
        Commands::DumpIndex {
            name,
            limit,
            format,
        } => {
            let path = cli.path.ok_or("Repository path required for dump-index")?;
            let dump = commands::dump_index::run(&path, &cli.index_dir, &name, cli.key_type, limit)?;
            commands::dump_index::print(&dump, format)?;
        }
        Commands::Verify => {
            let path = cli.path.ok_or("Repository path required for verify")?;
            let report = commands::verify::run(&path, &cli.index_dir, cli.key_type)?;
            commands::verify::print(&report);
            if !report.is_ok() {
                return Err(commands::CliError::VerificationFailed {
                    problems: report.errors.len(),
                }
                .into());
            }
        }
        Commands::Version => {
            println!("EntiFile CLI v{}", env!("CARGO_PKG_VERSION"));
            println!("EntiFile Core v{}", entifile_core::VERSION);
        }
    }

    Ok(())
}
