//! chunksync CLI
//!
//! Command-line front end for the chunksync engine.
//!
//! # Commands
//!
//! - `sync` - Make a destination file (or directory of files) match a source
//! - `manifest` - Print the chunk manifest of a file
//! - `diff` - Show which chunks a sync would transfer
//! - `version` - Show version information

mod client;
mod commands;
mod error;
mod source;

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Chunk-level file sync.
#[derive(Parser)]
#[command(name = "chunksync")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    /// Output format
    #[arg(global = true, short, long, value_enum, default_value = "text")]
    format: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

/// How results are printed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable lines
    Text,
    /// One JSON document
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Make DEST byte-identical to SOURCE, transferring only changed chunks
    Sync {
        /// Local file or directory, or http(s)://host[:port]/remote/path
        source: String,

        /// Destination file, or directory for a directory source
        dest: PathBuf,

        /// Chunk size in bytes (defaults to 2 MiB)
        #[arg(short, long)]
        chunk_size: Option<u64>,

        /// Number of chunks transferred concurrently
        #[arg(short, long, default_value = "1")]
        workers: usize,

        /// Read back and check every written chunk
        #[arg(long)]
        verify: bool,

        /// Extra attempts after a transient network failure
        #[arg(short, long, default_value = "0")]
        retries: u32,
    },

    /// Print the chunk manifest of a file
    Manifest {
        /// Local file or http(s)://host[:port]/remote/path
        path: String,

        /// Chunk size in bytes (defaults to 2 MiB)
        #[arg(short, long)]
        chunk_size: Option<u64>,
    },

    /// Show the chunks a sync would transfer, without writing anything
    Diff {
        /// Local file or http(s)://host[:port]/remote/path
        source: String,

        /// Destination file
        dest: PathBuf,

        /// Chunk size in bytes (defaults to 2 MiB)
        #[arg(short, long)]
        chunk_size: Option<u64>,
    },

    /// Show version information
    Version,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Sync {
            source,
            dest,
            chunk_size,
            workers,
            verify,
            retries,
        } => {
            let options = commands::sync::SyncOptions {
                chunk_size,
                workers,
                verify,
                retries,
            };
            commands::sync::run(&source, &dest, &options, cli.format)?;
        }
        Commands::Manifest { path, chunk_size } => {
            commands::manifest::run(&path, chunk_size, cli.format)?;
        }
        Commands::Diff {
            source,
            dest,
            chunk_size,
        } => {
            commands::diff::run(&source, &dest, chunk_size, cli.format)?;
        }
        Commands::Version => {
            println!("chunksync v{}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}
