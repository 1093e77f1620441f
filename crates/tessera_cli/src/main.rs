//! Tessera CLI
//!
//! Command-line drills over the in-memory backend.
//!
//! # Commands
//!
//! - `scenario` - Load, reload and erase one record, showing cache counters
//! - `batch` - Write under one guard with a commit-pending threshold
//! - `recover` - Break the connection and show how it is recovered

mod commands;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

/// Tessera command-line drills.
#[derive(Parser)]
#[command(name = "tessera")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    /// Output format (text, json)
    #[arg(global = true, short, long, default_value = "text")]
    format: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load, reload and erase one record
    Scenario {
        /// Number of preloaded records
        #[arg(short, long, default_value = "10")]
        records: i64,

        /// Record to work on
        #[arg(short, long, default_value = "6")]
        id: i64,

        /// Storage cache capacity
        #[arg(short, long, default_value = "128")]
        cache_size: usize,
    },

    /// Write records under one guard with batched commits
    Batch {
        /// Number of writes
        #[arg(short, long, default_value = "10")]
        writes: usize,

        /// Commit after this many pending writes (0 commits every write)
        #[arg(short, long, default_value = "4")]
        threshold: usize,
    },

    /// Break the connection and watch it recover
    Recover {
        /// Disable automatic recovery
        #[arg(long)]
        no_auto_recovery: bool,

        /// Make the backend refuse to reopen
        #[arg(long)]
        refuse_reopen: bool,
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
        Commands::Scenario {
            records,
            id,
            cache_size,
        } => {
            commands::scenario::run(records, id, cache_size, &cli.format)?;
        }
        Commands::Batch { writes, threshold } => {
            commands::batch::run(writes, threshold, &cli.format)?;
        }
        Commands::Recover {
            no_auto_recovery,
            refuse_reopen,
        } => {
            commands::recover::run(!no_auto_recovery, refuse_reopen, &cli.format)?;
        }
        Commands::Version => {
            println!("Tessera CLI v{}", env!("CARGO_PKG_VERSION"));
            println!("Tessera Core v{}", tessera_core::VERSION);
        }
    }

    Ok(())
}
