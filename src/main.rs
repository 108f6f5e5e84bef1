//! # docqa CLI
//!
//! Inspect how documents are chunked, run context retrieval from the
//! command line, or start the HTTP server.
//!
//! ## Usage
//!
//! ```bash
//! docqa --config ./config/docqa.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `docqa chunk <file>` | Segment a document and print its chunks |
//! | `docqa stats <file>` | Print chunk size statistics |
//! | `docqa context <file> "<query>"` | Build the context for a question |
//! | `docqa serve` | Start the HTTP server |
//!
//! Logging goes to stderr. It is quiet by default; `--verbose` raises it
//! to `info`, and `RUST_LOG` overrides both.

use clap::{Parser, Subcommand};
use docqa_context::{chunk, config, context, server, stats};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// docqa: context retrieval for document question answering.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. A missing file means built-in defaults with rating disabled.
#[derive(Parser)]
#[command(
    name = "docqa",
    about = "Context retrieval for document question answering",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/docqa.toml")]
    config: PathBuf,

    /// Enable verbose logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Segment a document into overlapping chunks and print them.
    Chunk {
        /// PDF or text file.
        file: PathBuf,

        /// Print the chunk list as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Print chunk count, average size, and size distribution.
    Stats {
        /// PDF or text file.
        file: PathBuf,
    },

    /// Build the context for answering `query` from `file`.
    ///
    /// Uses the rater configured in `[rater]`; with none, chunks are
    /// ordered by keyword score alone.
    Context {
        /// PDF or text file.
        file: PathBuf,

        /// The question.
        query: String,

        /// Number of chunks to keep after ranking.
        #[arg(long)]
        top_k: Option<usize>,

        /// Maximum context length in characters.
        #[arg(long)]
        max_context_length: Option<usize>,

        /// Print the full context bundle as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Start the HTTP server on `[server].bind`.
    Serve,
}

fn init_logging(verbose: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if verbose {
            EnvFilter::new("info")
        } else {
            EnvFilter::new("warn")
        }
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let cfg = config::load_or_default(&cli.config)?;

    match cli.command {
        Commands::Chunk { file, json } => {
            chunk::run_chunk(&cfg, &file, json)?;
        }
        Commands::Stats { file } => {
            stats::run_stats(&cfg, &file)?;
        }
        Commands::Context {
            file,
            query,
            top_k,
            max_context_length,
            json,
        } => {
            context::run_context(&cfg, &file, &query, top_k, max_context_length, json).await?;
        }
        Commands::Serve => {
            server::run_server(&cfg).await?;
        }
    }

    Ok(())
}
