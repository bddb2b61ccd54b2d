//! # Guide Retrieval CLI (`guide`)
//!
//! Builds the reference-guide index and queries it from the command line.
//!
//! ## Usage
//!
//! ```bash
//! guide --config ./config/guide.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `guide build [<document>]` | Extract, chunk, embed, and persist the index |
//! | `guide query "<text>"` | Print the nearest passages |
//! | `guide stats` | Print snapshot metadata |
//! | `guide completions <shell>` | Generate shell completions |
//!
//! Logging goes to stderr and is controlled by `RUST_LOG` (default `info`).

use clap::{CommandFactory, Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use guide_retrieval::{build_cmd, config, query_cmd};

/// Guide retrieval: index a reference guide and retrieve grounding passages.
#[derive(Parser)]
#[command(
    name = "guide",
    about = "Guide retrieval: index a reference guide and retrieve grounding passages",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/guide.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the index from a reference document.
    ///
    /// Replaces the snapshot at `[index] path` in full. Without an argument
    /// the document configured at `[index] document` is used.
    Build {
        /// Document to index (PDF or plain text).
        document: Option<PathBuf>,
    },

    /// Retrieve the passages nearest to a question.
    Query {
        /// The question text.
        query: String,

        /// Number of passages to return (defaults to `[retrieval] top_k`).
        #[arg(long)]
        k: Option<usize>,

        /// Print the grounding context handed to the language model.
        #[arg(long)]
        context: bool,
    },

    /// Show metadata about the current index snapshot.
    Stats,

    /// Generate shell completions.
    Completions {
        /// Target shell.
        shell: clap_complete::Shell,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if let Commands::Completions { shell } = &cli.command {
        clap_complete::generate(*shell, &mut Cli::command(), "guide", &mut std::io::stdout());
        return Ok(());
    }

    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Build { document } => {
            build_cmd::run_build(&cfg, document).await?;
        }
        Commands::Query { query, k, context } => {
            query_cmd::run_query(&cfg, &query, k, context).await?;
        }
        Commands::Stats => {
            build_cmd::run_stats(&cfg)?;
        }
        Commands::Completions { .. } => {
            // Handled above (before config loading)
            unreachable!()
        }
    }

    Ok(())
}
