//! contextresizer CLI — the main entry point.
//!
//! Commands:
//! - `resize`  — Resize a context read from a file or stdin
//! - `doctor`  — Diagnose configuration
//! - `config`  — Print the default configuration or its path

use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;

use commands::resize::{InputFormat, ResizeArgs};

#[derive(Parser)]
#[command(
    name = "contextresizer",
    about = "contextresizer — shrink LLM contexts to a token budget by relevance",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Resize a context and write it to stdout
    Resize {
        /// Read from this file instead of stdin
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Token budget of the most relevant message (defaults to config)
        #[arg(short, long)]
        max_tokens: Option<f64>,

        /// Input format
        #[arg(short, long, value_enum, default_value_t = InputFormat::Jsonl)]
        format: InputFormat,

        /// Rank with the local hashing embedder, never the provider
        #[arg(long)]
        offline: bool,
    },

    /// Diagnose configuration
    Doctor,

    /// Print the default configuration
    Config {
        /// Print the config file path instead
        #[arg(long)]
        path: bool,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // stdout carries the resized payload, so logs go to stderr
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Resize {
            input,
            max_tokens,
            format,
            offline,
        } => {
            commands::resize::run(ResizeArgs {
                input,
                max_tokens,
                format,
                offline,
            })
            .await?
        }
        Commands::Doctor => commands::doctor::run().await?,
        Commands::Config { path } => {
            if path {
                commands::config_cmd::path().await?
            } else {
                commands::config_cmd::show_default().await?
            }
        }
    }

    Ok(())
}
