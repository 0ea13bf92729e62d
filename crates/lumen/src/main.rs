//! Lumen CLI - text-to-image semantic search over an image catalog.
//!
//! Scores catalog images against a natural-language query with a CLIP-style
//! model (in-process or behind a remote endpoint) and prints the matches,
//! best first, as JSON.
//!
//! # Usage
//!
//! ```bash
//! # Search a directory with the local model
//! lumen search "red leather sneaker" ./catalog/
//!
//! # Search through a fine-tuned endpoint
//! lumen search "red leather sneaker" ./catalog/ --endpoint clip-endpoint-1
//!
//! # Narrow earlier results with a second query
//! lumen search "sneaker" ./catalog/ -o first.json
//! lumen refine "red laces" --from first.json
//!
//! # Raw JSON request on stdin
//! echo '{"query": "sneaker", "images": ["a.jpg"]}' | lumen request -
//! ```

use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod cli;
mod logging;

/// Lumen - text-to-image semantic search over an image catalog.
#[derive(Parser, Debug)]
#[command(name = "lumen")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose (debug) logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output logs in JSON format
    #[arg(long, global = true)]
    json_logs: bool,

    /// Config file to use instead of the default location
    #[arg(long, global = true, env = "LUMEN_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Score images against a text query
    Search(cli::search::SearchArgs),

    /// Re-rank earlier search results against a new query
    Refine(cli::refine::RefineArgs),

    /// Run a raw JSON search request
    Request(cli::request::RequestArgs),

    /// Inspect the local model and registered endpoints
    Models(cli::models::ModelsArgs),

    /// Exercise remote inference endpoints
    Endpoint(cli::endpoint::EndpointArgs),

    /// View and manage configuration
    Config(cli::config::ConfigArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Logging isn't initialized yet, so use eprintln for config warnings.
    let config = match lumen_core::Config::load_or_default(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            if let Some(path) = &cli.config {
                anyhow::bail!("Failed to load config {}: {e}", path.display());
            }
            eprintln!(
                "Warning: Failed to load config: {e}\n  \
                 Using default configuration. Check your config file with `lumen config path`."
            );
            lumen_core::Config::default()
        }
    };
    logging::init_from_config(&config, cli.verbose, cli.json_logs);

    tracing::debug!("Lumen v{}", lumen_core::VERSION);

    match cli.command {
        Commands::Search(args) => cli::search::execute(args, config).await,
        Commands::Refine(args) => cli::refine::execute(args, config).await,
        Commands::Request(args) => cli::request::execute(args, config).await,
        Commands::Models(args) => cli::models::execute(args, &config),
        Commands::Endpoint(args) => cli::endpoint::execute(args, &config).await,
        Commands::Config(args) => cli::config::execute(args, &config, cli.config.as_deref()),
    }
}
