//! The `lumen search` command.

use clap::Args;
use lumen_core::pipeline::FileDiscovery;
use lumen_core::search::search_response;
use lumen_core::{Config, SearchRequest};
use std::path::PathBuf;

use super::setup::{build_service, OutputFormat, OutputTarget};

/// Arguments for the `search` command.
#[derive(Args, Debug)]
pub struct SearchArgs {
    /// Text query
    pub query: String,

    /// Image files or directories to search
    #[arg(required = true)]
    pub paths: Vec<PathBuf>,

    /// Minimum similarity score to include (inclusive)
    #[arg(short = 's', long, allow_negative_numbers = true)]
    pub min_score: Option<f64>,

    /// Score through this remote endpoint instead of the local model
    #[arg(short, long)]
    pub endpoint: Option<String>,

    /// Images per batch
    #[arg(short, long)]
    pub batch_size: Option<usize>,

    /// Output format (defaults to `output.format` from config)
    #[arg(short, long, value_enum)]
    pub format: Option<OutputFormat>,

    /// Output file (defaults to stdout)
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

/// Execute the search command.
pub async fn execute(args: SearchArgs, mut config: Config) -> anyhow::Result<()> {
    if let Some(batch_size) = args.batch_size {
        if batch_size == 0 {
            anyhow::bail!("--batch-size must be at least 1");
        }
        config.search.batch_size = batch_size;
    }

    for path in args.paths.iter().filter(|p| !p.exists()) {
        tracing::warn!("Input path does not exist: {:?}", path);
    }

    let images = FileDiscovery::new(config.processing.clone()).expand(&args.paths);
    tracing::info!("Searching {} images", images.len());

    let request = SearchRequest {
        query: args.query,
        images,
        min_score: args.min_score,
        endpoint_name: args.endpoint,
    };

    let service = build_service(&config, request.endpoint_name.is_none())?;
    let response = search_response(service, request).await;

    OutputTarget::resolve(&config, args.format, args.output).emit(&response)
}
