//! The `lumen refine` command: secondary search over earlier results.

use clap::Args;
use lumen_core::search::refine_response;
use lumen_core::{Config, PriorResult, SecondarySearchRequest};
use std::path::PathBuf;

use super::setup::{build_service, read_input, OutputFormat, OutputTarget};

/// Arguments for the `refine` command.
#[derive(Args, Debug)]
pub struct RefineArgs {
    /// Text query to re-rank with
    pub query: String,

    /// Earlier results as a JSON array or JSON Lines (`-` for stdin)
    #[arg(long, value_name = "FILE")]
    pub from: PathBuf,

    /// Minimum similarity score to include (inclusive)
    #[arg(short = 's', long, allow_negative_numbers = true)]
    pub min_score: Option<f64>,

    /// Score through this remote endpoint instead of the local model
    #[arg(short, long)]
    pub endpoint: Option<String>,

    /// Output format (defaults to `output.format` from config)
    #[arg(short, long, value_enum)]
    pub format: Option<OutputFormat>,

    /// Output file (defaults to stdout)
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

/// Execute the refine command.
pub async fn execute(args: RefineArgs, config: Config) -> anyhow::Result<()> {
    let content = read_input(&args.from)?;
    let primary_results = parse_prior_results(&content)?;
    tracing::info!("Refining {} earlier results", primary_results.len());

    let request = SecondarySearchRequest {
        query: args.query,
        primary_results,
        min_score: args.min_score,
        endpoint_name: args.endpoint,
    };

    let service = build_service(&config, request.endpoint_name.is_none())?;
    let response = refine_response(service, request).await;

    OutputTarget::resolve(&config, args.format, args.output).emit(&response)
}

/// Accept either a JSON array of results or one result per line.
fn parse_prior_results(content: &str) -> anyhow::Result<Vec<PriorResult>> {
    let trimmed = content.trim_start();
    if trimmed.starts_with('[') {
        return serde_json::from_str(trimmed)
            .map_err(|e| anyhow::anyhow!("Invalid results array: {e}"));
    }
    if trimmed.starts_with("{\"error\"") {
        anyhow::bail!("Input holds an error response, not results");
    }

    trimmed
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(i, line)| {
            serde_json::from_str(line)
                .map_err(|e| anyhow::anyhow!("Invalid result on line {}: {e}", i + 1))
        })
        .collect()
}
