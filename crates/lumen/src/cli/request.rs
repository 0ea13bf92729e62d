//! The `lumen request` command: raw JSON request in, JSON response out.

use clap::Args;
use lumen_core::search::handle_request;
use lumen_core::Config;
use std::path::PathBuf;

use super::setup::{build_service, read_input, OutputTarget};

/// Arguments for the `request` command.
#[derive(Args, Debug)]
pub struct RequestArgs {
    /// Request file (`-` for stdin). A body with `primary_results` runs a
    /// secondary search; otherwise a primary search.
    #[arg(default_value = "-")]
    pub input: PathBuf,

    /// Output file (defaults to stdout)
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

/// Execute the request command.
pub async fn execute(args: RequestArgs, config: Config) -> anyhow::Result<()> {
    let body = read_input(&args.input)?;
    let service = build_service(&config, needs_local_model(&body))?;
    let response = handle_request(service, &body).await;

    let mut target = OutputTarget::resolve(&config, None, args.output);
    target.format = lumen_core::OutputFormat::Json;
    target.emit(&response)
}

/// Whether the request will be scored by the local model.
///
/// Bodies that fail to parse still go through the handler so the caller gets
/// a structured error, without paying for a model load.
fn needs_local_model(body: &str) -> bool {
    match serde_json::from_str::<serde_json::Value>(body) {
        Ok(value) => value.is_object() && value.get("endpoint_name").map_or(true, |v| v.is_null()),
        Err(_) => false,
    }
}
