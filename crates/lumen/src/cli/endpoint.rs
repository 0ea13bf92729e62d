//! The `lumen endpoint` command.

use clap::{Args, Subcommand};
use lumen_core::{Config, SearchService};

use super::setup::print_json;

/// Arguments for the `endpoint` command.
#[derive(Args, Debug)]
pub struct EndpointArgs {
    #[command(subcommand)]
    pub command: EndpointCommand,
}

/// Subcommands for remote endpoints.
#[derive(Subcommand, Debug)]
pub enum EndpointCommand {
    /// Send one probe invocation and report whether the endpoint answered
    Test {
        /// Endpoint name
        name: String,

        /// Query text sent with the probe image
        #[arg(short, long)]
        text: Option<String>,
    },
}

/// Execute the endpoint command.
pub async fn execute(args: EndpointArgs, config: &Config) -> anyhow::Result<()> {
    match args.command {
        EndpointCommand::Test { name, text } => {
            let service = SearchService::from_config(config);
            let report = service.check_endpoint(&name, text.as_deref()).await?;
            print_json(&report, config.output.pretty)?;

            if !report.is_success() {
                anyhow::bail!(
                    "Endpoint {} failed its test: {}",
                    report.endpoint_name,
                    report.details.as_deref().unwrap_or(&report.message)
                );
            }
        }
    }

    Ok(())
}
