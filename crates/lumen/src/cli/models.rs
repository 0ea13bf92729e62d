//! The `lumen models` command.

use clap::{Args, Subcommand};
use lumen_core::embedding::ModelFiles;
use lumen_core::{Config, SearchService};

use super::setup::print_json;

/// Arguments for the `models` command.
#[derive(Args, Debug)]
pub struct ModelsArgs {
    #[command(subcommand)]
    pub command: ModelsCommand,
}

/// Subcommands for model management.
#[derive(Subcommand, Debug)]
pub enum ModelsCommand {
    /// List selectable backends (default model first, then endpoints) as JSON
    List,

    /// Show the local model directory
    Path,

    /// Check that the local model files are installed
    Check,
}

/// Execute the models command.
pub fn execute(args: ModelsArgs, config: &Config) -> anyhow::Result<()> {
    match args.command {
        ModelsCommand::List => {
            let service = SearchService::from_config(config);
            let models = service.list_models()?;
            print_json(&models, config.output.pretty)?;
        }

        ModelsCommand::Path => {
            println!(
                "{}",
                config.model_dir().join(&config.embedding.model).display()
            );
        }

        ModelsCommand::Check => {
            let files = ModelFiles::resolve(&config.embedding, &config.model_dir());

            println!("Local model: {}", config.embedding.model);
            for (label, path) in [
                ("vision encoder", &files.visual),
                ("text encoder", &files.text),
                ("tokenizer", &files.tokenizer),
            ] {
                let status = if path.exists() { "ready" } else { "missing" };
                println!("  - {:16} {:8} {}", label, status, path.display());
            }

            if !files.exist() {
                anyhow::bail!(
                    "Local model is incomplete.\n\n  \
                     Hint: Export the vision and text towers to ONNX along with \
                     tokenizer.json, or search through an endpoint with --endpoint."
                );
            }
            println!("\nAll model files present.");
        }
    }

    Ok(())
}
