//! Shared command plumbing: service construction, input, and output.

use clap::ValueEnum;
use lumen_core::embedding::ModelFiles;
use lumen_core::output::OutputFormat as CoreOutputFormat;
use lumen_core::{Config, LocalBackend, OutputWriter, SearchResponse, SearchService};
use std::fs::File;
use std::io::{BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Supported output formats.
#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum OutputFormat {
    /// Single JSON array
    Json,
    /// One JSON object per line (newline-delimited)
    Jsonl,
}

impl From<OutputFormat> for CoreOutputFormat {
    fn from(format: OutputFormat) -> Self {
        match format {
            OutputFormat::Json => CoreOutputFormat::Json,
            OutputFormat::Jsonl => CoreOutputFormat::JsonLines,
        }
    }
}

/// Build the search service, loading the local model only when it is needed.
///
/// A local model that fails to load aborts the command.
pub fn build_service(config: &Config, needs_local: bool) -> anyhow::Result<Arc<SearchService>> {
    let service = SearchService::from_config(config);
    if !needs_local {
        return Ok(Arc::new(service));
    }

    let files = ModelFiles::resolve(&config.embedding, &config.model_dir());
    if !files.exist() {
        let missing: Vec<String> = files
            .missing()
            .iter()
            .map(|p| format!("    {}", p.display()))
            .collect();
        anyhow::bail!(
            "Local model {} is not installed. Missing:\n{}\n\n  \
             Hint: Export the model to ONNX into {}, or pass --endpoint to search \
             through a deployed endpoint. See `lumen models check`.",
            config.embedding.model,
            missing.join("\n"),
            config.model_dir().join(&config.embedding.model).display()
        );
    }

    let local = LocalBackend::load(config, service.loader())
        .map_err(|e| anyhow::anyhow!("Failed to load local model: {e}"))?;
    tracing::info!("Local model {} ready", config.embedding.model);
    Ok(Arc::new(service.with_local(Arc::new(local))))
}

/// Read a request or result file, with `-` meaning stdin.
pub fn read_input(source: &Path) -> anyhow::Result<String> {
    if source == Path::new("-") {
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf)?;
        return Ok(buf);
    }
    std::fs::read_to_string(source)
        .map_err(|e| anyhow::anyhow!("Failed to read {}: {e}", source.display()))
}

/// Where and how to write a response.
pub struct OutputTarget {
    pub path: Option<PathBuf>,
    pub format: CoreOutputFormat,
    pub pretty: bool,
}

impl OutputTarget {
    /// Resolve CLI flags against the `[output]` config section.
    pub fn resolve(config: &Config, format: Option<OutputFormat>, path: Option<PathBuf>) -> Self {
        let format = format
            .map(CoreOutputFormat::from)
            .or_else(|| CoreOutputFormat::parse(&config.output.format))
            .unwrap_or_default();
        Self {
            path,
            format,
            pretty: config.output.pretty,
        }
    }

    /// Write the response, then fail if it is an error response.
    pub fn emit(&self, response: &SearchResponse) -> anyhow::Result<()> {
        match &self.path {
            Some(path) => {
                let file = File::create(path)?;
                let mut writer = OutputWriter::new(BufWriter::new(file), self.format, self.pretty);
                writer.write_response(response)?;
                writer.flush()?;
                if let SearchResponse::Results(results) = response {
                    tracing::info!("Wrote {} results to {:?}", results.len(), path);
                }
            }
            None => {
                let stdout = std::io::stdout();
                let mut writer = OutputWriter::new(stdout.lock(), self.format, self.pretty);
                writer.write_response(response)?;
                writer.flush()?;
            }
        }

        if let SearchResponse::Error { error } = response {
            anyhow::bail!("{error}");
        }
        Ok(())
    }
}

/// Write any serializable value as JSON to stdout.
pub fn print_json<T: serde::Serialize>(value: &T, pretty: bool) -> anyhow::Result<()> {
    let stdout = std::io::stdout();
    let mut lock = stdout.lock();
    if pretty {
        serde_json::to_writer_pretty(&mut lock, value)?;
    } else {
        serde_json::to_writer(&mut lock, value)?;
    }
    writeln!(lock)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_target_prefers_flag() {
        let mut config = Config::default();
        config.output.format = "jsonl".to_string();

        let target = OutputTarget::resolve(&config, Some(OutputFormat::Json), None);
        assert_eq!(target.format, CoreOutputFormat::Json);

        let target = OutputTarget::resolve(&config, None, None);
        assert_eq!(target.format, CoreOutputFormat::JsonLines);
    }

    #[test]
    fn test_emit_writes_file_and_fails_on_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.json");
        let target = OutputTarget::resolve(&Config::default(), None, Some(path.clone()));

        let ok = SearchResponse::Results(vec![]);
        target.emit(&ok).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "[]\n");

        let err = SearchResponse::Error {
            error: "Invalid request: query must not be empty".to_string(),
        };
        assert!(target.emit(&err).is_err());
        assert!(std::fs::read_to_string(&path).unwrap().contains("\"error\""));
    }

    #[test]
    fn test_build_service_without_model_fails_for_local() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.general.model_dir = dir.path().to_path_buf();

        let err = build_service(&config, true).err().unwrap();
        assert!(err.to_string().contains("not installed"));
        assert!(build_service(&config, false).is_ok());
    }

    #[test]
    fn test_read_input_missing_file() {
        let err = read_input(Path::new("/nonexistent/results.json")).unwrap_err();
        assert!(err.to_string().contains("results.json"));
    }
}
