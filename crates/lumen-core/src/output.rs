//! Result output as a JSON array or JSON Lines.

use serde::Serialize;
use std::io::{self, Write};

use crate::types::SearchResponse;

/// Output format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// A single JSON array (or object)
    #[default]
    Json,
    /// One JSON object per line (newline-delimited JSON)
    JsonLines,
}

impl OutputFormat {
    /// Parse format from string (case-insensitive).
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "json" => Some(Self::Json),
            "jsonl" | "jsonlines" | "ndjson" => Some(Self::JsonLines),
            _ => None,
        }
    }
}

/// Serializes search output to JSON or JSONL.
pub struct OutputWriter<W: Write> {
    writer: W,
    format: OutputFormat,
    pretty: bool,
}

impl<W: Write> OutputWriter<W> {
    /// `pretty` only affects the JSON format.
    pub fn new(writer: W, format: OutputFormat, pretty: bool) -> Self {
        Self {
            writer,
            format,
            pretty,
        }
    }

    /// Write one value as a single JSON document.
    pub fn write<T: Serialize + ?Sized>(&mut self, item: &T) -> io::Result<()> {
        if self.pretty && self.format == OutputFormat::Json {
            serde_json::to_writer_pretty(&mut self.writer, item).map_err(io::Error::other)?;
        } else {
            serde_json::to_writer(&mut self.writer, item).map_err(io::Error::other)?;
        }
        writeln!(self.writer)
    }

    /// Write a list: a JSON array, or one line per item for JSONL.
    pub fn write_all<T: Serialize>(&mut self, items: &[T]) -> io::Result<()> {
        match self.format {
            OutputFormat::Json => self.write(items),
            OutputFormat::JsonLines => {
                for item in items {
                    serde_json::to_writer(&mut self.writer, item).map_err(io::Error::other)?;
                    writeln!(self.writer)?;
                }
                Ok(())
            }
        }
    }

    /// Write a search response. Errors are always a single `{"error"}` object.
    pub fn write_response(&mut self, response: &SearchResponse) -> io::Result<()> {
        match response {
            SearchResponse::Results(results) => self.write_all(results),
            SearchResponse::Error { .. } => self.write(response),
        }
    }

    pub fn flush(&mut self) -> io::Result<()> {
        self.writer.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ScoredCandidate;

    fn results() -> SearchResponse {
        SearchResponse::Results(vec![
            ScoredCandidate::new("a.jpg".into(), 0.5),
            ScoredCandidate::new("b.jpg".into(), 0.25),
        ])
    }

    #[test]
    fn test_write_json_array() {
        let mut buffer = Vec::new();
        OutputWriter::new(&mut buffer, OutputFormat::Json, false)
            .write_response(&results())
            .unwrap();

        let output = String::from_utf8(buffer).unwrap();
        assert_eq!(
            output,
            "[{\"path\":\"a.jpg\",\"score\":0.5},{\"path\":\"b.jpg\",\"score\":0.25}]\n"
        );
    }

    #[test]
    fn test_write_jsonl() {
        let mut buffer = Vec::new();
        OutputWriter::new(&mut buffer, OutputFormat::JsonLines, true)
            .write_response(&results())
            .unwrap();

        let output = String::from_utf8(buffer).unwrap();
        let lines: Vec<&str> = output.trim().split('\n').collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[1], "{\"path\":\"b.jpg\",\"score\":0.25}");
    }

    #[test]
    fn test_error_is_single_object_in_jsonl() {
        let mut buffer = Vec::new();
        let response = SearchResponse::Error {
            error: "Invalid request: missing field `images`".to_string(),
        };
        OutputWriter::new(&mut buffer, OutputFormat::JsonLines, false)
            .write_response(&response)
            .unwrap();

        let output = String::from_utf8(buffer).unwrap();
        assert!(output.starts_with("{\"error\":"));
        assert_eq!(output.lines().count(), 1);
    }

    #[test]
    fn test_format_parse() {
        assert_eq!(OutputFormat::parse("json"), Some(OutputFormat::Json));
        assert_eq!(OutputFormat::parse("JSONL"), Some(OutputFormat::JsonLines));
        assert_eq!(OutputFormat::parse("ndjson"), Some(OutputFormat::JsonLines));
        assert_eq!(OutputFormat::parse("csv"), None);
    }
}
