//! Expands user-supplied paths into an ordered candidate list.

use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::config::ProcessingConfig;
use crate::types::Candidate;

/// Discovers image files in directories.
pub struct FileDiscovery {
    config: ProcessingConfig,
}

impl FileDiscovery {
    /// Create a new file discovery instance.
    pub fn new(config: ProcessingConfig) -> Self {
        Self { config }
    }

    /// Expand inputs into candidates, preserving input order.
    ///
    /// Files are passed through as given (an unreadable file is reported
    /// per-candidate later, not dropped here). Directories are walked
    /// recursively for supported extensions, sorted by path.
    pub fn expand(&self, inputs: &[PathBuf]) -> Vec<Candidate> {
        let mut candidates = Vec::new();
        for input in inputs {
            if input.is_dir() {
                candidates.extend(self.discover(input).into_iter().map(Candidate::from));
            } else {
                candidates.push(Candidate::from(input.as_path()));
            }
        }
        candidates
    }

    /// Recursively find all supported image files under a directory.
    pub fn discover(&self, dir: &Path) -> Vec<PathBuf> {
        let mut files: Vec<PathBuf> = WalkDir::new(dir)
            .follow_links(true)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file() && self.is_supported(e.path()))
            .map(|e| e.into_path())
            .collect();

        files.sort();
        files
    }

    /// Check if a file has a supported extension.
    fn is_supported(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| {
                self.config
                    .supported_formats
                    .iter()
                    .any(|fmt| fmt.eq_ignore_ascii_case(ext))
            })
            .unwrap_or(false)
    }
}
