//! Cheap checks run on a candidate before it is read into memory.

use std::path::Path;

use crate::config::LimitsConfig;
use crate::error::PipelineError;

/// Validates candidate files against the configured limits.
#[derive(Debug, Clone)]
pub struct Validator {
    limits: LimitsConfig,
}

impl Validator {
    /// Create a new validator with the given limits.
    pub fn new(limits: LimitsConfig) -> Self {
        Self { limits }
    }

    /// Reject files larger than `limits.max_file_size_mb`.
    pub fn check_size(&self, path: &Path, len: u64) -> Result<(), PipelineError> {
        let max_bytes = self.limits.max_file_size_mb * 1024 * 1024;
        if len > max_bytes {
            return Err(PipelineError::FileTooLarge {
                path: path.to_path_buf(),
                size_mb: len / (1024 * 1024),
                max_mb: self.limits.max_file_size_mb,
            });
        }
        Ok(())
    }
}
