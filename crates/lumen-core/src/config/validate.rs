//! Configuration validation with range checks.

use std::collections::HashSet;

use crate::error::ConfigError;

use super::Config;

impl Config {
    /// Validate configuration values are within acceptable ranges.
    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        if self.search.batch_size == 0 {
            return Err(ConfigError::ValidationError(
                "search.batch_size must be > 0".into(),
            ));
        }
        if !self.search.min_score.is_finite() || !(-1.0..=1.0).contains(&self.search.min_score) {
            return Err(ConfigError::ValidationError(
                "search.min_score must be between -1.0 and 1.0".into(),
            ));
        }
        if self.limits.max_file_size_mb == 0 {
            return Err(ConfigError::ValidationError(
                "limits.max_file_size_mb must be > 0".into(),
            ));
        }
        if self.limits.max_image_dimension == 0 {
            return Err(ConfigError::ValidationError(
                "limits.max_image_dimension must be > 0".into(),
            ));
        }
        if self.limits.decode_timeout_ms == 0 {
            return Err(ConfigError::ValidationError(
                "limits.decode_timeout_ms must be > 0".into(),
            ));
        }
        if self.limits.embed_timeout_ms == 0 {
            return Err(ConfigError::ValidationError(
                "limits.embed_timeout_ms must be > 0".into(),
            ));
        }
        if self.limits.remote_timeout_ms == 0 {
            return Err(ConfigError::ValidationError(
                "limits.remote_timeout_ms must be > 0".into(),
            ));
        }
        if self.embedding.image_size == 0 {
            return Err(ConfigError::ValidationError(
                "embedding.image_size must be > 0".into(),
            ));
        }
        if self.embedding.max_text_length == 0 {
            return Err(ConfigError::ValidationError(
                "embedding.max_text_length must be > 0".into(),
            ));
        }
        if self.embedding.norm_std.iter().any(|s| *s <= 0.0) {
            return Err(ConfigError::ValidationError(
                "embedding.norm_std values must be > 0".into(),
            ));
        }
        if self.remote.concurrency == 0 {
            return Err(ConfigError::ValidationError(
                "remote.concurrency must be > 0".into(),
            ));
        }
        if self.remote.base_url.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "remote.base_url must not be empty".into(),
            ));
        }

        let mut seen = HashSet::new();
        for entry in &self.registry.endpoints {
            if entry.endpoint_name.trim().is_empty() {
                return Err(ConfigError::ValidationError(format!(
                    "registry.endpoints[{}].endpoint_name must not be empty",
                    entry.id
                )));
            }
            if !seen.insert(entry.endpoint_name.as_str()) {
                return Err(ConfigError::ValidationError(format!(
                    "registry.endpoints has duplicate endpoint_name {:?}",
                    entry.endpoint_name
                )));
            }
        }
        Ok(())
    }
}
