//! Model registry: which backends a caller may select.
//!
//! The default local model is always listed first. Fine-tuned endpoints come
//! from `[[registry.endpoints]]` in the config file; an entry may point at the
//! `model_info.json` its training run wrote, which enriches its description.

use crate::config::{EndpointEntry, RegistryConfig};
use crate::error::SearchResult;
use crate::types::{BackendDescriptor, ModelInfo};

/// Id of the default local model entry.
pub const DEFAULT_MODEL_ID: &str = "1";

/// Source of available backend descriptors.
pub trait ModelRegistry: Send + Sync {
    /// All selectable backends, default first.
    fn list(&self) -> SearchResult<Vec<BackendDescriptor>>;
}

/// Registry backed by the `[registry]` config section.
#[derive(Debug, Clone)]
pub struct ConfigRegistry {
    config: RegistryConfig,
}

impl ConfigRegistry {
    pub fn new(config: RegistryConfig) -> Self {
        Self { config }
    }

    fn default_descriptor(&self) -> BackendDescriptor {
        BackendDescriptor {
            id: DEFAULT_MODEL_ID.to_string(),
            display_name: self.config.default_name.clone(),
            endpoint_name: None,
            description: self.config.default_description.clone(),
            is_default: true,
        }
    }

    fn endpoint_descriptor(entry: &EndpointEntry) -> BackendDescriptor {
        let mut description = entry
            .description
            .clone()
            .unwrap_or_else(|| "Fine-tuned on user data".to_string());

        if let Some(info_path) = &entry.model_info {
            let info_path = crate::config::expand_path(info_path);
            match ModelInfo::load(&info_path) {
                Ok(info) => {
                    description = format!(
                        "{description} (base {}, val top-1 {:.1}%)",
                        info.clip_model_type,
                        info.val_top1 * 100.0
                    );
                }
                Err(e) => {
                    tracing::warn!(
                        "Could not read model info for {} at {:?}: {e}",
                        entry.endpoint_name,
                        info_path
                    );
                }
            }
        }

        BackendDescriptor {
            id: entry.id.clone(),
            display_name: entry.name.clone(),
            endpoint_name: Some(entry.endpoint_name.clone()),
            description,
            is_default: false,
        }
    }
}

impl ModelRegistry for ConfigRegistry {
    fn list(&self) -> SearchResult<Vec<BackendDescriptor>> {
        let mut models = Vec::with_capacity(self.config.endpoints.len() + 1);
        models.push(self.default_descriptor());
        models.extend(self.config.endpoints.iter().map(Self::endpoint_descriptor));
        Ok(models)
    }
}
