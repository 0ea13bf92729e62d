//! Sub-configuration structs with their defaults.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Default inclusive similarity threshold for search results.
pub const DEFAULT_MIN_SCORE: f64 = 0.155;

/// Default number of candidates per loader chunk.
pub const DEFAULT_BATCH_SIZE: usize = 10;

/// General settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Directory where models are stored
    pub model_dir: PathBuf,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            model_dir: PathBuf::from("~/.lumen/models"),
        }
    }
}

/// File discovery settings (used when the CLI expands directories).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessingConfig {
    /// Supported input formats
    pub supported_formats: Vec<String>,
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            supported_formats: ["jpg", "jpeg", "png", "webp", "gif", "bmp", "tif", "tiff"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

/// Search defaults applied when a request leaves them out.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Minimum similarity score (inclusive) for a result to be returned
    pub min_score: f64,

    /// Candidates per batch (bounds peak memory and in-flight calls)
    pub batch_size: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            min_score: DEFAULT_MIN_SCORE,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }
}

/// Resource limits to protect against problematic inputs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Maximum file size in megabytes
    pub max_file_size_mb: u64,

    /// Maximum image dimension (width or height)
    pub max_image_dimension: u32,

    /// Decode timeout in milliseconds
    pub decode_timeout_ms: u64,

    /// Timeout for one batch forward pass in milliseconds
    pub embed_timeout_ms: u64,

    /// Timeout for one remote endpoint call in milliseconds
    pub remote_timeout_ms: u64,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_file_size_mb: 100,
            max_image_dimension: 10000,
            decode_timeout_ms: 5000,
            embed_timeout_ms: 30000,
            remote_timeout_ms: 30000,
        }
    }
}

/// Local embedding model settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// Model directory name under `general.model_dir`
    pub model: String,

    /// Square input size expected by the vision encoder
    pub image_size: u32,

    /// Token sequence length expected by the text encoder
    pub max_text_length: usize,

    /// Per-channel (RGB) normalization mean
    pub norm_mean: [f32; 3],

    /// Per-channel (RGB) normalization std
    pub norm_std: [f32; 3],
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            model: "clip-vit-large-patch14".to_string(),
            image_size: 224,
            max_text_length: 77,
            norm_mean: [0.481_454_66, 0.457_827_5, 0.408_210_73],
            norm_std: [0.268_629_54, 0.261_302_6, 0.275_777_1],
        }
    }
}

/// Remote inference endpoint settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    /// Base URL of the inference runtime. Calls go to
    /// `{base_url}/endpoints/{endpoint_name}/invocations`.
    pub base_url: String,

    /// Extra attempts for retryable failures (0 disables retry)
    pub retry_attempts: u32,

    /// Base backoff delay in milliseconds
    pub retry_delay_ms: u64,

    /// Max in-flight endpoint calls within one batch (1 = sequential)
    pub concurrency: usize,

    /// Fixture image used by the endpoint health check
    #[serde(skip_serializing_if = "Option::is_none")]
    pub test_image: Option<PathBuf>,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080".to_string(),
            retry_attempts: 2,
            retry_delay_ms: 500,
            concurrency: 1,
            test_image: None,
        }
    }
}

/// Static model registry contents.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// Display name of the default (local) model
    pub default_name: String,

    /// Description of the default (local) model
    pub default_description: String,

    /// Deployed fine-tuned endpoints
    pub endpoints: Vec<EndpointEntry>,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            default_name: "CLIP default model".to_string(),
            default_description: "Default CLIP ViT-L/14 model".to_string(),
            endpoints: Vec::new(),
        }
    }
}

/// A deployed fine-tuned model endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndpointEntry {
    /// Registry identifier
    pub id: String,

    /// Display name
    pub name: String,

    /// Endpoint name passed as `endpoint_name` in search requests
    pub endpoint_name: String,

    /// Human-readable description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Path to the training run's `model_info.json`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_info: Option<PathBuf>,
}

/// Output settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Default output format ("json" or "jsonl")
    pub format: String,

    /// Pretty-print JSON output
    pub pretty: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: "json".to_string(),
            pretty: false,
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: error, warn, info, debug, trace
    pub level: String,

    /// Log format: "pretty" or "json"
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}
