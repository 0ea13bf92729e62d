//! CLIP-style embedding generation via ONNX Runtime.
//!
//! A model directory holds three files exported from the (fine-tuned or
//! stock) checkpoint:
//!
//! ```text
//! {model_dir}/{model}/visual.onnx       image tower
//! {model_dir}/{model}/text_model.onnx   text tower
//! {model_dir}/{model}/tokenizer.json    text tokenizer
//! ```
//!
//! The encoders sit behind [`ImageEncoder`] and [`TextEncoder`] so the local
//! backend can be exercised without model files.

pub(crate) mod preprocess;
pub(crate) mod text;
pub(crate) mod vision;

use std::path::{Path, PathBuf};

use ndarray::Array4;

use crate::config::EmbeddingConfig;
use crate::error::PipelineError;
use crate::types::Embedding;

pub use preprocess::Preprocessor;
pub use text::OnnxTextEncoder;
pub use vision::OnnxImageEncoder;

/// The visual encoder ONNX model filename.
pub const VISUAL_MODEL_FILENAME: &str = "visual.onnx";
/// The text encoder ONNX model filename.
pub const TEXT_MODEL_FILENAME: &str = "text_model.onnx";
/// The tokenizer filename.
pub const TOKENIZER_FILENAME: &str = "tokenizer.json";

/// Encodes a batch of preprocessed `[1, 3, S, S]` image tensors.
pub trait ImageEncoder: Send + Sync {
    /// Returns one unit-normalized embedding per input tensor, in order.
    fn encode_images(&self, tensors: &[Array4<f32>]) -> Result<Vec<Embedding>, PipelineError>;
}

/// Encodes query text.
pub trait TextEncoder: Send + Sync {
    /// Returns a unit-normalized embedding for `text`.
    fn encode_text(&self, text: &str) -> Result<Embedding, PipelineError>;
}

/// Resolved paths of a model's files.
#[derive(Debug, Clone)]
pub struct ModelFiles {
    pub visual: PathBuf,
    pub text: PathBuf,
    pub tokenizer: PathBuf,
}

impl ModelFiles {
    /// Resolve file paths for the configured model under `model_dir`.
    pub fn resolve(config: &EmbeddingConfig, model_dir: &Path) -> Self {
        let dir = model_dir.join(&config.model);
        Self {
            visual: dir.join(VISUAL_MODEL_FILENAME),
            text: dir.join(TEXT_MODEL_FILENAME),
            tokenizer: dir.join(TOKENIZER_FILENAME),
        }
    }

    /// Files that are not present on disk.
    pub fn missing(&self) -> Vec<&Path> {
        [&self.visual, &self.text, &self.tokenizer]
            .into_iter()
            .filter(|p| !p.exists())
            .map(PathBuf::as_path)
            .collect()
    }

    /// Whether every model file exists.
    pub fn exist(&self) -> bool {
        self.missing().is_empty()
    }

    /// Load both encoders.
    pub fn load(
        &self,
        config: &EmbeddingConfig,
    ) -> Result<(OnnxImageEncoder, OnnxTextEncoder), PipelineError> {
        if let Some(missing) = self.missing().first() {
            return Err(PipelineError::Model {
                message: format!(
                    "Model file not found: {}. Export the model to ONNX and place it there.",
                    missing.display()
                ),
            });
        }

        tracing::info!("Loading vision encoder from {:?}", self.visual);
        let vision = OnnxImageEncoder::load(&self.visual)?;
        tracing::info!("Loading text encoder from {:?}", self.text);
        let text = OnnxTextEncoder::load(&self.text, &self.tokenizer, config.max_text_length)?;
        tracing::info!("Model {} loaded successfully", config.model);

        Ok((vision, text))
    }
}
