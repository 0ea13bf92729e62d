//! ONNX vision encoder session.
//!
//! Runs a CLIP-style visual tower exported to ONNX over a stacked batch of
//! preprocessed images and returns one normalized embedding per image.

use std::path::Path;
use std::sync::Mutex;

use ndarray::Array4;
use ort::session::Session;
use ort::value::Value;

use super::ImageEncoder;
use crate::error::PipelineError;
use crate::types::Embedding;

/// Output tensors that carry the projected image embedding, in preference order.
const IMAGE_OUTPUTS: &[&str] = &["image_embeds", "pooler_output"];

/// Wraps an ONNX Runtime session for the visual encoder.
///
/// Uses a `Mutex` because `Session::run` requires `&mut self`.
pub struct OnnxImageEncoder {
    session: Mutex<Session>,
    /// Name of the input tensor (detected from model metadata).
    input_name: String,
}

impl OnnxImageEncoder {
    /// Load a visual encoder from an ONNX file.
    pub fn load(model_path: &Path) -> Result<Self, PipelineError> {
        let session = Session::builder()
            .map_err(|e| PipelineError::Model {
                message: format!("Failed to create ONNX session builder: {e}"),
            })?
            .commit_from_file(model_path)
            .map_err(|e| PipelineError::Model {
                message: format!("Failed to load vision model {model_path:?}: {e}"),
            })?;

        let input_name = session
            .inputs()
            .first()
            .map(|i| i.name().to_string())
            .unwrap_or_else(|| "pixel_values".to_string());

        tracing::debug!(
            "Loaded vision encoder from {:?} (input: {:?}, outputs: {:?})",
            model_path,
            input_name,
            session
                .outputs()
                .iter()
                .map(|o| o.name())
                .collect::<Vec<_>>()
        );

        Ok(Self {
            session: Mutex::new(session),
            input_name,
        })
    }
}

impl ImageEncoder for OnnxImageEncoder {
    fn encode_images(&self, tensors: &[Array4<f32>]) -> Result<Vec<Embedding>, PipelineError> {
        let batch_size = tensors.len();
        if batch_size == 0 {
            return Ok(vec![]);
        }

        let (batch_shape, flat_data) = stack_batch(tensors)?;
        let input_value =
            Value::from_array((batch_shape, flat_data)).map_err(|e| PipelineError::Model {
                message: format!("Failed to create batch input tensor: {e}"),
            })?;

        let mut session = self.session.lock().map_err(|e| PipelineError::Model {
            message: format!("Vision session lock poisoned: {e}"),
        })?;

        let outputs = session
            .run(ort::inputs![self.input_name.as_str() => input_value])
            .map_err(|e| PipelineError::Model {
                message: format!("ONNX batch inference failed: {e}"),
            })?;

        let output = IMAGE_OUTPUTS
            .iter()
            .find_map(|wanted| outputs.iter().find(|(name, _)| name == wanted))
            .ok_or_else(|| PipelineError::Model {
                message: format!("Vision model produced none of {IMAGE_OUTPUTS:?}"),
            })?;

        let (shape, data) = output
            .1
            .try_extract_tensor::<f32>()
            .map_err(|e| PipelineError::Model {
                message: format!("Failed to extract image embeddings: {e}"),
            })?;

        let embedding_dim = match shape.len() {
            1 => data.len() / batch_size,
            2 => shape[1] as usize,
            _ => {
                return Err(PipelineError::Model {
                    message: format!("Unexpected image embedding shape: {:?}", shape),
                });
            }
        };
        if embedding_dim == 0 || data.len() < embedding_dim * batch_size {
            return Err(PipelineError::Model {
                message: format!(
                    "Image embedding output too small: {} values for batch of {batch_size}",
                    data.len()
                ),
            });
        }

        Ok(data
            .chunks(embedding_dim)
            .take(batch_size)
            .map(|raw| Embedding::from_raw(raw.to_vec()))
            .collect())
    }
}

/// Stack `[1, 3, H, W]` tensors into one flat `[N, 3, H, W]` buffer.
pub(crate) fn stack_batch(tensors: &[Array4<f32>]) -> Result<(Vec<i64>, Vec<f32>), PipelineError> {
    let first = tensors.first().ok_or_else(|| PipelineError::Model {
        message: "Cannot stack an empty batch".to_string(),
    })?;
    let shape_0 = first.shape();
    if let Some(bad) = tensors.iter().find(|t| t.shape() != shape_0) {
        return Err(PipelineError::Model {
            message: format!(
                "Tensor shape mismatch in batch: expected {:?}, got {:?}",
                shape_0,
                bad.shape()
            ),
        });
    }

    let mut flat = Vec::with_capacity(tensors.len() * first.len());
    for t in tensors {
        flat.extend(t.iter().copied());
    }
    let shape = vec![
        tensors.len() as i64,
        shape_0[1] as i64,
        shape_0[2] as i64,
        shape_0[3] as i64,
    ];
    Ok((shape, flat))
}
