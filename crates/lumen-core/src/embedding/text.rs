//! ONNX text encoder for query embeddings.
//!
//! Tokenizes the query, pads/truncates to the model's sequence length, and
//! runs the text tower to get a vector in the same space as the vision
//! encoder.

use std::path::Path;
use std::sync::Mutex;

use ort::session::Session;
use ort::value::Value;

use super::TextEncoder;
use crate::error::PipelineError;
use crate::types::Embedding;

/// Output tensors that carry the projected text embedding, in preference order.
const TEXT_OUTPUTS: &[&str] = &["text_embeds", "pooler_output"];

/// Text encoder wrapper.
///
/// Uses the same `Mutex<Session>` pattern as the vision encoder.
pub struct OnnxTextEncoder {
    session: Mutex<Session>,
    tokenizer: tokenizers::Tokenizer,
    max_length: usize,
    /// Whether the exported graph declares an `attention_mask` input.
    wants_attention_mask: bool,
}

impl OnnxTextEncoder {
    /// Load the text model and its tokenizer.
    pub fn load(
        model_path: &Path,
        tokenizer_path: &Path,
        max_length: usize,
    ) -> Result<Self, PipelineError> {
        let session = Session::builder()
            .map_err(|e| PipelineError::Model {
                message: format!("Failed to create ONNX session builder: {e}"),
            })?
            .commit_from_file(model_path)
            .map_err(|e| PipelineError::Model {
                message: format!("Failed to load text encoder model {model_path:?}: {e}"),
            })?;

        let tokenizer = tokenizers::Tokenizer::from_file(tokenizer_path).map_err(|e| {
            PipelineError::Model {
                message: format!("Failed to load tokenizer {tokenizer_path:?}: {e}"),
            }
        })?;

        let wants_attention_mask = session
            .inputs()
            .iter()
            .any(|i| i.name() == "attention_mask");

        tracing::debug!(
            "Loaded text encoder (inputs: {:?}, outputs: {:?})",
            session
                .inputs()
                .iter()
                .map(|i| i.name())
                .collect::<Vec<_>>(),
            session
                .outputs()
                .iter()
                .map(|o| o.name())
                .collect::<Vec<_>>()
        );

        Ok(Self {
            session: Mutex::new(session),
            tokenizer,
            max_length,
            wants_attention_mask,
        })
    }
}

impl TextEncoder for OnnxTextEncoder {
    fn encode_text(&self, text: &str) -> Result<Embedding, PipelineError> {
        let encoding = self
            .tokenizer
            .encode(text, true)
            .map_err(|e| PipelineError::Model {
                message: format!("Tokenization failed: {e}"),
            })?;

        let (input_ids, attention_mask) = pad_ids(encoding.get_ids(), self.max_length);
        let shape = vec![1i64, self.max_length as i64];

        let mut session = self.session.lock().map_err(|e| PipelineError::Model {
            message: format!("Text encoder lock poisoned: {e}"),
        })?;

        let ids_value = Value::from_array((shape.clone(), input_ids)).map_err(|e| {
            PipelineError::Model {
                message: format!("Failed to create input tensor: {e}"),
            }
        })?;

        let outputs = if self.wants_attention_mask {
            let mask_value = Value::from_array((shape, attention_mask)).map_err(|e| {
                PipelineError::Model {
                    message: format!("Failed to create attention mask tensor: {e}"),
                }
            })?;
            session.run(ort::inputs!["input_ids" => ids_value, "attention_mask" => mask_value])
        } else {
            session.run(ort::inputs!["input_ids" => ids_value])
        }
        .map_err(|e| PipelineError::Model {
            message: format!("Text encoder inference failed: {e}"),
        })?;

        let output = TEXT_OUTPUTS
            .iter()
            .find_map(|wanted| outputs.iter().find(|(name, _)| name == wanted))
            .ok_or_else(|| PipelineError::Model {
                message: format!("Text encoder produced none of {TEXT_OUTPUTS:?}"),
            })?;

        let (shape, data) = output
            .1
            .try_extract_tensor::<f32>()
            .map_err(|e| PipelineError::Model {
                message: format!("Failed to extract text embedding: {e}"),
            })?;

        // [1, dim] or [dim]
        let dim = match shape.len() {
            1 => data.len(),
            2 => shape[1] as usize,
            _ => {
                return Err(PipelineError::Model {
                    message: format!("Unexpected text embedding shape: {:?}", shape),
                });
            }
        };
        if dim == 0 || data.len() < dim {
            return Err(PipelineError::Model {
                message: "Text encoder returned an empty embedding".to_string(),
            });
        }

        Ok(Embedding::from_raw(data[..dim].to_vec()))
    }
}

/// Truncate or zero-pad token ids to `max_length`, with the matching mask.
fn pad_ids(ids: &[u32], max_length: usize) -> (Vec<i64>, Vec<i64>) {
    let mut input_ids = vec![0i64; max_length];
    let mut mask = vec![0i64; max_length];
    for (j, &id) in ids.iter().take(max_length).enumerate() {
        input_ids[j] = id as i64;
        mask[j] = 1;
    }
    (input_ids, mask)
}
