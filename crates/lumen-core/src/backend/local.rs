//! In-process model backend.
//!
//! Encodes the query once, then for each chunk decodes the images, stacks
//! them into one tensor batch, and scores each image embedding against the
//! query by dot product. Batch tensors are released before the next chunk.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

use super::{EmbeddingBackend, EncodedQuery};
use crate::config::Config;
use crate::embedding::{ImageEncoder, ModelFiles, Preprocessor, TextEncoder};
use crate::error::{PipelineError, SearchError};
use crate::pipeline::BatchLoader;
use crate::types::{Candidate, Embedding};

/// Backend running the default CLIP model in-process.
pub struct LocalBackend {
    image_encoder: Arc<dyn ImageEncoder>,
    text_encoder: Arc<dyn TextEncoder>,
    preprocessor: Preprocessor,
    loader: Arc<BatchLoader>,
    embed_timeout: Duration,
}

impl LocalBackend {
    pub fn new(
        image_encoder: Arc<dyn ImageEncoder>,
        text_encoder: Arc<dyn TextEncoder>,
        preprocessor: Preprocessor,
        loader: Arc<BatchLoader>,
        embed_timeout_ms: u64,
    ) -> Self {
        Self {
            image_encoder,
            text_encoder,
            preprocessor,
            loader,
            embed_timeout: Duration::from_millis(embed_timeout_ms),
        }
    }

    /// Load the configured model from disk.
    ///
    /// Fails if any model file is missing or cannot be loaded. Callers treat
    /// this as fatal.
    pub fn load(config: &Config, loader: Arc<BatchLoader>) -> Result<Self, PipelineError> {
        let files = ModelFiles::resolve(&config.embedding, &config.model_dir());
        let (vision, text) = files.load(&config.embedding)?;
        Ok(Self::new(
            Arc::new(vision),
            Arc::new(text),
            Preprocessor::new(&config.embedding),
            loader,
            config.limits.embed_timeout_ms,
        ))
    }

    /// Preprocess and encode one batch of decoded images off the async runtime.
    async fn embed_batch(
        &self,
        images: Vec<image::DynamicImage>,
    ) -> Result<Vec<Embedding>, PipelineError> {
        let encoder = Arc::clone(&self.image_encoder);
        let preprocessor = self.preprocessor.clone();
        let count = images.len();

        let task = tokio::task::spawn_blocking(move || {
            let tensors: Vec<_> = images.iter().map(|img| preprocessor.preprocess(img)).collect();
            drop(images);
            let embeddings = encoder.encode_images(&tensors);
            drop(tensors);
            tracing::debug!("Released tensors for batch of {count}");
            embeddings
        });

        match tokio::time::timeout(self.embed_timeout, task).await {
            Ok(Ok(result)) => result,
            Ok(Err(e)) => Err(PipelineError::Model {
                message: format!("Embedding task failed: {e}"),
            }),
            Err(_) => Err(PipelineError::Model {
                message: format!(
                    "Batch embedding timed out after {}ms",
                    self.embed_timeout.as_millis()
                ),
            }),
        }
    }
}

#[async_trait]
impl EmbeddingBackend for LocalBackend {
    fn name(&self) -> &str {
        "local"
    }

    async fn encode_query(&self, query: &str) -> Result<EncodedQuery, SearchError> {
        let encoder = Arc::clone(&self.text_encoder);
        let text = query.to_string();

        let task = tokio::task::spawn_blocking(move || encoder.encode_text(&text));
        let embedding = match tokio::time::timeout(self.embed_timeout, task).await {
            Ok(Ok(Ok(embedding))) => embedding,
            Ok(Ok(Err(e))) => {
                return Err(SearchError::BackendUnavailable(format!(
                    "Failed to encode query: {e}"
                )))
            }
            Ok(Err(e)) => {
                return Err(SearchError::Internal(format!("Text encoding task failed: {e}")))
            }
            Err(_) => {
                return Err(SearchError::BackendUnavailable(format!(
                    "Query encoding timed out after {}ms",
                    self.embed_timeout.as_millis()
                )))
            }
        };

        Ok(EncodedQuery::embedded(query, embedding))
    }

    async fn score_batch(
        &self,
        query: &EncodedQuery,
        chunk: &[Candidate],
    ) -> Vec<(Candidate, f64)> {
        let Some(text_embedding) = query.embedding() else {
            tracing::error!("Local backend received a query without a text embedding");
            return vec![];
        };

        let loaded = self.loader.load_decoded(chunk).await;
        if loaded.is_empty() {
            return vec![];
        }
        let (candidates, images): (Vec<Candidate>, Vec<_>) = loaded.into_iter().unzip();

        let embeddings = match self.embed_batch(images).await {
            Ok(embeddings) => embeddings,
            Err(e) => {
                tracing::error!(
                    "Failed to embed batch of {} images, skipping: {e}",
                    candidates.len()
                );
                return vec![];
            }
        };
        if embeddings.len() != candidates.len() {
            tracing::error!(
                "Encoder returned {} embeddings for {} images, skipping batch",
                embeddings.len(),
                candidates.len()
            );
            return vec![];
        }

        candidates
            .into_iter()
            .zip(embeddings)
            .filter_map(|(candidate, embedding)| {
                match text_embedding.similarity(&embedding) {
                    Some(score) => Some((candidate, f64::from(score))),
                    None => {
                        tracing::error!(
                            "Skipping image {candidate}: embedding dimension {} does not match query dimension {}",
                            embedding.dim(),
                            text_embedding.dim()
                        );
                        None
                    }
                }
            })
            .collect()
    }
}
