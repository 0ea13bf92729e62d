//! Embedding backends: strategies that turn (query, candidate) into a score.
//!
//! - **local**: in-process ONNX model, batched forward passes
//! - **remote**: hosted scoring endpoint, one call per candidate
//! - **retry**: retry classification and backoff for remote calls
//! - **health**: synthetic probe image for endpoint health checks

pub(crate) mod health;
pub(crate) mod local;
pub(crate) mod remote;
pub(crate) mod retry;

use async_trait::async_trait;
use std::sync::Arc;

use crate::error::SearchError;
use crate::types::{Candidate, Embedding, HealthReport};

pub use health::DEFAULT_TEST_TEXT;
pub use local::LocalBackend;
pub use remote::{InvocationRequest, InvocationResponse, RemoteBackend, RemoteClient};

/// A query prepared once per request by the backend that will score it.
///
/// Backends that embed locally carry the text embedding; backends that
/// score remotely only need the text.
#[derive(Debug, Clone)]
pub struct EncodedQuery {
    text: String,
    embedding: Option<Embedding>,
}

impl EncodedQuery {
    /// A query scored remotely from its raw text.
    pub fn text_only(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            embedding: None,
        }
    }

    /// A query with its local text embedding.
    pub fn embedded(text: impl Into<String>, embedding: Embedding) -> Self {
        Self {
            text: text.into(),
            embedding: Some(embedding),
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn embedding(&self) -> Option<&Embedding> {
        self.embedding.as_ref()
    }
}

/// Strategy for scoring candidates against a query.
///
/// Uses `async_trait` so backends can be held as `Arc<dyn EmbeddingBackend>`.
#[async_trait]
pub trait EmbeddingBackend: Send + Sync {
    /// Backend name for logging.
    fn name(&self) -> &str;

    /// Prepare the query. Called exactly once per request.
    async fn encode_query(&self, query: &str) -> Result<EncodedQuery, SearchError>;

    /// Score one chunk of candidates.
    ///
    /// Never fails as a whole: candidates that cannot be loaded or scored
    /// are logged and left out. Output follows input order.
    async fn score_batch(&self, query: &EncodedQuery, chunk: &[Candidate])
        -> Vec<(Candidate, f64)>;
}

/// Source of remote endpoint backends, keyed by endpoint name.
#[async_trait]
pub trait RemoteEndpoints: Send + Sync {
    /// Backend that scores through the named endpoint.
    fn backend(&self, endpoint_name: &str) -> Arc<dyn EmbeddingBackend>;

    /// Exercise the named endpoint once with a probe image.
    async fn check(&self, endpoint_name: &str, test_text: &str) -> HealthReport;
}
