//! Search orchestration.
//!
//! A search resolves the backend once, encodes the query once, then drives
//! the loader's chunks through the backend strictly in sequence and hands the
//! accumulated scores to the ranker:
//!
//! ```text
//! query ─ encode_query ─┐
//! candidates ─ chunks ──┴─ score_batch × N ─ rank(min_score) ─ results
//! ```

pub mod handler;
pub mod ranker;

use std::sync::Arc;
use std::time::Instant;

use crate::backend::{EmbeddingBackend, RemoteClient, RemoteEndpoints, DEFAULT_TEST_TEXT};
use crate::config::Config;
use crate::error::{SearchError, SearchResult};
use crate::pipeline::BatchLoader;
use crate::registry::{ConfigRegistry, ModelRegistry};
use crate::types::{
    BackendDescriptor, BackendSelector, Candidate, HealthReport, PriorResult, ScoredCandidate,
    SearchRequest, SecondarySearchRequest,
};

pub use handler::{
    handle_endpoint_test, handle_request, handle_search, handle_secondary_search, refine_response,
    search_response,
};
pub use ranker::rank;

/// Entry point for search, model listing, and endpoint checks.
///
/// The local backend is injected; without one, only remote endpoints can be
/// searched.
pub struct SearchService {
    local: Option<Arc<dyn EmbeddingBackend>>,
    remote: Arc<dyn RemoteEndpoints>,
    registry: Arc<dyn ModelRegistry>,
    loader: Arc<BatchLoader>,
    default_min_score: f64,
}

impl SearchService {
    pub fn new(
        remote: Arc<dyn RemoteEndpoints>,
        registry: Arc<dyn ModelRegistry>,
        loader: Arc<BatchLoader>,
        default_min_score: f64,
    ) -> Self {
        Self {
            local: None,
            remote,
            registry,
            loader,
            default_min_score,
        }
    }

    /// Build a service with the HTTP endpoint client and config registry.
    pub fn from_config(config: &Config) -> Self {
        let loader = Arc::new(BatchLoader::new(
            config.search.batch_size,
            config.limits.clone(),
        ));
        let remote = Arc::new(RemoteClient::new(config, Arc::clone(&loader)));
        let registry = Arc::new(ConfigRegistry::new(config.registry.clone()));
        Self::new(remote, registry, loader, config.search.min_score)
    }

    /// Attach the local model backend.
    pub fn with_local(mut self, local: Arc<dyn EmbeddingBackend>) -> Self {
        self.local = Some(local);
        self
    }

    pub fn has_local(&self) -> bool {
        self.local.is_some()
    }

    /// Loader shared with the backends.
    pub fn loader(&self) -> Arc<BatchLoader> {
        Arc::clone(&self.loader)
    }

    pub fn default_min_score(&self) -> f64 {
        self.default_min_score
    }

    fn backend(&self, selector: &BackendSelector) -> SearchResult<Arc<dyn EmbeddingBackend>> {
        match selector {
            BackendSelector::Local => self.local.clone().ok_or_else(|| {
                SearchError::BackendUnavailable("local model is not loaded".to_string())
            }),
            BackendSelector::Remote(name) => Ok(self.remote.backend(name)),
        }
    }

    /// Score `candidates` against `query` and return those at or above
    /// `min_score`, best first.
    pub async fn primary_search(
        &self,
        query: &str,
        candidates: &[Candidate],
        min_score: Option<f64>,
        selector: &BackendSelector,
    ) -> SearchResult<Vec<ScoredCandidate>> {
        if query.trim().is_empty() {
            return Err(SearchError::InvalidRequest(
                "query must not be empty".to_string(),
            ));
        }
        let min_score = min_score.unwrap_or(self.default_min_score);
        if !min_score.is_finite() {
            return Err(SearchError::InvalidRequest(format!(
                "min_score must be a finite number, got {min_score}"
            )));
        }

        let backend = self.backend(selector)?;
        if candidates.is_empty() {
            tracing::info!("No candidates to search");
            return Ok(vec![]);
        }

        let start = Instant::now();
        let encoded = backend.encode_query(query).await?;

        let total_batches = self.loader.batch_count(candidates.len());
        let mut scored = Vec::with_capacity(candidates.len());
        for (i, chunk) in self.loader.chunks(candidates).enumerate() {
            let batch = backend.score_batch(&encoded, chunk).await;
            tracing::info!(
                "Batch {}/{}: scored {} of {} images via {}",
                i + 1,
                total_batches,
                batch.len(),
                chunk.len(),
                backend.name()
            );
            scored.extend(batch);
        }

        let scored_count = scored.len();
        let results = ranker::rank(scored, min_score);
        tracing::info!(
            "Search via {} matched {} of {} images (scored {}, min_score {min_score}) in {}ms",
            selector.label(),
            results.len(),
            candidates.len(),
            scored_count,
            start.elapsed().as_millis()
        );
        Ok(results)
    }

    /// Re-rank the paths of an earlier result list against a new query.
    ///
    /// Stored scores are ignored; every path is scored afresh.
    pub async fn secondary_search(
        &self,
        query: &str,
        prior_results: &[PriorResult],
        min_score: Option<f64>,
        selector: &BackendSelector,
    ) -> SearchResult<Vec<ScoredCandidate>> {
        let candidates: Vec<Candidate> = prior_results.iter().map(|r| r.path.clone()).collect();
        self.primary_search(query, &candidates, min_score, selector)
            .await
    }

    /// Run a parsed primary search request.
    pub async fn search(&self, request: &SearchRequest) -> SearchResult<Vec<ScoredCandidate>> {
        let selector = BackendSelector::from_endpoint_name(request.endpoint_name.as_deref())?;
        self.primary_search(&request.query, &request.images, request.min_score, &selector)
            .await
    }

    /// Run a parsed secondary search request.
    pub async fn refine(
        &self,
        request: &SecondarySearchRequest,
    ) -> SearchResult<Vec<ScoredCandidate>> {
        let selector = BackendSelector::from_endpoint_name(request.endpoint_name.as_deref())?;
        self.secondary_search(
            &request.query,
            &request.primary_results,
            request.min_score,
            &selector,
        )
        .await
    }

    /// Available backends, default first.
    pub fn list_models(&self) -> SearchResult<Vec<BackendDescriptor>> {
        self.registry.list()
    }

    /// Exercise a remote endpoint once with a probe image.
    pub async fn check_endpoint(
        &self,
        endpoint_name: &str,
        test_text: Option<&str>,
    ) -> SearchResult<HealthReport> {
        let endpoint_name = endpoint_name.trim();
        if endpoint_name.is_empty() {
            return Err(SearchError::InvalidRequest(
                "endpoint_name is required".to_string(),
            ));
        }
        let text = test_text
            .filter(|t| !t.trim().is_empty())
            .unwrap_or(DEFAULT_TEST_TEXT);

        tracing::info!("Testing endpoint {endpoint_name}");
        Ok(self.remote.check(endpoint_name, text).await)
    }
}
