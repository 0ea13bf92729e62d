//! Remote endpoint backend.
//!
//! Scores each candidate with one HTTP call to a hosted inference endpoint:
//!
//! ```text
//! POST {base_url}/endpoints/{endpoint_name}/invocations
//! {"text": "<query>", "image": "<hex-encoded image bytes>"}
//!
//! 200 {"similarity": 0.27, ...}
//! ```
//!
//! A call that fails, times out, or returns no similarity drops that one
//! candidate. Transient failures are retried with exponential backoff.

use async_trait::async_trait;
use futures_util::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use super::health::probe_image;
use super::retry;
use super::{EmbeddingBackend, EncodedQuery, RemoteEndpoints};
use crate::config::Config;
use crate::error::{PipelineError, SearchError};
use crate::pipeline::BatchLoader;
use crate::types::{Candidate, HealthReport, HealthStatus};

/// Invocation request body.
#[derive(Debug, Serialize)]
pub struct InvocationRequest<'a> {
    pub text: &'a str,
    /// Raw image bytes, lowercase hex
    pub image: String,
}

impl<'a> InvocationRequest<'a> {
    pub fn new(text: &'a str, image_bytes: &[u8]) -> Self {
        Self {
            text,
            image: hex::encode(image_bytes),
        }
    }
}

/// Invocation response body. Fields other than `similarity` are ignored.
#[derive(Debug, Deserialize)]
pub struct InvocationResponse {
    #[serde(default)]
    pub similarity: Option<f64>,
}

/// Options governing remote calls.
#[derive(Debug, Clone)]
struct RemoteOptions {
    timeout_ms: u64,
    retry_attempts: u32,
    retry_delay_ms: u64,
    concurrency: usize,
}

/// Shared HTTP client for all remote endpoints.
///
/// Cheap to clone; the underlying connection pool is shared.
#[derive(Clone)]
pub struct RemoteClient {
    client: reqwest::Client,
    base_url: String,
    loader: Arc<BatchLoader>,
    options: RemoteOptions,
    test_image: Option<PathBuf>,
}

impl RemoteClient {
    pub fn new(config: &Config, loader: Arc<BatchLoader>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: config.remote.base_url.trim_end_matches('/').to_string(),
            loader,
            options: RemoteOptions {
                timeout_ms: config.limits.remote_timeout_ms,
                retry_attempts: config.remote.retry_attempts,
                retry_delay_ms: config.remote.retry_delay_ms,
                concurrency: config.remote.concurrency.max(1),
            },
            test_image: config.test_image(),
        }
    }

    /// Full invocation URL for an endpoint.
    pub fn invocation_url(&self, endpoint_name: &str) -> String {
        format!("{}/endpoints/{}/invocations", self.base_url, endpoint_name)
    }

    /// A backend bound to one endpoint.
    pub fn endpoint(&self, endpoint_name: &str) -> RemoteBackend {
        RemoteBackend {
            client: self.clone(),
            endpoint_name: endpoint_name.to_string(),
        }
    }

    /// Send one invocation and return the raw HTTP response.
    async fn post(
        &self,
        endpoint_name: &str,
        path: &Path,
        text: &str,
        image_bytes: &[u8],
    ) -> Result<reqwest::Response, PipelineError> {
        let body = InvocationRequest::new(text, image_bytes);
        self.client
            .post(self.invocation_url(endpoint_name))
            .json(&body)
            .timeout(Duration::from_millis(self.options.timeout_ms))
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    PipelineError::Timeout {
                        path: path.to_path_buf(),
                        stage: "remote".to_string(),
                        timeout_ms: self.options.timeout_ms,
                    }
                } else if e.is_connect() {
                    PipelineError::Remote {
                        endpoint: endpoint_name.to_string(),
                        path: path.to_path_buf(),
                        message: format!("connection failed: {e}"),
                        status_code: None,
                    }
                } else {
                    PipelineError::Remote {
                        endpoint: endpoint_name.to_string(),
                        path: path.to_path_buf(),
                        message: format!("request failed: {e}"),
                        status_code: None,
                    }
                }
            })
    }

    /// One scoring call, no retry.
    async fn invoke(
        &self,
        endpoint_name: &str,
        path: &Path,
        text: &str,
        image_bytes: &[u8],
    ) -> Result<f64, PipelineError> {
        let remote_error = |message: String, status_code: Option<u16>| PipelineError::Remote {
            endpoint: endpoint_name.to_string(),
            path: path.to_path_buf(),
            message,
            status_code,
        };

        let resp = self.post(endpoint_name, path, text, image_bytes).await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(remote_error(
                format!("HTTP {status}: {body}"),
                Some(status.as_u16()),
            ));
        }

        let parsed: InvocationResponse = resp
            .json()
            .await
            .map_err(|e| remote_error(format!("Failed to parse response: {e}"), None))?;

        match parsed.similarity {
            Some(score) if score.is_finite() => Ok(score),
            Some(score) => Err(remote_error(
                format!("Endpoint returned non-finite similarity {score}"),
                None,
            )),
            None => Err(remote_error(
                "Endpoint returned no similarity".to_string(),
                None,
            )),
        }
    }

    /// Score one image, retrying transient failures.
    async fn score_with_retry(
        &self,
        endpoint_name: &str,
        path: &Path,
        text: &str,
        image_bytes: &[u8],
    ) -> Result<f64, PipelineError> {
        let mut attempt = 0;
        loop {
            match self.invoke(endpoint_name, path, text, image_bytes).await {
                Ok(score) => return Ok(score),
                Err(e) if attempt < self.options.retry_attempts && retry::is_retryable(&e) => {
                    let delay = retry::backoff_duration(attempt, self.options.retry_delay_ms);
                    attempt += 1;
                    tracing::debug!(
                        "Retry {attempt}/{} for {:?} after {delay:?}: {e}",
                        self.options.retry_attempts,
                        path
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Exercise an endpoint once with a probe image. Never retries.
    pub async fn check_endpoint(&self, endpoint_name: &str, test_text: &str) -> HealthReport {
        let failure = |message: &str, details: String| HealthReport {
            status: HealthStatus::Error,
            message: message.to_string(),
            endpoint_name: endpoint_name.to_string(),
            details: Some(details),
        };

        let image_bytes = match probe_image(self.test_image.as_deref()) {
            Ok(bytes) => bytes,
            Err(e) => return failure("Could not prepare test image", e.to_string()),
        };

        let start = Instant::now();
        let probe_path = Path::new("<probe>");
        match self
            .post(endpoint_name, probe_path, test_text, &image_bytes)
            .await
        {
            Ok(resp) if resp.status().is_success() => {
                tracing::info!(
                    "Endpoint {endpoint_name} responded in {}ms",
                    start.elapsed().as_millis()
                );
                HealthReport {
                    status: HealthStatus::Success,
                    message: "Endpoint test succeeded".to_string(),
                    endpoint_name: endpoint_name.to_string(),
                    details: None,
                }
            }
            Ok(resp) => {
                let status = resp.status();
                let body = resp.text().await.unwrap_or_default();
                failure("Endpoint test failed", format!("HTTP {status}: {body}"))
            }
            Err(e) => failure("Endpoint test failed", e.to_string()),
        }
    }
}

#[async_trait]
impl RemoteEndpoints for RemoteClient {
    fn backend(&self, endpoint_name: &str) -> Arc<dyn EmbeddingBackend> {
        Arc::new(self.endpoint(endpoint_name))
    }

    async fn check(&self, endpoint_name: &str, test_text: &str) -> HealthReport {
        self.check_endpoint(endpoint_name, test_text).await
    }
}

/// Backend bound to one named remote endpoint.
pub struct RemoteBackend {
    client: RemoteClient,
    endpoint_name: String,
}

impl RemoteBackend {
    pub fn endpoint_name(&self) -> &str {
        &self.endpoint_name
    }
}

#[async_trait]
impl EmbeddingBackend for RemoteBackend {
    fn name(&self) -> &str {
        &self.endpoint_name
    }

    async fn encode_query(&self, query: &str) -> Result<EncodedQuery, SearchError> {
        Ok(EncodedQuery::text_only(query))
    }

    async fn score_batch(
        &self,
        query: &EncodedQuery,
        chunk: &[Candidate],
    ) -> Vec<(Candidate, f64)> {
        let loaded = self.client.loader.load_bytes(chunk).await;
        let text = query.text();

        // `buffered` keeps results in input order regardless of completion order.
        let results: Vec<(Candidate, Result<f64, PipelineError>)> = stream::iter(loaded)
            .map(|(candidate, bytes)| async move {
                let result = self
                    .client
                    .score_with_retry(&self.endpoint_name, candidate.as_path(), text, &bytes)
                    .await;
                (candidate, result)
            })
            .buffered(self.client.options.concurrency)
            .collect()
            .await;

        results
            .into_iter()
            .filter_map(|(candidate, result)| match result {
                Ok(score) => Some((candidate, score)),
                Err(e) => {
                    tracing::error!("Skipping image {candidate}: {e}");
                    None
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invocation_request_hex_encodes_image() {
        let req = InvocationRequest::new("red sneaker", &[0xFF, 0xD8, 0x00, 0x1a]);
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["text"], "red sneaker");
        assert_eq!(json["image"], "ffd8001a");
    }

    #[test]
    fn test_invocation_response_ignores_extra_fields() {
        let resp: InvocationResponse = serde_json::from_str(
            r#"{"similarity": 0.31, "image_features": [[0.1]], "text_features": [[0.2]]}"#,
        )
        .unwrap();
        assert_eq!(resp.similarity, Some(0.31));
    }

    #[test]
    fn test_invocation_response_null_similarity() {
        let resp: InvocationResponse = serde_json::from_str(r#"{"similarity": null}"#).unwrap();
        assert!(resp.similarity.is_none());
        let resp: InvocationResponse = serde_json::from_str(r#"{}"#).unwrap();
        assert!(resp.similarity.is_none());
    }

    #[test]
    fn test_invocation_url() {
        let mut config = Config::default();
        config.remote.base_url = "http://inference.local:8080/".to_string();
        let loader = Arc::new(BatchLoader::new(10, config.limits.clone()));
        let client = RemoteClient::new(&config, loader);
        assert_eq!(
            client.invocation_url("clip-endpoint-1"),
            "http://inference.local:8080/endpoints/clip-endpoint-1/invocations"
        );
        assert_eq!(client.endpoint("clip-endpoint-1").endpoint_name(), "clip-endpoint-1");
    }
}
