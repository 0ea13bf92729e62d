//! Core data types for Lumen search.
//!
//! Requests, results, backend descriptors, and the normalized [`Embedding`]
//! that every similarity score is computed from.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

use crate::error::{LumenError, SearchError};

/// An image identified by its filesystem path.
///
/// The path string is carried verbatim so results echo exactly what the
/// caller sent.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Candidate(String);

impl Candidate {
    pub fn new(path: impl Into<String>) -> Self {
        Self(path.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn as_path(&self) -> &Path {
        Path::new(&self.0)
    }
}

impl fmt::Display for Candidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Candidate {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for Candidate {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&Path> for Candidate {
    fn from(p: &Path) -> Self {
        Self(p.to_string_lossy().into_owned())
    }
}

impl From<PathBuf> for Candidate {
    fn from(p: PathBuf) -> Self {
        Self::from(p.as_path())
    }
}

/// A candidate with its similarity to the query. The sole result unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredCandidate {
    /// Image path as given in the request
    pub path: String,

    /// Cosine similarity in [-1, 1]
    pub score: f64,
}

impl ScoredCandidate {
    pub fn new(candidate: Candidate, score: f64) -> Self {
        Self {
            path: candidate.0,
            score,
        }
    }
}

/// A unit-length embedding vector.
///
/// The only constructor normalizes, so every `Embedding` that reaches a dot
/// product has unit norm. A zero vector stays zero and scores 0 against
/// everything.
#[derive(Debug, Clone, PartialEq)]
pub struct Embedding(Vec<f32>);

impl Embedding {
    /// L2-normalize a raw model output into an embedding.
    pub fn from_raw(mut raw: Vec<f32>) -> Self {
        crate::math::l2_normalize_in_place(&mut raw);
        Self(raw)
    }

    /// Number of dimensions.
    pub fn dim(&self) -> usize {
        self.0.len()
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }

    /// Cosine similarity with another embedding (dot product of unit vectors).
    ///
    /// Returns `None` if the dimensions differ.
    pub fn similarity(&self, other: &Embedding) -> Option<f32> {
        if self.dim() != other.dim() {
            return None;
        }
        Some(crate::math::dot(&self.0, &other.0))
    }

    pub fn into_inner(self) -> Vec<f32> {
        self.0
    }
}

/// Which backend scores a request. Resolved once at the request boundary.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum BackendSelector {
    /// The in-process default model
    #[default]
    Local,
    /// A named remote inference endpoint
    Remote(String),
}

impl BackendSelector {
    /// Build a selector from an optional `endpoint_name` request field.
    ///
    /// A present but blank name is rejected rather than silently falling
    /// back to the local model.
    pub fn from_endpoint_name(name: Option<&str>) -> Result<Self, SearchError> {
        match name {
            None => Ok(Self::Local),
            Some(n) if n.trim().is_empty() => Err(SearchError::InvalidRequest(
                "endpoint_name must not be empty".to_string(),
            )),
            Some(n) => Ok(Self::Remote(n.trim().to_string())),
        }
    }

    /// Short label for logging.
    pub fn label(&self) -> &str {
        match self {
            Self::Local => "local",
            Self::Remote(name) => name,
        }
    }
}

/// Primary search request: a query against a list of image paths.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchRequest {
    pub query: String,

    /// Candidate image paths, in caller order
    pub images: Vec<Candidate>,

    /// Inclusive score threshold (defaults to `search.min_score`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_score: Option<f64>,

    /// Remote endpoint to score with; absent means the local model
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint_name: Option<String>,
}

/// One entry of a previous search's results.
///
/// Only `path` is used. The stored `score` and any extra fields the caller
/// attached are accepted and ignored; candidates are always re-scored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriorResult {
    pub path: Candidate,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,

    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Secondary (refinement) search request over prior results.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecondarySearchRequest {
    pub query: String,

    /// Results of an earlier search to re-rank
    pub primary_results: Vec<PriorResult>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_score: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint_name: Option<String>,
}

/// Response of a search call as returned over the wire.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SearchResponse {
    /// Results sorted by descending score
    Results(Vec<ScoredCandidate>),
    /// Request-level failure
    Error { error: String },
}

impl SearchResponse {
    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error { .. })
    }
}

/// Describes an available embedding backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackendDescriptor {
    pub id: String,

    /// Display name
    #[serde(rename = "name")]
    pub display_name: String,

    /// Endpoint name to pass in requests; `None` for the default local model
    pub endpoint_name: Option<String>,

    pub description: String,

    pub is_default: bool,
}

/// Health check outcome status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Success,
    Error,
}

/// Result of exercising a remote endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthReport {
    pub status: HealthStatus,

    pub message: String,

    pub endpoint_name: String,

    /// Failure details (HTTP status, error text)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl HealthReport {
    pub fn is_success(&self) -> bool {
        self.status == HealthStatus::Success
    }
}

/// Training run summary written next to a fine-tuned checkpoint as
/// `model_info.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelInfo {
    /// Base CLIP variant the run fine-tuned (e.g. "ViT-B/32")
    pub clip_model_type: String,
    pub epochs: u32,
    pub batch_size: u32,
    pub learning_rate: f64,
    /// Best validation top-1 retrieval accuracy
    pub val_top1: f64,
}

impl ModelInfo {
    /// Read a `model_info.json` file.
    pub fn load(path: &Path) -> Result<Self, LumenError> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embedding_is_unit_length() {
        let e = Embedding::from_raw(vec![1.0, 2.0, 2.0]);
        let norm = crate::math::l2_norm(e.as_slice());
        assert!((norm - 1.0).abs() < 1e-5);
        assert_eq!(e.dim(), 3);
    }

    #[test]
    fn test_embedding_similarity_is_cosine() {
        let a = Embedding::from_raw(vec![2.0, 0.0]);
        let b = Embedding::from_raw(vec![5.0, 5.0]);
        let s = a.similarity(&b).unwrap();
        assert!((s - std::f32::consts::FRAC_1_SQRT_2).abs() < 1e-6);
    }

    #[test]
    fn test_embedding_similarity_dim_mismatch() {
        let a = Embedding::from_raw(vec![1.0, 0.0]);
        let b = Embedding::from_raw(vec![1.0, 0.0, 0.0]);
        assert!(a.similarity(&b).is_none());
    }

    #[test]
    fn test_selector_from_endpoint_name() {
        assert_eq!(
            BackendSelector::from_endpoint_name(None).unwrap(),
            BackendSelector::Local
        );
        assert_eq!(
            BackendSelector::from_endpoint_name(Some("clip-endpoint-1")).unwrap(),
            BackendSelector::Remote("clip-endpoint-1".to_string())
        );
        assert!(BackendSelector::from_endpoint_name(Some(" ")).is_err());
    }

    #[test]
    fn test_search_request_defaults() {
        let req: SearchRequest =
            serde_json::from_str(r#"{"query": "red sneaker", "images": ["a.jpg", "b.jpg"]}"#)
                .unwrap();
        assert_eq!(req.images, vec![Candidate::from("a.jpg"), Candidate::from("b.jpg")]);
        assert!(req.min_score.is_none());
        assert!(req.endpoint_name.is_none());
    }

    #[test]
    fn test_search_request_missing_images_fails() {
        let err = serde_json::from_str::<SearchRequest>(r#"{"query": "x"}"#).unwrap_err();
        assert!(err.to_string().contains("images"));
    }

    #[test]
    fn test_prior_result_keeps_extra_fields() {
        let req: SecondarySearchRequest = serde_json::from_str(
            r#"{"query": "q", "primary_results": [{"path": "a.jpg", "score": 0.4, "url": "http://x/a.jpg"}]}"#,
        )
        .unwrap();
        assert_eq!(req.primary_results[0].path, Candidate::from("a.jpg"));
        assert_eq!(req.primary_results[0].score, Some(0.4));
        assert!(req.primary_results[0].extra.contains_key("url"));
    }

    #[test]
    fn test_search_response_serialization() {
        let ok = SearchResponse::Results(vec![ScoredCandidate::new("a.jpg".into(), 0.5)]);
        assert_eq!(
            serde_json::to_string(&ok).unwrap(),
            r#"[{"path":"a.jpg","score":0.5}]"#
        );

        let err = SearchResponse::Error {
            error: "boom".to_string(),
        };
        assert_eq!(serde_json::to_string(&err).unwrap(), r#"{"error":"boom"}"#);
        assert!(err.is_error());
    }

    #[test]
    fn test_backend_descriptor_wire_names() {
        let d = BackendDescriptor {
            id: "1".to_string(),
            display_name: "CLIP default model".to_string(),
            endpoint_name: None,
            description: "Default".to_string(),
            is_default: true,
        };
        let json = serde_json::to_value(&d).unwrap();
        assert_eq!(json["name"], "CLIP default model");
        assert!(json["endpoint_name"].is_null());
    }

    #[test]
    fn test_health_status_lowercase() {
        assert_eq!(
            serde_json::to_string(&HealthStatus::Success).unwrap(),
            r#""success""#
        );
    }

    #[test]
    fn test_model_info_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model_info.json");
        std::fs::write(
            &path,
            r#"{"clip_model_type": "ViT-B/32", "epochs": 10, "batch_size": 32, "learning_rate": 5e-6, "val_top1": 0.82}"#,
        )
        .unwrap();
        let info = ModelInfo::load(&path).unwrap();
        assert_eq!(info.clip_model_type, "ViT-B/32");
        assert_eq!(info.epochs, 10);
    }
}
