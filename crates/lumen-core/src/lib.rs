//! Lumen Core - text-to-image semantic search over an image catalog.
//!
//! Given a natural-language query and a list of image paths, Lumen scores
//! every image against the query with a CLIP-style model and returns the
//! images at or above a similarity threshold, best first.
//!
//! # Architecture
//!
//! ```text
//! request → resolve backend → encode query once
//!         → chunks of batch_size → score_batch (local ONNX | remote endpoint)
//!         → rank(min_score) → [{path, score}]
//! ```
//!
//! Per-image failures are logged and the image is dropped; they never fail
//! the request.
//!
//! # Usage
//!
//! ```rust,ignore
//! use lumen_core::{BackendSelector, Config, LocalBackend, SearchService};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load()?;
//!     let service = SearchService::from_config(&config);
//!     let local = LocalBackend::load(&config, service.loader())?;
//!     let service = service.with_local(Arc::new(local));
//!
//!     let images = vec!["catalog/1.jpg".into(), "catalog/2.jpg".into()];
//!     let results = service
//!         .primary_search("red leather sneaker", &images, None, &BackendSelector::Local)
//!         .await?;
//!     println!("{}", serde_json::to_string(&results)?);
//!     Ok(())
//! }
//! ```

pub mod backend;
pub mod config;
pub mod embedding;
pub mod error;
pub mod math;
pub mod output;
pub mod pipeline;
pub mod registry;
pub mod search;
pub mod types;

pub use backend::{EmbeddingBackend, EncodedQuery, LocalBackend, RemoteClient, RemoteEndpoints};
pub use config::Config;
pub use error::{
    ConfigError, LumenError, PipelineError, PipelineResult, Result, SearchError, SearchResult,
};
pub use output::{OutputFormat, OutputWriter};
pub use registry::{ConfigRegistry, ModelRegistry};
pub use search::{rank, SearchService};
pub use types::{
    BackendDescriptor, BackendSelector, Candidate, Embedding, HealthReport, HealthStatus,
    ModelInfo, PriorResult, ScoredCandidate, SearchRequest, SearchResponse,
    SecondarySearchRequest,
};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
