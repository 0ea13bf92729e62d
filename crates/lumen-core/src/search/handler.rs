//! JSON request handling.
//!
//! Each handler parses a request body, runs it on its own task, and turns
//! any request-level failure (including a panic inside the search) into a
//! `{"error": ...}` response. Nothing escapes as an `Err` or an unwind.

use serde::Deserialize;
use std::any::Any;
use std::backtrace::Backtrace;
use std::future::Future;
use std::sync::Arc;

use super::SearchService;
use crate::error::{SearchError, SearchResult};
use crate::types::{
    HealthReport, ScoredCandidate, SearchRequest, SearchResponse, SecondarySearchRequest,
};

/// Endpoint health check request body.
#[derive(Debug, Deserialize)]
pub struct EndpointTestRequest {
    #[serde(default)]
    pub endpoint_name: Option<String>,
    #[serde(default)]
    pub test_text: Option<String>,
}

/// Handle a primary search request body.
pub async fn handle_search(service: Arc<SearchService>, body: &str) -> SearchResponse {
    let request = match serde_json::from_str::<SearchRequest>(body) {
        Ok(request) => request,
        Err(e) => return error_response(SearchError::from(e)),
    };
    search_response(service, request).await
}

/// Run a parsed primary search under the same guard as [`handle_search`].
pub async fn search_response(
    service: Arc<SearchService>,
    request: SearchRequest,
) -> SearchResponse {
    run_guarded(async move { service.search(&request).await }).await
}

/// Handle a secondary (refinement) search request body.
pub async fn handle_secondary_search(service: Arc<SearchService>, body: &str) -> SearchResponse {
    let request = match serde_json::from_str::<SecondarySearchRequest>(body) {
        Ok(request) => request,
        Err(e) => return error_response(SearchError::from(e)),
    };
    refine_response(service, request).await
}

/// Run a parsed secondary search under the same guard as
/// [`handle_secondary_search`].
pub async fn refine_response(
    service: Arc<SearchService>,
    request: SecondarySearchRequest,
) -> SearchResponse {
    run_guarded(async move { service.refine(&request).await }).await
}

/// Handle either kind of search request, dispatching on whether the body
/// carries `primary_results`.
pub async fn handle_request(service: Arc<SearchService>, body: &str) -> SearchResponse {
    let value: serde_json::Value = match serde_json::from_str(body) {
        Ok(value) => value,
        Err(e) => return error_response(SearchError::from(e)),
    };
    let Some(object) = value.as_object() else {
        return error_response(SearchError::InvalidRequest(
            "request body must be a JSON object".to_string(),
        ));
    };

    if object.contains_key("primary_results") {
        handle_secondary_search(service, body).await
    } else {
        handle_search(service, body).await
    }
}

/// Handle an endpoint health check request body.
pub async fn handle_endpoint_test(
    service: Arc<SearchService>,
    body: &str,
) -> SearchResult<HealthReport> {
    let request: EndpointTestRequest = serde_json::from_str(body)?;
    let endpoint_name = request.endpoint_name.unwrap_or_default();
    let result = service
        .check_endpoint(&endpoint_name, request.test_text.as_deref())
        .await;
    if let Err(e) = &result {
        tracing::error!("Endpoint test failed: {}", failure_report(e));
    }
    result
}

/// Run a search on its own task and map the outcome to a response.
async fn run_guarded<F>(search: F) -> SearchResponse
where
    F: Future<Output = SearchResult<Vec<ScoredCandidate>>> + Send + 'static,
{
    let outcome = match tokio::spawn(search).await {
        Ok(result) => result,
        Err(e) if e.is_panic() => Err(SearchError::Internal(format!(
            "search task panicked: {}",
            panic_message(e.into_panic())
        ))),
        Err(e) => Err(SearchError::Internal(format!("search task failed: {e}"))),
    };

    match outcome {
        Ok(results) => SearchResponse::Results(results),
        Err(e) => error_response(e),
    }
}

fn error_response(error: SearchError) -> SearchResponse {
    tracing::error!("Search request failed: {}", failure_report(&error));
    SearchResponse::Error {
        error: error.to_string(),
    }
}

/// Log text for a failed request. Internal failures carry a stack trace.
fn failure_report(error: &SearchError) -> String {
    match error {
        SearchError::Internal(_) => {
            format!("{error:?}\nstack backtrace:\n{}", Backtrace::force_capture())
        }
        _ => format!("{error:?}"),
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
