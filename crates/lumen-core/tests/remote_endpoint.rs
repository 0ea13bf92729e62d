//! Remote endpoint backend against an in-process stub inference server.

use axum::extract::{Path as UrlPath, State};
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use serde_json::{json, Value};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use lumen_core::{BackendSelector, Candidate, Config, HealthStatus, SearchResponse, SearchService};

const PNG_SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

#[derive(Default)]
struct Stub {
    /// (endpoint name, request body) per call
    calls: Mutex<Vec<(String, Value)>>,
    flaky_failures: AtomicUsize,
}

/// Scores an image by the number of bytes after its signature / 100.
///
/// Endpoint behavior by name:
/// - `scorer`: always answers
/// - `nullish`: `{"similarity": null}` for odd payload lengths
/// - `flaky`: 503 on the first call, then answers
/// - `rejecting`: always 400
/// - `failing`: always 500
/// - `borderline`: 0.155000004 for even payload lengths, 0.154999996 for odd
async fn invoke(
    State(stub): State<Arc<Stub>>,
    UrlPath(endpoint): UrlPath<String>,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    stub.calls
        .lock()
        .unwrap()
        .push((endpoint.clone(), body.clone()));

    let image = hex::decode(body["image"].as_str().unwrap_or_default()).unwrap_or_default();
    let payload_len = image.len().saturating_sub(PNG_SIGNATURE.len());
    let score = payload_len as f64 / 100.0;

    match endpoint.as_str() {
        "nullish" if payload_len % 2 == 1 => (StatusCode::OK, Json(json!({"similarity": null}))),
        "borderline" => {
            let similarity = if payload_len % 2 == 1 { 0.154999996 } else { 0.155000004 };
            (StatusCode::OK, Json(json!({ "similarity": similarity })))
        }
        "flaky" if stub.flaky_failures.fetch_add(1, Ordering::SeqCst) == 0 => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({"message": "warming up"})),
        ),
        "rejecting" => (StatusCode::BAD_REQUEST, Json(json!({"message": "bad payload"}))),
        "failing" => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({"message": "model crashed"})),
        ),
        _ => (
            StatusCode::OK,
            Json(json!({
                "similarity": score,
                "image_features": [[0.1, 0.2]],
                "text_features": [[0.3, 0.4]]
            })),
        ),
    }
}

async fn spawn_stub() -> (String, Arc<Stub>) {
    let stub = Arc::new(Stub::default());
    let app = Router::new()
        .route("/endpoints/:name/invocations", post(invoke))
        .with_state(stub.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{addr}"), stub)
}

fn config(base_url: &str) -> Config {
    let mut config = Config::default();
    config.remote.base_url = base_url.to_string();
    config.remote.retry_delay_ms = 10;
    config.limits.remote_timeout_ms = 5_000;
    config
}

/// Write a file with a PNG signature followed by `payload_len` filler bytes.
fn write_candidate(dir: &Path, name: &str, payload_len: usize) -> Candidate {
    let path = dir.join(name);
    let mut bytes = PNG_SIGNATURE.to_vec();
    bytes.extend(std::iter::repeat(0xAB).take(payload_len));
    std::fs::write(&path, bytes).unwrap();
    Candidate::from(path)
}

fn remote(name: &str) -> BackendSelector {
    BackendSelector::Remote(name.to_string())
}

#[tokio::test]
async fn test_wire_payload_is_text_and_lowercase_hex() {
    let (base_url, stub) = spawn_stub().await;
    let dir = tempfile::tempdir().unwrap();
    let candidate = write_candidate(dir.path(), "a.png", 30);

    let service = SearchService::from_config(&config(&base_url));
    let results = service
        .primary_search("red sneaker", &[candidate.clone()], Some(0.0), &remote("scorer"))
        .await
        .unwrap();

    assert_eq!(results.len(), 1);
    assert!((results[0].score - 0.30).abs() < 1e-6);

    let calls = stub.calls.lock().unwrap();
    assert_eq!(calls.len(), 1);
    let (endpoint, body) = &calls[0];
    assert_eq!(endpoint, "scorer");

    let object = body.as_object().unwrap();
    assert_eq!(object.len(), 2);
    assert_eq!(object["text"], "red sneaker");

    let file_bytes = std::fs::read(candidate.as_path()).unwrap();
    assert_eq!(object["image"], hex::encode(&file_bytes));
    assert!(object["image"].as_str().unwrap().starts_with("89504e47"));
}

#[tokio::test]
async fn test_threshold_uses_endpoint_precision() {
    let (base_url, _stub) = spawn_stub().await;
    let dir = tempfile::tempdir().unwrap();
    let at = write_candidate(dir.path(), "at.png", 2);
    let below = write_candidate(dir.path(), "below.png", 3);

    let service = SearchService::from_config(&config(&base_url));
    let results = service
        .primary_search("q", &[below, at.clone()], Some(0.155), &remote("borderline"))
        .await
        .unwrap();

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].path, at.as_str());
    assert!((results[0].score - 0.155000004).abs() < 1e-12);
}

#[tokio::test]
async fn test_unrecognized_bytes_are_still_sent() {
    let (base_url, stub) = spawn_stub().await;
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("frame.qoi");
    std::fs::write(&path, b"qoif\x00\x00\x00\x01").unwrap();

    let service = SearchService::from_config(&config(&base_url));
    let results = service
        .primary_search("q", &[Candidate::from(path)], Some(-1.0), &remote("scorer"))
        .await
        .unwrap();

    assert_eq!(results.len(), 1);
    let calls = stub.calls.lock().unwrap();
    assert_eq!(calls[0].1["image"], hex::encode(b"qoif\x00\x00\x00\x01"));
}

#[tokio::test]
async fn test_one_call_per_candidate_in_input_order() {
    let (base_url, stub) = spawn_stub().await;
    let dir = tempfile::tempdir().unwrap();
    let candidates: Vec<Candidate> = [20, 50, 10, 40]
        .iter()
        .enumerate()
        .map(|(i, len)| write_candidate(dir.path(), &format!("{i}.png"), *len))
        .collect();

    let mut config = config(&base_url);
    config.search.batch_size = 3;
    config.remote.concurrency = 4;
    let service = SearchService::from_config(&config);

    let results = service
        .primary_search("q", &candidates, Some(0.15), &remote("scorer"))
        .await
        .unwrap();

    let scores: Vec<f64> = results.iter().map(|r| r.score).collect();
    assert_eq!(scores.len(), 3);
    assert!(scores.windows(2).all(|w| w[0] >= w[1]));
    assert_eq!(results[0].path, candidates[1].as_str());
    assert_eq!(stub.calls.lock().unwrap().len(), 4);
}

#[tokio::test]
async fn test_null_similarity_drops_candidate() {
    let (base_url, _stub) = spawn_stub().await;
    let dir = tempfile::tempdir().unwrap();
    let even = write_candidate(dir.path(), "even.png", 40);
    let odd = write_candidate(dir.path(), "odd.png", 41);

    let service = SearchService::from_config(&config(&base_url));
    let results = service
        .primary_search("q", &[odd, even.clone()], Some(0.0), &remote("nullish"))
        .await
        .unwrap();

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].path, even.as_str());
}

#[tokio::test]
async fn test_transient_failure_is_retried() {
    let (base_url, stub) = spawn_stub().await;
    let dir = tempfile::tempdir().unwrap();
    let candidate = write_candidate(dir.path(), "a.png", 25);

    let service = SearchService::from_config(&config(&base_url));
    let results = service
        .primary_search("q", &[candidate], Some(0.0), &remote("flaky"))
        .await
        .unwrap();

    assert_eq!(results.len(), 1);
    assert_eq!(stub.calls.lock().unwrap().len(), 2);
}

#[tokio::test]
async fn test_client_error_is_not_retried() {
    let (base_url, stub) = spawn_stub().await;
    let dir = tempfile::tempdir().unwrap();
    let candidate = write_candidate(dir.path(), "a.png", 25);

    let service = SearchService::from_config(&config(&base_url));
    let results = service
        .primary_search("q", &[candidate], Some(0.0), &remote("rejecting"))
        .await
        .unwrap();

    assert!(results.is_empty());
    assert_eq!(stub.calls.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn test_server_error_exhausts_retries_then_drops() {
    let (base_url, stub) = spawn_stub().await;
    let dir = tempfile::tempdir().unwrap();
    let candidate = write_candidate(dir.path(), "a.png", 25);

    let mut config = config(&base_url);
    config.remote.retry_attempts = 2;
    let service = SearchService::from_config(&config);
    let results = service
        .primary_search("q", &[candidate], Some(0.0), &remote("failing"))
        .await
        .unwrap();

    assert!(results.is_empty());
    assert_eq!(stub.calls.lock().unwrap().len(), 3);
}

#[tokio::test]
async fn test_unreachable_endpoint_yields_empty_results() {
    let dir = tempfile::tempdir().unwrap();
    let candidate = write_candidate(dir.path(), "a.png", 25);

    let mut config = config("http://127.0.0.1:9");
    config.remote.retry_attempts = 0;
    let service = SearchService::from_config(&config);
    let results = service
        .primary_search("q", &[candidate], Some(-1.0), &remote("scorer"))
        .await
        .unwrap();
    assert!(results.is_empty());
}

#[tokio::test]
async fn test_unreadable_candidates_never_reach_endpoint() {
    let (base_url, stub) = spawn_stub().await;
    let dir = tempfile::tempdir().unwrap();
    let good = write_candidate(dir.path(), "good.png", 30);
    let not_image = dir.path().join("notes.txt");
    std::fs::write(&not_image, b"just some text").unwrap();

    let service = SearchService::from_config(&config(&base_url));
    let results = service
        .primary_search(
            "q",
            &[
                Candidate::from(dir.path().join("missing.png")),
                Candidate::from(not_image),
                good.clone(),
            ],
            Some(0.0),
            &remote("scorer"),
        )
        .await
        .unwrap();

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].path, good.as_str());
    assert_eq!(stub.calls.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn test_secondary_search_request_with_endpoint() {
    let (base_url, _stub) = spawn_stub().await;
    let dir = tempfile::tempdir().unwrap();
    let a = write_candidate(dir.path(), "a.png", 20);
    let b = write_candidate(dir.path(), "b.png", 60);

    let service = Arc::new(SearchService::from_config(&config(&base_url)));
    let body = json!({
        "query": "q",
        "primary_results": [
            {"path": a.as_str(), "score": 0.99},
            {"path": b.as_str(), "score": 0.01}
        ],
        "endpoint_name": "scorer"
    })
    .to_string();

    match lumen_core::search::handle_request(service, &body).await {
        SearchResponse::Results(results) => {
            assert_eq!(results.len(), 2);
            assert_eq!(results[0].path, b.as_str());
            assert!((results[0].score - 0.60).abs() < 1e-6);
        }
        SearchResponse::Error { error } => panic!("unexpected error: {error}"),
    }
}

#[tokio::test]
async fn test_health_check_synthesizes_probe_image() {
    let (base_url, stub) = spawn_stub().await;
    let service = SearchService::from_config(&config(&base_url));

    let report = service.check_endpoint("scorer", None).await.unwrap();
    assert_eq!(report.status, HealthStatus::Success);
    assert_eq!(report.endpoint_name, "scorer");

    let calls = stub.calls.lock().unwrap();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].1["text"], "test query");
    let probe = hex::decode(calls[0].1["image"].as_str().unwrap()).unwrap();
    let decoded = image::load_from_memory(&probe).unwrap();
    assert_eq!((decoded.width(), decoded.height()), (224, 224));
}

#[tokio::test]
async fn test_health_check_reports_failure_without_retry() {
    let (base_url, stub) = spawn_stub().await;
    let service = SearchService::from_config(&config(&base_url));

    let report = service
        .check_endpoint("failing", Some("red sneaker"))
        .await
        .unwrap();
    assert_eq!(report.status, HealthStatus::Error);
    assert!(report.details.unwrap().contains("500"));
    assert_eq!(stub.calls.lock().unwrap().len(), 1);
}
