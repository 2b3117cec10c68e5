// tests/api_http.rs
//
// HTTP-level tests for the public API Router without opening sockets.
// We exercise the router directly via tower::ServiceExt::oneshot.
//
// Covered:
// - GET /health
// - POST /analyze (+ empty text, malformed payload)
// - POST /analyze/batch (+ empty items)

use axum::{
    body::{self, Body},
    http::{Request, StatusCode},
    Router,
};
use serde_json::json;
use serde_json::Value as Json;
use tower::ServiceExt as _; // for `oneshot`

use reply_gate::{api, Analyzer, AnalyzerConfig, AppState};

const BODY_LIMIT: usize = 1024 * 1024;

/// Default analyzer, independent of any config file in the working directory.
fn test_router() -> Router {
    let analyzer = Analyzer::builder(AnalyzerConfig::default()).dev_log(false).build();
    api::router(AppState::new(analyzer))
}

async fn post_json(app: Router, uri: &str, payload: Json) -> (StatusCode, Vec<u8>) {
    let req = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(payload.to_string()))
        .expect("build POST");
    let resp = app.oneshot(req).await.expect("oneshot");
    let status = resp.status();
    let bytes = body::to_bytes(resp.into_body(), BODY_LIMIT)
        .await
        .expect("read body")
        .to_vec();
    (status, bytes)
}

#[tokio::test]
async fn health_returns_status_ok() {
    let req = Request::builder()
        .uri("/health")
        .body(Body::empty())
        .expect("build GET /health");
    let resp = test_router().oneshot(req).await.expect("oneshot /health");
    assert_eq!(resp.status(), StatusCode::OK);

    let bytes = body::to_bytes(resp.into_body(), BODY_LIMIT).await.expect("read body");
    let v: Json = serde_json::from_slice(&bytes).expect("health json");
    assert_eq!(v, json!({ "status": "ok" }));
}

#[tokio::test]
async fn analyze_returns_result_fields() {
    let payload = json!({
        "text": "can you check why the nightly job failed?",
        "history": ["morning all", "nightly job is red again"],
        "meta": { "mentionedByAt": true, "senderFatigue": 0.1 }
    });
    let (status, bytes) = post_json(test_router(), "/analyze", payload).await;
    assert_eq!(status, StatusCode::OK);

    let v: Json = serde_json::from_slice(&bytes).expect("analyze json");
    for key in ["original", "isWorthReplying", "probability", "score", "confidence", "features", "reasons", "policy"] {
        assert!(v.get(key).is_some(), "missing '{key}'");
    }
    let p = v["probability"].as_f64().unwrap();
    assert!((0.0..=1.0).contains(&p));
    assert_eq!(v["reasons"][0], "MENTIONED");
    assert_eq!(v["features"]["historySize"], 2);
}

#[tokio::test]
async fn analyze_empty_text_is_not_an_http_error() {
    let (status, bytes) = post_json(test_router(), "/analyze", json!({ "text": "   " })).await;
    assert_eq!(status, StatusCode::OK);
    let v: Json = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(v["isWorthReplying"], false);
    assert_eq!(v["reasons"], json!(["EMPTY_OR_INVALID_INPUT"]));
}

#[tokio::test]
async fn analyze_rejects_malformed_payload() {
    let (status, _) = post_json(test_router(), "/analyze", json!({ "text": 42 })).await;
    assert!(status.is_client_error(), "expected 4xx, got {status}");
}

#[tokio::test]
async fn batch_preserves_order() {
    let payload = json!({
        "items": [
            { "text": "first message here" },
            { "text": "" },
            { "text": "what time is the standup?" }
        ]
    });
    let (status, bytes) = post_json(test_router(), "/analyze/batch", payload).await;
    assert_eq!(status, StatusCode::OK);

    let v: Vec<Json> = serde_json::from_slice(&bytes).expect("batch json");
    assert_eq!(v.len(), 3);
    assert_eq!(v[0]["original"], "first message here");
    assert_eq!(v[1]["reasons"], json!(["EMPTY_OR_INVALID_INPUT"]));
    assert_eq!(v[2]["original"], "what time is the standup?");
}

#[tokio::test]
async fn batch_rejects_empty_items() {
    let (status, bytes) = post_json(test_router(), "/analyze/batch", json!({ "items": [] })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let v: Json = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(v["error"], "items must not be empty");
}
