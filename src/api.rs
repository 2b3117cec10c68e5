// src/api.rs
//! HTTP surface: health, single and batch analysis.

use std::time::Instant;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use metrics::counter;
use serde::Deserialize;
use serde_json::json;
use tower_http::cors::CorsLayer;

use crate::analyze::Analyzer;
use crate::behavior::BehavioralSignals;
use crate::config::AnalyzerConfig;
use crate::decision::AnalysisResult;
use crate::metrics::record_analysis;
use crate::reload::AnalyzerHandle;

/// Shared app state used by Axum.
#[derive(Clone, Debug)]
pub struct AppState {
    pub analyzer: AnalyzerHandle,
}

impl AppState {
    pub fn new(analyzer: Analyzer) -> Self {
        Self {
            analyzer: AnalyzerHandle::new(analyzer),
        }
    }

    /// Load config from `REPLY_GATE_CONFIG_PATH` / `REPLY_GATE_THRESHOLD`.
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(Self::new(Analyzer::new(AnalyzerConfig::from_toml()?)))
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AnalyzeRequest {
    pub text: String,
    pub history: Vec<String>,
    pub meta: BehavioralSignals,
}

#[derive(Debug, Deserialize)]
pub struct BatchRequest {
    pub items: Vec<AnalyzeRequest>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { Json(json!({ "status": "ok" })) }))
        .route("/analyze", post(analyze))
        .route("/analyze/batch", post(analyze_batch))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

fn run(analyzer: &Analyzer, req: &AnalyzeRequest) -> AnalysisResult {
    let started = Instant::now();
    let result = analyzer.analyze(&req.text, &req.history, &req.meta);
    record_analysis(&result, started.elapsed());
    result
}

async fn analyze(State(state): State<AppState>, Json(req): Json<AnalyzeRequest>) -> Json<AnalysisResult> {
    counter!("reply_gate_requests_total", "endpoint" => "analyze").increment(1);
    Json(run(&state.analyzer.current(), &req))
}

async fn analyze_batch(State(state): State<AppState>, Json(body): Json<BatchRequest>) -> Response {
    counter!("reply_gate_requests_total", "endpoint" => "batch").increment(1);
    if body.items.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "items must not be empty" })),
        )
            .into_response();
    }
    // one snapshot for the whole batch
    let analyzer = state.analyzer.current();
    let results: Vec<AnalysisResult> = body.items.iter().map(|req| run(&analyzer, req)).collect();
    Json(results).into_response()
}
