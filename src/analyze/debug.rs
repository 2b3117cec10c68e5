//! Debug breakdown attached to results, anonymized dev logging, and dev-only
//! inspection endpoints. Mount with `app.merge(analyze::debug::router(state))` in dev
//! only.

use std::collections::HashMap;

use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use serde::Serialize;
use tracing::info;

use super::calibration::CalibrationTrace;
use super::rules::RuleMatch;
use super::scoring::Contribution;
use super::similarity::SimilarityChannels;
use crate::api::AppState;
use crate::behavior::BehavioralSignals;
use crate::config::{dev_environment, env_flag, AnalyzerConfig, ENV_DEV_LOG};
use crate::decision::{AnalysisResult, ReasonCode};

/// Everything that went into one decision. Present only when debugging is on and
/// never read back by the decision itself.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DebugBreakdown {
    pub language: String,
    pub bias: f64,
    pub contributions: Vec<Contribution>,
    pub calibration: CalibrationTrace,
    pub channels: SimilarityChannels,
    pub composite_similarity: Option<f64>,
    pub repeat_threshold: f64,
    pub reply_threshold: f64,
    pub rule_matches: Vec<RuleMatch>,
}

// Dev logging gate: REPLY_GATE_DEV_LOG=1 AND dev env (debug build or APP_ENV in {local,development,dev})
pub(crate) fn dev_logging_enabled() -> bool {
    env_flag(ENV_DEV_LOG) && dev_environment()
}

pub(crate) fn anon_hash(text: &str) -> String {
    use sha2::{Digest, Sha256};
    let digest = Sha256::digest(text.as_bytes());
    let mut out = String::with_capacity(12);
    for b in digest.iter().take(6) {
        use std::fmt::Write as _;
        let _ = write!(&mut out, "{:02x}", b);
    }
    out
}

pub(crate) fn truncate_vec<T: ToString>(v: &[T], max: usize) -> Vec<String> {
    v.iter().take(max).map(|x| x.to_string()).collect()
}

/// Never logs raw text. Only hashed id, probability and the first reasons.
pub(crate) fn dev_log_decision(text: &str, result: &AnalysisResult, threshold: f64) {
    let id = anon_hash(text);
    let reasons: Vec<String> = truncate_vec::<ReasonCode>(&result.reasons, 5);
    info!(
        target: "reply_gate::decision",
        %id,
        probability = result.probability,
        threshold,
        worthy = result.is_worth_replying,
        policy = result.policy.action.as_str(),
        reasons = ?reasons
    );
}

#[derive(Debug, Serialize)]
pub struct ConfigOut {
    pub config: AnalyzerConfig,
    pub rules: Vec<String>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/debug/config", get(get_config))
        .route("/debug/preview", get(get_preview))
        .with_state(state)
}

async fn get_config(State(state): State<AppState>) -> Json<ConfigOut> {
    let analyzer = state.analyzer.current();
    Json(ConfigOut {
        config: analyzer.config().clone(),
        rules: analyzer.rules().names(),
    })
}

/// GET /debug/preview?text=...&mentioned=1
async fn get_preview(
    State(state): State<AppState>,
    Query(q): Query<HashMap<String, String>>,
) -> Json<AnalysisResult> {
    let text = q.get("text").cloned().unwrap_or_default();
    let meta = BehavioralSignals {
        mentioned_by_at: q.get("mentioned").is_some_and(|v| v == "1" || v == "true"),
        ..BehavioralSignals::default()
    };
    let none: [&str; 0] = [];
    Json(state.analyzer.current().explain(&text, &none, &meta))
}
