// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod analyze;
pub mod api;
pub mod behavior;
pub mod config;
pub mod decision;
pub mod metrics;
pub mod providers;
pub mod reload;

// ---- Re-exports for stable public API ----
pub use crate::analyze::{Analyzer, AnalyzerBuilder, IntentContext, IntentKind, Weights};
pub use crate::api::{router, AppState};
pub use crate::behavior::{AttentionSession, BehavioralSignals};
pub use crate::config::AnalyzerConfig;
pub use crate::decision::{AnalysisResult, Policy, PolicyAction, ReasonCode};
pub use crate::reload::AnalyzerHandle;

use axum::Router;

use crate::config::dev_environment;
use crate::metrics::Metrics;

/// The full in-process app: API routes, `/metrics`, and the debug router in dev.
pub fn app(state: AppState, metrics: &Metrics) -> Router {
    let mut app = router(state.clone()).merge(metrics.router());
    if dev_environment() {
        app = app.merge(analyze::debug::router(state));
    }
    app
}
