// src/metrics.rs
//! Prometheus exposition for gate decisions.

use std::time::Duration;

use anyhow::anyhow;
use axum::{routing::get, Router};
use metrics::{counter, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

use crate::decision::AnalysisResult;

pub struct Metrics {
    pub handle: PrometheusHandle,
}

impl Metrics {
    /// Install the global Prometheus recorder. Only one recorder may exist per process.
    pub fn init() -> anyhow::Result<Self> {
        let handle = PrometheusBuilder::new()
            .install_recorder()
            .map_err(|e| anyhow!("prometheus: install recorder: {e}"))?;
        Ok(Self { handle })
    }

    /// Wrap an existing handle, e.g. one built with `build_recorder()` in tests.
    pub fn from_handle(handle: PrometheusHandle) -> Self {
        Self { handle }
    }

    /// Returns a router exposing `/metrics` with the Prometheus exposition format.
    pub fn router(&self) -> Router {
        let handle = self.handle.clone();
        Router::new().route(
            "/metrics",
            get(move || {
                let h = handle.clone();
                async move { h.render() }
            }),
        )
    }
}

/// Record one decision: outcome and policy counters, reason counters, latency.
pub fn record_analysis(result: &AnalysisResult, elapsed: Duration) {
    let outcome = if result.is_worth_replying { "reply" } else { "skip" };
    counter!("reply_gate_decisions_total", "outcome" => outcome).increment(1);
    counter!("reply_gate_policy_total", "action" => result.policy.action.as_str()).increment(1);
    for reason in &result.reasons {
        counter!("reply_gate_reasons_total", "reason" => reason.as_str()).increment(1);
    }
    histogram!("reply_gate_probability").record(result.probability);
    histogram!("reply_gate_analyze_duration_ms").record(elapsed.as_secs_f64() * 1000.0);
}
